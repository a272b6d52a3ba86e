//! Trackgraph Ingest Library
//!
//! This library exposes the internal modules for testing and potential reuse.

pub mod graph;
pub mod graph_store;
pub mod ingestion;
pub mod sqlite_persistence;
pub mod track_parse;

// Re-export commonly used types for convenience
pub use graph_store::{GraphStore, SqliteGraphStore, StoreStats};
pub use ingestion::{BatchReport, IngestManager, RawRecord, ResolverConfig};
pub use track_parse::{parse_track_string, ParsedTrack, PARSER_VERSION};
