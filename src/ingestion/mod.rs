//! Playlist ingestion pipeline.
//!
//! Record flow:
//! 1. A scraped record arrives with its ordered raw track strings
//! 2. Every string is parsed into title plus role-tagged artists
//! 3. The gate appends the record to the raw tier (failures included)
//! 4. The resolver converges artists and tracks onto stored identities
//! 5. The playlist, its entries, and edge increments commit together

mod gate;
mod manager;
mod models;
mod resolver;

pub use gate::{build_raw_row, ParseOutcomes};
pub use manager::{read_records_jsonl, BatchReport, IngestError, IngestManager};
pub use models::RawRecord;
pub use resolver::{ResolveError, Resolver, ResolverConfig};
