//! Tiered persistence for the playlist graph.
//!
//! Three logical tiers in one SQLite database:
//! - raw: append-only scrape records, fingerprint-keyed
//! - resolved: deduplicated artists/tracks/playlists, merge-only mutation
//! - aggregated: the rebuildable adjacency edge set

mod models;
mod schema;
mod store;
mod trait_def;

pub use models::{
    AdjacencyEdge, Artist, NewPlaylist, NewTrack, Playlist, RawRecordRow, Role, StoreError, Track,
};
pub use schema::GRAPH_VERSIONED_SCHEMAS;
pub use store::SqliteGraphStore;
pub use trait_def::{GraphStore, PlaylistIngest, StoreStats};
