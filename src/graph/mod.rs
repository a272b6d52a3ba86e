//! Adjacency graph builder.
//!
//! Derives weighted track-to-track edges from consecutive positions in
//! ordered playlists and folds them into the global edge set.

mod builder;

pub use builder::consecutive_pairs;
pub(crate) use builder::{apply_edge_increments, rebuild};
