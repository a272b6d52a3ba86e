//! Storage trait for the ingestion pipeline.

use super::models::{
    AdjacencyEdge, Artist, NewPlaylist, NewTrack, Playlist, RawRecordRow, Role, StoreError, Track,
};
use serde::Serialize;

/// Outcome of persisting one resolved playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaylistIngest {
    pub playlist_id: i64,
    /// False when the raw record's playlist was already present (replay).
    pub created: bool,
    /// Consecutive pairs whose edge weight was incremented.
    pub edges_touched: usize,
}

/// Row counts across the three tiers, for operators and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub raw_records: i64,
    pub failed_records: i64,
    pub artists: i64,
    pub tracks: i64,
    pub playlists: i64,
    pub playlist_entries: i64,
    pub edges: i64,
    pub total_edge_weight: i64,
}

/// Persistence operations for the raw/resolved/aggregated tiers.
///
/// Every write is a natural-key upsert; concurrent workers converge through
/// the database's unique constraints, not through in-process locks.
pub trait GraphStore: Send + Sync {
    // ==================== Raw tier ====================

    /// Append a raw record. Returns false when the fingerprint is already
    /// present (idempotent replay).
    fn insert_raw_record(&self, record: &RawRecordRow) -> Result<bool, StoreError>;

    fn get_raw_record(&self, id: &str) -> Result<Option<RawRecordRow>, StoreError>;

    // ==================== Resolved tier ====================

    fn get_artist_by_key(&self, normalized_name: &str) -> Result<Option<Artist>, StoreError>;

    /// Insert-or-reuse an artist by normalized name; returns its id.
    fn upsert_artist(
        &self,
        name: &str,
        normalized_name: &str,
        source: &str,
    ) -> Result<i64, StoreError>;

    /// Replace the display spelling (source-priority overwrite policy).
    fn update_artist_display(
        &self,
        artist_id: i64,
        name: &str,
        source: &str,
    ) -> Result<(), StoreError>;

    fn get_track_by_key(
        &self,
        normalized_title: &str,
        primary_artist_id: i64,
    ) -> Result<Option<Track>, StoreError>;

    /// Insert-or-reuse a track by (normalized title, primary artist).
    fn upsert_track(&self, track: &NewTrack) -> Result<i64, StoreError>;

    /// Field-merge an existing track: fill-if-null for nullable metadata,
    /// flags accumulate, display fields replaced only when
    /// `overwrite_display` is set.
    fn merge_track(
        &self,
        track_id: i64,
        incoming: &NewTrack,
        overwrite_display: bool,
    ) -> Result<(), StoreError>;

    fn link_track_artist(
        &self,
        track_id: i64,
        artist_id: i64,
        role: Role,
    ) -> Result<(), StoreError>;

    fn artists_for_track(&self, track_id: i64) -> Result<Vec<(Artist, Role)>, StoreError>;

    // ==================== Playlist + aggregated tier ====================

    /// Persist a playlist, its ordered entries, and the resulting edge
    /// increments in one transaction. Each slot is one source position; a
    /// `None` slot (track skipped during resolution) stores no entry but
    /// keeps the position gap, so its neighbors are never paired. A replay
    /// (playlist already present for this raw record) is a no-op.
    fn ingest_playlist(
        &self,
        playlist: &NewPlaylist,
        track_slots: &[Option<i64>],
    ) -> Result<PlaylistIngest, StoreError>;

    fn get_playlist_by_record(&self, raw_record_id: &str) -> Result<Option<Playlist>, StoreError>;

    /// Track ids of a playlist's entries, ordered by position.
    fn playlist_entry_tracks(&self, playlist_id: i64) -> Result<Vec<i64>, StoreError>;

    fn get_edge(&self, track_a: i64, track_b: i64) -> Result<Option<AdjacencyEdge>, StoreError>;

    fn edges_for_track(&self, track_id: i64) -> Result<Vec<AdjacencyEdge>, StoreError>;

    /// Atomically clear and recompute the whole edge set from stored playlist
    /// entries. Corruption repair, not routine ingestion. Returns the number
    /// of edges after the rebuild.
    fn rebuild_edges(&self) -> Result<usize, StoreError>;

    // ==================== Introspection ====================

    fn stats(&self) -> Result<StoreStats, StoreError>;
}
