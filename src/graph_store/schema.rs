//! SQLite schema for the playlist graph database.
//!
//! One database, three logical tiers. The invariants the pipeline promises
//! (no placeholder artists, no silent zero-extraction records, canonical edge
//! keys) are CHECK/UNIQUE constraints here, so they hold even for writes that
//! bypass the application layer.

use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, ForeignKey, ForeignKeyOnChange, SqlType, Table, VersionedSchema, DEFAULT_TIMESTAMP,
};

/// Storage-boundary twin of `track_parse::DENY_LIST`. A test keeps the two in
/// sync.
pub(crate) const RESERVED_NAME_CHECK: &str = "normalized_name NOT IN ('unknown', 'unknown artist', 'unknown dj', 'various', 'various artists', 'va', 'n/a', 'na', 'id', 'tba', '?')";

// =============================================================================
// Raw tier
// =============================================================================

/// Append-only scrape records. `id` is a content fingerprint; replaying the
/// same record is a conflict, not a duplicate.
const RAW_RECORDS_TABLE: Table = Table {
    name: "raw_records",
    columns: &[
        sqlite_column!("rowid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("id", &SqlType::Text, non_null = true),
        sqlite_column!("source", &SqlType::Text, non_null = true),
        sqlite_column!("source_url", &SqlType::Text),
        sqlite_column!("playlist_name", &SqlType::Text),
        sqlite_column!("event_date", &SqlType::Text),
        sqlite_column!("genres", &SqlType::Text, non_null = true), // JSON array
        sqlite_column!("track_strings", &SqlType::Text, non_null = true), // JSON array
        sqlite_column!("extracted_count", &SqlType::Integer, non_null = true),
        sqlite_column!("failure_reason", &SqlType::Text),
        sqlite_column!("parser_version", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_raw_records_source", "source")],
    unique_constraints: &[&["id"]],
    // A record that extracted nothing must say why. The gate synthesizes a
    // reason; this holds even if it didn't run.
    checks: &["extracted_count > 0 OR failure_reason IS NOT NULL"],
};

// =============================================================================
// Resolved tier
// =============================================================================

const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("rowid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("normalized_name", &SqlType::Text, non_null = true),
        sqlite_column!("source", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[],
    unique_constraints: &[&["normalized_name"]],
    checks: &["normalized_name <> ''", RESERVED_NAME_CHECK],
};

const ARTISTS_FK: ForeignKey = ForeignKey {
    foreign_table: "artists",
    foreign_column: "rowid",
    on_delete: ForeignKeyOnChange::Restrict,
};

const TRACKS_TABLE: Table = Table {
    name: "tracks",
    columns: &[
        sqlite_column!("rowid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("normalized_title", &SqlType::Text, non_null = true),
        sqlite_column!(
            "primary_artist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTISTS_FK)
        ),
        sqlite_column!("is_remix", &SqlType::Integer, non_null = true),
        sqlite_column!("is_mashup", &SqlType::Integer, non_null = true),
        sqlite_column!("mashup_components", &SqlType::Text), // JSON array, fill-if-null
        sqlite_column!("source", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_tracks_primary_artist", "primary_artist_id")],
    unique_constraints: &[&["normalized_title", "primary_artist_id"]],
    checks: &["normalized_title <> ''"],
};

const TRACKS_FK_CASCADE: ForeignKey = ForeignKey {
    foreign_table: "tracks",
    foreign_column: "rowid",
    on_delete: ForeignKeyOnChange::Cascade,
};

const TRACKS_FK_RESTRICT: ForeignKey = ForeignKey {
    foreign_table: "tracks",
    foreign_column: "rowid",
    on_delete: ForeignKeyOnChange::Restrict,
};

/// Track <-> Artist with role (0=primary, 1=featured, 2=remixer, 3=producer).
const TRACK_ARTISTS_TABLE: Table = Table {
    name: "track_artists",
    columns: &[
        sqlite_column!(
            "track_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TRACKS_FK_CASCADE)
        ),
        sqlite_column!(
            "artist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&ARTISTS_FK)
        ),
        sqlite_column!("role", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_track_artists_track", "track_id"),
        ("idx_track_artists_artist", "artist_id"),
    ],
    unique_constraints: &[&["track_id", "artist_id", "role"]],
    checks: &["role BETWEEN 0 AND 3"],
};

const RAW_RECORDS_FK: ForeignKey = ForeignKey {
    foreign_table: "raw_records",
    foreign_column: "id",
    on_delete: ForeignKeyOnChange::Restrict,
};

/// One playlist per scrape observation (raw record).
const PLAYLISTS_TABLE: Table = Table {
    name: "playlists",
    columns: &[
        sqlite_column!("rowid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!(
            "raw_record_id",
            &SqlType::Text,
            non_null = true,
            foreign_key = Some(&RAW_RECORDS_FK)
        ),
        sqlite_column!("source", &SqlType::Text, non_null = true),
        sqlite_column!("source_url", &SqlType::Text),
        sqlite_column!("name", &SqlType::Text),
        sqlite_column!("event_date", &SqlType::Text),
        sqlite_column!("genres", &SqlType::Text, non_null = true), // JSON array
        sqlite_column!(
            "created_at",
            &SqlType::Integer,
            non_null = true,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    indices: &[("idx_playlists_source", "source")],
    unique_constraints: &[&["raw_record_id"]],
    checks: &[],
};

const PLAYLISTS_FK: ForeignKey = ForeignKey {
    foreign_table: "playlists",
    foreign_column: "rowid",
    on_delete: ForeignKeyOnChange::Cascade,
};

const PLAYLIST_ENTRIES_TABLE: Table = Table {
    name: "playlist_entries",
    columns: &[
        sqlite_column!(
            "playlist_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&PLAYLISTS_FK)
        ),
        sqlite_column!("position", &SqlType::Integer, non_null = true),
        sqlite_column!(
            "track_id",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TRACKS_FK_RESTRICT)
        ),
    ],
    indices: &[("idx_playlist_entries_track", "track_id")],
    unique_constraints: &[&["playlist_id", "position"]],
    checks: &["position > 0"],
};

// =============================================================================
// Aggregated tier
// =============================================================================

/// Weighted adjacency edges, keyed by the canonical ordered pair. The
/// track_a < track_b CHECK makes reciprocal duplicates unrepresentable.
const ADJACENCY_EDGES_TABLE: Table = Table {
    name: "adjacency_edges",
    columns: &[
        sqlite_column!(
            "track_a",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TRACKS_FK_RESTRICT)
        ),
        sqlite_column!(
            "track_b",
            &SqlType::Integer,
            non_null = true,
            foreign_key = Some(&TRACKS_FK_RESTRICT)
        ),
        sqlite_column!("occurrence_count", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_adjacency_edges_b", "track_b")],
    unique_constraints: &[&["track_a", "track_b"]],
    checks: &["track_a < track_b", "occurrence_count > 0"],
};

// =============================================================================
// Versioned schema
// =============================================================================

pub const GRAPH_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        RAW_RECORDS_TABLE,
        ARTISTS_TABLE,
        TRACKS_TABLE,
        TRACK_ARTISTS_TABLE,
        PLAYLISTS_TABLE,
        PLAYLIST_ENTRIES_TABLE,
        ADJACENCY_EDGES_TABLE,
    ],
    migration: None,
}];
