//! Row types and errors for the graph store.

use serde::Serialize;
use thiserror::Error;

/// Errors surfaced by the persistence layer.
///
/// Constraint violations are definitive rejections (reserved name, duplicate
/// identity outside the upsert path, zero-extraction record without a
/// reason); they are never silently coerced.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("reserved placeholder name rejected: '{0}'")]
    ReservedName(String),

    #[error("record {0} has zero extracted tracks and no failure reason")]
    MissingFailureReason(String),

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("sqlite error: {0}")]
    Sqlite(rusqlite::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(failure, message)
                if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::ConstraintViolation(
                    message.clone().unwrap_or_else(|| failure.to_string()),
                )
            }
            _ => StoreError::Sqlite(e),
        }
    }
}

/// An artist's contribution to a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Role {
    Primary,
    Featured,
    Remixer,
    Producer,
}

impl Role {
    pub fn as_i64(&self) -> i64 {
        match self {
            Role::Primary => 0,
            Role::Featured => 1,
            Role::Remixer => 2,
            Role::Producer => 3,
        }
    }

    pub fn parse(value: i64) -> Option<Self> {
        match value {
            0 => Some(Role::Primary),
            1 => Some(Role::Featured),
            2 => Some(Role::Remixer),
            3 => Some(Role::Producer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Primary => "primary",
            Role::Featured => "featured",
            Role::Remixer => "remixer",
            Role::Producer => "producer",
        }
    }
}

/// Raw tier row. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawRecordRow {
    /// Content fingerprint, hex SHA-256. Natural key for replay idempotence.
    pub id: String,
    pub source: String,
    pub source_url: Option<String>,
    pub playlist_name: Option<String>,
    pub event_date: Option<String>,
    /// Canonical genre tags (JSON array in storage).
    pub genres: Vec<String>,
    pub track_strings: Vec<String>,
    pub extracted_count: i64,
    pub failure_reason: Option<String>,
    pub parser_version: i64,
}

/// Resolved artist entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub normalized_name: String,
    /// Source whose spelling the display name currently carries.
    pub source: String,
}

/// Resolved track entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    pub id: i64,
    pub title: String,
    pub normalized_title: String,
    pub primary_artist_id: i64,
    pub is_remix: bool,
    pub is_mashup: bool,
    pub mashup_components: Option<Vec<String>>,
    pub source: String,
}

/// Fields for inserting or merging a track.
#[derive(Debug, Clone)]
pub struct NewTrack {
    pub title: String,
    pub normalized_title: String,
    pub primary_artist_id: i64,
    pub is_remix: bool,
    pub is_mashup: bool,
    pub mashup_components: Option<Vec<String>>,
    pub source: String,
}

/// Resolved playlist, one per raw record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Playlist {
    pub id: i64,
    pub raw_record_id: String,
    pub source: String,
    pub source_url: Option<String>,
    pub name: Option<String>,
    pub event_date: Option<String>,
    pub genres: Vec<String>,
}

/// Fields for inserting a playlist.
#[derive(Debug, Clone)]
pub struct NewPlaylist {
    pub raw_record_id: String,
    pub source: String,
    pub source_url: Option<String>,
    pub name: Option<String>,
    pub event_date: Option<String>,
    pub genres: Vec<String>,
}

/// Aggregated tier row: a weighted link between two tracks observed strictly
/// consecutively in a playlist. Keyed canonically with track_a < track_b.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdjacencyEdge {
    pub track_a: i64,
    pub track_b: i64,
    pub occurrence_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_roundtrip() {
        for role in [Role::Primary, Role::Featured, Role::Remixer, Role::Producer] {
            assert_eq!(Role::parse(role.as_i64()), Some(role));
        }
        assert_eq!(Role::parse(99), None);
    }

    #[test]
    fn test_constraint_error_mapping() {
        let failure = rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT);
        let e = rusqlite::Error::SqliteFailure(failure, Some("CHECK failed".to_string()));
        match StoreError::from(e) {
            StoreError::ConstraintViolation(msg) => assert!(msg.contains("CHECK")),
            other => panic!("expected ConstraintViolation, got {other:?}"),
        }
    }
}
