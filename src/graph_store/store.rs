//! SQLite implementation of the graph store.

use super::models::{
    AdjacencyEdge, Artist, NewPlaylist, NewTrack, Playlist, RawRecordRow, Role, StoreError, Track,
};
use super::schema::GRAPH_VERSIONED_SCHEMAS;
use super::trait_def::{GraphStore, PlaylistIngest, StoreStats};
use crate::graph;
use crate::sqlite_persistence::BASE_DB_VERSION;
use crate::track_parse::is_denied_name;
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

/// SQLite-backed store for all three tiers.
///
/// A single writer connection behind a mutex; cross-process workers converge
/// through the schema's unique constraints, so no further coordination is
/// needed here.
#[derive(Clone)]
pub struct SqliteGraphStore {
    conn: Arc<Mutex<Connection>>,
}

fn migrate_if_needed(conn: &mut Connection) -> Result<()> {
    let latest_version = GRAPH_VERSIONED_SCHEMAS.len() - 1;
    let latest_schema = &GRAPH_VERSIONED_SCHEMAS[latest_version];

    let table_count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            [],
            |r| r.get(0),
        )
        .unwrap_or(0);

    if table_count == 0 {
        info!("Creating graph db schema at version {}", latest_version);
        latest_schema.create(conn)?;
        return Ok(());
    }

    let db_version: i64 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    let mut current_version = (db_version - BASE_DB_VERSION as i64).max(0) as usize;
    if current_version >= latest_version {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for schema in GRAPH_VERSIONED_SCHEMAS.iter().skip(current_version + 1) {
        if let Some(migration_fn) = schema.migration {
            info!(
                "Migrating graph db from version {} to {}",
                current_version, schema.version
            );
            migration_fn(&tx)?;
            current_version = schema.version;
        }
    }
    tx.execute(
        &format!("PRAGMA user_version = {}", BASE_DB_VERSION + current_version),
        [],
    )?;
    tx.commit()?;
    Ok(())
}

impl SqliteGraphStore {
    /// Open or create the graph database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut conn = Connection::open(path.as_ref())
            .with_context(|| format!("Failed to open graph database: {:?}", path.as_ref()))?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrate_if_needed(&mut conn)?;
        // journal_mode returns the resulting mode as a row
        let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |r| r.get(0))?;

        #[cfg(not(feature = "no_checks"))]
        GRAPH_VERSIONED_SCHEMAS[GRAPH_VERSIONED_SCHEMAS.len() - 1].validate(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database for tests.
    #[cfg(test)]
    pub fn in_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrate_if_needed(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_raw_record(row: &rusqlite::Row) -> rusqlite::Result<RawRecordRow> {
        let genres: Vec<String> = row
            .get::<_, String>("genres")
            .map(|s| serde_json::from_str(&s).unwrap_or_default())?;
        let track_strings: Vec<String> = row
            .get::<_, String>("track_strings")
            .map(|s| serde_json::from_str(&s).unwrap_or_default())?;
        Ok(RawRecordRow {
            id: row.get("id")?,
            source: row.get("source")?,
            source_url: row.get("source_url")?,
            playlist_name: row.get("playlist_name")?,
            event_date: row.get("event_date")?,
            genres,
            track_strings,
            extracted_count: row.get("extracted_count")?,
            failure_reason: row.get("failure_reason")?,
            parser_version: row.get("parser_version")?,
        })
    }

    fn row_to_artist(row: &rusqlite::Row) -> rusqlite::Result<Artist> {
        Ok(Artist {
            id: row.get("rowid")?,
            name: row.get("name")?,
            normalized_name: row.get("normalized_name")?,
            source: row.get("source")?,
        })
    }

    fn row_to_track(row: &rusqlite::Row) -> rusqlite::Result<Track> {
        let mashup_components = row
            .get::<_, Option<String>>("mashup_components")?
            .and_then(|s| serde_json::from_str(&s).ok());
        Ok(Track {
            id: row.get("rowid")?,
            title: row.get("title")?,
            normalized_title: row.get("normalized_title")?,
            primary_artist_id: row.get("primary_artist_id")?,
            is_remix: row.get::<_, i64>("is_remix")? != 0,
            is_mashup: row.get::<_, i64>("is_mashup")? != 0,
            mashup_components,
            source: row.get("source")?,
        })
    }

    fn row_to_playlist(row: &rusqlite::Row) -> rusqlite::Result<Playlist> {
        let genres: Vec<String> = row
            .get::<_, String>("genres")
            .map(|s| serde_json::from_str(&s).unwrap_or_default())?;
        Ok(Playlist {
            id: row.get("rowid")?,
            raw_record_id: row.get("raw_record_id")?,
            source: row.get("source")?,
            source_url: row.get("source_url")?,
            name: row.get("name")?,
            event_date: row.get("event_date")?,
            genres,
        })
    }
}

impl GraphStore for SqliteGraphStore {
    // ==================== Raw tier ====================

    fn insert_raw_record(&self, record: &RawRecordRow) -> Result<bool, StoreError> {
        // The gate should have synthesized a reason already; this is the
        // same rule the schema CHECK enforces.
        if record.extracted_count == 0 && record.failure_reason.is_none() {
            return Err(StoreError::MissingFailureReason(record.id.clone()));
        }

        let conn = self.conn.lock().unwrap();
        let changed = conn.execute(
            r#"
            INSERT INTO raw_records (
                id, source, source_url, playlist_name, event_date,
                genres, track_strings, extracted_count, failure_reason, parser_version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ON CONFLICT(id) DO NOTHING
            "#,
            params![
                record.id,
                record.source,
                record.source_url,
                record.playlist_name,
                record.event_date,
                serde_json::to_string(&record.genres).unwrap_or_else(|_| "[]".to_string()),
                serde_json::to_string(&record.track_strings)
                    .unwrap_or_else(|_| "[]".to_string()),
                record.extracted_count,
                record.failure_reason,
                record.parser_version,
            ],
        )?;
        Ok(changed > 0)
    }

    fn get_raw_record(&self, id: &str) -> Result<Option<RawRecordRow>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let result = conn
            .query_row(
                "SELECT * FROM raw_records WHERE id = ?1",
                params![id],
                Self::row_to_raw_record,
            )
            .optional()?;
        Ok(result)
    }

    // ==================== Resolved tier ====================

    fn get_artist_by_key(&self, normalized_name: &str) -> Result<Option<Artist>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let result = conn
            .query_row(
                "SELECT rowid, * FROM artists WHERE normalized_name = ?1",
                params![normalized_name],
                Self::row_to_artist,
            )
            .optional()?;
        Ok(result)
    }

    fn upsert_artist(
        &self,
        name: &str,
        normalized_name: &str,
        source: &str,
    ) -> Result<i64, StoreError> {
        // Redundant with the schema CHECK so a reserved name is rejected with
        // a precise error instead of a raw constraint message.
        if is_denied_name(normalized_name) {
            return Err(StoreError::ReservedName(normalized_name.to_string()));
        }

        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO artists (name, normalized_name, source) VALUES (?1, ?2, ?3)
             ON CONFLICT(normalized_name) DO NOTHING",
            params![name, normalized_name, source],
        )?;
        let id = conn.query_row(
            "SELECT rowid FROM artists WHERE normalized_name = ?1",
            params![normalized_name],
            |r| r.get(0),
        )?;
        Ok(id)
    }

    fn update_artist_display(
        &self,
        artist_id: i64,
        name: &str,
        source: &str,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE artists SET name = ?2, source = ?3 WHERE rowid = ?1",
            params![artist_id, name, source],
        )?;
        Ok(())
    }

    fn get_track_by_key(
        &self,
        normalized_title: &str,
        primary_artist_id: i64,
    ) -> Result<Option<Track>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let result = conn
            .query_row(
                "SELECT rowid, * FROM tracks WHERE normalized_title = ?1 AND primary_artist_id = ?2",
                params![normalized_title, primary_artist_id],
                Self::row_to_track,
            )
            .optional()?;
        Ok(result)
    }

    fn upsert_track(&self, track: &NewTrack) -> Result<i64, StoreError> {
        let mashup_json = track
            .mashup_components
            .as_ref()
            .map(|c| serde_json::to_string(c).unwrap_or_else(|_| "[]".to_string()));

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO tracks (
                title, normalized_title, primary_artist_id,
                is_remix, is_mashup, mashup_components, source
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(normalized_title, primary_artist_id) DO NOTHING
            "#,
            params![
                track.title,
                track.normalized_title,
                track.primary_artist_id,
                track.is_remix as i64,
                track.is_mashup as i64,
                mashup_json,
                track.source,
            ],
        )?;
        let id = conn.query_row(
            "SELECT rowid FROM tracks WHERE normalized_title = ?1 AND primary_artist_id = ?2",
            params![track.normalized_title, track.primary_artist_id],
            |r| r.get(0),
        )?;
        Ok(id)
    }

    fn merge_track(
        &self,
        track_id: i64,
        incoming: &NewTrack,
        overwrite_display: bool,
    ) -> Result<(), StoreError> {
        let mashup_json = incoming
            .mashup_components
            .as_ref()
            .map(|c| serde_json::to_string(c).unwrap_or_else(|_| "[]".to_string()));

        let conn = self.conn.lock().unwrap();
        // COALESCE keeps a populated field: a later null never overwrites,
        // a later non-null only fills a gap. Flags accumulate.
        conn.execute(
            r#"
            UPDATE tracks SET
                mashup_components = COALESCE(mashup_components, ?2),
                is_remix = MAX(is_remix, ?3),
                is_mashup = MAX(is_mashup, ?4),
                title = CASE WHEN ?5 THEN ?6 ELSE title END,
                source = CASE WHEN ?5 THEN ?7 ELSE source END
            WHERE rowid = ?1
            "#,
            params![
                track_id,
                mashup_json,
                incoming.is_remix as i64,
                incoming.is_mashup as i64,
                overwrite_display as i64,
                incoming.title,
                incoming.source,
            ],
        )?;
        Ok(())
    }

    fn link_track_artist(
        &self,
        track_id: i64,
        artist_id: i64,
        role: Role,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO track_artists (track_id, artist_id, role) VALUES (?1, ?2, ?3)
             ON CONFLICT(track_id, artist_id, role) DO NOTHING",
            params![track_id, artist_id, role.as_i64()],
        )?;
        Ok(())
    }

    fn artists_for_track(&self, track_id: i64) -> Result<Vec<(Artist, Role)>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT a.rowid, a.*, ta.role FROM track_artists ta
             JOIN artists a ON a.rowid = ta.artist_id
             WHERE ta.track_id = ?1
             ORDER BY ta.role, a.rowid",
        )?;
        let rows = stmt
            .query_map(params![track_id], |row| {
                let artist = Self::row_to_artist(row)?;
                let role_value: i64 = row.get("role")?;
                Ok((artist, role_value))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        rows.into_iter()
            .map(|(artist, role_value)| {
                let role = Role::parse(role_value).ok_or_else(|| {
                    StoreError::ConstraintViolation(format!("unknown role value {}", role_value))
                })?;
                Ok((artist, role))
            })
            .collect()
    }

    // ==================== Playlist + aggregated tier ====================

    fn ingest_playlist(
        &self,
        playlist: &NewPlaylist,
        track_slots: &[Option<i64>],
    ) -> Result<PlaylistIngest, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;

        let changed = tx.execute(
            r#"
            INSERT INTO playlists (raw_record_id, source, source_url, name, event_date, genres)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(raw_record_id) DO NOTHING
            "#,
            params![
                playlist.raw_record_id,
                playlist.source,
                playlist.source_url,
                playlist.name,
                playlist.event_date,
                serde_json::to_string(&playlist.genres).unwrap_or_else(|_| "[]".to_string()),
            ],
        )?;

        if changed == 0 {
            // Replay of an already-ingested record; entries and edges were
            // committed together with the playlist row, so nothing to do.
            let playlist_id = tx.query_row(
                "SELECT rowid FROM playlists WHERE raw_record_id = ?1",
                params![playlist.raw_record_id],
                |r| r.get(0),
            )?;
            tx.commit()?;
            return Ok(PlaylistIngest {
                playlist_id,
                created: false,
                edges_touched: 0,
            });
        }

        let playlist_id = tx.last_insert_rowid();
        // Skipped slots store no entry but still consume a position, so the
        // gap they leave is visible to pairing and to rebuilds.
        let mut entries = Vec::with_capacity(track_slots.len());
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO playlist_entries (playlist_id, position, track_id) VALUES (?1, ?2, ?3)",
            )?;
            for (index, slot) in track_slots.iter().enumerate() {
                if let Some(track_id) = slot {
                    let position = (index + 1) as i64;
                    stmt.execute(params![playlist_id, position, track_id])?;
                    entries.push((position, *track_id));
                }
            }
        }

        let pairs = graph::consecutive_pairs(&entries);
        let edges_touched = graph::apply_edge_increments(&tx, &pairs)?;
        tx.commit()?;

        Ok(PlaylistIngest {
            playlist_id,
            created: true,
            edges_touched,
        })
    }

    fn get_playlist_by_record(&self, raw_record_id: &str) -> Result<Option<Playlist>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let result = conn
            .query_row(
                "SELECT rowid, * FROM playlists WHERE raw_record_id = ?1",
                params![raw_record_id],
                Self::row_to_playlist,
            )
            .optional()?;
        Ok(result)
    }

    fn playlist_entry_tracks(&self, playlist_id: i64) -> Result<Vec<i64>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT track_id FROM playlist_entries WHERE playlist_id = ?1 ORDER BY position",
        )?;
        let ids = stmt
            .query_map(params![playlist_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        Ok(ids)
    }

    fn get_edge(&self, track_a: i64, track_b: i64) -> Result<Option<AdjacencyEdge>, StoreError> {
        let (low, high) = (track_a.min(track_b), track_a.max(track_b));
        let conn = self.conn.lock().unwrap();
        let result = conn
            .query_row(
                "SELECT track_a, track_b, occurrence_count FROM adjacency_edges
                 WHERE track_a = ?1 AND track_b = ?2",
                params![low, high],
                |row| {
                    Ok(AdjacencyEdge {
                        track_a: row.get(0)?,
                        track_b: row.get(1)?,
                        occurrence_count: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(result)
    }

    fn edges_for_track(&self, track_id: i64) -> Result<Vec<AdjacencyEdge>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT track_a, track_b, occurrence_count FROM adjacency_edges
             WHERE track_a = ?1 OR track_b = ?1
             ORDER BY occurrence_count DESC",
        )?;
        let edges = stmt
            .query_map(params![track_id], |row| {
                Ok(AdjacencyEdge {
                    track_a: row.get(0)?,
                    track_b: row.get(1)?,
                    occurrence_count: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(edges)
    }

    fn rebuild_edges(&self) -> Result<usize, StoreError> {
        let mut conn = self.conn.lock().unwrap();
        graph::rebuild(&mut conn)
    }

    // ==================== Introspection ====================

    fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.conn.lock().unwrap();
        let count = |sql: &str| -> Result<i64, rusqlite::Error> {
            conn.query_row(sql, [], |r| r.get(0))
        };
        Ok(StoreStats {
            raw_records: count("SELECT COUNT(*) FROM raw_records")?,
            failed_records: count(
                "SELECT COUNT(*) FROM raw_records WHERE failure_reason IS NOT NULL",
            )?,
            artists: count("SELECT COUNT(*) FROM artists")?,
            tracks: count("SELECT COUNT(*) FROM tracks")?,
            playlists: count("SELECT COUNT(*) FROM playlists")?,
            playlist_entries: count("SELECT COUNT(*) FROM playlist_entries")?,
            edges: count("SELECT COUNT(*) FROM adjacency_edges")?,
            total_edge_weight: count(
                "SELECT COALESCE(SUM(occurrence_count), 0) FROM adjacency_edges",
            )?,
        })
    }
}
