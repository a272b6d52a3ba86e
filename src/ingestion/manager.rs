//! Batch ingestion orchestration.
//!
//! Pipeline per record: parse every track string (pure, parallel across the
//! batch), gate the outcomes into a raw-tier row, resolve surviving tracks to
//! stored identities, then persist the playlist and its edge increments in
//! one transaction. A record whose fingerprint and playlist are both stored
//! is a replay and is skipped; a fingerprint without its playlist means an
//! earlier run stopped between the two commits, and the record's derived
//! data is completed instead.

use super::gate::{self, ParseOutcomes};
use super::models::RawRecord;
use super::resolver::{ResolveError, Resolver, ResolverConfig};
use crate::graph_store::{GraphStore, NewPlaylist, StoreError};
use crate::track_parse::parse_track_string;
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("input error: {0}")]
    Input(#[from] anyhow::Error),
}

/// Counters for one batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub started_at: String,
    pub records_total: usize,
    /// Records whose playlist and edges were written this run.
    pub records_ingested: usize,
    /// Records already present by fingerprint; nothing was written.
    pub records_replayed: usize,
    /// Records stored in the raw tier with a failure reason and no playlist.
    pub records_failed: usize,
    pub tracks_resolved: usize,
    /// Parsed tracks dropped for lacking any attributable artist.
    pub tracks_skipped: usize,
    pub edges_touched: usize,
}

pub struct IngestManager {
    store: Arc<dyn GraphStore>,
    resolver_config: ResolverConfig,
}

impl IngestManager {
    pub fn new(store: Arc<dyn GraphStore>, resolver_config: ResolverConfig) -> Self {
        Self {
            store,
            resolver_config,
        }
    }

    /// Ingest a batch of raw records. Per-record and per-track problems are
    /// counted and skipped; only storage failures abort the batch.
    pub fn ingest_batch(&self, records: &[RawRecord]) -> Result<BatchReport, IngestError> {
        let batch_id = Uuid::new_v4();
        let started = std::time::Instant::now();
        info!(%batch_id, records = records.len(), "starting ingestion batch");

        // Parsing is pure, so the whole batch parses in parallel before any
        // database work begins.
        let parsed: Vec<ParseOutcomes> = records
            .par_iter()
            .map(|record| {
                record
                    .track_strings
                    .iter()
                    .map(|s| parse_track_string(s))
                    .collect()
            })
            .collect();

        let resolver = Resolver::new(self.store.as_ref(), self.resolver_config.clone());
        let mut report = BatchReport {
            started_at: chrono::Utc::now().to_rfc3339(),
            records_total: records.len(),
            ..BatchReport::default()
        };

        for (record, outcomes) in records.iter().zip(&parsed) {
            let row = gate::build_raw_row(record, outcomes);
            if !self.store.insert_raw_record(&row)? {
                // The raw row committed on an earlier run. It is only a
                // replay if its playlist committed too; otherwise that run
                // stopped between the two commits and the derived data still
                // has to be written.
                if row.extracted_count == 0
                    || self.store.get_playlist_by_record(&row.id)?.is_some()
                {
                    report.records_replayed += 1;
                    continue;
                }
                info!(record = %row.id, source = %record.source, "resuming interrupted record");
            }
            if row.extracted_count == 0 {
                report.records_failed += 1;
                continue;
            }

            // One slot per source track string. A slot that fails to parse
            // or resolve stays None, preserving the position gap so former
            // neighbors are never paired across it.
            let mut track_slots = Vec::with_capacity(outcomes.len());
            for outcome in outcomes {
                let parsed_track = match outcome {
                    Ok(parsed_track) => parsed_track,
                    Err(_) => {
                        track_slots.push(None);
                        continue;
                    }
                };
                match resolver.resolve_track(parsed_track, &record.source) {
                    Ok(track_id) => track_slots.push(Some(track_id)),
                    Err(ResolveError::InsufficientAttribution(title)) => {
                        warn!(%title, source = %record.source, "skipping unattributable track");
                        report.tracks_skipped += 1;
                        track_slots.push(None);
                    }
                    Err(ResolveError::Store(e)) => return Err(e.into()),
                }
            }
            report.tracks_resolved += track_slots.iter().filter(|slot| slot.is_some()).count();

            let playlist = NewPlaylist {
                raw_record_id: row.id.clone(),
                source: record.source.clone(),
                source_url: record.source_url.clone(),
                name: record.playlist_name.clone(),
                event_date: record.event_date.clone(),
                genres: record.genres.clone(),
            };
            let ingest = self.store.ingest_playlist(&playlist, &track_slots)?;
            report.edges_touched += ingest.edges_touched;
            report.records_ingested += 1;
        }

        info!(
            %batch_id,
            ingested = report.records_ingested,
            replayed = report.records_replayed,
            failed = report.records_failed,
            tracks = report.tracks_resolved,
            edges = report.edges_touched,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ingestion batch finished"
        );
        Ok(report)
    }
}

/// Read raw records from a JSONL file, one record per non-empty line.
pub fn read_records_jsonl<P: AsRef<Path>>(path: P) -> Result<Vec<RawRecord>> {
    let file = File::open(path.as_ref())
        .with_context(|| format!("Failed to open input file: {:?}", path.as_ref()))?;
    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: RawRecord = serde_json::from_str(&line)
            .with_context(|| format!("Malformed record on line {}", index + 1))?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph_store::SqliteGraphStore;

    fn manager() -> (Arc<SqliteGraphStore>, IngestManager) {
        let store = Arc::new(SqliteGraphStore::in_memory().unwrap());
        let manager = IngestManager::new(store.clone(), ResolverConfig::default());
        (store, manager)
    }

    fn record(name: &str, tracks: &[&str]) -> RawRecord {
        RawRecord {
            source: "testsource".to_string(),
            source_url: None,
            playlist_name: Some(name.to_string()),
            event_date: None,
            genres: vec!["house".to_string()],
            track_strings: tracks.iter().map(|s| s.to_string()).collect(),
            failure_reason: None,
        }
    }

    #[test]
    fn test_batch_end_to_end() {
        let (store, manager) = manager();
        let records = vec![
            record("Mix 1", &["A - One", "B - Two", "C - Three"]),
            record("Mix 2", &["A - One", "D - Four"]),
        ];

        let report = manager.ingest_batch(&records).unwrap();
        assert_eq!(report.records_total, 2);
        assert_eq!(report.records_ingested, 2);
        assert_eq!(report.records_failed, 0);
        assert_eq!(report.tracks_resolved, 5);
        assert_eq!(report.edges_touched, 3);

        let stats = store.stats().unwrap();
        assert_eq!(stats.raw_records, 2);
        assert_eq!(stats.playlists, 2);
        // "A - One" deduplicated across records.
        assert_eq!(stats.tracks, 4);
        assert_eq!(stats.edges, 3);
    }

    #[test]
    fn test_replay_batch_is_noop() {
        let (store, manager) = manager();
        let records = vec![record("Mix", &["A - One", "B - Two"])];

        manager.ingest_batch(&records).unwrap();
        let replay = manager.ingest_batch(&records).unwrap();
        assert_eq!(replay.records_replayed, 1);
        assert_eq!(replay.records_ingested, 0);
        assert_eq!(replay.edges_touched, 0);

        let stats = store.stats().unwrap();
        assert_eq!(stats.raw_records, 1);
        assert_eq!(stats.total_edge_weight, 1);
    }

    #[test]
    fn test_failed_record_lands_in_raw_tier_only() {
        let (store, manager) = manager();
        let records = vec![record("Dead", &["no separator at all", "ID - ID"])];

        let report = manager.ingest_batch(&records).unwrap();
        assert_eq!(report.records_failed, 1);
        assert_eq!(report.records_ingested, 0);

        let stats = store.stats().unwrap();
        assert_eq!(stats.raw_records, 1);
        assert_eq!(stats.failed_records, 1);
        assert_eq!(stats.playlists, 0);
        assert_eq!(stats.tracks, 0);
    }

    #[test]
    fn test_unattributable_track_skipped_but_playlist_kept() {
        let (store, manager) = manager();
        let records = vec![record(
            "Mix",
            &["A - One", "Unknown Artist - Mystery", "B - Two"],
        )];

        let report = manager.ingest_batch(&records).unwrap();
        assert_eq!(report.records_ingested, 1);
        assert_eq!(report.tracks_resolved, 2);
        assert_eq!(report.tracks_skipped, 1);

        // The skipped slot keeps its position: the survivors are two
        // positions apart and must not be linked.
        let stats = store.stats().unwrap();
        assert_eq!(stats.playlist_entries, 2);
        assert_eq!(stats.edges, 0);
    }

    #[test]
    fn test_unparsed_track_leaves_gap_unbridged() {
        let (store, manager) = manager();
        let records = vec![record("Mix", &["A - One", "ID - ID", "B - Two"])];

        let report = manager.ingest_batch(&records).unwrap();
        assert_eq!(report.records_ingested, 1);
        assert_eq!(report.tracks_resolved, 2);

        let stats = store.stats().unwrap();
        assert_eq!(stats.edges, 0);
        // An adjacent run after the gap still pairs normally.
        let records = vec![record("Mix 2", &["C - Three", "no parse", "D - Four", "E - Five"])];
        manager.ingest_batch(&records).unwrap();
        assert_eq!(store.stats().unwrap().edges, 1);
    }

    #[test]
    fn test_resume_after_interrupted_run() {
        let (store, manager) = manager();
        let record = record("Mix", &["A - One", "B - Two"]);

        // First run stopped after the raw-tier commit, before the playlist
        // transaction.
        let outcomes: ParseOutcomes = record
            .track_strings
            .iter()
            .map(|s| parse_track_string(s))
            .collect();
        let row = gate::build_raw_row(&record, &outcomes);
        assert!(store.insert_raw_record(&row).unwrap());
        assert!(store.get_playlist_by_record(&row.id).unwrap().is_none());

        // Re-running the same input completes the record instead of
        // classifying it as a replay.
        let report = manager.ingest_batch(&[record.clone()]).unwrap();
        assert_eq!(report.records_replayed, 0);
        assert_eq!(report.records_ingested, 1);

        let stats = store.stats().unwrap();
        assert_eq!(stats.raw_records, 1);
        assert_eq!(stats.playlists, 1);
        assert_eq!(stats.edges, 1);

        // A third run is a true replay.
        let replay = manager.ingest_batch(&[record]).unwrap();
        assert_eq!(replay.records_replayed, 1);
        assert_eq!(store.stats().unwrap().total_edge_weight, 1);
    }

    #[test]
    fn test_incremental_equals_rebuild() {
        let (store, manager) = manager();
        let records = vec![
            record("Mix 1", &["A - One", "B - Two", "C - Three"]),
            record("Mix 2", &["B - Two", "C - Three"]),
        ];
        manager.ingest_batch(&records).unwrap();
        let before = store.stats().unwrap();

        let rebuilt = store.rebuild_edges().unwrap();
        let after = store.stats().unwrap();
        assert_eq!(rebuilt as i64, before.edges);
        assert_eq!(after, before);
    }

    #[test]
    fn test_read_records_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.jsonl");
        std::fs::write(
            &path,
            concat!(
                r#"{"source":"s","playlist_name":"Mix","tracks":["A - One"]}"#,
                "\n\n",
                r#"{"source":"s","genres":"house","tracks":["B - Two"]}"#,
                "\n",
            ),
        )
        .unwrap();

        let records = read_records_jsonl(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].playlist_name.as_deref(), Some("Mix"));
        assert_eq!(records[1].genres, vec!["house"]);

        std::fs::write(&path, "not json\n").unwrap();
        assert!(read_records_jsonl(&path).is_err());
    }
}
