//! Consecutive-pair edge derivation and the full-rebuild repair path.
//!
//! Only entries whose stored positions differ by exactly 1 are linked;
//! non-adjacent co-occurrence is excluded so the graph carries no transitive
//! noise. A track skipped during resolution keeps its position gap, so its
//! former neighbors are never bridged. Edge keys are the canonical
//! (min-id, max-id) pair, so scan direction can never produce reciprocal
//! duplicates.

use crate::graph_store::StoreError;
use rusqlite::{params, Connection};
use tracing::info;

/// Canonical edge keys for one playlist's (position, track id) entries,
/// ordered by position.
///
/// Entries separated by a position gap are not paired. Consecutive
/// occurrences of the same track carry no adjacency information and are
/// skipped.
pub fn consecutive_pairs(entries: &[(i64, i64)]) -> Vec<(i64, i64)> {
    entries
        .windows(2)
        .filter_map(|window| {
            let ((pos_a, a), (pos_b, b)) = (window[0], window[1]);
            if pos_b != pos_a + 1 || a == b {
                None
            } else {
                Some((a.min(b), a.max(b)))
            }
        })
        .collect()
}

/// Increment the weight of each pair's edge, creating edges as needed.
///
/// The `ON CONFLICT` upsert is the only serialization point between
/// concurrent writers; increments are atomic per observed pairing.
pub(crate) fn apply_edge_increments(
    conn: &Connection,
    pairs: &[(i64, i64)],
) -> Result<usize, StoreError> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO adjacency_edges (track_a, track_b, occurrence_count)
         VALUES (?1, ?2, 1)
         ON CONFLICT(track_a, track_b)
         DO UPDATE SET occurrence_count = occurrence_count + 1",
    )?;
    for &(track_a, track_b) in pairs {
        stmt.execute(params![track_a, track_b])?;
    }
    Ok(pairs.len())
}

/// Clear and recompute the entire edge set from stored playlist entries,
/// atomically. Used to repair corruption, not for routine ingestion.
pub(crate) fn rebuild(conn: &mut Connection) -> Result<usize, StoreError> {
    let tx = conn.transaction()?;
    tx.execute("DELETE FROM adjacency_edges", [])?;

    let playlist_ids: Vec<i64> = {
        let mut stmt = tx.prepare("SELECT rowid FROM playlists ORDER BY rowid")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<i64>>>()?;
        ids
    };

    let mut pairs_applied = 0usize;
    for playlist_id in &playlist_ids {
        let entries: Vec<(i64, i64)> = {
            let mut stmt = tx.prepare_cached(
                "SELECT position, track_id FROM playlist_entries
                 WHERE playlist_id = ?1 ORDER BY position",
            )?;
            let rows = stmt
                .query_map(params![playlist_id], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };
        pairs_applied += apply_edge_increments(&tx, &consecutive_pairs(&entries))?;
    }

    let edge_count: usize =
        tx.query_row("SELECT COUNT(*) FROM adjacency_edges", [], |row| row.get(0))?;
    tx.commit()?;

    info!(
        playlists = playlist_ids.len(),
        pairs = pairs_applied,
        edges = edge_count,
        "rebuilt adjacency edge set"
    );
    Ok(edge_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contiguous(ids: &[i64]) -> Vec<(i64, i64)> {
        ids.iter()
            .enumerate()
            .map(|(index, id)| ((index + 1) as i64, *id))
            .collect()
    }

    #[test]
    fn test_pairs_are_strictly_consecutive() {
        let entries = contiguous(&[1, 2, 3]);
        assert_eq!(consecutive_pairs(&entries), vec![(1, 2), (2, 3)]);
        // No transitive (1, 3) pair.
        assert!(!consecutive_pairs(&entries).contains(&(1, 3)));
    }

    #[test]
    fn test_position_gap_produces_no_pair() {
        // Positions 1 and 3: the slot between them was dropped upstream.
        assert_eq!(consecutive_pairs(&[(1, 10), (3, 20)]), vec![]);
        // The surviving adjacent run still pairs.
        assert_eq!(
            consecutive_pairs(&[(1, 10), (3, 20), (4, 30)]),
            vec![(20, 30)]
        );
    }

    #[test]
    fn test_pairs_use_canonical_order() {
        assert_eq!(consecutive_pairs(&contiguous(&[5, 2])), vec![(2, 5)]);
        assert_eq!(consecutive_pairs(&contiguous(&[2, 5])), vec![(2, 5)]);
    }

    #[test]
    fn test_self_pairs_skipped() {
        assert_eq!(consecutive_pairs(&contiguous(&[7, 7, 8])), vec![(7, 8)]);
    }

    #[test]
    fn test_short_playlists_have_no_pairs() {
        assert!(consecutive_pairs(&[]).is_empty());
        assert!(consecutive_pairs(&[(1, 42)]).is_empty());
    }

    #[test]
    fn test_pair_count_is_entries_minus_one() {
        let ids: Vec<i64> = (1..=50).collect();
        assert_eq!(consecutive_pairs(&contiguous(&ids)).len(), ids.len() - 1);
    }
}
