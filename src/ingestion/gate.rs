//! Validation gate between parsing and the raw tier.
//!
//! Every inbound record is appended to the raw tier, including ones that
//! yielded nothing; a zero-extraction record must carry a failure reason so
//! dead input stays attributable to the parser version that produced it.

use super::models::RawRecord;
use crate::graph_store::RawRecordRow;
use crate::track_parse::{ParseFailure, ParsedTrack, PARSER_VERSION};
use tracing::warn;

/// Per-string parse outcomes for one record.
pub type ParseOutcomes = Vec<Result<ParsedTrack, ParseFailure>>;

/// Build the raw-tier row for a record and its parse outcomes.
///
/// When nothing was extracted, the upstream reason is kept if the scraper
/// supplied one; otherwise a reason is synthesized from the parse failure
/// breakdown so the row passes the storage constraint either way.
pub fn build_raw_row(record: &RawRecord, outcomes: &ParseOutcomes) -> RawRecordRow {
    let extracted_count = outcomes.iter().filter(|o| o.is_ok()).count() as i64;

    let failure_reason = if extracted_count == 0 {
        let reason = record
            .failure_reason
            .clone()
            .unwrap_or_else(|| zero_extraction_reason(outcomes));
        warn!(
            source = %record.source,
            playlist = record.playlist_name.as_deref().unwrap_or("<unnamed>"),
            track_strings = record.track_strings.len(),
            reason = %reason,
            "record yielded no tracks"
        );
        Some(reason)
    } else {
        None
    };

    RawRecordRow {
        id: record.fingerprint(),
        source: record.source.clone(),
        source_url: record.source_url.clone(),
        playlist_name: record.playlist_name.clone(),
        event_date: record.event_date.clone(),
        genres: record.genres.clone(),
        track_strings: record.track_strings.clone(),
        extracted_count,
        failure_reason,
        parser_version: PARSER_VERSION as i64,
    }
}

fn zero_extraction_reason(outcomes: &ParseOutcomes) -> String {
    if outcomes.is_empty() {
        return format!("empty record, no track strings (parser v{})", PARSER_VERSION);
    }
    let mut counts: Vec<(&str, usize)> = vec![
        ("no separator", 0),
        ("placeholder", 0),
        ("no artist", 0),
    ];
    for outcome in outcomes {
        match outcome {
            Err(ParseFailure::NoSeparator) => counts[0].1 += 1,
            Err(ParseFailure::Placeholder) => counts[1].1 += 1,
            Err(ParseFailure::NoArtist) => counts[2].1 += 1,
            Ok(_) => {}
        }
    }
    let breakdown = counts
        .iter()
        .filter(|(_, n)| *n > 0)
        .map(|(label, n)| format!("{} x {}", n, label))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "zero tracks extracted by parser v{}: {}",
        PARSER_VERSION, breakdown
    )
}
