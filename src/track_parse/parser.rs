//! Track string parser.
//!
//! Splits a raw scraped title string into a base title plus role-tagged
//! artist lists. Parsing is pure; unparseable input comes back as a typed
//! `ParseFailure`, never a panic, so one bad track cannot sink a batch.
//!
//! Rules:
//! - The first "-" separates artists from title (a " - " with surrounding
//!   spaces is preferred when present, so hyphenated names survive).
//! - A trailing `(... Remix)` is matched case-insensitively and names the
//!   remixers.
//! - Feat markers (`ft.`, `feat.`, `featuring`) are recognized in both the
//!   artist and the title segment.
//! - Multi-artist joins (`&`, `,`, `+`, ` x `, ` and `) split into an ordered
//!   primary artist list.
//! - `" vs "` in the title marks a mashup and records its components.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Version stamped into raw records produced with this parser. Bump on any
/// behavioral change so zero-extraction reasons stay attributable.
pub const PARSER_VERSION: u32 = 3;

lazy_static! {
    /// Trailing "(... Remix)" / "[... Remix]"; group 1 holds the remixer
    /// text, possibly empty for a bare "(Remix)".
    static ref RE_REMIX: Regex =
        Regex::new(r"(?i)\s*[(\[]\s*([^()\[\]]*?)\s*remix\s*[)\]]\s*$").unwrap();
    /// Trailing "(prod. X)" / "(produced by X)".
    static ref RE_PRODUCER: Regex =
        Regex::new(r"(?i)\s*[(\[]\s*prod(?:\.|uced)?(?:\s+by)?\s+([^()\[\]]+?)\s*[)\]]\s*$")
            .unwrap();
    /// Trailing feat clause in the title segment, parenthesized or bare.
    static ref RE_TITLE_FEAT: Regex =
        Regex::new(r"(?i)\s*[(\[]?\s*\b(?:featuring|feat\.?|ft\.?)\s+([^()\[\]]+?)\s*[)\]]?\s*$")
            .unwrap();
    /// Feat marker inside the artist segment.
    static ref RE_ARTIST_FEAT: Regex =
        Regex::new(r"(?i)\s+(?:featuring|feat\.?|ft\.?)\s+").unwrap();
    /// Join tokens between artist names.
    static ref RE_JOIN: Regex =
        Regex::new(r"(?i)\s*,\s*|\s*&\s*|\s*\+\s*|\s+x\s+|\s+and\s+").unwrap();
    /// Mashup separator in the title segment.
    static ref RE_VS: Regex = Regex::new(r"(?i)\s+vs\.?\s+").unwrap();
}

/// Tokens that stand in for an unidentified track title.
const PLACEHOLDER_TITLES: &[&str] = &["id", "???", "unknown", "tba", "n/a"];

/// Result of parsing a raw track string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedTrack {
    pub title: String,
    pub primary_artists: Vec<String>,
    pub featured_artists: Vec<String>,
    pub remixer_artists: Vec<String>,
    pub producer_artists: Vec<String>,
    pub is_remix: bool,
    pub is_mashup: bool,
    pub mashup_components: Vec<String>,
}

/// Typed parse failures; callers skip or flag, the batch continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    /// No "-" separator, so no artist/title boundary exists.
    #[error("no artist/title separator")]
    NoSeparator,
    /// An unresolved placeholder such as "ID - ID".
    #[error("unidentified placeholder track")]
    Placeholder,
    /// Nothing artist-like survives extraction.
    #[error("no artist extractable")]
    NoArtist,
}

fn split_artists(segment: &str) -> Vec<String> {
    RE_JOIN
        .split(segment)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_placeholder_title(title: &str) -> bool {
    let lowered = title.trim().to_lowercase();
    // "ID" placeholders are sometimes numbered: "ID 4"
    let base = lowered.trim_end_matches(|c: char| c.is_ascii_digit()).trim();
    PLACEHOLDER_TITLES.contains(&lowered.as_str()) || PLACEHOLDER_TITLES.contains(&base)
}

/// Parse a raw track string into title and role-tagged artist lists.
pub fn parse_track_string(raw: &str) -> Result<ParsedTrack, ParseFailure> {
    let raw = raw.trim();

    // Prefer a spaced separator; fall back to the first bare hyphen.
    let (artist_seg, title_seg) = match raw.split_once(" - ") {
        Some((a, t)) => (a, t),
        None => raw.split_once('-').ok_or(ParseFailure::NoSeparator)?,
    };

    let mut title = title_seg.trim().to_string();
    let mut is_remix = false;
    let mut remixer_artists = Vec::new();
    let mut featured_artists = Vec::new();
    let mut producer_artists = Vec::new();

    if let Some(caps) = RE_REMIX.captures(&title) {
        is_remix = true;
        let remixer_text = caps.get(1).map(|m| m.as_str().trim()).unwrap_or("");
        if !remixer_text.is_empty() {
            remixer_artists = split_artists(remixer_text);
        }
        let end = caps.get(0).map(|m| m.start()).unwrap_or(title.len());
        title.truncate(end);
    }

    if let Some(caps) = RE_PRODUCER.captures(&title) {
        if let Some(m) = caps.get(1) {
            producer_artists = split_artists(m.as_str());
        }
        let end = caps.get(0).map(|m| m.start()).unwrap_or(title.len());
        title.truncate(end);
    }

    if let Some(caps) = RE_TITLE_FEAT.captures(&title) {
        if let Some(m) = caps.get(1) {
            featured_artists.extend(split_artists(m.as_str()));
        }
        let end = caps.get(0).map(|m| m.start()).unwrap_or(title.len());
        title.truncate(end);
    }

    let title = title.trim().to_string();
    if title.is_empty() || is_placeholder_title(&title) {
        return Err(ParseFailure::Placeholder);
    }

    let mashup_components: Vec<String> = if RE_VS.is_match(&title) {
        RE_VS
            .split(&title)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        Vec::new()
    };
    let is_mashup = mashup_components.len() > 1;

    // Feat marker in the artist segment shifts the boundary between primary
    // and featured artists.
    let mut artist_feat_split = RE_ARTIST_FEAT.splitn(artist_seg.trim(), 2);
    let primary_seg = artist_feat_split.next().unwrap_or("").trim();
    if let Some(feat_seg) = artist_feat_split.next() {
        // Artist-segment features come before any title-segment ones.
        let mut from_artist_seg = split_artists(feat_seg);
        from_artist_seg.append(&mut featured_artists);
        featured_artists = from_artist_seg;
    }

    let primary_artists = split_artists(primary_seg);
    if primary_artists.is_empty() {
        return Err(ParseFailure::NoArtist);
    }

    Ok(ParsedTrack {
        title,
        primary_artists,
        featured_artists,
        remixer_artists,
        producer_artists,
        is_remix,
        is_mashup,
        mashup_components: if is_mashup {
            mashup_components
        } else {
            Vec::new()
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_artist_title() {
        let parsed = parse_track_string("Deadmau5 - Strobe").unwrap();
        assert_eq!(parsed.primary_artists, vec!["Deadmau5"]);
        assert_eq!(parsed.title, "Strobe");
        assert!(!parsed.is_remix);
        assert!(!parsed.is_mashup);
        assert!(parsed.featured_artists.is_empty());
    }

    #[test]
    fn test_feat_and_remix() {
        let parsed = parse_track_string("Artist A ft. Artist B - Track (Artist C Remix)").unwrap();
        assert_eq!(parsed.primary_artists, vec!["Artist A"]);
        assert_eq!(parsed.featured_artists, vec!["Artist B"]);
        assert_eq!(parsed.remixer_artists, vec!["Artist C"]);
        assert_eq!(parsed.title, "Track");
        assert!(parsed.is_remix);
    }

    #[test]
    fn test_feat_marker_variants() {
        for marker in ["ft.", "ft", "feat.", "feat", "featuring", "FT.", "Feat."] {
            let raw = format!("Artist A {} Artist B - Track", marker);
            let parsed = parse_track_string(&raw).unwrap();
            assert_eq!(parsed.primary_artists, vec!["Artist A"], "marker {marker}");
            assert_eq!(parsed.featured_artists, vec!["Artist B"], "marker {marker}");
        }
    }

    #[test]
    fn test_feat_in_title_segment() {
        let parsed = parse_track_string("Artist A - Track (feat. Artist B)").unwrap();
        assert_eq!(parsed.primary_artists, vec!["Artist A"]);
        assert_eq!(parsed.featured_artists, vec!["Artist B"]);
        assert_eq!(parsed.title, "Track");
    }

    #[test]
    fn test_ft_inside_word_is_not_a_marker() {
        let parsed = parse_track_string("Artist A - Left Alone").unwrap();
        assert_eq!(parsed.title, "Left Alone");
        assert!(parsed.featured_artists.is_empty());
    }

    #[test]
    fn test_multi_artist_joins() {
        let parsed = parse_track_string("A & B - Track").unwrap();
        assert_eq!(parsed.primary_artists, vec!["A", "B"]);

        let parsed = parse_track_string("A, B, C - Track").unwrap();
        assert_eq!(parsed.primary_artists, vec!["A", "B", "C"]);

        let parsed = parse_track_string("A x B - Track").unwrap();
        assert_eq!(parsed.primary_artists, vec!["A", "B"]);

        let parsed = parse_track_string("A and B - Track").unwrap();
        assert_eq!(parsed.primary_artists, vec!["A", "B"]);
    }

    #[test]
    fn test_join_order_preserved() {
        let parsed = parse_track_string("Zed & Alpha - Track").unwrap();
        assert_eq!(parsed.primary_artists, vec!["Zed", "Alpha"]);
    }

    #[test]
    fn test_no_separator_is_unidentified() {
        assert_eq!(
            parse_track_string("just some words"),
            Err(ParseFailure::NoSeparator)
        );
        assert_eq!(parse_track_string(""), Err(ParseFailure::NoSeparator));
    }

    #[test]
    fn test_id_id_is_placeholder() {
        assert_eq!(parse_track_string("ID - ID"), Err(ParseFailure::Placeholder));
        assert_eq!(
            parse_track_string("Artist A - ID 4"),
            Err(ParseFailure::Placeholder)
        );
        assert_eq!(
            parse_track_string("ID - ???"),
            Err(ParseFailure::Placeholder)
        );
    }

    #[test]
    fn test_empty_artist_segment() {
        assert_eq!(
            parse_track_string(" - Some Track"),
            Err(ParseFailure::NoArtist)
        );
    }

    #[test]
    fn test_bare_remix_tag_without_artist() {
        let parsed = parse_track_string("Artist A - Track (Remix)").unwrap();
        assert!(parsed.is_remix);
        assert!(parsed.remixer_artists.is_empty());
        assert_eq!(parsed.title, "Track");
    }

    #[test]
    fn test_remix_with_multiple_remixers() {
        let parsed = parse_track_string("Artist A - Track (B & C Remix)").unwrap();
        assert!(parsed.is_remix);
        assert_eq!(parsed.remixer_artists, vec!["B", "C"]);
    }

    #[test]
    fn test_remix_case_insensitive() {
        let parsed = parse_track_string("Artist A - Track (Artist C REMIX)").unwrap();
        assert!(parsed.is_remix);
        assert_eq!(parsed.remixer_artists, vec!["Artist C"]);
    }

    #[test]
    fn test_producer_tag() {
        let parsed = parse_track_string("Artist A - Track (prod. Artist D)").unwrap();
        assert_eq!(parsed.producer_artists, vec!["Artist D"]);
        assert_eq!(parsed.title, "Track");

        let parsed = parse_track_string("Artist A - Track (produced by D & E)").unwrap();
        assert_eq!(parsed.producer_artists, vec!["D", "E"]);
    }

    #[test]
    fn test_mashup() {
        let parsed = parse_track_string("Some DJ - Song One vs. Song Two").unwrap();
        assert!(parsed.is_mashup);
        assert_eq!(parsed.mashup_components, vec!["Song One", "Song Two"]);
    }

    #[test]
    fn test_hyphenated_artist_with_spaced_separator() {
        let parsed = parse_track_string("T-Pain - Buy U a Drank").unwrap();
        assert_eq!(parsed.primary_artists, vec!["T-Pain"]);
        assert_eq!(parsed.title, "Buy U a Drank");
    }

    #[test]
    fn test_deterministic() {
        let a = parse_track_string("Artist A ft. B - Track (C Remix)").unwrap();
        let b = parse_track_string("Artist A ft. B - Track (C Remix)").unwrap();
        assert_eq!(a, b);
    }
}
