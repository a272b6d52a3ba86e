//! Inbound record model and content fingerprinting.

use crate::track_parse::PARSER_VERSION;
use serde::{Deserialize, Deserializer, Serialize};
use sha2::{Digest, Sha256};

/// One scraped playlist as it arrives from a source, before parsing.
///
/// `genres` accepts either a single string or a list in the inbound JSON;
/// sources disagree on the shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub source: String,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub playlist_name: Option<String>,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default, deserialize_with = "string_or_list")]
    pub genres: Vec<String>,
    #[serde(default, alias = "tracks")]
    pub track_strings: Vec<String>,
    /// Reason reported by the upstream scraper when it already knows the
    /// record is dead. The gate keeps it instead of synthesizing one.
    #[serde(default)]
    pub failure_reason: Option<String>,
}

fn string_or_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrList {
        One(String),
        Many(Vec<String>),
    }
    Ok(match StringOrList::deserialize(deserializer)? {
        StringOrList::One(s) => vec![s],
        StringOrList::Many(list) => list,
    })
}

impl RawRecord {
    /// Hex SHA-256 over every inbound field plus the parser version, in a
    /// fixed order with length prefixes so field boundaries cannot collide.
    /// Byte-identical records fingerprint identically; any differing field
    /// (or a parser upgrade) yields a new identity.
    pub fn fingerprint(&self) -> String {
        fn feed(hasher: &mut Sha256, value: &str) {
            hasher.update((value.len() as u64).to_le_bytes());
            hasher.update(value.as_bytes());
        }
        let mut hasher = Sha256::new();
        feed(&mut hasher, &self.source);
        feed(&mut hasher, self.source_url.as_deref().unwrap_or(""));
        feed(&mut hasher, self.playlist_name.as_deref().unwrap_or(""));
        feed(&mut hasher, self.event_date.as_deref().unwrap_or(""));
        for genre in &self.genres {
            feed(&mut hasher, genre);
        }
        for track in &self.track_strings {
            feed(&mut hasher, track);
        }
        hasher.update((PARSER_VERSION as u64).to_le_bytes());
        format!("{:x}", hasher.finalize())
    }
}
