//! Identity resolver: parsed track strings to stored artist and track rows.
//!
//! Artists converge on normalized name, tracks on (normalized title, primary
//! artist). Matching is exact on normalized keys; no fuzzy matching, so two
//! spellings that normalize differently stay distinct entities.

use crate::graph_store::{GraphStore, NewTrack, Role, StoreError};
use crate::track_parse::{is_denied_name, normalize_name, ParsedTrack};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ResolveError {
    /// Every credited artist was a reserved placeholder; the track cannot be
    /// attributed and is skipped.
    #[error("no attributable artist for track '{0}'")]
    InsufficientAttribution(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Resolution policy knobs.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Fold accented characters to ASCII when building normalized keys.
    pub strip_diacritics: bool,
    /// Sources ordered from most to least trusted. A display spelling is
    /// replaced only when the incoming source ranks strictly higher than the
    /// one that wrote it.
    pub source_priority: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            strip_diacritics: true,
            source_priority: Vec::new(),
        }
    }
}

impl ResolverConfig {
    /// Position in the priority list; unlisted sources rank below all listed
    /// ones and never overwrite each other.
    fn rank(&self, source: &str) -> usize {
        self.source_priority
            .iter()
            .position(|s| s == source)
            .unwrap_or(usize::MAX)
    }

    fn outranks(&self, incoming: &str, existing: &str) -> bool {
        self.rank(incoming) < self.rank(existing)
    }
}

/// Resolves parsed tracks against the store.
pub struct Resolver<'a> {
    store: &'a dyn GraphStore,
    config: ResolverConfig,
}

impl<'a> Resolver<'a> {
    pub fn new(store: &'a dyn GraphStore, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    /// Normalized names for a credited artist list, with reserved
    /// placeholders dropped. Order is preserved.
    fn attributable(&self, names: &[String]) -> Vec<(String, String)> {
        names
            .iter()
            .filter_map(|raw| {
                let normalized = normalize_name(raw, self.config.strip_diacritics);
                if normalized.is_empty() || is_denied_name(&normalized) {
                    debug!(name = %raw, "dropping placeholder artist credit");
                    None
                } else {
                    Some((raw.clone(), normalized))
                }
            })
            .collect()
    }

    /// Insert-or-reuse one artist, applying the display overwrite policy.
    fn resolve_artist(&self, raw: &str, normalized: &str, source: &str) -> Result<i64, StoreError> {
        match self.store.get_artist_by_key(normalized)? {
            Some(existing) => {
                if existing.name != raw && self.config.outranks(source, &existing.source) {
                    self.store
                        .update_artist_display(existing.id, raw, source)?;
                }
                Ok(existing.id)
            }
            None => self.store.upsert_artist(raw, normalized, source),
        }
    }

    /// Resolve one parsed track to a stored track id, creating or merging
    /// artist and track rows as needed.
    pub fn resolve_track(&self, parsed: &ParsedTrack, source: &str) -> Result<i64, ResolveError> {
        let primaries = self.attributable(&parsed.primary_artists);
        if primaries.is_empty() {
            return Err(ResolveError::InsufficientAttribution(parsed.title.clone()));
        }

        let mut primary_ids = Vec::with_capacity(primaries.len());
        for (raw, normalized) in &primaries {
            primary_ids.push(self.resolve_artist(raw, normalized, source)?);
        }

        let normalized_title = normalize_name(&parsed.title, self.config.strip_diacritics);
        let incoming = NewTrack {
            title: parsed.title.clone(),
            normalized_title: normalized_title.clone(),
            primary_artist_id: primary_ids[0],
            is_remix: parsed.is_remix,
            is_mashup: parsed.is_mashup,
            mashup_components: if parsed.mashup_components.is_empty() {
                None
            } else {
                Some(parsed.mashup_components.clone())
            },
            source: source.to_string(),
        };

        let track_id = match self
            .store
            .get_track_by_key(&normalized_title, primary_ids[0])?
        {
            Some(existing) => {
                let overwrite = self.config.outranks(source, &existing.source);
                self.store.merge_track(existing.id, &incoming, overwrite)?;
                existing.id
            }
            None => self.store.upsert_track(&incoming)?,
        };

        for artist_id in &primary_ids {
            self.store
                .link_track_artist(track_id, *artist_id, Role::Primary)?;
        }
        for (role, names) in [
            (Role::Featured, &parsed.featured_artists),
            (Role::Remixer, &parsed.remixer_artists),
            (Role::Producer, &parsed.producer_artists),
        ] {
            for (raw, normalized) in self.attributable(names) {
                let artist_id = self.resolve_artist(&raw, &normalized, source)?;
                self.store.link_track_artist(track_id, artist_id, role)?;
            }
        }

        Ok(track_id)
    }
}
