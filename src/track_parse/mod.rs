//! Pure parsing of scraped track strings.
//!
//! Turns free text like `"Artist A ft. Artist B - Track (Artist C Remix)"`
//! into a base title plus role-tagged artist lists, and canonicalizes artist
//! names into comparable keys. Everything in here is deterministic and does
//! no I/O; failures are returned as typed values for the caller's
//! skip-or-flag policy.

mod normalize;
mod parser;

pub use normalize::{is_denied_name, normalize_name, DENY_LIST};
pub use parser::{parse_track_string, ParseFailure, ParsedTrack, PARSER_VERSION};
