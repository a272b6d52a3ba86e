//! Display-name canonicalization.
//!
//! `normalize_name` maps a display name to the key used for artist identity:
//! lowercase, trimmed, internal whitespace collapsed, diacritics optionally
//! folded to ASCII. The function is idempotent and total over non-empty
//! strings; two spellings that normalize identically are one artist.

/// Reserved placeholder names that must never become artist entities.
///
/// Checked against both the raw and the normalized form. The same list is
/// baked into the artists table CHECK constraint (see `graph_store::schema`).
pub const DENY_LIST: &[&str] = &[
    "unknown",
    "unknown artist",
    "unknown dj",
    "various",
    "various artists",
    "va",
    "n/a",
    "na",
    "id",
    "tba",
    "?",
];

/// Fold a single character's diacritic to its ASCII base form.
///
/// Covers the Latin-1 Supplement and the common Latin Extended-A letters seen
/// in scraped artist names. Anything unmapped passes through unchanged.
fn fold_char(c: char) -> Option<&'static str> {
    let folded = match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'ç' | 'ć' | 'ĉ' | 'č' => "c",
        'ď' | 'đ' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => "e",
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => "g",
        'ĥ' | 'ħ' => "h",
        'ì' | 'í' | 'î' | 'ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => "i",
        'ĵ' => "j",
        'ķ' => "k",
        'ĺ' | 'ļ' | 'ľ' | 'ł' => "l",
        'ñ' | 'ń' | 'ņ' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => "o",
        'ŕ' | 'ŗ' | 'ř' => "r",
        'ś' | 'ŝ' | 'ş' | 'š' => "s",
        'ţ' | 'ť' | 'ŧ' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => "u",
        'ŵ' => "w",
        'ý' | 'ÿ' | 'ŷ' => "y",
        'ź' | 'ż' | 'ž' => "z",
        'æ' => "ae",
        'œ' => "oe",
        'ß' => "ss",
        'þ' => "th",
        'ð' => "dh",
        _ => return None,
    };
    Some(folded)
}

/// Canonicalize a display name into a comparable key.
pub fn normalize_name(raw: &str, strip_diacritics: bool) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for c in raw.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            if !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
        }
        for lc in c.to_lowercase() {
            match fold_char(lc) {
                Some(folded) if strip_diacritics => out.push_str(folded),
                _ => out.push(lc),
            }
        }
    }
    out
}

/// True when a name is a reserved placeholder and must be treated as absent.
pub fn is_denied_name(raw: &str) -> bool {
    let trimmed = raw.trim().to_lowercase();
    if DENY_LIST.contains(&trimmed.as_str()) {
        return true;
    }
    let normalized = normalize_name(raw, true);
    DENY_LIST.contains(&normalized.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_trims() {
        assert_eq!(normalize_name("  DEADMAU5 ", true), "deadmau5");
        assert_eq!(normalize_name("Deadmau5", true), "deadmau5");
        assert_eq!(normalize_name("deadmau5", true), "deadmau5");
    }

    #[test]
    fn test_collapses_internal_whitespace() {
        assert_eq!(normalize_name("Sub   Focus", true), "sub focus");
        assert_eq!(normalize_name("Sub\t Focus", true), "sub focus");
    }

    #[test]
    fn test_strips_diacritics_when_enabled() {
        assert_eq!(normalize_name("Röyksopp", true), "royksopp");
        assert_eq!(normalize_name("Beyoncé", true), "beyonce");
        assert_eq!(normalize_name("Møme", true), "mome");
    }

    #[test]
    fn test_keeps_diacritics_when_disabled() {
        assert_eq!(normalize_name("Röyksopp", false), "röyksopp");
    }

    #[test]
    fn test_multi_char_folds() {
        assert_eq!(normalize_name("Ærø", true), "aero");
        assert_eq!(normalize_name("Straße", true), "strasse");
    }

    #[test]
    fn test_idempotent() {
        for raw in ["  DEADMAU5 ", "Röyksopp", "Sub   Focus", "Straße"] {
            let once = normalize_name(raw, true);
            assert_eq!(normalize_name(&once, true), once);
        }
    }

    #[test]
    fn test_deny_list_matches_raw_and_normalized() {
        assert!(is_denied_name("unknown"));
        assert!(is_denied_name("Unknown Artist"));
        assert!(is_denied_name("  VARIOUS ARTISTS "));
        assert!(is_denied_name("Various\tArtists"));
        assert!(is_denied_name("N/A"));
        assert!(is_denied_name("ID"));
    }

    #[test]
    fn test_deny_list_rejects_real_names() {
        assert!(!is_denied_name("Deadmau5"));
        assert!(!is_denied_name("Various Cruelties"));
        assert!(!is_denied_name("Idris Elba"));
    }
}
