//! Name normalization shared by lookups and the recap parser.

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Fold a name for comparison: trimmed, lowercase, diacritics removed.
///
/// `"  São Paulo "` and `"sao paulo"` normalize to the same string.
pub fn normalize(s: &str) -> String {
    s.trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Drop a trailing `"hint from ..."` attribution from a recap value.
///
/// Expects an already-normalized string.
pub fn strip_hint_suffix(s: &str) -> &str {
    match s.find("hint from") {
        Some(idx) => s[..idx].trim(),
        None => s.trim(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_case_and_accents() {
        assert_eq!(normalize("São Paulo"), "sao paulo");
        assert_eq!(normalize("  Zürich "), "zurich");
        assert_eq!(normalize("CÔTE D'IVOIRE"), "cote d'ivoire");
    }

    #[test]
    fn plain_ascii_is_lowercased_only() {
        assert_eq!(normalize("Lyon"), "lyon");
    }

    #[test]
    fn hint_suffix_is_dropped() {
        assert_eq!(strip_hint_suffix("france hint from alice"), "france");
        assert_eq!(strip_hint_suffix(" europe "), "europe");
    }
}
