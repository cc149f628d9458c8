//! Shared language-name-to-code table
//!
//! The UI sends human-readable language names while the memory store keys
//! records by short codes. This is the single versioned lookup used by every
//! call site.

/// Supported (display name, code) pairs
pub const LANGUAGE_CODES: &[(&str, &str)] = &[
    ("English", "en"),
    ("French", "fr"),
    ("Arabic", "ar"),
    ("Turkish", "tr"),
];

/// Map a display name to its language code, falling back to `fallback`
/// when the name is unknown. Already-coded inputs pass through unchanged.
pub fn code_for<'a>(name: &'a str, fallback: &'a str) -> &'a str {
    for (display, code) in LANGUAGE_CODES {
        if *display == name || *code == name {
            return code;
        }
    }
    fallback
}

/// Map a code back to its display name, when known.
pub fn name_for(code: &str) -> Option<&'static str> {
    LANGUAGE_CODES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(display, _)| *display)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_display_names() {
        assert_eq!(code_for("French", "en"), "fr");
        assert_eq!(code_for("Turkish", "en"), "tr");
    }

    #[test]
    fn passes_codes_through() {
        assert_eq!(code_for("ar", "en"), "ar");
    }

    #[test]
    fn unknown_name_uses_fallback() {
        assert_eq!(code_for("Klingon", "en"), "en");
        assert_eq!(code_for("Klingon", "fr"), "fr");
    }

    #[test]
    fn name_lookup() {
        assert_eq!(name_for("fr"), Some("French"));
        assert_eq!(name_for("xx"), None);
    }
}
