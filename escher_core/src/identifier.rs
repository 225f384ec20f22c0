//! SQL identifier sanitization and validation.
//!
//! Every identifier that ends up inside SQL text goes through this module
//! first. Sanitization strips anything outside `[A-Za-z0-9_]`; validation
//! checks the strict identifier grammar without modifying the input, so
//! callers can reject suspicious names instead of silently repairing them.

use std::sync::LazyLock;

use regex::Regex;

/// Strict identifier grammar: leading letter or underscore, then word
/// characters, 63 bytes total (the PostgreSQL identifier limit).
static IDENTIFIER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("valid identifier regex"));

/// Character sequences that have meaning to a SQL parser and therefore
/// never belong in an identifier, even one that still matches the grammar
/// after framing.
const METACHARACTER_SEQUENCES: [&str; 6] = [";", "'", "\"", "`", "--", "/*"];

/// Strips every character outside `[A-Za-z0-9_]`.
///
/// Returns an empty string for empty input. Idempotent: sanitizing an
/// already-sanitized identifier is a no-op.
pub fn sanitize_identifier(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Checks `input` against `^[A-Za-z_][A-Za-z0-9_]{0,62}$` without
/// modifying it.
pub fn is_valid_identifier(input: &str) -> bool {
    IDENTIFIER_PATTERN.is_match(input)
}

/// Detects SQL metacharacters (statement separators, quotes, comment
/// openers) anywhere in the raw input.
pub fn contains_sql_metacharacters(input: &str) -> bool {
    METACHARACTER_SEQUENCES.iter().any(|seq| input.contains(seq))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn sanitize_strips_disallowed_characters() {
        assert_eq!(
            sanitize_identifier("users; DROP TABLE users;--"),
            "usersDROPTABLEusers"
        );
        assert_eq!(sanitize_identifier("order-items"), "orderitems");
        assert_eq!(sanitize_identifier("schema.table"), "schematable");
    }

    #[test]
    fn sanitize_is_idempotent() {
        for raw in ["users", "user_accounts", "a;b'c\"d", "1weird$name", ""] {
            let once = sanitize_identifier(raw);
            assert_eq!(sanitize_identifier(&once), once);
        }
    }

    #[test]
    fn sanitize_of_empty_input_is_empty() {
        assert_eq!(sanitize_identifier(""), "");
        assert_eq!(sanitize_identifier(";;--"), "");
    }

    #[test]
    fn valid_identifiers_pass() {
        assert!(is_valid_identifier("users"));
        assert!(is_valid_identifier("_migrations"));
        assert!(is_valid_identifier("user_accounts_v2"));
    }

    #[test]
    fn invalid_identifiers_fail() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1users"));
        assert!(!is_valid_identifier("user-accounts"));
        assert!(!is_valid_identifier("users; DROP TABLE users"));
        // 64 characters, one over the limit.
        assert!(!is_valid_identifier(&"a".repeat(64)));
        assert!(is_valid_identifier(&"a".repeat(63)));
    }

    #[test]
    fn metacharacter_detection() {
        assert!(contains_sql_metacharacters("users; DROP TABLE users"));
        assert!(contains_sql_metacharacters("users--comment"));
        assert!(contains_sql_metacharacters("users/*hidden*/"));
        assert!(contains_sql_metacharacters("o'brien"));
        assert!(!contains_sql_metacharacters("plain_name"));
    }
}
