//! Identifier helpers.
//!
//! Redmine assigns numeric identifiers on creation. In resource state they
//! travel as strings: an empty string or `"0"` means "not created yet",
//! anything else must be a strictly positive decimal integer.

use crate::error::ProviderError;

/// True if the identifier denotes a not-yet-created resource.
pub fn is_unset(id: &str) -> bool {
    id.is_empty() || id == "0"
}

/// Parse an identifier into its numeric form.
///
/// Rejects unset and malformed identifiers. Use [`try_parse`] where an unset
/// identifier is acceptable.
pub fn parse(id: &str) -> Result<u32, ProviderError> {
    if is_unset(id) {
        return Err(ProviderError::Validation(format!(
            "identifier is not set (got {:?})",
            id
        )));
    }
    match id.parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ProviderError::Validation(format!(
            "malformed identifier {:?}: expected a positive integer",
            id
        ))),
    }
}

/// Parse an identifier, mapping unset values to `None`.
pub fn try_parse(id: &str) -> Result<Option<u32>, ProviderError> {
    if is_unset(id) {
        return Ok(None);
    }
    parse(id).map(Some)
}

/// Format a numeric identifier back into its state representation.
pub fn format(id: u32) -> String {
    id.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_unset() {
        assert!(is_unset(""));
        assert!(is_unset("0"));
        assert!(!is_unset("1"));
        assert!(!is_unset("42"));
    }

    #[test]
    fn test_parse_valid() {
        assert_eq!(parse("1").unwrap(), 1);
        assert_eq!(parse("1337").unwrap(), 1337);
    }

    #[test]
    fn test_parse_unset_is_error() {
        assert!(parse("").is_err());
        assert!(parse("0").is_err());
    }

    #[test]
    fn test_parse_malformed() {
        assert!(parse("-5").is_err());
        assert!(parse("abc").is_err());
        assert!(parse("1.5").is_err());
        assert!(parse(" 7").is_err());
    }

    #[test]
    fn test_try_parse() {
        assert_eq!(try_parse("").unwrap(), None);
        assert_eq!(try_parse("0").unwrap(), None);
        assert_eq!(try_parse("9").unwrap(), Some(9));
        assert!(try_parse("nope").is_err());
    }

    #[test]
    fn test_format_round_trip() {
        assert_eq!(format(42), "42");
        assert_eq!(parse(&format(42)).unwrap(), 42);
    }
}
