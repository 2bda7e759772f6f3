#![forbid(unsafe_code)]

//! Keyword validation and naming conventions.
//!
//! Keywords name classes and fields and double as persisted element names,
//! so they follow XML element-name rules:
//!
//! - non-empty, first character a letter or `_`
//! - remaining characters letters, digits, `_`, `-` or `.`
//! - no leading `xml` in any letter case
//!
//! [`UNDEFINED_KEYWORD`] marks a field whose keyword was never assigned and
//! always fails validation.

/// Sentinel keyword for "not yet initialized".
pub const UNDEFINED_KEYWORD: &str = "UNDEFINED";

/// Returns `true` if `keyword` can be used as a class or field keyword.
#[must_use]
pub fn is_valid_keyword(keyword: &str) -> bool {
    if keyword == UNDEFINED_KEYWORD {
        return false;
    }

    let mut chars = keyword.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_alphabetic() || first == '_') {
        return false;
    }
    if keyword
        .get(..3)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("xml"))
    {
        return false;
    }

    chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

/// Converts a `CamelCase` keyword into the `snake_case` form used by
/// scripting front ends.
///
/// A run of capitals is treated as one word: `"IJKCount"` becomes
/// `"ijk_count"`.
#[must_use]
pub fn to_script_keyword(keyword: &str) -> String {
    let chars: Vec<char> = keyword.chars().collect();
    let mut out = String::with_capacity(keyword.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
        }
        out.extend(c.to_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_keywords() {
        for kw in ["Count", "_hidden", "Items2", "a.b-c_d", "ÅrsVerdi"] {
            assert!(is_valid_keyword(kw), "{kw} should be valid");
        }
    }

    #[test]
    fn rejects_sentinel_and_malformed_keywords() {
        for kw in [
            "",
            UNDEFINED_KEYWORD,
            "1abc",
            ".dot",
            "-dash",
            "has space",
            "xmlThing",
            "XMLThing",
            "Xml",
            "semi;colon",
        ] {
            assert!(!is_valid_keyword(kw), "{kw:?} should be rejected");
        }
    }

    #[test]
    fn undefined_only_matches_exactly() {
        assert!(is_valid_keyword("UNDEFINEDValue"));
        assert!(is_valid_keyword("Undefined"));
    }

    #[test]
    fn script_keyword_conversion() {
        assert_eq!(to_script_keyword("Count"), "count");
        assert_eq!(to_script_keyword("UserDescription"), "user_description");
        assert_eq!(to_script_keyword("IJKCount"), "ijk_count");
        assert_eq!(to_script_keyword("Layer2Name"), "layer2_name");
        assert_eq!(to_script_keyword("already_snake"), "already_snake");
    }
}
