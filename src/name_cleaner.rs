//!
//! Helpers to normalize names before they are hashed, compared or stored
//!

/// Returns the cleaned form of a name: everything from the first NUL onwards is dropped (the
/// vocabulary stores NUL-terminated text) and leading and trailing whitespace is trimmed
pub fn clean_name(s: &str) -> &str {
    let s = match s.find('\0') {
        Some(nul_idx) => &s[..nul_idx],
        None => s
    };
    s.trim()
}

/// Folds a byte for case-insensitive hashing and comparison
#[inline(always)]
pub fn fold_byte(b: u8, case_sensitive: bool) -> u8 {
    if case_sensitive {
        b
    } else {
        b.to_ascii_uppercase()
    }
}

/// Compares two names the way a class with the given case sensitivity does
pub fn names_equal(a: &str, b: &str, case_sensitive: bool) -> bool {
    if case_sensitive {
        a == b
    } else {
        a.eq_ignore_ascii_case(b)
    }
}

/// Returns `true` if the two names differ only by letter case
pub fn is_case_only_change(a: &str, b: &str) -> bool {
    a != b && a.eq_ignore_ascii_case(b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn cleaning() {
        assert_eq!(clean_name("  unc-22 \t\n"), "unc-22");
        assert_eq!(clean_name("AC3.1\0junk"), "AC3.1");
        assert_eq!(clean_name("   "), "");
        assert_eq!(clean_name(""), "");
        assert_eq!(clean_name("a b"), "a b");
    }

    #[test]
    fn comparison() {
        assert!(names_equal("Foo", "FOO", false));
        assert!(!names_equal("Foo", "FOO", true));
        assert!(is_case_only_change("Foo", "foo"));
        assert!(!is_case_only_change("Foo", "Foo"));
        assert!(!is_case_only_change("Foo", "Bar"));
        assert_eq!(fold_byte(b'q', false), b'Q');
        assert_eq!(fold_byte(b'q', true), b'q');
    }

    proptest! {
        #[test]
        fn cleaning_is_idempotent(s in "\\PC*") {
            let once = clean_name(&s);
            prop_assert_eq!(clean_name(once), once);
        }

        #[test]
        fn cleaned_names_have_no_outer_whitespace(s in "[ \\t]{0,3}[a-zA-Z0-9._-]{0,12}[ \\t]{0,3}") {
            let cleaned = clean_name(&s);
            prop_assert!(!cleaned.starts_with(char::is_whitespace));
            prop_assert!(!cleaned.ends_with(char::is_whitespace));
        }
    }
}
