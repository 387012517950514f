//! Text normalization: NFC Unicode + LF line endings + trailing newline.
//!
//! Underpins invariants 1, 3 and 9: two byte-different-but-equivalent texts
//! must normalize identically, and normalization must be idempotent.

use unicode_normalization::UnicodeNormalization;

/// Normalize text to NFC, LF-only line endings, with exactly one trailing
/// newline (unless the input is empty).
pub fn normalize_text(input: &str) -> String {
    let lf_only = to_lf(input);
    let nfc: String = lf_only.nfc().collect();
    ensure_trailing_newline(nfc)
}

fn to_lf(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}

fn ensure_trailing_newline(mut s: String) -> String {
    if s.is_empty() || s.ends_with('\n') {
        return s;
    }
    s.push('\n');
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn crlf_becomes_lf() {
        assert_eq!(normalize_text("a\r\nb\r\n"), "a\nb\n");
    }

    #[test]
    fn cr_alone_becomes_lf() {
        assert_eq!(normalize_text("a\rb"), "a\nb\n");
    }

    #[test]
    fn adds_missing_trailing_newline() {
        assert_eq!(normalize_text("no newline"), "no newline\n");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn composed_and_decomposed_forms_match() {
        // "e" + combining acute accent vs. precomposed "é".
        let decomposed = "cafe\u{0301}\n";
        let precomposed = "caf\u{00e9}\n";
        assert_eq!(normalize_text(decomposed), normalize_text(precomposed));
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(s in ".{0,200}") {
            let once = normalize_text(&s);
            let twice = normalize_text(&once);
            prop_assert_eq!(once, twice);
        }
    }
}
