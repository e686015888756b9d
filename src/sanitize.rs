use std::sync::OnceLock;

use regex::Regex;

/// Whole-string grammar for program input: runs of Latin letters and digits,
/// or decimal numbers with a single `.`/`,` separator, each followed by
/// optional whitespace.
const INPUT_PATTERN: &str = r"^(([\p{Latin}\p{N}]*|\p{N}+[.,]\p{N}+)[\t\n\x0C\r ]*)*$";

fn input_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(INPUT_PATTERN).expect("input pattern is valid"))
}

/// Checks that `input` is safe to embed into the generated shell script.
///
/// The text ends up inside a double-quoted `echo` argument, so the allow-list
/// must cover the entire string. Anything outside it (quotes, `$`, `;`,
/// backslashes, control characters, non-Latin scripts) is rejected.
pub fn validate(input: &str) -> bool {
    input_regex().is_match(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_empty_and_blank_input() {
        assert!(validate(""));
        assert!(validate("  \n  "));
        assert!(validate("\t\r\n"));
    }

    #[test]
    fn accepts_words_and_numbers() {
        assert!(validate("O Brasil tem 100 anos"));
        assert!(validate("3.14"));
        assert!(validate("3,14"));
        assert!(validate("10 20\n30 40\n"));
        assert!(validate("ação café niño"));
        assert!(validate("abc123 1.5 2,75"));
    }

    #[test]
    fn rejects_shell_metacharacters() {
        for input in [
            "echo $PATH",
            "a;b",
            "`id`",
            "\"quoted\"",
            "'single'",
            "back\\slash",
            "rm -rf",
            "a|b",
            "a&b",
            "$(whoami)",
            "a>b",
            "x\u{0}y",
            "tab\u{7}bell",
        ] {
            assert!(!validate(input), "{input:?} should be rejected");
        }
    }

    #[test]
    fn rejects_non_latin_scripts() {
        assert!(!validate("привет"));
        assert!(!validate("你好"));
        assert!(!validate("abc αβγ"));
    }

    #[test]
    fn separators_must_sit_between_single_digit_groups() {
        assert!(!validate("1.2.3"));
        assert!(!validate("1.2,3"));
        assert!(!validate("1..2"));
        assert!(!validate(".5"));
        assert!(!validate("5."));
        assert!(!validate("a.b"));
        assert!(validate("1.2 3,4"));
    }

    #[test]
    fn match_is_anchored_to_whole_string() {
        assert!(!validate("valid then ;"));
        assert!(!validate("; then valid"));
    }

    #[test]
    fn unicode_whitespace_outside_ascii_is_rejected() {
        assert!(!validate("a\u{00A0}b"));
        assert!(!validate("a\u{2028}b"));
    }
}
