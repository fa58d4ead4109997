use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;
use unicode_width::UnicodeWidthChar;

/// CSI sequences, OSC sequences (BEL or ST terminated) and two-byte escapes.
const ESCAPE_PATTERN: &str =
    r"\x1b(?:\[[0-?]*[ -/]*[@-~]|\][^\x07\x1b]*(?:\x07|\x1b\\)|[@-Z\\-_])";

fn escape_regex() -> &'static Regex {
    static ESCAPES: OnceLock<Regex> = OnceLock::new();
    ESCAPES.get_or_init(|| Regex::new(ESCAPE_PATTERN).expect("escape pattern is valid"))
}

pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    if !text.contains('\x1b') {
        return Cow::Borrowed(text);
    }
    escape_regex().replace_all(text, "")
}

/// Terminal columns `text` occupies once escape sequences are removed.
pub fn visible_width(text: &str) -> usize {
    strip_ansi(text)
        .chars()
        .map(|c| UnicodeWidthChar::width(c).unwrap_or(0))
        .sum()
}
