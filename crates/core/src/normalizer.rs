//! Cleans decoded subtitle text down to its spoken words.
//!
//! Markup spans, `HH:MM:SS,mmm --> HH:MM:SS,mmm` ranges and bare sequence
//! numbers are stripped line-wise first, then whitespace is collapsed. Stripping
//! repeats until nothing changes so that [`normalize`] is idempotent even when
//! removing one span exposes another.

use crate::chunking::normalize_whitespace;
use regex::Regex;
use std::sync::LazyLock;

static MARKUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("markup pattern is valid"));

static TIMESTAMP_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{2}:\d{2}:\d{2}[,.]\d{3}\s*-->\s*\d{2}:\d{2}:\d{2}[,.]\d{3}")
        .expect("timestamp pattern is valid")
});

// `[^\S\n]` is whitespace that never crosses a line break, which also covers `\r`.
static INDEX_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^[^\S\n]*\d+[^\S\n]*$").expect("index line pattern is valid")
});

pub fn normalize(text: &str) -> String {
    let mut current = text.to_string();

    loop {
        let stripped = strip_structure(&current);
        if stripped == current {
            break;
        }
        current = stripped;
    }

    normalize_whitespace(&current)
}

pub fn strip_markup(text: &str) -> String {
    MARKUP_RE.replace_all(text, "").into_owned()
}

/// True when the line carries a subtitle time range marker.
pub fn contains_timestamp_range(line: &str) -> bool {
    TIMESTAMP_RANGE_RE.is_match(line)
}

fn strip_structure(text: &str) -> String {
    let without_markup = MARKUP_RE.replace_all(text, "");
    let without_timestamps = TIMESTAMP_RANGE_RE.replace_all(&without_markup, "");
    INDEX_LINE_RE
        .replace_all(&without_timestamps, "")
        .into_owned()
}
