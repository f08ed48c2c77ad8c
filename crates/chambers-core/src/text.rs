//! Text helpers used by page rendering, excerpts and slugs.

use chrono::{DateTime, Utc};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub const SLUG_MAX_LEN: usize = 96;
pub const WORDS_PER_MINUTE: usize = 200;
const ELLIPSIS: char = '…';

/// Lowercase ASCII slug; accents are folded (`é` -> `e`), every other run of
/// non-alphanumerics becomes a single `-`.
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for c in input.nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_alphanumeric() {
            let dash = pending_dash && !out.is_empty();
            if out.len() + usize::from(dash) + 1 > SLUG_MAX_LEN {
                break;
            }
            if dash {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        "item".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Cuts `input` at the last word boundary that fits in `max_chars` and marks
/// the cut with an ellipsis. The ellipsis is not counted against the limit.
#[must_use]
pub fn truncate_words(input: &str, max_chars: usize) -> String {
    let trimmed = input.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let mut cut = String::new();
    let mut cut_len = 0_usize;
    for word in trimmed.split_whitespace() {
        let word_len = word.chars().count();
        let extra = if cut.is_empty() { word_len } else { word_len + 1 };
        if cut_len + extra > max_chars {
            break;
        }
        if !cut.is_empty() {
            cut.push(' ');
        }
        cut.push_str(word);
        cut_len += extra;
    }
    if cut.is_empty() {
        cut = trimmed.chars().take(max_chars).collect();
    }
    let mut out = cut
        .trim_end_matches(|c: char| c.is_ascii_punctuation())
        .to_string();
    out.push(ELLIPSIS);
    out
}

/// Drops markup and decodes the handful of entities rich-text editors emit.
#[must_use]
pub fn strip_html(input: &str) -> String {
    let mut text = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    let decoded = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    collapse_whitespace(&decoded)
}

#[must_use]
pub fn excerpt(content: &str, max_chars: usize) -> String {
    truncate_words(&strip_html(content), max_chars)
}

#[must_use]
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[must_use]
pub fn word_count(input: &str) -> usize {
    strip_html(input).split_whitespace().count()
}

#[must_use]
pub fn reading_time_minutes(input: &str) -> usize {
    word_count(input).div_ceil(WORDS_PER_MINUTE).max(1)
}

#[must_use]
pub fn initials(name: &str) -> String {
    let words: Vec<&str> = name.split_whitespace().collect();
    let first = words.first().and_then(|w| w.chars().next());
    let last = if words.len() > 1 {
        words.last().and_then(|w| w.chars().next())
    } else {
        None
    };
    first
        .into_iter()
        .chain(last)
        .flat_map(char::to_uppercase)
        .collect()
}

/// `16 October 2026`
#[must_use]
pub fn format_date(value: &DateTime<Utc>) -> String {
    value.format("%-d %B %Y").to_string()
}

/// `2026-10-16`
#[must_use]
pub fn format_date_short(value: &DateTime<Utc>) -> String {
    value.format("%Y-%m-%d").to_string()
}

#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
