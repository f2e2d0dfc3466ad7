//! Character-safe text helpers shared by the analyzers.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

/// Numbered list item: `1. text`, `2) **text**`.
static LIST_ITEM_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(\d+)[.)]\s*\*?\*?([^\n]+)").expect("List item regex is hardcoded and valid")
});

/// Number of the first numbered-list item whose text contains `needle`
/// (case-insensitive).
pub(crate) fn list_position(text: &str, needle: &str) -> Option<u32> {
    let needle = needle.to_lowercase();
    LIST_ITEM_REGEX.captures_iter(text).find_map(|caps| {
        if caps[2].to_lowercase().contains(&needle) {
            caps[1].parse().ok()
        } else {
            None
        }
    })
}

/// Case-insensitive literal matcher.
pub(crate) fn literal_regex(literal: &str) -> Option<Regex> {
    RegexBuilder::new(&regex::escape(literal))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Byte offset of the `n`th character, or the end of the string.
pub(crate) fn byte_offset(text: &str, n: usize) -> usize {
    text.char_indices().nth(n).map_or(text.len(), |(i, _)| i)
}

/// Character index of a byte offset that lies on a char boundary.
pub(crate) fn char_index(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// The first `n` characters.
pub(crate) fn prefix_chars(text: &str, n: usize) -> &str {
    &text[..byte_offset(text, n)]
}

/// Characters `[start, end)` by character index.
pub(crate) fn char_slice(text: &str, start: usize, end: usize) -> &str {
    let from = byte_offset(text, start);
    let to = byte_offset(text, end);
    &text[from..to.max(from)]
}
