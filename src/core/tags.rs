// src/core/tags.rs

//! The tag vocabulary shared by the template engine and the resolvers.
//!
//! A tag is a lowercase, hyphenated identifier (`git-branch`), optionally
//! followed by a parenthesized argument list (`path(0,2)`). The engine passes
//! the whole compound text through untouched; resolvers use the helpers here
//! to recover the base identifier and their own arguments.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref BASE_IDENTIFIER_RE: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*").unwrap();
}

/// Returns the identifier part of a tag, dropping any `(...)`, `?` or `!` suffix.
pub fn base_identifier(tag: &str) -> Option<&str> {
    BASE_IDENTIFIER_RE.find(tag).map(|m| m.as_str())
}

/// Length in characters of the identifier starting at `text[0]`, or 0 if none.
///
/// Identifiers start with a lowercase letter, continue with lowercase letters and
/// digits, and may contain single hyphens between alphanumeric runs.
pub fn scan_identifier(text: &[char]) -> usize {
    let is_word = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();

    match text.first() {
        Some(c) if c.is_ascii_lowercase() => {}
        _ => return 0,
    }

    let mut end = 0;
    let mut i = 0;
    while let Some(&c) = text.get(i) {
        if is_word(c) {
            i += 1;
            end = i;
        } else if c == '-' && text.get(i + 1).is_some_and(|&n| is_word(n)) {
            i += 1;
        } else {
            break;
        }
    }
    end
}

/// Extracts the comma-separated arguments of a function-call tag such as
/// `p4-view(1, 2)`. Returns `None` when `tag` is not a call of `function`.
pub fn function_arguments<'t>(tag: &'t str, function: &str) -> Option<Vec<&'t str>> {
    let rest = tag.strip_prefix(function)?;
    let inner = rest.trim_start().strip_prefix('(')?.strip_suffix(')')?;
    if inner.trim().is_empty() {
        return Some(Vec::new());
    }
    Some(inner.split(',').map(str::trim).collect())
}

/// Parses the `(from, count)` integer pair of a slicing function, applying defaults
/// for missing arguments. `None` if an argument is present but not a number.
pub fn slice_arguments(tag: &str, function: &str, default_count: usize) -> Option<(usize, usize)> {
    let args = function_arguments(tag, function)?;
    let from = match args.first() {
        Some(s) => s.parse().ok()?,
        None => 0,
    };
    let count = match args.get(1) {
        Some(s) => s.parse().ok()?,
        None => default_count,
    };
    Some((from, count))
}

/// Takes `count` segments of `data` after skipping `from` segments counted from the END,
/// keeping the original order. `path(0,2)` over `C:\a\b\c` yields `b\c`.
pub fn take_trailing_segments(data: &str, delimiter: char, from: usize, count: usize) -> String {
    let segments: Vec<&str> = data.split(delimiter).filter(|s| !s.is_empty()).collect();
    let end = segments.len().saturating_sub(from);
    let start = end.saturating_sub(count);
    segments
        .get(start..end)
        .map(|s| s.join(&delimiter.to_string()))
        .unwrap_or_default()
}
