// src/core/glob.rs

use regex::{Regex, RegexBuilder};
use std::fmt;

/// A compiled wildcard pattern: `*` matches any run of characters, `?` exactly one.
///
/// Matching is anchored to the whole candidate and case-insensitive. There is no
/// way to match a literal `*` or `?`. The empty pattern matches everything and is
/// used by predicates that only check availability.
#[derive(Clone)]
pub struct Glob {
    source: String,
    regex: Option<Regex>,
}

impl Glob {
    /// Compiles `pattern`. A pattern that cannot be compiled is logged and never matches.
    pub fn new(pattern: &str) -> Self {
        if pattern.is_empty() {
            return Self {
                source: String::new(),
                regex: None,
            };
        }

        let translated = regex::escape(pattern)
            .replace(r"\*", ".*")
            .replace(r"\?", ".");

        let regex = RegexBuilder::new(&format!("^{}$", translated))
            .case_insensitive(true)
            .dot_matches_new_line(true)
            .build()
            .map_err(|e| log::warn!("Glob '{}' could not be compiled: {}", pattern, e))
            .ok();

        Self {
            source: pattern.to_string(),
            regex,
        }
    }

    /// The pattern as the user wrote it.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// True for the match-everything pattern.
    pub fn is_empty(&self) -> bool {
        self.source.is_empty()
    }

    /// Tests the whole of `candidate`.
    pub fn is_match(&self, candidate: &str) -> bool {
        if self.source.is_empty() {
            return true;
        }
        // A pattern that failed to compile never matches.
        self.regex.as_ref().is_some_and(|re| re.is_match(candidate))
    }
}

impl PartialEq for Glob {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for Glob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Glob").field(&self.source).finish()
    }
}

/// One-shot convenience over [`Glob`].
pub fn matches(pattern: &str, candidate: &str) -> bool {
    Glob::new(pattern).is_match(candidate)
}
