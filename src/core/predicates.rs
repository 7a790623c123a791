// src/core/predicates.rs

use super::glob::Glob;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

lazy_static! {
    // `tag`, `tag(args)`, optionally followed by `=~ pattern`.
    static ref PREDICATE_RE: Regex =
        Regex::new(r"^([a-z0-9]+(?:-[a-z0-9]+)*(?:\([^)]*\))?)\s*(?:=~\s*(.*))?$").unwrap();
}

/// Errors raised while parsing a predicate string.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PredicateError {
    /// The text matches neither accepted form.
    #[error("Predicate '{0}' is not of the form 'tag' or 'tag =~ pattern'.")]
    Malformed(String),
}

/// A `(tag, glob)` pair gating a rule or block.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// The tag queried, arguments included.
    pub tag: String,
    /// Pattern the value must match. Empty means "tag is available".
    pub glob: Glob,
}

impl Predicate {
    /// Builds a predicate from its parts. `pattern` may be empty.
    pub fn new(tag: impl Into<String>, pattern: &str) -> Self {
        Self {
            tag: tag.into(),
            glob: Glob::new(pattern),
        }
    }

    /// The raw glob pattern; empty for availability-only predicates.
    pub fn pattern(&self) -> &str {
        self.glob.as_str()
    }
}

impl FromStr for Predicate {
    type Err = PredicateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let caps = PREDICATE_RE
            .captures(trimmed)
            .ok_or_else(|| PredicateError::Malformed(trimmed.to_string()))?;

        let tag = caps.get(1).map_or("", |m| m.as_str());
        let pattern = caps.get(2).map_or("", |m| m.as_str().trim());
        Ok(Self::new(tag, pattern))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.glob.is_empty() {
            write!(f, "{}", self.tag)
        } else {
            write!(f, "{} =~ {}", self.tag, self.glob.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_tag() {
        let p: Predicate = "git".parse().unwrap();
        assert_eq!(p.tag, "git");
        assert_eq!(p.pattern(), "");
    }

    #[test]
    fn test_parse_tag_with_pattern() {
        let p: Predicate = "  git-branch =~ feature/*  ".parse().unwrap();
        assert_eq!(p.tag, "git-branch");
        assert_eq!(p.pattern(), "feature/*");
        assert_eq!(p.to_string(), "git-branch =~ feature/*");
    }

    #[test]
    fn test_parse_function_call_tag() {
        let p: Predicate = "p4-view(0,2)=~depot/main".parse().unwrap();
        assert_eq!(p.tag, "p4-view(0,2)");
        assert_eq!(p.pattern(), "depot/main");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(
            "Git Branch".parse::<Predicate>(),
            Err(PredicateError::Malformed(_))
        ));
        assert!("git-branch == main".parse::<Predicate>().is_err());
        assert!("".parse::<Predicate>().is_err());
    }
}
