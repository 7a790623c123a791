// src/core/interpolator.rs

//! # Template engine
//!
//! Expands captions and block texts written in the title template language:
//!
//! - `$tag` / `$tag(args)` substitutes a tag value; `${a b}` joins several.
//! - `$` followed by end of text, whitespace or a digit substitutes the value of
//!   the enclosing conditional.
//! - `?tag{body}` and `$tag?{body}` expand `body` when the tag has a value, binding
//!   that value for bare `$` inside it. `$tag!{body}` expands when it has none.
//! - `if(tag){...}else{...}` picks a branch. Branch bodies are structural: only
//!   quoted text, substitutions, conditionals and nested blocks produce output.
//! - `\x` emits `x` verbatim. Inside quotes `\n` and `\t` are newline and tab.
//!
//! Braces are matched by counting, so literal `{`/`}` pairs survive inside
//! conditional bodies. Nested constructs are stepped over whole while a body's end
//! is searched, so a brace quoted inside an `if` branch never closes the body
//! around it. An unterminated body consumes the rest of the template and
//! contributes nothing. Skipped bodies are never evaluated.

use crate::core::tags;
use crate::resolvers::VsState;
use thiserror::Error;

const MAX_RECURSION_DEPTH: u32 = 32;

/// Why a template expansion was aborted.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    /// Constructs were nested deeper than the engine allows.
    #[error("Maximum nesting depth ({0}) exceeded while expanding template.")]
    RecursionLimit(u32),
}

type Expansion = Result<(String, usize), TemplateError>;

/// Expands templates against one [`VsState`].
#[derive(Debug, Clone, Copy)]
pub struct Interpolator<'s, 'a> {
    state: &'s VsState<'a>,
    depth: u32,
}

impl<'s, 'a> Interpolator<'s, 'a> {
    /// Creates an interpolator at the top nesting level.
    pub fn new(state: &'s VsState<'a>) -> Self {
        Self { state, depth: 0 }
    }

    /// Expands `template`, falling back to "" if expansion is aborted.
    pub fn expand(&self, template: &str) -> String {
        self.try_expand(template).unwrap_or_else(|e| {
            log::debug!("Template '{}' could not be expanded: {}", template, e);
            String::new()
        })
    }

    /// Expands `template`, reporting an aborted expansion as an error.
    pub fn try_expand(&self, template: &str) -> Result<String, TemplateError> {
        let chars: Vec<char> = template.chars().collect();
        self.expand_literal(&chars, None, false)
    }

    /// Creates an interpolator one nesting level deeper.
    fn descend(&self) -> Result<Self, TemplateError> {
        if self.depth >= MAX_RECURSION_DEPTH {
            return Err(TemplateError::RecursionLimit(MAX_RECURSION_DEPTH));
        }
        Ok(Self {
            state: self.state,
            depth: self.depth + 1,
        })
    }

    fn value_of(&self, tag: &str) -> String {
        self.state.resolve(tag).unwrap_or_default()
    }

    // --- Literal mode ---

    /// Text is emitted as-is apart from escapes, substitutions and conditionals.
    fn expand_literal(
        &self,
        text: &[char],
        enclosing: Option<&str>,
        quoted: bool,
    ) -> Result<String, TemplateError> {
        let mut out = String::new();
        let mut i = 0;

        while let Some(&c) = text.get(i) {
            match c {
                '\\' => match text.get(i + 1) {
                    Some(&escaped) => {
                        out.push(unescape(escaped, quoted));
                        i += 2;
                    }
                    None => {
                        out.push('\\');
                        i += 1;
                    }
                },
                '$' => {
                    let (value, end) = self.substitution(text, i, enclosing)?;
                    out.push_str(&value);
                    i = end;
                }
                '?' => match self.conditional(text, i)? {
                    Some((value, end)) => {
                        out.push_str(&value);
                        i = end;
                    }
                    None => {
                        out.push('?');
                        i += 1;
                    }
                },
                'i' if starts_keyword(text, i, "if") => match self.if_else(text, i, enclosing)? {
                    Some((value, end)) => {
                        out.push_str(&value);
                        i = end;
                    }
                    None => {
                        out.push('i');
                        i += 1;
                    }
                },
                _ => {
                    out.push(c);
                    i += 1;
                }
            }
        }

        Ok(out)
    }

    // --- Structural mode (bodies of `if`/`else` and nested `{}` inside them) ---

    fn expand_structural(
        &self,
        text: &[char],
        enclosing: Option<&str>,
    ) -> Result<String, TemplateError> {
        let mut out = String::new();
        let mut i = 0;

        while let Some(&c) = text.get(i) {
            match c {
                '"' => {
                    let close = find_quote_end(text, i + 1);
                    let inner = slice(text, i + 1, close.unwrap_or(text.len()));
                    out.push_str(&self.descend()?.expand_literal(inner, enclosing, true)?);
                    i = close.map_or(text.len(), |q| q + 1);
                }
                '$' => {
                    let (value, end) = self.substitution(text, i, enclosing)?;
                    out.push_str(&value);
                    i = end;
                }
                '?' => match self.conditional(text, i)? {
                    Some((value, end)) => {
                        out.push_str(&value);
                        i = end;
                    }
                    None => i += 1,
                },
                'i' if starts_keyword(text, i, "if") => match self.if_else(text, i, enclosing)? {
                    Some((value, end)) => {
                        out.push_str(&value);
                        i = end;
                    }
                    None => i += 1,
                },
                '{' => {
                    let close = structural_body_end(text, i);
                    let inner = slice(text, i + 1, close.unwrap_or(text.len()));
                    out.push_str(&self.descend()?.expand_structural(inner, enclosing)?);
                    i = close.map_or(text.len(), |b| b + 1);
                }
                '\\' => i += 2,
                _ => i += 1,
            }
        }

        Ok(out)
    }

    // --- Constructs ---

    /// `$...` starting at `start`. Returns the substitution and the index after it.
    fn substitution(&self, text: &[char], start: usize, enclosing: Option<&str>) -> Expansion {
        let after = start + 1;
        match text.get(after) {
            None => Ok((enclosing.unwrap_or_default().to_string(), after)),
            Some(c) if c.is_whitespace() || c.is_ascii_digit() => {
                Ok((enclosing.unwrap_or_default().to_string(), after))
            }
            Some('{') => {
                let Some(close) = literal_body_end(text, after) else {
                    log::debug!("Unterminated '${{' in template.");
                    return Ok((String::new(), text.len()));
                };
                let list: String = slice(text, after + 1, close).iter().collect();
                let joined = list
                    .split_whitespace()
                    .map(|tag| self.value_of(tag))
                    .filter(|v| !v.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                Ok((joined, close + 1))
            }
            Some(_) => {
                let Some((tag, end)) = scan_tag(text, after) else {
                    return Ok(("$".to_string(), after));
                };

                let marker = text.get(end).copied();
                let has_body = matches!(marker, Some('?' | '!')) && text.get(end + 1) == Some(&'{');
                if !has_body {
                    return Ok((self.value_of(&tag), end));
                }

                let open = end + 1;
                let Some(close) = literal_body_end(text, open) else {
                    log::debug!("Unterminated body after '${}' in template.", tag);
                    return Ok((String::new(), text.len()));
                };
                let body = slice(text, open + 1, close);
                let value = self.value_of(&tag);

                let expanded = match (marker, value.is_empty()) {
                    (Some('?'), false) => self.descend()?.expand_literal(body, Some(value.as_str()), false)?,
                    (Some('!'), true) => self.descend()?.expand_literal(body, enclosing, false)?,
                    _ => String::new(),
                };
                Ok((expanded, close + 1))
            }
        }
    }

    /// `?tag{body}` starting at `start`. `None` when the text is not a conditional.
    fn conditional(&self, text: &[char], start: usize) -> Result<Option<(String, usize)>, TemplateError> {
        let Some((tag, end)) = scan_tag(text, start + 1) else {
            return Ok(None);
        };
        if text.get(end) != Some(&'{') {
            return Ok(None);
        }

        let Some(close) = literal_body_end(text, end) else {
            log::debug!("Unterminated body after '?{}' in template.", tag);
            return Ok(Some((String::new(), text.len())));
        };

        let value = self.value_of(&tag);
        if value.is_empty() {
            return Ok(Some((String::new(), close + 1)));
        }

        let body = slice(text, end + 1, close);
        let expanded = self.descend()?.expand_literal(body, Some(value.as_str()), false)?;
        Ok(Some((expanded, close + 1)))
    }

    /// `if(tag){...}[else{...}]` starting at `start`. `None` when the header is malformed.
    fn if_else(
        &self,
        text: &[char],
        start: usize,
        enclosing: Option<&str>,
    ) -> Result<Option<(String, usize)>, TemplateError> {
        let Some(construct) = parse_if(text, start) else {
            return Ok(None);
        };
        let Some(then_body) = construct.then_body else {
            log::debug!("Unterminated body after 'if({})' in template.", construct.tag);
            return Ok(Some((String::new(), text.len())));
        };

        let taken = if self.state.condition(&construct.tag) {
            Some(then_body)
        } else {
            construct.else_body
        };

        let expanded = match taken {
            Some(body) => self.descend()?.expand_structural(body, enclosing)?,
            None => String::new(),
        };
        Ok(Some((expanded, construct.end)))
    }
}

/// Convenience over [`Interpolator::expand`].
pub fn expand(state: &VsState<'_>, template: &str) -> String {
    Interpolator::new(state).expand(template)
}

// --- Scanning helpers ---

fn slice(text: &[char], from: usize, to: usize) -> &[char] {
    text.get(from..to).unwrap_or_default()
}

fn unescape(c: char, quoted: bool) -> char {
    match (c, quoted) {
        ('n', true) => '\n',
        ('t', true) => '\t',
        (other, _) => other,
    }
}

fn skip_whitespace(text: &[char], mut i: usize) -> usize {
    while text.get(i).is_some_and(|c| c.is_whitespace()) {
        i += 1;
    }
    i
}

/// True when `keyword` starts at `i` and is not glued to a preceding word.
fn starts_keyword(text: &[char], i: usize, keyword: &str) -> bool {
    let glued = i > 0
        && text
            .get(i - 1)
            .is_some_and(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_');
    !glued
        && keyword
            .chars()
            .enumerate()
            .all(|(k, expected)| text.get(i + k) == Some(&expected))
}

/// Reads `identifier[(args)]` at `start`. Arguments are kept verbatim.
fn scan_tag(text: &[char], start: usize) -> Option<(String, usize)> {
    let rest = text.get(start..)?;
    let len = tags::scan_identifier(rest);
    if len == 0 {
        return None;
    }

    let mut end = start + len;
    if text.get(end) == Some(&'(') {
        let close = (end + 1..text.len()).find(|&j| matches!(text.get(j), Some(')' | '(')));
        if let Some(close) = close.filter(|&j| text.get(j) == Some(&')')) {
            end = close + 1;
        }
    }

    Some((slice(text, start, end).iter().collect(), end))
}

/// The parts of an `if(tag){...}[else{...}]` construct.
struct IfConstruct<'t> {
    tag: String,
    /// `None` when the `then` body is never closed.
    then_body: Option<&'t [char]>,
    else_body: Option<&'t [char]>,
    /// Index after the construct.
    end: usize,
}

/// Parses the `if` starting at `start`. `None` when the header is malformed.
fn parse_if(text: &[char], start: usize) -> Option<IfConstruct<'_>> {
    let open_paren = skip_whitespace(text, start + 2);
    if text.get(open_paren) != Some(&'(') {
        return None;
    }
    let close_paren = (open_paren + 1..text.len()).find(|&j| text.get(j) == Some(&')'))?;
    let tag: String = slice(text, open_paren + 1, close_paren).iter().collect();
    let tag = tag.trim().to_string();
    if tag.is_empty() || tags::base_identifier(&tag).is_none() {
        return None;
    }

    let open = skip_whitespace(text, close_paren + 1);
    if text.get(open) != Some(&'{') {
        return None;
    }
    let Some(then_close) = structural_body_end(text, open) else {
        return Some(IfConstruct {
            tag,
            then_body: None,
            else_body: None,
            end: text.len(),
        });
    };

    let mut construct = IfConstruct {
        tag,
        then_body: Some(slice(text, open + 1, then_close)),
        else_body: None,
        end: then_close + 1,
    };

    // An `else` only belongs to this `if` when it is well-formed.
    let after = skip_whitespace(text, construct.end);
    if starts_keyword(text, after, "else") {
        let open = skip_whitespace(text, after + 4);
        if text.get(open) == Some(&'{') {
            match structural_body_end(text, open) {
                Some(close) => {
                    construct.else_body = Some(slice(text, open + 1, close));
                    construct.end = close + 1;
                }
                None => {
                    log::debug!("Unterminated 'else' body in template.");
                    construct.end = text.len();
                }
            }
        }
    }
    Some(construct)
}

/// Index after the `$...` or `?tag{...}` construct at `start`, as far as
/// expansion consumes it. `None` when nothing there is consumed as a unit.
fn construct_end(text: &[char], start: usize) -> Option<usize> {
    let body_end = |open: usize| literal_body_end(text, open).map_or(text.len(), |close| close + 1);
    match text.get(start)? {
        '$' if text.get(start + 1) == Some(&'{') => Some(body_end(start + 1)),
        '$' => {
            let (_, end) = scan_tag(text, start + 1)?;
            let has_body =
                matches!(text.get(end), Some('?' | '!')) && text.get(end + 1) == Some(&'{');
            Some(if has_body { body_end(end + 1) } else { end })
        }
        '?' => {
            let (_, end) = scan_tag(text, start + 1)?;
            (text.get(end) == Some(&'{')).then(|| body_end(end))
        }
        _ => None,
    }
}

/// Index of the `}` closing the literal-mode body opened at `open`.
fn literal_body_end(text: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while let Some(&c) = text.get(i) {
        match c {
            '\\' => i += 1,
            '$' | '?' => {
                if let Some(end) = construct_end(text, i) {
                    i = end;
                    continue;
                }
            }
            'i' if starts_keyword(text, i, "if") => {
                if let Some(construct) = parse_if(text, i) {
                    i = construct.end;
                    continue;
                }
            }
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the `}` closing the structural body opened at `open`. Quoted runs
/// are skipped as well.
fn structural_body_end(text: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while let Some(&c) = text.get(i) {
        match c {
            '\\' => i += 1,
            '"' => i = find_quote_end(text, i + 1)?,
            '$' | '?' => {
                if let Some(end) = construct_end(text, i) {
                    i = end;
                    continue;
                }
            }
            'i' if starts_keyword(text, i, "if") => {
                if let Some(construct) = parse_if(text, i) {
                    i = construct.end;
                    continue;
                }
            }
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Index of the unescaped `"` ending a quoted run that starts at `from`.
fn find_quote_end(text: &[char], from: usize) -> Option<usize> {
    let mut i = from;
    while let Some(&c) = text.get(i) {
        match c {
            '\\' => i += 2,
            '"' => return Some(i),
            _ => i += 1,
        }
    }
    None
}
