// src/resolvers/p4.rs

//! Perforce has no metadata folder to find or watch. The solution is mapped to a
//! client workspace by matching its ancestors against the roots listed by
//! `p4 clients`; the client's view mappings then come from `p4 client -o`.

use super::repository::{Discovery, VcsBackend, VcsResolver};
use crate::constants::POLL_INTERVAL;
use crate::core::glob::Glob;
use crate::core::tags;
use crate::system::executor::CommandRunner;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolves `p4`, `p4-client`, `p4-root` and `p4-view(from,count)`.
pub type P4Resolver = VcsResolver<P4Backend>;

const P4_TAGS: &[&str] = &["p4", "p4-client", "p4-view", "p4-root"];

lazy_static! {
    static ref CLIENT_RE: Regex = Regex::new(r"Client (.+?) .+ root (.+?) '").unwrap();
}

/// State of a Perforce client.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct P4State {
    /// Depot side of each view mapping, with any leading `+`/`-` kept.
    pub views: Vec<String>,
}

/// Runs `p4 clients` and `p4 client -o`.
#[derive(Debug, Default, Clone, Copy)]
pub struct P4Backend;

/// Parses `p4 clients` into `(client, root)` pairs.
fn parse_clients(lines: &[String]) -> Vec<(String, PathBuf)> {
    lines
        .iter()
        .filter_map(|line| CLIENT_RE.captures(line))
        .filter_map(|caps| {
            let client = caps.get(1)?.as_str().to_string();
            let root = PathBuf::from(caps.get(2)?.as_str().trim());
            Some((client, root))
        })
        .collect()
}

/// Takes the first path of a view line, keeping a leading `+`/`-` and honoring quotes.
fn first_view(line: &str) -> String {
    let trimmed = line.trim();
    let (prefix, rest) = match trimmed.chars().next() {
        Some(c @ ('+' | '-')) => (Some(c), trimmed.get(1..).unwrap_or_default()),
        _ => (None, trimmed),
    };

    let path: String = match rest.strip_prefix('"') {
        Some(quoted) => quoted.chars().take_while(|&c| c != '"').collect(),
        None => rest.chars().take_while(|c| !c.is_whitespace()).collect(),
    };

    prefix.map(String::from).unwrap_or_default() + &path
}

/// Parses the `View:` section of `p4 client -o`.
fn parse_views(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|line| line.trim_end_matches('\r'))
        .skip_while(|line| !line.starts_with("View:"))
        .skip(1)
        .take_while(|line| line.starts_with('\t'))
        .map(first_view)
        .collect()
}

/// Slices the first view with enough segments: skip `from`, take `count`.
fn slice_view(views: &[String], from: usize, count: usize) -> String {
    views
        .iter()
        .map(|view| {
            let bare = view.trim_start_matches(['+', '-']);
            let bare = bare.strip_prefix("//").unwrap_or(bare);
            bare.split('/').collect::<Vec<_>>()
        })
        .find(|segments| segments.len() >= from + count)
        .map(|segments| {
            segments
                .into_iter()
                .skip(from)
                .take(count)
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}

#[async_trait]
impl VcsBackend for P4Backend {
    type State = P4State;
    const NAME: &'static str = "p4";
    const TAGS: &'static [&'static str] = P4_TAGS;

    fn executable(&self) -> &'static str {
        "p4"
    }

    async fn discover(
        &self,
        runner: &dyn CommandRunner,
        program: &Path,
        start: &Path,
    ) -> Option<Discovery> {
        let lines = runner
            .capture(start, program, &["clients"])
            .await
            .map_err(|e| log::debug!("[p4] {}", e))
            .ok()?;
        let clients = parse_clients(&lines);

        // Nearest ancestor that is exactly a client root wins.
        start.ancestors().find_map(|dir| {
            clients
                .iter()
                .find(|(_, root)| root.as_path() == dir)
                .map(|(client, root)| Discovery {
                    root: root.clone(),
                    watch: None,
                    workspace: Some(client.clone()),
                })
        })
    }

    async fn read(
        &self,
        runner: &dyn CommandRunner,
        program: &Path,
        discovery: &Discovery,
    ) -> Option<P4State> {
        let client = discovery.workspace.as_deref()?;
        let lines = runner
            .capture(&discovery.root, program, &["client", "-o", client])
            .await
            .map_err(|e| log::debug!("[p4] {}", e))
            .ok()?;
        Some(P4State {
            views: parse_views(&lines),
        })
    }

    fn resolve(&self, state: &P4State, discovery: &Discovery, tag: &str) -> String {
        match tags::base_identifier(tag) {
            Some("p4") | Some("p4-root") => discovery.root.display().to_string(),
            Some("p4-client") => discovery.workspace.clone().unwrap_or_default(),
            Some("p4-view") => {
                let (from, count) = if tag == "p4-view" {
                    (0, 1)
                } else {
                    match tags::slice_arguments(tag, "p4-view", 1) {
                        Some(args) => args,
                        None => {
                            log::debug!("Malformed view slice '{}'.", tag);
                            return String::new();
                        }
                    }
                };
                slice_view(&state.views, from, count)
            }
            _ => String::new(),
        }
    }

    fn satisfies(&self, state: &P4State, discovery: &Discovery, tag: &str, glob: &Glob) -> bool {
        match tag {
            "p4" => true,
            "p4-view" => state.views.iter().any(|v| glob.is_match(v)),
            _ => glob.is_match(&self.resolve(state, discovery, tag)),
        }
    }

    fn poll_interval(&self) -> Option<Duration> {
        Some(POLL_INTERVAL)
    }
}
