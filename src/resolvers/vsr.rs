// src/resolvers/vsr.rs

use super::repository::{Discovery, VcsBackend, VcsResolver, find_marker};
use crate::core::glob::Glob;
use crate::system::executor::CommandRunner;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

/// Resolves `vsr`, `vsr-branch` and `vsr-sha`.
pub type VsrResolver = VcsResolver<VsrBackend>;

const VSR_TAGS: &[&str] = &["vsr", "vsr-branch", "vsr-sha"];

lazy_static! {
    static ref VERSION_RE: Regex = Regex::new(r"Version ([a-fA-F0-9-]+)").unwrap();
    static ref BRANCH_RE: Regex = Regex::new(r#"on branch "([a-zA-Z0-9_-]+)""#).unwrap();
}

/// State of a Versionr working copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VsrState {
    /// Current branch.
    pub branch: String,
    /// Version id.
    pub sha: String,
}

/// Runs `vsr info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct VsrBackend;

/// Parses the first line of `vsr info --nocolours`.
fn parse_info(first_line: &str) -> VsrState {
    let capture = |re: &Regex| {
        re.captures(first_line)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default()
    };
    VsrState {
        branch: capture(&BRANCH_RE),
        sha: capture(&VERSION_RE),
    }
}

#[async_trait]
impl VcsBackend for VsrBackend {
    type State = VsrState;
    const NAME: &'static str = "vsr";
    const TAGS: &'static [&'static str] = VSR_TAGS;

    fn executable(&self) -> &'static str {
        "vsr"
    }

    async fn discover(
        &self,
        _runner: &dyn CommandRunner,
        _program: &Path,
        start: &Path,
    ) -> Option<Discovery> {
        let root = find_marker(start, ".versionr")?;
        Some(Discovery {
            watch: Some(root.join(".versionr")),
            root,
            workspace: None,
        })
    }

    async fn read(
        &self,
        runner: &dyn CommandRunner,
        program: &Path,
        discovery: &Discovery,
    ) -> Option<VsrState> {
        let lines = runner
            .capture(&discovery.root, program, &["info", "--nocolours"])
            .await
            .map_err(|e| log::debug!("[vsr] {}", e))
            .ok()?;
        lines.first().map(|line| parse_info(line))
    }

    fn resolve(&self, state: &VsrState, discovery: &Discovery, tag: &str) -> String {
        match tag {
            "vsr" => discovery.root.display().to_string(),
            "vsr-branch" => state.branch.clone(),
            "vsr-sha" => state.sha.clone(),
            _ => String::new(),
        }
    }

    fn satisfies(&self, state: &VsrState, discovery: &Discovery, tag: &str, glob: &Glob) -> bool {
        tag == "vsr" || glob.is_match(&self.resolve(state, discovery, tag))
    }
}
