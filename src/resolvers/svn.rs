// src/resolvers/svn.rs

use super::repository::{Discovery, VcsBackend, VcsResolver, find_marker};
use crate::core::glob::Glob;
use crate::system::executor::CommandRunner;
use async_trait::async_trait;
use std::path::Path;

/// Resolves `svn` and `svn-url`.
pub type SvnResolver = VcsResolver<SvnBackend>;

const SVN_TAGS: &[&str] = &["svn", "svn-url"];

/// State of a Subversion working copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SvnState {
    /// Repository URL of the working copy root.
    pub url: String,
}

/// Runs `svn info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SvnBackend;

/// Extracts the `URL: ` line of `svn info`.
fn parse_url(lines: &[String]) -> Option<String> {
    lines
        .iter()
        .find_map(|line| line.strip_prefix("URL: "))
        .map(|url| url.trim().to_string())
}

#[async_trait]
impl VcsBackend for SvnBackend {
    type State = SvnState;
    const NAME: &'static str = "svn";
    const TAGS: &'static [&'static str] = SVN_TAGS;

    fn executable(&self) -> &'static str {
        "svn"
    }

    async fn discover(
        &self,
        _runner: &dyn CommandRunner,
        _program: &Path,
        start: &Path,
    ) -> Option<Discovery> {
        let root = find_marker(start, ".svn")?;
        Some(Discovery {
            watch: Some(root.join(".svn")),
            root,
            workspace: None,
        })
    }

    async fn read(
        &self,
        runner: &dyn CommandRunner,
        program: &Path,
        discovery: &Discovery,
    ) -> Option<SvnState> {
        let lines = runner
            .capture(&discovery.root, program, &["info"])
            .await
            .map_err(|e| log::debug!("[svn] {}", e))
            .ok()?;
        Some(SvnState {
            url: parse_url(&lines).unwrap_or_default(),
        })
    }

    fn resolve(&self, state: &SvnState, discovery: &Discovery, tag: &str) -> String {
        match tag {
            "svn" => discovery.root.display().to_string(),
            "svn-url" => state.url.clone(),
            _ => String::new(),
        }
    }

    fn satisfies(&self, state: &SvnState, discovery: &Discovery, tag: &str, glob: &Glob) -> bool {
        tag == "svn" || glob.is_match(&self.resolve(state, discovery, tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DebugMode, Solution};
    use crate::resolvers::repository::testing::settle;
    use crate::resolvers::{Resolver, ResolverSet};
    use crate::system::executor::testing::ScriptedRunner;
    use std::sync::Arc;
    use tempfile::tempdir;
    use tokio::runtime::Handle;

    const SVN_INFO: &str = "\
Path: .
Working Copy Root Path: /work/app
URL: https://svn.example.com/repos/app/trunk
Relative URL: ^/app/trunk
Revision: 1234
";

    #[test]
    fn test_parse_url() {
        let lines: Vec<String> = SVN_INFO.lines().map(str::to_string).collect();
        assert_eq!(
            parse_url(&lines).as_deref(),
            Some("https://svn.example.com/repos/app/trunk")
        );
        assert_eq!(parse_url(&[]), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_svn_resolver_reads_url() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".svn")).unwrap();
        let solution = Solution::from_path(dir.path()).unwrap();
        let runner = Arc::new(ScriptedRunner::new(&["svn"]));
        runner.respond("svn info", SVN_INFO);
        let svn = Arc::new(SvnResolver::new(SvnBackend, runner, Handle::current()));

        // --- Execute ---
        svn.solution_opened(&solution);
        assert!(settle(svn.as_ref()).await);

        // --- Assert ---
        let set = ResolverSet::new(vec![svn.clone() as Arc<dyn Resolver>]).unwrap();
        let state = set.state(DebugMode::Design, Some(&solution));
        assert!(state.condition("svn"));
        assert_eq!(
            state.resolve("svn-url").as_deref(),
            Some("https://svn.example.com/repos/app/trunk")
        );
    }
}
