// src/resolvers/git.rs

//! Git working copies are found by their `.git` marker. The `.git` folder is
//! watched and the state is also re-read every minute, which catches remote
//! tracking changes made by background fetches.

use super::repository::{Discovery, VcsBackend, VcsResolver, find_marker};
use crate::constants::POLL_INTERVAL;
use crate::core::glob::Glob;
use crate::system::executor::CommandRunner;
use crate::system::watcher::PathFilter;
use async_trait::async_trait;
use std::path::{Component, Path};
use std::sync::Arc;
use std::time::Duration;

/// Resolves `git` and the `git-*` tags.
pub type GitResolver = VcsResolver<GitBackend>;

const GIT_TAGS: &[&str] = &[
    "git",
    "git-branch",
    "git-sha",
    "git-commit-time-relative",
    "git-author",
    "git-subject",
    "git-remote-fetch",
    "git-remote-push",
    "git-fetch-ahead",
    "git-fetch-behind",
    "git-push-ahead",
    "git-push-behind",
];

/// One consistent read of a Git working copy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitState {
    /// Short branch name. Empty when detached.
    pub branch: String,
    /// Abbreviated commit hash.
    pub sha: String,
    /// Commit time, e.g. "2 hours ago".
    pub commit_time_relative: String,
    /// Commit author name.
    pub author: String,
    /// First line of the commit message.
    pub subject: String,
    /// Upstream ref, e.g. `origin/main`.
    pub remote_fetch: String,
    /// Push ref.
    pub remote_push: String,
    /// Commits ahead of upstream.
    pub fetch_ahead: String,
    /// Commits behind upstream.
    pub fetch_behind: String,
    /// Commits ahead of the push ref.
    pub push_ahead: String,
    /// Commits behind the push ref.
    pub push_behind: String,
}

/// Runs `git` in the working copy root.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitBackend;

async fn first_line(
    runner: &dyn CommandRunner,
    cwd: &Path,
    program: &Path,
    args: &[&str],
) -> Option<String> {
    match runner.capture(cwd, program, args).await {
        Ok(lines) => lines.into_iter().next().map(|l| l.trim().to_string()),
        Err(e) => {
            log::debug!("[git] {}", e);
            None
        }
    }
}

/// Parses `rev-list --left-right --count` output into (ahead, behind).
fn parse_ahead_behind(line: &str) -> Option<(String, String)> {
    let mut counts = line.split_whitespace();
    let ahead = counts.next()?.to_string();
    let behind = counts.next()?.to_string();
    Some((ahead, behind))
}

/// Resolves the tracking ref `spec` (e.g. `@{upstream}`) and its divergence from HEAD.
async fn read_tracking(
    runner: &dyn CommandRunner,
    cwd: &Path,
    program: &Path,
    spec: &str,
) -> (String, String, String) {
    let remote = first_line(
        runner,
        cwd,
        program,
        &["rev-parse", "--abbrev-ref", "--symbolic-full-name", spec],
    )
    .await
    .unwrap_or_default();
    if remote.is_empty() {
        return Default::default();
    }

    let range = format!("HEAD...{}", spec);
    let counts = first_line(runner, cwd, program, &["rev-list", "--left-right", "--count", range.as_str()])
        .await
        .and_then(|line| parse_ahead_behind(&line))
        .unwrap_or_default();
    (remote, counts.0, counts.1)
}

#[async_trait]
impl VcsBackend for GitBackend {
    type State = GitState;
    const NAME: &'static str = "git";
    const TAGS: &'static [&'static str] = GIT_TAGS;

    fn executable(&self) -> &'static str {
        "git"
    }

    async fn discover(
        &self,
        _runner: &dyn CommandRunner,
        _program: &Path,
        start: &Path,
    ) -> Option<Discovery> {
        let root = find_marker(start, ".git")?;
        let git_dir = root.join(".git");
        Some(Discovery {
            // Worktrees have a `.git` file; only a directory can be watched usefully.
            watch: git_dir.is_dir().then_some(git_dir),
            root,
            workspace: None,
        })
    }

    async fn read(
        &self,
        runner: &dyn CommandRunner,
        program: &Path,
        discovery: &Discovery,
    ) -> Option<GitState> {
        let cwd = discovery.root.as_path();

        // A detached HEAD has no symbolic ref and an unborn one has no commit.
        // Only a repository that answers neither counts as a failed read.
        let branch = first_line(runner, cwd, program, &["symbolic-ref", "-q", "--short", "HEAD"]).await;
        let commit = first_line(
            runner,
            cwd,
            program,
            &["show", "-s", "--format=%h|%cr|%an|%s", "HEAD"],
        )
        .await;
        if branch.is_none() && commit.is_none() {
            return None;
        }

        let commit = commit.unwrap_or_default();
        let mut fields = commit.splitn(4, '|').map(|f| f.trim().to_string());
        let sha = fields.next().unwrap_or_default();
        let commit_time_relative = fields.next().unwrap_or_default();
        let author = fields.next().unwrap_or_default();
        let subject = fields.next().unwrap_or_default();
        let branch = branch.unwrap_or_default();

        let (remote_fetch, fetch_ahead, fetch_behind) =
            read_tracking(runner, cwd, program, "@{upstream}").await;
        let (remote_push, push_ahead, push_behind) =
            read_tracking(runner, cwd, program, "@{push}").await;

        Some(GitState {
            branch,
            sha,
            commit_time_relative,
            author,
            subject,
            remote_fetch,
            remote_push,
            fetch_ahead,
            fetch_behind,
            push_ahead,
            push_behind,
        })
    }

    fn resolve(&self, state: &GitState, discovery: &Discovery, tag: &str) -> String {
        match tag {
            "git" => discovery.root.display().to_string(),
            "git-branch" => state.branch.clone(),
            "git-sha" => state.sha.clone(),
            "git-commit-time-relative" => state.commit_time_relative.clone(),
            "git-author" => state.author.clone(),
            "git-subject" => state.subject.clone(),
            "git-remote-fetch" => state.remote_fetch.clone(),
            "git-remote-push" => state.remote_push.clone(),
            "git-fetch-ahead" => state.fetch_ahead.clone(),
            "git-fetch-behind" => state.fetch_behind.clone(),
            "git-push-ahead" => state.push_ahead.clone(),
            "git-push-behind" => state.push_behind.clone(),
            _ => String::new(),
        }
    }

    fn satisfies(&self, state: &GitState, discovery: &Discovery, tag: &str, glob: &Glob) -> bool {
        match tag {
            "git" => true,
            _ => glob.is_match(&self.resolve(state, discovery, tag)),
        }
    }

    fn poll_interval(&self) -> Option<Duration> {
        Some(POLL_INTERVAL)
    }

    /// Object writes and lock files churn constantly during git operations.
    fn watch_filter(&self) -> PathFilter {
        Arc::new(|path: &Path| {
            let in_objects = path
                .components()
                .any(|c| matches!(c, Component::Normal(name) if name == "objects"));
            let is_lock = path.extension().is_some_and(|e| e == "lock");
            !in_objects && !is_lock
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::predicates::Predicate;
    use crate::models::{DebugMode, Solution};
    use crate::resolvers::repository::testing::settle;
    use crate::resolvers::{Resolver, ResolverSet};
    use crate::system::executor::testing::ScriptedRunner;
    use std::path::PathBuf;
    use tempfile::tempdir;
    use tokio::runtime::Handle;

    fn script(runner: &ScriptedRunner) {
        runner.respond("git symbolic-ref -q --short HEAD", "feature/x\n");
        runner.respond(
            "git show -s --format=%h|%cr|%an|%s HEAD",
            "abc1234|2 hours ago|Ada Lovelace|Fix the | pipe handling\n",
        );
        runner.respond(
            "git rev-parse --abbrev-ref --symbolic-full-name @{upstream}",
            "origin/feature/x",
        );
        runner.respond("git rev-list --left-right --count HEAD...@{upstream}", "2\t1");
    }

    #[test]
    fn test_parse_ahead_behind() {
        assert_eq!(
            parse_ahead_behind("3\t0"),
            Some(("3".to_string(), "0".to_string()))
        );
        assert_eq!(parse_ahead_behind("garbage"), None);
    }

    #[test]
    fn test_watch_filter_ignores_objects_and_locks() {
        let filter = GitBackend.watch_filter();
        let git: PathBuf = ["repo", ".git"].iter().collect();
        assert!(filter(&git.join("HEAD")));
        assert!(filter(&git.join("refs").join("heads").join("main")));
        assert!(!filter(&git.join("objects").join("ab").join("cdef")));
        assert!(!filter(&git.join("index.lock")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_git_resolver_end_to_end() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let sln = dir.path().join("MyApp.sln");
        std::fs::write(&sln, "").unwrap();
        let solution = Solution::from_path(&sln).unwrap();

        let runner = Arc::new(ScriptedRunner::new(&["git"]));
        script(&runner);
        let git = Arc::new(GitResolver::new(GitBackend, runner.clone(), Handle::current()));

        // --- Execute ---
        git.solution_opened(&solution);
        assert!(settle(git.as_ref()).await);

        // --- Assert ---
        let set = ResolverSet::new(vec![git.clone() as Arc<dyn Resolver>]).unwrap();
        let state = set.state(DebugMode::Design, Some(&solution));

        assert!(git.available());
        assert!(state.satisfies(&Predicate::new("git-branch", "feature/*")));
        assert!(state.satisfies(&Predicate::new("git", "")));
        assert_eq!(state.resolve("git-branch").as_deref(), Some("feature/x"));
        assert_eq!(state.resolve("git-sha").as_deref(), Some("abc1234"));
        assert_eq!(state.resolve("git-author").as_deref(), Some("Ada Lovelace"));
        assert_eq!(
            state.resolve("git-subject").as_deref(),
            Some("Fix the | pipe handling")
        );
        assert_eq!(state.resolve("git-fetch-ahead").as_deref(), Some("2"));
        assert_eq!(state.resolve("git-fetch-behind").as_deref(), Some("1"));
        assert_eq!(state.resolve("git-remote-push").as_deref(), Some(""));
        assert!(state.condition("git"));

        git.solution_closed();
        assert!(!git.available());
        assert!(!git.is_watching());
        assert!(!state.condition("git"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_detached_head_keeps_commit_fields() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let solution = Solution::from_path(dir.path()).unwrap();

        let runner = Arc::new(ScriptedRunner::new(&["git"]));
        runner.respond("git show -s --format=%h|%cr|%an|%s HEAD", "deadbee|now|Me|Msg");
        let git = GitResolver::new(GitBackend, runner, Handle::current());

        git.solution_opened(&solution);
        assert!(settle(&git).await);

        let snapshot = git.snapshot();
        assert_eq!(snapshot.branch, "");
        assert_eq!(snapshot.sha, "deadbee");
        assert_eq!(snapshot.remote_fetch, "");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_unborn_head_keeps_branch() {
        // --- Setup ---
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let solution = Solution::from_path(dir.path()).unwrap();

        let runner = Arc::new(ScriptedRunner::new(&["git"]));
        runner.respond("git symbolic-ref -q --short HEAD", "main\n");
        let git = GitResolver::new(GitBackend, runner, Handle::current());

        // --- Execute ---
        git.solution_opened(&solution);
        assert!(settle(&git).await);

        // --- Assert ---
        let snapshot = git.snapshot();
        assert_eq!(snapshot.branch, "main");
        assert_eq!(snapshot.sha, "");
        assert_eq!(snapshot.author, "");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_silent_repository_is_a_failed_read() {
        let dir = tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".git")).unwrap();
        let solution = Solution::from_path(dir.path()).unwrap();

        let runner = Arc::new(ScriptedRunner::new(&["git"]));
        let git = GitResolver::new(GitBackend, runner, Handle::current());

        git.solution_opened(&solution);
        assert!(settle(&git).await);

        assert_eq!(git.snapshot(), GitState::default());
    }
}
