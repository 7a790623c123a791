// src/core/session.rs

//! # Session
//!
//! The host side of the engine. A [`Session`] owns the resolver list, the three
//! rule sources and a change fan-out. Hosts open and close solutions, report the
//! debugger state, subscribe to [`Session::on_changed`] and call
//! [`Session::title_bar_data`] whenever they are told something moved.

use crate::core::aggregator;
use crate::core::config_loader::{RuleOrigin, RuleSet, SettingsFile};
use crate::core::interpolator;
use crate::core::paths;
use crate::models::{DebugMode, Solution, TitleBarData};
use crate::resolvers::git::{GitBackend, GitResolver};
use crate::resolvers::ide::IdeResolver;
use crate::resolvers::p4::{P4Backend, P4Resolver};
use crate::resolvers::solution::SolutionResolver;
use crate::resolvers::svn::{SvnBackend, SvnResolver};
use crate::resolvers::vsr::{VsrBackend, VsrResolver};
use crate::resolvers::{ChangeCallback, ChangeNotifier, Resolver, ResolverSet, VsState};
use crate::system::executor::{CommandRunner, ProcessRunner};
use anyhow::{Context, Result, anyhow};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::runtime::Handle;

const CONFIG_SOURCE: &str = "config";
const SETTLE_POLL: Duration = Duration::from_millis(10);

/// One host window: the resolvers, the rule sources and the open solution.
pub struct Session {
    ide: Arc<IdeResolver>,
    resolvers: ResolverSet,
    defaults: RuleSet,
    user_rules: Arc<SettingsFile>,
    solution_rules: Mutex<Option<Arc<SettingsFile>>>,
    solution: Mutex<Option<Solution>>,
    watch_config: AtomicBool,
    changed: Arc<ChangeNotifier>,
}

impl Session {
    /// Creates a session with the real process runner. `runtime` drives the
    /// background discovery and refresh work of the VCS resolvers.
    pub fn new(user_config: PathBuf, runtime: Handle) -> Result<Self> {
        Self::with_runner(user_config, Arc::new(ProcessRunner::default()), runtime)
    }

    /// Creates a session whose VCS resolvers run commands through `runner`.
    pub fn with_runner(
        user_config: PathBuf,
        runner: Arc<dyn CommandRunner>,
        runtime: Handle,
    ) -> Result<Self> {
        let ide = Arc::new(IdeResolver::default());
        let resolvers = ResolverSet::new(vec![
            ide.clone() as Arc<dyn Resolver>,
            Arc::new(SolutionResolver::new()),
            Arc::new(GitResolver::new(GitBackend, runner.clone(), runtime.clone())),
            Arc::new(VsrResolver::new(VsrBackend, runner.clone(), runtime.clone())),
            Arc::new(SvnResolver::new(SvnBackend, runner.clone(), runtime.clone())),
            Arc::new(P4Resolver::new(P4Backend, runner, runtime)),
        ])
        .context("Failed to assemble the resolver list")?;

        let changed = Arc::new(ChangeNotifier::new());
        for resolver in resolvers.iter() {
            let fan_out = changed.clone();
            resolver
                .changed()
                .subscribe(Arc::new(move |source| fan_out.notify(source)));
        }

        log::debug!("Session created with resolvers {:?}.", resolvers);

        Ok(Self {
            ide,
            resolvers,
            defaults: RuleSet::defaults(),
            user_rules: SettingsFile::open(RuleOrigin::User, user_config),
            solution_rules: Mutex::new(None),
            solution: Mutex::new(None),
            watch_config: AtomicBool::new(false),
            changed,
        })
    }

    /// The resolvers in query order.
    pub fn resolvers(&self) -> &ResolverSet {
        &self.resolvers
    }

    /// The user rule file, whether or not it exists.
    pub fn user_config_path(&self) -> &Path {
        self.user_rules.path()
    }

    /// The open solution, if any.
    pub fn solution(&self) -> Option<Solution> {
        self.solution
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The debugger state last reported by the host.
    pub fn debug_mode(&self) -> DebugMode {
        self.ide.mode()
    }

    /// Reports the debugger state. Fires a change when it differs from the last one.
    pub fn set_debug_mode(&self, mode: DebugMode) {
        self.ide.set_mode(mode);
    }

    /// Subscribes to every change that may alter the title bar.
    pub fn on_changed(&self, callback: ChangeCallback) {
        self.changed.subscribe(callback);
    }

    /// Opens `path` (a solution file or a folder), closing any previous solution.
    pub fn open_solution(&self, path: &Path) -> Result<Solution> {
        let solution = Solution::from_path(path)
            .ok_or_else(|| anyhow!("'{}' cannot be opened as a solution", path.display()))?;

        if self.solution().is_some() {
            self.close_solution();
        }
        log::info!("Opening solution '{}'.", solution.path.display());

        *self.solution.lock().unwrap_or_else(PoisonError::into_inner) = Some(solution.clone());

        let rules = SettingsFile::open(RuleOrigin::Solution, paths::solution_config_path(&solution));
        if self.watch_config.load(Ordering::SeqCst) {
            self.watch_file(&rules);
        }
        *self
            .solution_rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(rules);

        for resolver in self.resolvers.iter() {
            resolver.solution_opened(&solution);
        }
        Ok(solution)
    }

    /// Unbinds every solution-scoped resolver and drops the solution's rule file.
    pub fn close_solution(&self) {
        let previous = self
            .solution
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(solution) = previous {
            log::info!("Closing solution '{}'.", solution.path.display());
        }

        let rules = self
            .solution_rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(rules);

        for resolver in self.resolvers.iter() {
            resolver.solution_closed();
        }
    }

    /// Starts hot-reloading the rule files. Reloads that change a file's
    /// content are reported through [`Session::on_changed`].
    pub fn watch_config(&self) {
        if self.watch_config.swap(true, Ordering::SeqCst) {
            return;
        }
        self.watch_file(&self.user_rules);
        let solution_rules = self
            .solution_rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(rules) = solution_rules {
            self.watch_file(&rules);
        }
    }

    fn watch_file(&self, file: &Arc<SettingsFile>) {
        let changed = self.changed.clone();
        file.watch(move || changed.notify(CONFIG_SOURCE));
    }

    /// Runs `f` against a consistent view of the resolvers.
    pub fn with_state<R>(&self, f: impl FnOnce(&VsState<'_>) -> R) -> R {
        let solution = self.solution();
        let state = self.resolvers.state(self.debug_mode(), solution.as_ref());
        f(&state)
    }

    /// Aggregates all rule sources against the current resolver state.
    pub fn title_bar_data(&self) -> TitleBarData {
        let user = self.user_rules.rules();
        let solution = self
            .solution_rules
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|file| file.rules());

        let mut sets: Vec<&RuleSet> = vec![&self.defaults, user.as_ref()];
        if let Some(solution) = &solution {
            sets.push(solution.as_ref());
        }

        self.with_state(|state| aggregator::aggregate(&sets, state))
    }

    /// Expands a single template against the current resolver state.
    pub fn expand(&self, template: &str) -> String {
        self.with_state(|state| interpolator::expand(state, template))
    }

    /// True when no resolver has discovery or a refresh in flight.
    pub fn is_settled(&self) -> bool {
        self.resolvers.iter().all(|r| r.is_settled())
    }

    /// Waits until [`Session::is_settled`] holds or `timeout` passes.
    /// Returns whether the session settled in time.
    pub async fn settle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_settled() {
                return true;
            }
            if Instant::now() >= deadline {
                log::debug!("Resolvers did not settle within {:?}.", timeout);
                return false;
            }
            tokio::time::sleep(SETTLE_POLL).await;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        for resolver in self.resolvers.iter() {
            resolver.solution_closed();
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("resolvers", &self.resolvers)
            .field("user_rules", &self.user_rules.path())
            .field("solution", &self.solution().map(|s| s.name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::executor::testing::ScriptedRunner;
    use std::sync::atomic::AtomicUsize;
    use tempfile::{TempDir, tempdir};

    const WAIT: Duration = Duration::from_secs(5);

    struct Fixture {
        _dir: TempDir,
        solution: PathBuf,
        user_config: PathBuf,
        runner: Arc<ScriptedRunner>,
    }

    fn fixture() -> Fixture {
        let dir = tempdir().unwrap();
        let repo = dir.path().join("repo");
        std::fs::create_dir_all(repo.join(".git")).unwrap();
        let solution = repo.join("MyApp.sln");
        std::fs::write(&solution, "").unwrap();

        let runner = Arc::new(ScriptedRunner::new(&["git"]));
        runner.respond("git symbolic-ref -q --short HEAD", "feature/x");
        runner.respond("git show -s --format=%h|%cr|%an|%s HEAD", "abc1234|now|Ada|Init");

        Fixture {
            user_config: dir.path().join("user").join("shellbent.toml"),
            solution,
            runner,
            _dir: dir,
        }
    }

    fn session(fx: &Fixture) -> Session {
        Session::with_runner(fx.user_config.clone(), fx.runner.clone(), Handle::current()).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_default_caption_follows_solution_and_mode() {
        // --- Setup ---
        let fx = fixture();
        let session = session(&fx);

        // --- Execute & Assert ---
        assert_eq!(
            session.title_bar_data().title.as_deref(),
            Some("Microsoft Visual Studio")
        );

        session.open_solution(&fx.solution).unwrap();
        assert!(session.settle(WAIT).await);
        assert_eq!(
            session.title_bar_data().title.as_deref(),
            Some("MyApp - Microsoft Visual Studio")
        );

        session.set_debug_mode(DebugMode::Run);
        assert_eq!(
            session.title_bar_data().title.as_deref(),
            Some("MyApp - Microsoft Visual Studio (Running)")
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_solution_rules_override_user_rules() {
        let fx = fixture();
        std::fs::create_dir_all(fx.user_config.parent().unwrap()).unwrap();
        std::fs::write(
            &fx.user_config,
            r##"
            [[rules]]
            title-bar-caption = "user caption"
            title-bar-foreground = "#ffffff"
            "##,
        )
        .unwrap();
        std::fs::write(
            fx.solution.with_file_name("shellbent.toml"),
            r##"
            [[rules]]
            predicates = ["git-branch =~ feature/*"]
            title-bar-caption = "$solution-name ($git-branch)"
            title-bar-background = "#224488"
            "##,
        )
        .unwrap();
        let session = session(&fx);

        session.open_solution(&fx.solution).unwrap();
        assert!(session.settle(WAIT).await);
        let data = session.title_bar_data();

        assert_eq!(data.title.as_deref(), Some("MyApp (feature/x)"));
        assert_eq!(data.foreground, Some(crate::models::Color::WHITE));
        assert_eq!(
            data.background,
            Some(crate::models::Color::rgb(0x22, 0x44, 0x88))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_close_solution_unbinds_and_goes_quiet() {
        // --- Setup ---
        let fx = fixture();
        let session = session(&fx);
        session.open_solution(&fx.solution).unwrap();
        assert!(session.settle(WAIT).await);
        assert_eq!(session.expand("$git-branch"), "feature/x");

        // --- Execute ---
        session.close_solution();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        session.on_changed(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        std::fs::write(fx.solution.with_file_name(".git").join("HEAD"), "x").unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;

        // --- Assert ---
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(session.solution().is_none());
        assert!(session.resolvers().iter().all(|r| r.name() == "ide" || !r.available()));
        assert_eq!(session.expand("?git{in a repo}"), "");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_config_edit_fires_change() {
        let fx = fixture();
        std::fs::create_dir_all(fx.user_config.parent().unwrap()).unwrap();
        std::fs::write(&fx.user_config, "").unwrap();
        let session = session(&fx);
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        session.on_changed(Arc::new(move |source| {
            let _ = tx.send(source);
        }));
        session.watch_config();

        std::fs::write(
            &fx.user_config,
            "[[rules]]\ntitle-bar-caption = \"edited\"\n",
        )
        .unwrap();

        let source = tokio::time::timeout(WAIT, rx.recv()).await.unwrap();
        assert_eq!(source, Some(CONFIG_SOURCE));
        assert_eq!(session.title_bar_data().title.as_deref(), Some("edited"));
    }

    #[test]
    fn test_open_rejects_filesystem_root() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dir = tempdir().unwrap();
        let session = Session::with_runner(
            dir.path().join("shellbent.toml"),
            Arc::new(ScriptedRunner::new(&[])),
            runtime.handle().clone(),
        )
        .unwrap();

        let root = Path::new("/");
        assert!(session.open_solution(root).is_err());
        assert!(session.solution().is_none());
    }
}
