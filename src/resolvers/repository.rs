// src/resolvers/repository.rs

//! # Repository tracking
//!
//! Every VCS resolver follows the same life cycle:
//!
//! ```text
//! Unbound --solution opened--> Discovering --found--> Bound --solution closed--> Unbound
//!                                   \--not found / tool missing--> Unbound
//! ```
//!
//! While bound, a debounced watcher on the VCS metadata folder and an optional
//! poll timer request re-reads. Each read produces a complete state value which
//! replaces the previous one in a single swap, so readers never observe a mix of
//! old and new fields. A failed read swaps in the empty default state.
//!
//! Every binding carries a generation number that is bumped on open and close.
//! Work started under an older generation is discarded when it completes, and
//! among reads of the same generation only the most recently started one may win.
//! This keeps a slow read from resurrecting data after the solution was closed.
//!
//! The backend-specific parts (how to find the repository, which commands to run,
//! how to parse them) live behind [`VcsBackend`].

use super::{ChangeNotifier, Resolver, VsState};
use crate::constants::WATCH_DEBOUNCE;
use crate::core::glob::Glob;
use crate::models::Solution;
use crate::system::executor::CommandRunner;
use crate::system::watcher::{DirectoryWatcher, PathFilter, any_path};
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Where a repository was found and what to watch for changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    /// Working copy root (or client root for Perforce).
    pub root: PathBuf,
    /// Metadata directory to watch, if the backend supports watching.
    pub watch: Option<PathBuf>,
    /// Backend-specific identity, e.g. the Perforce client name.
    pub workspace: Option<String>,
}

/// The source-control specific half of a VCS resolver.
#[async_trait]
pub trait VcsBackend: Send + Sync + 'static {
    /// One complete read of the repository. `Default` is the empty sentinel.
    type State: Default + Clone + PartialEq + fmt::Debug + Send + Sync + 'static;

    /// Resolver name, also the availability tag (`git`, `svn`, ...).
    const NAME: &'static str;
    /// Every tag the backend owns, [`VcsBackend::NAME`] included.
    const TAGS: &'static [&'static str];

    /// The command-line tool this backend shells out to.
    fn executable(&self) -> &'static str;

    /// Locates the repository containing `start`. `None` leaves the resolver unbound.
    async fn discover(
        &self,
        runner: &dyn CommandRunner,
        program: &Path,
        start: &Path,
    ) -> Option<Discovery>;

    /// Reads the repository state. `None` means the read failed.
    async fn read(
        &self,
        runner: &dyn CommandRunner,
        program: &Path,
        discovery: &Discovery,
    ) -> Option<Self::State>;

    /// The value of `tag` in `state`.
    fn resolve(&self, state: &Self::State, discovery: &Discovery, tag: &str) -> String;

    /// Predicate match. Defaults to globbing [`VcsBackend::resolve`].
    fn satisfies(&self, state: &Self::State, discovery: &Discovery, tag: &str, glob: &Glob) -> bool {
        glob.is_match(&self.resolve(state, discovery, tag))
    }

    /// Period of the background re-read, if any.
    fn poll_interval(&self) -> Option<Duration> {
        None
    }

    /// Which changed paths under the watched directory warrant a re-read.
    fn watch_filter(&self) -> PathFilter {
        any_path()
    }
}

/// Returns the nearest ancestor of `start` (itself included) that contains `marker`.
pub fn find_marker(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).exists())
        .map(Path::to_path_buf)
}

/// Decrements the in-flight counter when dropped, including on task abort.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn start(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

struct Bound<S> {
    discovery: Arc<Discovery>,
    snapshot: Arc<S>,
}

struct Binding<S> {
    generation: u64,
    program: Option<PathBuf>,
    repo: Option<Bound<S>>,
    next_ticket: u64,
    applied_ticket: u64,
    watcher: Option<DirectoryWatcher>,
    poller: Option<JoinHandle<()>>,
}

impl<S> Default for Binding<S> {
    fn default() -> Self {
        Self {
            generation: 0,
            program: None,
            repo: None,
            next_ticket: 0,
            applied_ticket: 0,
            watcher: None,
            poller: None,
        }
    }
}

struct Tracker<B: VcsBackend> {
    backend: B,
    runner: Arc<dyn CommandRunner>,
    runtime: Handle,
    debounce: Duration,
    binding: Mutex<Binding<B::State>>,
    in_flight: Arc<AtomicUsize>,
    changed: ChangeNotifier,
}

impl<B: VcsBackend> Tracker<B> {
    fn lock(&self) -> MutexGuard<'_, Binding<B::State>> {
        self.binding.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Option<(Arc<B::State>, Arc<Discovery>)> {
        self.lock()
            .repo
            .as_ref()
            .map(|r| (r.snapshot.clone(), r.discovery.clone()))
    }

    /// Tears down the current binding. Resources are released outside the lock.
    fn unbind(&self) -> bool {
        let (was_bound, watcher, poller) = {
            let mut binding = self.lock();
            binding.generation += 1;
            binding.program = None;
            (
                binding.repo.take().is_some(),
                binding.watcher.take(),
                binding.poller.take(),
            )
        };
        if let Some(poller) = poller {
            poller.abort();
        }
        drop(watcher);
        was_bound
    }

    fn bind(self: &Arc<Self>, solution: &Solution) {
        let generation = {
            let mut binding = self.lock();
            binding.generation += 1;
            binding.generation
        };

        let guard = InFlight::start(&self.in_flight);
        let tracker = self.clone();
        let start = solution.directory.clone();
        self.runtime.spawn(async move {
            let _guard = guard;
            tracker.discover_and_read(generation, &start).await;
        });
    }

    async fn discover_and_read(self: &Arc<Self>, generation: u64, start: &Path) {
        let Some(program) = self.runner.locate(self.backend.executable()) else {
            log::debug!("[{}] '{}' not found in PATH.", B::NAME, self.backend.executable());
            return;
        };

        let Some(discovery) = self.backend.discover(&*self.runner, &program, start).await else {
            log::debug!("[{}] No repository above '{}'.", B::NAME, start.display());
            return;
        };

        let state = self
            .backend
            .read(&*self.runner, &program, &discovery)
            .await
            .unwrap_or_default();

        let mut watcher = discovery
            .watch
            .as_deref()
            .and_then(|dir| self.start_watcher(dir, generation));

        let bound = {
            let mut binding = self.lock();
            if binding.generation == generation {
                log::debug!("[{}] Bound to '{}'.", B::NAME, discovery.root.display());
                binding.program = Some(program);
                binding.repo = Some(Bound {
                    discovery: Arc::new(discovery),
                    snapshot: Arc::new(state),
                });
                binding.watcher = watcher.take();
                binding.poller = self.start_poller(generation);
                true
            } else {
                false
            }
        };

        if bound {
            self.changed.notify(B::NAME);
        } else {
            // The unused watcher is dropped here, outside the lock.
            log::debug!("[{}] Discarding discovery for a closed solution.", B::NAME);
        }
    }

    fn start_watcher(self: &Arc<Self>, dir: &Path, generation: u64) -> Option<DirectoryWatcher> {
        let weak: Weak<Self> = Arc::downgrade(self);
        DirectoryWatcher::watch(dir, true, self.debounce, self.backend.watch_filter(), move || {
            if let Some(tracker) = weak.upgrade() {
                tracker.refresh(generation);
            }
        })
        .map_err(|e| log::warn!("[{}] {}", B::NAME, e))
        .ok()
    }

    fn start_poller(self: &Arc<Self>, generation: u64) -> Option<JoinHandle<()>> {
        let period = self.backend.poll_interval()?;
        let weak: Weak<Self> = Arc::downgrade(self);
        Some(self.runtime.spawn(async move {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                interval.tick().await;
                match weak.upgrade() {
                    Some(tracker) => tracker.refresh(generation),
                    None => break,
                }
            }
        }))
    }

    /// Starts a re-read for `generation`. Stale generations are ignored.
    fn refresh(self: &Arc<Self>, generation: u64) {
        let (ticket, program, discovery) = {
            let mut binding = self.lock();
            let (Some(program), Some(repo)) = (binding.program.clone(), binding.repo.as_ref())
            else {
                return;
            };
            if binding.generation != generation {
                return;
            }
            let discovery = repo.discovery.clone();
            binding.next_ticket += 1;
            (binding.next_ticket, program, discovery)
        };

        let guard = InFlight::start(&self.in_flight);
        let tracker = self.clone();
        self.runtime.spawn(async move {
            let _guard = guard;
            let state = tracker
                .backend
                .read(&*tracker.runner, &program, &discovery)
                .await
                .unwrap_or_default();
            if tracker.apply(generation, ticket, state) {
                tracker.changed.notify(B::NAME);
            }
        });
    }

    /// Swaps in a completed read. Returns true when the visible state changed.
    fn apply(&self, generation: u64, ticket: u64, state: B::State) -> bool {
        let mut binding = self.lock();
        if binding.generation != generation || ticket <= binding.applied_ticket {
            return false;
        }
        binding.applied_ticket = ticket;
        match binding.repo.as_mut() {
            Some(repo) if *repo.snapshot != state => {
                repo.snapshot = Arc::new(state);
                true
            }
            _ => false,
        }
    }
}

/// A [`Resolver`] over any [`VcsBackend`].
pub struct VcsResolver<B: VcsBackend> {
    tracker: Arc<Tracker<B>>,
}

impl<B: VcsBackend> VcsResolver<B> {
    /// Creates an unbound resolver. `runtime` runs discovery, reads and polling.
    pub fn new(backend: B, runner: Arc<dyn CommandRunner>, runtime: Handle) -> Self {
        Self::with_debounce(backend, runner, runtime, WATCH_DEBOUNCE)
    }

    /// Like [`VcsResolver::new`] with a custom watcher debounce.
    pub fn with_debounce(
        backend: B,
        runner: Arc<dyn CommandRunner>,
        runtime: Handle,
        debounce: Duration,
    ) -> Self {
        Self {
            tracker: Arc::new(Tracker {
                backend,
                runner,
                runtime,
                debounce,
                binding: Mutex::new(Binding::default()),
                in_flight: Arc::new(AtomicUsize::new(0)),
                changed: ChangeNotifier::new(),
            }),
        }
    }

    /// Requests an immediate re-read of the bound repository.
    pub fn refresh(&self) {
        let generation = self.tracker.lock().generation;
        self.tracker.refresh(generation);
    }

    /// The repository root while bound.
    pub fn root(&self) -> Option<PathBuf> {
        self.tracker.snapshot().map(|(_, d)| d.root.clone())
    }

    /// True while a watcher is attached.
    pub fn is_watching(&self) -> bool {
        self.tracker.lock().watcher.is_some()
    }

    /// The current state value, or the empty default while unbound.
    pub fn snapshot(&self) -> B::State {
        self.tracker
            .snapshot()
            .map(|(s, _)| (*s).clone())
            .unwrap_or_default()
    }
}

impl<B: VcsBackend> Resolver for VcsResolver<B> {
    fn name(&self) -> &'static str {
        B::NAME
    }

    fn tags(&self) -> &[&'static str] {
        B::TAGS
    }

    fn available(&self) -> bool {
        self.tracker.lock().repo.is_some()
    }

    fn changed(&self) -> &ChangeNotifier {
        &self.tracker.changed
    }

    fn resolve_impl(&self, _state: &VsState<'_>, tag: &str) -> String {
        match self.tracker.snapshot() {
            Some((snapshot, discovery)) => self.tracker.backend.resolve(&snapshot, &discovery, tag),
            None => String::new(),
        }
    }

    fn satisfies_predicate_impl(&self, _state: &VsState<'_>, tag: &str, glob: &Glob) -> bool {
        match self.tracker.snapshot() {
            Some((snapshot, discovery)) => {
                self.tracker.backend.satisfies(&snapshot, &discovery, tag, glob)
            }
            None => false,
        }
    }

    fn solution_opened(&self, solution: &Solution) {
        if self.tracker.unbind() {
            self.tracker.changed.notify(B::NAME);
        }
        self.tracker.bind(solution);
    }

    fn solution_closed(&self) {
        if self.tracker.unbind() {
            log::debug!("[{}] Unbound.", B::NAME);
            self.tracker.changed.notify(B::NAME);
        }
    }

    fn is_settled(&self) -> bool {
        self.tracker.in_flight.load(Ordering::SeqCst) == 0
    }
}

impl<B: VcsBackend> fmt::Debug for VcsResolver<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VcsResolver")
            .field("backend", &B::NAME)
            .field("root", &self.root())
            .finish()
    }
}

/// Helpers shared by the backend tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::time::Instant;

    /// Polls `condition` until it holds or five seconds pass.
    pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        condition()
    }

    pub(crate) async fn settle(resolver: &dyn Resolver) -> bool {
        wait_until(|| resolver.is_settled()).await
    }
}
