// src/resolvers/mod.rs

//! # Resolvers
//!
//! A resolver owns a fixed set of tags and answers four questions about them:
//! whether it is currently able to answer at all (`available`), whether a tag is
//! one of its own (`applicable`), whether a tag is currently worth substituting
//! (`resolvable`), and what the tag's value is (`resolve`).
//!
//! Resolvers cache whatever they read from the outside world and raise a change
//! notification when that cache moves, so the host can re-aggregate. Every query
//! is served from the cache; nothing here blocks on I/O.
//!
//! ## Modules
//!
//! - **`ide`**: `ide-name` and the debugger state (`ide-mode`).
//! - **`solution`**: solution name, paths and the `path(from,count)` slicer.
//! - **`repository`**: the discovery/refresh/watch machinery shared by every VCS.
//! - **`git`**, **`svn`**, **`vsr`**, **`p4`**: the VCS backends plugged into it.

/// Git working copies.
pub mod git;
/// The host IDE and its debugger state.
pub mod ide;
/// Perforce client workspaces.
pub mod p4;
/// Discovery, refresh and watching shared by the VCS resolvers.
pub mod repository;
/// The open solution.
pub mod solution;
/// Subversion working copies.
pub mod svn;
/// Versionr working copies.
pub mod vsr;

use crate::core::glob::Glob;
use crate::core::predicates::Predicate;
use crate::core::tags;
use crate::models::{DebugMode, Solution};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Callback invoked with the name of the resolver whose cache changed.
pub type ChangeCallback = Arc<dyn Fn(&'static str) + Send + Sync>;

/// Errors raised while assembling a [`ResolverSet`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResolverError {
    /// Two resolvers claim the same base identifier.
    #[error("Tag '{tag}' is claimed by both '{first}' and '{second}'.")]
    DuplicateTag {
        /// The contested identifier.
        tag: String,
        /// The resolver listed first.
        first: &'static str,
        /// The resolver that claimed it again.
        second: &'static str,
    },
}

/// A source of tag values. See the module docs for the four queries.
pub trait Resolver: Send + Sync {
    /// Short name used in logs and `shellbent tags`.
    fn name(&self) -> &'static str;

    /// The base identifiers this resolver owns.
    fn tags(&self) -> &[&'static str];

    /// True when the resolver has enough context to answer queries.
    fn available(&self) -> bool;

    /// The notifier fired whenever the cached state changes.
    fn changed(&self) -> &ChangeNotifier;

    /// True when `tag`'s base identifier is one of [`Resolver::tags`].
    fn applicable(&self, tag: &str) -> bool {
        tags::base_identifier(tag).is_some_and(|id| self.tags().contains(&id))
    }

    /// Tag-specific gating on top of availability. Defaults to always true.
    fn resolvable_impl(&self, _state: &VsState<'_>, _tag: &str) -> bool {
        true
    }

    /// The tag's value. Only called for applicable tags while available.
    fn resolve_impl(&self, state: &VsState<'_>, tag: &str) -> String;

    /// Tag-specific match of the cached value. Defaults to globbing the resolved value.
    fn satisfies_predicate_impl(&self, state: &VsState<'_>, tag: &str, glob: &Glob) -> bool {
        self.resolvable_impl(state, tag) && glob.is_match(&self.resolve_impl(state, tag))
    }

    /// True when `tag` is applicable, the resolver is available and the tag-specific
    /// gate passes.
    fn resolvable(&self, state: &VsState<'_>, tag: &str) -> bool {
        self.applicable(tag) && self.available() && self.resolvable_impl(state, tag)
    }

    /// Matches `tag` against `glob`, behind the same gates as [`Resolver::resolvable`].
    fn satisfies_predicate(&self, state: &VsState<'_>, tag: &str, glob: &Glob) -> bool {
        self.applicable(tag) && self.available() && self.satisfies_predicate_impl(state, tag, glob)
    }

    /// Never fails: inapplicable or unavailable tags resolve to "".
    fn resolve(&self, state: &VsState<'_>, tag: &str) -> String {
        if self.applicable(tag) && self.available() {
            self.resolve_impl(state, tag)
        } else {
            String::new()
        }
    }

    /// Called after the host opened a solution.
    fn solution_opened(&self, _solution: &Solution) {}

    /// Called after the host closed the solution. Cached state must be dropped.
    fn solution_closed(&self) {}

    /// False while discovery or a refresh is still in flight.
    fn is_settled(&self) -> bool {
        true
    }
}

/// Fan-out of change notifications to every subscriber.
#[derive(Default)]
pub struct ChangeNotifier {
    subscribers: Mutex<Vec<ChangeCallback>>,
}

impl ChangeNotifier {
    /// Creates a notifier without subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` for every later notification.
    pub fn subscribe(&self, callback: ChangeCallback) {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(callback);
    }

    /// Calls every subscriber with `source`.
    pub fn notify(&self, source: &'static str) {
        // Callbacks run outside the lock so they may subscribe or query freely.
        let subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        log::trace!("'{}' changed, notifying {} subscriber(s).", source, subscribers.len());
        for callback in subscribers {
            callback(source);
        }
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("ChangeNotifier")
            .field("subscribers", &count)
            .finish()
    }
}

/// The ordered, validated list of active resolvers. Each tag has exactly one owner.
#[derive(Clone)]
pub struct ResolverSet {
    resolvers: Vec<Arc<dyn Resolver>>,
}

impl ResolverSet {
    /// Validates the list. Fails when a tag is owned by more than one resolver.
    pub fn new(resolvers: Vec<Arc<dyn Resolver>>) -> Result<Self, ResolverError> {
        let mut owners: Vec<(&'static str, &'static str)> = Vec::new();
        for resolver in &resolvers {
            for &tag in resolver.tags() {
                if let Some(&(_, first)) = owners.iter().find(|(t, _)| *t == tag) {
                    return Err(ResolverError::DuplicateTag {
                        tag: tag.to_string(),
                        first,
                        second: resolver.name(),
                    });
                }
                owners.push((tag, resolver.name()));
            }
        }
        Ok(Self { resolvers })
    }

    /// The resolvers as a slice, in query order.
    pub fn as_slice(&self) -> &[Arc<dyn Resolver>] {
        &self.resolvers
    }

    /// The resolvers in query order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Resolver>> {
        self.resolvers.iter()
    }

    /// Builds the query context for the given debugger mode and solution.
    pub fn state<'a>(&'a self, mode: DebugMode, solution: Option<&'a Solution>) -> VsState<'a> {
        VsState {
            resolvers: &self.resolvers,
            mode,
            solution,
        }
    }
}

impl fmt::Debug for ResolverSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.resolvers.iter().map(|r| r.name()))
            .finish()
    }
}

/// The ambient context of every query: resolvers, debugger mode, open solution.
#[derive(Clone, Copy)]
pub struct VsState<'a> {
    /// Queried in order; the first applicable one answers.
    pub resolvers: &'a [Arc<dyn Resolver>],
    /// The debugger state reported by the host.
    pub mode: DebugMode,
    /// The open solution, if any.
    pub solution: Option<&'a Solution>,
}

impl<'a> VsState<'a> {
    /// The resolver owning `tag`, if any.
    pub fn owner(&self, tag: &str) -> Option<&'a Arc<dyn Resolver>> {
        self.resolvers.iter().find(|r| r.applicable(tag))
    }

    /// The value of the first resolver able to resolve `tag`, or `None`.
    pub fn resolve(&self, tag: &str) -> Option<String> {
        self.resolvers
            .iter()
            .find(|r| r.resolvable(self, tag))
            .map(|r| r.resolve(self, tag))
    }

    /// True iff `tag` is resolvable and its value is non-empty.
    pub fn condition(&self, tag: &str) -> bool {
        self.resolve(tag).is_some_and(|v| !v.is_empty())
    }

    /// True when some resolver matches `predicate`.
    pub fn satisfies(&self, predicate: &Predicate) -> bool {
        self.resolvers
            .iter()
            .any(|r| r.satisfies_predicate(self, &predicate.tag, &predicate.glob))
    }

    /// True when every predicate is satisfied. An empty list always is.
    pub fn satisfies_all<'p>(&self, predicates: impl IntoIterator<Item = &'p Predicate>) -> bool {
        predicates.into_iter().all(|p| self.satisfies(p))
    }
}

impl fmt::Debug for VsState<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VsState")
            .field(
                "resolvers",
                &self.resolvers.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .field("mode", &self.mode)
            .field("solution", &self.solution.map(|s| &s.name))
            .finish()
    }
}
