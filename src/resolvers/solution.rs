// src/resolvers/solution.rs

use super::{ChangeNotifier, Resolver, VsState};
use crate::core::glob::Glob;
use crate::core::tags;
use crate::models::Solution;
use std::path::MAIN_SEPARATOR;
use std::sync::{Mutex, PoisonError};

const TAGS: &[&str] = &[
    "solution",
    "solution-name",
    "item-name",
    "solution-path",
    "solution-dir",
    "path",
];

/// Name and location of the open solution.
///
/// `path(from, count)` slices the solution directory: it skips `from` segments
/// counted from the end and keeps the `count` before them, in their original order.
#[derive(Debug, Default)]
pub struct SolutionResolver {
    solution: Mutex<Option<Solution>>,
    changed: ChangeNotifier,
}

impl SolutionResolver {
    /// Creates the resolver with no solution open.
    pub fn new() -> Self {
        Self::default()
    }

    fn current(&self) -> Option<Solution> {
        self.solution
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Resolver for SolutionResolver {
    fn name(&self) -> &'static str {
        "solution"
    }

    fn tags(&self) -> &[&'static str] {
        TAGS
    }

    fn available(&self) -> bool {
        self.solution
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn changed(&self) -> &ChangeNotifier {
        &self.changed
    }

    fn resolvable_impl(&self, state: &VsState<'_>, _tag: &str) -> bool {
        state.solution.is_some()
    }

    fn resolve_impl(&self, state: &VsState<'_>, tag: &str) -> String {
        let Some(solution) = state.solution.cloned().or_else(|| self.current()) else {
            return String::new();
        };

        match tags::base_identifier(tag) {
            Some("solution") | Some("solution-path") => solution.path.display().to_string(),
            Some("solution-name") | Some("item-name") => solution.name,
            Some("solution-dir") => solution.directory.display().to_string(),
            Some("path") => {
                let sliced = if tag == "path" {
                    Some((0, 1))
                } else {
                    tags::slice_arguments(tag, "path", 1)
                };
                let Some((from, count)) = sliced else {
                    log::debug!("Malformed path slice '{}'.", tag);
                    return String::new();
                };
                tags::take_trailing_segments(
                    &solution.directory.display().to_string(),
                    MAIN_SEPARATOR,
                    from,
                    count,
                )
            }
            _ => String::new(),
        }
    }

    fn satisfies_predicate_impl(&self, state: &VsState<'_>, tag: &str, glob: &Glob) -> bool {
        match tag {
            "solution" => true,
            _ => glob.is_match(&self.resolve_impl(state, tag)),
        }
    }

    fn solution_opened(&self, solution: &Solution) {
        *self.solution.lock().unwrap_or_else(PoisonError::into_inner) = Some(solution.clone());
        self.changed.notify(self.name());
    }

    fn solution_closed(&self) {
        let previous = self
            .solution
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            self.changed.notify(self.name());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::predicates::Predicate;
    use crate::models::DebugMode;
    use crate::resolvers::ResolverSet;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn sample() -> Solution {
        let directory: PathBuf = ["", "work", "clients", "acme", "MyApp"].iter().collect();
        Solution {
            path: directory.join("MyApp.sln"),
            directory,
            name: "MyApp".to_string(),
        }
    }

    #[test]
    fn test_unavailable_until_opened() {
        let resolver = Arc::new(SolutionResolver::new());
        let set = ResolverSet::new(vec![resolver.clone() as Arc<dyn Resolver>]).unwrap();
        let state = set.state(DebugMode::Design, None);

        assert!(!resolver.available());
        assert!(!state.condition("solution"));
        assert_eq!(state.resolve("solution-name"), None);
    }

    #[test]
    fn test_resolves_names_paths_and_slices() {
        // --- Setup ---
        let solution = sample();
        let resolver = Arc::new(SolutionResolver::new());
        resolver.solution_opened(&solution);
        let set = ResolverSet::new(vec![resolver.clone() as Arc<dyn Resolver>]).unwrap();
        let state = set.state(DebugMode::Design, Some(&solution));

        // --- Execute & Assert ---
        let sep = MAIN_SEPARATOR.to_string();
        assert_eq!(state.resolve("solution-name").as_deref(), Some("MyApp"));
        assert_eq!(state.resolve("item-name").as_deref(), Some("MyApp"));
        assert_eq!(
            state.resolve("solution-dir"),
            Some(solution.directory.display().to_string())
        );
        assert!(state.condition("solution"));
        assert_eq!(
            state.resolve("path(0,2)"),
            Some(["acme", "MyApp"].join(&sep))
        );
        assert_eq!(state.resolve("path(1,1)").as_deref(), Some("acme"));
        assert_eq!(state.resolve("path(oops)").as_deref(), Some(""));
        assert!(state.satisfies(&Predicate::new("solution-name", "my*")));
        assert!(!state.satisfies(&Predicate::new("solution-name", "Other")));
    }

    #[test]
    fn test_close_resets_availability() {
        let resolver = SolutionResolver::new();
        resolver.solution_opened(&sample());
        assert!(resolver.available());

        resolver.solution_closed();

        assert!(!resolver.available());
    }
}
