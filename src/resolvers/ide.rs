// src/resolvers/ide.rs

//! `ide-mode` is only resolvable while a debuggee runs, so `?ide-mode{...}`
//! stays empty in design mode.

use super::{ChangeNotifier, Resolver, VsState};
use crate::constants::DEFAULT_IDE_NAME;
use crate::models::DebugMode;
use std::sync::{Mutex, PoisonError};

const TAGS: &[&str] = &["ide-name", "ide-mode"];

/// The host IDE: its display name and the debugger state.
#[derive(Debug)]
pub struct IdeResolver {
    ide_name: String,
    mode: Mutex<DebugMode>,
    changed: ChangeNotifier,
}

impl IdeResolver {
    /// Creates the resolver in design mode.
    pub fn new(ide_name: impl Into<String>) -> Self {
        Self {
            ide_name: ide_name.into(),
            mode: Mutex::new(DebugMode::Design),
            changed: ChangeNotifier::new(),
        }
    }

    /// The current debugger state.
    pub fn mode(&self) -> DebugMode {
        *self.mode.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records the debugger state. Subscribers are only notified on a real change.
    pub fn set_mode(&self, mode: DebugMode) {
        let changed = {
            let mut current = self.mode.lock().unwrap_or_else(PoisonError::into_inner);
            let changed = *current != mode;
            *current = mode;
            changed
        };
        if changed {
            log::debug!("IDE mode is now {:?}.", mode);
            self.changed.notify(self.name());
        }
    }
}

impl Default for IdeResolver {
    fn default() -> Self {
        Self::new(DEFAULT_IDE_NAME)
    }
}

fn mode_title(mode: DebugMode) -> &'static str {
    match mode {
        DebugMode::Design => "",
        DebugMode::Run => "(Running)",
        DebugMode::Break => "(Debugging)",
    }
}

impl Resolver for IdeResolver {
    fn name(&self) -> &'static str {
        "ide"
    }

    fn tags(&self) -> &[&'static str] {
        TAGS
    }

    fn available(&self) -> bool {
        true
    }

    fn changed(&self) -> &ChangeNotifier {
        &self.changed
    }

    fn resolvable_impl(&self, state: &VsState<'_>, tag: &str) -> bool {
        tag != "ide-mode" || state.mode != DebugMode::Design
    }

    fn resolve_impl(&self, state: &VsState<'_>, tag: &str) -> String {
        match tag {
            "ide-name" => self.ide_name.clone(),
            "ide-mode" => mode_title(state.mode).to_string(),
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolvers::ResolverSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_ide_mode_is_only_resolvable_outside_design() {
        let ide = Arc::new(IdeResolver::default());
        let set = ResolverSet::new(vec![ide.clone() as Arc<dyn Resolver>]).unwrap();

        let design = set.state(DebugMode::Design, None);
        assert!(!ide.resolvable(&design, "ide-mode"));
        assert_eq!(design.resolve("ide-name").as_deref(), Some(DEFAULT_IDE_NAME));

        let running = set.state(DebugMode::Run, None);
        assert_eq!(running.resolve("ide-mode").as_deref(), Some("(Running)"));

        let breaking = set.state(DebugMode::Break, None);
        assert_eq!(breaking.resolve("ide-mode").as_deref(), Some("(Debugging)"));
    }

    #[test]
    fn test_set_mode_notifies_only_on_change() {
        // --- Setup ---
        let ide = IdeResolver::new("Test IDE");
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        ide.changed().subscribe(Arc::new(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        // --- Execute ---
        ide.set_mode(DebugMode::Design);
        ide.set_mode(DebugMode::Run);
        ide.set_mode(DebugMode::Run);
        ide.set_mode(DebugMode::Break);

        // --- Assert ---
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(ide.mode(), DebugMode::Break);
    }
}
