// src/core/mod.rs

/// Folds rule sets into one [`crate::models::TitleBarData`].
pub mod aggregator;
/// Color parsing.
pub mod color;
/// Rule files: reading, change detection and hot reload.
pub mod config_loader;
/// Case-insensitive `*`/`?` matching.
pub mod glob;
/// The title template language.
pub mod interpolator;
/// Where rule files live.
pub mod paths;
/// `tag` and `tag =~ glob` conditions.
pub mod predicates;
/// The host-facing entry point.
pub mod session;
/// Tag identifier grammar.
pub mod tags;
