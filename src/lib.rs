//! # shellbent
//!
//! Computes title bar captions, colors and info blocks from the state of the
//! open solution and its source-control system. Rules come from TOML files,
//! captions are written in a small template language, and a set of resolvers
//! (IDE, solution, Git, SVN, Versionr, Perforce) supply the tag values the
//! templates consume. Rendering is left to the host; this crate only produces
//! a [`models::TitleBarData`] value.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
/// Set to `true` to ask a long-running command to stop.
pub type CancellationToken = Arc<AtomicBool>;

/// Command-line front end.
pub mod cli;
/// Crate-wide constants.
pub mod constants;
/// Template engine, rule loading, aggregation and the host session.
pub mod core;
/// Profiling helpers.
pub mod dev_utils;
/// Serde models for rule files and the computed title bar.
pub mod models;
/// Tag sources.
pub mod resolvers;
/// Process execution and file watching.
pub mod system;
