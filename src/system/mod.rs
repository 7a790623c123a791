//! # System Interaction Layer
//!
//! The boundary between the resolvers and the operating system.
//!
//! ## Modules
//!
//! - **`executor`**: Runs VCS command-line tools with a bounded timeout and captures
//!   their standard output, either blocking or as async line-buffered reads. The
//!   `CommandRunner` trait is the seam the resolvers are tested through.
//! - **`watcher`**: A debounced recursive directory watcher used for VCS metadata
//!   folders and rule files.

/// Running external tools.
pub mod executor;
/// Debounced directory watching.
pub mod watcher;
