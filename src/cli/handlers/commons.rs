// src/cli/handlers/commons.rs

// Shared plumbing for the handlers that build a session.

use crate::cli::args::SessionArgs;
use crate::core::paths;
use crate::core::session::Session;
use anyhow::{Context, Result, anyhow};
use std::time::Duration;
use tokio::runtime::Runtime;

/// The runtime driving the resolvers' background work for one command.
pub fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("shellbent-worker")
        .build()
        .context("Failed to start the async runtime")
}

/// Creates a session from the shared options and, if given, opens `solution`
/// and waits (bounded by `--settle-ms`) for the source-control reads.
pub fn open_session(
    runtime: &Runtime,
    args: &SessionArgs,
    solution: Option<&str>,
) -> Result<Session> {
    let config = paths::user_config_path(args.config.as_deref())?;
    log::debug!("Using user rules from '{}'.", config.display());

    let session = Session::new(config, runtime.handle().clone())?;
    session.set_debug_mode(args.mode);

    if let Some(raw) = solution {
        let path = paths::expand_path(raw)?;
        if !path.exists() {
            return Err(anyhow!("Solution '{}' does not exist.", path.display()));
        }
        session
            .open_solution(&path)
            .with_context(|| format!("Failed to open '{}'", path.display()))?;

        let timeout = Duration::from_millis(args.settle_ms);
        if !runtime.block_on(session.settle(timeout)) {
            log::warn!("Source-control reads are still running; showing what is known so far.");
        }
    }

    Ok(session)
}
