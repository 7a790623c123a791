// src/cli/handlers/watch.rs

use crate::{
    CancellationToken,
    cli::{args::RenderArgs, handlers::commons, handlers::render::print_title_bar},
    constants::WATCH_DEBOUNCE,
};
use anyhow::Result;
use clap::Parser;
use colored::*;
use std::sync::Arc;
use std::sync::atomic::Ordering;

/// The main handler for the `watch` command.
/// Prints the title bar, then again after every change that alters it, until Ctrl+C.
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let watch_args = RenderArgs::try_parse_from(&args)?;
    let runtime = commons::build_runtime()?;
    let session = commons::open_session(&runtime, &watch_args.session, Some(&watch_args.solution))?;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<&'static str>();
    session.on_changed(Arc::new(move |source| {
        let _ = tx.send(source);
    }));
    session.watch_config();

    let mut last = session.title_bar_data();
    print_title_bar(&last, watch_args.json)?;
    eprintln!("{}", "Watching for changes. Press Ctrl+C to stop.".dimmed());

    runtime.block_on(async {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        while !cancellation_token.load(Ordering::SeqCst) {
            tokio::select! {
                _ = &mut ctrl_c => {
                    cancellation_token.store(true, Ordering::SeqCst);
                }
                source = rx.recv() => {
                    let Some(source) = source else { break };
                    // Let a burst of notifications settle before re-aggregating.
                    tokio::time::sleep(WATCH_DEBOUNCE).await;
                    while rx.try_recv().is_ok() {}

                    let data = session.title_bar_data();
                    if data == last {
                        log::debug!("'{}' changed but the title bar did not.", source);
                        continue;
                    }
                    println!();
                    print_title_bar(&data, watch_args.json)?;
                    last = data;
                }
            }
        }
        Ok::<(), anyhow::Error>(())
    })?;

    eprintln!("{}", "Stopped.".dimmed());
    Ok(())
}
