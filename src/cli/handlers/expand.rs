// src/cli/handlers/expand.rs

use crate::{
    CancellationToken,
    cli::{args::ExpandArgs, handlers::commons},
};
use anyhow::Result;
use clap::Parser;

/// The main handler for the `expand` command.
pub fn handle(args: Vec<String>, _cancellation_token: &CancellationToken) -> Result<()> {
    let expand_args = ExpandArgs::try_parse_from(&args)?;
    let runtime = commons::build_runtime()?;
    let session = commons::open_session(
        &runtime,
        &expand_args.session,
        expand_args.solution.as_deref(),
    )?;

    println!("{}", session.expand(&expand_args.template));
    Ok(())
}
