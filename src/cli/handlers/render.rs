// src/cli/handlers/render.rs

use crate::{
    CancellationToken,
    cli::{args::RenderArgs, handlers::commons, render},
    models::TitleBarData,
};
use anyhow::Result;
use clap::Parser;

/// The main handler for the `render` command.
pub fn handle(args: Vec<String>, _cancellation_token: &CancellationToken) -> Result<()> {
    let render_args = RenderArgs::try_parse_from(&args)?;
    let runtime = commons::build_runtime()?;
    let session = commons::open_session(&runtime, &render_args.session, Some(&render_args.solution))?;

    print_title_bar(&session.title_bar_data(), render_args.json)
}

/// Prints the title bar either as JSON or as a colored line plus details.
pub fn print_title_bar(data: &TitleBarData, json: bool) -> Result<()> {
    if json {
        println!("{}", render::render_json(data)?);
        return Ok(());
    }

    let use_colors = colored::control::SHOULD_COLORIZE.should_colorize();
    println!("{}", render::render_line(data, use_colors));
    for line in render::render_details(data) {
        println!("{}", line);
    }
    Ok(())
}
