// src/bin/shellbent.rs

//! The `shellbent` command-line tool.

use anyhow::{Result, anyhow};
use clap::{CommandFactory, Parser};
use colored::*;
use shellbent::{
    CancellationToken,
    cli::{Cli, handlers},
};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

// --- Command Definition and Registry ---

/// A command, its aliases and its handler.
/// Every handler shares one signature so the registry stays a flat table.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    handler: fn(Vec<String>, &CancellationToken) -> Result<()>,
}

/// All commands. To add one, add an entry here.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "render",
        aliases: &["show"],
        handler: handlers::render::handle,
    },
    CommandDefinition {
        name: "watch",
        aliases: &[],
        handler: handlers::watch::handle,
    },
    CommandDefinition {
        name: "expand",
        aliases: &["x"],
        handler: handlers::expand::handle,
    },
    CommandDefinition {
        name: "tags",
        aliases: &["ls"],
        handler: handlers::tags::handle,
    },
    CommandDefinition {
        name: "doctor",
        aliases: &[],
        handler: handlers::doctor::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

/// Sets up logging, dispatches to the handler and reports errors in one place.
fn main() {
    let cancellation_token = Arc::new(AtomicBool::new(false));
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse(), &cancellation_token) {
        // clap errors carry their own formatting and exit codes.
        if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
            clap_err.exit();
        }
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli, cancellation_token: &CancellationToken) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let Some(command_name) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let command = find_command(&command_name).ok_or_else(|| {
        anyhow!(
            "Unknown command '{}'. Run 'shellbent --help' for the list of commands.",
            command_name
        )
    })?;
    (command.handler)(cli.args, cancellation_token)
}
