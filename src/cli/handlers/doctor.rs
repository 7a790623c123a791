// src/cli/handlers/doctor.rs

use crate::{
    CancellationToken,
    constants::PROCESS_TIMEOUT,
    core::paths,
    system::executor::{self, ExecutionError},
};
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::path::Path;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Checks which source-control tools the resolvers can use."
)]
struct DoctorArgs {}

/// Each tool with the arguments that print its version.
const TOOLS: &[(&str, &str)] = &[
    ("git", "--version"),
    ("svn", "--version --quiet"),
    ("vsr", "--version"),
    ("p4", "-V"),
];

/// The main handler for the `doctor` command.
pub fn handle(args: Vec<String>, _cancellation_token: &CancellationToken) -> Result<()> {
    let _doctor_args = DoctorArgs::try_parse_from(&args)?;
    let cwd = std::env::current_dir().context("Failed to read the current directory")?;

    println!("\n--- {} ---", "Source control".yellow());
    for (tool, version_args) in TOOLS {
        let status = match executor::find_executable(tool) {
            None => "not found on PATH".yellow().to_string(),
            Some(program) => match tool_version(&cwd, &program, version_args) {
                Ok(version) => format!("{} ({})", version.green(), program.display()),
                Err(e) => e.to_string().red().to_string(),
            },
        };
        println!("  {:<6} {}", tool.blue(), status);
    }

    println!("\n--- {} ---", "Rules".yellow());
    match paths::user_config_path(None) {
        Ok(path) => {
            let state = if path.is_file() {
                "found".green()
            } else {
                "missing (built-in defaults apply)".dimmed()
            };
            println!("  {:<6} {} {}", "user".blue(), path.display(), state);
        }
        Err(e) => println!("  {:<6} {}", "user".blue(), e.to_string().red()),
    }
    Ok(())
}

/// Runs the version command and returns its first non-empty line.
fn tool_version(cwd: &Path, program: &Path, version_args: &str) -> Result<String, ExecutionError> {
    let argv = shlex::split(version_args).unwrap_or_default();
    let argv: Vec<&str> = argv.iter().map(String::as_str).collect();
    let output = executor::execute_and_capture_output(cwd, program, &argv, PROCESS_TIMEOUT)?;
    Ok(output
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or_default()
        .to_string())
}
