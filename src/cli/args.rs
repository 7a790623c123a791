// src/cli/args.rs

//! Argument parsers for the commands. Each receives the arguments left over
//! after the command name.

use crate::models::DebugMode;
use clap::{Args, Parser};

/// Options shared by every command that builds a session.
#[derive(Args, Debug, Default, Clone)]
pub struct SessionArgs {
    /// The user rule file. Defaults to `$SHELLBENT_CONFIG` or the config directory.
    #[arg(long)]
    pub config: Option<String>,

    /// The debugger state to report: design, run or break.
    #[arg(long, default_value = "design")]
    pub mode: DebugMode,

    /// How long to wait for source-control reads, in milliseconds.
    #[arg(long, default_value_t = 5000)]
    pub settle_ms: u64,
}

/// Prints the title bar computed for a solution.
#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)] // The command name was already consumed by the registry.
pub struct RenderArgs {
    /// The solution file or folder to open.
    pub solution: String,

    /// Options shared with the other commands.
    #[command(flatten)]
    pub session: SessionArgs,

    /// Print the title bar as JSON instead of a colored line.
    #[arg(long)]
    pub json: bool,
}

/// Expands one template.
#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct ExpandArgs {
    /// The template to expand.
    pub template: String,

    /// The solution file or folder providing the tag values.
    #[arg(long)]
    pub solution: Option<String>,

    /// Options shared with the other commands.
    #[command(flatten)]
    pub session: SessionArgs,
}

/// Lists every tag with its owner and current value.
#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct TagsArgs {
    /// The solution file or folder providing the tag values.
    #[arg(long)]
    pub solution: Option<String>,

    /// Options shared with the other commands.
    #[command(flatten)]
    pub session: SessionArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_args_parse_shared_options() {
        let args =
            RenderArgs::try_parse_from(["MyApp.sln", "--mode", "break", "--json", "--config", "~/x.toml"])
                .unwrap();
        assert_eq!(args.solution, "MyApp.sln");
        assert_eq!(args.session.mode, DebugMode::Break);
        assert_eq!(args.session.config.as_deref(), Some("~/x.toml"));
        assert_eq!(args.session.settle_ms, 5000);
        assert!(args.json);
    }

    #[test]
    fn test_bad_mode_is_rejected() {
        assert!(ExpandArgs::try_parse_from(["$ide-name", "--mode", "paused"]).is_err());
    }
}
