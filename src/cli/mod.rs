// src/cli/mod.rs

use clap::Parser;

/// Per-command argument parsers.
pub mod args;
/// Command implementations.
pub mod handlers;
/// Terminal and JSON output.
pub mod render;

const HELP_TEMPLATE: &str = "\
<title>shellbent</title> {version}
Title bar captions, colors and info blocks computed from solution and source-control state.

<title>USAGE:</title>
    shellbent <cmd><command></cmd> [args...]

<title>COMMANDS:</title>
    <cmd>render</cmd> <hl><solution></hl>     Print the title bar computed for a solution.
    <cmd>watch</cmd> <hl><solution></hl>      Re-print the title bar whenever something changes.
    <cmd>expand</cmd> <hl><template></hl>     Expand one template, e.g. <dim>'$solution-name ($git-branch)'</dim>.
    <cmd>tags</cmd>                  List every tag with its owner and current value.
    <cmd>doctor</cmd>                Check which source-control tools are installed.

<title>COMMON OPTIONS:</title>
    <hl>--config</hl> <dim><path></dim>       User rule file (default: <dim>$SHELLBENT_CONFIG</dim> or the config dir).
    <hl>--mode</hl> <dim><mode></dim>         Debugger state: design, run or break.
    <hl>--solution</hl> <dim><path></dim>     Solution file or folder (expand, tags).

Set <hl>RUST_LOG=debug</hl> to see what the resolvers are doing.
";

/// Builds the color-aware help string at runtime.
fn build_help_string() -> &'static str {
    let use_colors = colored::control::SHOULD_COLORIZE.should_colorize();

    let title = if use_colors { "\x1b[1;33m" } else { "" }; // Bold Yellow
    let hl = if use_colors { "\x1b[1;36m" } else { "" }; // Bold Cyan
    let cmd = if use_colors { "\x1b[36m" } else { "" }; // Cyan
    let dim = if use_colors { "\x1b[2m" } else { "" };
    let reset = if use_colors { "\x1b[0m" } else { "" };

    let formatted = HELP_TEMPLATE
        .replace("<title>", title)
        .replace("</title>", reset)
        .replace("<hl>", hl)
        .replace("</hl>", reset)
        .replace("<cmd>", cmd)
        .replace("</cmd>", reset)
        .replace("<dim>", dim)
        .replace("</dim>", reset);

    Box::leak(formatted.into_boxed_str())
}

/// shellbent: title bar rules for your solutions.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about,
    help_template = { build_help_string() },
    styles = clap::builder::Styles::styled()
        .header(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .usage(clap::builder::styling::AnsiColor::Yellow.on_default().bold())
        .literal(clap::builder::styling::AnsiColor::Cyan.on_default().bold())
        .placeholder(clap::builder::styling::AnsiColor::Green.on_default()),
)]
#[command(disable_help_subcommand = true)]
#[command(trailing_var_arg = true)]
pub struct Cli {
    /// The command to run.
    pub command: Option<String>,

    /// Everything after the command, handed to its own parser.
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}
