// src/cli/render.rs

//! Terminal and JSON renderings of a [`TitleBarData`]. This is the stand-in for
//! a real window chrome: it only shows what a host would apply.

use crate::models::{Color, InfoBlockData, TitleBarData};
use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};

fn paint(text: &str, foreground: Option<Color>, background: Option<Color>) -> ColoredString {
    // A background without a foreground gets whichever of black/white reads best.
    let foreground = foreground.or_else(|| background.map(Color::contrasting_text));
    let mut painted = ColoredString::from(text);
    if let Some(fg) = foreground {
        painted = painted.truecolor(fg.r, fg.g, fg.b);
    }
    if let Some(bg) = background {
        painted = painted.on_truecolor(bg.r, bg.g, bg.b);
    }
    painted
}

fn render_block(block: &InfoBlockData, use_colors: bool) -> String {
    let chip = format!(" {} ", block.text);
    if use_colors {
        paint(&chip, block.foreground, block.background).to_string()
    } else {
        format!("[{}]", chip.trim())
    }
}

/// One line: the title followed by its info blocks.
pub fn render_line(data: &TitleBarData, use_colors: bool) -> String {
    let title = data.title.as_deref().unwrap_or_default();
    let mut line = if use_colors {
        paint(&format!(" {} ", title), data.foreground, data.background)
            .bold()
            .to_string()
    } else {
        title.to_string()
    };

    for block in data.blocks.iter().flatten() {
        line.push(' ');
        line.push_str(&render_block(block, use_colors));
    }
    line
}

/// Colors and the search box flag, for when the title alone is not enough.
pub fn render_details(data: &TitleBarData) -> Vec<String> {
    let describe = |c: Option<Color>| c.map_or_else(|| "-".dimmed().to_string(), |c| c.to_string());
    let mut lines = vec![
        format!("  {:<12} {}", "foreground".blue(), describe(data.foreground)),
        format!("  {:<12} {}", "background".blue(), describe(data.background)),
    ];
    if let Some(search_box) = data.search_box {
        lines.push(format!("  {:<12} {}", "search-box".blue(), search_box));
    }
    for block in data.blocks.iter().flatten() {
        if let Some(alt) = &block.alt_text {
            lines.push(format!("  {:<12} {} ({})", "block".blue(), block.text, alt.dimmed()));
        }
    }
    lines
}

/// Pretty-printed JSON with the same keys as the rule files.
pub fn render_json(data: &TitleBarData) -> Result<String> {
    serde_json::to_string_pretty(data).context("Failed to serialize the title bar data")
}
