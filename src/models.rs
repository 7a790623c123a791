// src/models.rs

use crate::core::{color, predicates::Predicate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// --- IDE / SOLUTION CONTEXT ---

/// The debugger state of the hosting IDE.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DebugMode {
    /// Not debugging.
    #[default]
    Design,
    /// A debuggee is running.
    Run,
    /// Stopped at a breakpoint.
    Break,
}

impl FromStr for DebugMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "design" => Ok(Self::Design),
            "run" | "running" => Ok(Self::Run),
            "break" | "debug" | "debugging" => Ok(Self::Break),
            other => Err(format!(
                "Unknown debug mode '{}'. Expected one of: design, run, break.",
                other
            )),
        }
    }
}

/// An open solution. Either a solution file or a plain folder opened as one.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Solution {
    /// The solution file, or the folder itself when a folder was opened.
    pub path: PathBuf,
    /// The directory containing the solution.
    pub directory: PathBuf,
    /// The solution's base name (file stem or folder name).
    pub name: String,
}

impl Solution {
    /// Builds the solution descriptor for a file or folder path.
    /// Returns `None` for paths with no usable name (e.g. a filesystem root).
    pub fn from_path(path: &Path) -> Option<Self> {
        let path = dunce::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let (directory, name) = if path.is_dir() {
            let name = path.file_name()?.to_string_lossy().into_owned();
            (path.clone(), name)
        } else {
            let name = path.file_stem()?.to_string_lossy().into_owned();
            (path.parent()?.to_path_buf(), name)
        };

        if name.is_empty() {
            return None;
        }

        Some(Self {
            path,
            directory,
            name,
        })
    }
}

// --- COLORS ---

/// An RGBA color as written in rule files (`#rrggbb`, `#rrggbbaa`, `#rgb` or a name).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red.
    pub r: u8,
    /// Green.
    pub g: u8,
    /// Blue.
    pub b: u8,
    /// Alpha. 255 is opaque.
    pub a: u8,
}

impl Color {
    /// Opaque black.
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgb(255, 255, 255);

    /// An opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Black or white, whichever reads better on top of this color.
    pub fn contrasting_text(self) -> Self {
        let luminance =
            0.299 * f32::from(self.r) + 0.587 * f32::from(self.g) + 0.114 * f32::from(self.b);
        if luminance > 128.0 {
            Self::BLACK
        } else {
            Self::WHITE
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.r, self.g, self.b, self.a
        )
    }
}

impl TryFrom<String> for Color {
    type Error = color::ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        color::parse_color(&value)
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_string()
    }
}

// --- `shellbent.toml` MODELS (What is read from a rule file) ---

/// Predicates as written by the user: one `;`-separated string or a list.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum RawPredicates {
    /// `"git; git-branch =~ main"`
    Joined(String),
    /// `["git", "git-branch =~ main"]`
    List(Vec<String>),
}

/// The parsed predicate list of a rule or block. All must hold for it to apply.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(try_from = "RawPredicates")]
pub struct Predicates(pub Vec<Predicate>);

impl TryFrom<RawPredicates> for Predicates {
    type Error = crate::core::predicates::PredicateError;

    fn try_from(raw: RawPredicates) -> Result<Self, Self::Error> {
        let parts: Vec<String> = match raw {
            RawPredicates::Joined(s) => s.split(';').map(str::to_string).collect(),
            RawPredicates::List(v) => v,
        };

        parts
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::parse)
            .collect::<Result<Vec<_>, _>>()
            .map(Predicates)
    }
}

impl Predicates {
    /// The predicates in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Predicate> {
        self.0.iter()
    }
}

/// An info block ("chip") appended to the title bar.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct BlockSetting {
    /// The block is shown only when all of these hold.
    #[serde(default)]
    pub predicates: Predicates,
    /// Template for the block text. Blocks that expand to "" are dropped.
    pub text: Option<String>,
    /// Template for the tooltip.
    pub alt_text: Option<String>,
    /// Text color of the block.
    pub foreground: Option<Color>,
    /// Fill color of the block.
    pub background: Option<Color>,
}

/// One predicate-gated rule of a rule file.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct TitleBarSetting {
    /// When empty, the rule applies unconditionally.
    #[serde(default)]
    pub predicates: Predicates,
    /// Template for the window caption.
    pub title_bar_caption: Option<String>,
    /// Text color of the caption.
    pub title_bar_foreground: Option<Color>,
    /// Fill color of the title bar.
    pub title_bar_background: Option<Color>,
    /// Passed through to the renderer untouched.
    pub search_box: Option<bool>,
    /// Info blocks, in display order. The whole list is taken from one rule.
    pub blocks: Option<Vec<BlockSetting>>,
}

/// Represents the deserialized structure of a `shellbent.toml` file.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct SettingsDocument {
    /// Rules in file order. Earlier rules win.
    #[serde(default)]
    pub rules: Vec<TitleBarSetting>,
}

// --- AGGREGATED OUTPUT (handed to the renderer) ---

/// One expanded info block.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct InfoBlockData {
    /// Never empty.
    pub text: String,
    /// `None` when the tooltip template was absent or expanded to "".
    pub alt_text: Option<String>,
    /// Text color. The renderer picks one when `None`.
    pub foreground: Option<Color>,
    /// Fill color.
    pub background: Option<Color>,
}

/// The computed title bar. Every field is independently "locked in" by the
/// highest-precedence matching rule that sets it.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct TitleBarData {
    /// The expanded caption.
    pub title: Option<String>,
    /// Caption text color.
    pub foreground: Option<Color>,
    /// Title bar fill color.
    pub background: Option<Color>,
    /// Whether the host should show its search box.
    pub search_box: Option<bool>,
    /// Expanded info blocks, or `None` when no matching rule declares any.
    pub blocks: Option<Vec<InfoBlockData>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_settings_document_parses_joined_and_listed_predicates() {
        let toml_str = r##"
            [[rules]]
            predicates = "git; git-branch =~ feature/*"
            title-bar-caption = "$solution-name ($git-branch)"
            title-bar-background = "#224488"

            [[rules]]
            predicates = ["svn"]
            search-box = true

            [[rules.blocks]]
            text = "$svn-url"
            alt-text = "working copy"
            foreground = "white"
        "##;

        let doc: SettingsDocument = toml::from_str(toml_str).unwrap();
        assert_eq!(doc.rules.len(), 2);

        let first = &doc.rules[0];
        assert_eq!(first.predicates.0.len(), 2);
        assert_eq!(first.predicates.0[1].tag, "git-branch");
        assert_eq!(first.predicates.0[1].pattern(), "feature/*");
        assert_eq!(first.title_bar_background, Some(Color::rgb(0x22, 0x44, 0x88)));

        let second = &doc.rules[1];
        assert_eq!(second.search_box, Some(true));
        let blocks = second.blocks.as_ref().unwrap();
        assert_eq!(blocks[0].alt_text.as_deref(), Some("working copy"));
        assert_eq!(blocks[0].foreground, Some(Color::WHITE));
    }

    #[test]
    fn test_settings_document_rejects_unknown_field() {
        let toml_str = r#"
            [[rules]]
            title-bar-captoin = "typo"
        "#;
        let result: Result<SettingsDocument, _> = toml::from_str(toml_str);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("unknown field"));
    }

    #[test]
    fn test_settings_document_rejects_bad_predicate() {
        let toml_str = r#"
            [[rules]]
            predicates = ["Not A Tag"]
        "#;
        let result: Result<SettingsDocument, _> = toml::from_str(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn test_solution_from_file_and_folder() {
        let dir = tempdir().unwrap();
        let sln = dir.path().join("MyApp.sln");
        std::fs::write(&sln, "").unwrap();

        let from_file = Solution::from_path(&sln).unwrap();
        assert_eq!(from_file.name, "MyApp");
        assert_eq!(
            from_file.directory,
            dunce::canonicalize(dir.path()).unwrap()
        );

        let folder = dir.path().join("workspace");
        std::fs::create_dir(&folder).unwrap();
        let from_folder = Solution::from_path(&folder).unwrap();
        assert_eq!(from_folder.name, "workspace");
        assert_eq!(from_folder.directory, from_folder.path);
    }

    #[test]
    fn test_contrasting_text_color() {
        assert_eq!(Color::rgb(250, 250, 210).contrasting_text(), Color::BLACK);
        assert_eq!(Color::rgb(20, 30, 90).contrasting_text(), Color::WHITE);
    }

    #[test]
    fn test_debug_mode_from_str() {
        assert_eq!("Run".parse::<DebugMode>(), Ok(DebugMode::Run));
        assert_eq!("debugging".parse::<DebugMode>(), Ok(DebugMode::Break));
        assert!("paused".parse::<DebugMode>().is_err());
    }
}
