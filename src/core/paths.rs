// src/core/paths.rs

use crate::constants::{CONFIG_DIR_NAME, CONFIG_ENV_VAR, CONFIG_FILENAME};
use crate::models::Solution;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while locating rule files.
#[derive(Error, Debug)]
pub enum PathError {
    /// The platform has no config directory.
    #[error("Could not find system config directory.")]
    ConfigDirNotFound,
    /// `~` or a variable in the path could not be expanded.
    #[error("Could not expand path '{path}': {message}")]
    Expansion {
        /// The path as given.
        path: String,
        /// Why expansion failed.
        message: String,
    },
}

/// Expands `~` and environment variables in a user-supplied path.
pub fn expand_path(raw: &str) -> Result<PathBuf, PathError> {
    shellexpand::full(raw)
        .map(|expanded| PathBuf::from(expanded.as_ref()))
        .map_err(|e| PathError::Expansion {
            path: raw.to_string(),
            message: e.to_string(),
        })
}

/// Returns the user rule file.
///
/// Precedence: the explicit override (`--config`), then `$SHELLBENT_CONFIG`,
/// then `<config_dir>/shellbent/shellbent.toml`. The file need not exist.
pub fn user_config_path(explicit: Option<&str>) -> Result<PathBuf, PathError> {
    if let Some(raw) = explicit {
        return expand_path(raw);
    }
    if let Ok(raw) = env::var(CONFIG_ENV_VAR) {
        if !raw.trim().is_empty() {
            return expand_path(raw.trim());
        }
    }
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILENAME))
        .ok_or(PathError::ConfigDirNotFound)
}

/// Returns the rule file belonging to a solution: `shellbent.toml` in its directory.
pub fn solution_config_path(solution: &Solution) -> PathBuf {
    solution.directory.join(CONFIG_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_explicit_path_wins_and_expands_home() {
        let home = dirs::home_dir().unwrap();
        let path = user_config_path(Some("~/rules/shellbent.toml")).unwrap();
        assert_eq!(path, home.join("rules").join("shellbent.toml"));
    }

    #[test]
    fn test_expansion_error_is_reported() {
        let result = expand_path("$SHELLBENT_SURELY_UNDEFINED_VARIABLE/x.toml");
        assert!(matches!(result, Err(PathError::Expansion { .. })));
    }

    #[test]
    fn test_solution_config_path() {
        let solution = Solution {
            path: Path::new("/work/app/App.sln").to_path_buf(),
            directory: Path::new("/work/app").to_path_buf(),
            name: "App".to_string(),
        };
        assert_eq!(
            solution_config_path(&solution),
            Path::new("/work/app").join(CONFIG_FILENAME)
        );
    }
}
