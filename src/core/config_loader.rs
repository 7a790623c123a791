// src/core/config_loader.rs

//! # Config Loader
//!
//! Rule files are plain TOML documents (`[[rules]]` tables). Each source is held by a
//! [`SettingsFile`] which keeps the last successfully parsed rules together with a
//! content hash, and can watch its file so edits are picked up while running.
//!
//! Loading never fails outwards: a missing file is an empty rule set, and so is a
//! file that cannot be read after a few retries or does not parse. Files locked
//! mid-write by an editor are the reason for the retries.

use crate::constants::{CONFIG_READ_ATTEMPTS, CONFIG_READ_RETRY_DELAY, DEFAULT_CAPTION, WATCH_DEBOUNCE};
use crate::models::{SettingsDocument, TitleBarSetting};
use crate::system::watcher::{DirectoryWatcher, PathFilter};
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use thiserror::Error;

const HASH_TRUNCATE_LENGTH: usize = 16;

/// Errors raised while loading a rule file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("Failed to read '{path}': {source}")]
    Read {
        /// The file.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a valid rule document.
    #[error("Failed to parse '{path}': {source}")]
    Parse {
        /// The file.
        path: String,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },
}

/// Where a rule set came from. Later variants take precedence.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RuleOrigin {
    /// Built into the binary.
    Defaults,
    /// The user rule file.
    User,
    /// The rule file next to the open solution.
    Solution,
}

/// The rules of one source, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    /// Where the rules were read from.
    pub origin: RuleOrigin,
    /// Rules in file order.
    pub rules: Vec<TitleBarSetting>,
}

impl RuleSet {
    /// A set without rules, used when a file is missing or invalid.
    pub fn empty(origin: RuleOrigin) -> Self {
        Self {
            origin,
            rules: Vec::new(),
        }
    }

    /// The built-in rule: a caption of `<solution> - <ide> <mode>`.
    pub fn defaults() -> Self {
        Self {
            origin: RuleOrigin::Defaults,
            rules: vec![TitleBarSetting {
                title_bar_caption: Some(DEFAULT_CAPTION.to_string()),
                ..TitleBarSetting::default()
            }],
        }
    }
}

/// Hashes file content with blake3, truncated and hex-encoded.
pub fn content_hash(content: &[u8]) -> String {
    let hash = blake3::hash(content);
    hex::encode(hash.as_bytes().get(..HASH_TRUNCATE_LENGTH).unwrap_or_default())
}

/// Parses a rule document. `path` is only used in the error.
pub fn parse_rules(path: &Path, content: &str) -> Result<Vec<TitleBarSetting>, ConfigError> {
    toml::from_str::<SettingsDocument>(content)
        .map(|doc| doc.rules)
        .map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
}

/// Reads a file, retrying I/O failures other than "not found".
/// Returns `Ok(None)` when the file does not exist.
fn read_with_retry(path: &Path) -> Result<Option<String>, ConfigError> {
    let mut attempt = 1;
    loop {
        match fs::read_to_string(path) {
            Ok(content) => return Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) if attempt < CONFIG_READ_ATTEMPTS => {
                log::debug!(
                    "Read of '{}' failed (attempt {}): {}. Retrying.",
                    path.display(),
                    attempt,
                    e
                );
                attempt += 1;
                std::thread::sleep(CONFIG_READ_RETRY_DELAY);
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                });
            }
        }
    }
}

#[derive(Debug)]
struct Loaded {
    hash: Option<String>,
    rules: Arc<RuleSet>,
}

/// One rule file on disk, cached and optionally watched.
#[derive(Debug)]
pub struct SettingsFile {
    origin: RuleOrigin,
    path: PathBuf,
    loaded: Mutex<Loaded>,
    watcher: Mutex<Option<DirectoryWatcher>>,
}

impl SettingsFile {
    /// Creates the source and performs the initial load.
    pub fn open(origin: RuleOrigin, path: PathBuf) -> Arc<Self> {
        let file = Arc::new(Self {
            origin,
            path,
            loaded: Mutex::new(Loaded {
                hash: None,
                rules: Arc::new(RuleSet::empty(origin)),
            }),
            watcher: Mutex::new(None),
        });
        file.reload();
        file
    }

    /// The watched file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Which precedence level this file feeds.
    pub fn origin(&self) -> RuleOrigin {
        self.origin
    }

    /// The rules of the last successful reload, or an empty set.
    pub fn rules(&self) -> Arc<RuleSet> {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rules
            .clone()
    }

    /// Re-reads the file. Returns true when its content, and thus its rules, changed.
    pub fn reload(&self) -> bool {
        let (hash, rules) = match read_with_retry(&self.path) {
            Ok(None) => (None, RuleSet::empty(self.origin)),
            Ok(Some(content)) => {
                let hash = content_hash(content.as_bytes());
                let rules = match parse_rules(&self.path, &content) {
                    Ok(rules) => RuleSet {
                        origin: self.origin,
                        rules,
                    },
                    Err(e) => {
                        log::warn!("{}. Using no rules from this file.", e);
                        RuleSet::empty(self.origin)
                    }
                };
                (Some(hash), rules)
            }
            Err(e) => {
                log::warn!("{}. Using no rules from this file.", e);
                (None, RuleSet::empty(self.origin))
            }
        };

        let mut loaded = self.loaded.lock().unwrap_or_else(PoisonError::into_inner);
        if loaded.hash == hash && *loaded.rules == rules {
            return false;
        }
        log::debug!(
            "Loaded {} rule(s) from '{}' (hash: {}).",
            rules.rules.len(),
            self.path.display(),
            hash.as_deref().unwrap_or("none")
        );
        loaded.hash = hash;
        loaded.rules = Arc::new(rules);
        true
    }

    /// Watches the file's directory and calls `on_change` after each effective edit.
    /// A missing directory is not watched.
    pub fn watch<F>(self: &Arc<Self>, on_change: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let Some(dir) = self.path.parent().filter(|d| d.is_dir()) else {
            log::debug!("Not watching '{}': no such directory.", self.path.display());
            return;
        };

        let file_name = self.path.file_name().map(|n| n.to_os_string());
        let filter: PathFilter = Arc::new(move |p: &Path| p.file_name() == file_name.as_deref());
        let weak: Weak<Self> = Arc::downgrade(self);

        match DirectoryWatcher::watch(dir, false, WATCH_DEBOUNCE, filter, move || {
            if let Some(file) = weak.upgrade() {
                if file.reload() {
                    on_change();
                }
            }
        }) {
            Ok(watcher) => {
                *self.watcher.lock().unwrap_or_else(PoisonError::into_inner) = Some(watcher);
            }
            Err(e) => log::warn!("{}", e),
        }
    }

    /// True once [`SettingsFile::watch`] has attached a watcher.
    pub fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}
