// src/constants.rs

use std::time::Duration;

/// The name of the rule file, both in the user config dir and next to a solution.
pub const CONFIG_FILENAME: &str = "shellbent.toml";

/// The name of the directory (inside the system config dir) holding the user rule file.
pub const CONFIG_DIR_NAME: &str = "shellbent";

/// Environment variable that overrides the user rule file location.
pub const CONFIG_ENV_VAR: &str = "SHELLBENT_CONFIG";

/// The IDE name reported by the `ide-name` tag unless the host overrides it.
pub const DEFAULT_IDE_NAME: &str = "Microsoft Visual Studio";

/// Caption used when no configured rule sets one.
pub const DEFAULT_CAPTION: &str = "?solution{$solution-name - }$ide-name?ide-mode{ $}";

/// Upper bound for any external VCS invocation.
pub const PROCESS_TIMEOUT: Duration = Duration::from_secs(5);

/// Interval of the remote-tracking poll for repositories that are bound.
pub const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Quiet period used to coalesce bursts of file-system events.
pub const WATCH_DEBOUNCE: Duration = Duration::from_millis(250);

/// Attempts and delay used when a rule file is locked mid-write.
pub const CONFIG_READ_ATTEMPTS: u32 = 3;
/// See [`CONFIG_READ_ATTEMPTS`].
pub const CONFIG_READ_RETRY_DELAY: Duration = Duration::from_millis(100);
