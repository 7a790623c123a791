// src/system/executor.rs

//! Runs source-control tools and captures their output.

use async_trait::async_trait;
use std::env;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command as StdCommand, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command as TokioCommand;

use crate::constants::PROCESS_TIMEOUT;

/// Errors raised while running an external tool.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The process could not be spawned or waited on.
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    /// The process exited with a failure status.
    #[error("Command '{0}' exited with a non-zero error code.")]
    NonZeroExitStatus(String),
    /// The process outlived its timeout.
    #[error("Command '{0}' did not finish within {1:?} and was killed.")]
    TimedOut(String, Duration),
    /// Stdout was not UTF-8.
    #[error("Command '{command}' produced output that was not valid UTF-8")]
    InvalidUtf8Output {
        /// The command line.
        command: String,
        /// The decoding error.
        #[source]
        source: std::string::FromUtf8Error,
    },
}

fn describe(program: &Path, args: &[&str]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Runs a program and returns its standard output once it exits.
/// Stderr is discarded. The child is killed if it outlives `timeout`.
/// NOTE: This operation is blocking. Resolvers use [`capture_output_lines`].
pub fn execute_and_capture_output(
    cwd: &Path,
    program: &Path,
    args: &[&str],
    timeout: Duration,
) -> Result<String, ExecutionError> {
    let command_line = describe(program, args);

    let mut child = StdCommand::new(program)
        .args(args)
        .current_dir(dunce::simplified(cwd))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ExecutionError::CommandFailed(command_line.clone(), e))?;

    // Drain stdout on a helper thread so a chatty child never blocks on a full pipe.
    let mut stdout = child.stdout.take();
    let reader = std::thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(out) = stdout.as_mut() {
            let _ = out.read_to_end(&mut buffer);
        }
        buffer
    });

    let deadline = Instant::now() + timeout;
    // Non-blocking wait loop to enforce the timeout.
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                log::debug!("'{}' timed out, killing PID {}.", command_line, child.id());
                if let Err(e) = child.kill() {
                    log::warn!("Failed to kill child process {}: {}", child.id(), e);
                }
                child.wait().ok();
                return Err(ExecutionError::TimedOut(command_line, timeout));
            }
            Ok(None) => std::thread::sleep(Duration::from_millis(10)),
            Err(e) => return Err(ExecutionError::CommandFailed(command_line, e)),
        }
    };

    let buffer = reader.join().unwrap_or_default();
    if !status.success() {
        return Err(ExecutionError::NonZeroExitStatus(command_line));
    }

    String::from_utf8(buffer).map_err(|source| ExecutionError::InvalidUtf8Output {
        command: command_line,
        source,
    })
}

/// Runs a program asynchronously and collects its standard output line by line.
/// The child is killed when the timeout elapses or the future is dropped.
pub async fn capture_output_lines(
    cwd: &Path,
    program: &Path,
    args: &[&str],
    timeout: Duration,
) -> Result<Vec<String>, ExecutionError> {
    let command_line = describe(program, args);

    let mut child = TokioCommand::new(program)
        .args(args)
        .current_dir(dunce::simplified(cwd))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ExecutionError::CommandFailed(command_line.clone(), e))?;

    let stdout = child.stdout.take();
    let collect = async {
        let mut lines = Vec::new();
        if let Some(stdout) = stdout {
            let mut reader = BufReader::new(stdout).lines();
            while let Some(line) = reader.next_line().await? {
                lines.push(line);
            }
        }
        let status = child.wait().await?;
        Ok::<_, std::io::Error>((lines, status))
    };

    match tokio::time::timeout(timeout, collect).await {
        Err(_) => Err(ExecutionError::TimedOut(command_line, timeout)),
        Ok(Err(e)) => Err(ExecutionError::CommandFailed(command_line, e)),
        Ok(Ok((_, status))) if !status.success() => {
            Err(ExecutionError::NonZeroExitStatus(command_line))
        }
        Ok(Ok((lines, _))) => Ok(lines),
    }
}

/// Searches `PATH` for an executable, adding `.exe` on Windows.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    let file_name = if cfg!(target_os = "windows") && Path::new(name).extension().is_none() {
        format!("{}.exe", name)
    } else {
        name.to_string()
    };

    let path_var = env::var_os("PATH")?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
}

/// The seam between resolvers and process execution.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Full path of `program`, or `None` when it is not installed.
    fn locate(&self, program: &str) -> Option<PathBuf>;

    /// Runs `program args` in `cwd` and returns its stdout lines. A non-zero
    /// exit status is an error.
    async fn capture(
        &self,
        cwd: &Path,
        program: &Path,
        args: &[&str],
    ) -> Result<Vec<String>, ExecutionError>;
}

/// Runs real processes with a fixed timeout.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    /// Kills processes that run longer than `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(PROCESS_TIMEOUT)
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        find_executable(program)
    }

    async fn capture(
        &self,
        cwd: &Path,
        program: &Path,
        args: &[&str],
    ) -> Result<Vec<String>, ExecutionError> {
        capture_output_lines(cwd, program, args, self.timeout).await
    }
}

/// A [`CommandRunner`] answering from a script instead of spawning processes.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub(crate) struct ScriptedRunner {
        installed: Vec<String>,
        responses: Mutex<HashMap<String, Vec<String>>>,
        calls: Mutex<Vec<String>>,
        pub(crate) delay: Option<Duration>,
    }

    impl ScriptedRunner {
        pub(crate) fn new(installed: &[&str]) -> Self {
            Self {
                installed: installed.iter().map(|s| s.to_string()).collect(),
                ..Self::default()
            }
        }

        /// Scripts the output of `command_line` (program name plus args).
        pub(crate) fn respond(&self, command_line: &str, output: &str) {
            self.responses.lock().unwrap().insert(
                command_line.to_string(),
                output.lines().map(str::to_string).collect(),
            );
        }

        /// Makes `command_line` fail from now on.
        pub(crate) fn fail(&self, command_line: &str) {
            self.responses.lock().unwrap().remove(command_line);
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for ScriptedRunner {
        fn locate(&self, program: &str) -> Option<PathBuf> {
            self.installed
                .iter()
                .any(|p| p == program)
                .then(|| PathBuf::from(program))
        }

        async fn capture(
            &self,
            _cwd: &Path,
            program: &Path,
            args: &[&str],
        ) -> Result<Vec<String>, ExecutionError> {
            let command_line = describe(program, args);
            self.calls.lock().unwrap().push(command_line.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            let response = self.responses.lock().unwrap().get(&command_line).cloned();
            response.ok_or(ExecutionError::NonZeroExitStatus(command_line))
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_execute_and_capture_output_success() {
        let dir = tempdir().unwrap();
        let sh = find_executable("sh").unwrap();

        let output =
            execute_and_capture_output(dir.path(), &sh, &["-c", "echo hello"], PROCESS_TIMEOUT)
                .unwrap();

        assert_eq!(output.trim(), "hello");
    }

    #[test]
    fn test_execute_and_capture_output_non_zero_exit() {
        let dir = tempdir().unwrap();
        let sh = find_executable("sh").unwrap();

        let result = execute_and_capture_output(dir.path(), &sh, &["-c", "exit 3"], PROCESS_TIMEOUT);

        assert!(matches!(result, Err(ExecutionError::NonZeroExitStatus(_))));
    }

    #[test]
    fn test_execute_and_capture_output_times_out() {
        let dir = tempdir().unwrap();
        let sh = find_executable("sh").unwrap();
        let started = Instant::now();

        let result = execute_and_capture_output(
            dir.path(),
            &sh,
            &["-c", "sleep 10"],
            Duration::from_millis(200),
        );

        assert!(matches!(result, Err(ExecutionError::TimedOut(_, _))));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_missing_program_is_an_error() {
        let dir = tempdir().unwrap();
        let result = execute_and_capture_output(
            dir.path(),
            Path::new("definitely-not-a-real-program-xyz"),
            &[],
            PROCESS_TIMEOUT,
        );
        assert!(matches!(result, Err(ExecutionError::CommandFailed(_, _))));
        assert!(find_executable("definitely-not-a-real-program-xyz").is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_capture_output_lines() {
        let dir = tempdir().unwrap();
        let sh = find_executable("sh").unwrap();

        let lines = capture_output_lines(
            dir.path(),
            &sh,
            &["-c", "printf 'one\\ntwo\\n'"],
            PROCESS_TIMEOUT,
        )
        .await
        .unwrap();

        assert_eq!(lines, vec!["one".to_string(), "two".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_capture_output_lines_times_out() {
        let dir = tempdir().unwrap();
        let sh = find_executable("sh").unwrap();

        let result =
            capture_output_lines(dir.path(), &sh, &["-c", "sleep 10"], Duration::from_millis(200))
                .await;

        assert!(matches!(result, Err(ExecutionError::TimedOut(_, _))));
    }
}
