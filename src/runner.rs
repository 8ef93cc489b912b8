use serde::Serialize;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use thiserror::Error;

const RULE: &str = "--------------------------------------------------";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandResult {
    pub command: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("failed to run `{command}` in {cwd}: {source}")]
    Spawn {
        command: String,
        cwd: String,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of one invocation as it appears in reports.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandRecord {
    Exited(CommandResult),
    SpawnFailed { command: String, error: String },
}

impl CommandRecord {
    pub fn from_outcome(command: &str, outcome: &Result<CommandResult, RunError>) -> Self {
        match outcome {
            Ok(result) => CommandRecord::Exited(result.clone()),
            Err(e) => CommandRecord::SpawnFailed {
                command: command.to_string(),
                error: e.to_string(),
            },
        }
    }

    pub fn command(&self) -> &str {
        match self {
            CommandRecord::Exited(result) => &result.command,
            CommandRecord::SpawnFailed { command, .. } => command,
        }
    }

    pub fn succeeded(&self) -> bool {
        matches!(self, CommandRecord::Exited(r) if r.success())
    }
}

/// Where progress lines go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Stdout,
    Stderr,
    Quiet,
}

impl Progress {
    pub fn line(&self, text: &str) {
        match self {
            Progress::Stdout => println!("{}", text),
            Progress::Stderr => eprintln!("{}", text),
            Progress::Quiet => {}
        }
    }
}

/// Runs shell command strings. The sequence only talks to this trait so tests
/// can substitute a recording double for the real shell.
pub trait CommandRunner {
    /// Run `command` with `cwd` as its working directory and wait for it to exit.
    /// A non-zero exit is `Ok`; `Err` means the process never started.
    fn run(&self, command: &str, cwd: &Path) -> Result<CommandResult, RunError>;

    /// Print a section heading ahead of a group of commands.
    fn announce(&self, _heading: &str) {}

    /// Print a free-form progress note.
    fn note(&self, _text: &str) {}
}

#[derive(Debug, Clone)]
pub struct ShellRunner {
    shell: String,
    shell_flag: String,
    progress: Progress,
}

impl ShellRunner {
    pub fn new(progress: Progress) -> Self {
        let (shell, flag) = default_shell();
        Self {
            shell: shell.to_string(),
            shell_flag: flag.to_string(),
            progress,
        }
    }

    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, command: &str, cwd: &Path) -> Result<CommandResult, RunError> {
        self.progress.line(&format!(">>> {}", command));
        tracing::debug!(command, cwd = %cwd.display(), shell = %self.shell, "spawning");

        let output = Command::new(&self.shell)
            .arg(&self.shell_flag)
            .arg(command)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output();

        let output = match output {
            Ok(output) => output,
            Err(source) => {
                let err = RunError::Spawn {
                    command: command.to_string(),
                    cwd: cwd.display().to_string(),
                    source,
                };
                tracing::warn!(error = %err, "command could not be started");
                self.progress.line(&format!("FAILED to start: {}", err));
                self.progress.line(RULE);
                return Err(err);
            }
        };

        let result = CommandResult {
            command: command.to_string(),
            exit_code: exit_code(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(command, exit_code = result.exit_code, "finished");

        if !result.stdout.is_empty() {
            self.progress.line(result.stdout.trim_end());
        }
        if !result.stderr.is_empty() {
            self.progress
                .line(&format!("stderr: {}", result.stderr.trim_end()));
        }
        let verdict = if result.success() { "ok" } else { "failed" };
        self.progress
            .line(&format!("exit code: {} ({})", result.exit_code, verdict));
        self.progress.line(RULE);

        Ok(result)
    }

    fn announce(&self, heading: &str) {
        self.progress.line(&format!("\n=== {} ===", heading));
    }

    fn note(&self, text: &str) {
        self.progress.line(text);
    }
}

#[cfg(unix)]
fn default_shell() -> (&'static str, &'static str) {
    ("sh", "-c")
}

#[cfg(windows)]
fn default_shell() -> (&'static str, &'static str) {
    ("cmd", "/C")
}

/// Numeric exit status. Signal deaths map to `128 + signal` like a POSIX shell.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::testutil::TestEnv;

    fn runner() -> ShellRunner {
        ShellRunner::new(Progress::Quiet)
    }

    #[test]
    fn captures_stdout_and_zero_exit() {
        let tmp = tempfile::tempdir().unwrap();
        let result = runner().run("echo hello", tmp.path()).unwrap();
        assert_eq!(result.command, "echo hello");
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout, "hello\n");
        assert!(result.stderr.is_empty());
        assert!(result.success());
    }

    #[test]
    fn non_zero_exit_is_a_result_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = runner().run("echo oops >&2; exit 3", tmp.path()).unwrap();
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stderr, "oops\n");
        assert!(!result.success());
    }

    #[test]
    fn missing_executable_reports_shell_exit_code() {
        let tmp = tempfile::tempdir().unwrap();
        let result = runner()
            .run("definitely-not-a-real-binary-xyz", tmp.path())
            .unwrap();
        assert_eq!(result.exit_code, 127);
    }

    #[test]
    fn signal_death_maps_to_128_plus_signal() {
        let tmp = tempfile::tempdir().unwrap();
        let result = runner().run("kill -9 $$", tmp.path()).unwrap();
        assert_eq!(result.exit_code, 128 + 9);
    }

    #[test]
    fn runs_in_given_directory() {
        let env = TestEnv::new();
        let repo = env.create_repo("cwd-check");
        let result = runner().run("pwd", &repo).unwrap();
        let reported = std::path::PathBuf::from(result.stdout.trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            repo.canonicalize().unwrap()
        );
    }

    #[test]
    fn unavailable_shell_is_a_spawn_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = runner()
            .with_shell("/nonexistent/shell")
            .run("echo hi", tmp.path())
            .unwrap_err();
        let RunError::Spawn { command, .. } = &err;
        assert_eq!(command, "echo hi");
        assert!(err.to_string().contains("failed to run"));
    }

    #[test]
    fn missing_working_directory_is_a_spawn_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = runner().run("true", &tmp.path().join("gone"));
        assert!(result.is_err());
    }

    #[test]
    fn record_from_outcome() {
        let ok: Result<CommandResult, RunError> = Ok(CommandResult {
            command: "true".to_string(),
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        });
        let record = CommandRecord::from_outcome("true", &ok);
        assert!(record.succeeded());
        assert_eq!(record.command(), "true");

        let err: Result<CommandResult, RunError> = Err(RunError::Spawn {
            command: "x".to_string(),
            cwd: "/tmp".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no shell"),
        });
        let record = CommandRecord::from_outcome("x", &err);
        assert!(!record.succeeded());
        assert!(matches!(record, CommandRecord::SpawnFailed { .. }));
    }
}
