use anyhow::{bail, Result};
use std::path::Path;

use crate::runner::{CommandResult, CommandRunner};

/// Runs one ad-hoc command line in `repo_dir`. Arguments are joined with
/// spaces and handed to the shell as written.
pub fn cmd_exec(runner: &dyn CommandRunner, repo_dir: &Path, cmd: &[String]) -> Result<CommandResult> {
    if cmd.is_empty() {
        bail!("no command specified");
    }
    let command = cmd.join(" ");
    Ok(runner.run(&command, repo_dir)?)
}

pub fn format_exec_human(result: &CommandResult) -> String {
    if result.success() {
        String::new()
    } else {
        format!("\nFailed: `{}` exited with {}", result.command, result.exit_code)
    }
}
