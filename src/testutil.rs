#![cfg(test)]

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use crate::config::{Condition, ResolvedPlan, ResolvedStep};
use crate::runner::{CommandResult, CommandRunner, RunError};

pub struct TestEnv {
    dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// A repository with identity configured locally and one empty commit.
    pub fn create_repo(&self, name: &str) -> PathBuf {
        let repo_path = self.dir.path().join(name);
        std::fs::create_dir_all(&repo_path).unwrap();

        run_git(&repo_path, &["init", "-q"]);
        run_git(&repo_path, &["config", "user.name", "Test"]);
        run_git(&repo_path, &["config", "user.email", "test@test.com"]);
        run_git(&repo_path, &["config", "commit.gpgsign", "false"]);
        run_git(&repo_path, &["commit", "-q", "--allow-empty", "-m", "initial"]);

        repo_path
    }
}

pub fn run_git(repo: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(repo)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim_end().to_string()
}

pub fn commit_count(repo: &Path) -> usize {
    run_git(repo, &["rev-list", "--count", "HEAD"])
        .parse()
        .expect("rev-list count")
}

pub fn current_branch(repo: &Path) -> String {
    run_git(repo, &["rev-parse", "--abbrev-ref", "HEAD"])
}

pub fn make_step(title: &str, paths: &[&str], when: Condition) -> ResolvedStep {
    ResolvedStep {
        title: title.to_string(),
        paths: paths.iter().map(|p| p.to_string()).collect(),
        when,
        only_if_staged: false,
        message: format!("chore: {}", title),
    }
}

pub fn make_plan(branch: &str, steps: Vec<ResolvedStep>) -> ResolvedPlan {
    ResolvedPlan {
        branch: branch.to_string(),
        remote: "origin".to_string(),
        log_count: 10,
        shell: None,
        steps,
    }
}

/// Records every command and answers from a script instead of a shell.
#[derive(Default)]
pub struct RecordingRunner {
    pub commands: RefCell<Vec<String>>,
    /// Commands starting with one of these exit with status 1.
    pub fail_prefixes: Vec<String>,
    /// Commands starting with one of these fail to spawn.
    pub spawn_fail_prefixes: Vec<String>,
}

impl RecordingRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, prefix: &str) -> Self {
        self.fail_prefixes.push(prefix.to_string());
        self
    }

    pub fn unspawnable(mut self, prefix: &str) -> Self {
        self.spawn_fail_prefixes.push(prefix.to_string());
        self
    }

    pub fn recorded(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn run(&self, command: &str, cwd: &Path) -> Result<CommandResult, RunError> {
        self.commands.borrow_mut().push(command.to_string());

        if self
            .spawn_fail_prefixes
            .iter()
            .any(|p| command.starts_with(p.as_str()))
        {
            return Err(RunError::Spawn {
                command: command.to_string(),
                cwd: cwd.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "shell not found"),
            });
        }

        let failed = self
            .fail_prefixes
            .iter()
            .any(|p| command.starts_with(p.as_str()));
        Ok(CommandResult {
            command: command.to_string(),
            exit_code: if failed { 1 } else { 0 },
            stdout: String::new(),
            stderr: if failed {
                "scripted failure".to_string()
            } else {
                String::new()
            },
        })
    }
}
