use anyhow::{bail, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::{
    resolve, write_config_atomic, Condition, Config, GeneralConfig, ResolvedPlan, StepConfig,
    PLAN_FILENAME,
};
use crate::paths::expand_tilde;

pub struct InitInputs {
    pub repo_dir: PathBuf,
    pub config: Option<String>,
    pub branch: String,
    /// `(path, message)` pairs, one commit step each.
    pub steps: Vec<(String, String)>,
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct InitResult {
    pub config_path: PathBuf,
    pub branch: String,
    pub steps: Vec<InitStepSummary>,
}

#[derive(Debug, Serialize)]
pub struct InitStepSummary {
    pub title: String,
    pub paths: Vec<String>,
}

pub fn init_target(repo_dir: &Path, config: Option<&str>) -> PathBuf {
    match config {
        Some(path) => expand_tilde(path),
        None => repo_dir.join(PLAN_FILENAME),
    }
}

pub fn validate_init_inputs(inputs: &InitInputs) -> Result<ResolvedPlan> {
    if !inputs.repo_dir.is_dir() {
        bail!(
            "repository directory does not exist: {}",
            inputs.repo_dir.display()
        );
    }

    let git_check = std::process::Command::new("git")
        .args(["rev-parse", "--git-dir"])
        .current_dir(&inputs.repo_dir)
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status();

    match git_check {
        Ok(s) if !s.success() => {
            bail!(
                "not a git repository: {}\nHint: pass --repo <path> to a git repository",
                inputs.repo_dir.display()
            );
        }
        Err(e) => {
            bail!(
                "failed to check git repo at {}: {}",
                inputs.repo_dir.display(),
                e
            );
        }
        _ => {}
    }

    let steps = inputs
        .steps
        .iter()
        .enumerate()
        .map(|(i, (path, message))| StepConfig {
            title: Some(format!("Commit {}: {}", i + 1, path)),
            path: Some(path.clone()),
            paths: Vec::new(),
            when: Condition::Exists,
            only_if_staged: false,
            message: message.clone(),
        })
        .collect();

    resolve(Config {
        general: GeneralConfig {
            branch: inputs.branch.clone(),
            remote: None,
            log_count: None,
            shell: None,
        },
        steps,
    })
}

pub fn cmd_init(inputs: InitInputs) -> Result<InitResult> {
    let plan = validate_init_inputs(&inputs)?;
    let config_path = init_target(&inputs.repo_dir, inputs.config.as_deref());

    write_config_atomic(&config_path, &plan, inputs.force)?;

    Ok(InitResult {
        config_path,
        branch: plan.branch.clone(),
        steps: plan
            .steps
            .iter()
            .map(|s| InitStepSummary {
                title: s.title.clone(),
                paths: s.paths.clone(),
            })
            .collect(),
    })
}

pub fn format_init_human(result: &InitResult) -> String {
    let mut lines = vec![format!("Plan written to {}", result.config_path.display())];
    lines.push(format!("  branch: {}", result.branch));
    if result.steps.is_empty() {
        lines.push("  no steps yet; add [[steps]] entries to the file".to_string());
    }
    for step in &result.steps {
        lines.push(format!("  {} ({})", step.title, step.paths.join(", ")));
    }
    lines.join("\n")
}
