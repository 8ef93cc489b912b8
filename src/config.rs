use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::paths::{expand_tilde, find_upward, validate_step_path};

pub const PLAN_FILENAME: &str = ".git-batch.toml";
pub const DEFAULT_REMOTE: &str = "origin";
pub const DEFAULT_LOG_COUNT: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub general: GeneralConfig,
    #[serde(default)]
    pub steps: Vec<StepConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<String>,
    #[serde(default)]
    pub when: Condition,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub only_if_staged: bool,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// Stage the listed paths that exist; skip when none do.
    #[default]
    Exists,
    /// Create each absent path as a directory with a `.gitkeep`; skip when all exist.
    Missing,
    /// Stage every listed path unconditionally.
    Always,
}

#[derive(Debug, Clone)]
pub struct ResolvedStep {
    pub title: String,
    pub paths: Vec<String>,
    pub when: Condition,
    pub only_if_staged: bool,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct ResolvedPlan {
    pub branch: String,
    pub remote: String,
    pub log_count: usize,
    pub shell: Option<String>,
    pub steps: Vec<ResolvedStep>,
}

pub fn default_config_path() -> Result<PathBuf> {
    let proj = directories::ProjectDirs::from("", "", "git-batch")
        .context("could not determine config directory")?;
    Ok(proj.config_dir().join("config.toml"))
}

/// `--config` wins, then the nearest plan file above `repo_dir`, then the user config.
pub fn resolve_config_path(explicit: Option<&str>, repo_dir: &Path) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(expand_tilde(path));
    }
    if let Some(found) = find_upward(repo_dir, PLAN_FILENAME) {
        return Ok(found);
    }
    default_config_path()
}

pub fn load_config(path: &Path) -> Result<ResolvedPlan> {
    if !path.exists() {
        bail!(
            "plan not found at {}\nRun `git-batch init --branch <name>` to create one.",
            path.display()
        );
    }
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read plan from {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("invalid plan {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<ResolvedPlan> {
    let raw: Config = toml::from_str(contents).context("failed to parse plan TOML")?;
    resolve(raw)
}

pub fn resolve(raw: Config) -> Result<ResolvedPlan> {
    let branch = raw.general.branch;
    if branch.trim().is_empty() {
        bail!("general.branch must not be empty");
    }
    if branch != branch.trim() || branch.contains(char::is_whitespace) {
        bail!("general.branch must not contain whitespace: {:?}", branch);
    }

    let remote = raw
        .general
        .remote
        .unwrap_or_else(|| DEFAULT_REMOTE.to_string());
    if remote.trim().is_empty() {
        bail!("general.remote must not be empty");
    }

    let log_count = raw.general.log_count.unwrap_or(DEFAULT_LOG_COUNT);
    if log_count == 0 {
        bail!("general.log_count must be at least 1");
    }

    let mut steps = Vec::new();
    for (index, step) in raw.steps.into_iter().enumerate() {
        let title = step
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| format!("Step {}", index + 1));

        let mut paths = Vec::new();
        let mut seen = HashSet::new();
        for path in step.path.into_iter().chain(step.paths) {
            validate_step_path(&path).with_context(|| format!("in step {:?}", title))?;
            if !seen.insert(path.clone()) {
                bail!("duplicate path {:?} in step {:?}", path, title);
            }
            paths.push(path);
        }
        if paths.is_empty() {
            bail!(
                "step {:?} has no paths\n  hint: set `path = \"...\"` or `paths = [...]`",
                title
            );
        }

        if step.message.trim().is_empty() {
            bail!("step {:?} has an empty commit message", title);
        }

        steps.push(ResolvedStep {
            title,
            paths,
            when: step.when,
            only_if_staged: step.only_if_staged,
            message: step.message,
        });
    }

    let result = ResolvedPlan {
        branch,
        remote,
        log_count,
        shell: raw.general.shell,
        steps,
    };

    debug_assert!(
        result.steps.iter().all(|s| !s.paths.is_empty()),
        "every step must have at least one path"
    );

    Ok(result)
}

impl ResolvedPlan {
    pub fn to_raw(&self) -> Config {
        Config {
            general: GeneralConfig {
                branch: self.branch.clone(),
                remote: Some(self.remote.clone()),
                log_count: Some(self.log_count),
                shell: self.shell.clone(),
            },
            steps: self
                .steps
                .iter()
                .map(|s| StepConfig {
                    title: Some(s.title.clone()),
                    path: None,
                    paths: s.paths.clone(),
                    when: s.when,
                    only_if_staged: s.only_if_staged,
                    message: s.message.clone(),
                })
                .collect(),
        }
    }
}

pub fn write_config_atomic(path: &Path, plan: &ResolvedPlan, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "plan already exists at {}\nUse --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create plan directory {}", parent.display()))?;
    }

    let content = toml::to_string_pretty(&plan.to_raw()).context("failed to serialize plan")?;

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, &content)
        .with_context(|| format!("failed to write temp plan to {}", tmp_path.display()))?;
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("failed to rename plan to {}", path.display()))?;

    Ok(())
}
