use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use crate::config::{Condition, ResolvedStep};
use crate::git;

pub const KEEP_FILENAME: &str = ".gitkeep";

/// What a step will do given the current state of the working tree.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepAction {
    Skip { reason: String },
    Stage { paths: Vec<String> },
    Scaffold { paths: Vec<String> },
}

pub fn plan_step(repo_dir: &Path, step: &ResolvedStep) -> StepAction {
    match step.when {
        Condition::Exists => {
            let present: Vec<String> = step
                .paths
                .iter()
                .filter(|p| repo_dir.join(p).exists())
                .cloned()
                .collect();
            if present.is_empty() {
                StepAction::Skip {
                    reason: format!("not found: {}", step.paths.join(", ")),
                }
            } else {
                StepAction::Stage { paths: present }
            }
        }
        Condition::Missing => {
            let absent: Vec<String> = step
                .paths
                .iter()
                .filter(|p| !repo_dir.join(p).exists())
                .cloned()
                .collect();
            if absent.is_empty() {
                StepAction::Skip {
                    reason: format!("already present: {}", step.paths.join(", ")),
                }
            } else {
                StepAction::Scaffold { paths: absent }
            }
        }
        Condition::Always => StepAction::Stage {
            paths: step.paths.clone(),
        },
    }
}

/// Creates each path as a directory holding an empty `.gitkeep`.
pub fn scaffold(repo_dir: &Path, paths: &[String]) -> Result<()> {
    for path in paths {
        let dir = repo_dir.join(path);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
        let keep = dir.join(KEEP_FILENAME);
        std::fs::write(&keep, "")
            .with_context(|| format!("failed to write {}", keep.display()))?;
    }
    Ok(())
}

/// Paths handed to `git add` for an action.
pub fn staged_paths(action: &StepAction) -> Vec<String> {
    match action {
        StepAction::Skip { .. } => Vec::new(),
        StepAction::Stage { paths } => paths.clone(),
        StepAction::Scaffold { paths } => paths
            .iter()
            .map(|p| format!("{}/", p.trim_end_matches('/')))
            .collect(),
    }
}

/// Commands a non-skipped step issues, in order.
pub fn step_commands(step: &ResolvedStep, action: &StepAction) -> Vec<String> {
    if matches!(action, StepAction::Skip { .. }) {
        return Vec::new();
    }
    let mut commands = vec![git::add(&staged_paths(action))];
    if step.only_if_staged {
        commands.push(git::staged_changes_check());
    }
    commands.push(git::commit(&step.message));
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::make_step;

    #[test]
    fn exists_skips_when_absent() {
        let tmp = tempfile::tempdir().unwrap();
        let step = make_step("s", &["initialize.sh"], Condition::Exists);
        assert!(matches!(
            plan_step(tmp.path(), &step),
            StepAction::Skip { .. }
        ));
    }

    #[test]
    fn exists_stages_only_present_paths() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("CLAUDE.md"), "x").unwrap();
        let step = make_step(
            "config",
            &["CLAUDE.md", "package.json", "package-lock.json"],
            Condition::Exists,
        );
        assert_eq!(
            plan_step(tmp.path(), &step),
            StepAction::Stage {
                paths: vec!["CLAUDE.md".to_string()]
            }
        );
    }

    #[test]
    fn missing_scaffolds_absent_paths() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join("present")).unwrap();
        let step = make_step("dirs", &["present", ".bash_profile.dir"], Condition::Missing);
        assert_eq!(
            plan_step(tmp.path(), &step),
            StepAction::Scaffold {
                paths: vec![".bash_profile.dir".to_string()]
            }
        );
    }

    #[test]
    fn missing_skips_when_all_present() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join(".bash_profile.dir")).unwrap();
        let step = make_step("dirs", &[".bash_profile.dir"], Condition::Missing);
        let action = plan_step(tmp.path(), &step);
        assert_eq!(
            action,
            StepAction::Skip {
                reason: "already present: .bash_profile.dir".to_string()
            }
        );
    }

    #[test]
    fn always_stages_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let step = make_step("all", &["a", "b"], Condition::Always);
        assert_eq!(
            plan_step(tmp.path(), &step),
            StepAction::Stage {
                paths: vec!["a".to_string(), "b".to_string()]
            }
        );
    }

    #[test]
    fn scaffold_creates_dir_with_keep_file() {
        let tmp = tempfile::tempdir().unwrap();
        scaffold(tmp.path(), &["nested/dir".to_string()]).unwrap();
        let keep = tmp.path().join("nested/dir").join(KEEP_FILENAME);
        assert!(keep.is_file());
        assert_eq!(std::fs::read_to_string(keep).unwrap(), "");
    }

    #[test]
    fn scaffold_fails_when_a_file_is_in_the_way() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("blocker"), "x").unwrap();
        assert!(scaffold(tmp.path(), &["blocker/child".to_string()]).is_err());
    }

    #[test]
    fn scaffolded_paths_are_added_as_directories() {
        let action = StepAction::Scaffold {
            paths: vec![".bash_profile.dir".to_string()],
        };
        assert_eq!(staged_paths(&action), vec![".bash_profile.dir/"]);
    }

    #[test]
    fn commands_include_staged_check_when_requested() {
        let mut step = make_step("config", &["CLAUDE.md"], Condition::Exists);
        step.only_if_staged = true;
        let action = StepAction::Stage {
            paths: vec!["CLAUDE.md".to_string()],
        };
        let commands = step_commands(&step, &action);
        assert_eq!(
            commands,
            vec![
                "git add -- CLAUDE.md".to_string(),
                "git diff --cached --quiet".to_string(),
                git::commit(&step.message),
            ]
        );
    }

    #[test]
    fn skipped_step_has_no_commands() {
        let step = make_step("s", &["a"], Condition::Exists);
        let action = StepAction::Skip {
            reason: "not found: a".to_string(),
        };
        assert!(step_commands(&step, &action).is_empty());
    }
}
