use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::{ResolvedPlan, ResolvedStep};
use crate::git;
use crate::runner::{CommandRecord, CommandRunner};
use crate::step::{plan_step, scaffold, staged_paths, step_commands, StepAction};

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum BranchOutcome {
    /// `checkout -b` succeeded.
    Created,
    /// `checkout -b` failed but the branch could be checked out.
    Existing,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepOutcome {
    Skipped { reason: String },
    Committed,
    NothingStaged,
    Failed { error: String },
}

#[derive(Debug, Serialize)]
pub struct StepReport {
    pub title: String,
    pub outcome: StepOutcome,
    pub commands: Vec<CommandRecord>,
}

#[derive(Debug, Serialize)]
pub struct RunReport {
    pub repo_dir: PathBuf,
    pub branch: String,
    pub remote: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status_check: CommandRecord,
    pub branch_outcome: BranchOutcome,
    pub branch_commands: Vec<CommandRecord>,
    pub steps: Vec<StepReport>,
    pub final_commands: Vec<CommandRecord>,
    pub commits_made: usize,
    /// Commands that failed, not counting a `checkout -b` rescued by checkout
    /// or a staged-changes check reporting changes.
    pub failed_commands: usize,
    /// Branch or step titles whose outcome was a failure.
    pub failures: Vec<String>,
}

impl RunReport {
    pub fn has_failures(&self) -> bool {
        self.failed_commands > 0 || !self.failures.is_empty()
    }
}

fn run_recorded(runner: &dyn CommandRunner, command: &str, repo_dir: &Path) -> CommandRecord {
    let outcome = runner.run(command, repo_dir);
    CommandRecord::from_outcome(command, &outcome)
}

fn counts_as_failure(record: &CommandRecord) -> bool {
    match record {
        CommandRecord::SpawnFailed { .. } => true,
        // `git diff --cached --quiet` exits 1 when something is staged.
        CommandRecord::Exited(result) => {
            !result.success()
                && !(result.command == git::staged_changes_check() && result.exit_code == 1)
        }
    }
}

fn describe_failure(record: &CommandRecord) -> String {
    match record {
        CommandRecord::Exited(result) => {
            format!("`{}` exited with {}", result.command, result.exit_code)
        }
        CommandRecord::SpawnFailed { error, .. } => error.clone(),
    }
}

fn ensure_branch(
    runner: &dyn CommandRunner,
    repo_dir: &Path,
    branch: &str,
) -> (BranchOutcome, Vec<CommandRecord>) {
    runner.announce(&format!("Creating branch {}", branch));
    let create = run_recorded(runner, &git::create_branch(branch), repo_dir);
    if create.succeeded() {
        runner.note("Branch created.");
        return (BranchOutcome::Created, vec![create]);
    }

    runner.note("Could not create branch, it might already exist. Checking it out instead.");
    let checkout = run_recorded(runner, &git::checkout(branch), repo_dir);
    let outcome = if checkout.succeeded() {
        BranchOutcome::Existing
    } else {
        tracing::warn!(branch, "branch could not be created or checked out");
        BranchOutcome::Failed
    };
    (outcome, vec![create, checkout])
}

fn execute_step(runner: &dyn CommandRunner, repo_dir: &Path, step: &ResolvedStep) -> StepReport {
    let action = plan_step(repo_dir, step);
    let mut commands = Vec::new();

    if let StepAction::Skip { reason } = &action {
        tracing::info!(step = %step.title, %reason, "skipping step");
        return StepReport {
            title: step.title.clone(),
            outcome: StepOutcome::Skipped {
                reason: reason.clone(),
            },
            commands,
        };
    }

    runner.announce(&step.title);

    if let StepAction::Scaffold { paths } = &action {
        if let Err(e) = scaffold(repo_dir, paths) {
            let error = format!("{:#}", e);
            tracing::warn!(step = %step.title, %error, "scaffold failed");
            runner.note(&format!("FAILED: {}", error));
            return StepReport {
                title: step.title.clone(),
                outcome: StepOutcome::Failed { error },
                commands,
            };
        }
    }

    // A failed add does not stop the commit; whatever is staged gets committed.
    commands.push(run_recorded(
        runner,
        &git::add(&staged_paths(&action)),
        repo_dir,
    ));

    if step.only_if_staged {
        let check = run_recorded(runner, &git::staged_changes_check(), repo_dir);
        let clean = check.succeeded();
        commands.push(check);
        if clean {
            runner.note("Nothing staged, skipping commit.");
            return StepReport {
                title: step.title.clone(),
                outcome: StepOutcome::NothingStaged,
                commands,
            };
        }
    }

    let commit = run_recorded(runner, &git::commit(&step.message), repo_dir);
    let outcome = if commit.succeeded() {
        StepOutcome::Committed
    } else {
        tracing::warn!(step = %step.title, command = commit.command(), "commit failed");
        StepOutcome::Failed {
            error: describe_failure(&commit),
        }
    };
    commands.push(commit);

    StepReport {
        title: step.title.clone(),
        outcome,
        commands,
    }
}

pub fn cmd_run(runner: &dyn CommandRunner, repo_dir: &Path, plan: &ResolvedPlan) -> RunReport {
    debug_assert!(repo_dir.is_absolute(), "repo_dir must be absolute");
    let started_at = Utc::now();

    runner.announce("Checking current git status");
    let status_check = run_recorded(runner, &git::status(), repo_dir);

    let (branch_outcome, branch_commands) = ensure_branch(runner, repo_dir, &plan.branch);

    let steps: Vec<StepReport> = plan
        .steps
        .iter()
        .map(|step| execute_step(runner, repo_dir, step))
        .collect();

    runner.announce("Final git status");
    let final_commands = vec![
        run_recorded(runner, &git::status(), repo_dir),
        run_recorded(runner, &git::log_oneline(plan.log_count), repo_dir),
    ];

    let commits_made = steps
        .iter()
        .filter(|s| matches!(s.outcome, StepOutcome::Committed))
        .count();

    let branch_failures = if branch_outcome == BranchOutcome::Existing {
        branch_commands.iter().skip(1).filter(|r| counts_as_failure(r)).count()
    } else {
        branch_commands.iter().filter(|r| counts_as_failure(r)).count()
    };
    let failed_commands = std::iter::once(&status_check)
        .chain(steps.iter().flat_map(|s| s.commands.iter()))
        .chain(final_commands.iter())
        .filter(|r| counts_as_failure(r))
        .count()
        + branch_failures;

    let mut failures = Vec::new();
    if branch_outcome == BranchOutcome::Failed {
        failures.push(format!("branch {}", plan.branch));
    }
    for step in &steps {
        if matches!(step.outcome, StepOutcome::Failed { .. }) {
            failures.push(step.title.clone());
        }
    }

    RunReport {
        repo_dir: repo_dir.to_path_buf(),
        branch: plan.branch.clone(),
        remote: plan.remote.clone(),
        started_at,
        finished_at: Utc::now(),
        status_check,
        branch_outcome,
        branch_commands,
        steps,
        final_commands,
        commits_made,
        failed_commands,
        failures,
    }
}

pub fn format_run_human(report: &RunReport) -> String {
    let mut lines = vec!["=== Summary ===".to_string()];

    let branch = match report.branch_outcome {
        BranchOutcome::Created => "created",
        BranchOutcome::Existing => "already existed, checked out",
        BranchOutcome::Failed => "FAILED",
    };
    lines.push(format!("Branch {}: {}", report.branch, branch));

    for step in &report.steps {
        let outcome = match &step.outcome {
            StepOutcome::Skipped { reason } => format!("skipped ({})", reason),
            StepOutcome::Committed => "committed".to_string(),
            StepOutcome::NothingStaged => "nothing to commit".to_string(),
            StepOutcome::Failed { error } => format!("FAILED ({})", error),
        };
        lines.push(format!("  {}: {}", step.title, outcome));
    }

    let noun = if report.commits_made == 1 {
        "commit"
    } else {
        "commits"
    };
    lines.push(format!("{} {} made.", report.commits_made, noun));
    if report.failed_commands > 0 {
        let noun = if report.failed_commands == 1 {
            "command"
        } else {
            "commands"
        };
        lines.push(format!("{} failed {}.", report.failed_commands, noun));
    }

    if !report.failures.is_empty() {
        lines.push(format!("Failed: {}", report.failures.join(", ")));
    }

    if report.branch_outcome != BranchOutcome::Failed {
        lines.push(format!(
            "Push with: {}",
            git::push_hint(&report.remote, &report.branch)
        ));
    }

    lines.join("\n")
}

// --- Dry run ---

#[derive(Debug, Serialize)]
pub struct PlannedStep {
    pub title: String,
    pub action: StepAction,
    pub commands: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DryRunReport {
    pub repo_dir: PathBuf,
    pub branch: String,
    pub before: Vec<String>,
    pub steps: Vec<PlannedStep>,
    pub after: Vec<String>,
}

pub fn cmd_run_dry(repo_dir: &Path, plan: &ResolvedPlan) -> DryRunReport {
    let steps = plan
        .steps
        .iter()
        .map(|step| {
            let action = plan_step(repo_dir, step);
            let commands = step_commands(step, &action);
            PlannedStep {
                title: step.title.clone(),
                action,
                commands,
            }
        })
        .collect();

    DryRunReport {
        repo_dir: repo_dir.to_path_buf(),
        branch: plan.branch.clone(),
        before: vec![git::status(), git::create_branch(&plan.branch)],
        steps,
        after: vec![git::status(), git::log_oneline(plan.log_count)],
    }
}

pub fn format_dry_run_human(report: &DryRunReport) -> String {
    let mut lines = vec![
        "Dry run: no commands will be executed.".to_string(),
        format!("Repository: {}", report.repo_dir.display()),
        String::new(),
    ];

    for command in &report.before {
        lines.push(format!("  {}", command));
    }
    lines.push(format!(
        "    (if that fails: {})",
        git::checkout(&report.branch)
    ));

    for step in &report.steps {
        match &step.action {
            StepAction::Skip { reason } => {
                lines.push(format!("{}: skip ({})", step.title, reason));
            }
            StepAction::Stage { .. } => lines.push(format!("{}:", step.title)),
            StepAction::Scaffold { paths } => {
                lines.push(format!("{}: create {}", step.title, paths.join(", ")));
            }
        }
        for command in &step.commands {
            lines.push(format!("  {}", command));
        }
    }

    for command in &report.after {
        lines.push(format!("  {}", command));
    }

    lines.join("\n")
}
