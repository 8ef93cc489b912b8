mod cli;
mod commands;
mod config;
mod git;
mod logging;
mod paths;
mod runner;
mod step;
mod testutil;

use anyhow::{bail, Result};
use clap::Parser;
use cli::{Cli, Command};
use runner::{Progress, ShellRunner};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(cli.verbose) {
        eprintln!("warning: {:#}", e);
    }

    if let Err(e) = run(cli) {
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Keep stdout clean for the JSON document.
    let progress = if cli.quiet {
        Progress::Quiet
    } else if cli.json {
        Progress::Stderr
    } else {
        Progress::Stdout
    };

    match cli.command {
        Command::Run {
            repo,
            config,
            dry_run,
            strict,
        } => {
            let repo_dir = paths::absolute_dir(&repo)?;
            let config_path = config::resolve_config_path(config.as_deref(), &repo_dir)?;
            let plan = config::load_config(&config_path)?;
            tracing::info!(
                plan = %config_path.display(),
                repo = %repo_dir.display(),
                steps = plan.steps.len(),
                "loaded plan"
            );

            if dry_run {
                let result = commands::cmd_run_dry(&repo_dir, &plan);
                output(&result, cli.json, commands::format_dry_run_human)?;
                return Ok(());
            }

            let mut runner = ShellRunner::new(progress);
            if let Some(shell) = &plan.shell {
                runner = runner.with_shell(shell.clone());
            }

            let report = commands::cmd_run(&runner, &repo_dir, &plan);
            let has_failures = report.has_failures();
            output(&report, cli.json, commands::format_run_human)?;
            if strict && has_failures {
                std::process::exit(1);
            }
        }
        Command::Init {
            repo,
            config,
            branch,
            steps,
            force,
            show_path,
        } => {
            let repo_dir = paths::absolute_dir(&repo)?;
            if show_path {
                let path = config::resolve_config_path(config.as_deref(), &repo_dir)?;
                println!("{}", path.display());
                return Ok(());
            }

            let branch = branch.unwrap_or_else(|| {
                eprintln!("error: --branch is required\nHint: git-batch init --branch <name> --step <path>=<message>");
                std::process::exit(1);
            });

            // Parse --step strings ("path=message") into tuples
            let mut parsed_steps = Vec::new();
            for s in steps {
                match s.split_once('=') {
                    Some((path, message)) => {
                        parsed_steps.push((path.to_string(), message.to_string()));
                    }
                    None => {
                        bail!(
                            "invalid --step format: {:?}\n  hint: use --step path/to/file=\"commit message\"",
                            s
                        );
                    }
                }
            }

            let inputs = commands::InitInputs {
                repo_dir,
                config,
                branch,
                steps: parsed_steps,
                force,
            };

            let result = commands::cmd_init(inputs)?;
            output(&result, cli.json, commands::format_init_human)?;
        }
        Command::Exec { repo, cmd } => {
            let repo_dir = paths::absolute_dir(&repo)?;
            let runner = ShellRunner::new(progress);
            let result = commands::cmd_exec(&runner, &repo_dir, &cmd)?;
            let exit_code = result.exit_code;
            output(&result, cli.json, commands::format_exec_human)?;
            if exit_code != 0 {
                std::process::exit(exit_code);
            }
        }
    }
    Ok(())
}

fn output<T: serde::Serialize>(result: &T, json: bool, human_fn: fn(&T) -> String) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        let text = human_fn(result);
        if !text.is_empty() {
            println!("{}", text);
        }
    }
    Ok(())
}
