use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "git-batch",
    about = "Create a branch and commit files step by step from a plan file"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase diagnostic logging (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Suppress per-command progress lines
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the plan: status, branch, commit steps, final status and log
    Run {
        /// Repository directory every command runs in
        #[arg(long, default_value = ".")]
        repo: String,
        /// Plan file (default: nearest .git-batch.toml, then the user config)
        #[arg(long)]
        config: Option<String>,
        /// Show what would run without running anything
        #[arg(long)]
        dry_run: bool,
        /// Exit with status 1 if the branch or any step failed
        #[arg(long)]
        strict: bool,
    },
    /// Write a starter plan file
    Init {
        /// Repository directory
        #[arg(long, default_value = ".")]
        repo: String,
        /// Where to write the plan (default: <repo>/.git-batch.toml)
        #[arg(long)]
        config: Option<String>,
        /// Branch to create
        #[arg(long)]
        branch: Option<String>,
        /// Commit step as PATH=MESSAGE (repeatable)
        #[arg(long = "step")]
        steps: Vec<String>,
        /// Overwrite an existing plan file
        #[arg(long)]
        force: bool,
        /// Print the plan path `run` would use and exit
        #[arg(long)]
        show_path: bool,
    },
    /// Run a single shell command in the repository
    Exec {
        /// Repository directory
        #[arg(long, default_value = ".")]
        repo: String,
        /// Command and arguments to run
        #[arg(last = true)]
        cmd: Vec<String>,
    },
}
