//! Command-line interface.

pub mod completions;
pub mod hook;
pub mod output;
pub mod run;
pub mod status;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Catapult - branch-gated configuration reconciliation.
#[derive(Parser)]
#[command(
    name = "catapult",
    about = "Reconcile declared infrastructure with an encrypted, git-versioned secret store",
    version
)]
pub struct Cli {
    /// Catapult checkout to operate on
    #[arg(long, global = true, env = "CATAPULT_ROOT", default_value = ".")]
    pub root: PathBuf,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Skip pulling and pushing with the remote
    #[arg(long, global = true)]
    pub offline: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand)]
pub enum Command {
    /// Unlock secrets, validate, reconcile with providers and persist
    Run,

    /// Show branch, secret blobs and lock state without decrypting
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Pre-commit policy
    Hook {
        #[command(subcommand)]
        action: HookAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Hook subcommands.
#[derive(Subcommand)]
pub enum HookAction {
    /// Check the staged files against the branch policy
    PreCommit,

    /// Install the pre-commit hook into .git/hooks
    Install,
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Execute a parsed command line.
pub fn execute(cli: Cli) -> crate::error::Result<()> {
    match cli.command {
        Command::Run => run::execute(&cli.root, cli.offline),
        Command::Status { json } => status::execute(&cli.root, json),
        Command::Hook { action } => match action {
            HookAction::PreCommit => hook::pre_commit(&cli.root),
            HookAction::Install => hook::install(&cli.root),
        },
        Command::Completions { shell } => completions::execute(shell),
    }
}
