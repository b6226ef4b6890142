use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::config::{DEFAULT_API_BASE, DEFAULT_ROSTER_PATH};

#[derive(Parser)]
#[command(name = "collabsync")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(
    about = "Keep a GitHub repository's collaborators in sync with a roster file",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Grant, update and revoke access until the repository matches the roster
    Sync(SyncArgs),

    /// Show what sync would change without changing anything
    Diff(DiffArgs),

    /// Parse the roster and report what it declares
    Validate(ValidateArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Shared Arguments
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct RosterArgs {
    /// Roster file (YAML)
    #[arg(short, long, env = "COLLABSYNC_FILE", default_value = DEFAULT_ROSTER_PATH)]
    pub file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct RemoteArgs {
    /// Target repository as owner/name
    #[arg(short, long, env = "GITHUB_REPOSITORY")]
    pub repo: Option<String>,

    /// Access token with admin rights on the repository
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// GitHub API base URL
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_BASE)]
    pub api_url: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    pub timeout: u64,
}

// ============================================================================
// Command Arguments
// ============================================================================

#[derive(Args, Debug, Clone)]
pub struct SyncArgs {
    #[command(flatten)]
    pub roster: RosterArgs,

    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Show the plan without applying it
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Number of parallel jobs for the grant phase
    #[arg(short, long, default_value = "1")]
    pub jobs: usize,
}

#[derive(Args, Debug, Clone)]
pub struct DiffArgs {
    #[command(flatten)]
    pub roster: RosterArgs,

    #[command(flatten)]
    pub remote: RemoteArgs,

    /// Print the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub roster: RosterArgs,

    /// Print the parsed roster as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sync_flags() {
        let cli = Cli::try_parse_from([
            "collabsync",
            "sync",
            "--repo",
            "octo/demo",
            "--token",
            "t",
            "-f",
            "team.yml",
            "-n",
            "-j",
            "4",
        ])
        .unwrap();
        let Command::Sync(args) = cli.command else {
            panic!("expected sync");
        };
        assert_eq!(args.remote.repo.as_deref(), Some("octo/demo"));
        assert_eq!(args.roster.file, PathBuf::from("team.yml"));
        assert!(args.dry_run);
        assert!(!args.yes);
        assert_eq!(args.jobs, 4);
    }
}
