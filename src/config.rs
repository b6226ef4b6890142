use anyhow::{Context, Result, bail};
use repoaccess::{GitHubBackend, RepoRef};
use roster::Roster;
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::RemoteArgs;

/// Roster location used when neither `--file` nor `COLLABSYNC_FILE` is set.
pub const DEFAULT_ROSTER_PATH: &str = ".github/collaborators.yml";

pub use repoaccess::backend::github::DEFAULT_API_BASE;

// ============================================================================
// Remote Settings
// ============================================================================

/// Resolved connection settings for one repository.
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub repo: RepoRef,
    pub token: String,
    pub api_url: String,
    pub timeout: Duration,
}

impl RemoteSettings {
    /// Resolve flags and environment into usable settings.
    pub fn from_args(args: &RemoteArgs) -> Result<Self> {
        let Some(repo) = args.repo.as_deref().filter(|r| !r.trim().is_empty()) else {
            bail!("No repository given: pass --repo owner/name or set GITHUB_REPOSITORY");
        };
        let repo: RepoRef = repo
            .trim()
            .parse()
            .with_context(|| format!("Invalid repository '{repo}'"))?;

        let token = match args.token.as_deref().map(str::trim) {
            Some(token) if !token.is_empty() => token.to_string(),
            _ => bail!("No access token: pass --token or set GITHUB_TOKEN"),
        };

        if args.timeout == 0 {
            bail!("--timeout must be at least 1 second");
        }

        Ok(Self {
            repo,
            token,
            api_url: args.api_url.trim().to_string(),
            timeout: Duration::from_secs(args.timeout),
        })
    }

    /// Build the GitHub backend for these settings.
    pub fn backend(&self) -> GitHubBackend {
        GitHubBackend::with_options(&self.token, &self.api_url, self.timeout)
    }
}

// ============================================================================
// Roster Loading
// ============================================================================

/// Expand `~` and environment variables in a roster path.
///
/// Unknown variables are left as-is.
pub fn roster_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    let expanded = shellexpand::full(&raw).unwrap_or(Cow::Borrowed(raw.as_ref()));
    PathBuf::from(expanded.as_ref())
}

/// Read and parse the roster file.
pub fn load_roster(path: &Path) -> Result<Roster> {
    let path = roster_path(path);
    log::debug!("Loading roster from {}", path.display());
    roster::parse_file(&path).with_context(|| format!("Could not load roster {}", path.display()))
}
