//! Core types for repository access.
//!
//! This module contains the value types exchanged with a remote repository:
//! permission levels, the repository reference, observed collaborators and
//! pending invitations, and the pagination primitives.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Access tier granted to a principal on a repository.
///
/// Variants are declared in increasing order of privilege, so the derived
/// ordering reads `Pull < Triage < Push < Maintain < Admin`.
///
/// # Example
///
/// ```
/// use repoaccess::PermissionLevel;
///
/// let level: PermissionLevel = "maintain".parse().unwrap();
/// assert_eq!(level, PermissionLevel::Maintain);
/// assert_eq!(PermissionLevel::from_api_name("write"), Some(PermissionLevel::Push));
/// assert!(PermissionLevel::Pull < PermissionLevel::Admin);
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// Read-only access.
    Pull,
    /// Manage issues and pull requests without write access.
    Triage,
    /// Read and write access.
    #[default]
    Push,
    /// Push plus repository settings that are not destructive.
    Maintain,
    /// Full control.
    Admin,
}

impl PermissionLevel {
    /// All levels, from least to most privileged.
    pub const ALL: [Self; 5] = [
        Self::Pull,
        Self::Triage,
        Self::Push,
        Self::Maintain,
        Self::Admin,
    ];

    /// The canonical lower-case name, as sent to the API.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pull => "pull",
            Self::Triage => "triage",
            Self::Push => "push",
            Self::Maintain => "maintain",
            Self::Admin => "admin",
        }
    }

    /// Normalize a level name reported by the API.
    ///
    /// GitHub mixes two vocabularies: `read`/`write` appear in role names and
    /// invitation payloads, `pull`/`push` everywhere else.
    #[must_use]
    pub fn from_api_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "pull" | "read" => Some(Self::Pull),
            "triage" => Some(Self::Triage),
            "push" | "write" => Some(Self::Push),
            "maintain" => Some(Self::Maintain),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_api_name(s).ok_or_else(|| Error::Other(format!("unknown permission level: {s}")))
    }
}

/// A repository identified by its owner and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    /// Owning user or organization.
    pub owner: String,
    /// Repository name.
    pub name: String,
}

impl RepoRef {
    /// Create a repository reference from its parts.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoRef {
    type Err = Error;

    /// Parse `owner/name`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches('/');
        match trimmed.split_once('/') {
            Some((owner, name))
                if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
            {
                Ok(Self::new(owner, name))
            }
            _ => Err(Error::InvalidRepo(s.to_string())),
        }
    }
}

/// Longest login GitHub accepts.
pub const MAX_LOGIN_LEN: usize = 39;

/// Whether `login` is a well-formed GitHub login.
///
/// Logins are ASCII letters, digits and single hyphens, never starting or
/// ending with a hyphen, and at most [`MAX_LOGIN_LEN`] characters long.
pub fn is_valid_login(login: &str) -> bool {
    !login.is_empty()
        && login.len() <= MAX_LOGIN_LEN
        && login.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
        && !login.starts_with('-')
        && !login.ends_with('-')
        && !login.contains("--")
}

/// A collaborator currently holding direct access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCollaborator {
    /// Login as reported by the remote.
    pub identity: String,
    /// Current permission level.
    pub permission: PermissionLevel,
}

impl RemoteCollaborator {
    pub fn new(identity: impl Into<String>, permission: PermissionLevel) -> Self {
        Self {
            identity: identity.into(),
            permission,
        }
    }
}

/// Opaque identifier of a pending invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InvitationId(pub u64);

impl fmt::Display for InvitationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An outstanding, unaccepted invitation.
///
/// Invitations cannot be patched: changing the offered permission means
/// deleting the invitation and inviting again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInvitation {
    pub id: InvitationId,
    /// Invited login. `None` for invitations that have no resolvable user
    /// (e.g. sent to an email address).
    pub invitee: Option<String>,
    /// Permission offered by the invitation.
    pub permission: PermissionLevel,
}

impl PendingInvitation {
    pub fn new(id: u64, invitee: Option<&str>, permission: PermissionLevel) -> Self {
        Self {
            id: InvitationId(id),
            invitee: invitee.map(str::to_string),
            permission,
        }
    }
}

/// Continuation token for a paginated listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(pub String);

/// One page of a paginated listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Cursor for the following page, `None` on the last page.
    pub next: Option<PageCursor>,
}

impl<T> Page<T> {
    /// A final page with no continuation.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }
}

/// What an upsert did on the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new invitation was sent (or an existing one replaced).
    Invited,
    /// An existing collaborator's permission was set.
    Updated,
}

impl fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invited => write!(f, "invited"),
            Self::Updated => write!(f, "updated"),
        }
    }
}
