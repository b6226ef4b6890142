//! # repoaccess
//!
//! Read and mutate the direct collaborators and pending invitations of a
//! GitHub repository.
//!
//! This crate provides:
//! - Value types for permission levels, collaborators and invitations
//! - The [`RepositoryAccess`] capability trait
//! - A blocking GitHub REST implementation ([`GitHubBackend`])
//! - An in-memory [`MockBackend`] for tests
//!
//! ## Example
//!
//! ```no_run
//! use repoaccess::{GitHubBackend, PermissionLevel, RepoRef, RepositoryAccess};
//!
//! let backend = GitHubBackend::new("ghp_example");
//! let repo: RepoRef = "octo-org/hello-world".parse().unwrap();
//!
//! backend
//!     .upsert_collaborator(&repo, "octocat", PermissionLevel::Triage)
//!     .expect("invite failed");
//! ```
//!
//! ## Permission vocabulary
//!
//! | Level    | API aliases      |
//! |----------|------------------|
//! | pull     | `read`           |
//! | triage   |                  |
//! | push     | `write`          |
//! | maintain |                  |
//! | admin    |                  |

#![warn(clippy::all)]

pub mod backend;
pub mod error;
pub mod types;

pub use backend::github::GitHubBackend;
pub use backend::{MockBackend, RepositoryAccess, list_all_collaborators};
pub use error::{Error, ErrorCategory, Result};
pub use types::{
    InvitationId, MAX_LOGIN_LEN, Page, PageCursor, PendingInvitation, PermissionLevel,
    RemoteCollaborator, RepoRef, UpsertOutcome, is_valid_login,
};
