//! Backend trait and implementations for repository access.
//!
//! [`RepositoryAccess`] is the capability the reconciliation engine consumes.
//! The primary implementation is [`github::GitHubBackend`].
//!
//! # Testing
//!
//! Use [`MockBackend`] for testing without network access. It keeps remote
//! state in memory, applies mutations the way GitHub does, and records every
//! call it receives:
//!
//! ```
//! use repoaccess::backend::{Call, MockBackend, RepositoryAccess};
//! use repoaccess::{PermissionLevel, RepoRef};
//!
//! let mock = MockBackend::new();
//! mock.add_collaborator("alice", PermissionLevel::Push);
//!
//! let repo = RepoRef::new("octo-org", "hello-world");
//! mock.upsert_collaborator(&repo, "bob", PermissionLevel::Admin).unwrap();
//!
//! assert_eq!(mock.invitations().len(), 1);
//! assert_eq!(
//!     mock.mutations(),
//!     vec![Call::Upsert { identity: "bob".to_string(), permission: PermissionLevel::Admin }]
//! );
//! ```

pub mod github;

use crate::error::{Error, Result};
use crate::types::{
    InvitationId, Page, PageCursor, PendingInvitation, PermissionLevel, RemoteCollaborator,
    RepoRef, UpsertOutcome,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Access to the collaborators and invitations of a repository.
///
/// All operations are scoped to the repository passed in; implementations
/// hold credentials and transport, not repository state.
pub trait RepositoryAccess: Send + Sync {
    /// Fetch one page of direct collaborators.
    ///
    /// Pass `None` for the first page and the returned [`Page::next`] cursor
    /// for each following page.
    fn list_collaborators(
        &self,
        repo: &RepoRef,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<RemoteCollaborator>>;

    /// Fetch every pending invitation.
    fn list_invitations(&self, repo: &RepoRef) -> Result<Vec<PendingInvitation>>;

    /// Grant `permission` to `identity`.
    ///
    /// Invites a new principal, or sets the permission of an existing
    /// collaborator. Both go through the same call.
    fn upsert_collaborator(
        &self,
        repo: &RepoRef,
        identity: &str,
        permission: PermissionLevel,
    ) -> Result<UpsertOutcome>;

    /// Remove a collaborator's direct access.
    fn revoke_collaborator(&self, repo: &RepoRef, identity: &str) -> Result<()>;

    /// Delete a pending invitation.
    fn delete_invitation(&self, repo: &RepoRef, id: InvitationId) -> Result<()>;
}

/// Fetch every collaborator by following page cursors until exhausted.
pub fn list_all_collaborators(
    access: &dyn RepositoryAccess,
    repo: &RepoRef,
) -> Result<Vec<RemoteCollaborator>> {
    let mut collaborators = Vec::new();
    let mut cursor: Option<PageCursor> = None;

    loop {
        let page = access.list_collaborators(repo, cursor.as_ref())?;
        collaborators.extend(page.items);
        match page.next {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }

    Ok(collaborators)
}

/// A call received by [`MockBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListCollaborators { cursor: Option<String> },
    ListInvitations,
    Upsert {
        identity: String,
        permission: PermissionLevel,
    },
    RevokeCollaborator { identity: String },
    DeleteInvitation { id: InvitationId },
}

impl Call {
    /// The kind of this call, for failure injection.
    #[must_use]
    pub fn kind(&self) -> CallKind {
        match self {
            Self::ListCollaborators { .. } => CallKind::ListCollaborators,
            Self::ListInvitations => CallKind::ListInvitations,
            Self::Upsert { .. } => CallKind::Upsert,
            Self::RevokeCollaborator { .. } => CallKind::RevokeCollaborator,
            Self::DeleteInvitation { .. } => CallKind::DeleteInvitation,
        }
    }

    /// Whether this call changes remote state.
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::ListCollaborators { .. } | Self::ListInvitations)
    }
}

/// Discriminant of [`Call`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    ListCollaborators,
    ListInvitations,
    Upsert,
    RevokeCollaborator,
    DeleteInvitation,
}

#[derive(Debug)]
struct MockState {
    collaborators: Vec<RemoteCollaborator>,
    invitations: Vec<PendingInvitation>,
    calls: Vec<Call>,
    failures: HashMap<CallKind, u16>,
    page_size: Option<usize>,
    next_invitation_id: u64,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            collaborators: Vec::new(),
            invitations: Vec::new(),
            calls: Vec::new(),
            failures: HashMap::new(),
            page_size: None,
            next_invitation_id: 1000,
        }
    }
}

/// In-memory backend for testing without network access.
///
/// Clones share state, so a test can hand one clone to the engine and inspect
/// the other afterwards. Every attempted call is recorded, including calls
/// that were made to fail.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    /// Create a new empty mock backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve collaborators in pages of `size` entries.
    #[must_use]
    pub fn with_page_size(self, size: usize) -> Self {
        self.state().page_size = Some(size.max(1));
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add an existing collaborator.
    pub fn add_collaborator(&self, identity: &str, permission: PermissionLevel) {
        self.state()
            .collaborators
            .push(RemoteCollaborator::new(identity, permission));
    }

    /// Add a pending invitation.
    pub fn add_invitation(&self, id: u64, invitee: Option<&str>, permission: PermissionLevel) {
        self.state()
            .invitations
            .push(PendingInvitation::new(id, invitee, permission));
    }

    /// Make every call of `kind` fail with the given HTTP status.
    pub fn fail_on(&self, kind: CallKind, status: u16) {
        self.state().failures.insert(kind, status);
    }

    /// Stop failing calls of `kind`.
    pub fn clear_failure(&self, kind: CallKind) {
        self.state().failures.remove(&kind);
    }

    /// Current collaborators.
    pub fn collaborators(&self) -> Vec<RemoteCollaborator> {
        self.state().collaborators.clone()
    }

    /// Current pending invitations.
    pub fn invitations(&self) -> Vec<PendingInvitation> {
        self.state().invitations.clone()
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Only the calls that changed (or tried to change) remote state.
    pub fn mutations(&self) -> Vec<Call> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    /// Forget recorded calls, keeping remote state.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Accept a pending invitation, turning it into a collaborator.
    pub fn accept_invitation(&self, id: InvitationId) -> bool {
        let mut state = self.state();
        let Some(pos) = state.invitations.iter().position(|i| i.id == id) else {
            return false;
        };
        let invitation = state.invitations.remove(pos);
        match invitation.invitee {
            Some(login) => {
                state
                    .collaborators
                    .push(RemoteCollaborator::new(login, invitation.permission));
                true
            }
            None => false,
        }
    }

    /// Record a call and return the injected failure for it, if any.
    fn record(state: &mut MockState, call: Call) -> Result<()> {
        let kind = call.kind();
        state.calls.push(call);
        match state.failures.get(&kind) {
            Some(&status) => Err(Error::http(format!("HTTP {}", status), Some(status))),
            None => Ok(()),
        }
    }
}

impl RepositoryAccess for MockBackend {
    fn list_collaborators(
        &self,
        _repo: &RepoRef,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<RemoteCollaborator>> {
        let mut state = self.state();
        Self::record(
            &mut state,
            Call::ListCollaborators {
                cursor: cursor.map(|c| c.0.clone()),
            },
        )?;

        let start = match cursor {
            Some(c) => c
                .0
                .parse::<usize>()
                .map_err(|_| Error::InvalidResponse(format!("bad mock cursor: {}", c.0)))?,
            None => 0,
        };
        let total = state.collaborators.len();
        let Some(size) = state.page_size else {
            return Ok(Page::last(state.collaborators[start.min(total)..].to_vec()));
        };
        let end = (start + size).min(total);
        let items = state.collaborators[start.min(total)..end].to_vec();
        let next = (end < total).then(|| PageCursor(end.to_string()));

        Ok(Page { items, next })
    }

    fn list_invitations(&self, _repo: &RepoRef) -> Result<Vec<PendingInvitation>> {
        let mut state = self.state();
        Self::record(&mut state, Call::ListInvitations)?;
        Ok(state.invitations.clone())
    }

    fn upsert_collaborator(
        &self,
        _repo: &RepoRef,
        identity: &str,
        permission: PermissionLevel,
    ) -> Result<UpsertOutcome> {
        let mut state = self.state();
        Self::record(
            &mut state,
            Call::Upsert {
                identity: identity.to_string(),
                permission,
            },
        )?;

        if let Some(existing) = state
            .collaborators
            .iter_mut()
            .find(|c| c.identity.eq_ignore_ascii_case(identity))
        {
            existing.permission = permission;
            return Ok(UpsertOutcome::Updated);
        }

        state.invitations.retain(|i| {
            !i.invitee
                .as_deref()
                .is_some_and(|login| login.eq_ignore_ascii_case(identity))
        });
        let id = state.next_invitation_id;
        state.next_invitation_id += 1;
        state
            .invitations
            .push(PendingInvitation::new(id, Some(identity), permission));

        Ok(UpsertOutcome::Invited)
    }

    fn revoke_collaborator(&self, _repo: &RepoRef, identity: &str) -> Result<()> {
        let mut state = self.state();
        Self::record(
            &mut state,
            Call::RevokeCollaborator {
                identity: identity.to_string(),
            },
        )?;
        state
            .collaborators
            .retain(|c| !c.identity.eq_ignore_ascii_case(identity));
        Ok(())
    }

    fn delete_invitation(&self, _repo: &RepoRef, id: InvitationId) -> Result<()> {
        let mut state = self.state();
        Self::record(&mut state, Call::DeleteInvitation { id })?;
        let before = state.invitations.len();
        state.invitations.retain(|i| i.id != id);
        if state.invitations.len() == before {
            return Err(Error::http("HTTP 404", Some(404)));
        }
        Ok(())
    }
}
