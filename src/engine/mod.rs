//! Reconciliation engine for collabsync
//!
//! A pass runs in three stages:
//! 1. Observing - Read every collaborator page and every pending invitation
//! 2. Planning - Compare the roster against what was observed
//! 3. Executing - Grant and update first, then revoke
//!
//! Nothing is cached between passes. Running a pass twice against an
//! unchanged remote issues no mutating call the second time.

#![allow(dead_code)]

pub mod differ;
pub mod error;
pub mod executor;
pub mod planner;

use repoaccess::{RepoRef, RepositoryAccess, is_valid_login, list_all_collaborators};
use roster::DesiredCollaborator;

pub use differ::{Snapshot, compute_plan, display_plan};
pub use error::SyncError;
pub use executor::{ExecuteOptions, ExecuteSummary, execute};
pub use planner::{Action, ReconcilePlan};

/// Drives reconciliation of one repository through a [`RepositoryAccess`].
pub struct Reconciler<'a> {
    access: &'a dyn RepositoryAccess,
    repo: RepoRef,
}

impl<'a> Reconciler<'a> {
    pub fn new(access: &'a dyn RepositoryAccess, repo: RepoRef) -> Self {
        Self { access, repo }
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    /// Read the current collaborators and invitations.
    pub fn observe(&self) -> Result<Snapshot, SyncError> {
        let collaborators = list_all_collaborators(self.access, &self.repo)?;
        let invitations = self.access.list_invitations(&self.repo)?;
        log::debug!(
            "Observed {} collaborators and {} invitations on {}",
            collaborators.len(),
            invitations.len(),
            self.repo
        );
        Ok(Snapshot {
            collaborators,
            invitations,
        })
    }

    /// Validate the roster, observe the remote and compute a plan.
    ///
    /// Issues only read calls.
    pub fn plan(&self, desired: &[DesiredCollaborator]) -> Result<ReconcilePlan, SyncError> {
        validate(desired)?;
        let snapshot = self.observe()?;
        Ok(compute_plan(desired, &snapshot))
    }

    /// Apply a previously computed plan.
    pub fn apply(
        &self,
        plan: &ReconcilePlan,
        opts: &ExecuteOptions,
    ) -> Result<ExecuteSummary, SyncError> {
        execute(self.access, &self.repo, plan, opts)
    }

    /// Make the remote match `desired` using default options.
    pub fn synchronize(&self, desired: &[DesiredCollaborator]) -> Result<ExecuteSummary, SyncError> {
        self.synchronize_with(desired, &ExecuteOptions::default())
    }

    pub fn synchronize_with(
        &self,
        desired: &[DesiredCollaborator],
        opts: &ExecuteOptions,
    ) -> Result<ExecuteSummary, SyncError> {
        let plan = self.plan(desired)?;
        if !plan.has_changes() {
            log::info!("{} is already in sync", self.repo);
        }
        self.apply(&plan, opts)
    }
}

/// Reject malformed entries before any remote call is made.
pub fn validate(desired: &[DesiredCollaborator]) -> Result<(), SyncError> {
    for entry in desired {
        let identity = entry.identity.trim();
        let reason = if identity.is_empty() {
            Some("identity is empty")
        } else if !is_valid_login(identity) {
            Some("not a valid login (letters, digits and single hyphens, at most 39 characters)")
        } else {
            None
        };

        if let Some(reason) = reason {
            return Err(SyncError::Validation {
                entry: serde_json::to_string(entry).unwrap_or_else(|_| format!("{entry:?}")),
                reason: reason.to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use repoaccess::backend::{Call, CallKind};
    use repoaccess::{InvitationId, MockBackend, PermissionLevel};

    fn repo() -> RepoRef {
        RepoRef::new("octo", "demo")
    }

    fn desired(entries: &[(&str, PermissionLevel)]) -> Vec<DesiredCollaborator> {
        entries
            .iter()
            .map(|(id, p)| DesiredCollaborator::new(*id, *p))
            .collect()
    }

    fn permissions(mock: &MockBackend) -> Vec<(String, PermissionLevel)> {
        let mut all: Vec<_> = mock
            .collaborators()
            .into_iter()
            .map(|c| (c.identity.to_lowercase(), c.permission))
            .chain(
                mock.invitations()
                    .into_iter()
                    .filter_map(|i| i.invitee.map(|who| (who.to_lowercase(), i.permission))),
            )
            .collect();
        all.sort();
        all
    }

    #[test]
    fn test_mixed_scenario() {
        let mock = MockBackend::new();
        mock.add_collaborator("alice", PermissionLevel::Push);
        mock.add_collaborator("carol", PermissionLevel::Admin);
        mock.add_invitation(1, Some("bob"), PermissionLevel::Pull);
        mock.add_invitation(2, Some("dave"), PermissionLevel::Push);

        let reconciler = Reconciler::new(&mock, repo());
        let summary = reconciler
            .synchronize(&desired(&[
                ("alice", PermissionLevel::Push),
                ("bob", PermissionLevel::Admin),
            ]))
            .unwrap();

        assert_eq!(
            mock.mutations(),
            vec![
                Call::DeleteInvitation { id: InvitationId(1) },
                Call::Upsert {
                    identity: "bob".to_string(),
                    permission: PermissionLevel::Admin,
                },
                Call::RevokeCollaborator {
                    identity: "carol".to_string(),
                },
                Call::DeleteInvitation { id: InvitationId(2) },
            ]
        );
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.reinvited, 1);
        assert_eq!(
            permissions(&mock),
            vec![
                ("alice".to_string(), PermissionLevel::Push),
                ("bob".to_string(), PermissionLevel::Admin),
            ]
        );
    }

    #[test]
    fn test_second_pass_is_idempotent() {
        let mock = MockBackend::new();
        mock.add_collaborator("alice", PermissionLevel::Pull);
        mock.add_collaborator("zed", PermissionLevel::Admin);
        mock.add_invitation(3, Some("bob"), PermissionLevel::Push);
        let roster = desired(&[
            ("alice", PermissionLevel::Maintain),
            ("bob", PermissionLevel::Triage),
            ("carol", PermissionLevel::Push),
        ]);

        let reconciler = Reconciler::new(&mock, repo());
        reconciler.synchronize(&roster).unwrap();
        mock.clear_calls();

        let summary = reconciler.synchronize(&roster).unwrap();

        assert!(mock.mutations().is_empty());
        assert_eq!(summary.total_changes(), 0);
        assert_eq!(summary.unchanged, 3);
    }

    #[test]
    fn test_identity_case_is_ignored() {
        let mock = MockBackend::new();
        mock.add_collaborator("Alice", PermissionLevel::Push);
        mock.add_invitation(4, Some("BOB"), PermissionLevel::Pull);

        Reconciler::new(&mock, repo())
            .synchronize(&desired(&[
                ("alice", PermissionLevel::Push),
                ("Bob", PermissionLevel::Pull),
            ]))
            .unwrap();

        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_default_permission_is_push() {
        let mock = MockBackend::new();
        let entry: DesiredCollaborator = serde_json::from_str(r#"{"identity": "erin"}"#).unwrap();

        Reconciler::new(&mock, repo()).synchronize(&[entry]).unwrap();

        assert_eq!(
            mock.mutations(),
            vec![Call::Upsert {
                identity: "erin".to_string(),
                permission: PermissionLevel::Push,
            }]
        );
    }

    #[test]
    fn test_empty_roster_removes_everyone() {
        let mock = MockBackend::new();
        mock.add_collaborator("alice", PermissionLevel::Push);
        mock.add_invitation(5, Some("bob"), PermissionLevel::Pull);

        let summary = Reconciler::new(&mock, repo()).synchronize(&[]).unwrap();

        assert_eq!(summary.revoked_collaborators, 1);
        assert_eq!(summary.revoked_invitations, 1);
        assert!(mock.collaborators().is_empty());
        assert!(mock.invitations().is_empty());
    }

    #[test]
    fn test_invitation_without_invitee_is_left_alone() {
        let mock = MockBackend::new();
        mock.add_invitation(6, None, PermissionLevel::Admin);

        Reconciler::new(&mock, repo()).synchronize(&[]).unwrap();

        assert!(mock.mutations().is_empty());
        assert_eq!(mock.invitations().len(), 1);
    }

    #[test]
    fn test_all_pages_are_observed() {
        let mock = MockBackend::new().with_page_size(2);
        for name in ["a1", "a2", "a3", "a4", "a5"] {
            mock.add_collaborator(name, PermissionLevel::Push);
        }

        let plan = Reconciler::new(&mock, repo())
            .plan(&desired(&[("a5", PermissionLevel::Push)]))
            .unwrap();

        let listed = mock
            .calls()
            .iter()
            .filter(|c| c.kind() == CallKind::ListCollaborators)
            .count();
        assert_eq!(listed, 3);
        assert_eq!(plan.unchanged(), 1);
        assert_eq!(plan.revoke_collaborators.len(), 4);
    }

    #[test]
    fn test_validation_happens_before_remote_calls() {
        let mock = MockBackend::new();
        mock.add_collaborator("alice", PermissionLevel::Push);

        let err = Reconciler::new(&mock, repo())
            .synchronize(&desired(&[
                ("alice", PermissionLevel::Push),
                ("  ", PermissionLevel::Admin),
            ]))
            .unwrap_err();

        assert!(matches!(err, SyncError::Validation { .. }));
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_observe_failure_aborts_without_mutations() {
        let mock = MockBackend::new();
        mock.add_collaborator("alice", PermissionLevel::Push);
        mock.fail_on(CallKind::ListInvitations, 500);

        let err = Reconciler::new(&mock, repo()).synchronize(&[]).unwrap_err();

        assert!(matches!(err, SyncError::RemoteAccess(_)));
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_failed_reinvite_is_reported_and_recovers_next_run() {
        let mock = MockBackend::new();
        mock.add_invitation(7, Some("bob"), PermissionLevel::Pull);
        mock.fail_on(CallKind::Upsert, 502);
        let roster = desired(&[("bob", PermissionLevel::Maintain)]);
        let reconciler = Reconciler::new(&mock, repo());

        let err = reconciler.synchronize(&roster).unwrap_err();
        assert!(matches!(err, SyncError::InvitationReplace { .. }));
        assert!(mock.invitations().is_empty());

        mock.clear_failure(CallKind::Upsert);
        reconciler.synchronize(&roster).unwrap();
        assert_eq!(
            permissions(&mock),
            vec![("bob".to_string(), PermissionLevel::Maintain)]
        );
    }

    #[test]
    fn test_accepted_invitation_stays_correct() {
        let mock = MockBackend::new();
        let roster = desired(&[("bob", PermissionLevel::Triage)]);
        let reconciler = Reconciler::new(&mock, repo());

        reconciler.synchronize(&roster).unwrap();
        let id = mock.invitations()[0].id;
        assert!(mock.accept_invitation(id));
        mock.clear_calls();

        reconciler.synchronize(&roster).unwrap();
        assert!(mock.mutations().is_empty());
    }

    #[test]
    fn test_parallel_jobs_reach_same_state() {
        let mock = MockBackend::new();
        mock.add_collaborator("old", PermissionLevel::Push);
        let roster: Vec<_> = (0..6)
            .map(|i| DesiredCollaborator::new(format!("user{i}"), PermissionLevel::Pull))
            .collect();
        let opts = ExecuteOptions {
            jobs: 3,
            quiet: true,
        };

        let summary = Reconciler::new(&mock, repo())
            .synchronize_with(&roster, &opts)
            .unwrap();

        assert_eq!(summary.granted, 6);
        assert_eq!(summary.revoked_collaborators, 1);
        assert_eq!(
            mock.mutations().last(),
            Some(&Call::RevokeCollaborator {
                identity: "old".to_string()
            })
        );
    }

    #[test]
    fn test_validate_rejects_slash() {
        let err = validate(&desired(&[("octo/alice", PermissionLevel::Push)])).unwrap_err();
        assert!(err.to_string().contains("octo/alice"));
    }

    #[test]
    fn test_validate_rejects_malformed_logins() {
        let too_long = "a".repeat(40);
        for identity in ["bob?x=1", "..", "-bob", "bo--b", "bób", too_long.as_str()] {
            let err = validate(&desired(&[(identity, PermissionLevel::Push)])).unwrap_err();
            assert!(
                matches!(err, SyncError::Validation { .. }),
                "{identity} should be rejected"
            );
        }
        validate(&desired(&[("Octo-Cat-42", PermissionLevel::Push)])).unwrap();
    }

    #[test]
    fn test_malformed_login_never_reaches_remote() {
        let mock = MockBackend::new();
        mock.add_invitation(8, Some("bob"), PermissionLevel::Push);

        let err = Reconciler::new(&mock, repo())
            .synchronize(&desired(&[("bob?x=1", PermissionLevel::Push)]))
            .unwrap_err();

        assert!(matches!(err, SyncError::Validation { .. }));
        assert!(mock.calls().is_empty());
        assert_eq!(mock.invitations().len(), 1);
    }
}
