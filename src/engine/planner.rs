//! Reconciliation plan: the ordered actions one pass will take.

use repoaccess::{InvitationId, PermissionLevel};
use serde::Serialize;
use std::fmt;

/// One step of a reconciliation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Desired principal already holds the desired permission, either as a
    /// collaborator or through a pending invitation.
    Keep {
        identity: String,
        permission: PermissionLevel,
        pending: bool,
    },
    /// Principal has neither access nor an invitation.
    Grant {
        identity: String,
        permission: PermissionLevel,
    },
    /// Collaborator holds a different permission.
    Update {
        identity: String,
        from: PermissionLevel,
        to: PermissionLevel,
    },
    /// Pending invitation offers a different permission. Invitations cannot
    /// be edited, so this is a delete followed by a fresh invite.
    ReplaceInvitation {
        identity: String,
        invitation: InvitationId,
        from: PermissionLevel,
        to: PermissionLevel,
    },
    /// Collaborator is not in the roster.
    RevokeCollaborator {
        identity: String,
        permission: PermissionLevel,
    },
    /// Invitation's invitee is not in the roster.
    RevokeInvitation {
        identity: String,
        invitation: InvitationId,
        permission: PermissionLevel,
    },
}

impl Action {
    pub fn identity(&self) -> &str {
        match self {
            Self::Keep { identity, .. }
            | Self::Grant { identity, .. }
            | Self::Update { identity, .. }
            | Self::ReplaceInvitation { identity, .. }
            | Self::RevokeCollaborator { identity, .. }
            | Self::RevokeInvitation { identity, .. } => identity,
        }
    }

    /// Whether this action touches the remote.
    pub fn is_change(&self) -> bool {
        !matches!(self, Self::Keep { .. })
    }

    /// Number of mutating remote calls this action issues.
    pub fn call_count(&self) -> usize {
        match self {
            Self::Keep { .. } => 0,
            Self::ReplaceInvitation { .. } => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep {
                identity,
                permission,
                pending,
            } => {
                let via = if *pending { "invitation" } else { "collaborator" };
                write!(f, "{identity} already correct ({permission}, {via})")
            }
            Self::Grant {
                identity,
                permission,
            } => write!(f, "grant {identity} {permission}"),
            Self::Update { identity, from, to } => {
                write!(f, "update {identity} {from} -> {to}")
            }
            Self::ReplaceInvitation {
                identity,
                invitation,
                from,
                to,
            } => write!(
                f,
                "re-invite {identity} {from} -> {to} (replaces invitation {invitation})"
            ),
            Self::RevokeCollaborator {
                identity,
                permission,
            } => write!(f, "remove collaborator {identity} ({permission})"),
            Self::RevokeInvitation {
                identity,
                invitation,
                permission,
            } => write!(
                f,
                "cancel invitation {invitation} for {identity} ({permission})"
            ),
        }
    }
}

/// The three phases of a pass, each in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    /// Add-or-update pass, in roster order. Includes `Keep` entries.
    pub grants: Vec<Action>,
    /// Collaborators to remove, in observed order.
    pub revoke_collaborators: Vec<Action>,
    /// Invitations to cancel, in observed order.
    pub revoke_invitations: Vec<Action>,
}

impl ReconcilePlan {
    /// Every action in application order.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.grants
            .iter()
            .chain(&self.revoke_collaborators)
            .chain(&self.revoke_invitations)
    }

    /// Actions that touch the remote, in application order.
    pub fn changes(&self) -> impl Iterator<Item = &Action> {
        self.actions().filter(|a| a.is_change())
    }

    pub fn has_changes(&self) -> bool {
        self.changes().next().is_some()
    }

    /// Total mutating remote calls applying this plan will issue.
    pub fn call_count(&self) -> usize {
        self.actions().map(Action::call_count).sum()
    }

    /// Desired principals that need no change.
    pub fn unchanged(&self) -> usize {
        self.grants.iter().filter(|a| !a.is_change()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_plan() -> ReconcilePlan {
        ReconcilePlan {
            grants: vec![
                Action::Keep {
                    identity: "alice".to_string(),
                    permission: PermissionLevel::Push,
                    pending: false,
                },
                Action::ReplaceInvitation {
                    identity: "bob".to_string(),
                    invitation: InvitationId(3),
                    from: PermissionLevel::Push,
                    to: PermissionLevel::Admin,
                },
            ],
            revoke_collaborators: vec![Action::RevokeCollaborator {
                identity: "carol".to_string(),
                permission: PermissionLevel::Admin,
            }],
            revoke_invitations: vec![],
        }
    }

    #[test]
    fn test_plan_counts() {
        let plan = sample_plan();
        assert!(plan.has_changes());
        assert_eq!(plan.changes().count(), 2);
        assert_eq!(plan.call_count(), 3);
        assert_eq!(plan.unchanged(), 1);
    }

    #[test]
    fn test_plan_order() {
        let plan = sample_plan();
        let identities: Vec<_> = plan.actions().map(Action::identity).collect();
        assert_eq!(identities, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_empty_plan_has_no_changes() {
        let plan = ReconcilePlan::default();
        assert!(!plan.has_changes());
        assert_eq!(plan.call_count(), 0);
    }

    #[test]
    fn test_action_display() {
        let action = Action::Update {
            identity: "dave".to_string(),
            from: PermissionLevel::Pull,
            to: PermissionLevel::Maintain,
        };
        assert_eq!(action.to_string(), "update dave pull -> maintain");
    }

    #[test]
    fn test_action_serializes_tagged() {
        let action = Action::Grant {
            identity: "erin".to_string(),
            permission: PermissionLevel::Triage,
        };
        assert_eq!(
            serde_json::to_string(&action).unwrap(),
            r#"{"action":"grant","identity":"erin","permission":"triage"}"#
        );
    }
}
