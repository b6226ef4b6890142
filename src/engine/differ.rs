//! Plan computation and display

use colored::Colorize;
use repoaccess::{PendingInvitation, PermissionLevel, RemoteCollaborator, RepoRef};
use roster::{DesiredCollaborator, canonical};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use super::planner::{Action, ReconcilePlan};

/// Remote access state observed at the start of a pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    pub collaborators: Vec<RemoteCollaborator>,
    pub invitations: Vec<PendingInvitation>,
}

/// Compute the actions that bring `snapshot` to `desired`.
///
/// Identities compare case-insensitively. Repeated desired identities keep
/// their first position and take the last permission.
pub fn compute_plan(desired: &[DesiredCollaborator], snapshot: &Snapshot) -> ReconcilePlan {
    let mut order: Vec<(String, &str)> = Vec::with_capacity(desired.len());
    let mut wanted: HashMap<String, PermissionLevel> = HashMap::with_capacity(desired.len());
    for entry in desired {
        let key = canonical(&entry.identity);
        if wanted.insert(key.clone(), entry.permission).is_none() {
            order.push((key, entry.identity.trim()));
        }
    }

    let mut collaborators: HashMap<String, &RemoteCollaborator> = HashMap::new();
    for c in &snapshot.collaborators {
        collaborators.entry(canonical(&c.identity)).or_insert(c);
    }

    let mut invitations: HashMap<String, &PendingInvitation> = HashMap::new();
    for inv in &snapshot.invitations {
        if let Some(invitee) = &inv.invitee {
            invitations.entry(canonical(invitee)).or_insert(inv);
        }
    }

    let mut plan = ReconcilePlan::default();

    for (key, identity) in order {
        let permission = wanted[&key];
        let identity = identity.to_string();

        let action = if let Some(current) = collaborators.get(&key) {
            if current.permission == permission {
                Action::Keep {
                    identity,
                    permission,
                    pending: false,
                }
            } else {
                Action::Update {
                    identity,
                    from: current.permission,
                    to: permission,
                }
            }
        } else if let Some(invitation) = invitations.get(&key) {
            if invitation.permission == permission {
                Action::Keep {
                    identity,
                    permission,
                    pending: true,
                }
            } else {
                Action::ReplaceInvitation {
                    identity,
                    invitation: invitation.id,
                    from: invitation.permission,
                    to: permission,
                }
            }
        } else {
            Action::Grant {
                identity,
                permission,
            }
        };
        plan.grants.push(action);
    }

    let mut revoked: HashSet<String> = HashSet::new();
    for c in &snapshot.collaborators {
        let key = canonical(&c.identity);
        if !wanted.contains_key(&key) && revoked.insert(key) {
            plan.revoke_collaborators.push(Action::RevokeCollaborator {
                identity: c.identity.clone(),
                permission: c.permission,
            });
        }
    }

    for inv in &snapshot.invitations {
        // Invitations whose invitee account is gone have no identity to compare.
        let Some(invitee) = &inv.invitee else {
            continue;
        };
        if !wanted.contains_key(&canonical(invitee)) {
            plan.revoke_invitations.push(Action::RevokeInvitation {
                identity: invitee.clone(),
                invitation: inv.id,
                permission: inv.permission,
            });
        }
    }

    plan
}

/// Display a plan in a user-friendly format
pub fn display_plan(plan: &ReconcilePlan, repo: &RepoRef) {
    if !plan.has_changes() {
        println!();
        println!("  {} {} is already in sync", "✓".green(), repo);
        return;
    }

    println!();
    println!(
        "┌─ {} ─────────────────────────────────────────┐",
        format!("Access Plan: {repo}").bold()
    );
    println!("│");

    let sections = [
        ("Grants and updates", &plan.grants),
        ("Collaborators to remove", &plan.revoke_collaborators),
        ("Invitations to cancel", &plan.revoke_invitations),
    ];

    for (title, actions) in sections {
        let changes: Vec<&Action> = actions.iter().filter(|a| a.is_change()).collect();
        if changes.is_empty() {
            continue;
        }
        println!("│ {}", title.bold());

        for action in changes {
            let (symbol, state_desc) = describe(action);
            println!(
                "│   {} {:<30} {}",
                symbol,
                action.identity(),
                state_desc.dimmed()
            );
        }
        println!("│");
    }

    let changes = plan.changes().count();
    println!("├─────────────────────────────────────────────────────┤");
    println!(
        "│ Summary: {} changes ({} calls, {} unchanged)",
        changes.to_string().bold(),
        plan.call_count().to_string().cyan(),
        plan.unchanged().to_string().green()
    );
    println!("└─────────────────────────────────────────────────────┘");
}

fn describe(action: &Action) -> (colored::ColoredString, String) {
    match action {
        Action::Keep { permission, .. } => ("=".dimmed(), permission.to_string()),
        Action::Grant { permission, .. } => ("+".green(), format!("(not invited) → {permission}")),
        Action::Update { from, to, .. } => ("~".yellow(), format!("{from} → {to}")),
        Action::ReplaceInvitation {
            invitation,
            from,
            to,
            ..
        } => (
            "~".yellow(),
            format!("{from} → {to} (re-invite, replaces #{invitation})"),
        ),
        Action::RevokeCollaborator { permission, .. } => {
            ("-".red(), format!("{permission} (will remove)"))
        }
        Action::RevokeInvitation {
            invitation,
            permission,
            ..
        } => (
            "-".red(),
            format!("{permission} (will cancel #{invitation})"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use repoaccess::InvitationId;

    fn desired(entries: &[(&str, PermissionLevel)]) -> Vec<DesiredCollaborator> {
        entries
            .iter()
            .map(|(id, p)| DesiredCollaborator::new(*id, *p))
            .collect()
    }

    #[test]
    fn test_empty_roster_revokes_everything() {
        let snapshot = Snapshot {
            collaborators: vec![RemoteCollaborator::new("alice", PermissionLevel::Push)],
            invitations: vec![
                PendingInvitation::new(1, Some("bob"), PermissionLevel::Pull),
                PendingInvitation::new(2, None, PermissionLevel::Admin),
            ],
        };
        let plan = compute_plan(&[], &snapshot);

        assert!(plan.grants.is_empty());
        assert_eq!(plan.revoke_collaborators.len(), 1);
        assert_eq!(
            plan.revoke_invitations,
            vec![Action::RevokeInvitation {
                identity: "bob".to_string(),
                invitation: InvitationId(1),
                permission: PermissionLevel::Pull,
            }]
        );
    }

    #[test]
    fn test_case_insensitive_match_keeps() {
        let snapshot = Snapshot {
            collaborators: vec![RemoteCollaborator::new("Alice", PermissionLevel::Push)],
            invitations: vec![],
        };
        let plan = compute_plan(&desired(&[("ALICE", PermissionLevel::Push)]), &snapshot);

        assert!(!plan.has_changes());
        assert_eq!(plan.unchanged(), 1);
    }

    #[test]
    fn test_classifies_each_desired_entry() {
        let snapshot = Snapshot {
            collaborators: vec![
                RemoteCollaborator::new("alice", PermissionLevel::Push),
                RemoteCollaborator::new("carol", PermissionLevel::Admin),
            ],
            invitations: vec![
                PendingInvitation::new(7, Some("bob"), PermissionLevel::Push),
                PendingInvitation::new(8, Some("dave"), PermissionLevel::Triage),
            ],
        };
        let plan = compute_plan(
            &desired(&[
                ("alice", PermissionLevel::Maintain),
                ("bob", PermissionLevel::Admin),
                ("dave", PermissionLevel::Triage),
                ("erin", PermissionLevel::Pull),
            ]),
            &snapshot,
        );

        assert_eq!(
            plan.grants,
            vec![
                Action::Update {
                    identity: "alice".to_string(),
                    from: PermissionLevel::Push,
                    to: PermissionLevel::Maintain,
                },
                Action::ReplaceInvitation {
                    identity: "bob".to_string(),
                    invitation: InvitationId(7),
                    from: PermissionLevel::Push,
                    to: PermissionLevel::Admin,
                },
                Action::Keep {
                    identity: "dave".to_string(),
                    permission: PermissionLevel::Triage,
                    pending: true,
                },
                Action::Grant {
                    identity: "erin".to_string(),
                    permission: PermissionLevel::Pull,
                },
            ]
        );
        assert_eq!(
            plan.revoke_collaborators,
            vec![Action::RevokeCollaborator {
                identity: "carol".to_string(),
                permission: PermissionLevel::Admin,
            }]
        );
        assert!(plan.revoke_invitations.is_empty());
    }

    #[test]
    fn test_duplicate_desired_last_wins() {
        let plan = compute_plan(
            &desired(&[
                ("alice", PermissionLevel::Pull),
                ("bob", PermissionLevel::Push),
                ("Alice", PermissionLevel::Admin),
            ]),
            &Snapshot::default(),
        );

        let identities: Vec<_> = plan.grants.iter().map(Action::identity).collect();
        assert_eq!(identities, vec!["alice", "bob"]);
        assert_eq!(
            plan.grants[0],
            Action::Grant {
                identity: "alice".to_string(),
                permission: PermissionLevel::Admin,
            }
        );
    }

    #[test]
    fn test_collaborator_wins_over_stale_invitation() {
        let snapshot = Snapshot {
            collaborators: vec![RemoteCollaborator::new("alice", PermissionLevel::Push)],
            invitations: vec![PendingInvitation::new(4, Some("alice"), PermissionLevel::Pull)],
        };
        let plan = compute_plan(&desired(&[("alice", PermissionLevel::Push)]), &snapshot);

        assert!(!plan.has_changes());
    }
}
