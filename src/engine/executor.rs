//! Execution engine - applies a reconcile plan against the remote

use colored::Colorize;
use rayon::prelude::*;
use repoaccess::{RepoRef, RepositoryAccess, UpsertOutcome};

use super::error::SyncError;
use super::planner::{Action, ReconcilePlan};
use crate::progress;

/// Options for execution
#[derive(Debug, Clone)]
pub struct ExecuteOptions {
    /// Number of concurrent calls in the grant phase
    pub jobs: usize,
    /// Hide progress output
    pub quiet: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            jobs: 1,
            quiet: true,
        }
    }
}

/// Summary of execution results
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExecuteSummary {
    pub granted: usize,
    pub updated: usize,
    pub reinvited: usize,
    pub revoked_collaborators: usize,
    pub revoked_invitations: usize,
    pub unchanged: usize,
}

impl ExecuteSummary {
    pub fn total_changes(&self) -> usize {
        self.granted
            + self.updated
            + self.reinvited
            + self.revoked_collaborators
            + self.revoked_invitations
    }

    fn record(&mut self, action: &Action) {
        match action {
            Action::Keep { .. } => self.unchanged += 1,
            Action::Grant { .. } => self.granted += 1,
            Action::Update { .. } => self.updated += 1,
            Action::ReplaceInvitation { .. } => self.reinvited += 1,
            Action::RevokeCollaborator { .. } => self.revoked_collaborators += 1,
            Action::RevokeInvitation { .. } => self.revoked_invitations += 1,
        }
    }
}

/// Apply a plan phase by phase.
///
/// Grants finish before any revocation starts, and collaborator revocations
/// finish before invitation revocations. The first failure stops the pass.
/// With `jobs > 1` the grant phase runs concurrently; revocations are
/// always sequential.
pub fn execute(
    access: &dyn RepositoryAccess,
    repo: &RepoRef,
    plan: &ReconcilePlan,
    opts: &ExecuteOptions,
) -> Result<ExecuteSummary, SyncError> {
    let mut summary = ExecuteSummary::default();

    let pb = progress::bar(plan.changes().count() as u64, "Applying", opts.quiet);
    let step = |action: &Action| -> Result<(), SyncError> {
        apply_action(access, repo, action)?;
        if action.is_change() {
            pb.set_message(action.identity().to_string());
            pb.inc(1);
        }
        Ok(())
    };

    let result = (|| -> Result<(), SyncError> {
        if opts.jobs > 1 && plan.grants.len() > 1 {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(opts.jobs)
                .build()
            {
                Ok(pool) => pool.install(|| plan.grants.par_iter().try_for_each(step))?,
                Err(e) => {
                    log::warn!("Failed to create apply thread pool, running sequentially: {e}");
                    plan.grants.iter().try_for_each(step)?;
                }
            }
        } else {
            plan.grants.iter().try_for_each(step)?;
        }
        for action in &plan.grants {
            summary.record(action);
        }

        for action in &plan.revoke_collaborators {
            step(action)?;
            summary.record(action);
        }

        for action in &plan.revoke_invitations {
            step(action)?;
            summary.record(action);
        }

        Ok(())
    })();

    pb.finish_and_clear();
    result.map(|()| summary)
}

/// Issue the remote calls for one action.
pub fn apply_action(
    access: &dyn RepositoryAccess,
    repo: &RepoRef,
    action: &Action,
) -> Result<(), SyncError> {
    match action {
        Action::Keep { .. } => {}
        Action::Grant {
            identity,
            permission,
        } => {
            let outcome = access.upsert_collaborator(repo, identity, *permission)?;
            log::info!("{outcome} {identity} with {permission} on {repo}");
        }
        Action::Update { identity, from, to } => {
            let outcome = access.upsert_collaborator(repo, identity, *to)?;
            if outcome == UpsertOutcome::Invited {
                log::warn!("{identity} was expected to be a collaborator but was invited instead");
            }
            log::info!("Updated {identity} on {repo}: {from} -> {to}");
        }
        Action::ReplaceInvitation {
            identity,
            invitation,
            from,
            to,
        } => {
            access.delete_invitation(repo, *invitation)?;
            log::debug!("Deleted invitation {invitation} for {identity}");
            access
                .upsert_collaborator(repo, identity, *to)
                .map_err(|source| SyncError::InvitationReplace {
                    identity: identity.clone(),
                    invitation: *invitation,
                    source,
                })?;
            log::info!("Re-invited {identity} on {repo}: {from} -> {to}");
        }
        Action::RevokeCollaborator {
            identity,
            permission,
        } => {
            access.revoke_collaborator(repo, identity)?;
            log::info!("Removed collaborator {identity} ({permission}) from {repo}");
        }
        Action::RevokeInvitation {
            identity,
            invitation,
            ..
        } => {
            access.delete_invitation(repo, *invitation)?;
            log::info!("Cancelled invitation {invitation} for {identity} on {repo}");
        }
    }
    Ok(())
}

/// Print final summary
pub fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.total_changes() == 0 {
        println!("  {} Nothing to do", "✓".green().bold());
        return;
    }
    println!("  {} Access synchronized", "✓".green().bold());

    if summary.granted > 0 {
        println!("    • {} collaborators invited", summary.granted);
    }
    if summary.updated > 0 {
        println!("    • {} permissions updated", summary.updated);
    }
    if summary.reinvited > 0 {
        println!("    • {} invitations re-sent", summary.reinvited);
    }
    if summary.revoked_collaborators > 0 {
        println!(
            "    • {} collaborators {}",
            summary.revoked_collaborators,
            "removed".red()
        );
    }
    if summary.revoked_invitations > 0 {
        println!(
            "    • {} invitations {}",
            summary.revoked_invitations,
            "cancelled".red()
        );
    }
    if summary.unchanged > 0 {
        println!("    • {} already correct", summary.unchanged);
    }
}
