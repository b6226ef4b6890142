//! `sync` and `diff` commands
//!
//! Both load the roster, observe the repository and compute a plan. `diff`
//! stops there; `sync` confirms and applies it.

use anyhow::{Context as AnyhowContext, Result};
use colored::Colorize;
use roster::Roster;

use crate::Context;
use crate::cli::{DiffArgs, SyncArgs};
use crate::config::{RemoteSettings, load_roster};
use crate::engine::{self, ExecuteOptions, ReconcilePlan, Reconciler};
use crate::progress;
use crate::ui;

pub fn run(ctx: &Context, args: SyncArgs) -> Result<()> {
    let roster = load_roster(&args.roster.file)?;
    let settings = RemoteSettings::from_args(&args.remote)?;
    let backend = settings.backend();
    let reconciler = Reconciler::new(&backend, settings.repo.clone());

    report_warnings(ctx, &roster);
    let plan = observe_and_plan(ctx, &reconciler, &roster)?;

    if !ctx.quiet {
        engine::display_plan(&plan, reconciler.repo());
    }

    if !plan.has_changes() {
        return Ok(());
    }

    if args.dry_run {
        if !ctx.quiet {
            println!();
            println!("  {} Dry run - no changes made", "ℹ".blue());
        }
        return Ok(());
    }

    if !args.yes && console::Term::stdout().is_term() && !confirm_proceed()? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(());
    }

    let opts = ExecuteOptions {
        jobs: args.jobs.max(1),
        quiet: ctx.quiet,
    };
    let summary = reconciler
        .apply(&plan, &opts)
        .with_context(|| format!("Failed to synchronize {}", reconciler.repo()))?;

    if !ctx.quiet {
        engine::executor::print_summary(&summary);
    }
    Ok(())
}

pub fn diff(ctx: &Context, args: DiffArgs) -> Result<()> {
    let roster = load_roster(&args.roster.file)?;
    let settings = RemoteSettings::from_args(&args.remote)?;
    let backend = settings.backend();
    let reconciler = Reconciler::new(&backend, settings.repo.clone());

    if !args.json {
        report_warnings(ctx, &roster);
    }
    let plan = observe_and_plan(ctx, &reconciler, &roster)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        engine::display_plan(&plan, reconciler.repo());
    }
    Ok(())
}

fn observe_and_plan(
    ctx: &Context,
    reconciler: &Reconciler<'_>,
    roster: &Roster,
) -> Result<ReconcilePlan> {
    let pb = progress::spinner(
        &format!("Reading access for {}...", reconciler.repo()),
        ctx.quiet,
    );
    let plan = reconciler.plan(&roster.collaborators);
    pb.finish_and_clear();
    plan.with_context(|| format!("Failed to plan changes for {}", reconciler.repo()))
}

fn report_warnings(ctx: &Context, roster: &Roster) {
    if ctx.quiet {
        return;
    }
    for warning in &roster.warnings {
        ui::warn(&warning.to_string());
    }
}

/// Confirm with user
fn confirm_proceed() -> Result<bool> {
    use dialoguer::Confirm;

    let confirmed = Confirm::new()
        .with_prompt("Apply these changes?")
        .default(false)
        .interact()
        .context("Failed to read confirmation")?;

    Ok(confirmed)
}
