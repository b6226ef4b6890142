//! `validate` command: parse the roster without touching the remote.

use anyhow::Result;
use colored::Colorize;
use roster::Roster;
use serde::Serialize;

use crate::Context;
use crate::cli::ValidateArgs;
use crate::config::{load_roster, roster_path};
use crate::engine;
use crate::ui;

#[derive(Serialize)]
struct Report<'a> {
    shape: roster::Shape,
    collaborators: &'a [roster::DesiredCollaborator],
    warnings: Vec<String>,
}

impl<'a> From<&'a Roster> for Report<'a> {
    fn from(roster: &'a Roster) -> Self {
        Self {
            shape: roster.shape,
            collaborators: &roster.collaborators,
            warnings: roster.warnings.iter().map(ToString::to_string).collect(),
        }
    }
}

pub fn run(ctx: &Context, args: ValidateArgs) -> Result<()> {
    let roster = load_roster(&args.roster.file)?;
    engine::validate(&roster.collaborators)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&Report::from(&roster))?);
        return Ok(());
    }
    if ctx.quiet {
        return Ok(());
    }

    ui::header(&roster_path(&args.roster.file).display().to_string());
    ui::kv("Shape", &roster.shape.to_string());
    ui::kv("Collaborators", &roster.len().to_string());

    if !roster.is_empty() {
        ui::section("Declared access");
        for entry in &roster.collaborators {
            println!(
                "  {:<30} {}",
                entry.identity,
                entry.permission.to_string().cyan()
            );
        }
    }

    if !roster.warnings.is_empty() {
        ui::section("Warnings");
        for warning in &roster.warnings {
            ui::warn(&warning.to_string());
        }
    }

    println!();
    if roster.is_empty() {
        ui::warn("Roster is empty: sync would remove every collaborator and invitation");
    } else {
        ui::success("Roster is valid");
    }
    Ok(())
}
