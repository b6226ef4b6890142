mod cli;
mod commands;
mod config;
mod engine;
mod progress;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::process::ExitCode;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
    };

    match run(&ctx, cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(ctx: &Context, command: Command) -> Result<()> {
    match command {
        Command::Sync(args) => commands::sync::run(ctx, args),
        Command::Diff(args) => commands::sync::diff(ctx, args),
        Command::Validate(args) => commands::validate::run(ctx, args),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "collabsync", &mut io::stdout());
            Ok(())
        }
    }
}

/// Print the error chain, plus advice when a remote call caused it.
fn report_error(e: &anyhow::Error) {
    ui::error(&format!("{e:#}"));

    let remote = e
        .chain()
        .find_map(|cause| cause.downcast_ref::<repoaccess::Error>());
    if let Some(remote) = remote {
        let category = remote.category();
        ui::hint(&format!("{}: {}", category.description(), category.advice()));
    }

    if let Some(engine::SyncError::InvitationReplace { identity, .. }) =
        e.downcast_ref::<engine::SyncError>()
    {
        ui::hint(&format!("Re-run sync to invite {identity} again"));
    }
}
