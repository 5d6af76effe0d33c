//! keyledsd command line
//!
//! Device queries and settings, and the per-key LED animation daemon.

use anyhow::Result;
use clap::Parser;
use tracing::debug;

// CLI definitions
mod cli;
use cli::{Cli, Commands};

// Command handlers
mod commands;
use commands::CommandContext;

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let ctx = CommandContext::load(cli.config.as_deref(), cli.device)?;
    debug!("{} effects configured", ctx.config.effects.len());

    match cli.command {
        // === Query Commands ===
        None | Some(Commands::List) => commands::query::list()?,
        Some(Commands::Info { json }) => commands::query::info(&ctx, json)?,
        Some(Commands::GetLeds { keys, json }) => commands::query::get_leds(&ctx, &keys, json)?,

        // === Set Commands ===
        Some(Commands::SetLeds { keys, blocks }) => {
            commands::set::set_leds(&ctx, &keys, &blocks)?;
        }
        Some(Commands::Gamemode { keys }) => commands::set::gamemode(&ctx, &keys)?,
        Some(Commands::Gkeys { state }) => commands::set::gkeys(&ctx, state.enabled())?,
        Some(Commands::ReportRate { ms }) => commands::set::report_rate(&ctx, ms)?,

        // === Daemon ===
        Some(Commands::Run) => commands::daemon::run(&ctx)?,
    }

    Ok(())
}
