//! nfcc - Command-line driver for the NFC controller power and TDA core
//!
//! Runs the coordination core against the simulated controller described in
//! the configuration file and exercises the exposed power and TDA surface.

mod commands;
mod config;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use nfcc_power::sim::simulated_service;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::commands::{ActivityArg, LevelArg, ScreenOffArg};
use crate::output::{OutputContext, OutputFormat};

#[derive(Parser)]
#[command(name = "nfcc")]
#[command(author, version, about = "NFC controller power and TDA driver")]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "NFCC_CONFIG")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Minimal output (for scripting)
    #[arg(short, long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show power level, device state, screen-off policy and activity
    Status,

    /// Apply power levels in order
    Level {
        /// Levels to apply
        #[arg(value_enum, required = true)]
        levels: Vec<LevelArg>,

        /// Screen-off power state to set first
        #[arg(long, value_enum)]
        screen_off: Option<ScreenOffArg>,
    },

    /// Set and clear power activity bits
    Mode {
        /// Activities to mark active
        #[arg(long, value_enum)]
        on: Vec<ActivityArg>,

        /// Activities to clear (after --on)
        #[arg(long, value_enum)]
        off: Vec<ActivityArg>,
    },

    /// Apply dynamic power configuration requests
    DynConfig {
        /// Length-prefixed requests as hex, e.g. "0102"
        #[arg(required = true)]
        requests: Vec<String>,
    },

    /// TDA slot operations
    Tda {
        #[command(subcommand)]
        command: TdaCommands,
    },
}

#[derive(Subcommand)]
enum TdaCommands {
    /// List attached slots
    Discover,

    /// Open a slot, send commands and close it
    Exchange {
        /// Slot ID
        slot: u8,

        /// Commands as hex
        commands: Vec<String>,

        /// Open and close in standby mode
        #[arg(long)]
        standby: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("nfcc_power=debug,info")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();

    let config = config::load(cli.config.as_deref())?;
    tracing::debug!(?config, "Loaded configuration");
    let ctx = OutputContext::new(cli.output, cli.no_color, cli.quiet);
    let (service, controller) = simulated_service(&config);

    let result = match &cli.command {
        Commands::Status => commands::status(&service, &ctx),

        Commands::Level { levels, screen_off } => {
            commands::level(&service, levels, *screen_off, &ctx)
        }

        Commands::Mode { on, off } => commands::mode(&service, on, off, &ctx),

        Commands::DynConfig { requests } => {
            commands::dyn_config(&service, &controller, requests, &ctx)
        }

        Commands::Tda { command } => match command {
            TdaCommands::Discover => commands::discover(&service, &ctx),
            TdaCommands::Exchange {
                slot,
                commands: apdus,
                standby,
            } => commands::exchange(&service, *slot, *standby, apdus, &ctx),
        },
    };

    controller.flush();
    if let Err(e) = &result {
        ctx.error(&format!("Error: {:#}", e));
        std::process::exit(1);
    }
    ctx.success("Done");
    Ok(())
}
