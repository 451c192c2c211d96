mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands, RunOverrides};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "drone_swarm=debug"
    } else {
        "drone_swarm=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Run {
            config,
            strategy,
            drones,
            turns,
            seed,
            output,
            no_export,
            quiet,
        } => {
            let overrides = RunOverrides {
                strategy,
                drones,
                turns,
                seed,
                output,
            };
            cli::run_simulation(config.as_deref(), &overrides, !no_export, quiet)?;
        }
        Commands::Compare {
            config,
            seeds,
            turns,
        } => {
            cli::compare(config.as_deref(), seeds, turns)?;
        }
        Commands::Config { output } => {
            cli::write_default_config(output.as_deref())?;
        }
    }

    Ok(())
}
