mod cache;
mod cli;
mod command_handlers;
mod config;
mod error;
mod github;
mod installer;
mod locator;
mod platform;
mod target;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::Cli;

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();
    command_handlers::dispatch::dispatch(cli.command, cli.dir)?;
    Ok(())
}
