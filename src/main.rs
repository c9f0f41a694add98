//! Phonodex - batch music metadata enrichment.
//!
//! Looks up cover art, release years, and catalog numbers on Discogs,
//! reconciles them into file tags, and exports files into a folder layout
//! built from those tags.

pub mod cli;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod export;
pub mod metadata;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(EnvFilter::from_default_env().add_directive("phonodex=info".parse()?))
        .init();

    cli::run_command(&args)
}
