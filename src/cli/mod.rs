//! Command-line entry points
//!
//! - `serve`: HTTP API
//! - `parse`: process local files and print JSON results
//! - `health`: run the parser smoke checks once

pub mod health;
pub mod parse;
pub mod serve;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// Document processing pipeline
#[derive(Parser)]
#[command(name = "docpipe")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API server
    Serve,

    /// Process local files through the batch pipeline
    Parse(parse::ParseArgs),

    /// Check every parser variant and print the report
    Health,
}

/// Load `.env` and configuration, then install logging at `level` (or the configured level)
pub(crate) fn bootstrap(level: Option<&str>) -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::load()?;

    if let Some(level) = level {
        config.logging.level = level.to_string();
    }

    logging::init_logging(&config.logging);

    Ok(config)
}
