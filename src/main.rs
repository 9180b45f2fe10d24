//! Schema From Source - command-line tool inferring OpenAPI payload schemas.
//!
//! # Usage
//!
//! ```bash
//! schema-from-source [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Generate YAML documentation:
//! ```bash
//! schema-from-source ./my-api-project -o openapi.yaml
//! ```
//!
//! Merge captured traffic, letting observed responses win:
//! ```bash
//! schema-from-source ./my-api-project --capture captures.json --merge-policy captured-first
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use schema_from_source::cli;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("Schema From Source starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    info!("Document generation completed successfully");
    Ok(())
}
