//! Command-line argument parsing for the Bavarian LIDAR fetcher
//!
//! This module defines the CLI structure using clap derive macros: a full
//! pipeline run, the two stages on their own, and a URL reachability probe.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::app::{KmlSource, OutputFormat};
use crate::constants::{geoportal, limits};
use crate::errors::KmlResult;

/// Bavaria LIDAR - list the LIDAR tiles published by the Bavarian geoportal
#[derive(Parser, Debug)]
#[command(
    name = "bavaria_lidar",
    version,
    about = "Build region and tile lists for the Bavarian LIDAR open data",
    long_about = "Reads the geoportal's KML index of municipalities, writes a list of regions,
then follows every region's meta4 manifest to write a deduplicated list of LIDAR tiles."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse the KML index and write both region and tile lists
    Run(RunArgs),

    /// Parse the KML index and write the region list only
    Regions(RegionsArgs),

    /// Fetch manifests for a saved region list and write the tile list
    Tiles(TilesArgs),

    /// Check whether a URL answers with a success status
    CheckUrl(CheckUrlArgs),

    /// Write a commented default configuration file
    InitConfig(InitConfigArgs),
}

/// Where the KML index comes from
#[derive(Args, Debug, Clone, Default)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Local KML file
    #[arg(long, value_name = "FILE")]
    pub path: Option<PathBuf>,

    /// KML document URL
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Use the official geoportal index
    #[arg(long)]
    pub geoportal: bool,
}

impl SourceArgs {
    /// Resolve to a KML source
    pub fn to_source(&self) -> KmlResult<KmlSource> {
        let url = if self.geoportal {
            Some(geoportal::REGIONS_KML_URL.to_string())
        } else {
            self.url.clone()
        };
        KmlSource::from_parts(self.path.clone(), url)
    }
}

/// Arguments for the full pipeline
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Request timeout in seconds
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Log progress for every region
    #[arg(short, long)]
    pub debug: bool,

    /// Output format (json or csv)
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Region list destination
    #[arg(long, value_name = "FILE")]
    pub regions_output: Option<PathBuf>,

    /// Tile list destination
    #[arg(long, value_name = "FILE")]
    pub tiles_output: Option<PathBuf>,

    /// Manifest requests kept in flight
    #[arg(short, long, value_name = "N")]
    pub concurrency: Option<usize>,
}

/// Arguments for the region stage
#[derive(Args, Debug, Clone)]
pub struct RegionsArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Region list destination
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (json or csv)
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Request timeout in seconds
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Arguments for the manifest stage
#[derive(Args, Debug, Clone)]
pub struct TilesArgs {
    /// Region list written by a previous run (JSON)
    #[arg(long, value_name = "FILE")]
    pub regions_json: PathBuf,

    /// Tile list destination
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (json or csv)
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Request timeout in seconds
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Log progress for every region
    #[arg(short, long)]
    pub debug: bool,

    /// Manifest requests kept in flight
    #[arg(short, long, value_name = "N")]
    pub concurrency: Option<usize>,
}

/// Arguments for the reachability probe
#[derive(Args, Debug, Clone)]
pub struct CheckUrlArgs {
    /// URL to probe
    pub url: String,

    /// Request timeout in seconds
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,
}

/// Arguments for writing the default configuration
#[derive(Args, Debug, Clone, Default)]
pub struct InitConfigArgs {
    /// Destination (defaults to the user configuration directory)
    #[arg(long, value_name = "FILE")]
    pub path: Option<PathBuf>,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the logging level based on global arguments
    ///
    /// `None` when no verbosity flag was given.
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose || self.command.debug() {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }

    /// Filter directive level, falling back to the configured level
    pub fn log_directive(&self, configured: &str) -> String {
        match self.log_level() {
            Some(level) => level.to_string().to_lowercase(),
            None => configured.to_lowercase(),
        }
    }
}

impl Commands {
    /// Whether per-region diagnostics were requested
    pub fn debug(&self) -> bool {
        match self {
            Commands::Run(args) => args.debug,
            Commands::Tiles(args) => args.debug,
            Commands::Regions(_) | Commands::CheckUrl(_) | Commands::InitConfig(_) => false,
        }
    }
}

/// Check timeout and concurrency overrides
pub fn validate_overrides(timeout: Option<u64>, concurrency: Option<usize>) -> Result<(), String> {
    if timeout == Some(0) {
        return Err("Timeout must be greater than 0 seconds".to_string());
    }
    if let Some(n) = concurrency {
        if !(1..=limits::MAX_FETCH_CONCURRENCY).contains(&n) {
            return Err(format!(
                "Concurrency must be between 1 and {}",
                limits::MAX_FETCH_CONCURRENCY
            ));
        }
    }
    Ok(())
}

impl RunArgs {
    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        validate_overrides(self.timeout, self.concurrency)
    }
}

impl TilesArgs {
    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        validate_overrides(self.timeout, self.concurrency)
    }
}
