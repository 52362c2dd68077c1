//! Prelude module for the Bavarian LIDAR fetcher library
//!
//! Re-exports the items needed for typical usage with a single
//! `use bavaria_lidar::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use bavaria_lidar::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let source = KmlSource::from_parts(Some(PathBuf::from("gemeinde.kml")), None)?;
//!     let summary = run_with_client(&source, ClientConfig::default(), &PipelineOptions::default()).await?;
//!     println!("{} tiles", summary.tile_count);
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

pub use crate::app::{
    // Client
    ClientConfig,
    Fetch,
    GeoportalClient,

    // Data types
    KmlSource,
    Meta4Options,
    Meta4Stats,
    OutputFormat,
    Region,
    TileFile,

    // Stages
    collect_tile_files,
    get_bavaria_geoportal_lidar_file_list,
    load_regions,
    run_with_client,
    write_records,
    PipelineOptions,
    PipelineSummary,
};

pub use crate::config::AppConfig;

// Commonly used constants
pub use crate::constants::{DEFAULT_FETCH_CONCURRENCY, DEFAULT_RATE_LIMIT_RPS, USER_AGENT};

pub use std::path::{Path, PathBuf};

pub use tokio;
