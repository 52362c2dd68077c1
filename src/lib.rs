//! Bavarian LIDAR fetcher library
//!
//! Builds a list of surveyed regions from the Bavarian geoportal's KML index
//! and a deduplicated list of downloadable LIDAR tiles from each region's
//! meta4 manifest.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};
