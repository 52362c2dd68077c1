//! Core application logic for the Bavarian LIDAR fetcher
//!
//! The pipeline runs in two stages. The KML index of the geoportal is parsed
//! into [`Region`]s, then every region's meta4 manifest is fetched and
//! flattened into a deduplicated list of [`TileFile`]s.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bavaria_lidar::app::{
//!     get_bavaria_geoportal_lidar_file_list, GeoportalClient, KmlSource, PipelineOptions,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeoportalClient::new()?;
//! let source = KmlSource::from_parts(
//!     None,
//!     Some("https://geodaten.bayern.de/odd/a/laser/meta/kml/gemeinde.kml".to_string()),
//! )?;
//!
//! let options = PipelineOptions::default();
//! let summary = get_bavaria_geoportal_lidar_file_list(&source, &client, &options).await?;
//! println!("{} regions, {} tiles", summary.region_count, summary.tile_count);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod kml;
pub mod meta4;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod units;
pub mod xml;

// Re-export main public API
pub use client::{ClientConfig, Fetch, GeoportalClient};
pub use kml::{load_regions, load_regions_json, parse_regions_kml, KmlSource};
pub use meta4::{collect_tile_files, parse_meta4, Meta4Options, Meta4Stats, TileCollector};
pub use models::{Record, RecordKind, Region, Tabular, TileFile};
pub use output::{render, render_records, write_records, OutputFormat};
pub use pipeline::{
    get_bavaria_geoportal_lidar_file_list, run_with_client, PipelineOptions, PipelineSummary,
};
pub use units::normalize_size;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        let config = ClientConfig::default();
        assert_eq!(config.fetch_concurrency, crate::constants::DEFAULT_FETCH_CONCURRENCY);
        assert_eq!(OutputFormat::default(), OutputFormat::Json);
    }
}
