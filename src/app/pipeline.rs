//! End-to-end run: KML index, region list, manifests, tile list

use std::path::PathBuf;

use tracing::info;

use crate::app::client::{ClientConfig, Fetch, GeoportalClient};
use crate::app::kml::{load_regions, KmlSource};
use crate::app::meta4::{collect_tile_files, Meta4Options, Meta4Stats};
use crate::app::output::{write_records, OutputFormat};
use crate::constants::{limits, output};
use crate::errors::Result;

/// Where and how a run writes its results
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Region list destination
    pub regions_output: PathBuf,
    /// Tile file list destination
    pub tiles_output: PathBuf,
    /// Output format for both files
    pub format: OutputFormat,
    /// Per-region progress at info level
    pub debug: bool,
    /// Manifest requests kept in flight
    pub fetch_concurrency: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            regions_output: PathBuf::from(output::REGIONS_PATH),
            tiles_output: PathBuf::from(output::TILES_PATH),
            format: OutputFormat::Json,
            debug: false,
            fetch_concurrency: limits::DEFAULT_FETCH_CONCURRENCY,
        }
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSummary {
    /// Regions parsed from the KML
    pub region_count: usize,
    /// Tile files written
    pub tile_count: usize,
    /// Manifest stage counters
    pub manifest_stats: Meta4Stats,
    /// Region list written here
    pub regions_output: PathBuf,
    /// Tile list written here
    pub tiles_output: PathBuf,
}

/// Build the region and tile lists for Bavaria
///
/// The region list is written before any manifest is requested, so it
/// survives a failed manifest stage.
///
/// # Errors
///
/// Any KML, transport, manifest or write error aborts the run
pub async fn get_bavaria_geoportal_lidar_file_list<F: Fetch>(
    source: &KmlSource,
    fetcher: &F,
    options: &PipelineOptions,
) -> Result<PipelineSummary> {
    info!("Loading regions from {}", source);
    let regions = load_regions(source, fetcher).await?;
    write_records(&regions, &options.regions_output, options.format).await?;

    let meta4_options = Meta4Options {
        debug: options.debug,
        concurrency: options.fetch_concurrency,
    };
    let (files, manifest_stats) = collect_tile_files(&regions, fetcher, &meta4_options).await?;
    write_records(&files, &options.tiles_output, options.format).await?;

    Ok(PipelineSummary {
        region_count: regions.len(),
        tile_count: files.len(),
        manifest_stats,
        regions_output: options.regions_output.clone(),
        tiles_output: options.tiles_output.clone(),
    })
}

/// Run the pipeline against the live geoportal
///
/// # Errors
///
/// Fails if the HTTP client cannot be built or the run fails
pub async fn run_with_client(
    source: &KmlSource,
    client_config: ClientConfig,
    options: &PipelineOptions,
) -> Result<PipelineSummary> {
    let client = GeoportalClient::with_config(client_config)?;
    get_bavaria_geoportal_lidar_file_list(source, &client, options).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::tests::MockFetcher;
    use crate::app::models::{Region, TileFile};
    use crate::errors::AppError;
    use tempfile::TempDir;

    const KML_URL: &str = "https://geo.example/gemeinde.kml";

    fn placemark(name: &str, meta4: Option<&str>) -> String {
        let link = meta4
            .map(|url| format!("<tr><td colspan=\"2\"><a href=\"{url}\">Download</a></td></tr>"))
            .unwrap_or_default();
        format!(
            r#"<Placemark><name>{name}</name><description><![CDATA[
<table>
<tr><td>Gebiet:</td><td>{name}</td></tr>
<tr><td>Fläche:</td><td>10,5 km²</td></tr>
<tr><td>Anzahl Dateien:</td><td>2</td></tr>
<tr><td>Größe Download:</td><td>1,5 GB</td></tr>
{link}
</table>]]></description></Placemark>"#
        )
    }

    fn kml(placemarks: &[String]) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2"><Document>{}</Document></kml>"#,
            placemarks.concat()
        )
    }

    fn meta4(names: &[&str]) -> String {
        let files: String = names
            .iter()
            .map(|n| {
                format!(
                    r#"<file name="{n}"><size>10</size><hash type="sha-256">h{n}</hash><url>https://dl.example/{n}</url></file>"#
                )
            })
            .collect();
        format!(r#"<metalink xmlns="urn:ietf:params:xml:ns:metalink">{files}</metalink>"#)
    }

    fn options(dir: &TempDir) -> PipelineOptions {
        PipelineOptions {
            regions_output: dir.path().join("docs/regions.json"),
            tiles_output: dir.path().join("docs/tiles.json"),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_options() {
        let options = PipelineOptions::default();
        assert_eq!(options.regions_output, PathBuf::from(output::REGIONS_PATH));
        assert_eq!(options.tiles_output, PathBuf::from(output::TILES_PATH));
        assert_eq!(options.format, OutputFormat::Json);
    }

    #[tokio::test]
    async fn test_full_run_writes_both_files() {
        let dir = TempDir::new().unwrap();
        let fetcher = MockFetcher::new()
            .with(
                KML_URL,
                &kml(&[
                    placemark("Alpha", Some("https://geo.example/a.meta4")),
                    placemark("Beta", None),
                    placemark("Gamma", Some("https://geo.example/g.meta4")),
                ]),
            )
            .with("https://geo.example/a.meta4", &meta4(&["1.laz", "2.laz"]))
            .with("https://geo.example/g.meta4", &meta4(&["2.laz", "3.laz"]));
        let source = KmlSource::from_parts(None, Some(KML_URL.to_string())).unwrap();
        let options = options(&dir);

        let summary = get_bavaria_geoportal_lidar_file_list(&source, &fetcher, &options)
            .await
            .unwrap();

        assert_eq!(summary.region_count, 3);
        assert_eq!(summary.tile_count, 3);
        assert_eq!(summary.manifest_stats.regions_skipped, 1);

        let regions: Vec<Region> =
            serde_json::from_str(&std::fs::read_to_string(&options.regions_output).unwrap())
                .unwrap();
        assert_eq!(regions[1].name, "Beta");
        assert_eq!(regions[1].metalink, None);
        assert_eq!(regions[0].download_size_mb, 1536.0);

        let tiles: Vec<TileFile> =
            serde_json::from_str(&std::fs::read_to_string(&options.tiles_output).unwrap())
                .unwrap();
        let names: Vec<&str> = tiles.iter().map(|t| t.file_name.as_str()).collect();
        assert_eq!(names, vec!["1.laz", "2.laz", "3.laz"]);
    }

    #[tokio::test]
    async fn test_manifest_failure_keeps_region_file() {
        let dir = TempDir::new().unwrap();
        let fetcher = MockFetcher::new().with(
            KML_URL,
            &kml(&[placemark("Alpha", Some("https://geo.example/gone.meta4"))]),
        );
        let source = KmlSource::from_parts(None, Some(KML_URL.to_string())).unwrap();
        let options = options(&dir);

        let err = get_bavaria_geoportal_lidar_file_list(&source, &fetcher, &options)
            .await
            .unwrap_err();

        assert!(err.is_transport());
        assert!(options.regions_output.exists());
        assert!(!options.tiles_output.exists());
    }

    #[tokio::test]
    async fn test_no_tiles_is_an_error() {
        let dir = TempDir::new().unwrap();
        let fetcher = MockFetcher::new().with(KML_URL, &kml(&[placemark("Alpha", None)]));
        let source = KmlSource::from_parts(None, Some(KML_URL.to_string())).unwrap();

        let err = get_bavaria_geoportal_lidar_file_list(&source, &fetcher, &options(&dir))
            .await
            .unwrap_err();
        assert_eq!(err.category(), "serialize");
        assert!(matches!(err, AppError::Serialize(_)));
    }
}
