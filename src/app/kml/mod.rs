//! KML region index parsing
//!
//! The geoportal publishes its survey regions as KML placemarks. Each
//! placemark carries a name and an HTML description table with area, tile
//! count, download size and a link to the region's meta4 manifest.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bavaria_lidar::app::kml::{load_regions, KmlSource};
//! use bavaria_lidar::app::GeoportalClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = GeoportalClient::new()?;
//! let source = KmlSource::from_parts(Some("gemeinde.kml".into()), None)?;
//! let regions = load_regions(&source, &client).await?;
//! println!("{} regions", regions.len());
//! # Ok(())
//! # }
//! ```

pub mod description;

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::app::client::{parse_url, Fetch};
use crate::app::models::Region;
use crate::app::units::normalize_size;
use crate::app::xml::{parse_document, XmlElement};
use crate::constants::description as keys;
use crate::constants::KML_NAMESPACE;
use crate::errors::{KmlError, KmlResult};

pub use description::{parse_description, RegionDescription};

/// Where the KML region index comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KmlSource {
    /// Local file
    Path(PathBuf),
    /// Remote document
    Url(url::Url),
}

impl KmlSource {
    /// Build a source from an optional path and an optional URL
    ///
    /// # Errors
    ///
    /// Returns `KmlError::InvalidSource` unless exactly one is given, and
    /// `KmlError::Download` for an unparsable URL
    pub fn from_parts(path: Option<PathBuf>, url: Option<String>) -> KmlResult<Self> {
        match (path, url) {
            (Some(path), None) => Ok(Self::Path(path)),
            (None, Some(url)) => Ok(Self::Url(parse_url(&url)?)),
            (None, None) => Err(KmlError::InvalidSource {
                reason: "either a path or a URL must be provided".to_string(),
            }),
            (Some(_), Some(_)) => Err(KmlError::InvalidSource {
                reason: "only one of path or URL may be provided".to_string(),
            }),
        }
    }

    /// Read the raw KML bytes
    ///
    /// # Errors
    ///
    /// Returns `KmlError::SourceNotFound` for a missing local file and
    /// `KmlError::Download` when the remote request fails
    pub async fn load<F: Fetch>(&self, fetcher: &F) -> KmlResult<Vec<u8>> {
        match self {
            Self::Path(path) => {
                if !path.exists() {
                    return Err(KmlError::SourceNotFound { path: path.clone() });
                }
                debug!("Reading KML from {}", path.display());
                Ok(tokio::fs::read(path).await?)
            }
            Self::Url(url) => {
                debug!("Fetching KML from {}", url);
                Ok(fetcher.fetch(url.as_str()).await?)
            }
        }
    }
}

impl std::fmt::Display for KmlSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Load and parse the region index from a source
pub async fn load_regions<F: Fetch>(source: &KmlSource, fetcher: &F) -> KmlResult<Vec<Region>> {
    let content = source.load(fetcher).await?;
    let regions = parse_regions_kml(&content)?;
    info!("Parsed {} regions from {}", regions.len(), source);
    Ok(regions)
}

/// Load a region list previously written as JSON
pub async fn load_regions_json(path: &Path) -> KmlResult<Vec<Region>> {
    if !path.exists() {
        return Err(KmlError::SourceNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = tokio::fs::read(path).await?;
    let regions: Vec<Region> = serde_json::from_slice(&content)?;
    info!("Loaded {} regions from {}", regions.len(), path.display());
    Ok(regions)
}

/// Parse KML content into regions, in document order
///
/// Placemarks without a non-blank `name` or `description` are skipped.
///
/// # Errors
///
/// Returns `KmlError` for malformed XML, a description missing a required
/// key, or a value that does not parse
pub fn parse_regions_kml(content: &[u8]) -> KmlResult<Vec<Region>> {
    let root = parse_document::<KmlError>(content, KML_NAMESPACE)?.ok_or(KmlError::EmptyDocument)?;

    let mut regions = Vec::new();
    for placemark in root.descendants_named("Placemark") {
        if let Some(region) = parse_placemark(placemark)? {
            regions.push(region);
        }
    }
    Ok(regions)
}

fn parse_placemark(placemark: &XmlElement) -> KmlResult<Option<Region>> {
    let name = placemark.child_text("name").map(str::trim).unwrap_or("");
    if name.is_empty() {
        debug!("Skipping placemark without name");
        return Ok(None);
    }
    let description = placemark
        .child_text("description")
        .map(str::trim)
        .unwrap_or("");
    if description.is_empty() {
        debug!("Skipping placemark {:?} without description", name);
        return Ok(None);
    }

    let data = parse_description(description)?;
    normalize_description(name, &data).map(Some)
}

/// Turn a description table into a typed region
///
/// # Errors
///
/// Returns `KmlError::MissingField` for an absent required key,
/// `KmlError::InvalidValue` for unparsable numbers and
/// `KmlError::UnsupportedSizeUnit` for sizes outside GB/MB/KB
pub fn normalize_description(name: &str, data: &RegionDescription) -> KmlResult<Region> {
    data.require(keys::NAME)?;

    let area_raw = data.require(keys::AREA_KM2)?;
    let area_km2 = parse_area(area_raw)?;

    let count_raw = data.require(keys::FILE_COUNT)?;
    let file_count = count_raw
        .trim()
        .parse::<u64>()
        .map_err(|_| invalid(keys::FILE_COUNT, count_raw))?;

    let download_size = data
        .require(keys::DOWNLOAD_SIZE)?
        .replace(',', ".")
        .trim()
        .to_string();
    let download_size_mb = normalize_size(&download_size)?;

    let metalink = data
        .get(keys::METALINK)
        .map(str::trim)
        .filter(|link| !link.is_empty())
        .map(str::to_string);

    Ok(Region {
        name: name.trim().to_string(),
        file_count,
        area_km2,
        download_size,
        download_size_mb,
        metalink,
    })
}

fn parse_area(raw: &str) -> KmlResult<f64> {
    let area: f64 = raw
        .replace(keys::AREA_UNIT, "")
        .replace(',', ".")
        .trim()
        .parse()
        .map_err(|_| invalid(keys::AREA_KM2, raw))?;
    if !area.is_finite() || area < 0.0 {
        return Err(invalid(keys::AREA_KM2, raw));
    }
    Ok(area)
}

fn invalid(field: &str, value: &str) -> KmlError {
    KmlError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::client::tests::MockFetcher;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const DESCRIPTION: &str = r#"<table>
        <tr><td>Gebiet:</td><td>Region A</td></tr>
        <tr><td>Fläche:</td><td>12,5 km²</td></tr>
        <tr><td>Anzahl Dateien:</td><td>7</td></tr>
        <tr><td>Größe Download:</td><td>1,5 GB</td></tr>
        <tr><td colspan="2"><a href="https://geodaten.bayern.de/odd/a/laser/meta/a.meta4">meta4</a></td></tr>
    </table>"#;

    fn kml(placemarks: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2"><Document>{placemarks}</Document></kml>"#
        )
    }

    fn placemark(name: &str, description: &str) -> String {
        format!(
            "<Placemark><name>{name}</name><description><![CDATA[{description}]]></description></Placemark>"
        )
    }

    #[test]
    fn test_single_placemark() {
        let content = kml(&placemark("Region A", DESCRIPTION));
        let regions = parse_regions_kml(content.as_bytes()).unwrap();

        assert_eq!(regions.len(), 1);
        let region = &regions[0];
        assert_eq!(region.name, "Region A");
        assert_eq!(region.file_count, 7);
        assert_eq!(region.area_km2, 12.5);
        assert_eq!(region.download_size, "1.5 GB");
        assert_eq!(region.download_size_mb, 1536.0);
        assert_eq!(
            region.metalink.as_deref(),
            Some("https://geodaten.bayern.de/odd/a/laser/meta/a.meta4")
        );
    }

    #[test]
    fn test_blank_name_and_missing_description_skipped() {
        let content = kml(&format!(
            "{}{}{}",
            "<Placemark><name/><description>x</description></Placemark>",
            "<Placemark><name>Ohne Beschreibung</name></Placemark>",
            placemark("Region B", DESCRIPTION),
        ));
        let regions = parse_regions_kml(content.as_bytes()).unwrap();
        assert_eq!(regions.len(), 1);
        assert_eq!(regions[0].name, "Region B");
    }

    #[test]
    fn test_placemarks_in_folders_keep_document_order() {
        let content = kml(&format!(
            "<Folder>{}<Folder>{}</Folder></Folder>{}",
            placemark("Eins", DESCRIPTION),
            placemark("Zwei", DESCRIPTION),
            placemark("Drei", DESCRIPTION),
        ));
        let names: Vec<String> = parse_regions_kml(content.as_bytes())
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Eins", "Zwei", "Drei"]);
    }

    #[test]
    fn test_entity_escaped_description() {
        let escaped = DESCRIPTION
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        let content = kml(&format!(
            "<Placemark><name>Region C</name><description>{escaped}</description></Placemark>"
        ));
        let regions = parse_regions_kml(content.as_bytes()).unwrap();
        assert_eq!(regions[0].file_count, 7);
    }

    #[test]
    fn test_missing_link_gives_no_metalink() {
        let description = DESCRIPTION.replace(
            r#"<tr><td colspan="2"><a href="https://geodaten.bayern.de/odd/a/laser/meta/a.meta4">meta4</a></td></tr>"#,
            "",
        );
        let content = kml(&placemark("Region D", &description));
        let regions = parse_regions_kml(content.as_bytes()).unwrap();
        assert_eq!(regions[0].metalink, None);
    }

    #[test]
    fn test_missing_required_key() {
        let description = DESCRIPTION.replace("<tr><td>Anzahl Dateien:</td><td>7</td></tr>", "");
        let content = kml(&placemark("Region E", &description));
        let err = parse_regions_kml(content.as_bytes()).unwrap_err();
        assert!(matches!(err, KmlError::MissingField { ref field } if field == "file_count"));
    }

    #[test]
    fn test_description_without_table_is_missing_keys() {
        let content = kml(&placemark("Region F", "Keine Daten"));
        let err = parse_regions_kml(content.as_bytes()).unwrap_err();
        assert!(matches!(err, KmlError::MissingField { ref field } if field == "name"));
    }

    #[test]
    fn test_unsupported_size_unit() {
        let description = DESCRIPTION.replace("1,5 GB", "1,5 TB");
        let content = kml(&placemark("Region G", &description));
        assert!(matches!(
            parse_regions_kml(content.as_bytes()),
            Err(KmlError::UnsupportedSizeUnit { .. })
        ));
    }

    #[test]
    fn test_invalid_numbers() {
        let description = DESCRIPTION.replace("<td>7</td>", "<td>sieben</td>");
        let content = kml(&placemark("Region H", &description));
        assert!(matches!(
            parse_regions_kml(content.as_bytes()),
            Err(KmlError::InvalidValue { ref field, .. }) if field == "file_count"
        ));

        let description = DESCRIPTION.replace("12,5 km²", "-3 km²");
        let content = kml(&placemark("Region I", &description));
        assert!(matches!(
            parse_regions_kml(content.as_bytes()),
            Err(KmlError::InvalidValue { ref field, .. }) if field == "area_km2"
        ));
    }

    #[test]
    fn test_malformed_and_empty_documents() {
        assert!(matches!(
            parse_regions_kml(b"<kml><Document></kml>"),
            Err(KmlError::Xml(_))
        ));
        assert!(matches!(
            parse_regions_kml(b""),
            Err(KmlError::EmptyDocument)
        ));
    }

    #[test]
    fn test_other_namespace_ignored() {
        let content = format!(
            r#"<kml xmlns="http://earth.google.com/kml/2.1"><Document>{}</Document></kml>"#,
            placemark("Region J", DESCRIPTION)
        );
        assert!(parse_regions_kml(content.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_source_from_parts() {
        assert!(matches!(
            KmlSource::from_parts(Some("a.kml".into()), None),
            Ok(KmlSource::Path(_))
        ));
        assert!(matches!(
            KmlSource::from_parts(None, Some("https://geodaten.bayern.de/x.kml".into())),
            Ok(KmlSource::Url(_))
        ));
        assert!(matches!(
            KmlSource::from_parts(None, None),
            Err(KmlError::InvalidSource { .. })
        ));
        assert!(matches!(
            KmlSource::from_parts(Some("a.kml".into()), Some("https://x".into())),
            Err(KmlError::InvalidSource { .. })
        ));
    }

    #[tokio::test]
    async fn test_load_from_missing_path() {
        let source = KmlSource::Path(PathBuf::from("/nonexistent/regions.kml"));
        let err = source.load(&MockFetcher::new()).await.unwrap_err();
        assert!(matches!(err, KmlError::SourceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_load_regions_from_file_and_url() {
        let content = kml(&placemark("Region K", DESCRIPTION));

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        let from_file = load_regions(
            &KmlSource::Path(file.path().to_path_buf()),
            &MockFetcher::new(),
        )
        .await
        .unwrap();

        let url = "https://geodaten.bayern.de/odd/a/laser/meta/kml/gemeinde.kml";
        let fetcher = MockFetcher::new().with(url, &content);
        let source = KmlSource::from_parts(None, Some(url.to_string())).unwrap();
        let from_url = load_regions(&source, &fetcher).await.unwrap();

        assert_eq!(from_file, from_url);
        assert_eq!(fetcher.requested(), vec![url]);
    }

    #[tokio::test]
    async fn test_failed_url_is_download_error() {
        let source = KmlSource::from_parts(None, Some("https://x/missing.kml".into())).unwrap();
        let err = load_regions(&source, &MockFetcher::new()).await.unwrap_err();
        assert!(matches!(err, KmlError::Download(_)));
    }

    #[tokio::test]
    async fn test_region_json_reload() {
        let content = kml(&placemark("Region L", DESCRIPTION));
        let regions = parse_regions_kml(content.as_bytes()).unwrap();

        let mut file = NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&regions).unwrap().as_bytes())
            .unwrap();
        file.flush().unwrap();

        let reloaded = load_regions_json(file.path()).await.unwrap();
        assert_eq!(reloaded, regions);
    }
}
