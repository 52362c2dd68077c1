//! Application constants for the Bavarian LIDAR fetcher
//!
//! Centralizes XML namespaces, the description label table, default output
//! locations and HTTP settings, grouped by functional domain.

use std::time::Duration;

/// XML namespaces of the consumed documents
pub mod xml {
    /// KML 2.2 namespace
    pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

    /// Metalink 4 namespace (RFC 5854)
    pub const METALINK_NAMESPACE: &str = "urn:ietf:params:xml:ns:metalink";
}

/// Placemark description table handling
pub mod description {
    /// German table labels mapped to canonical keys
    pub const LABEL_TRANSLATIONS: &[(&str, &str)] = &[
        ("Gebiet", NAME),
        ("Fläche", AREA_KM2),
        ("Anzahl Dateien", FILE_COUNT),
        ("Größe Download", DOWNLOAD_SIZE),
        ("metalink", METALINK),
    ];

    /// Canonical key for the region name
    pub const NAME: &str = "name";

    /// Canonical key for the region area
    pub const AREA_KM2: &str = "area_km2";

    /// Canonical key for the number of tiles
    pub const FILE_COUNT: &str = "file_count";

    /// Canonical key for the human readable download size
    pub const DOWNLOAD_SIZE: &str = "download_size";

    /// Canonical key for the manifest link
    pub const METALINK: &str = "metalink";

    /// Unit suffix stripped from area values
    pub const AREA_UNIT: &str = "km²";

    /// CSS selector for table rows
    pub const ROW_SELECTOR: &str = "tr";

    /// CSS selector for table cells
    pub const CELL_SELECTOR: &str = "td";

    /// CSS selector for the manifest link
    pub const LINK_SELECTOR: &str = "a[href]";

    /// Translate a table label, returning the label itself when unknown
    pub fn translate(label: &str) -> &str {
        LABEL_TRANSLATIONS
            .iter()
            .find(|(german, _)| *german == label)
            .map(|(_, key)| *key)
            .unwrap_or(label)
    }
}

/// Size unit factors, in megabytes per unit
pub mod units {
    /// Supported suffixes, checked in order
    pub const SIZE_UNITS_MB: &[(&str, f64)] = &[("gb", 1024.0), ("mb", 1.0), ("kb", 1.0 / 1024.0)];
}

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!("bavaria-lidar/", env!("CARGO_PKG_VERSION"));

    /// Default HTTP request timeout
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum number of redirects to follow
    pub const MAX_REDIRECTS: usize = 10;
}

/// Request pacing against the geoportal
pub mod limits {
    /// Default rate limit (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 5;

    /// Default number of manifest requests in flight
    pub const DEFAULT_FETCH_CONCURRENCY: usize = 4;

    /// Upper bound on manifest requests in flight
    pub const MAX_FETCH_CONCURRENCY: usize = 16;
}

/// Geoportal locations
pub mod geoportal {
    /// Municipality KML index of the Bavarian laser scan data
    pub const REGIONS_KML_URL: &str =
        "https://geodaten.bayern.de/odd/a/laser/meta/kml/gemeinde.kml";
}

/// Output locations
pub mod output {
    /// Region list written by the pipeline
    pub const REGIONS_PATH: &str = "docs/output_bavaria_kml_regions.json";

    /// Tile file list written by the pipeline
    pub const TILES_PATH: &str = "docs/output_bavaria_laz_files.json";
}

/// Configuration file lookup
pub mod config {
    /// Project-local configuration file
    pub const LOCAL_CONFIG_FILE: &str = "bavaria-lidar.toml";

    /// Directory under the user config dir
    pub const CONFIG_DIR_NAME: &str = "bavaria-lidar";

    /// File name inside the user config directory
    pub const CONFIG_FILE_NAME: &str = "config.toml";
}

/// Logging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "warn";
}

pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use limits::{DEFAULT_FETCH_CONCURRENCY, DEFAULT_RATE_LIMIT_RPS};
pub use xml::{KML_NAMESPACE, METALINK_NAMESPACE};
