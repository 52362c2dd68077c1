//! Error types for the Bavarian LIDAR fetcher
//!
//! Input problems (malformed KML, unsupported size units, bad serializer input)
//! and transport problems (failed manifest requests) both abort a run. Entries
//! that are merely incomplete are skipped with a log line and never show up here.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading and parsing the KML region index
#[derive(Error, Debug)]
pub enum KmlError {
    /// KML file on disk does not exist
    #[error("KML file not found: {path}")]
    SourceNotFound { path: PathBuf },

    /// Neither or both of path and URL were supplied
    #[error("Invalid KML source: {reason}")]
    InvalidSource { reason: String },

    /// Document contains no element at all
    #[error("KML document is empty")]
    EmptyDocument,

    /// XML could not be read
    #[error("Malformed KML document: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute could not be read
    #[error("Malformed KML attribute: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    /// Text content was not valid UTF-8
    #[error("KML text is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    /// CSS selector used for the description table did not compile
    #[error("Invalid CSS selector: {selector}")]
    InvalidSelector { selector: String },

    /// Required key missing from a placemark description
    #[error("Missing key in KML item description: {field}")]
    MissingField { field: String },

    /// Value present but not parsable
    #[error("Invalid value for {field} in KML item description: {value:?}")]
    InvalidValue { field: String, value: String },

    /// Download size carries a unit other than GB/MB/KB
    #[error("Unsupported download size unit: {value:?}")]
    UnsupportedSizeUnit { value: String },

    /// Failed to fetch the KML over HTTP
    #[error("Failed to fetch KML document")]
    Download(#[from] DownloadError),

    /// I/O error reading a local file
    #[error("I/O error reading KML input")]
    Io(#[from] std::io::Error),

    /// Saved region list could not be decoded
    #[error("Invalid region list JSON")]
    Json(#[from] serde_json::Error),
}

/// HTTP transport errors
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned a non-success status
    #[error("Server error: HTTP {status} for {url}")]
    ServerError { status: u16, url: String },

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// No response or body data within the read timeout
    #[error("Timed out after {seconds:.1}s waiting for data from {url}")]
    Timeout { url: String, seconds: f64 },

    /// Rate limit configured as zero
    #[error("Rate limit must be greater than zero")]
    InvalidRateLimit,
}

/// Errors raised while fetching and parsing meta4 manifests
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest request failed; the whole run is aborted
    #[error("Failed to fetch manifest {url}")]
    Fetch {
        url: String,
        #[source]
        source: DownloadError,
    },

    /// Document contains no element at all
    #[error("meta4 document from {url} is empty")]
    EmptyDocument { url: String },

    /// XML could not be read
    #[error("Malformed meta4 document: {0}")]
    Xml(#[from] quick_xml::Error),

    /// XML attribute could not be read
    #[error("Malformed meta4 attribute: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    /// Text content was not valid UTF-8
    #[error("meta4 text is not valid UTF-8")]
    Utf8(#[from] std::str::Utf8Error),

    /// Value present but not parsable
    #[error("Invalid {field} for file {file_name}: {value:?}")]
    InvalidValue {
        file_name: String,
        field: String,
        value: String,
    },
}

/// Errors raised by the JSON/CSV writers
#[derive(Error, Debug)]
pub enum SerializeError {
    /// Nothing to write
    #[error("Record list is empty")]
    EmptyInput,

    /// Record does not match the requested record kind
    #[error("Record {index} is a {found}, expected {expected}")]
    TypeMismatch {
        index: usize,
        expected: &'static str,
        found: &'static str,
    },

    /// Output format string not recognised
    #[error("Unsupported output format: {format:?}. Expected \"json\" or \"csv\"")]
    UnsupportedFormat { format: String },

    /// JSON encoding error
    #[error("JSON serialization failed")]
    Json(#[from] serde_json::Error),

    /// I/O error writing output
    #[error("Failed to write output file: {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// I/O error reading or writing configuration
    #[error("Configuration file I/O failed")]
    Io(#[from] std::io::Error),

    /// Refusing to overwrite an existing file
    #[error("Configuration file already exists: {path} (use --force to overwrite)")]
    AlreadyExists { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// KML error
    #[error(transparent)]
    Kml(#[from] KmlError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Manifest error
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Serializer error
    #[error(transparent)]
    Serialize(#[from] SerializeError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Whether the error came from the network rather than from the input data
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            AppError::Download(_)
                | AppError::Kml(KmlError::Download(_))
                | AppError::Manifest(ManifestError::Fetch { .. })
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Kml(_) => "kml",
            AppError::Download(_) => "download",
            AppError::Manifest(_) => "manifest",
            AppError::Serialize(_) => "serialize",
            AppError::Config(_) => "config",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// KML result type alias
pub type KmlResult<T> = std::result::Result<T, KmlError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Manifest result type alias
pub type ManifestResult<T> = std::result::Result<T, ManifestError>;

/// Serializer result type alias
pub type SerializeResult<T> = std::result::Result<T, SerializeError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_mapping() {
        let err = AppError::from(KmlError::MissingField {
            field: "file_count".to_string(),
        });
        assert_eq!(err.category(), "kml");
        assert!(!err.is_transport());

        let err = AppError::from(ManifestError::Fetch {
            url: "https://example.com/a.meta4".to_string(),
            source: DownloadError::ServerError {
                status: 404,
                url: "https://example.com/a.meta4".to_string(),
            },
        });
        assert_eq!(err.category(), "manifest");
        assert!(err.is_transport());
    }

    #[test]
    fn test_messages_name_offending_value() {
        let err = KmlError::UnsupportedSizeUnit {
            value: "10 tb".to_string(),
        };
        assert!(err.to_string().contains("10 tb"));

        let err = SerializeError::UnsupportedFormat {
            format: "xml".to_string(),
        };
        assert!(err.to_string().contains("xml"));
    }

    #[test]
    fn test_fetch_error_keeps_source() {
        use std::error::Error as _;

        let err = ManifestError::Fetch {
            url: "https://example.com/x.meta4".to_string(),
            source: DownloadError::ServerError {
                status: 500,
                url: "https://example.com/x.meta4".to_string(),
            },
        };
        let source = err.source().map(|s| s.to_string()).unwrap_or_default();
        assert!(source.contains("500"));
    }
}
