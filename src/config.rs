//! Configuration management for the Bavarian LIDAR fetcher
//!
//! Settings come from built-in defaults, an optional TOML file and finally
//! command-line flags. The file is looked up in the working directory first,
//! then in the user configuration directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::{ClientConfig, OutputFormat, PipelineOptions};
use crate::constants::{config as files, http, limits, logging, output};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Output locations and format
    pub output: OutputConfigToml,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
    /// Manifest requests kept in flight
    pub fetch_concurrency: usize,
    /// User-Agent header
    pub user_agent: String,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            request_timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            fetch_concurrency: limits::DEFAULT_FETCH_CONCURRENCY,
            user_agent: http::USER_AGENT.to_string(),
        }
    }
}

/// TOML-friendly output configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfigToml {
    /// Region list destination
    pub regions_path: PathBuf,
    /// Tile file list destination
    pub tiles_path: PathBuf,
    /// Output format
    pub format: OutputFormat,
}

impl Default for OutputConfigToml {
    fn default() -> Self {
        Self {
            regions_path: PathBuf::from(output::REGIONS_PATH),
            tiles_path: PathBuf::from(output::TILES_PATH),
            format: OutputFormat::Json,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration
    ///
    /// An explicitly given file must exist. Without one, the standard
    /// locations are searched and defaults are used if nothing is found.
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) if !path.exists() => return Err(ConfigError::NotFound { path }),
            Some(path) => Some(path),
            None => Self::find_config_file(),
        };

        let config = match config_path {
            Some(path) => Self::load_from_file(&path).await?,
            None => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(files::LOCAL_CONFIG_FILE)];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        let found = search_paths.into_iter().find(|path| path.exists());
        if let Some(path) = &found {
            debug!("Found config file: {}", path.display());
        }
        found
    }

    /// Config file path inside the user configuration directory
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(files::CONFIG_DIR_NAME).join(files::CONFIG_FILE_NAME))
    }

    /// Write the commented default configuration to `path`
    ///
    /// Missing parent directories are created. An existing file is only
    /// replaced when `force` is set.
    pub async fn write_default(path: &Path, force: bool) -> ConfigResult<()> {
        if !force && tokio::fs::try_exists(path).await? {
            return Err(ConfigError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, Self::generate_default_config_content()).await?;
        info!("Wrote default configuration to {}", path.display());
        Ok(())
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if self.client.rate_limit_rps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.rate_limit_rps".to_string(),
                value: "0".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }
        let concurrency = self.client.fetch_concurrency;
        if !(1..=limits::MAX_FETCH_CONCURRENCY).contains(&concurrency) {
            return Err(ConfigError::InvalidValue {
                field: "client.fetch_concurrency".to_string(),
                value: concurrency.to_string(),
                reason: format!("Must be between 1 and {}", limits::MAX_FETCH_CONCURRENCY),
            });
        }
        if self.client.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.request_timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "Must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Runtime HTTP client configuration
    pub fn client_config(&self) -> ClientConfig {
        self.client.to_runtime_config()
    }

    /// Runtime pipeline options
    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            regions_output: self.output.regions_path.clone(),
            tiles_output: self.output.tiles_path.clone(),
            format: self.output.format,
            debug: false,
            fetch_concurrency: self.client.fetch_concurrency,
        }
    }

    /// Default configuration content with comments
    pub fn generate_default_config_content() -> String {
        format!(
            r#"# Bavarian LIDAR fetcher configuration

[client]
# Seconds to wait for a response or the next piece of its body
request_timeout_secs = {}
connect_timeout_secs = {}
# Requests per second against the geoportal
rate_limit_rps = {}
# Manifest requests kept in flight (1 = sequential)
fetch_concurrency = {}
user_agent = "{}"

[output]
regions_path = "{}"
tiles_path = "{}"
format = "json"  # json or csv

[logging]
level = "{}"  # error, warn, info, debug, trace
"#,
            http::DEFAULT_TIMEOUT.as_secs(),
            http::CONNECT_TIMEOUT.as_secs(),
            limits::DEFAULT_RATE_LIMIT_RPS,
            limits::DEFAULT_FETCH_CONCURRENCY,
            http::USER_AGENT,
            output::REGIONS_PATH,
            output::TILES_PATH,
            logging::DEFAULT_LOG_LEVEL,
        )
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            rate_limit_rps: self.rate_limit_rps,
            fetch_concurrency: self.fetch_concurrency,
            user_agent: self.user_agent.clone(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.client.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(config.client.request_timeout_secs, 15);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generated_content_is_valid_toml() {
        let content = AppConfig::generate_default_config_content();
        let parsed: AppConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, AppConfig::default());
        assert!(content.contains("[client]"));
    }

    #[tokio::test]
    async fn test_write_default_then_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested/bavaria-lidar.toml");

        AppConfig::write_default(&config_path, false).await.unwrap();
        let loaded = AppConfig::load(Some(config_path.clone())).await.unwrap();
        assert_eq!(loaded, AppConfig::default());

        let again = AppConfig::write_default(&config_path, false).await;
        assert!(matches!(again, Err(ConfigError::AlreadyExists { ref path }) if *path == config_path));

        tokio::fs::write(&config_path, "[client]\nfetch_concurrency = 2\n")
            .await
            .unwrap();
        AppConfig::write_default(&config_path, true).await.unwrap();
        let content = tokio::fs::read_to_string(&config_path).await.unwrap();
        assert_eq!(content, AppConfig::generate_default_config_content());
    }

    #[test]
    fn test_default_config_path_location() {
        if let Some(path) = AppConfig::default_config_path() {
            assert!(path.ends_with(
                PathBuf::from(files::CONFIG_DIR_NAME).join(files::CONFIG_FILE_NAME)
            ));
        }
    }

    #[tokio::test]
    async fn test_explicit_missing_file_errors() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let result = AppConfig::load(Some(config_path)).await;
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bavaria-lidar.toml");
        tokio::fs::write(
            &config_path,
            r#"
[client]
request_timeout_secs = 30
fetch_concurrency = 8

[output]
format = "csv"
tiles_path = "out/tiles.csv"

[logging]
level = "debug"
"#,
        )
        .await
        .unwrap();

        let config = AppConfig::load(Some(config_path)).await.unwrap();
        assert_eq!(config.client.request_timeout_secs, 30);
        assert_eq!(config.client.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
        assert_eq!(config.output.format, OutputFormat::Csv);
        assert_eq!(config.logging.level, "debug");

        let options = config.pipeline_options();
        assert_eq!(options.tiles_output, PathBuf::from("out/tiles.csv"));
        assert_eq!(options.regions_output, PathBuf::from(output::REGIONS_PATH));
        assert_eq!(options.fetch_concurrency, 8);
        assert_eq!(
            config.client_config().request_timeout,
            Duration::from_secs(30)
        );
    }

    #[tokio::test]
    async fn test_invalid_toml_and_values() {
        let temp_dir = TempDir::new().unwrap();
        let bad_syntax = temp_dir.path().join("bad.toml");
        tokio::fs::write(&bad_syntax, "[client\nrate_limit_rps = ")
            .await
            .unwrap();
        assert!(matches!(
            AppConfig::load(Some(bad_syntax)).await,
            Err(ConfigError::InvalidFormat(_))
        ));

        let bad_value = temp_dir.path().join("zero.toml");
        tokio::fs::write(&bad_value, "[client]\nfetch_concurrency = 0\n")
            .await
            .unwrap();
        assert!(matches!(
            AppConfig::load(Some(bad_value)).await,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "client.fetch_concurrency"
        ));

        let bad_format = temp_dir.path().join("format.toml");
        tokio::fs::write(&bad_format, "[output]\nformat = \"xml\"\n")
            .await
            .unwrap();
        assert!(AppConfig::load(Some(bad_format)).await.is_err());
    }
}
