//! HTTP client for the Bavarian geoportal
//!
//! The module is organized into:
//! - `config`: HTTP client configuration and building
//! - `http`: rate limited single-attempt requests
//!
//! Consumers of remote documents depend on the [`Fetch`] trait rather than on
//! the concrete client, so the KML and manifest stages can be driven by
//! canned responses in tests.

use url::Url;

use crate::errors::{DownloadError, DownloadResult};

pub mod config;
pub mod http;

pub use config::ClientConfig;

use http::HttpHandler;

/// Source of remote documents
#[allow(async_fn_in_trait)]
pub trait Fetch {
    /// Fetch the body behind `url`
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` when the URL is invalid, the request fails or
    /// the server answers with a non-success status
    async fn fetch(&self, url: &str) -> DownloadResult<Vec<u8>>;
}

/// HTTP client for the geoportal
#[derive(Debug)]
pub struct GeoportalClient {
    http_handler: HttpHandler,
    config: ClientConfig,
}

impl GeoportalClient {
    /// Creates a client with default configuration
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if HTTP client creation fails
    pub fn new() -> DownloadResult<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Creates a client with custom configuration
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if HTTP client creation fails or the rate
    /// limit is zero
    pub fn with_config(config: ClientConfig) -> DownloadResult<Self> {
        let client = config.build_http_client()?;
        let http_handler =
            HttpHandler::new(client, config.rate_limit_rps, config.request_timeout)?;

        tracing::debug!(
            "Created geoportal client (timeout {:?}, {} req/s)",
            config.request_timeout,
            config.rate_limit_rps
        );

        Ok(Self {
            http_handler,
            config,
        })
    }

    /// Fetches the body of a URL
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the request fails or the status is not a success
    pub async fn get_bytes(&self, url: &Url) -> DownloadResult<Vec<u8>> {
        self.http_handler.get_bytes(url).await
    }

    /// Whether a URL answers a GET with a success status
    ///
    /// Redirects are followed. Any failure, including an unparsable URL, is
    /// reported as unreachable.
    pub async fn url_exists(&self, url: &str) -> bool {
        let Ok(url) = parse_url(url) else {
            return false;
        };
        match self.http_handler.get_response(&url).await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("{} is not reachable: {}", url, e);
                false
            }
        }
    }

    /// Active configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

impl Fetch for GeoportalClient {
    async fn fetch(&self, url: &str) -> DownloadResult<Vec<u8>> {
        let url = parse_url(url)?;
        self.get_bytes(&url).await
    }
}

/// Parse a URL, reporting the offending text on failure
pub fn parse_url(url: &str) -> DownloadResult<Url> {
    Url::parse(url.trim()).map_err(|e| DownloadError::InvalidUrl {
        url: url.to_string(),
        error: e.to_string(),
    })
}
