//! Core HTTP operations with rate limiting
//!
//! Every request waits on a shared rate limiter and is attempted exactly once;
//! a failed request is reported to the caller, which aborts the run. The read
//! timeout bounds each wait for the server (response head, then every body
//! chunk) rather than the whole transfer.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::Client;
use tokio::time::timeout;
use url::Url;

use crate::errors::{DownloadError, DownloadResult};

type DirectRateLimiter = RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>;

/// HTTP operations handler
#[derive(Debug)]
pub struct HttpHandler {
    client: Client,
    rate_limiter: DirectRateLimiter,
    read_timeout: Duration,
}

impl HttpHandler {
    /// Creates a new HttpHandler with the given client and rate limiting
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::InvalidRateLimit` if `rate_limit_rps` is zero
    pub fn new(
        client: Client,
        rate_limit_rps: u32,
        read_timeout: Duration,
    ) -> DownloadResult<Self> {
        let rate_limiter = Self::build_rate_limiter(rate_limit_rps)?;
        Ok(Self {
            client,
            rate_limiter,
            read_timeout,
        })
    }

    fn timed_out(&self, url: &Url) -> DownloadError {
        tracing::error!("No data from {} within {:?}", url, self.read_timeout);
        DownloadError::Timeout {
            url: url.to_string(),
            seconds: self.read_timeout.as_secs_f64(),
        }
    }

    fn build_rate_limiter(rate_limit_rps: u32) -> DownloadResult<DirectRateLimiter> {
        let quota = Quota::per_second(
            NonZeroU32::new(rate_limit_rps).ok_or(DownloadError::InvalidRateLimit)?,
        );
        Ok(RateLimiter::direct(quota))
    }

    /// Sends a GET request and checks the status
    ///
    /// # Errors
    ///
    /// Returns `DownloadError::Http` when the request fails outright,
    /// `DownloadError::Timeout` when no response head arrives in time and
    /// `DownloadError::ServerError` for non-success statuses
    pub async fn get_response(&self, url: &Url) -> DownloadResult<reqwest::Response> {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(50)))
            .await;

        let response = timeout(self.read_timeout, self.client.get(url.as_str()).send())
            .await
            .map_err(|_| self.timed_out(url))?
            .map_err(|e| {
                tracing::error!("Request to {} failed: {}", url, e);
                DownloadError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::error!("Server responded with HTTP {} for {}", status, url);
            return Err(DownloadError::ServerError {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        tracing::debug!("Successfully fetched response: {}", url);
        Ok(response)
    }

    /// Fetches the full response body
    ///
    /// The body is read chunk by chunk; only a stall longer than the read
    /// timeout aborts the transfer.
    pub async fn get_bytes(&self, url: &Url) -> DownloadResult<Vec<u8>> {
        let mut response = self.get_response(url).await?;
        let mut body = Vec::new();
        while let Some(chunk) = timeout(self.read_timeout, response.chunk())
            .await
            .map_err(|_| self.timed_out(url))??
        {
            body.extend_from_slice(&chunk);
        }
        tracing::debug!("Read {} bytes from {}", body.len(), url);
        Ok(body)
    }
}
