//! HTTP client setup and middleware configuration.
//!
//! Every request the engine sends goes through a [`ClientWithMiddleware`]
//! built here. The stack is:
//!
//! - **Tracing**: `reqwest-tracing` spans around each request
//! - **Retry**: exponential backoff, restricted to transport failures by
//!   [`TransportOnly`]
//! - **Cookies**: an optional cookie jar, loaded from a file or supplied
//!   pre-built
//! - **Defaults**: per-request timeout, user agent, default headers, proxy
//!
//! ```rust
//! use bookfetch::http::{create_http_client, HttpClientConfig};
//! use std::time::Duration;
//!
//! # fn example() -> bookfetch::Result<()> {
//! let config = HttpClientConfig {
//!     retries: 5,
//!     timeout: Duration::from_secs(60),
//!     ..HttpClientConfig::default()
//! };
//! let client = create_http_client(config)?;
//! # Ok(())
//! # }
//! ```

use super::cookie::CookieSource;
use crate::error::Result;

use reqwest::{header::HeaderMap, Proxy};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{
    default_on_request_failure, policies::ExponentialBackoff, Retryable, RetryableStrategy,
    RetryTransientMiddleware,
};
use reqwest_tracing::TracingMiddleware;
use std::time::Duration;

/// User agent sent when the caller does not configure one.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:139.0) Gecko/20100101 Firefox/139.0";

const MAX_RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration for HTTP client setup.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Total number of attempts per request. Zero is treated as one.
    pub retries: u32,
    /// Lower bound of the backoff between two attempts.
    pub retry_interval: Duration,
    /// Deadline for a whole request, body included.
    pub timeout: Duration,
    /// Optional proxy configuration.
    pub proxy: Option<Proxy>,
    /// Default headers to include with all requests.
    pub headers: Option<HeaderMap>,
    /// User agent header value.
    pub user_agent: String,
    /// Where session cookies come from.
    pub cookie_source: Option<CookieSource>,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            retry_interval: Duration::from_secs(1),
            timeout: Duration::from_secs(300),
            proxy: None,
            headers: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookie_source: None,
        }
    }
}

/// Retry strategy that only retries failures where no response arrived.
///
/// Any response, whatever its status, is final: status handling belongs to
/// the caller, which fails the task on an unexpected code.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportOnly;

impl RetryableStrategy for TransportOnly {
    fn handle(
        &self,
        res: &std::result::Result<reqwest::Response, reqwest_middleware::Error>,
    ) -> Option<Retryable> {
        match res {
            Ok(_) => None,
            Err(error) => default_on_request_failure(error),
        }
    }
}

/// Creates an HTTP client with middleware configuration.
///
/// Fails if the cookie file cannot be read or the TLS backend cannot be
/// initialised.
pub fn create_http_client(config: HttpClientConfig) -> Result<ClientWithMiddleware> {
    let max_interval = MAX_RETRY_INTERVAL.max(config.retry_interval);
    let retry_policy = ExponentialBackoff::builder()
        .retry_bounds(config.retry_interval, max_interval)
        .build_with_max_retries(config.retries.saturating_sub(1));

    let mut inner_client_builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent);

    if let Some(proxy) = config.proxy {
        inner_client_builder = inner_client_builder.proxy(proxy);
    }

    if let Some(headers) = config.headers {
        inner_client_builder = inner_client_builder.default_headers(headers);
    }

    if let Some(source) = config.cookie_source {
        inner_client_builder = inner_client_builder.cookie_provider(source.into_jar()?);
    }

    let inner_client = inner_client_builder.build()?;

    let client = ClientBuilder::new(inner_client)
        // Trace HTTP requests. See the tracing crate to make use of these traces.
        .with(TracingMiddleware::default())
        // Retry requests that never got a response.
        .with(RetryTransientMiddleware::new_with_policy_and_strategy(
            retry_policy,
            TransportOnly,
        ))
        .build();

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, USER_AGENT};

    #[test]
    fn test_default_config() {
        let config = HttpClientConfig::default();
        assert_eq!(config.retries, 3);
        assert_eq!(config.timeout, Duration::from_secs(300));
        assert!(config.proxy.is_none());
        assert!(config.headers.is_none());
        assert!(config.cookie_source.is_none());
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    }

    #[test]
    fn test_create_http_client_with_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("test-agent"));

        let config = HttpClientConfig {
            retries: 0,
            headers: Some(headers),
            ..HttpClientConfig::default()
        };

        assert!(create_http_client(config).is_ok());
    }
}
