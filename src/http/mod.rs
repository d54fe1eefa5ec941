//! HTTP client functionality.
//!
//! This module owns the request layer: the middleware-wrapped client with
//! transport retry, and the cookie sources it can be seeded with.
//!
//! # Examples
//!
//! ## Client with a cookie file
//!
//! ```rust,no_run
//! use bookfetch::http::{create_http_client, CookieSource, HttpClientConfig};
//! use std::path::PathBuf;
//!
//! # fn example() -> bookfetch::Result<()> {
//! let config = HttpClientConfig {
//!     cookie_source: Some(CookieSource::File(PathBuf::from("cookies.txt"))),
//!     ..HttpClientConfig::default()
//! };
//! let client = create_http_client(config)?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod cookie;

pub use client::{create_http_client, HttpClientConfig, TransportOnly, DEFAULT_USER_AGENT};
pub use cookie::{load_cookie_file, CookieSource};
