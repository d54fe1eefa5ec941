//! Error handling for bookfetch.
//!
//! Every failure a task can hit is folded into the [`Error`] enum. Transport
//! failures are retried by the request layer before they ever get here; all
//! the other variants fail the task that produced them immediately.

use reqwest::StatusCode;
use std::io;
use thiserror::Error;

/// Errors that can happen while probing, fetching or promoting a download.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from an underlying system.
    ///
    /// Captures internal failures that don't fit into any other category.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Error from the URL parser or the expected URL format.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// I/O Error.
    ///
    /// Raised while creating, sizing, writing or renaming destination files.
    #[error("I/O error: {source}")]
    IOError {
        #[from]
        source: io::Error,
    },

    /// Error from the Reqwest library.
    #[error("Reqwest error: {source}")]
    Reqwest {
        #[from]
        source: reqwest::Error,
    },

    /// Error surfaced by the middleware stack, typically the last transport
    /// error once every retry has been used.
    #[error("Request error: {source}")]
    Middleware {
        #[from]
        source: reqwest_middleware::Error,
    },

    /// The server answered with a status the engine cannot use.
    #[error("Response status code is not ok: {status} ({url})")]
    UnexpectedStatus { status: StatusCode, url: String },

    /// A ranged response did not carry the number of bytes requested.
    #[error("Range request returned invalid Content-Length: {actual} however the range was: {range} (expected {expected})")]
    LengthMismatch {
        expected: u64,
        actual: u64,
        range: String,
    },

    /// The probe could not tell how large the resource is.
    #[error("Cannot determine size: no Content-Length header and not a chunked transfer")]
    UnknownSize,

    /// The server sent a `Content-Range` header that does not parse.
    #[error("Response includes content-range header which is invalid: {0}")]
    InvalidContentRange(String),

    /// The shared cancellation signal was raised.
    #[error("Download cancelled")]
    Cancelled,

    /// A scheduled unit of work panicked. The message is the panic payload.
    #[error("Task panicked: {0}")]
    Panicked(String),
}

impl Error {
    /// Whether this error was caused by cancellation rather than a real
    /// failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

/// Result type alias for bookfetch operations.
pub type Result<T> = std::result::Result<T, Error>;
