//! Resource probing.
//!
//! Before anything is written, the engine asks the server how large the
//! resource is and whether it serves byte ranges. A `HEAD` is tried first;
//! when it does not give an exact length the probe falls back to a
//! `GET` of the first byte only. A server ignoring the range answers that
//! request with the full body, which is then kept and streamed as the
//! download itself.

use super::task::RequestSpec;
use crate::error::{Error, Result};
use crate::utils::{filename_from_disposition, header_content_length, is_chunked, parse_content_range};

use reqwest::header::{HeaderMap, ACCEPT_RANGES, CONTENT_DISPOSITION, CONTENT_RANGE, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use reqwest_middleware::{ClientWithMiddleware, RequestBuilder};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// What the server told us about a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceInfo {
    /// Size in bytes, 0 when unknown.
    pub size: u64,
    /// Whether byte-range requests are honoured.
    pub rangeable: bool,
    /// File name suggested by `Content-Disposition`.
    pub file_name: Option<String>,
    /// Value of `Content-Type`.
    pub content_type: Option<String>,
}

/// Result of a probe.
#[derive(Debug)]
pub struct Probe {
    pub info: ResourceInfo,
    /// A full-body response obtained while probing a server that ignored
    /// the range. Streaming it avoids a second request.
    pub response: Option<Response>,
}

/// Send `req`, giving up as soon as `cancel` fires.
pub(crate) async fn send(req: RequestBuilder, cancel: &CancellationToken) -> Result<Response> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        res = req.send() => Ok(res?),
    }
}

/// Fail on any status of 300 and above.
pub(crate) fn check_status(res: &Response) -> Result<()> {
    let status = res.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(Error::UnexpectedStatus {
            status,
            url: res.url().to_string(),
        })
    }
}

/// Determine size, range support and naming hints of `request`'s target.
pub async fn probe(
    client: &ClientWithMiddleware,
    request: &RequestSpec,
    cancel: &CancellationToken,
) -> Result<Probe> {
    let head = send(request.head(client), cancel).await?;
    if head.status() == StatusCode::OK {
        if let Some(size) = header_content_length(head.headers()) {
            let info = ResourceInfo {
                size,
                rangeable: accepts_ranges(head.headers()),
                ..naming_hints(head.headers())
            };
            debug!("HEAD {}: {} bytes, rangeable: {}", request.url, size, info.rangeable);
            return Ok(Probe { info, response: None });
        }
    }

    debug!(
        "HEAD {} answered {} without an exact length, probing with a range request",
        request.url,
        head.status()
    );
    let res = send(request.ranged(client, "bytes=0-0"), cancel).await?;
    check_status(&res)?;

    let hints = naming_hints(res.headers());
    if res.status() == StatusCode::PARTIAL_CONTENT {
        let value = res
            .headers()
            .get(CONTENT_RANGE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default();
        let (_, _, total) =
            parse_content_range(&value).ok_or_else(|| Error::InvalidContentRange(value.clone()))?;
        debug!("{} serves ranges, {} bytes", request.url, total);
        return Ok(Probe {
            info: ResourceInfo {
                size: total,
                rangeable: true,
                ..hints
            },
            response: None,
        });
    }

    let size = match header_content_length(res.headers()) {
        Some(len) => len,
        None if is_chunked(res.headers()) => 0,
        None => return Err(Error::UnknownSize),
    };
    debug!("{} ignores ranges, {} bytes", request.url, size);
    Ok(Probe {
        info: ResourceInfo {
            size,
            rangeable: false,
            ..hints
        },
        response: Some(res),
    })
}

fn accepts_ranges(headers: &HeaderMap) -> bool {
    headers
        .get(ACCEPT_RANGES)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(',').any(|unit| unit.trim().eq_ignore_ascii_case("bytes")))
        .unwrap_or(false)
}

fn naming_hints(headers: &HeaderMap) -> ResourceInfo {
    ResourceInfo {
        file_name: headers
            .get(CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_disposition),
        content_type: headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        ..ResourceInfo::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_accepts_ranges() {
        let mut headers = HeaderMap::new();
        assert!(!accepts_ranges(&headers));
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("none"));
        assert!(!accepts_ranges(&headers));
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("Bytes"));
        assert!(accepts_ranges(&headers));
    }

    #[test]
    fn test_naming_hints() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=\"scan.pdf\""),
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
        let hints = naming_hints(&headers);
        assert_eq!(hints.file_name.as_deref(), Some("scan.pdf"));
        assert_eq!(hints.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(hints.size, 0);
    }
}
