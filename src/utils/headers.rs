//! Response header and file name helpers.
//!
//! Content lengths are read straight from the header map rather than from
//! `Response::content_length`, which reports the body size hint and is
//! always zero for `HEAD` responses.

use reqwest::header::{HeaderMap, CONTENT_LENGTH, TRANSFER_ENCODING};
use reqwest::Url;

/// Parse a `Content-Range` header of the form `bytes start-end/total`.
///
/// Returns `(start, end, total)`. An unknown total (`*`) or any malformed
/// part yields `None`.
///
/// ```rust
/// use bookfetch::utils::parse_content_range;
///
/// assert_eq!(parse_content_range("bytes 0-0/2048"), Some((0, 0, 2048)));
/// assert_eq!(parse_content_range("bytes 0-0/*"), None);
/// ```
pub fn parse_content_range(value: &str) -> Option<(u64, u64, u64)> {
    let rest = value.trim().strip_prefix("bytes")?.trim_start();
    let (range, total) = rest.split_once('/')?;
    let (start, end) = range.trim().split_once('-')?;
    let start = start.trim().parse::<u64>().ok()?;
    let end = end.trim().parse::<u64>().ok()?;
    let total = total.trim().parse::<u64>().ok()?;
    if start > end || end >= total {
        return None;
    }
    Some((start, end, total))
}

/// The exact `Content-Length` announced by a response, if any.
pub fn header_content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

/// Whether the response body is sent with chunked transfer encoding.
pub fn is_chunked(headers: &HeaderMap) -> bool {
    headers
        .get_all(TRANSFER_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.to_ascii_lowercase().contains("chunked"))
}

/// Pull a safe file name out of a `Content-Disposition` header.
///
/// Names that try to escape the destination directory are rejected.
///
/// ```rust
/// use bookfetch::utils::filename_from_disposition;
///
/// assert_eq!(
///     filename_from_disposition(r#"attachment; filename="page-001.jpg""#),
///     Some("page-001.jpg".to_string())
/// );
/// assert_eq!(filename_from_disposition("attachment; filename=../etc/passwd"), None);
/// ```
pub fn filename_from_disposition(value: &str) -> Option<String> {
    let name = value.split(';').map(str::trim).find_map(|part| {
        let (key, val) = part.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("filename") {
            Some(val.trim().trim_matches('"').to_string())
        } else {
            None
        }
    })?;

    if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
        return None;
    }
    Some(name)
}

/// The percent-decoded last path segment of a URL, if it is not empty.
///
/// Only `%XX` escapes are decoded; `+` and `&` are kept as they are.
///
/// ```rust
/// use bookfetch::utils::filename_from_url;
/// use reqwest::Url;
///
/// let url = Url::parse("https://example.com/iiif/full%20page.jpg?x=1").unwrap();
/// assert_eq!(filename_from_url(&url), Some("full page.jpg".to_string()));
/// ```
pub fn filename_from_url(url: &Url) -> Option<String> {
    let segment = url.path_segments()?.next_back()?;
    if segment.is_empty() {
        return None;
    }
    let name = urlencoding::decode(segment).ok()?.into_owned();
    if name.is_empty() || name.contains('/') || name.contains('\\') || name == ".." {
        return None;
    }
    Some(name)
}

/// File extension commonly used for a MIME type.
pub fn extension_for_mime(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    match essence.as_str() {
        "application/zip" => Some(".zip"),
        "application/pdf" => Some(".pdf"),
        "image/jpeg" => Some(".jpg"),
        "image/png" => Some(".png"),
        "image/tiff" => Some(".tif"),
        "image/jp2" => Some(".jp2"),
        "text/plain" => Some(".txt"),
        _ => None,
    }
}
