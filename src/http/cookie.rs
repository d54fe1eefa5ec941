//! Cookie sources for the HTTP client.
//!
//! Sessions exported from a browser arrive as Netscape `cookies.txt` files:
//! one cookie per line, seven tab-separated fields
//! (`domain`, `subdomains`, `path`, `secure`, `expires`, `name`, `value`).
//! Lines starting with `#` are comments, except the `#HttpOnly_` prefix
//! which marks an HTTP-only cookie.

use crate::error::{Error, Result};

use reqwest::cookie::Jar;
use reqwest::Url;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

const HTTP_ONLY_PREFIX: &str = "#HttpOnly_";

/// Where the client's cookies come from.
#[derive(Clone)]
pub enum CookieSource {
    /// A Netscape cookie file, read once when the client is built.
    File(PathBuf),
    /// A jar prepared by the caller.
    Jar(Arc<Jar>),
}

impl fmt::Debug for CookieSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CookieSource::File(path) => f.debug_tuple("File").field(path).finish(),
            CookieSource::Jar(_) => f.write_str("Jar(..)"),
        }
    }
}

impl CookieSource {
    /// Resolve the source into a shareable jar.
    pub fn into_jar(self) -> Result<Arc<Jar>> {
        match self {
            CookieSource::File(path) => load_cookie_file(&path).map(Arc::new),
            CookieSource::Jar(jar) => Ok(jar),
        }
    }
}

/// Load a Netscape cookie file into a new jar.
pub fn load_cookie_file(path: &Path) -> Result<Jar> {
    let text = std::fs::read_to_string(path)?;
    let jar = Jar::default();
    let mut loaded = 0usize;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        let line = match line.strip_prefix(HTTP_ONLY_PREFIX) {
            Some(rest) => rest,
            None if line.starts_with('#') => continue,
            None => line,
        };

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 7 {
            continue;
        }

        let domain = fields[0].trim();
        let path = match fields[2].trim() {
            "" => "/",
            p => p,
        };
        let name = fields[5].trim().trim_matches('"');
        let value = fields[6].trim().trim_matches('"');
        if domain.is_empty() || name.is_empty() {
            continue;
        }

        let host = domain.trim_start_matches('.');
        let url = Url::parse(&format!("https://{host}{path}"))
            .map_err(|e| Error::InvalidUrl(format!("cookie domain \"{domain}\": {e}")))?;
        jar.add_cookie_str(
            &format!("{name}={value}; Domain={host}; Path={path}"),
            &url,
        );
        loaded += 1;
    }

    debug!(path = %path.display(), loaded, "cookie file loaded");
    Ok(jar)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::cookie::CookieStore;

    #[test]
    fn test_load_cookie_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.txt");
        std::fs::write(
            &path,
            "# Netscape HTTP Cookie File\n\
             .library.example\tTRUE\t/\tFALSE\t0\tsession\tabc123\n\
             #HttpOnly_library.example\tFALSE\t/\tTRUE\t0\ttoken\t\"xyz\"\n\
             broken line\n",
        )
        .unwrap();

        let jar = load_cookie_file(&path).unwrap();
        let url = Url::parse("https://library.example/viewer").unwrap();
        let header = jar.cookies(&url).unwrap();
        let header = header.to_str().unwrap();
        assert!(header.contains("session=abc123"));
        assert!(header.contains("token=xyz"));
    }

    #[test]
    fn test_missing_cookie_file_is_io_error() {
        let result = CookieSource::File(PathBuf::from("/definitely/not/here.txt")).into_jar();
        assert!(matches!(result, Err(Error::IOError { .. })));
    }
}
