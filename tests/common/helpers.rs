#![allow(dead_code)]

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bookfetch::downloader::DownloadManagerBuilder;
use bookfetch::progress::{ProgressBarOpts, StyleOptions};
use bookfetch::HttpClientConfig;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use wiremock::{Request, Respond, ResponseTemplate};

/// Creates a temporary directory for testing purposes
pub fn create_temp_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temporary directory")
}

/// Creates a temporary file with the given content
pub fn create_temp_file(dir: &Path, filename: &str, content: &[u8]) -> PathBuf {
    let file_path = dir.join(filename);
    fs::write(&file_path, content).expect("Failed to write temporary file");
    file_path
}

/// Creates test file content of specified size. The period is prime so
/// that a chunk written at the wrong offset never lines up by accident.
pub fn create_test_content(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 251) as u8).collect()
}

/// Asserts that a file exists at the given path
pub fn assert_file_exists(path: &Path) {
    assert!(path.exists(), "File should exist at path: {:?}", path);
}

/// Asserts that a file holds exactly `expected`
pub fn assert_file_content(path: &Path, expected: &[u8]) {
    let actual = fs::read(path).expect("Failed to read file");
    assert_eq!(actual.len(), expected.len(), "File size mismatch at path: {:?}", path);
    assert!(actual == expected, "File content mismatch at path: {:?}", path);
}

/// A quiet manager builder with fast transport settings.
pub fn create_test_manager_builder() -> DownloadManagerBuilder {
    DownloadManagerBuilder::hidden()
        .retries(1)
        .timeout(Duration::from_secs(30))
        .refresh_interval(Duration::from_millis(20))
}

/// HTTP client configuration for tests
pub fn create_test_http_config(retries: u32, timeout: Duration) -> HttpClientConfig {
    HttpClientConfig {
        retries,
        timeout,
        retry_interval: Duration::from_millis(10),
        ..HttpClientConfig::default()
    }
}

/// Style options with every bar hidden
pub fn create_disabled_style_options() -> StyleOptions {
    StyleOptions::new(ProgressBarOpts::hidden(), ProgressBarOpts::hidden())
}

/// Byte ranges of the `Range` header of `request`, if any.
pub fn requested_range(request: &Request) -> Option<(u64, u64)> {
    let value = request.headers.get("range")?.to_str().ok()?;
    let (start, end) = value.strip_prefix("bytes=")?.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?))
}

/// Number of requests received with `method`.
pub async fn count_requests(server: &wiremock::MockServer, method: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.method.as_str() == method)
        .count()
}

/// Serves `body`, honouring `Range` headers with 206 partial responses.
pub struct RangeResponder {
    body: Arc<Vec<u8>>,
    short_at: Option<u64>,
    requests: Arc<AtomicUsize>,
}

impl RangeResponder {
    pub fn new(body: Vec<u8>) -> Self {
        Self {
            body: Arc::new(body),
            short_at: None,
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Answer the range starting at `start` with one byte missing.
    pub fn short_at(self, start: u64) -> Self {
        Self {
            short_at: Some(start),
            ..self
        }
    }

    pub fn requests(&self) -> Arc<AtomicUsize> {
        self.requests.clone()
    }
}

impl Respond for RangeResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let len = self.body.len() as u64;
        match requested_range(request) {
            Some((start, end)) if start < len => {
                let end = end.min(len - 1);
                let mut slice = self.body[start as usize..=end as usize].to_vec();
                if self.short_at == Some(start) {
                    slice.pop();
                }
                ResponseTemplate::new(206)
                    .insert_header("content-range", format!("bytes {start}-{end}/{len}").as_str())
                    .set_body_bytes(slice)
            }
            Some(_) => ResponseTemplate::new(416),
            None => ResponseTemplate::new(200).set_body_bytes(self.body.as_ref().clone()),
        }
    }
}

/// A plain HTTP/1.1 server for behaviour wiremock cannot express: bodies
/// that stop part way, and counting requests that are in flight at once.
///
/// `HEAD` is answered with 404. Every response closes its connection.
pub struct RawServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

#[derive(Debug, Clone, Copy)]
pub struct RawServerOptions {
    /// Size of the served resource; byte `i` is `i % 251`.
    pub total: u64,
    /// Answer `Range` requests with 206.
    pub ranges: bool,
    /// Send this many body bytes, then hold the connection open.
    pub stall_after: Option<usize>,
    /// Pause before answering each request.
    pub delay: Duration,
}

impl RawServer {
    pub async fn start(options: RawServerOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test server");
        let addr = listener.local_addr().expect("Failed to read local address");
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (gauge, high) = (in_flight.clone(), peak.clone());
        let handle = tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(serve_raw(socket, options, gauge.clone(), high.clone()));
            }
        });
        Self {
            addr,
            handle,
            in_flight,
            peak,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Highest number of GET requests being answered at the same time.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

impl Drop for RawServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve_raw(
    mut socket: TcpStream,
    options: RawServerOptions,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
) {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
    let head = String::from_utf8_lossy(&request).to_ascii_lowercase();
    if head.starts_with("head ") {
        let _ = socket
            .write_all(b"HTTP/1.1 404 Not Found\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
            .await;
        return;
    }

    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
    peak.fetch_max(now, Ordering::SeqCst);
    tokio::time::sleep(options.delay).await;

    let total = options.total;
    let range = head
        .lines()
        .find_map(|line| line.strip_prefix("range: bytes="))
        .and_then(|r| {
            let (start, end) = r.trim().split_once('-')?;
            Some((start.parse::<u64>().ok()?, end.parse::<u64>().ok()?))
        });
    let (mut header, start, end) = match range {
        Some((start, end)) if options.ranges && start < total => {
            let end = end.min(total - 1);
            (
                format!(
                    "HTTP/1.1 206 Partial Content\r\ncontent-range: bytes {start}-{end}/{total}\r\n"
                ),
                start,
                end,
            )
        }
        _ => ("HTTP/1.1 200 OK\r\n".to_string(), 0, total - 1),
    };
    header.push_str(&format!(
        "content-length: {}\r\nconnection: close\r\n\r\n",
        end - start + 1
    ));

    let mut body: Vec<u8> = (start..=end).map(|i| (i % 251) as u8).collect();
    if let Some(limit) = options.stall_after {
        body.truncate(limit);
    }
    // Released before answering, so a client cannot start its next request
    // while this one still counts.
    in_flight.fetch_sub(1, Ordering::SeqCst);
    let sent = async {
        socket.write_all(header.as_bytes()).await?;
        socket.write_all(&body).await?;
        socket.flush().await
    }
    .await;

    if sent.is_ok() && options.stall_after.is_some() {
        // Returns once the client hangs up.
        let _ = socket.read(&mut buf).await;
    }
}
