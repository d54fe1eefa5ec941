//! Writing response bodies to disk.
//!
//! Parallel transfers share one temporary file. It is sized once, up front,
//! and every chunk fetcher then opens its own handle, seeks to the start of
//! its range and streams into it. Ranges are disjoint, so the writers never
//! need to coordinate. A single-stream transfer writes the same temporary
//! file from offset zero.

use super::chunk::Chunk;
use super::probe::{check_status, send};
use super::task::RequestSpec;
use crate::error::{Error, Result};
use crate::progress::ProgressState;
use crate::queue::Queue;
use crate::utils::header_content_length;

use futures::StreamExt;
use reqwest::Response;
use reqwest_middleware::ClientWithMiddleware;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncSeekExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// A write handle positioned at a fixed offset of a file.
#[derive(Debug)]
pub struct OffsetWriter {
    file: File,
    offset: u64,
    written: u64,
}

impl OffsetWriter {
    /// Open the existing file at `path` for writing at `offset`.
    pub async fn open(path: &Path, offset: u64) -> Result<Self> {
        let mut file = OpenOptions::new().write(true).open(path).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        Ok(Self {
            file,
            offset,
            written: 0,
        })
    }

    /// Create (or truncate) the file at `path` and write from its start.
    pub async fn create(path: &Path) -> Result<Self> {
        let file = File::create(path).await?;
        Ok(Self {
            file,
            offset: 0,
            written: 0,
        })
    }

    /// Offset the writer started at.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append `buf` after the bytes written so far.
    pub async fn write(&mut self, buf: &[u8]) -> Result<()> {
        self.file.write_all(buf).await?;
        self.written += buf.len() as u64;
        Ok(())
    }

    /// Flush pending writes and return the number of bytes written.
    pub async fn finish(mut self) -> Result<u64> {
        self.file.flush().await?;
        Ok(self.written)
    }
}

/// Stream `res` into `writer`. With a `limit`, more bytes than announced
/// fail the transfer instead of spilling into a neighbouring range.
async fn stream_into(
    res: Response,
    mut writer: OffsetWriter,
    limit: Option<u64>,
    progress: &ProgressState,
    cancel: &CancellationToken,
) -> Result<u64> {
    let mut stream = res.bytes_stream();
    loop {
        let item = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            item = stream.next() => item,
        };
        let Some(item) = item else { break };
        let bytes = item?;

        if let Some(limit) = limit {
            let actual = writer.written() + bytes.len() as u64;
            if actual > limit {
                return Err(Error::LengthMismatch {
                    expected: limit,
                    actual,
                    range: format!(
                        "bytes={}-{}",
                        writer.offset(),
                        (writer.offset() + limit).saturating_sub(1)
                    ),
                });
            }
        }

        writer.write(&bytes).await?;
        progress.add(bytes.len() as u64);
    }
    writer.finish().await
}

/// Download `chunk` of the resource into the pre-sized file at `path`.
///
/// Returns the number of bytes written, which always equals the chunk's
/// length on success.
pub async fn fetch_chunk(
    client: &ClientWithMiddleware,
    request: &RequestSpec,
    chunk: Chunk,
    path: &Path,
    progress: &ProgressState,
    cancel: &CancellationToken,
) -> Result<u64> {
    let range = chunk.range_header();
    let res = send(request.ranged(client, &range), cancel).await?;
    check_status(&res)?;

    let actual = header_content_length(res.headers()).unwrap_or(0);
    if actual != chunk.len() {
        return Err(Error::LengthMismatch {
            expected: chunk.len(),
            actual,
            range,
        });
    }

    let writer = OffsetWriter::open(path, chunk.start).await?;
    let written = stream_into(res, writer, Some(chunk.len()), progress, cancel).await?;
    if written != chunk.len() {
        return Err(Error::LengthMismatch {
            expected: chunk.len(),
            actual: written,
            range,
        });
    }
    Ok(written)
}

/// Download every chunk into `path`, `threads` at a time.
///
/// The file is created and sized to `total` before any fetcher starts. The
/// first chunk to fail cancels the others and its error is returned.
#[allow(clippy::too_many_arguments)]
pub async fn fetch_chunks(
    client: &ClientWithMiddleware,
    request: Arc<RequestSpec>,
    chunks: Vec<Chunk>,
    total: u64,
    path: &Path,
    threads: usize,
    progress: Arc<ProgressState>,
    cancel: &CancellationToken,
) -> Result<u64> {
    let file = File::create(path).await?;
    file.set_len(total).await?;
    drop(file);

    let siblings = cancel.child_token();
    let path: Arc<PathBuf> = Arc::new(path.to_path_buf());
    let mut queue = Queue::new(threads);
    debug!("Fetching {} chunks of {} with {} threads", chunks.len(), request.url, threads);

    for chunk in chunks {
        if siblings.is_cancelled() {
            break;
        }
        let client = client.clone();
        let request = request.clone();
        let path = path.clone();
        let progress = progress.clone();
        let token = siblings.clone();
        queue
            .go(async move {
                let result = fetch_chunk(&client, &request, chunk, &path, &progress, &token).await;
                if let Err(e) = &result {
                    if !e.is_cancelled() {
                        warn!("Chunk {} of {} failed: {}", chunk, request.url, e);
                        token.cancel();
                    }
                }
                result
            })
            .await?;
    }

    let mut written = 0;
    let mut failure: Option<Error> = None;
    for result in queue.wait().await {
        match result.and_then(|inner| inner) {
            Ok(n) => written += n,
            Err(e) => match &failure {
                None => failure = Some(e),
                Some(first) if first.is_cancelled() && !e.is_cancelled() => failure = Some(e),
                Some(_) => {}
            },
        }
    }

    if let Some(e) = failure {
        return Err(e);
    }
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    if written != total {
        return Err(Error::LengthMismatch {
            expected: total,
            actual: written,
            range: format!("bytes=0-{}", total.saturating_sub(1)),
        });
    }
    Ok(written)
}

/// Stream a whole response body into a fresh file at `path`.
///
/// When `expected` is known, the number of bytes written must match it.
pub async fn fetch_whole(
    res: Response,
    path: &Path,
    progress: &ProgressState,
    cancel: &CancellationToken,
    expected: Option<u64>,
) -> Result<u64> {
    check_status(&res)?;
    let writer = OffsetWriter::create(path).await?;
    let written = stream_into(res, writer, expected, progress, cancel).await?;
    match expected {
        Some(expected) if expected != written => Err(Error::LengthMismatch {
            expected,
            actual: written,
            range: format!("bytes=0-{}", expected.saturating_sub(1)),
        }),
        _ => Ok(written),
    }
}

/// Issue `request` as described and stream its body into `path`.
pub async fn fetch_fresh(
    client: &ClientWithMiddleware,
    request: &RequestSpec,
    path: &Path,
    progress: &ProgressState,
    cancel: &CancellationToken,
) -> Result<u64> {
    let res = send(request.build(client), cancel).await?;
    check_status(&res)?;
    let expected = header_content_length(res.headers());
    if let Some(total) = expected {
        progress.set_total(total);
    }
    fetch_whole(res, path, progress, cancel, expected).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_offset_writers_fill_disjoint_ranges() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.bin");
        let file = File::create(&path).await.unwrap();
        file.set_len(10).await.unwrap();
        drop(file);

        let mut tail = OffsetWriter::open(&path, 5).await.unwrap();
        tail.write(b"56789").await.unwrap();
        assert_eq!(tail.finish().await.unwrap(), 5);

        let mut head = OffsetWriter::open(&path, 0).await.unwrap();
        head.write(b"01234").await.unwrap();
        assert_eq!(head.offset(), 0);
        assert_eq!(head.finish().await.unwrap(), 5);

        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"0123456789");
    }
}
