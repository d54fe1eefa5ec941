//! Byte range planning.
//!
//! [`plan_chunks`] partitions `[0, total - 1]` into contiguous inclusive
//! ranges. The chunk size follows a fixed policy (see [`chunk_size`]);
//! chunk `i` starts at `i * size` and the last chunk absorbs the remainder,
//! so the ranges never overlap and never leave a gap.

use std::fmt;

/// Chunks at or above this size are halved.
pub const LARGE_CHUNK: u64 = 102_400_000;

/// Default smallest chunk: 2 MiB.
pub const DEFAULT_MIN_CHUNK: u64 = 2 * 1024 * 1024;

/// Resources smaller than this are always fetched in a single stream.
pub const MIN_PARALLEL_SIZE: u64 = 10 * 1024;

/// An inclusive byte range `[start, end]` of a remote resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Chunk {
    pub start: u64,
    pub end: u64,
}

impl Chunk {
    /// Create the range `[start, end]`.
    pub fn new(start: u64, end: u64) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// Number of bytes covered.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Value of the `Range` request header for this chunk.
    pub fn range_header(&self) -> String {
        format!("bytes={}-{}", self.start, self.end)
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Twice the number of logical CPUs.
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        * 2
}

/// Chunk size for a resource of `total` bytes split `concurrency` ways.
///
/// Starts from `total / concurrency`, halves it from [`LARGE_CHUNK`] up,
/// raises it to the floor (`min_chunk`, or 2 MiB capped at `total / 2`),
/// lowers it to `max_chunk` when one is set, and halves it once more if it
/// still covers the whole resource.
pub fn chunk_size(total: u64, concurrency: usize, min_chunk: Option<u64>, max_chunk: Option<u64>) -> u64 {
    let concurrency = match concurrency {
        0 => default_concurrency(),
        n => n,
    } as u64;

    let mut size = total / concurrency;
    if size >= LARGE_CHUNK {
        size /= 2;
    }

    let min = match min_chunk {
        Some(min) if min > 0 => min,
        _ if DEFAULT_MIN_CHUNK >= total => total / 2,
        _ => DEFAULT_MIN_CHUNK,
    };
    size = size.max(min);

    if let Some(max) = max_chunk.filter(|max| *max > 0) {
        size = size.min(max);
    }

    if size >= total {
        size = total / 2;
    }
    size
}

/// Split `[0, total - 1]` into chunks.
///
/// A zero `concurrency` means [`default_concurrency`]. Resources of zero
/// bytes produce no chunks; a single chunk is produced when `total` is 1,
/// when `concurrency` is 1, or when the policy yields a zero size.
///
/// ```rust
/// use bookfetch::download::{plan_chunks, Chunk};
///
/// let chunks = plan_chunks(10_000_000, 4, None, None);
/// assert_eq!(
///     chunks,
///     vec![
///         Chunk::new(0, 2_499_999),
///         Chunk::new(2_500_000, 4_999_999),
///         Chunk::new(5_000_000, 7_499_999),
///         Chunk::new(7_500_000, 9_999_999),
///     ]
/// );
/// ```
pub fn plan_chunks(
    total: u64,
    concurrency: usize,
    min_chunk: Option<u64>,
    max_chunk: Option<u64>,
) -> Vec<Chunk> {
    if total == 0 {
        return Vec::new();
    }
    if total == 1 || concurrency == 1 {
        return vec![Chunk::new(0, total - 1)];
    }

    let size = chunk_size(total, concurrency, min_chunk, max_chunk);
    if size == 0 {
        return vec![Chunk::new(0, total - 1)];
    }

    // Only the large-resource halving or an explicit ceiling may produce
    // more chunks than `concurrency`.
    let threads = match concurrency {
        0 => default_concurrency(),
        n => n,
    } as u64;
    let mut count = total / size;
    if max_chunk.filter(|max| *max > 0).is_none() && total / threads < LARGE_CHUNK {
        count = count.min(threads);
    }
    (0..count)
        .map(|i| {
            let start = i * size;
            let end = if i == count - 1 {
                total - 1
            } else {
                start + size - 1
            };
            Chunk::new(start, end)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_coverage(chunks: &[Chunk], total: u64) {
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].start, 0);
        assert_eq!(chunks[chunks.len() - 1].end, total - 1);
        for pair in chunks.windows(2) {
            assert_eq!(pair[1].start, pair[0].end + 1);
        }
        assert_eq!(chunks.iter().map(Chunk::len).sum::<u64>(), total);
    }

    #[test]
    fn test_ten_megabytes_four_ways() {
        let chunks = plan_chunks(10_000_000, 4, None, None);
        assert_eq!(chunks.len(), 4);
        assert!(chunks.iter().all(|c| c.len() == 2_500_000));
        assert_coverage(&chunks, 10_000_000);
    }

    #[test]
    fn test_small_sizes() {
        assert!(plan_chunks(0, 4, None, None).is_empty());
        assert_eq!(plan_chunks(1, 4, None, None), vec![Chunk::new(0, 0)]);
        assert_eq!(plan_chunks(2, 4, None, None), vec![Chunk::new(0, 0), Chunk::new(1, 1)]);
        assert_coverage(&plan_chunks(3, 4, None, None), 3);
        assert_eq!(plan_chunks(500, 1, None, None), vec![Chunk::new(0, 499)]);
    }

    #[test]
    fn test_min_floor() {
        // 3 MB split 8 ways is raised to the 2 MiB floor, which leaves room
        // for one chunk holding the remainder.
        let chunks = plan_chunks(3_000_000, 8, None, None);
        assert_eq!(chunks, vec![Chunk::new(0, 2_999_999)]);

        // 5 MB: two 2 MiB steps, the second one absorbing the tail.
        let chunks = plan_chunks(5_000_000, 8, None, None);
        assert_eq!(
            chunks,
            vec![Chunk::new(0, 2_097_151), Chunk::new(2_097_152, 4_999_999)]
        );
    }

    #[test]
    fn test_chunk_size_rules() {
        assert_eq!(chunk_size(10_000_000, 4, None, None), 2_500_000);
        // halved above the large chunk threshold
        assert_eq!(chunk_size(1_000_000_000, 4, None, None), 125_000_000);
        // explicit ceiling
        assert_eq!(chunk_size(10_000_000, 2, None, Some(1_000_000)), 1_000_000);
        // explicit floor
        assert_eq!(chunk_size(10_000_000, 8, Some(4_000_000), None), 4_000_000);
        // never the whole resource
        assert_eq!(chunk_size(1000, 2, Some(5000), None), 500);
    }

    #[test]
    fn test_coverage_across_many_sizes() {
        for total in [2u64, 3, 5, 7, 11, 1023, 4096, 2_097_153, 3_000_001, 9_999_999, 123_456_789] {
            for concurrency in 2..=9 {
                let chunks = plan_chunks(total, concurrency, None, None);
                assert_coverage(&chunks, total);
                assert!(chunks.len() <= concurrency, "{total} / {concurrency}");
            }
        }
    }

    #[test]
    fn test_count_capped_at_concurrency() {
        assert_eq!(plan_chunks(3, 2, None, None), vec![Chunk::new(0, 0), Chunk::new(1, 2)]);
        // an explicit ceiling may still split further
        assert_eq!(plan_chunks(3, 2, None, Some(1)).len(), 3);
    }

    #[test]
    fn test_range_header() {
        assert_eq!(Chunk::new(5, 9).range_header(), "bytes=5-9");
        assert_eq!(Chunk::new(5, 9).to_string(), "5-9");
    }
}
