//! Download tasks and the transfer pipeline.
//!
//! - [`task`] - the [`DownloadTask`] submitted to the manager and its request
//! - [`summary`] - [`Status`], [`Phase`] and the batch [`Report`]
//! - [`probe`] - size and range support detection
//! - [`chunk`] - splitting a resource into byte ranges
//! - [`fetch`] - streaming ranges or whole bodies into the temporary file
//!
//! # Examples
//!
//! ```rust
//! use bookfetch::download::{plan_chunks, Chunk};
//!
//! // A small resource on a rangeable server, fetched two ways.
//! let chunks = plan_chunks(2, 4, None, None);
//! assert_eq!(chunks, vec![Chunk::new(0, 0), Chunk::new(1, 1)]);
//! ```

pub mod chunk;
pub mod fetch;
pub mod probe;
pub mod summary;
pub mod task;

pub use chunk::{chunk_size, default_concurrency, plan_chunks, Chunk, MIN_PARALLEL_SIZE};
pub use fetch::{fetch_chunk, fetch_chunks, fetch_fresh, fetch_whole, OffsetWriter};
pub use probe::{probe, Probe, ResourceInfo};
pub use summary::{Phase, Report, Status};
pub use task::{temp_path, DownloadTask, RequestSpec, TEMP_SUFFIX};
