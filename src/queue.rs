//! Bounded-parallelism work queue.
//!
//! A [`Queue`] admits at most `capacity` units of work at once. Each unit
//! owns a semaphore permit for as long as it runs, so the slot comes back
//! whether the unit returns normally or panics. The same type bounds the
//! chunk fetchers of a single download and the downloads of a whole batch.
//!
//! ```rust
//! use bookfetch::Queue;
//!
//! # #[tokio::main]
//! # async fn main() -> bookfetch::Result<()> {
//! let mut queue = Queue::new(2);
//! for i in 0..5u32 {
//!     queue.go(async move { i * 2 }).await?;
//! }
//! let mut results: Vec<u32> = queue
//!     .wait()
//!     .await
//!     .into_iter()
//!     .collect::<bookfetch::Result<_>>()?;
//! results.sort();
//! assert_eq!(results, vec![0, 2, 4, 6, 8]);
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::warn;

/// A concurrency limiter running futures on the tokio runtime.
pub struct Queue<T> {
    capacity: usize,
    semaphore: Arc<Semaphore>,
    set: JoinSet<T>,
}

impl<T> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("capacity", &self.capacity)
            .field("active", &self.active())
            .field("scheduled", &self.set.len())
            .finish()
    }
}

impl<T> Queue<T> {
    /// Maximum number of concurrently running units.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of units currently holding a slot.
    pub fn active(&self) -> usize {
        self.capacity - self.semaphore.available_permits()
    }

    /// Number of units scheduled and not yet collected by [`Queue::wait`].
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Whether nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

impl<T: Send + 'static> Queue<T> {
    /// Creates a queue admitting `capacity` concurrent units. A capacity of
    /// zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
            set: JoinSet::new(),
        }
    }

    /// Schedules `work`, waiting for a free slot first.
    pub async fn go<F>(&mut self, work: F) -> Result<()>
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Error::Internal(format!("queue closed: {e}")))?;
        self.set.spawn(async move {
            let _permit = permit;
            work.await
        });
        Ok(())
    }

    /// Schedules `work` only if a slot is free right now.
    pub fn try_go<F>(&mut self, work: F) -> bool
    where
        F: Future<Output = T> + Send + 'static,
    {
        match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => {
                self.set.spawn(async move {
                    let _permit = permit;
                    work.await
                });
                true
            }
            Err(_) => false,
        }
    }

    /// Waits for every scheduled unit and returns their outcomes in
    /// completion order. A panicked unit yields [`Error::Panicked`].
    pub async fn wait(&mut self) -> Vec<Result<T>> {
        let mut results = Vec::with_capacity(self.set.len());
        while let Some(joined) = self.set.join_next().await {
            results.push(joined.map_err(recover));
        }
        results
    }
}

fn recover(e: JoinError) -> Error {
    if e.is_panic() {
        let message = panic_message(e.into_panic());
        warn!(panic = %message, "task panic recovered");
        Error::Panicked(message)
    } else {
        Error::Cancelled
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
