//! Runs blocking vendor calls off the async scheduler.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::warn;

use crate::errors::{ServiceError, ServiceResult};

pub const DEFAULT_OFFLOAD_CAPACITY: usize = 16;

/// Bounded gate in front of `spawn_blocking`.
///
/// At most `capacity` closures run at once and up to `queue_depth` more wait
/// for a worker. A call arriving while both are full is refused with
/// [`ServiceError::Busy`].
#[derive(Debug, Clone)]
pub struct Offload {
    workers: Arc<Semaphore>,
    slots: Arc<Semaphore>,
    capacity: usize,
    queue_depth: usize,
}

impl Offload {
    /// Gate with `capacity` workers and a wait queue of the same length.
    pub fn new(capacity: usize) -> Self {
        Self::with_queue(capacity, capacity)
    }

    pub fn with_queue(capacity: usize, queue_depth: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            workers: Arc::new(Semaphore::new(capacity)),
            slots: Arc::new(Semaphore::new(capacity + queue_depth)),
            capacity,
            queue_depth,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn queue_depth(&self) -> usize {
        self.queue_depth
    }

    /// Workers not currently running a closure.
    pub fn available(&self) -> usize {
        self.workers.available_permits()
    }

    pub async fn run<F, T>(&self, task: F) -> ServiceResult<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let slot = self.slots.clone().try_acquire_owned().map_err(|_| {
            warn!(
                capacity = self.capacity,
                queue_depth = self.queue_depth,
                "blocking call queue is full"
            );
            ServiceError::Busy(
                "Too many voice platform calls in flight, try again shortly".to_string(),
            )
        })?;
        let worker = self
            .workers
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ServiceError::upstream("Voice platform worker pool is closed"))?;

        tokio::task::spawn_blocking(move || {
            let _held = (slot, worker);
            task()
        })
        .await
        .map_err(|e| {
            ServiceError::upstream(format!("Voice platform call did not complete: {}", e))
        })
    }
}

impl Default for Offload {
    fn default() -> Self {
        Self::new(DEFAULT_OFFLOAD_CAPACITY)
    }
}
