//! Bounded worker pool for independent calls.
//!
//! A fixed number of tokio tasks drain a bounded queue. When the queue is
//! full the submitting task runs the job itself.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::error::{Error, Result};

type Job = BoxFuture<'static, ()>;

/// Counters for how jobs were executed. Handy in tests and logs.
#[derive(Debug, Default)]
struct WorkerStats {
    queued: AtomicU64,
    caller_runs: AtomicU64,
}

/// A fixed-size pool of tokio tasks with caller-runs overflow.
pub struct WorkerPool {
    workers: usize,
    queue_capacity: usize,
    sender: mpsc::Sender<Job>,
    /// Held until the first job arrives. Workers are spawned lazily so a
    /// pool can be built outside a runtime.
    receiver: Mutex<Option<mpsc::Receiver<Job>>>,
    stats: WorkerStats,
}

impl WorkerPool {
    /// `workers` and `queue_capacity` are clamped to at least 1.
    pub fn new(workers: usize, queue_capacity: usize) -> Self {
        let workers = workers.max(1);
        let queue_capacity = queue_capacity.max(1);
        let (sender, receiver) = mpsc::channel(queue_capacity);
        Self {
            workers,
            queue_capacity,
            sender,
            receiver: Mutex::new(Some(receiver)),
            stats: WorkerStats::default(),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Jobs handed to worker tasks so far.
    pub fn queued_jobs(&self) -> u64 {
        self.stats.queued.load(Ordering::Relaxed)
    }

    /// Jobs that found the queue full and ran on the caller instead.
    pub fn caller_runs(&self) -> u64 {
        self.stats.caller_runs.load(Ordering::Relaxed)
    }

    /// Runs `future` on a worker, or on the calling task if the queue is full.
    pub async fn run<F, T>(&self, future: F) -> Result<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        self.ensure_started();

        let (tx, rx) = oneshot::channel();
        let job: Job = async move {
            let _ = tx.send(future.await);
        }
        .boxed();

        match self.sender.try_send(job) {
            Ok(()) => {
                self.stats.queued.fetch_add(1, Ordering::Relaxed);
            }
            Err(mpsc::error::TrySendError::Full(job))
            | Err(mpsc::error::TrySendError::Closed(job)) => {
                self.stats.caller_runs.fetch_add(1, Ordering::Relaxed);
                debug!(capacity = self.queue_capacity, "worker queue full, running on caller");
                job.await;
            }
        }

        rx.await
            .map_err(|_| Error::state("worker task dropped the job before it completed"))
    }

    fn ensure_started(&self) {
        let Some(receiver) = self.receiver.lock().take() else {
            return;
        };
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        for worker in 0..self.workers {
            let receiver = Arc::clone(&receiver);
            tokio::spawn(async move {
                loop {
                    // Lock only long enough to take the next job.
                    let job = receiver.lock().await.recv().await;
                    match job {
                        Some(job) => job.await,
                        None => break,
                    }
                }
                debug!(worker, "worker stopped");
            });
        }
        debug!(workers = self.workers, capacity = self.queue_capacity, "worker pool started");
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .field("queue_capacity", &self.queue_capacity)
            .finish()
    }
}
