//! Per-identity job serializer
//!
//! Maps a bucket key (the canonical identity string) to a FIFO of pending
//! jobs. Exactly one job per bucket runs at a time; buckets run
//! independently of each other.
//!
//! # Lifecycle
//!
//! ```text
//! run(bucket, job)
//!   bucket absent  -> create bucket, push job, spawn drain task
//!   bucket present -> push job (running drain task will reach it)
//!
//! drain task
//!   loop: take next job, run it to completion, repeat
//!   queue exhausted -> remove bucket under the lock, exit
//! ```
//!
//! # Invariants
//!
//! - At most one drain task per bucket: a bucket is created and removed
//!   under the same lock that `run` uses to decide whether to spawn one
//! - A failing or panicking job only resolves its own result handle
//! - Idle buckets are removed, so the map only holds identities with work

use std::{
    collections::HashMap,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use thiserror::Error;
use tokio::sync::oneshot;

/// Processed jobs are spliced off a bucket's backlog once this many have
/// accumulated.
pub const DEFAULT_GC_LIMIT: usize = 10_000;

type Job = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Errors from the job serializer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Job panicked or was dropped before producing a result
    #[error("job aborted in bucket {bucket}")]
    JobAborted {
        /// Bucket the job was queued on
        bucket: String,
    },
}

/// Per-identity FIFO job serializer.
///
/// Cheap to clone; clones share the same buckets. Must be used from within a
/// Tokio runtime.
#[derive(Clone)]
pub struct JobQueue {
    inner: Arc<Inner>,
}

struct Inner {
    buckets: Mutex<HashMap<String, Bucket>>,
    gc_limit: usize,
}

impl Inner {
    fn buckets(&self) -> MutexGuard<'_, HashMap<String, Bucket>> {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Pending jobs of one bucket.
///
/// Jobs before `offset` have been taken. The backing vector is only
/// compacted once `offset` reaches the gc limit.
#[derive(Default)]
struct Bucket {
    jobs: Vec<Option<Job>>,
    offset: usize,
}

impl Bucket {
    fn push(&mut self, job: Job) {
        self.jobs.push(Some(job));
    }

    /// Take the next job. `None` once the backlog is exhausted.
    fn pop(&mut self, gc_limit: usize) -> Option<Job> {
        while self.offset < self.jobs.len() {
            let job = self.jobs[self.offset].take();
            self.offset += 1;

            if self.offset >= gc_limit {
                self.jobs.drain(..self.offset);
                self.offset = 0;
            }

            if job.is_some() {
                return job;
            }
        }
        None
    }

    fn pending(&self) -> usize {
        self.jobs.len() - self.offset
    }
}

impl JobQueue {
    /// Create a serializer with the default compaction threshold.
    pub fn new() -> Self {
        Self::with_gc_limit(DEFAULT_GC_LIMIT)
    }

    /// Create a serializer that compacts a bucket's backlog after `gc_limit`
    /// processed jobs.
    pub fn with_gc_limit(gc_limit: usize) -> Self {
        Self {
            inner: Arc::new(Inner { buckets: Mutex::new(HashMap::new()), gc_limit: gc_limit.max(1) }),
        }
    }

    /// Queue `job` on `bucket` behind every job already queued there. The
    /// returned future resolves to the job's output.
    ///
    /// The job is queued when this is called, not when the returned future is
    /// first polled, and runs to completion even if that future is dropped.
    ///
    /// # Errors
    ///
    /// - `QueueError::JobAborted` if the job panicked
    pub fn run<F, T>(
        &self,
        bucket: &str,
        job: F,
    ) -> impl Future<Output = Result<T, QueueError>> + Send + use<F, T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            // Receiver may be gone if the caller stopped waiting
            let _ = tx.send(job.await);
        });

        let start_drain = {
            let mut buckets = self.inner.buckets();
            match buckets.get_mut(bucket) {
                Some(pending) => {
                    pending.push(job);
                    tracing::debug!(bucket, pending = pending.pending(), "job queued");
                    false
                },
                None => {
                    let mut fresh = Bucket::default();
                    fresh.push(job);
                    buckets.insert(bucket.to_string(), fresh);
                    true
                },
            }
        };

        if start_drain {
            tracing::debug!(bucket, "starting bucket drain");
            tokio::spawn(drain(Arc::clone(&self.inner), bucket.to_string()));
        }

        let bucket = bucket.to_string();
        async move { rx.await.map_err(|_| QueueError::JobAborted { bucket }) }
    }

    /// Number of buckets with queued or running work.
    pub fn bucket_count(&self) -> usize {
        self.inner.buckets().len()
    }

    /// True if no bucket has queued or running work.
    pub fn is_idle(&self) -> bool {
        self.bucket_count() == 0
    }

    /// Jobs queued on `bucket` that have not started yet.
    pub fn pending(&self, bucket: &str) -> usize {
        self.inner.buckets().get(bucket).map_or(0, Bucket::pending)
    }
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobQueue")
            .field("buckets", &self.bucket_count())
            .field("gc_limit", &self.inner.gc_limit)
            .finish()
    }
}

async fn drain(inner: Arc<Inner>, bucket: String) {
    loop {
        let job = {
            let mut buckets = inner.buckets();
            let Some(pending) = buckets.get_mut(&bucket) else {
                return;
            };
            match pending.pop(inner.gc_limit) {
                Some(job) => job,
                None => {
                    buckets.remove(&bucket);
                    tracing::debug!(bucket = %bucket, "bucket drained");
                    return;
                },
            }
        };

        // Run on its own task so a panic only aborts this job
        if let Err(err) = tokio::spawn(job).await {
            tracing::warn!(bucket = %bucket, error = %err, "queued job aborted");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Job {
        Box::pin(async {})
    }

    #[test]
    fn bucket_advances_offset_below_limit() {
        let mut bucket = Bucket::default();
        for _ in 0..5 {
            bucket.push(noop());
        }

        assert!(bucket.pop(10).is_some());
        assert!(bucket.pop(10).is_some());

        assert_eq!(bucket.offset, 2);
        assert_eq!(bucket.jobs.len(), 5);
        assert_eq!(bucket.pending(), 3);
    }

    #[test]
    fn bucket_compacts_at_limit() {
        let mut bucket = Bucket::default();
        for _ in 0..5 {
            bucket.push(noop());
        }

        for _ in 0..3 {
            assert!(bucket.pop(3).is_some());
        }

        assert_eq!(bucket.offset, 0);
        assert_eq!(bucket.jobs.len(), 2);
        assert_eq!(bucket.pending(), 2);
    }

    #[test]
    fn bucket_exhausts() {
        let mut bucket = Bucket::default();
        bucket.push(noop());

        assert!(bucket.pop(10).is_some());
        assert!(bucket.pop(10).is_none());
        assert_eq!(bucket.pending(), 0);
    }

    #[tokio::test]
    async fn run_returns_job_output() {
        let queue = JobQueue::new();

        let value = queue.run("bucket", async { 41 + 1 }).await.unwrap();

        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn idle_after_completion() {
        let queue = JobQueue::new();
        queue.run("bucket", async {}).await.unwrap();

        // The drain task removes the bucket right after the last job
        for _ in 0..100 {
            if queue.is_idle() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(queue.is_idle());
    }
}
