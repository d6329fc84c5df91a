//! Job queue behavior tests
//!
//! Ordering within a bucket, isolation of failures and panics, cleanup of
//! idle buckets, and independence of different buckets.

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use murmur_core::{JobQueue, QueueError};
use tokio::sync::oneshot;

async fn wait_until_idle(queue: &JobQueue) {
    for _ in 0..1000 {
        if queue.is_idle() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("queue never went idle");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn jobs_in_one_bucket_run_in_order() {
    let queue = JobQueue::new();
    let log = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let log = Arc::clone(&log);
            let job = queue.run("bucket", async move {
                // Later jobs finish faster; ordering must still hold
                tokio::time::sleep(Duration::from_micros(100 - i)).await;
                log.lock().unwrap().push(i);
                i
            });
            tokio::spawn(job)
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap().unwrap(), i as u64);
    }
    assert_eq!(*log.lock().unwrap(), (0..100).collect::<Vec<u64>>());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn jobs_never_overlap_within_bucket() {
    let queue = JobQueue::new();
    let running = Arc::new(AtomicUsize::new(0));
    let max_seen = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let queue = queue.clone();
            let running = Arc::clone(&running);
            let max_seen = Arc::clone(&max_seen);
            tokio::spawn(async move {
                queue
                    .run("bucket", async move {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        running.fetch_sub(1, Ordering::SeqCst);
                    })
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(max_seen.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failing_job_does_not_block_bucket() {
    let queue = JobQueue::new();

    let first = queue.run("bucket", async { Err::<u32, &str>("boom") });
    let second = queue.run("bucket", async { Ok::<u32, &str>(2) });
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.unwrap(), Err("boom"));
    assert_eq!(second.unwrap(), Ok(2));
}

#[tokio::test]
async fn panicking_job_only_aborts_itself() {
    let queue = JobQueue::new();

    let first = queue.run("bucket", async {
        if true {
            panic!("job panicked");
        }
        1
    });
    let second = queue.run("bucket", async { 2 });
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first, Err(QueueError::JobAborted { bucket: "bucket".to_string() }));
    assert_eq!(second, Ok(2));
}

#[tokio::test]
async fn drained_buckets_are_removed() {
    let queue = JobQueue::new();

    queue.run("a", async {}).await.unwrap();
    queue.run("b", async {}).await.unwrap();

    wait_until_idle(&queue).await;
    assert_eq!(queue.bucket_count(), 0);
}

#[tokio::test]
async fn bucket_reused_after_cleanup() {
    let queue = JobQueue::new();

    assert_eq!(queue.run("bucket", async { 1 }).await, Ok(1));
    wait_until_idle(&queue).await;
    assert_eq!(queue.run("bucket", async { 2 }).await, Ok(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn blocked_bucket_does_not_block_others() {
    let queue = JobQueue::new();
    let (release, gate) = oneshot::channel::<()>();

    let blocked = tokio::spawn({
        let queue = queue.clone();
        async move {
            queue
                .run("slow", async move {
                    let _ = gate.await;
                    "slow"
                })
                .await
        }
    });

    // Give the blocked job a chance to start
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(queue.run("fast", async { "fast" }).await, Ok("fast"));
    assert!(!blocked.is_finished());

    release.send(()).unwrap();
    assert_eq!(blocked.await.unwrap(), Ok("slow"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pending_jobs_counted_while_blocked() {
    let queue = JobQueue::new();
    let (release, gate) = oneshot::channel::<()>();

    let blocked = tokio::spawn({
        let queue = queue.clone();
        async move { queue.run("bucket", async move { gate.await.is_ok() }).await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;

    let waiting: Vec<_> = (0..3)
        .map(|i| {
            let queue = queue.clone();
            tokio::spawn(async move { queue.run("bucket", async move { i }).await })
        })
        .collect();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(queue.pending("bucket"), 3);
    assert_eq!(queue.pending("other"), 0);

    release.send(()).unwrap();
    assert_eq!(blocked.await.unwrap(), Ok(true));
    for (i, handle) in waiting.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap(), Ok(i));
    }
}

#[tokio::test]
async fn small_gc_limit_preserves_order() {
    let queue = JobQueue::with_gc_limit(3);
    let log = Arc::new(Mutex::new(Vec::new()));

    let jobs: Vec<_> = (0..20)
        .map(|i| {
            let log = Arc::clone(&log);
            queue.run("bucket", async move {
                log.lock().unwrap().push(i);
                i
            })
        })
        .collect();

    let results = futures_join_all(jobs).await;

    assert_eq!(results, (0..20).map(Ok).collect::<Vec<_>>());
    assert_eq!(*log.lock().unwrap(), (0..20).collect::<Vec<_>>());
}

/// Await futures in order; each is already queued by `run` once polled.
async fn futures_join_all<F: std::future::Future>(futures: Vec<F>) -> Vec<F::Output> {
    let mut outputs = Vec::with_capacity(futures.len());
    for future in futures {
        outputs.push(future.await);
    }
    outputs
}
