//! Rate Limiter Integration Tests
//!
//! Bursts of narration-sized tasks against the default quota, with the tokio
//! clock paused so spacing and window ceilings are exact.

use futures_util::future::{join_all, BoxFuture};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use chalkline::{RateLimiter, RateLimiterConfig, RateLimiterError};

use crate::support::init_tracing;

fn record_start(
    log: &Arc<Mutex<Vec<(usize, Instant)>>>,
    id: usize,
    work: Duration,
) -> impl FnOnce() -> BoxFuture<'static, usize> {
    let log = Arc::clone(log);
    move || -> BoxFuture<'static, usize> {
        Box::pin(async move {
            log.lock().unwrap().push((id, Instant::now()));
            tokio::time::sleep(work).await;
            id
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_twenty_respects_quota() {
    init_tracing();
    let limiter = RateLimiter::default();
    let log = Arc::new(Mutex::new(Vec::new()));
    let origin = Instant::now();

    let calls: Vec<_> = (0..20)
        .map(|id| limiter.execute(record_start(&log, id, Duration::from_millis(300))))
        .collect();
    assert_eq!(limiter.queue_length(), 20);

    let results: Vec<usize> = join_all(calls)
        .await
        .into_iter()
        .map(Result::unwrap)
        .collect();
    assert_eq!(results, (0..20).collect::<Vec<_>>());

    let log = log.lock().unwrap().clone();
    let ids: Vec<_> = log.iter().map(|(id, _)| *id).collect();
    assert_eq!(ids, (0..20).collect::<Vec<_>>(), "FIFO start order");

    let starts: Vec<_> = log.iter().map(|(_, t)| *t - origin).collect();
    for pair in starts.windows(2) {
        assert!(pair[1] - pair[0] >= Duration::from_millis(6000));
    }
    for (i, start) in starts.iter().enumerate() {
        let in_window = starts[i..]
            .iter()
            .take_while(|s| **s - *start < Duration::from_secs(60))
            .count();
        assert!(in_window <= 10);
    }
    assert_eq!(starts[19], Duration::from_secs(114));
}

#[tokio::test(start_paused = true)]
async fn test_submissions_from_many_tasks_never_overlap() {
    init_tracing();
    let limiter = RateLimiter::new(RateLimiterConfig {
        max_calls_per_minute: 60,
        ..Default::default()
    });
    let running = Arc::new(Mutex::new(0usize));
    let max_seen = Arc::new(Mutex::new(0usize));

    let mut joins = Vec::new();
    for _ in 0..8 {
        let limiter = limiter.clone();
        let running = Arc::clone(&running);
        let max_seen = Arc::clone(&max_seen);
        joins.push(tokio::spawn(async move {
            limiter
                .execute(move || async move {
                    {
                        let mut r = running.lock().unwrap();
                        *r += 1;
                        let mut m = max_seen.lock().unwrap();
                        *m = (*m).max(*r);
                    }
                    tokio::time::sleep(Duration::from_millis(1500)).await;
                    *running.lock().unwrap() -= 1;
                })
                .await
        }));
    }
    for join in joins {
        join.await.unwrap().unwrap();
    }
    assert_eq!(*max_seen.lock().unwrap(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_idle_limiter_restarts_drain() {
    init_tracing();
    let limiter = RateLimiter::default();
    let first = limiter.execute(|| async { Instant::now() }).await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    let second = limiter.execute(|| async { Instant::now() }).await.unwrap();
    assert_eq!(second - first, Duration::from_secs(6));

    tokio::time::sleep(Duration::from_secs(30)).await;
    let third = limiter.execute(|| async { Instant::now() }).await.unwrap();
    assert_eq!(third - second, Duration::from_secs(30));
    assert_eq!(limiter.remaining_calls(), 7);
}

#[tokio::test(start_paused = true)]
async fn test_bounded_queue_rejects_overflow() {
    init_tracing();
    let limiter = RateLimiter::new(RateLimiterConfig {
        max_queue_len: Some(2),
        ..Default::default()
    });

    let accepted: Vec<_> = (0..2).map(|i| limiter.execute(move || async move { i })).collect();
    let overflow = limiter.execute(|| async { 99 }).await;
    assert_eq!(overflow, Err(RateLimiterError::QueueFull { capacity: 2 }));

    let results: Vec<_> = join_all(accepted).await;
    assert_eq!(results, vec![Ok(0), Ok(1)]);
}
