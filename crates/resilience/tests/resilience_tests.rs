//! Integration tests for retry behaviour

use bedtime_resilience::{retry, ResilienceError, RetryPolicy};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(start_paused = true)]
async fn test_exponential_policy_waits_between_attempts() {
    let policy = RetryPolicy::new(4)
        .with_initial_delay(Duration::from_millis(100))
        .with_jitter(false);
    let start = tokio::time::Instant::now();

    let result = retry(&policy, |_| async { Err::<(), _>("down") }).await;

    assert!(matches!(
        result,
        Err(ResilienceError::RetriesExhausted { attempts: 4, .. })
    ));
    // 100 + 200 + 400
    assert_eq!(start.elapsed(), Duration::from_millis(700));
}

#[tokio::test(start_paused = true)]
async fn test_attempt_counter_is_shared_across_tasks() {
    let counter = Arc::new(AtomicUsize::new(0));
    let policy = RetryPolicy::fixed(3, Duration::from_millis(10));

    let c = counter.clone();
    let handle = tokio::spawn(async move {
        retry(&policy, move |_| {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("first attempt fails")
                } else {
                    Ok("loaded")
                }
            }
        })
        .await
    });

    let result = handle.await.expect("task should not panic");
    assert_eq!(result, Ok("loaded"));
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_single_attempt_policy_never_sleeps() {
    let start = tokio::time::Instant::now();
    let result = retry(&RetryPolicy::fixed(1, Duration::from_secs(5)), |_| async {
        Err::<(), _>("nope")
    })
    .await;

    assert!(result.is_err());
    assert_eq!(start.elapsed(), Duration::ZERO);
}
