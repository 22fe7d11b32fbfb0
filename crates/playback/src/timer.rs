//! Countdown ticker

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Calls `on_tick` once per `period` until it returns `false`
///
/// The first call happens one full period after spawning. Ticks delayed by
/// a slow handler are not replayed in a burst.
pub(crate) fn spawn_ticker<F, Fut>(period: Duration, mut on_tick: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if !on_tick().await {
                break;
            }
        }
    })
}
