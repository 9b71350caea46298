use std::future::Future;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{Level, event};

/// Runs `step` immediately, then every `interval`, until `token` is
/// cancelled. Errors are logged and the loop keeps going.
///
/// A step still running when the token is cancelled is dropped.
pub async fn run_periodically<F, Fut>(
    name: &str,
    interval: Duration,
    token: CancellationToken,
    mut step: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            result = step() => {
                if let Err(error) = result {
                    event!(Level::ERROR, "{} failed: {:#}", name, error);
                }
            }
        }
    }

    event!(Level::INFO, "{} stopped", name);
}
