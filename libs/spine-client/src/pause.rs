//! Suspension strategies used between poll attempts

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// The process could not honor a scheduled suspension
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("wait interrupted")]
pub struct Interrupted;

/// Suspends a polling flow for at least the requested duration.
///
/// Implementations must not return `Ok` early. Returning `Err(Interrupted)`
/// ends the flow; the engine never resumes a partially completed wait.
#[async_trait]
pub trait Pause: Send + Sync {
    async fn pause(&self, duration: Duration) -> Result<(), Interrupted>;
}

/// Sleeps on the tokio timer. Never interrupted.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioPause;

#[async_trait]
impl Pause for TokioPause {
    async fn pause(&self, duration: Duration) -> Result<(), Interrupted> {
        if duration.is_zero() {
            // Still hand control back to the scheduler so a zero directive cannot spin.
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(duration).await;
        }
        Ok(())
    }
}

#[async_trait]
impl<P: Pause + ?Sized> Pause for Arc<P> {
    async fn pause(&self, duration: Duration) -> Result<(), Interrupted> {
        (**self).pause(duration).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Instant;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_pause_waits_at_least_duration() {
        let start = Instant::now();
        TokioPause.pause(Duration::from_millis(80)).await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_pause_zero_returns() {
        assert_eq!(TokioPause.pause(Duration::ZERO).await, Ok(()));
    }
}
