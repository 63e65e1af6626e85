//! Signal-aware suspension
//!
//! A poll flow spends most of its life waiting on the remote. [`SignalPause`]
//! cuts those waits short once SIGINT or SIGTERM arrives, which the flow
//! reports as a timeout. A second signal exits the process at once, even
//! while a request is in flight.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use spine_client::{Interrupted, Pause, TokioPause};
use tokio::sync::watch;

/// Exit status after a forced shutdown (128 + SIGINT)
const FORCED_EXIT_CODE: i32 = 130;

/// Pause that is interrupted by a shutdown signal.
///
/// A signal received while a request is in flight interrupts the next wait.
#[derive(Debug, Clone)]
pub struct SignalPause {
    shutdown: watch::Receiver<bool>,
}

impl SignalPause {
    /// Spawn the signal listener. Must be called inside a tokio runtime.
    ///
    /// Installing it replaces the default SIGINT/SIGTERM action for the rest
    /// of the process.
    pub fn install() -> Self {
        let (tx, rx) = watch::channel(false);
        tokio::spawn(async move {
            match relay_signals(tx, shutdown_signal).await {
                Ok(()) => {
                    tracing::warn!("Second shutdown signal received, exiting");
                    std::process::exit(FORCED_EXIT_CODE);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to install signal handlers, waits cannot be interrupted");
                }
            }
        });
        Self::from_receiver(rx)
    }

    fn from_receiver(shutdown: watch::Receiver<bool>) -> Self {
        Self { shutdown }
    }
}

#[async_trait]
impl Pause for SignalPause {
    async fn pause(&self, duration: Duration) -> Result<(), Interrupted> {
        let mut shutdown = self.shutdown.clone();
        if *shutdown.borrow() {
            return Err(Interrupted);
        }

        let signalled = async move {
            // A listener that went away without a signal never interrupts.
            if shutdown.wait_for(|stopped| *stopped).await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            result = TokioPause.pause(duration) => result,
            () = signalled => Err(Interrupted),
        }
    }
}

/// Flip `shutdown` on the first signal, then resolve on the second one.
async fn relay_signals<F, Fut>(
    shutdown: watch::Sender<bool>,
    mut next_signal: F,
) -> std::io::Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::io::Result<()>>,
{
    next_signal().await?;
    let _ = shutdown.send(true);
    next_signal().await
}

/// Wait for SIGTERM or SIGINT
#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;
    let sigint = tokio::signal::ctrl_c();

    tokio::select! {
        result = sigint => {
            result?;
            tracing::info!("SIGINT received, abandoning wait");
        }
        _ = sigterm.recv() => {
            tracing::info!("SIGTERM received, abandoning wait");
        }
    }
    Ok(())
}

/// Wait for Ctrl+C (SIGINT only on non-Unix platforms)
#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, abandoning wait");
    Ok(())
}
