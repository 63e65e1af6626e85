//! Adaptive polling engine
//!
//! Drives one [`PollSession`] to completion:
//!
//! 1. wait for the initial duration (the remote never has a result right away)
//! 2. check the deadline, then send one poll request
//! 3. classify the response and stop on `Ready` or `Unexpected`
//! 4. on `NotReady`, wait for the delay the remote asked for and loop
//!
//! A wait is cut short at the deadline and is never shorter than
//! [`MIN_RETRY_DELAY`], so a remote answering `Retry-After: 0` forever cannot
//! make the engine spin.
//!
//! Pacing belongs to the remote. The engine has no retry limit of its own and
//! only enforces the outer time box. Transport failures are never retried.

use std::time::Duration;

use tokio::time::Instant;
use tracing::Instrument;

use crate::error::{PollError, TransportError};
use crate::models::RemoteRequest;
use crate::pause::{Pause, TokioPause};
use crate::protocol::{classify, retry_delay, PollOutcome, ACCEPTED_STATUS};
use crate::transport::Transport;

/// Shortest wait between two poll requests, applied when the remote asks for
/// an immediate retry.
pub const MIN_RETRY_DELAY: Duration = Duration::from_millis(1);

/// State of a single polling operation.
///
/// Owned by one call to [`PollingEngine::poll`] and dropped when it returns.
#[derive(Debug)]
pub struct PollSession {
    location: String,
    started: Instant,
    deadline: Instant,
    attempts: u32,
    retry_count: u32,
    last_delay: Option<Duration>,
}

impl PollSession {
    /// Start a session now. The deadline is fixed here and never extended.
    pub fn start(location: impl Into<String>, budget: Duration) -> Self {
        let started = Instant::now();
        Self {
            location: location.into(),
            started,
            deadline: started + budget,
            attempts: 0,
            retry_count: 0,
            last_delay: None,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Time left before the deadline, zero once it has passed
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Poll requests sent so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// `NotReady` responses seen so far
    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn last_delay(&self) -> Option<Duration> {
        self.last_delay
    }

    fn record_attempt(&mut self) {
        self.attempts += 1;
    }

    fn record_not_ready(&mut self, delay: Duration) {
        self.retry_count += 1;
        self.last_delay = Some(delay);
    }
}

/// Polls a result location under server-directed backoff.
#[derive(Debug, Clone)]
pub struct PollingEngine<T, P = TokioPause> {
    transport: T,
    pause: P,
}

impl<T: Transport> PollingEngine<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            pause: TokioPause,
        }
    }
}

impl<T: Transport, P: Pause> PollingEngine<T, P> {
    pub fn with_pause(transport: T, pause: P) -> Self {
        Self { transport, pause }
    }

    /// Poll `location` until the remote returns a result, a protocol error, or
    /// `budget` runs out.
    ///
    /// `build_request` is called once per attempt with the poll location and
    /// must produce the same headers every time. The budget starts counting
    /// after `initial_wait`. The deadline is checked before every request, so
    /// no request is sent once it has passed.
    pub async fn poll<B>(
        &self,
        location: &str,
        initial_wait: Duration,
        budget: Duration,
        build_request: B,
    ) -> Result<Option<String>, PollError>
    where
        B: Fn(&str) -> Result<RemoteRequest, TransportError> + Send,
    {
        let span = tracing::info_span!("poll_result", location = %location);
        self.run(location, initial_wait, budget, build_request)
            .instrument(span)
            .await
    }

    async fn run<B>(
        &self,
        location: &str,
        initial_wait: Duration,
        budget: Duration,
        build_request: B,
    ) -> Result<Option<String>, PollError>
    where
        B: Fn(&str) -> Result<RemoteRequest, TransportError> + Send,
    {
        tracing::info!(
            initial_wait_ms = initial_wait.as_millis() as u64,
            "Starting polling result. First request after initial wait"
        );
        self.pause
            .pause(initial_wait)
            .await
            .map_err(|_| PollError::Interrupted { attempts: 0 })?;

        let mut session = PollSession::start(location, budget);

        loop {
            if session.is_expired() {
                return Err(timed_out(&session));
            }

            let request = build_request(session.location()).map_err(PollError::Transport)?;
            session.record_attempt();
            tracing::info!(
                retry_count = session.retry_count(),
                "Fetching processing result"
            );

            let response = self
                .transport
                .send(&request)
                .await
                .map_err(PollError::Transport)?;

            match classify(response) {
                PollOutcome::Ready { body } => {
                    tracing::info!(attempts = session.attempts(), "Processing result received");
                    return Ok(body);
                }
                PollOutcome::Unexpected { status_code } => {
                    if status_code == ACCEPTED_STATUS {
                        tracing::warn!(
                            status = status_code,
                            "Not-ready response without a usable Retry-After header"
                        );
                    } else {
                        tracing::error!(status = status_code, "Unexpected polling response");
                    }
                    return Err(PollError::Unexpected {
                        status: status_code,
                    });
                }
                PollOutcome::NotReady { retry_after_ms } => {
                    let delay = retry_delay(retry_after_ms);
                    if delay.is_zero() {
                        tracing::warn!("Remote asked for an immediate retry");
                    }
                    session.record_not_ready(delay);
                    tracing::info!(
                        status = ACCEPTED_STATUS,
                        next_retry_ms = retry_after_ms,
                        "Result not ready"
                    );

                    // A slow response may already have used up the budget.
                    if session.is_expired() {
                        return Err(timed_out(&session));
                    }
                    // Never sleep past the deadline; the check at the top of the loop ends it.
                    let wait = delay.max(MIN_RETRY_DELAY).min(session.remaining());
                    self.pause
                        .pause(wait)
                        .await
                        .map_err(|_| PollError::Interrupted {
                            attempts: session.attempts(),
                        })?;
                }
            }
        }
    }
}

fn timed_out(session: &PollSession) -> PollError {
    tracing::warn!(
        attempts = session.attempts(),
        elapsed_ms = session.elapsed().as_millis() as u64,
        "Polling yielded no result before the deadline"
    );
    PollError::TimedOut {
        attempts: session.attempts(),
        elapsed: session.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_session_deadline_is_fixed() {
        let session = PollSession::start("https://spine/poll", Duration::from_millis(500));
        let deadline = session.deadline();
        assert!(!session.is_expired());

        tokio::time::advance(Duration::from_millis(499)).await;
        assert!(!session.is_expired());
        assert_eq!(session.deadline(), deadline);

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(session.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_budget_is_expired_immediately() {
        let session = PollSession::start("https://spine/poll", Duration::ZERO);
        assert!(session.is_expired());
        assert_eq!(session.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_counts_down_to_zero() {
        let session = PollSession::start("https://spine/poll", Duration::from_millis(300));
        tokio::time::advance(Duration::from_millis(100)).await;
        assert_eq!(session.remaining(), Duration::from_millis(200));

        tokio::time::advance(Duration::from_millis(500)).await;
        assert_eq!(session.remaining(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_session_counters() {
        let mut session = PollSession::start("https://spine/poll", Duration::from_secs(1));
        session.record_attempt();
        session.record_not_ready(Duration::from_millis(30));
        session.record_attempt();

        assert_eq!(session.attempts(), 2);
        assert_eq!(session.retry_count(), 1);
        assert_eq!(session.last_delay(), Some(Duration::from_millis(30)));
        assert_eq!(session.location(), "https://spine/poll");
    }
}
