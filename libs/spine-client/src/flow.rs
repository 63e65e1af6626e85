//! Submit-then-poll flow
//!
//! ```text
//! Idle -> Submitted -> Accepted -> Polling -> Succeeded | PollFailed | TimedOut
//!                   \-> SubmitFailed
//! ```
//!
//! Submission failures never enter the polling state machine.

use std::time::Duration;

use crate::config::SpineConfig;
use crate::error::{ConfigError, FlowError, FlowPhase, Result};
use crate::headers::CallerIdentity;
use crate::mapping::ResultMapper;
use crate::pause::{Pause, TokioPause};
use crate::polling::PollingEngine;
use crate::submission::SubmissionClient;
use crate::transport::Transport;

/// Caller-visible state of one flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Submitted,
    Accepted,
    Polling,
    Succeeded,
    PollFailed,
    TimedOut,
    SubmitFailed,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            FlowState::Succeeded
                | FlowState::PollFailed
                | FlowState::TimedOut
                | FlowState::SubmitFailed
        )
    }

    pub fn can_transition_to(self, next: FlowState) -> bool {
        use FlowState::*;
        matches!(
            (self, next),
            (Idle, Submitted)
                | (Submitted, Accepted)
                | (Submitted, SubmitFailed)
                | (Accepted, Polling)
                | (Polling, Succeeded)
                | (Polling, PollFailed)
                | (Polling, TimedOut)
        )
    }

    /// Terminal state a flow ends in when it fails with `err`
    pub fn for_error(err: &FlowError) -> FlowState {
        match err {
            FlowError::SubmitFailed { .. } | FlowError::MissingPollLocation => {
                FlowState::SubmitFailed
            }
            FlowError::TransportFailed { phase, .. } => match phase {
                FlowPhase::Submit => FlowState::SubmitFailed,
                FlowPhase::Poll => FlowState::PollFailed,
            },
            FlowError::PollFailed { .. } | FlowError::Mapping(_) => FlowState::PollFailed,
            FlowError::TimedOut => FlowState::TimedOut,
        }
    }
}

/// Tracks the state of one flow and logs each transition
#[derive(Debug)]
struct FlowTracker {
    state: FlowState,
}

impl FlowTracker {
    fn new() -> Self {
        Self {
            state: FlowState::Idle,
        }
    }

    fn advance(&mut self, next: FlowState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid flow transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(from = ?self.state, to = ?next, "Flow state changed");
        self.state = next;
    }
}

/// Client for the asynchronous SCR upload: submit once, then poll for the result.
///
/// Holds no per-flow state, so one client can run many flows concurrently.
#[derive(Debug, Clone)]
pub struct SpineClient<T, P = TokioPause> {
    submission: SubmissionClient<T>,
    engine: PollingEngine<T, P>,
}

impl<T: Transport + Clone> SpineClient<T> {
    pub fn new(transport: T, config: SpineConfig) -> std::result::Result<Self, ConfigError> {
        Self::with_pause(transport, config, TokioPause)
    }
}

impl<T: Transport + Clone, P: Pause> SpineClient<T, P> {
    pub fn with_pause(
        transport: T,
        config: SpineConfig,
        pause: P,
    ) -> std::result::Result<Self, ConfigError> {
        let submission = SubmissionClient::new(transport.clone(), config)?;
        let engine = PollingEngine::with_pause(transport, pause);
        Ok(Self { submission, engine })
    }

    /// Single-shot operations (ACS, SCR ID query, alert)
    pub fn submission(&self) -> &SubmissionClient<T> {
        &self.submission
    }

    pub fn config(&self) -> &SpineConfig {
        self.submission.config()
    }

    /// Upload `body`, then poll its result location until the remote has
    /// processed it, and map the result with `mapper`.
    ///
    /// `total_timeout` bounds the polling phase and starts after `initial_wait`.
    pub async fn submit_and_poll<M: ResultMapper>(
        &self,
        mapper: &M,
        body: &str,
        identity: &CallerIdentity,
        initial_wait: Duration,
        total_timeout: Duration,
    ) -> Result<M::Document> {
        let mut tracker = FlowTracker::new();
        let result = self
            .run(&mut tracker, mapper, body, identity, initial_wait, total_timeout)
            .await;

        match &result {
            Ok(_) => tracker.advance(FlowState::Succeeded),
            Err(err) => {
                tracker.advance(FlowState::for_error(err));
                tracing::warn!(error = %err, submitted = err.was_submitted(), "SCR flow failed");
            }
        }
        result
    }

    async fn run<M: ResultMapper>(
        &self,
        tracker: &mut FlowTracker,
        mapper: &M,
        body: &str,
        identity: &CallerIdentity,
        initial_wait: Duration,
        total_timeout: Duration,
    ) -> Result<M::Document> {
        tracker.advance(FlowState::Submitted);
        let ack = self.submission.submit_scr(body, identity).await?;
        tracker.advance(FlowState::Accepted);

        tracker.advance(FlowState::Polling);
        let result = self
            .engine
            .poll(&ack.location, initial_wait, total_timeout, |location| {
                self.submission.poll_request(location, identity)
            })
            .await
            .map_err(FlowError::from)?;

        Ok(mapper.map(result.as_deref().unwrap_or_default())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MappingError, TransportError};

    #[test]
    fn test_terminal_states() {
        let terminal: Vec<_> = [
            FlowState::Idle,
            FlowState::Submitted,
            FlowState::Accepted,
            FlowState::Polling,
            FlowState::Succeeded,
            FlowState::PollFailed,
            FlowState::TimedOut,
            FlowState::SubmitFailed,
        ]
        .into_iter()
        .filter(|s| s.is_terminal())
        .collect();

        assert_eq!(
            terminal,
            vec![
                FlowState::Succeeded,
                FlowState::PollFailed,
                FlowState::TimedOut,
                FlowState::SubmitFailed
            ]
        );
    }

    #[test]
    fn test_submission_failure_never_enters_polling() {
        assert!(FlowState::Submitted.can_transition_to(FlowState::SubmitFailed));
        assert!(!FlowState::Submitted.can_transition_to(FlowState::Polling));
        assert!(!FlowState::Polling.can_transition_to(FlowState::SubmitFailed));
        assert!(!FlowState::Succeeded.can_transition_to(FlowState::Polling));
    }

    #[test]
    fn test_state_for_error() {
        let submit_transport = FlowError::TransportFailed {
            phase: FlowPhase::Submit,
            cause: TransportError::Other("refused".into()),
        };
        let poll_transport = FlowError::TransportFailed {
            phase: FlowPhase::Poll,
            cause: TransportError::Other("reset".into()),
        };

        assert_eq!(FlowState::for_error(&submit_transport), FlowState::SubmitFailed);
        assert_eq!(FlowState::for_error(&poll_transport), FlowState::PollFailed);
        assert_eq!(
            FlowState::for_error(&FlowError::MissingPollLocation),
            FlowState::SubmitFailed
        );
        assert_eq!(FlowState::for_error(&FlowError::TimedOut), FlowState::TimedOut);
        assert_eq!(
            FlowState::for_error(&FlowError::Mapping(MappingError("bad xml".into()))),
            FlowState::PollFailed
        );
    }
}
