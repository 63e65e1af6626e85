//! Error types for spine-client
//!
//! Each stage of a flow has its own error enum. [`FlowError`] is the single
//! caller-facing type and keeps "never submitted" apart from "submitted, then
//! lost" so callers know whether a resubmission is safe.

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for a complete submit-and-poll flow
pub type Result<T> = std::result::Result<T, FlowError>;

/// Failure to obtain any response from the remote
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid header {name}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("Transport error: {0}")]
    Other(String),
}

/// Invalid client configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid URL {url}: {reason}")]
    Url { url: String, reason: url::ParseError },
}

/// The mapping layer could not turn a ready body into a document
#[derive(Error, Debug)]
#[error("Mapping error: {0}")]
pub struct MappingError(pub String);

/// Terminal failure of the polling phase
#[derive(Error, Debug)]
pub enum PollError {
    #[error("Transport failure while polling: {0}")]
    Transport(#[source] TransportError),

    #[error("Unexpected polling response {status}")]
    Unexpected { status: u16 },

    #[error("Polling yielded no result after {attempts} attempts in {elapsed:?}")]
    TimedOut { attempts: u32, elapsed: Duration },

    #[error("Wait between polls was interrupted after {attempts} attempts")]
    Interrupted { attempts: u32 },
}

/// Failure of a single-shot request to the remote
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("Unexpected {operation} response {status}")]
    Rejected {
        operation: &'static str,
        status: u16,
    },

    #[error("Accepted response ({status}) has no Content-Location header")]
    MissingLocation { status: u16 },
}

/// Which half of a flow a transport failure happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowPhase {
    Submit,
    Poll,
}

impl fmt::Display for FlowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowPhase::Submit => write!(f, "submission"),
            FlowPhase::Poll => write!(f, "polling"),
        }
    }
}

/// Caller-facing outcome of a failed submit-and-poll flow
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Submission rejected with status {status}")]
    SubmitFailed { status: u16 },

    #[error("Submission accepted without a poll location")]
    MissingPollLocation,

    #[error("Transport failure during {phase}: {cause}")]
    TransportFailed {
        phase: FlowPhase,
        #[source]
        cause: TransportError,
    },

    #[error("Polling failed with status {status}")]
    PollFailed { status: u16 },

    #[error("Polling yielded no result before the deadline")]
    TimedOut,

    #[error(transparent)]
    Mapping(#[from] MappingError),
}

impl FlowError {
    /// Whether the remote accepted the submission before the flow failed.
    ///
    /// When this is `true` the document may still be processed remotely, so an
    /// automatic resubmission could duplicate it.
    pub fn was_submitted(&self) -> bool {
        match self {
            FlowError::SubmitFailed { .. } => false,
            FlowError::TransportFailed { phase, .. } => *phase == FlowPhase::Poll,
            // Accepted with 202, only the location to poll is missing.
            FlowError::MissingPollLocation
            | FlowError::PollFailed { .. }
            | FlowError::TimedOut
            | FlowError::Mapping(_) => true,
        }
    }
}

impl From<SubmitError> for FlowError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Transport(cause) => FlowError::TransportFailed {
                phase: FlowPhase::Submit,
                cause,
            },
            SubmitError::Rejected { status, .. } => FlowError::SubmitFailed { status },
            SubmitError::MissingLocation { .. } => FlowError::MissingPollLocation,
        }
    }
}

impl From<PollError> for FlowError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::Transport(cause) => FlowError::TransportFailed {
                phase: FlowPhase::Poll,
                cause,
            },
            PollError::Unexpected { status } => FlowError::PollFailed { status },
            // An interrupted wait means we can no longer wait for the backend.
            PollError::TimedOut { .. } | PollError::Interrupted { .. } => FlowError::TimedOut,
        }
    }
}
