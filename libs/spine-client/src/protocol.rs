//! Remote result protocol
//!
//! Maps one poll response onto a [`PollOutcome`] by looking only at the status
//! code and the `Retry-After` header. The payload is never interpreted.
//!
//! The Spine `Retry-After` directive is an integer count of MILLISECONDS, not
//! the seconds used by RFC 9110. An HTTP-date, a negative number or a fractional
//! value is a protocol violation.

use std::time::Duration;

use reqwest::header::RETRY_AFTER;

use crate::models::RemoteResponse;

/// Status of a poll whose result is ready
pub const READY_STATUS: u16 = 200;

/// Status of an accepted submission, and of a poll whose result is still processing
pub const ACCEPTED_STATUS: u16 = 202;

/// Classification of a single poll response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Terminal success
    Ready { body: Option<String> },
    /// The remote is still processing; ask again after `retry_after_ms`
    NotReady { retry_after_ms: u64 },
    /// Terminal failure, including a not-ready status without a usable directive
    Unexpected { status_code: u16 },
}

impl PollOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollOutcome::NotReady { .. })
    }
}

/// Classify a poll response.
pub fn classify(response: RemoteResponse) -> PollOutcome {
    match response.status {
        READY_STATUS => PollOutcome::Ready {
            body: response.body,
        },
        ACCEPTED_STATUS => match response
            .header(RETRY_AFTER.as_str())
            .and_then(parse_retry_after)
        {
            Some(retry_after_ms) => PollOutcome::NotReady { retry_after_ms },
            None => PollOutcome::Unexpected {
                status_code: ACCEPTED_STATUS,
            },
        },
        status_code => PollOutcome::Unexpected { status_code },
    }
}

/// Parse a `Retry-After` value as a non-negative integer of milliseconds.
pub fn parse_retry_after(value: &str) -> Option<u64> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

/// Delay requested by a `NotReady` outcome
pub fn retry_delay(retry_after_ms: u64) -> Duration {
    Duration::from_millis(retry_after_ms)
}
