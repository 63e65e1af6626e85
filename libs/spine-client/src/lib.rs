//! Spine client
//!
//! Async client for the Spine SOAP backend. An SCR upload is accepted straight
//! away with a location to poll; the processing result shows up there after an
//! unpredictable delay that the remote announces through `Retry-After`.
//!
//! - [`protocol`] classifies a poll response as ready, not ready or unexpected
//! - [`polling`] runs the poll loop under server-directed backoff and a deadline
//! - [`submission`] sends the upload and the synchronous queries, once each
//! - [`flow`] ties them together behind [`SpineClient::submit_and_poll`]
//!
//! # Example
//!
//! ```rust,no_run
//! use spine_client::{CallerIdentity, RawBody, ReqwestTransport, SpineClient, SpineConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SpineConfig::new("https://spine.example.nhs.uk");
//! let transport = Arc::new(ReqwestTransport::new(config.request_timeout())?);
//! let client = SpineClient::new(transport, config.clone())?;
//!
//! let identity = CallerIdentity::new("200000000001").session_urid("555254240100");
//! let document = client
//!     .submit_and_poll(
//!         &RawBody,
//!         "<soap:Envelope/>",
//!         &identity,
//!         config.initial_wait(),
//!         config.repeat_timeout(),
//!     )
//!     .await?;
//! println!("{document}");
//! # Ok(())
//! # }
//! ```
pub mod config;
pub mod error;
pub mod flow;
pub mod headers;
pub mod mapping;
pub mod models;
pub mod pause;
pub mod polling;
pub mod protocol;
pub mod submission;
pub mod transport;

pub use config::SpineConfig;
pub use error::{
    ConfigError, FlowError, FlowPhase, MappingError, PollError, Result, SubmitError,
    TransportError,
};
pub use flow::{FlowState, SpineClient};
pub use headers::CallerIdentity;
pub use mapping::{RawBody, ResultMapper};
pub use models::{Method, RemoteRequest, RemoteResponse};
pub use pause::{Interrupted, Pause, TokioPause};
pub use polling::{PollSession, PollingEngine};
pub use protocol::{classify, PollOutcome};
pub use submission::{Acknowledgement, SubmissionClient};
pub use transport::{ReqwestTransport, Transport};

// Re-export header types used to build responses
pub use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
