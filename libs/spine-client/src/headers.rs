//! Spine HTTP header names and caller identity propagation
//!
//! Identity and correlation values are threaded explicitly through every
//! request a flow makes. They are copied verbatim and never renegotiated while
//! a result is being polled.

use crate::models::RemoteRequestBuilder;

pub const SOAP_ACTION: &str = "SOAPAction";
pub const CONTENT_TYPE: &str = "Content-Type";
pub const NHSD_ASID: &str = "NHSD-ASID";
pub const NHSD_IDENTITY: &str = "NHSD-Identity-UUID";
pub const NHSD_SESSION_URID: &str = "NHSD-Session-URID";
pub const NHSD_CORRELATION_ID: &str = "NHSD-Correlation-ID";
pub const NHSD_REQUEST_ID: &str = "NHSD-Request-ID";

/// Identity of the caller on whose behalf a flow runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallerIdentity {
    /// Accredited System ID of the calling system
    pub asid: String,
    pub identity: Option<String>,
    pub session_urid: Option<String>,
    pub correlation_id: Option<String>,
    pub request_id: Option<String>,
}

impl CallerIdentity {
    pub fn new(asid: impl Into<String>) -> Self {
        Self {
            asid: asid.into(),
            ..Self::default()
        }
    }

    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn session_urid(mut self, session_urid: impl Into<String>) -> Self {
        self.session_urid = Some(session_urid.into());
        self
    }

    pub fn correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Set every identity header on `builder`. Absent optional values are skipped.
    pub fn apply(&self, builder: RemoteRequestBuilder) -> RemoteRequestBuilder {
        let mut builder = builder.header(NHSD_ASID, &self.asid);
        let optional = [
            (NHSD_IDENTITY, &self.identity),
            (NHSD_SESSION_URID, &self.session_urid),
            (NHSD_CORRELATION_ID, &self.correlation_id),
            (NHSD_REQUEST_ID, &self.request_id),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                builder = builder.header(name, value);
            }
        }
        builder
    }
}
