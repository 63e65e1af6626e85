//! Submission client
//!
//! Single-shot requests to the remote. Nothing here is retried: an SCR upload
//! is not idempotent, and retries belong to the polling phase only.

use tracing::{debug, error, info};

use crate::config::SpineConfig;
use crate::error::{ConfigError, SubmitError, TransportError};
use crate::headers::{CallerIdentity, CONTENT_TYPE, NHSD_ASID, SOAP_ACTION};
use crate::models::{RemoteRequest, RemoteResponse};
use crate::protocol::{ACCEPTED_STATUS, READY_STATUS};
use crate::transport::Transport;

pub const UPLOAD_SCR_SOAP_ACTION: &str = "urn:nhs:names:services:psis/REPC_IN150016SM05";
pub const UPLOAD_SCR_CONTENT_TYPE: &str = "multipart/related; boundary=\"--=_MIME-Boundary\"; type=\"text/xml\"; start=\"<ebXMLHeader@spine.nhs.uk>\"";
pub const GET_SCR_ID_SOAP_ACTION: &str = "urn:nhs:names:services:psisquery/QUPC_IN180000SM04";
pub const TEXT_XML: &str = "text/xml";
pub const FHIR_JSON: &str = "application/fhir+json";

/// Response header carrying the poll location of an accepted upload
pub const CONTENT_LOCATION: &str = "Content-Location";

/// An upload the remote has accepted for asynchronous processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    /// Absolute URL to poll for the processing result
    pub location: String,
}

/// Sends submissions and synchronous queries to the remote
#[derive(Debug, Clone)]
pub struct SubmissionClient<T> {
    transport: T,
    config: SpineConfig,
}

impl<T: Transport> SubmissionClient<T> {
    pub fn new(transport: T, config: SpineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { transport, config })
    }

    pub fn config(&self) -> &SpineConfig {
        &self.config
    }

    /// Upload a serialized SCR message.
    ///
    /// Succeeds only on `202 Accepted` with a `Content-Location` header. Any
    /// other status is returned as [`SubmitError::Rejected`].
    pub async fn submit_scr(
        &self,
        body: &str,
        identity: &CallerIdentity,
    ) -> Result<Acknowledgement, SubmitError> {
        let url = self.config.endpoint_url(&self.config.scr_endpoint);
        debug!(url = %url, "Sending SCR upload request to Spine");

        let builder = RemoteRequest::post(url)
            .header(SOAP_ACTION, UPLOAD_SCR_SOAP_ACTION)
            .header(CONTENT_TYPE, UPLOAD_SCR_CONTENT_TYPE);
        let request = identity.apply(builder).body(body).build()?;

        let response = self.transport.send(&request).await?;
        if response.status != ACCEPTED_STATUS {
            error!(status = response.status, "Unexpected Spine SCR POST response");
            return Err(SubmitError::Rejected {
                operation: "SCR upload",
                status: response.status,
            });
        }

        let location = response
            .header(CONTENT_LOCATION)
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .ok_or(SubmitError::MissingLocation {
                status: response.status,
            })?;
        let location = self.config.resolve_location(location);
        info!(location = %location, "SCR upload accepted");

        Ok(Acknowledgement { location })
    }

    /// Build the GET request for one poll attempt.
    ///
    /// Carries the same identity headers as the upload.
    pub fn poll_request(
        &self,
        location: &str,
        identity: &CallerIdentity,
    ) -> Result<RemoteRequest, TransportError> {
        identity.apply(RemoteRequest::get(location)).build()
    }

    /// Send ACS data. The response is returned whatever its status.
    pub async fn send_acs_data(&self, body: &str) -> Result<RemoteResponse, SubmitError> {
        let url = self.config.endpoint_url(&self.config.acs_endpoint);
        debug!(url = %url, "Sending ACS request to Spine");

        let request = RemoteRequest::post(url).body(body).build()?;
        Ok(self.transport.send(&request).await?)
    }

    /// Query the identifier of a patient's current SCR.
    pub async fn send_get_scr_id(
        &self,
        body: &str,
        asid: &str,
    ) -> Result<RemoteResponse, SubmitError> {
        let url = self.config.endpoint_url(&self.config.psis_queries_endpoint);
        debug!(url = %url, "Sending GET SCR ID request to Spine");

        let request = RemoteRequest::post(url)
            .header(SOAP_ACTION, GET_SCR_ID_SOAP_ACTION)
            .header(CONTENT_TYPE, TEXT_XML)
            .header(NHSD_ASID, asid)
            .body(body)
            .build()?;

        self.expect_ok("GET SCR ID", &request).await
    }

    /// Send a FHIR alert.
    pub async fn send_alert(
        &self,
        body: &str,
        identity: &CallerIdentity,
    ) -> Result<RemoteResponse, SubmitError> {
        let url = self.config.endpoint_url(&self.config.alert_endpoint);
        debug!(url = %url, "Sending alert request to Spine");

        let builder = RemoteRequest::post(url).header(CONTENT_TYPE, FHIR_JSON);
        let request = identity.apply(builder).body(body).build()?;

        self.expect_ok("alert", &request).await
    }

    async fn expect_ok(
        &self,
        operation: &'static str,
        request: &RemoteRequest,
    ) -> Result<RemoteResponse, SubmitError> {
        let response = self.transport.send(request).await?;
        if response.status != READY_STATUS {
            error!(operation, status = response.status, "Unexpected Spine response");
            return Err(SubmitError::Rejected {
                operation,
                status: response.status,
            });
        }
        Ok(response)
    }
}
