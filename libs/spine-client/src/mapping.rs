//! Seam to the mapping layer
//!
//! The mapping layer turns a ready result body into a caller-facing document.
//! This crate only hands it the opaque body.

use crate::error::MappingError;

pub trait ResultMapper: Send + Sync {
    type Document;

    fn map(&self, body: &str) -> Result<Self::Document, MappingError>;
}

/// Identity mapper: the document is the body itself
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBody;

impl ResultMapper for RawBody {
    type Document = String;

    fn map(&self, body: &str) -> Result<String, MappingError> {
        Ok(body.to_string())
    }
}
