//! SAML Response types.
//!
//! Response messages sent by an identity provider to a service provider.

use chrono::{DateTime, Utc};

use super::{MessageCapabilities, Status, SAML_VERSION};
use crate::signature::SignatureDescriptor;

/// SAML Response.
///
/// Assertions are carried as already-marshalled `saml:Assertion` elements;
/// this layer moves them around verbatim and never interprets them.
#[derive(Debug, Clone)]
pub struct Response {
    /// Unique identifier for this response.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    pub version: String,

    /// Timestamp when this response was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the identity provider that issued this response.
    pub issuer: String,

    /// The ID of the request this response is for.
    pub in_response_to: Option<String>,

    /// The URL this response is bound to.
    pub destination: Option<String>,

    /// The status of the response.
    pub status: Status,

    /// Marshalled assertion elements.
    pub assertions: Vec<String>,

    /// Attached signature descriptor.
    pub signature: Option<SignatureDescriptor>,
}

impl Response {
    /// Creates a new success response.
    #[must_use]
    pub fn success(issuer: impl Into<String>) -> Self {
        Self::with_status(issuer, Status::success())
    }

    /// Creates a new error response.
    #[must_use]
    pub fn error(issuer: impl Into<String>, status: Status) -> Self {
        Self::with_status(issuer, status)
    }

    fn with_status(issuer: impl Into<String>, status: Status) -> Self {
        Self {
            id: super::generate_id(),
            version: SAML_VERSION.to_string(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            in_response_to: None,
            destination: None,
            status,
            assertions: Vec::new(),
            signature: None,
        }
    }

    /// Overrides the generated ID.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Overrides the issue instant.
    #[must_use]
    pub fn issued_at(mut self, instant: DateTime<Utc>) -> Self {
        self.issue_instant = instant;
        self
    }

    /// Sets the request ID this response is for.
    #[must_use]
    pub fn in_response_to(mut self, request_id: impl Into<String>) -> Self {
        self.in_response_to = Some(request_id.into());
        self
    }

    /// Sets the destination URL.
    #[must_use]
    pub fn with_destination(mut self, url: impl Into<String>) -> Self {
        self.destination = Some(url.into());
        self
    }

    /// Adds a marshalled assertion element.
    #[must_use]
    pub fn with_assertion(mut self, assertion_xml: impl Into<String>) -> Self {
        self.assertions.push(assertion_xml.into());
        self
    }

    /// Returns true if this response indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

super::impl_saml_message!(Response, "Response", MessageCapabilities::STATUS_RESPONSE);
