//! SAML Logout types.
//!
//! Single Logout (SLO) request and response messages.

use chrono::{DateTime, Duration, Utc};

use super::{MessageCapabilities, Status, SAML_VERSION};
use crate::signature::SignatureDescriptor;

/// SAML Logout Request.
///
/// A request to terminate an existing session.
#[derive(Debug, Clone)]
pub struct LogoutRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    pub version: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the requester.
    pub issuer: String,

    /// The URL where this request was sent.
    pub destination: Option<String>,

    /// The name identifier of the principal to log out.
    pub name_id: String,

    /// Format URI of the name identifier.
    pub name_id_format: Option<String>,

    /// Session indexes to terminate.
    pub session_indexes: Vec<String>,

    /// Reason for the logout.
    pub reason: Option<String>,

    /// Time after which the request is no longer valid.
    pub not_on_or_after: Option<DateTime<Utc>>,

    /// Attached signature descriptor.
    pub signature: Option<SignatureDescriptor>,
}

impl LogoutRequest {
    /// User logout reason.
    pub const REASON_USER: &'static str = "urn:oasis:names:tc:SAML:2.0:logout:user";

    /// Admin logout reason.
    pub const REASON_ADMIN: &'static str = "urn:oasis:names:tc:SAML:2.0:logout:admin";

    /// Creates a new logout request valid for five minutes.
    #[must_use]
    pub fn new(issuer: impl Into<String>, name_id: impl Into<String>) -> Self {
        let issue_instant = Utc::now();
        Self {
            id: super::generate_id(),
            version: SAML_VERSION.to_string(),
            issue_instant,
            issuer: issuer.into(),
            destination: None,
            name_id: name_id.into(),
            name_id_format: None,
            session_indexes: Vec::new(),
            reason: Some(Self::REASON_USER.to_string()),
            not_on_or_after: Some(issue_instant + Duration::minutes(5)),
            signature: None,
        }
    }

    /// Sets the name identifier format.
    #[must_use]
    pub fn with_name_id_format(mut self, format: impl Into<String>) -> Self {
        self.name_id_format = Some(format.into());
        self
    }

    /// Adds a session index to terminate.
    #[must_use]
    pub fn with_session_index(mut self, index: impl Into<String>) -> Self {
        self.session_indexes.push(index.into());
        self
    }

    /// Sets the logout reason.
    #[must_use]
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

super::impl_saml_message!(LogoutRequest, "LogoutRequest", MessageCapabilities::REQUEST);

/// SAML Logout Response.
#[derive(Debug, Clone)]
pub struct LogoutResponse {
    /// Unique identifier for this response.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    pub version: String,

    /// Timestamp when this response was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the responder.
    pub issuer: String,

    /// The ID of the logout request this answers.
    pub in_response_to: Option<String>,

    /// The URL this response is bound to.
    pub destination: Option<String>,

    /// Outcome of the logout.
    pub status: Status,

    /// Attached signature descriptor.
    pub signature: Option<SignatureDescriptor>,
}

impl LogoutResponse {
    /// Creates a logout response with the given status.
    #[must_use]
    pub fn new(issuer: impl Into<String>, status: Status) -> Self {
        Self {
            id: super::generate_id(),
            version: SAML_VERSION.to_string(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            in_response_to: None,
            destination: None,
            status,
            signature: None,
        }
    }

    /// Creates a successful logout response.
    #[must_use]
    pub fn success(issuer: impl Into<String>) -> Self {
        Self::new(issuer, Status::success())
    }

    /// Sets the request ID this response is for.
    #[must_use]
    pub fn in_response_to(mut self, request_id: impl Into<String>) -> Self {
        self.in_response_to = Some(request_id.into());
        self
    }
}

super::impl_saml_message!(
    LogoutResponse,
    "LogoutResponse",
    MessageCapabilities::STATUS_RESPONSE
);
