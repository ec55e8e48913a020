//! SAML AuthnRequest types.
//!
//! Authentication request message sent by a service provider to an identity provider.

use chrono::{DateTime, Utc};

use super::{MessageCapabilities, SamlBinding, SAML_VERSION};
use crate::signature::SignatureDescriptor;

/// SAML Authentication Request.
#[derive(Debug, Clone)]
pub struct AuthnRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Version of the SAML protocol (always "2.0").
    pub version: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity ID of the service provider issuing the request.
    pub issuer: String,

    /// The URL this request is addressed to.
    pub destination: Option<String>,

    /// The URL where the response should be sent.
    pub assertion_consumer_service_url: Option<String>,

    /// Binding to use for the response.
    pub protocol_binding: Option<String>,

    /// Whether the IdP must authenticate the user directly.
    pub force_authn: bool,

    /// Whether the IdP must not interact with the user.
    pub is_passive: bool,

    /// Attached signature descriptor.
    pub signature: Option<SignatureDescriptor>,
}

impl AuthnRequest {
    /// Creates a new authentication request.
    #[must_use]
    pub fn new(issuer: impl Into<String>) -> Self {
        Self {
            id: super::generate_id(),
            version: SAML_VERSION.to_string(),
            issue_instant: Utc::now(),
            issuer: issuer.into(),
            destination: None,
            assertion_consumer_service_url: None,
            protocol_binding: None,
            force_authn: false,
            is_passive: false,
            signature: None,
        }
    }

    /// Sets the assertion consumer service URL and the binding it expects.
    #[must_use]
    pub fn with_acs(mut self, url: impl Into<String>, binding: SamlBinding) -> Self {
        self.assertion_consumer_service_url = Some(url.into());
        self.protocol_binding = Some(binding.uri().to_string());
        self
    }

    /// Requests forced re-authentication.
    #[must_use]
    pub const fn force_authn(mut self, force: bool) -> Self {
        self.force_authn = force;
        self
    }

    /// Requests passive authentication.
    #[must_use]
    pub const fn passive(mut self, passive: bool) -> Self {
        self.is_passive = passive;
        self
    }
}

super::impl_saml_message!(AuthnRequest, "AuthnRequest", MessageCapabilities::REQUEST);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SamlMessage;

    #[test]
    fn authn_request_builder() {
        let request = AuthnRequest::new("https://sp.example.com")
            .with_acs("https://sp.example.com/acs", SamlBinding::HttpPost)
            .force_authn(true);

        assert!(request.force_authn);
        assert!(!request.is_passive);
        assert_eq!(
            request.protocol_binding.as_deref(),
            Some(SamlBinding::HttpPost.uri())
        );
        assert_eq!(request.capabilities(), MessageCapabilities::REQUEST);
    }
}
