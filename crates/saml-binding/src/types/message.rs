//! Protocol message abstraction.
//!
//! Encoders, the signing pipeline and the artifact map work with any message
//! shape through [`SamlMessage`]. Instead of inspecting concrete types they
//! ask a message for its [`MessageCapabilities`].

use std::any::Any;
use std::fmt;

use crate::signature::SignatureDescriptor;

/// What a message kind supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MessageCapabilities {
    /// The message answers a request and may go to a separate response URL.
    pub response: bool,
    /// The message can carry an enveloped XML signature.
    pub signable: bool,
    /// The message is a `StatusResponseType` with a binding `Destination`.
    pub status_response: bool,
}

impl MessageCapabilities {
    /// Capabilities of a signable request (`AuthnRequest`, `LogoutRequest`).
    pub const REQUEST: Self = Self {
        response: false,
        signable: true,
        status_response: false,
    };

    /// Capabilities of a signable status response (`Response`, `LogoutResponse`).
    pub const STATUS_RESPONSE: Self = Self {
        response: true,
        signable: true,
        status_response: true,
    };
}

/// SAML message direction for binding operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamlMessageType {
    /// A request message.
    Request,
    /// A response message.
    Response,
}

impl SamlMessageType {
    /// Returns the form parameter name for this message type.
    #[must_use]
    pub const fn form_param(&self) -> &'static str {
        match self {
            Self::Request => "SAMLRequest",
            Self::Response => "SAMLResponse",
        }
    }
}

/// A SAML protocol message.
///
/// The trait is object safe; encoders and codecs handle `dyn SamlMessage`.
pub trait SamlMessage: fmt::Debug + Send + Sync + 'static {
    /// Local name of the root element, e.g. `Response`.
    fn element_name(&self) -> &'static str;

    /// The message `ID` attribute, used as the signature reference.
    fn id(&self) -> &str;

    /// The issuing entity.
    fn issuer(&self) -> &str;

    /// What this message kind supports.
    fn capabilities(&self) -> MessageCapabilities;

    /// The `Destination` attribute.
    fn destination(&self) -> Option<&str>;

    /// Replaces the `Destination` attribute.
    fn set_destination(&mut self, destination: Option<String>);

    /// The attached signature descriptor, if any.
    fn signature(&self) -> Option<&SignatureDescriptor>;

    /// Attaches or clears the signature descriptor.
    fn set_signature(&mut self, signature: Option<SignatureDescriptor>);

    /// Upcast used by marshallers to reach the concrete type.
    fn as_any(&self) -> &dyn Any;

    /// Request or response, for the binding's form parameter.
    fn message_type(&self) -> SamlMessageType {
        if self.capabilities().response {
            SamlMessageType::Response
        } else {
            SamlMessageType::Request
        }
    }
}

/// Field updates produced by endpoint resolution and signing.
///
/// The resolver and pipeline never touch the message; they hand back the
/// values to write, and the encoder applies them immediately before the
/// message is marshalled.
#[derive(Debug, Clone, Default)]
pub struct MessageUpdates {
    /// New `Destination`, for status responses.
    pub destination: Option<String>,
    /// Signature descriptor to attach.
    pub signature: Option<SignatureDescriptor>,
}

impl MessageUpdates {
    /// Returns true if there is nothing to apply.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.destination.is_none() && self.signature.is_none()
    }

    /// Writes the updates onto the message.
    pub fn apply(self, message: &mut dyn SamlMessage) {
        if let Some(destination) = self.destination {
            message.set_destination(Some(destination));
        }
        if let Some(signature) = self.signature {
            message.set_signature(Some(signature));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LogoutRequest, Response};

    #[test]
    fn message_type_follows_capabilities() {
        let response = Response::success("https://idp.example.com");
        assert_eq!(response.message_type(), SamlMessageType::Response);
        assert_eq!(response.message_type().form_param(), "SAMLResponse");

        let request = LogoutRequest::new("https://sp.example.com", "alice");
        assert_eq!(request.message_type(), SamlMessageType::Request);
        assert_eq!(request.message_type().form_param(), "SAMLRequest");
    }

    #[test]
    fn updates_apply_destination() {
        let mut response = Response::success("https://idp.example.com");
        let updates = MessageUpdates {
            destination: Some("https://sp.example.com/acs".to_string()),
            signature: None,
        };
        assert!(!updates.is_empty());

        updates.apply(&mut response);
        assert_eq!(response.destination(), Some("https://sp.example.com/acs"));
        assert!(response.signature().is_none());
    }

    #[test]
    fn empty_updates_leave_message_untouched() {
        let mut response = Response::success("https://idp.example.com")
            .with_destination("https://original.example.com");
        let updates = MessageUpdates::default();
        assert!(updates.is_empty());

        updates.apply(&mut response);
        assert_eq!(response.destination(), Some("https://original.example.com"));
    }
}
