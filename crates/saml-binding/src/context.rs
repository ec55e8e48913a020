//! Outbound message context.

use crate::endpoint::Endpoint;
use crate::signature::SigningCredential;
use crate::types::SamlMessage;

/// Everything an encoder needs to send one message.
///
/// A context is consumed by [`crate::bindings::MessageEncoder::encode`], so it
/// cannot be reused or shared between concurrent encodes.
#[derive(Debug)]
pub struct MessageContext {
    /// The message to send.
    pub outbound_message: Box<dyn SamlMessage>,
    /// The peer endpoint to deliver to.
    pub peer_endpoint: Option<Endpoint>,
    /// Opaque caller state echoed back by the peer.
    pub relay_state: Option<String>,
    /// Key material to sign with.
    pub signing_credential: Option<SigningCredential>,
}

impl MessageContext {
    /// Creates a context for a message with no endpoint, relay state or credential.
    #[must_use]
    pub fn new(message: impl SamlMessage) -> Self {
        Self {
            outbound_message: Box::new(message),
            peer_endpoint: None,
            relay_state: None,
            signing_credential: None,
        }
    }

    /// Sets the peer endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.peer_endpoint = Some(endpoint);
        self
    }

    /// Sets the relay state.
    #[must_use]
    pub fn with_relay_state(mut self, relay_state: impl Into<String>) -> Self {
        self.relay_state = Some(relay_state.into());
        self
    }

    /// Sets the signing credential.
    #[must_use]
    pub fn with_credential(mut self, credential: SigningCredential) -> Self {
        self.signing_credential = Some(credential);
        self
    }
}
