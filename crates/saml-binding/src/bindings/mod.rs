//! SAML bindings implementation.
//!
//! Outbound encoders for message transport:
//!
//! - **HTTP-POST Binding** - Messages are base64-encoded and sent in an auto-submitting HTML form
//! - **SOAP 1.1 Binding** - Messages are wrapped in a SOAP envelope body
//!
//! Both run the same steps before framing: resolve the peer endpoint, sign if
//! a credential is present, marshall. Nothing reaches the [`ResponseSink`]
//! until all of them have succeeded.
//!
//! # Usage
//!
//! ```rust,ignore
//! use saml_binding::bindings::{BufferedResponse, HttpPostEncoder, MessageEncoder};
//!
//! let context = MessageContext::new(response)
//!     .with_endpoint(Endpoint::new("https://sp.example.com/acs"))
//!     .with_relay_state("state123")
//!     .with_credential(credential);
//!
//! let mut sink = BufferedResponse::new();
//! HttpPostEncoder::default().encode(context, &mut sink)?;
//! ```

mod post;
mod soap;
mod transport;

pub use post::*;
pub use soap::*;
pub use transport::*;

use tracing::debug;

use crate::config::BindingConfig;
use crate::context::MessageContext;
use crate::endpoint::EndpointResolver;
use crate::error::SamlResult;
use crate::signature::SigningPipeline;
use crate::types::{MessageUpdates, SamlBinding, SamlMessageType};

/// `Cache-control` value for every encoded response.
pub const NO_CACHE: &str = "no-cache, no-store";

/// Renders an outbound message for one binding.
pub trait MessageEncoder: Send + Sync {
    /// The binding this encoder implements.
    fn binding(&self) -> SamlBinding;

    /// Resolves, signs, marshalls and frames the context's message, then
    /// writes the response.
    ///
    /// # Errors
    ///
    /// Any resolution, signing, encoding or transport error. On error before
    /// the write step nothing has been set on `sink`.
    fn encode(&self, context: MessageContext, sink: &mut dyn ResponseSink) -> SamlResult<()>;
}

/// A message ready for framing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedMessage {
    /// Resolved destination URL.
    pub endpoint_url: String,
    /// Marshalled (and signed, if applicable) message.
    pub message_xml: String,
    /// Request or response, for the form parameter name.
    pub message_type: SamlMessageType,
    /// Relay state to send along, if any.
    pub relay_state: Option<String>,
}

/// Endpoint resolution and signing shared by the encoders.
#[derive(Debug, Clone, Default)]
pub struct EncoderCore {
    resolver: EndpointResolver,
    pipeline: SigningPipeline,
}

impl EncoderCore {
    /// Creates a core from a resolver and a signing pipeline.
    #[must_use]
    pub fn new(resolver: EndpointResolver, pipeline: SigningPipeline) -> Self {
        Self { resolver, pipeline }
    }

    /// Creates a core from binding configuration.
    #[must_use]
    pub fn from_config(config: &BindingConfig) -> Self {
        Self::new(
            EndpointResolver::new(config.relay_state_limit),
            SigningPipeline::with_security(config.security.clone()),
        )
    }

    /// The endpoint resolver.
    #[must_use]
    pub fn resolver(&self) -> &EndpointResolver {
        &self.resolver
    }

    /// Runs resolution, signing and marshalling.
    ///
    /// The destination and signature descriptor are applied to the message
    /// before it is marshalled, and the signature is computed over that
    /// marshalled text.
    ///
    /// # Errors
    ///
    /// Returns the first resolution, signing or encoding error.
    pub fn prepare(&self, context: MessageContext) -> SamlResult<PreparedMessage> {
        let MessageContext {
            mut outbound_message,
            peer_endpoint,
            relay_state,
            signing_credential,
        } = context;

        let endpoint_url = self
            .resolver
            .resolve(outbound_message.as_ref(), peer_endpoint.as_ref())?;

        let updates = MessageUpdates {
            destination: self
                .resolver
                .destination_update(outbound_message.as_ref(), &endpoint_url),
            signature: self
                .pipeline
                .sign_message(outbound_message.as_ref(), signing_credential.as_ref())?,
        };
        updates.apply(outbound_message.as_mut());

        let message_xml = self.pipeline.marshall(outbound_message.as_ref())?;

        let relay_state = if self.resolver.check_relay_state(relay_state.as_deref()) {
            relay_state
        } else {
            None
        };

        debug!(
            message = outbound_message.element_name(),
            id = outbound_message.id(),
            url = %endpoint_url,
            signed = outbound_message.signature().is_some(),
            "Prepared outbound message"
        );

        Ok(PreparedMessage {
            endpoint_url,
            message_xml,
            message_type: outbound_message.message_type(),
            relay_state,
        })
    }
}

/// Sets the headers common to every binding.
fn write_common_headers(sink: &mut dyn ResponseSink, content_type: &str) {
    sink.set_content_type(content_type);
    sink.set_character_encoding("UTF-8");
    sink.set_header("Cache-control", NO_CACHE);
    sink.set_header("Pragma", "no-cache");
}
