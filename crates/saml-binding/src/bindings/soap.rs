//! SOAP 1.1 Binding implementation.

use crate::config::BindingConfig;
use crate::context::MessageContext;
use crate::error::SamlResult;
use crate::types::{SamlBinding, SOAP11_NS, SOAP_ACTION};

use super::{write_common_headers, EncoderCore, MessageEncoder, ResponseSink};

/// SOAP 1.1 binding encoder.
///
/// Relay state has no place in a SOAP exchange and is not sent.
#[derive(Debug, Clone)]
pub struct HttpSoap11Encoder {
    core: EncoderCore,
    soap_action: String,
}

impl Default for HttpSoap11Encoder {
    fn default() -> Self {
        Self::new(EncoderCore::default())
    }
}

impl HttpSoap11Encoder {
    /// Creates an encoder with the standard `SOAPAction`.
    #[must_use]
    pub fn new(core: EncoderCore) -> Self {
        Self {
            core,
            soap_action: SOAP_ACTION.to_string(),
        }
    }

    /// Creates an encoder from binding configuration.
    #[must_use]
    pub fn from_config(config: &BindingConfig) -> Self {
        Self::new(EncoderCore::from_config(config)).with_soap_action(config.soap_action.clone())
    }

    /// Overrides the `SOAPAction` header value.
    #[must_use]
    pub fn with_soap_action(mut self, soap_action: impl Into<String>) -> Self {
        self.soap_action = soap_action.into();
        self
    }
}

impl MessageEncoder for HttpSoap11Encoder {
    fn binding(&self) -> SamlBinding {
        SamlBinding::Soap
    }

    fn encode(&self, context: MessageContext, sink: &mut dyn ResponseSink) -> SamlResult<()> {
        let prepared = self.core.prepare(context)?;
        let envelope = wrap_envelope(&prepared.message_xml);

        write_common_headers(sink, "text/xml");
        sink.set_header("SOAPAction", &self.soap_action);
        sink.write(envelope.as_bytes())
    }
}

/// Wraps a marshalled message in a SOAP 1.1 envelope.
fn wrap_envelope(message_xml: &str) -> String {
    format!(
        r#"<soap11:Envelope xmlns:soap11="{SOAP11_NS}"><soap11:Body>{message_xml}</soap11:Body></soap11:Envelope>"#
    )
}
