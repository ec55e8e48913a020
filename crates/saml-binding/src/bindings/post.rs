//! HTTP-POST Binding implementation.
//!
//! Implements the SAML 2.0 HTTP-POST binding for sending SAML messages
//! via HTML form POST.

use base64::Engine;

use crate::config::BindingConfig;
use crate::context::MessageContext;
use crate::error::SamlResult;
use crate::types::{SamlBinding, SamlMessageType};

use super::{write_common_headers, EncoderCore, MessageEncoder, ResponseSink};

/// HTTP-POST binding encoder.
#[derive(Debug, Clone, Default)]
pub struct HttpPostEncoder {
    core: EncoderCore,
}

impl HttpPostEncoder {
    /// Creates an encoder around a prepared core.
    #[must_use]
    pub fn new(core: EncoderCore) -> Self {
        Self { core }
    }

    /// Creates an encoder from binding configuration.
    #[must_use]
    pub fn from_config(config: &BindingConfig) -> Self {
        Self::new(EncoderCore::from_config(config))
    }
}

impl MessageEncoder for HttpPostEncoder {
    fn binding(&self) -> SamlBinding {
        SamlBinding::HttpPost
    }

    fn encode(&self, context: MessageContext, sink: &mut dyn ResponseSink) -> SamlResult<()> {
        let prepared = self.core.prepare(context)?;
        let html = render_form(
            &prepared.message_xml,
            &prepared.endpoint_url,
            prepared.relay_state.as_deref(),
            prepared.message_type,
        );

        write_common_headers(sink, "text/html");
        sink.write(html.as_bytes())
    }
}

/// Renders the auto-submitting form.
fn render_form(
    xml: &str,
    destination: &str,
    relay_state: Option<&str>,
    message_type: SamlMessageType,
) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(xml);
    let param_name = message_type.form_param();

    let relay_state_input = relay_state
        .map(|rs| {
            format!(
                r#"<input type="hidden" name="RelayState" value="{}"/>"#,
                html_escape(rs)
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>SAML POST Binding</title>
</head>
<body onload="document.forms[0].submit()">
    <noscript>
        <p>JavaScript is disabled. Click the button below to continue.</p>
    </noscript>
    <form method="post" action="{}">
        <input type="hidden" name="{}" value="{}"/>
        {}
        <noscript>
            <input type="submit" value="Continue"/>
        </noscript>
    </form>
</body>
</html>"#,
        html_escape(destination),
        param_name,
        encoded,
        relay_state_input
    )
}

/// Escapes HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn form_carries_message_and_relay_state() {
        let xml = r#"<samlp:AuthnRequest>test</samlp:AuthnRequest>"#;
        let html = render_form(
            xml,
            "https://idp.example.com/sso?a=1&b=2",
            Some("state123"),
            SamlMessageType::Request,
        );

        assert!(html.contains(r#"action="https://idp.example.com/sso?a=1&amp;b=2""#));
        assert!(html.contains(r#"name="RelayState" value="state123""#));

        let start = html.find("name=\"SAMLRequest\" value=\"").unwrap() + 26;
        let end = html[start..].find('"').unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&html[start..start + end])
            .unwrap();
        assert_eq!(decoded, xml.as_bytes());
    }

    #[test]
    fn form_without_relay_state() {
        let html = render_form("<x/>", "https://sp.example.com", None, SamlMessageType::Response);
        assert!(html.contains("SAMLResponse"));
        assert!(!html.contains("RelayState"));
    }

    #[test]
    fn html_escape_special_chars() {
        let escaped = html_escape(r#"<script>alert("xss")</script>"#);
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('>'));
        assert!(!escaped.contains('"'));
    }
}
