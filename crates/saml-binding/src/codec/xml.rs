//! XML codec for SAML protocol messages.
//!
//! Output is a single compact element with no XML declaration, so it can be
//! embedded in a SOAP body or base64-encoded as-is.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;
use roxmltree::Node;

use crate::error::{DeserializationError, SamlError, SamlResult};
use crate::types::{
    AuthnRequest, LogoutRequest, LogoutResponse, Response, SamlMessage, Status, StatusCode,
    SAMLP_NS, SAML_NS,
};

use super::{MessageCodec, MessageMarshaller};

/// XML codec with a registry of marshallers keyed by element local name.
#[derive(Clone, Default)]
pub struct XmlMessageCodec {
    marshallers: HashMap<&'static str, Arc<dyn MessageMarshaller>>,
}

impl XmlMessageCodec {
    /// Creates a codec with no marshallers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a codec for `Response`, `LogoutRequest`, `LogoutResponse`
    /// and `AuthnRequest`.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut codec = Self::new();
        codec.register(Arc::new(ResponseMarshaller));
        codec.register(Arc::new(LogoutRequestMarshaller));
        codec.register(Arc::new(LogoutResponseMarshaller));
        codec.register(Arc::new(AuthnRequestMarshaller));
        codec
    }

    /// Registers a marshaller, replacing any for the same element.
    pub fn register(&mut self, marshaller: Arc<dyn MessageMarshaller>) {
        self.marshallers.insert(marshaller.element_name(), marshaller);
    }

    /// Returns true if a marshaller is registered for the element.
    #[must_use]
    pub fn supports(&self, element_name: &str) -> bool {
        self.marshallers.contains_key(element_name)
    }
}

impl std::fmt::Debug for XmlMessageCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut elements: Vec<_> = self.marshallers.keys().collect();
        elements.sort();
        f.debug_struct("XmlMessageCodec")
            .field("elements", &elements)
            .finish()
    }
}

impl MessageCodec for XmlMessageCodec {
    fn serialize(&self, message: &dyn SamlMessage) -> SamlResult<String> {
        let marshaller = self.marshallers.get(message.element_name()).ok_or_else(|| {
            SamlError::Serialization(format!(
                "no marshaller registered for {}",
                message.element_name()
            ))
        })?;
        marshaller.marshall(message)
    }

    fn deserialize(&self, text: &str) -> Result<Box<dyn SamlMessage>, DeserializationError> {
        let doc = roxmltree::Document::parse(text)?;
        let root = doc.root_element();
        let name = root.tag_name().name();

        if root.tag_name().namespace() != Some(SAMLP_NS) {
            return Err(DeserializationError::UnknownElement(name.to_string()));
        }

        let marshaller = self
            .marshallers
            .get(name)
            .ok_or_else(|| DeserializationError::UnknownElement(name.to_string()))?;
        marshaller.unmarshall(root, text)
    }
}

// ============================================================================
// Marshallers
// ============================================================================

/// Marshaller for `samlp:Response`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseMarshaller;

impl MessageMarshaller for ResponseMarshaller {
    fn element_name(&self) -> &'static str {
        "Response"
    }

    fn marshall(&self, message: &dyn SamlMessage) -> SamlResult<String> {
        let response: &Response = downcast(message)?;

        let mut xml = open_root(
            "Response",
            &response.id,
            &response.version,
            &response.issue_instant,
        );
        push_opt_attr(&mut xml, "InResponseTo", response.in_response_to.as_deref());
        push_opt_attr(&mut xml, "Destination", response.destination.as_deref());
        xml.push('>');

        push_issuer_and_signature(&mut xml, message);
        push_status(&mut xml, &response.status);
        for assertion in &response.assertions {
            xml.push_str(assertion);
        }

        xml.push_str("</samlp:Response>");
        Ok(xml)
    }

    fn unmarshall(
        &self,
        node: Node<'_, '_>,
        text: &str,
    ) -> Result<Box<dyn SamlMessage>, DeserializationError> {
        let assertions = node
            .children()
            .filter(|child| is_element(*child, SAML_NS, "Assertion"))
            .map(|child| text[child.range()].to_string())
            .collect();

        Ok(Box::new(Response {
            id: required_attr(node, "ID")?.to_string(),
            version: required_attr(node, "Version")?.to_string(),
            issue_instant: parse_instant("IssueInstant", required_attr(node, "IssueInstant")?)?,
            issuer: parse_issuer(node)?,
            in_response_to: node.attribute("InResponseTo").map(String::from),
            destination: node.attribute("Destination").map(String::from),
            status: parse_status(node)?,
            assertions,
            signature: None,
        }))
    }
}

/// Marshaller for `samlp:LogoutResponse`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogoutResponseMarshaller;

impl MessageMarshaller for LogoutResponseMarshaller {
    fn element_name(&self) -> &'static str {
        "LogoutResponse"
    }

    fn marshall(&self, message: &dyn SamlMessage) -> SamlResult<String> {
        let response: &LogoutResponse = downcast(message)?;

        let mut xml = open_root(
            "LogoutResponse",
            &response.id,
            &response.version,
            &response.issue_instant,
        );
        push_opt_attr(&mut xml, "InResponseTo", response.in_response_to.as_deref());
        push_opt_attr(&mut xml, "Destination", response.destination.as_deref());
        xml.push('>');

        push_issuer_and_signature(&mut xml, message);
        push_status(&mut xml, &response.status);

        xml.push_str("</samlp:LogoutResponse>");
        Ok(xml)
    }

    fn unmarshall(
        &self,
        node: Node<'_, '_>,
        _text: &str,
    ) -> Result<Box<dyn SamlMessage>, DeserializationError> {
        Ok(Box::new(LogoutResponse {
            id: required_attr(node, "ID")?.to_string(),
            version: required_attr(node, "Version")?.to_string(),
            issue_instant: parse_instant("IssueInstant", required_attr(node, "IssueInstant")?)?,
            issuer: parse_issuer(node)?,
            in_response_to: node.attribute("InResponseTo").map(String::from),
            destination: node.attribute("Destination").map(String::from),
            status: parse_status(node)?,
            signature: None,
        }))
    }
}

/// Marshaller for `samlp:LogoutRequest`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogoutRequestMarshaller;

impl MessageMarshaller for LogoutRequestMarshaller {
    fn element_name(&self) -> &'static str {
        "LogoutRequest"
    }

    fn marshall(&self, message: &dyn SamlMessage) -> SamlResult<String> {
        let request: &LogoutRequest = downcast(message)?;

        let mut xml = open_root(
            "LogoutRequest",
            &request.id,
            &request.version,
            &request.issue_instant,
        );
        push_opt_attr(&mut xml, "Destination", request.destination.as_deref());
        if let Some(not_on_or_after) = &request.not_on_or_after {
            push_attr(&mut xml, "NotOnOrAfter", &format_instant(not_on_or_after));
        }
        push_opt_attr(&mut xml, "Reason", request.reason.as_deref());
        xml.push('>');

        push_issuer_and_signature(&mut xml, message);

        xml.push_str("<saml:NameID");
        push_opt_attr(&mut xml, "Format", request.name_id_format.as_deref());
        xml.push('>');
        xml.push_str(&escape(request.name_id.as_str()));
        xml.push_str("</saml:NameID>");

        for index in &request.session_indexes {
            xml.push_str("<samlp:SessionIndex>");
            xml.push_str(&escape(index.as_str()));
            xml.push_str("</samlp:SessionIndex>");
        }

        xml.push_str("</samlp:LogoutRequest>");
        Ok(xml)
    }

    fn unmarshall(
        &self,
        node: Node<'_, '_>,
        _text: &str,
    ) -> Result<Box<dyn SamlMessage>, DeserializationError> {
        let name_id = child(node, SAML_NS, "NameID")
            .ok_or_else(|| DeserializationError::MissingElement("NameID".to_string()))?;
        let not_on_or_after = node
            .attribute("NotOnOrAfter")
            .map(|value| parse_instant("NotOnOrAfter", value))
            .transpose()?;
        let session_indexes = node
            .children()
            .filter(|c| is_element(*c, SAMLP_NS, "SessionIndex"))
            .map(|c| c.text().unwrap_or_default().trim().to_string())
            .collect();

        Ok(Box::new(LogoutRequest {
            id: required_attr(node, "ID")?.to_string(),
            version: required_attr(node, "Version")?.to_string(),
            issue_instant: parse_instant("IssueInstant", required_attr(node, "IssueInstant")?)?,
            issuer: parse_issuer(node)?,
            destination: node.attribute("Destination").map(String::from),
            name_id: name_id.text().unwrap_or_default().trim().to_string(),
            name_id_format: name_id.attribute("Format").map(String::from),
            session_indexes,
            reason: node.attribute("Reason").map(String::from),
            not_on_or_after,
            signature: None,
        }))
    }
}

/// Marshaller for `samlp:AuthnRequest`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthnRequestMarshaller;

impl MessageMarshaller for AuthnRequestMarshaller {
    fn element_name(&self) -> &'static str {
        "AuthnRequest"
    }

    fn marshall(&self, message: &dyn SamlMessage) -> SamlResult<String> {
        let request: &AuthnRequest = downcast(message)?;

        let mut xml = open_root(
            "AuthnRequest",
            &request.id,
            &request.version,
            &request.issue_instant,
        );
        push_opt_attr(&mut xml, "Destination", request.destination.as_deref());
        push_opt_attr(
            &mut xml,
            "AssertionConsumerServiceURL",
            request.assertion_consumer_service_url.as_deref(),
        );
        push_opt_attr(&mut xml, "ProtocolBinding", request.protocol_binding.as_deref());
        if request.force_authn {
            push_attr(&mut xml, "ForceAuthn", "true");
        }
        if request.is_passive {
            push_attr(&mut xml, "IsPassive", "true");
        }
        xml.push('>');

        push_issuer_and_signature(&mut xml, message);

        xml.push_str("</samlp:AuthnRequest>");
        Ok(xml)
    }

    fn unmarshall(
        &self,
        node: Node<'_, '_>,
        _text: &str,
    ) -> Result<Box<dyn SamlMessage>, DeserializationError> {
        let force_authn = node
            .attribute("ForceAuthn")
            .map(|v| parse_bool("ForceAuthn", v))
            .transpose()?
            .unwrap_or(false);
        let is_passive = node
            .attribute("IsPassive")
            .map(|v| parse_bool("IsPassive", v))
            .transpose()?
            .unwrap_or(false);

        Ok(Box::new(AuthnRequest {
            id: required_attr(node, "ID")?.to_string(),
            version: required_attr(node, "Version")?.to_string(),
            issue_instant: parse_instant("IssueInstant", required_attr(node, "IssueInstant")?)?,
            issuer: parse_issuer(node)?,
            destination: node.attribute("Destination").map(String::from),
            assertion_consumer_service_url: node
                .attribute("AssertionConsumerServiceURL")
                .map(String::from),
            protocol_binding: node.attribute("ProtocolBinding").map(String::from),
            force_authn,
            is_passive,
            signature: None,
        }))
    }
}

// ============================================================================
// Writing helpers
// ============================================================================

fn downcast<T: 'static>(message: &dyn SamlMessage) -> SamlResult<&T> {
    message.as_any().downcast_ref::<T>().ok_or_else(|| {
        SamlError::Serialization(format!(
            "marshaller received an unexpected message type for {}",
            message.element_name()
        ))
    })
}

fn format_instant(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn open_root(name: &str, id: &str, version: &str, issue_instant: &DateTime<Utc>) -> String {
    let mut xml = String::with_capacity(1024);
    xml.push_str(&format!(
        r#"<samlp:{name} xmlns:samlp="{SAMLP_NS}" xmlns:saml="{SAML_NS}""#
    ));
    push_attr(&mut xml, "ID", id);
    push_attr(&mut xml, "Version", version);
    push_attr(&mut xml, "IssueInstant", &format_instant(issue_instant));
    xml
}

fn push_attr(xml: &mut String, name: &str, value: &str) {
    xml.push(' ');
    xml.push_str(name);
    xml.push_str("=\"");
    xml.push_str(&escape(value));
    xml.push('"');
}

fn push_opt_attr(xml: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        push_attr(xml, name, value);
    }
}

/// `saml:Issuer` followed by the signature template, if one is attached.
fn push_issuer_and_signature(xml: &mut String, message: &dyn SamlMessage) {
    xml.push_str("<saml:Issuer>");
    xml.push_str(&escape(message.issuer()));
    xml.push_str("</saml:Issuer>");

    if let Some(descriptor) = message.signature() {
        xml.push_str(&descriptor.template());
    }
}

fn push_status(xml: &mut String, status: &Status) {
    xml.push_str("<samlp:Status>");
    push_status_code(xml, &status.status_code);
    if let Some(message) = &status.status_message {
        xml.push_str("<samlp:StatusMessage>");
        xml.push_str(&escape(message.as_str()));
        xml.push_str("</samlp:StatusMessage>");
    }
    xml.push_str("</samlp:Status>");
}

fn push_status_code(xml: &mut String, code: &StatusCode) {
    xml.push_str("<samlp:StatusCode");
    push_attr(xml, "Value", &code.value);
    match &code.status_code {
        Some(sub) => {
            xml.push('>');
            push_status_code(xml, sub);
            xml.push_str("</samlp:StatusCode>");
        }
        None => xml.push_str("/>"),
    }
}

// ============================================================================
// Reading helpers
// ============================================================================

fn is_element(node: Node<'_, '_>, namespace: &str, name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == name
        && node.tag_name().namespace() == Some(namespace)
}

fn child<'a, 'input>(
    node: Node<'a, 'input>,
    namespace: &str,
    name: &str,
) -> Option<Node<'a, 'input>> {
    node.children().find(|c| is_element(*c, namespace, name))
}

fn required_attr<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str, DeserializationError> {
    node.attribute(name).ok_or_else(|| {
        DeserializationError::MissingElement(format!("{}@{name}", node.tag_name().name()))
    })
}

fn parse_instant(field: &str, value: &str) -> Result<DateTime<Utc>, DeserializationError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| DeserializationError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
        })
}

fn parse_bool(field: &str, value: &str) -> Result<bool, DeserializationError> {
    match value {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(DeserializationError::InvalidValue {
            field: field.to_string(),
            value: other.to_string(),
        }),
    }
}

fn parse_issuer(node: Node<'_, '_>) -> Result<String, DeserializationError> {
    child(node, SAML_NS, "Issuer")
        .and_then(|issuer| issuer.text())
        .map(|text| text.trim().to_string())
        .ok_or_else(|| DeserializationError::MissingElement("Issuer".to_string()))
}

fn parse_status(node: Node<'_, '_>) -> Result<Status, DeserializationError> {
    let status = child(node, SAMLP_NS, "Status")
        .ok_or_else(|| DeserializationError::MissingElement("Status".to_string()))?;
    let code = child(status, SAMLP_NS, "StatusCode")
        .ok_or_else(|| DeserializationError::MissingElement("StatusCode".to_string()))?;

    Ok(Status {
        status_code: parse_status_code(code)?,
        status_message: child(status, SAMLP_NS, "StatusMessage")
            .and_then(|m| m.text())
            .map(String::from),
    })
}

fn parse_status_code(node: Node<'_, '_>) -> Result<StatusCode, DeserializationError> {
    let value = required_attr(node, "Value")?;
    let sub = child(node, SAMLP_NS, "StatusCode")
        .map(parse_status_code)
        .transpose()?;

    Ok(StatusCode {
        value: value.to_string(),
        status_code: sub.map(Box::new),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    use crate::types::{sub_status_codes, SamlBinding};

    fn fixed_instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn response_is_compact_and_declaration_free() {
        let response = Response::success("https://idp.example.com")
            .with_id("_resp1")
            .issued_at(fixed_instant())
            .with_destination("https://sp.example.com/acs");

        let xml = XmlMessageCodec::with_defaults().serialize(&response).unwrap();
        assert!(xml.starts_with("<samlp:Response "));
        assert!(!xml.contains("<?xml"));
        assert!(!xml.contains('\n'));
        assert!(xml.contains(r#"IssueInstant="2024-05-01T12:00:00.000Z""#));
        assert!(xml.contains(r#"Destination="https://sp.example.com/acs""#));
    }

    #[test]
    fn response_survives_reparse() {
        let assertion = format!(
            r#"<saml:Assertion xmlns:saml="{SAML_NS}" ID="_a1"><saml:Issuer>idp</saml:Issuer></saml:Assertion>"#
        );
        let response = Response::error(
            "https://idp.example.com",
            Status::authn_failed("bad password"),
        )
        .with_id("_resp2")
        .issued_at(fixed_instant())
        .in_response_to("_req9")
        .with_assertion(assertion.clone());

        let codec = XmlMessageCodec::with_defaults();
        let xml = codec.serialize(&response).unwrap();
        let parsed = codec.deserialize(&xml).unwrap();
        let parsed = parsed.as_any().downcast_ref::<Response>().unwrap();

        assert_eq!(parsed.id, "_resp2");
        assert_eq!(parsed.issue_instant, fixed_instant());
        assert_eq!(parsed.in_response_to.as_deref(), Some("_req9"));
        assert_eq!(
            parsed.status.status_code.sub_status_value(),
            Some(sub_status_codes::AUTHN_FAILED)
        );
        assert_eq!(parsed.status.status_message.as_deref(), Some("bad password"));
        assert_eq!(parsed.assertions, vec![assertion]);
    }

    #[test]
    fn logout_request_fields_survive_reparse() {
        let request = LogoutRequest::new("https://sp.example.com", "alice & bob")
            .with_name_id_format("urn:oasis:names:tc:SAML:1.1:nameid-format:unspecified")
            .with_session_index("s1")
            .with_session_index("s2");

        let codec = XmlMessageCodec::with_defaults();
        let xml = codec.serialize(&request).unwrap();
        assert!(xml.contains("alice &amp; bob"));

        let parsed = codec.deserialize(&xml).unwrap();
        let parsed = parsed.as_any().downcast_ref::<LogoutRequest>().unwrap();
        assert_eq!(parsed.name_id, "alice & bob");
        assert_eq!(parsed.session_indexes, vec!["s1".to_string(), "s2".to_string()]);
        assert_eq!(parsed.reason.as_deref(), Some(LogoutRequest::REASON_USER));
    }

    #[test]
    fn authn_request_flags() {
        let request = AuthnRequest::new("https://sp.example.com")
            .with_acs("https://sp.example.com/acs", SamlBinding::HttpPost)
            .passive(true);

        let codec = XmlMessageCodec::with_defaults();
        let xml = codec.serialize(&request).unwrap();
        assert!(xml.contains(r#"IsPassive="true""#));
        assert!(!xml.contains("ForceAuthn"));

        let parsed = codec.deserialize(&xml).unwrap();
        let parsed = parsed.as_any().downcast_ref::<AuthnRequest>().unwrap();
        assert!(parsed.is_passive);
        assert!(!parsed.force_authn);
    }

    #[test]
    fn missing_marshaller_is_serialization_error() {
        let codec = XmlMessageCodec::new();
        let response = Response::success("https://idp.example.com");
        assert!(matches!(
            codec.serialize(&response),
            Err(SamlError::Serialization(_))
        ));
    }

    #[test]
    fn deserialize_errors() {
        let codec = XmlMessageCodec::with_defaults();

        assert!(matches!(
            codec.deserialize("<samlp:Response"),
            Err(DeserializationError::Malformed(_))
        ));
        assert!(matches!(
            codec.deserialize(&format!(r#"<samlp:ArtifactResolve xmlns:samlp="{SAMLP_NS}"/>"#)),
            Err(DeserializationError::UnknownElement(name)) if name == "ArtifactResolve"
        ));
        assert!(matches!(
            codec.deserialize(&format!(
                r#"<samlp:Response xmlns:samlp="{SAMLP_NS}" ID="_x" Version="2.0" IssueInstant="2024-05-01T12:00:00Z"/>"#
            )),
            Err(DeserializationError::MissingElement(_))
        ));
        assert!(matches!(
            codec.deserialize(&format!(
                r#"<samlp:LogoutResponse xmlns:samlp="{SAMLP_NS}" ID="_x" Version="2.0" IssueInstant="noon"/>"#
            )),
            Err(DeserializationError::InvalidValue { field, .. }) if field == "IssueInstant"
        ));
    }
}
