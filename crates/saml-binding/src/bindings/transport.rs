//! Transport response sink.
//!
//! Encoders write through [`ResponseSink`] so they stay independent of the
//! HTTP framework. [`BufferedResponse`] collects everything in memory and
//! converts into an axum response.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tracing::warn;

use crate::error::SamlResult;

/// Destination for an encoded HTTP response.
pub trait ResponseSink {
    /// Sets the media type, e.g. `text/html`.
    fn set_content_type(&mut self, content_type: &str);

    /// Sets the character encoding, e.g. `UTF-8`.
    fn set_character_encoding(&mut self, encoding: &str);

    /// Sets a response header, replacing any previous value.
    fn set_header(&mut self, name: &str, value: &str);

    /// Writes the response body.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SamlError::Transport`] if the body cannot be written.
    fn write(&mut self, body: &[u8]) -> SamlResult<()>;
}

/// In-memory response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferedResponse {
    content_type: Option<String>,
    character_encoding: Option<String>,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl BufferedResponse {
    /// Creates an empty response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The media type, if set.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    /// The character encoding, if set.
    #[must_use]
    pub fn character_encoding(&self) -> Option<&str> {
        self.character_encoding.as_deref()
    }

    /// Looks up a header by case-insensitive name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// All headers in the order they were set.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// The body bytes.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// The body as UTF-8 text, if it is valid.
    #[must_use]
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    /// Returns true if nothing has been set or written.
    #[must_use]
    pub fn is_untouched(&self) -> bool {
        *self == Self::default()
    }

    /// `Content-Type` value combining media type and charset.
    fn content_type_header(&self) -> Option<String> {
        let media = self.content_type.as_deref()?;
        Some(match &self.character_encoding {
            Some(charset) => format!("{media}; charset={charset}"),
            None => media.to_string(),
        })
    }
}

impl ResponseSink for BufferedResponse {
    fn set_content_type(&mut self, content_type: &str) {
        self.content_type = Some(content_type.to_string());
    }

    fn set_character_encoding(&mut self, encoding: &str) {
        self.character_encoding = Some(encoding.to_string());
    }

    fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn write(&mut self, body: &[u8]) -> SamlResult<()> {
        self.body.extend_from_slice(body);
        Ok(())
    }
}

impl IntoResponse for BufferedResponse {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();

        if let Some(content_type) = self.content_type_header() {
            match HeaderValue::from_str(&content_type) {
                Ok(value) => {
                    headers.insert(CONTENT_TYPE, value);
                }
                Err(_) => warn!(%content_type, "Dropping invalid content type"),
            }
        }

        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => warn!(header = %name, "Dropping invalid response header"),
            }
        }

        (StatusCode::OK, headers, self.body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut response = BufferedResponse::new();
        response.set_header("Cache-control", "no-cache");
        response.set_header("cache-control", "no-cache, no-store");

        assert_eq!(response.headers().len(), 1);
        assert_eq!(response.header("CACHE-CONTROL"), Some("no-cache, no-store"));
    }

    #[test]
    fn untouched_until_written() {
        let mut response = BufferedResponse::new();
        assert!(response.is_untouched());
        response.write(b"<html/>").unwrap();
        assert!(!response.is_untouched());
        assert_eq!(response.body_text(), Some("<html/>"));
    }

    #[test]
    fn into_axum_response() {
        let mut buffered = BufferedResponse::new();
        buffered.set_content_type("text/xml");
        buffered.set_character_encoding("UTF-8");
        buffered.set_header("SOAPAction", "http://www.oasis-open.org/committees/security");
        buffered.write(b"<soap11:Envelope/>").unwrap();

        let response = buffered.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/xml; charset=UTF-8"
        );
        assert_eq!(
            response.headers().get("soapaction").unwrap(),
            "http://www.oasis-open.org/committees/security"
        );
    }
}
