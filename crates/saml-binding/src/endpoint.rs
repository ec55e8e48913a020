//! Peer endpoint resolution.
//!
//! Picks the one URL an outbound message is delivered to. The choice depends
//! only on the message kind and the peer's declared endpoint, never on data
//! carried by the inbound request.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{SamlError, SamlResult};
use crate::types::SamlMessage;

/// Default relay-state length (bytes) above which a warning is logged.
pub const DEFAULT_RELAY_STATE_LIMIT: usize = 80;

/// A peer endpoint as declared in its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Location for requests (and responses without a separate URL).
    pub location: String,
    /// Separate location for response messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_location: Option<String>,
}

impl Endpoint {
    /// Creates an endpoint with a single location.
    #[must_use]
    pub fn new(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            response_location: None,
        }
    }

    /// Sets the response location.
    #[must_use]
    pub fn with_response_location(mut self, location: impl Into<String>) -> Self {
        self.response_location = Some(location.into());
        self
    }
}

/// Outcome of the relay-state size check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStateCheck {
    /// No relay state, or an empty one.
    Absent,
    /// Present and within the limit.
    Accepted,
    /// Present but longer than the limit. Encoding still proceeds.
    Oversized {
        /// Length in bytes.
        len: usize,
        /// Configured limit.
        limit: usize,
    },
}

impl RelayStateCheck {
    /// Returns true if the relay state should be sent.
    #[must_use]
    pub const fn is_present(&self) -> bool {
        !matches!(self, Self::Absent)
    }
}

/// Resolves destination URLs for outbound messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointResolver {
    relay_state_limit: usize,
}

impl Default for EndpointResolver {
    fn default() -> Self {
        Self::new(DEFAULT_RELAY_STATE_LIMIT)
    }
}

impl EndpointResolver {
    /// Creates a resolver with the given relay-state warning threshold.
    #[must_use]
    pub const fn new(relay_state_limit: usize) -> Self {
        Self { relay_state_limit }
    }

    /// The relay-state warning threshold in bytes.
    #[must_use]
    pub const fn relay_state_limit(&self) -> usize {
        self.relay_state_limit
    }

    /// Picks the destination URL for `message`.
    ///
    /// Response kinds prefer a non-empty `response_location`; everything else
    /// (and responses without one) uses `location`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::MissingEndpoint`] if no endpoint is given and
    /// [`SamlError::EmptyEndpointLocation`] if it has no usable location.
    pub fn resolve(
        &self,
        message: &dyn SamlMessage,
        endpoint: Option<&Endpoint>,
    ) -> SamlResult<String> {
        let endpoint =
            endpoint.ok_or_else(|| SamlError::MissingEndpoint(message.id().to_string()))?;

        if message.capabilities().response {
            if let Some(location) = endpoint.response_location.as_deref().filter(|l| !l.is_empty()) {
                debug!(message = message.element_name(), url = location, "Using response location");
                return Ok(location.to_string());
            }
        }

        if endpoint.location.is_empty() {
            return Err(SamlError::EmptyEndpointLocation(message.id().to_string()));
        }

        debug!(
            message = message.element_name(),
            url = %endpoint.location,
            "Using endpoint location"
        );
        Ok(endpoint.location.clone())
    }

    /// Returns the destination to write onto `message`, if it is a status
    /// response. Other kinds keep whatever destination they carry.
    #[must_use]
    pub fn destination_update(&self, message: &dyn SamlMessage, url: &str) -> Option<String> {
        message
            .capabilities()
            .status_response
            .then(|| url.to_string())
    }

    /// Returns whether relay state should be sent.
    ///
    /// Oversized state is still accepted; it only logs a warning.
    #[must_use]
    pub fn check_relay_state(&self, relay_state: Option<&str>) -> bool {
        self.inspect_relay_state(relay_state).is_present()
    }

    /// Classifies relay state against the configured limit, logging a
    /// warning when it is exceeded.
    #[must_use]
    pub fn inspect_relay_state(&self, relay_state: Option<&str>) -> RelayStateCheck {
        let Some(state) = relay_state.filter(|s| !s.is_empty()) else {
            return RelayStateCheck::Absent;
        };

        let len = state.len();
        if len > self.relay_state_limit {
            warn!(
                len,
                limit = self.relay_state_limit,
                "Relay state exceeds recommended length; some peers may reject it"
            );
            return RelayStateCheck::Oversized {
                len,
                limit: self.relay_state_limit,
            };
        }

        RelayStateCheck::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AuthnRequest, LogoutRequest, Response};

    fn both() -> Endpoint {
        Endpoint::new("https://sp.example.com/slo")
            .with_response_location("https://sp.example.com/slo/return")
    }

    #[test]
    fn response_prefers_response_location() {
        let response = Response::success("https://idp.example.com");
        let url = EndpointResolver::default().resolve(&response, Some(&both())).unwrap();
        assert_eq!(url, "https://sp.example.com/slo/return");
    }

    #[test]
    fn request_ignores_response_location() {
        let request = LogoutRequest::new("https://idp.example.com", "alice");
        let url = EndpointResolver::default().resolve(&request, Some(&both())).unwrap();
        assert_eq!(url, "https://sp.example.com/slo");
    }

    #[test]
    fn empty_response_location_falls_back() {
        let response = Response::success("https://idp.example.com");
        let endpoint = Endpoint::new("https://sp.example.com/acs").with_response_location("");
        let url = EndpointResolver::default().resolve(&response, Some(&endpoint)).unwrap();
        assert_eq!(url, "https://sp.example.com/acs");
    }

    #[test]
    fn missing_endpoint() {
        let request = AuthnRequest::new("https://sp.example.com");
        let result = EndpointResolver::default().resolve(&request, None);
        assert!(matches!(result, Err(SamlError::MissingEndpoint(_))));
    }

    #[test]
    fn empty_location_for_request() {
        let request = AuthnRequest::new("https://sp.example.com");
        let endpoint = Endpoint::new("").with_response_location("https://sp.example.com/ret");
        let result = EndpointResolver::default().resolve(&request, Some(&endpoint));
        assert!(matches!(result, Err(SamlError::EmptyEndpointLocation(_))));
    }

    #[test]
    fn destination_update_only_for_status_responses() {
        let resolver = EndpointResolver::default();
        let response = Response::success("https://idp.example.com");
        let request = AuthnRequest::new("https://sp.example.com");

        assert_eq!(
            resolver.destination_update(&response, "https://sp.example.com/acs"),
            Some("https://sp.example.com/acs".to_string())
        );
        assert_eq!(resolver.destination_update(&request, "https://idp.example.com/sso"), None);
    }

    #[test]
    fn relay_state_boundaries() {
        let resolver = EndpointResolver::default();

        assert!(!resolver.check_relay_state(None));
        assert!(!resolver.check_relay_state(Some("")));
        assert_eq!(
            resolver.inspect_relay_state(Some(&"a".repeat(80))),
            RelayStateCheck::Accepted
        );
        assert_eq!(
            resolver.inspect_relay_state(Some(&"a".repeat(81))),
            RelayStateCheck::Oversized { len: 81, limit: 80 }
        );
        assert!(resolver.check_relay_state(Some(&"a".repeat(81))));
    }

    #[test]
    fn relay_state_limit_is_configurable() {
        let resolver = EndpointResolver::new(16);
        assert!(matches!(
            resolver.inspect_relay_state(Some(&"a".repeat(17))),
            RelayStateCheck::Oversized { .. }
        ));
    }

    #[test]
    fn endpoint_serde_names() {
        let endpoint: Endpoint = serde_json::from_str(
            r#"{"location":"https://sp.example.com/acs","responseLocation":"https://sp.example.com/r"}"#,
        )
        .unwrap();
        assert_eq!(endpoint, Endpoint::new("https://sp.example.com/acs").with_response_location("https://sp.example.com/r"));
    }
}
