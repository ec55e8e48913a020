//! Binding configuration.
//!
//! Configuration is loaded from environment variables with sensible defaults,
//! or deserialized from whatever configuration format the host application uses.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::artifact::{DEFAULT_ARTIFACT_LIFETIME, DEFAULT_ARTIFACT_PARTITION};
use crate::endpoint::DEFAULT_RELAY_STATE_LIMIT;
use crate::error::{SamlError, SamlResult};
use crate::signature::SecurityConfig;
use crate::types::SOAP_ACTION;

/// Binding layer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingConfig {
    /// Storage partition used by the artifact map.
    pub artifact_partition: String,

    /// Artifact lifetime in seconds.
    pub artifact_lifetime_secs: u64,

    /// Relay-state length (bytes) above which a warning is logged.
    pub relay_state_limit: usize,

    /// `SOAPAction` header value for the SOAP binding.
    pub soap_action: String,

    /// Signature parameters.
    pub security: SecurityConfig,
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            artifact_partition: DEFAULT_ARTIFACT_PARTITION.to_string(),
            artifact_lifetime_secs: DEFAULT_ARTIFACT_LIFETIME.as_secs(),
            relay_state_limit: DEFAULT_RELAY_STATE_LIMIT,
            soap_action: SOAP_ACTION.to_string(),
            security: SecurityConfig::default(),
        }
    }
}

impl BindingConfig {
    /// Loads configuration from environment variables.
    ///
    /// | variable | default |
    /// |---|---|
    /// | `SAML_ARTIFACT_PARTITION` | `artifact` |
    /// | `SAML_ARTIFACT_LIFETIME_SECS` | `60` |
    /// | `SAML_RELAY_STATE_LIMIT` | `80` |
    /// | `SAML_SOAP_ACTION` | `http://www.oasis-open.org/committees/security` |
    /// | `SAML_SIGNATURE_ALGORITHM` | `rsa-sha256` |
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Configuration`] if a variable holds an invalid value.
    pub fn from_env() -> SamlResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Configuration`] if a value is invalid.
    pub fn from_lookup<F>(lookup: F) -> SamlResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(partition) = lookup("SAML_ARTIFACT_PARTITION") {
            if partition.trim().is_empty() {
                return Err(SamlError::Configuration(
                    "SAML_ARTIFACT_PARTITION must not be empty".to_string(),
                ));
            }
            config.artifact_partition = partition;
        }

        if let Some(value) = lookup("SAML_ARTIFACT_LIFETIME_SECS") {
            config.artifact_lifetime_secs = parse_number("SAML_ARTIFACT_LIFETIME_SECS", &value)?;
        }

        if let Some(value) = lookup("SAML_RELAY_STATE_LIMIT") {
            config.relay_state_limit = parse_number("SAML_RELAY_STATE_LIMIT", &value)?;
        }

        if let Some(action) = lookup("SAML_SOAP_ACTION") {
            config.soap_action = action;
        }

        if let Some(value) = lookup("SAML_SIGNATURE_ALGORITHM") {
            config.security.algorithm = value.parse()?;
        }

        Ok(config)
    }

    /// Returns the artifact lifetime.
    #[must_use]
    pub const fn artifact_lifetime(&self) -> Duration {
        Duration::from_secs(self.artifact_lifetime_secs)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> SamlResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| SamlError::Configuration(format!("{key} must be a number, got '{value}'")))
}
