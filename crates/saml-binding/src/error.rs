//! SAML error types.
//!
//! Provides error types for endpoint resolution, message marshalling,
//! signing, artifact storage and transport framing.

use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML binding errors.
///
/// Every variant except [`SamlError::SignatureInvalid`] is fatal to the
/// `encode()` call that produced it; encoders never write a partial response.
#[derive(Debug, Error)]
pub enum SamlError {
    /// No peer endpoint was supplied in the message context.
    #[error("no peer endpoint available for message '{0}'")]
    MissingEndpoint(String),

    /// The peer endpoint has no usable location for this message.
    #[error("peer endpoint has no location for message '{0}'")]
    EmptyEndpointLocation(String),

    /// A message could not be turned into its wire text form.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The outbound message could not be encoded for transport.
    #[error("message encoding failed: {0}")]
    Encoding(String),

    /// Signature parameters could not be prepared from the credential.
    #[error("unable to prepare signature parameters: {0}")]
    SigningPreparation(String),

    /// Signature computation failed.
    #[error("signature creation failed: {0}")]
    Signing(String),

    /// XML signature validation failed.
    #[error("signature validation failed: {0}")]
    SignatureInvalid(String),

    /// XML parsing error.
    #[error("XML parsing error: {0}")]
    XmlParse(String),

    /// Base64 decoding error.
    #[error("base64 decode error: {0}")]
    Base64Decode(String),

    /// Cryptographic operation error.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Storage operation error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Writing the transport response failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Invalid configuration value.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl SamlError {
    /// Returns the HTTP status code a caller should answer with.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::XmlParse(_) | Self::Base64Decode(_) => 400,
            Self::SignatureInvalid(_) => 401,
            _ => 500,
        }
    }

    /// Returns true if the error came from the signing stage.
    #[must_use]
    pub const fn is_signing_failure(&self) -> bool {
        matches!(self, Self::SigningPreparation(_) | Self::Signing(_))
    }
}

impl From<roxmltree::Error> for SamlError {
    fn from(err: roxmltree::Error) -> Self {
        Self::XmlParse(err.to_string())
    }
}

impl From<base64::DecodeError> for SamlError {
    fn from(err: base64::DecodeError) -> Self {
        Self::Base64Decode(err.to_string())
    }
}

impl From<saml_storage::StorageError> for SamlError {
    fn from(err: saml_storage::StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<saml_crypto::SignatureError> for SamlError {
    fn from(err: saml_crypto::SignatureError) -> Self {
        Self::Crypto(err.to_string())
    }
}

/// Failure to turn stored wire text back into a message.
///
/// Returned by the artifact entry accessor instead of a null so callers can
/// tell a corrupt entry from a missing one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeserializationError {
    /// The text is not well-formed XML.
    #[error("malformed message: {0}")]
    Malformed(String),

    /// No unmarshaller is registered for the root element.
    #[error("no unmarshaller registered for element '{0}'")]
    UnknownElement(String),

    /// A required element or attribute is missing.
    #[error("missing required element or attribute: {0}")]
    MissingElement(String),

    /// An element or attribute holds an unusable value.
    #[error("invalid value for {field}: {value}")]
    InvalidValue {
        /// The element or attribute name.
        field: String,
        /// The offending value.
        value: String,
    },
}

impl From<roxmltree::Error> for DeserializationError {
    fn from(err: roxmltree::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}
