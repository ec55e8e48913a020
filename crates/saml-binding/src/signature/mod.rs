//! XML Signature support for SAML.
//!
//! This module provides XML Digital Signature (XML-DSig) support for
//! signing and validating SAML messages.
//!
//! Signing is split in two so that the signature is always computed over the
//! exact bytes that will be transmitted:
//!
//! 1. [`Signer::prepare_parameters`] fills a [`SignatureDescriptor`] from the
//!    credential and the [`SecurityConfig`]; the descriptor is attached to the
//!    message and marshalled as an empty `ds:Signature` template.
//! 2. [`Signer::compute_signature`] takes the marshalled text, fills in the
//!    digest and signature values, and returns the final wire form.
//!
//! # Signing Algorithms
//!
//! - RSA-SHA256 (recommended)
//! - RSA-SHA384
//! - RSA-SHA512
//!
//! ECDSA URIs are recognised so that a mismatched configuration is reported
//! clearly; credentials are RSA only. Legacy SHA-1 is accepted for
//! verification when explicitly allowed, never for signing.

mod c14n;
mod dom;
mod pipeline;
mod signer;
mod validator;

pub use pipeline::*;
pub use signer::*;
pub use validator::*;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use base64::Engine;
use quick_xml::escape::escape;
use saml_crypto::{DigestAlgorithm, RsaAlgorithm, RsaKeyPair};
use serde::{Deserialize, Serialize};

use crate::error::{SamlError, SamlResult};
use crate::types::{
    canonicalization_algorithms, signature_algorithms, transform_algorithms, XMLDSIG_NS,
};

/// Signature algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureAlgorithm {
    /// RSA with SHA-256 (recommended).
    #[default]
    RsaSha256,
    /// RSA with SHA-384.
    RsaSha384,
    /// RSA with SHA-512.
    RsaSha512,
    /// ECDSA with SHA-256.
    EcdsaSha256,
    /// ECDSA with SHA-384.
    EcdsaSha384,
    /// Legacy RSA with SHA-1 (not recommended).
    RsaSha1,
}

impl SignatureAlgorithm {
    /// Returns the URI for this signature algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::RsaSha256 => signature_algorithms::RSA_SHA256,
            Self::RsaSha384 => signature_algorithms::RSA_SHA384,
            Self::RsaSha512 => signature_algorithms::RSA_SHA512,
            Self::EcdsaSha256 => signature_algorithms::ECDSA_SHA256,
            Self::EcdsaSha384 => signature_algorithms::ECDSA_SHA384,
            Self::RsaSha1 => signature_algorithms::RSA_SHA1,
        }
    }

    /// Returns the digest algorithm used for the reference.
    #[must_use]
    pub const fn digest_algorithm(&self) -> DigestAlgorithm {
        match self {
            Self::RsaSha256 | Self::EcdsaSha256 => DigestAlgorithm::Sha256,
            Self::RsaSha384 | Self::EcdsaSha384 => DigestAlgorithm::Sha384,
            Self::RsaSha512 => DigestAlgorithm::Sha512,
            Self::RsaSha1 => DigestAlgorithm::Sha1,
        }
    }

    /// Returns the RSA primitive for this algorithm, if it is an RSA one.
    #[must_use]
    pub const fn rsa_algorithm(&self) -> Option<RsaAlgorithm> {
        match self {
            Self::RsaSha256 => Some(RsaAlgorithm::Rs256),
            Self::RsaSha384 => Some(RsaAlgorithm::Rs384),
            Self::RsaSha512 => Some(RsaAlgorithm::Rs512),
            Self::RsaSha1 => Some(RsaAlgorithm::Rs1),
            Self::EcdsaSha256 | Self::EcdsaSha384 => None,
        }
    }

    /// Parses a signature algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            signature_algorithms::RSA_SHA256 => Some(Self::RsaSha256),
            signature_algorithms::RSA_SHA384 => Some(Self::RsaSha384),
            signature_algorithms::RSA_SHA512 => Some(Self::RsaSha512),
            signature_algorithms::ECDSA_SHA256 => Some(Self::EcdsaSha256),
            signature_algorithms::ECDSA_SHA384 => Some(Self::EcdsaSha384),
            signature_algorithms::RSA_SHA1 => Some(Self::RsaSha1),
            _ => None,
        }
    }

    /// Returns true if this algorithm uses RSA.
    #[must_use]
    pub const fn is_rsa(&self) -> bool {
        matches!(
            self,
            Self::RsaSha256 | Self::RsaSha384 | Self::RsaSha512 | Self::RsaSha1
        )
    }

    /// Returns true if this algorithm uses a deprecated hash (SHA-1).
    #[must_use]
    pub const fn is_deprecated(&self) -> bool {
        matches!(self, Self::RsaSha1)
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = SamlError;

    /// Accepts either the short name (`rsa-sha256`) or the full URI.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let short = match s.to_ascii_lowercase().as_str() {
            "rsa-sha256" => Some(Self::RsaSha256),
            "rsa-sha384" => Some(Self::RsaSha384),
            "rsa-sha512" => Some(Self::RsaSha512),
            "ecdsa-sha256" => Some(Self::EcdsaSha256),
            "ecdsa-sha384" => Some(Self::EcdsaSha384),
            "rsa-sha1" => Some(Self::RsaSha1),
            _ => None,
        };
        short
            .or_else(|| Self::from_uri(s))
            .ok_or_else(|| SamlError::Configuration(format!("unknown signature algorithm: {s}")))
    }
}

/// Canonicalization algorithm selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CanonicalizationAlgorithm {
    /// Exclusive C14N without comments (recommended).
    #[default]
    ExclusiveC14n,
    /// Exclusive C14N with comments.
    ExclusiveC14nWithComments,
    /// Inclusive C14N without comments.
    C14n,
    /// Inclusive C14N with comments.
    C14nWithComments,
}

impl CanonicalizationAlgorithm {
    /// Returns the URI for this canonicalization algorithm.
    #[must_use]
    pub const fn uri(&self) -> &'static str {
        match self {
            Self::ExclusiveC14n => canonicalization_algorithms::EXCLUSIVE_C14N,
            Self::ExclusiveC14nWithComments => {
                canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS
            }
            Self::C14n => canonicalization_algorithms::C14N,
            Self::C14nWithComments => canonicalization_algorithms::C14N_WITH_COMMENTS,
        }
    }

    /// Whether only visibly utilized namespaces are rendered.
    #[must_use]
    pub const fn is_exclusive(&self) -> bool {
        matches!(self, Self::ExclusiveC14n | Self::ExclusiveC14nWithComments)
    }

    #[must_use]
    pub const fn with_comments(&self) -> bool {
        matches!(self, Self::ExclusiveC14nWithComments | Self::C14nWithComments)
    }

    /// Parses a canonicalization algorithm from its URI.
    #[must_use]
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            canonicalization_algorithms::EXCLUSIVE_C14N => Some(Self::ExclusiveC14n),
            canonicalization_algorithms::EXCLUSIVE_C14N_WITH_COMMENTS => {
                Some(Self::ExclusiveC14nWithComments)
            }
            canonicalization_algorithms::C14N => Some(Self::C14n),
            canonicalization_algorithms::C14N_WITH_COMMENTS => Some(Self::C14nWithComments),
            _ => None,
        }
    }
}

/// Security settings the signer draws its parameters from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Signature method.
    pub algorithm: SignatureAlgorithm,
    /// Canonicalization method.
    pub canonicalization: CanonicalizationAlgorithm,
    /// Key-info generator name: `x509`, `key-name` or `none`.
    pub key_info_generator: String,
    /// Whether SHA-1 based signatures may be used.
    pub allow_sha1: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            algorithm: SignatureAlgorithm::RsaSha256,
            canonicalization: CanonicalizationAlgorithm::ExclusiveC14n,
            key_info_generator: key_info_generators::X509.to_string(),
            allow_sha1: false,
        }
    }
}

impl SecurityConfig {
    /// Creates a configuration with the given algorithm.
    #[must_use]
    pub fn with_algorithm(algorithm: SignatureAlgorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }
}

/// Names of the key-info generators understood by the signer.
pub mod key_info_generators {
    /// Embed the X.509 certificate.
    pub const X509: &str = "x509";
    /// Emit the credential's entity id as `ds:KeyName`.
    pub const KEY_NAME: &str = "key-name";
    /// Emit no `ds:KeyInfo`.
    pub const NONE: &str = "none";
}

/// Key material used to sign outbound messages.
#[derive(Clone)]
pub struct SigningCredential {
    key_pair: Arc<RsaKeyPair>,
    certificate_der: Option<Vec<u8>>,
    entity_id: Option<String>,
}

impl SigningCredential {
    /// Wraps an RSA key pair.
    #[must_use]
    pub fn from_key_pair(key_pair: RsaKeyPair) -> Self {
        Self {
            key_pair: Arc::new(key_pair),
            certificate_der: None,
            entity_id: None,
        }
    }

    /// Loads an RSA private key from DER (PKCS#1 or PKCS#8).
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Crypto`] if the key cannot be parsed.
    pub fn from_der(private_key_der: &[u8]) -> SamlResult<Self> {
        let key_pair = saml_crypto::load_rsa_key_pair(private_key_der)?;
        Ok(Self::from_key_pair(key_pair))
    }

    /// Loads an RSA private key and optional certificate from PEM.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Crypto`] if the key PEM, the key, or a supplied
    /// certificate PEM is invalid.
    pub fn from_pem(private_key_pem: &str, certificate_pem: Option<&str>) -> SamlResult<Self> {
        let private_key_der = saml_crypto::pem_to_der(private_key_pem, "PRIVATE KEY")
            .or_else(|| saml_crypto::pem_to_der(private_key_pem, "RSA PRIVATE KEY"))
            .ok_or_else(|| SamlError::Crypto("Invalid private key PEM".to_string()))?;

        let mut credential = Self::from_der(&private_key_der)?;
        if let Some(pem) = certificate_pem {
            let der = saml_crypto::pem_to_der(pem, "CERTIFICATE")
                .ok_or_else(|| SamlError::Crypto("Invalid certificate PEM".to_string()))?;
            credential.certificate_der = Some(der);
        }
        Ok(credential)
    }

    /// Attaches an X.509 certificate (DER).
    #[must_use]
    pub fn with_certificate(mut self, certificate_der: Vec<u8>) -> Self {
        self.certificate_der = Some(certificate_der);
        self
    }

    /// Sets the entity id, used by the `key-name` generator.
    #[must_use]
    pub fn with_entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    /// The RSA key pair.
    #[must_use]
    pub fn key_pair(&self) -> &RsaKeyPair {
        &self.key_pair
    }

    /// The X.509 certificate, if any.
    #[must_use]
    pub fn certificate_der(&self) -> Option<&[u8]> {
        self.certificate_der.as_deref()
    }

    /// The entity id, if any.
    #[must_use]
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// DER `RSAPublicKey` of the credential, for verifiers.
    #[must_use]
    pub fn public_key_der(&self) -> Vec<u8> {
        saml_crypto::rsa_public_key_der(&self.key_pair)
    }
}

impl fmt::Debug for SigningCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningCredential")
            .field("modulus_bits", &(self.key_pair.public_modulus_len() * 8))
            .field("has_certificate", &self.certificate_der.is_some())
            .field("entity_id", &self.entity_id)
            .finish_non_exhaustive()
    }
}

/// `ds:KeyInfo` content to emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInfo {
    /// Base64 of the DER certificate.
    X509Certificate(String),
    /// A key name.
    KeyName(String),
}

/// A signature attached to a message before it is marshalled.
///
/// Marshalling renders it as a `ds:Signature` template whose digest and
/// signature values are empty; [`Signer::compute_signature`] fills them in.
#[derive(Debug, Clone)]
pub struct SignatureDescriptor {
    /// The signature algorithm.
    pub algorithm: SignatureAlgorithm,
    /// The canonicalization algorithm.
    pub canonicalization: CanonicalizationAlgorithm,
    /// ID of the signed element (without the '#').
    pub reference_id: String,
    /// Key info to embed.
    pub key_info: Option<KeyInfo>,
    /// The signing credential.
    pub credential: SigningCredential,
}

impl SignatureDescriptor {
    /// Creates a descriptor with default parameters bound to a credential.
    #[must_use]
    pub fn new(reference_id: impl Into<String>, credential: SigningCredential) -> Self {
        Self {
            algorithm: SignatureAlgorithm::default(),
            canonicalization: CanonicalizationAlgorithm::default(),
            reference_id: reference_id.into(),
            key_info: None,
            credential,
        }
    }

    /// Renders the unsigned `ds:Signature` template.
    #[must_use]
    pub fn template(&self) -> String {
        let mut xml = String::with_capacity(1024);
        xml.push_str(&format!(r#"<ds:Signature xmlns:ds="{XMLDSIG_NS}">"#));
        xml.push_str("<ds:SignedInfo>");
        xml.push_str(&format!(
            r#"<ds:CanonicalizationMethod Algorithm="{}"/>"#,
            self.canonicalization.uri()
        ));
        xml.push_str(&format!(
            r#"<ds:SignatureMethod Algorithm="{}"/>"#,
            self.algorithm.uri()
        ));
        xml.push_str(&format!(
            r##"<ds:Reference URI="#{}">"##,
            escape(self.reference_id.as_str())
        ));
        xml.push_str(&format!(
            r#"<ds:Transforms><ds:Transform Algorithm="{}"/><ds:Transform Algorithm="{}"/></ds:Transforms>"#,
            transform_algorithms::ENVELOPED_SIGNATURE,
            self.canonicalization.uri()
        ));
        xml.push_str(&format!(
            r#"<ds:DigestMethod Algorithm="{}"/>"#,
            self.algorithm.digest_algorithm().xml_dsig_uri()
        ));
        xml.push_str("<ds:DigestValue></ds:DigestValue>");
        xml.push_str("</ds:Reference></ds:SignedInfo>");
        xml.push_str("<ds:SignatureValue></ds:SignatureValue>");

        match &self.key_info {
            Some(KeyInfo::X509Certificate(cert_b64)) => xml.push_str(&format!(
                "<ds:KeyInfo><ds:X509Data><ds:X509Certificate>{cert_b64}</ds:X509Certificate></ds:X509Data></ds:KeyInfo>"
            )),
            Some(KeyInfo::KeyName(name)) => xml.push_str(&format!(
                "<ds:KeyInfo><ds:KeyName>{}</ds:KeyName></ds:KeyInfo>",
                escape(name.as_str())
            )),
            None => {}
        }

        xml.push_str("</ds:Signature>");
        xml
    }
}

/// A signature read back from a signed document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlSignature {
    /// The signature algorithm used.
    pub algorithm: SignatureAlgorithm,
    /// The canonicalization algorithm used.
    pub canonicalization: CanonicalizationAlgorithm,
    /// The reference URI (typically `#` + the ID of the signed element).
    pub reference_uri: String,
    /// The digest value (base64 encoded).
    pub digest_value: String,
    /// The signature value (base64 encoded).
    pub signature_value: String,
    /// Optional X.509 certificate (base64 encoded, DER format).
    pub x509_certificate: Option<String>,
}

pub(crate) fn encode_b64(data: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_algorithm_uri_roundtrip() {
        for alg in [
            SignatureAlgorithm::RsaSha256,
            SignatureAlgorithm::RsaSha384,
            SignatureAlgorithm::RsaSha512,
            SignatureAlgorithm::EcdsaSha256,
        ] {
            assert_eq!(SignatureAlgorithm::from_uri(alg.uri()), Some(alg));
        }
    }

    #[test]
    fn signature_algorithm_properties() {
        assert!(SignatureAlgorithm::RsaSha256.is_rsa());
        assert!(!SignatureAlgorithm::RsaSha256.is_deprecated());
        assert!(!SignatureAlgorithm::EcdsaSha256.is_rsa());
        assert!(SignatureAlgorithm::EcdsaSha256.rsa_algorithm().is_none());
        assert!(SignatureAlgorithm::RsaSha1.is_deprecated());
        assert_eq!(
            SignatureAlgorithm::RsaSha384.digest_algorithm(),
            DigestAlgorithm::Sha384
        );
    }

    #[test]
    fn signature_algorithm_from_str() {
        assert_eq!(
            "RSA-SHA512".parse::<SignatureAlgorithm>().unwrap(),
            SignatureAlgorithm::RsaSha512
        );
        assert_eq!(
            signature_algorithms::RSA_SHA256
                .parse::<SignatureAlgorithm>()
                .unwrap(),
            SignatureAlgorithm::RsaSha256
        );
        assert!(matches!(
            "md5".parse::<SignatureAlgorithm>(),
            Err(SamlError::Configuration(_))
        ));
    }

    #[test]
    fn canonicalization_algorithm_uri_roundtrip() {
        for alg in [
            CanonicalizationAlgorithm::ExclusiveC14n,
            CanonicalizationAlgorithm::ExclusiveC14nWithComments,
            CanonicalizationAlgorithm::C14n,
            CanonicalizationAlgorithm::C14nWithComments,
        ] {
            assert_eq!(CanonicalizationAlgorithm::from_uri(alg.uri()), Some(alg));
        }
        assert!(CanonicalizationAlgorithm::ExclusiveC14n.is_exclusive());
        assert!(!CanonicalizationAlgorithm::C14n.is_exclusive());
        assert!(CanonicalizationAlgorithm::C14nWithComments.with_comments());
    }

    #[test]
    fn security_config_default() {
        let config = SecurityConfig::default();
        assert_eq!(config.algorithm, SignatureAlgorithm::RsaSha256);
        assert_eq!(config.key_info_generator, key_info_generators::X509);
        assert!(!config.allow_sha1);
    }

    #[test]
    fn from_pem_rejects_malformed_certificate() {
        let key_pem = include_str!("../../tests/fixtures/idp-key.pem");
        assert!(SigningCredential::from_pem(key_pem, None).is_ok());

        for cert in [
            "not a certificate",
            "-----BEGIN CERTIFICATE-----\n@@@\n-----END CERTIFICATE-----",
        ] {
            assert!(matches!(
                SigningCredential::from_pem(key_pem, Some(cert)),
                Err(SamlError::Crypto(msg)) if msg == "Invalid certificate PEM"
            ));
        }
    }

    #[test]
    fn template_has_empty_values() {
        let key_pair = saml_crypto::generate_rsa_key_pair(2048).unwrap();
        let mut descriptor =
            SignatureDescriptor::new("_abc", SigningCredential::from_key_pair(key_pair));
        descriptor.key_info = Some(KeyInfo::KeyName("https://idp.example.com".to_string()));

        let template = descriptor.template();
        assert!(template.starts_with("<ds:Signature xmlns:ds="));
        assert!(template.contains(r##"URI="#_abc""##));
        assert!(template.contains("<ds:DigestValue></ds:DigestValue>"));
        assert!(template.contains("<ds:SignatureValue></ds:SignatureValue>"));
        assert!(template.contains("<ds:KeyName>https://idp.example.com</ds:KeyName>"));
    }
}
