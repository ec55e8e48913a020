//! XML Signature validation.
//!
//! Provides functionality for validating signatures on SAML documents.

use base64::Engine;
use tracing::debug;

use crate::error::{SamlError, SamlResult};

use crate::types::transform_algorithms;

use super::c14n::canonicalize;
use super::dom::{ds_descendant, enveloped_signature, find_by_id};
use super::{
    encode_b64, CanonicalizationAlgorithm, SignatureAlgorithm, SigningCredential,
    XmlSignature,
};

/// XML signature validator.
///
/// Validates enveloped signatures on SAML documents against a set of trusted
/// RSA public keys.
#[derive(Debug, Clone)]
pub struct XmlSignatureValidator {
    /// Trusted public keys (DER `RSAPublicKey`).
    trusted_keys: Vec<Vec<u8>>,
    /// Whether to allow SHA-1 signatures (deprecated but sometimes needed).
    allow_sha1: bool,
}

impl XmlSignatureValidator {
    /// Creates a new validator with the given trusted public keys.
    #[must_use]
    pub fn new(trusted_keys: Vec<Vec<u8>>) -> Self {
        Self {
            trusted_keys,
            allow_sha1: false,
        }
    }

    /// Trusts the public half of a signing credential.
    #[must_use]
    pub fn from_credential(credential: &SigningCredential) -> Self {
        Self::new(vec![credential.public_key_der()])
    }

    /// Trusts the keys of the given DER certificates.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Crypto`] if a certificate cannot be parsed.
    pub fn from_certificates(certificates_der: &[Vec<u8>]) -> SamlResult<Self> {
        let keys = certificates_der
            .iter()
            .map(|der| extract_public_key_from_cert(der))
            .collect::<SamlResult<Vec<_>>>()?;
        Ok(Self::new(keys))
    }

    /// Creates a validator from PEM-encoded certificates.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Crypto`] if a PEM block or certificate is invalid.
    pub fn from_pem(certificates_pem: &[&str]) -> SamlResult<Self> {
        let mut certs = Vec::new();
        for pem in certificates_pem {
            let der = saml_crypto::pem_to_der(pem, "CERTIFICATE")
                .ok_or_else(|| SamlError::Crypto("Invalid certificate PEM".to_string()))?;
            certs.push(der);
        }
        Self::from_certificates(&certs)
    }

    /// Allows SHA-1 based signatures (not recommended).
    #[must_use]
    pub const fn allow_sha1(mut self, allow: bool) -> Self {
        self.allow_sha1 = allow;
        self
    }

    /// Validates the enveloped signature of a serialized message.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::XmlParse`] for malformed input and
    /// [`SamlError::SignatureInvalid`] if the signature is missing, malformed,
    /// uses a refused algorithm, or does not verify.
    pub fn validate(&self, xml: &str) -> SamlResult<XmlSignature> {
        let doc = roxmltree::Document::parse(xml)?;
        let root = doc.root_element();

        let signature_node = enveloped_signature(root).ok_or_else(|| {
            SamlError::SignatureInvalid("No Signature element found".to_string())
        })?;
        let signed_info = ds_descendant(signature_node, "SignedInfo")
            .ok_or_else(|| SamlError::SignatureInvalid("No SignedInfo found".to_string()))?;

        let algorithm = ds_descendant(signed_info, "SignatureMethod")
            .and_then(|n| n.attribute("Algorithm"))
            .and_then(SignatureAlgorithm::from_uri)
            .ok_or_else(|| SamlError::SignatureInvalid("Invalid signature algorithm".to_string()))?;

        if algorithm.is_deprecated() && !self.allow_sha1 {
            return Err(SamlError::SignatureInvalid(
                "SHA-1 signatures are not allowed".to_string(),
            ));
        }

        let canonicalization = ds_descendant(signed_info, "CanonicalizationMethod")
            .and_then(|n| n.attribute("Algorithm"))
            .ok_or_else(|| {
                SamlError::SignatureInvalid("No CanonicalizationMethod found".to_string())
            })
            .and_then(|uri| {
                CanonicalizationAlgorithm::from_uri(uri).ok_or_else(|| {
                    SamlError::SignatureInvalid(format!("Unsupported canonicalization: {uri}"))
                })
            })?;

        let reference = ds_descendant(signed_info, "Reference")
            .ok_or_else(|| SamlError::SignatureInvalid("No Reference found".to_string()))?;
        let reference_uri = reference
            .attribute("URI")
            .ok_or_else(|| SamlError::SignatureInvalid("No Reference URI found".to_string()))?
            .to_string();
        let reference_canonicalization = reference_transforms(reference)?;

        let digest_value = node_text(ds_descendant(signed_info, "DigestValue"))
            .ok_or_else(|| SamlError::SignatureInvalid("No DigestValue found".to_string()))?;
        let signature_value = node_text(ds_descendant(signature_node, "SignatureValue"))
            .ok_or_else(|| SamlError::SignatureInvalid("No SignatureValue found".to_string()))?;
        let x509_certificate = node_text(ds_descendant(signature_node, "X509Certificate"));

        // The reference must point at the element that envelops the signature.
        let reference_id = reference_uri.strip_prefix('#').unwrap_or(&reference_uri);
        let referenced = find_by_id(&doc, reference_id).ok_or_else(|| {
            SamlError::SignatureInvalid(format!("Referenced element '{reference_id}' not found"))
        })?;
        if referenced != root {
            return Err(SamlError::SignatureInvalid(
                "Signature does not reference its enveloping element".to_string(),
            ));
        }

        let canonical = canonicalize(
            referenced,
            reference_canonicalization,
            Some(signature_node.id()),
        );
        let calculated = saml_crypto::digest(algorithm.digest_algorithm(), canonical.as_bytes());
        if encode_b64(&calculated) != digest_value {
            return Err(SamlError::SignatureInvalid(
                "Digest value mismatch".to_string(),
            ));
        }

        let signature_bytes = base64::engine::general_purpose::STANDARD
            .decode(&signature_value)
            .map_err(|e| SamlError::SignatureInvalid(format!("Invalid signature encoding: {e}")))?;
        let canonical_signed_info = canonicalize(signed_info, canonicalization, None);
        self.verify_with_trusted_keys(canonical_signed_info.as_bytes(), &signature_bytes, algorithm)?;

        debug!(reference = %reference_uri, algorithm = algorithm.uri(), "Signature verified");

        Ok(XmlSignature {
            algorithm,
            canonicalization,
            reference_uri,
            digest_value,
            signature_value,
            x509_certificate,
        })
    }

    fn verify_with_trusted_keys(
        &self,
        data: &[u8],
        signature: &[u8],
        algorithm: SignatureAlgorithm,
    ) -> SamlResult<()> {
        let rsa_alg = algorithm.rsa_algorithm().ok_or_else(|| {
            SamlError::SignatureInvalid(
                "ECDSA signature verification not yet implemented".to_string(),
            )
        })?;

        if self.trusted_keys.is_empty() {
            return Err(SamlError::SignatureInvalid(
                "No trusted keys configured".to_string(),
            ));
        }

        for key in &self.trusted_keys {
            if saml_crypto::rsa_verify(key, data, signature, rsa_alg)? {
                return Ok(());
            }
        }

        Err(SamlError::SignatureInvalid(
            "Signature verification failed with all trusted keys".to_string(),
        ))
    }
}

/// Reads the reference's transform chain.
///
/// The enveloped-signature transform is mandatory. The canonicalization
/// applied to the referenced element defaults to inclusive C14N when the
/// chain names none.
fn reference_transforms(
    reference: roxmltree::Node<'_, '_>,
) -> SamlResult<CanonicalizationAlgorithm> {
    let mut enveloped = false;
    let mut canonicalization = CanonicalizationAlgorithm::C14n;

    let transforms = reference
        .descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == "Transform");
    for transform in transforms {
        let uri = transform.attribute("Algorithm").unwrap_or_default();
        if uri == transform_algorithms::ENVELOPED_SIGNATURE {
            enveloped = true;
        } else if let Some(algorithm) = CanonicalizationAlgorithm::from_uri(uri) {
            canonicalization = algorithm;
        } else {
            return Err(SamlError::SignatureInvalid(format!("Unsupported transform: {uri}")));
        }
    }

    if !enveloped {
        return Err(SamlError::SignatureInvalid(
            "Reference lacks the enveloped-signature transform".to_string(),
        ));
    }
    Ok(canonicalization)
}

/// Element text with whitespace removed, if the element exists and is non-empty.
fn node_text(node: Option<roxmltree::Node<'_, '_>>) -> Option<String> {
    let text: String = node?
        .text()
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    (!text.is_empty()).then_some(text)
}

/// Extracts the RSA public key from an X.509 certificate.
fn extract_public_key_from_cert(cert_der: &[u8]) -> SamlResult<Vec<u8>> {
    use x509_parser::prelude::*;

    let (_, cert) = X509Certificate::from_der(cert_der)
        .map_err(|e| SamlError::Crypto(format!("Failed to parse certificate: {e}")))?;

    // For RSA keys the BIT STRING of the SubjectPublicKeyInfo is the DER RSAPublicKey.
    Ok(cert.public_key().subject_public_key.data.to_vec())
}
