//! XML Signature creation.
//!
//! Provides functionality for signing SAML documents using XML-DSig.

use tracing::debug;

use crate::error::{SamlError, SamlResult};

use super::c14n::canonicalize;
use super::dom::{ds_descendant, enveloped_signature, fill_element, find_by_id};
use super::{
    encode_b64, key_info_generators, KeyInfo, SecurityConfig, SignatureDescriptor,
    SigningCredential,
};

/// Produces enveloped signatures over serialized messages.
pub trait Signer: Send + Sync {
    /// Fills `descriptor` with the algorithm, canonicalization and key info
    /// derived from the credential and security configuration.
    ///
    /// `key_info_generator` overrides the configured generator when given.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SigningPreparation`] if the credential cannot be
    /// used with the configured parameters.
    fn prepare_parameters(
        &self,
        descriptor: &mut SignatureDescriptor,
        credential: &SigningCredential,
        key_info_generator: Option<&str>,
        config: &SecurityConfig,
    ) -> SamlResult<()>;

    /// Computes the signature over `serialized`, which must contain the
    /// descriptor's template, and returns the signed text.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Signing`] if the template cannot be located or
    /// the signing primitive fails.
    fn compute_signature(
        &self,
        serialized: &str,
        descriptor: &SignatureDescriptor,
    ) -> SamlResult<String>;
}

/// XML-DSig signer for RSA credentials.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlSigner;

impl XmlSigner {
    /// Creates a new signer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Fills the `ds:DigestValue` of the template.
    fn fill_digest(&self, xml: &str, descriptor: &SignatureDescriptor) -> SamlResult<String> {
        let doc = roxmltree::Document::parse(xml)
            .map_err(|e| SamlError::Signing(format!("serialized message is not XML: {e}")))?;

        let element = find_by_id(&doc, &descriptor.reference_id).ok_or_else(|| {
            SamlError::Signing(format!(
                "Element with ID '{}' not found",
                descriptor.reference_id
            ))
        })?;
        let signature = enveloped_signature(element)
            .ok_or_else(|| SamlError::Signing("No signature template in message".to_string()))?;
        let digest_node = ds_descendant(signature, "DigestValue")
            .ok_or_else(|| SamlError::Signing("No DigestValue in template".to_string()))?;

        let canonical = canonicalize(element, descriptor.canonicalization, Some(signature.id()));
        let digest = saml_crypto::digest(
            descriptor.algorithm.digest_algorithm(),
            canonical.as_bytes(),
        );

        fill_element(xml, digest_node.range(), &encode_b64(&digest))
            .ok_or_else(|| SamlError::Signing("Malformed DigestValue element".to_string()))
    }

    /// Signs `ds:SignedInfo` and fills the `ds:SignatureValue`.
    fn fill_signature_value(
        &self,
        xml: &str,
        descriptor: &SignatureDescriptor,
    ) -> SamlResult<String> {
        let doc = roxmltree::Document::parse(xml)
            .map_err(|e| SamlError::Signing(format!("digested message is not XML: {e}")))?;

        let element = find_by_id(&doc, &descriptor.reference_id).ok_or_else(|| {
            SamlError::Signing(format!(
                "Element with ID '{}' not found",
                descriptor.reference_id
            ))
        })?;
        let signature = enveloped_signature(element)
            .ok_or_else(|| SamlError::Signing("No signature template in message".to_string()))?;
        let signed_info = ds_descendant(signature, "SignedInfo")
            .ok_or_else(|| SamlError::Signing("No SignedInfo in template".to_string()))?;
        let value_node = ds_descendant(signature, "SignatureValue")
            .ok_or_else(|| SamlError::Signing("No SignatureValue in template".to_string()))?;

        let rsa_alg = descriptor.algorithm.rsa_algorithm().ok_or_else(|| {
            SamlError::Signing(format!(
                "Unsupported signature algorithm: {:?}",
                descriptor.algorithm
            ))
        })?;

        let canonical_signed_info = canonicalize(signed_info, descriptor.canonicalization, None);
        let signature_value = saml_crypto::rsa_sign(
            descriptor.credential.key_pair(),
            canonical_signed_info.as_bytes(),
            rsa_alg,
        )
        .map_err(|e| SamlError::Signing(format!("RSA signing failed: {e}")))?;

        fill_element(xml, value_node.range(), &encode_b64(&signature_value))
            .ok_or_else(|| SamlError::Signing("Malformed SignatureValue element".to_string()))
    }
}

impl Signer for XmlSigner {
    fn prepare_parameters(
        &self,
        descriptor: &mut SignatureDescriptor,
        credential: &SigningCredential,
        key_info_generator: Option<&str>,
        config: &SecurityConfig,
    ) -> SamlResult<()> {
        let algorithm = config.algorithm;
        if !algorithm.is_rsa() {
            return Err(SamlError::SigningPreparation(format!(
                "credential is an RSA key but {} was requested",
                algorithm.uri()
            )));
        }
        if algorithm.is_deprecated() && !config.allow_sha1 {
            return Err(SamlError::SigningPreparation(
                "SHA-1 signatures are not allowed".to_string(),
            ));
        }

        let generator = key_info_generator.unwrap_or(config.key_info_generator.as_str());
        let key_info = match generator {
            key_info_generators::X509 => {
                let cert = credential.certificate_der().ok_or_else(|| {
                    SamlError::SigningPreparation(
                        "x509 key info requested but credential has no certificate".to_string(),
                    )
                })?;
                Some(KeyInfo::X509Certificate(encode_b64(cert)))
            }
            key_info_generators::KEY_NAME => {
                let name = credential.entity_id().ok_or_else(|| {
                    SamlError::SigningPreparation(
                        "key-name key info requested but credential has no entity id".to_string(),
                    )
                })?;
                Some(KeyInfo::KeyName(name.to_string()))
            }
            key_info_generators::NONE => None,
            other => {
                return Err(SamlError::SigningPreparation(format!(
                    "unknown key info generator: {other}"
                )))
            }
        };

        descriptor.algorithm = algorithm;
        descriptor.canonicalization = config.canonicalization;
        descriptor.key_info = key_info;
        descriptor.credential = credential.clone();
        Ok(())
    }

    fn compute_signature(
        &self,
        serialized: &str,
        descriptor: &SignatureDescriptor,
    ) -> SamlResult<String> {
        let digested = self.fill_digest(serialized, descriptor)?;
        let signed = self.fill_signature_value(&digested, descriptor)?;

        debug!(
            reference = %descriptor.reference_id,
            algorithm = descriptor.algorithm.uri(),
            "Computed enveloped signature"
        );
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::SignatureAlgorithm;

    fn credential() -> SigningCredential {
        let key_pair = saml_crypto::generate_rsa_key_pair(2048).unwrap();
        SigningCredential::from_key_pair(key_pair).with_entity_id("https://idp.example.com")
    }

    fn descriptor(credential: &SigningCredential) -> SignatureDescriptor {
        SignatureDescriptor::new("_r1", credential.clone())
    }

    #[test]
    fn prepare_with_key_name() {
        let credential = credential();
        let mut descriptor = descriptor(&credential);
        XmlSigner::new()
            .prepare_parameters(
                &mut descriptor,
                &credential,
                Some(key_info_generators::KEY_NAME),
                &SecurityConfig::with_algorithm(SignatureAlgorithm::RsaSha512),
            )
            .unwrap();

        assert_eq!(descriptor.algorithm, SignatureAlgorithm::RsaSha512);
        assert_eq!(
            descriptor.key_info,
            Some(KeyInfo::KeyName("https://idp.example.com".to_string()))
        );
    }

    #[test]
    fn x509_without_certificate_fails() {
        let credential = credential();
        let mut descriptor = descriptor(&credential);
        let result = XmlSigner::new().prepare_parameters(
            &mut descriptor,
            &credential,
            None,
            &SecurityConfig::default(),
        );
        assert!(matches!(result, Err(SamlError::SigningPreparation(_))));
    }

    #[test]
    fn ecdsa_algorithm_mismatch_fails() {
        let credential = credential();
        let mut descriptor = descriptor(&credential);
        let result = XmlSigner::new().prepare_parameters(
            &mut descriptor,
            &credential,
            Some(key_info_generators::NONE),
            &SecurityConfig::with_algorithm(SignatureAlgorithm::EcdsaSha256),
        );
        assert!(matches!(result, Err(SamlError::SigningPreparation(_))));
    }

    #[test]
    fn sha1_requires_opt_in() {
        let credential = credential();
        let mut descriptor = descriptor(&credential);
        let result = XmlSigner::new().prepare_parameters(
            &mut descriptor,
            &credential,
            Some(key_info_generators::NONE),
            &SecurityConfig::with_algorithm(SignatureAlgorithm::RsaSha1),
        );
        assert!(matches!(result, Err(SamlError::SigningPreparation(_))));
    }

    #[test]
    fn unknown_generator_fails() {
        let credential = credential();
        let mut descriptor = descriptor(&credential);
        let result = XmlSigner::new().prepare_parameters(
            &mut descriptor,
            &credential,
            Some("der-value"),
            &SecurityConfig::default(),
        );
        assert!(matches!(result, Err(SamlError::SigningPreparation(_))));
    }

    #[test]
    fn compute_fills_template() {
        let credential = credential();
        let descriptor = descriptor(&credential);
        let xml = format!(
            r#"<samlp:Response xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" ID="_r1"><Issuer>idp</Issuer>{}</samlp:Response>"#,
            descriptor.template()
        );

        let signed = XmlSigner::new().compute_signature(&xml, &descriptor).unwrap();
        assert!(!signed.contains("<ds:DigestValue></ds:DigestValue>"));
        assert!(!signed.contains("<ds:SignatureValue></ds:SignatureValue>"));
        assert!(signed.ends_with("</samlp:Response>"));
    }

    #[test]
    fn compute_without_template_fails() {
        let credential = credential();
        let descriptor = descriptor(&credential);
        let xml = r#"<Response ID="_r1"><Issuer>idp</Issuer></Response>"#;
        let result = XmlSigner::new().compute_signature(xml, &descriptor);
        assert!(matches!(result, Err(SamlError::Signing(_))));
    }
}
