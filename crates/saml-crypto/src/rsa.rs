//! RSA PKCS#1 v1.5 signatures for XML-DSig.
//!
//! Signing supports SHA-256, SHA-384 and SHA-512. SHA-1 is verification only.

use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::rsa::KeySize;
use aws_lc_rs::signature::{self, KeyPair, UnparsedPublicKey};
use serde::{Deserialize, Serialize};

use crate::error::SignatureError;

pub use aws_lc_rs::signature::RsaKeyPair;

/// RSA signature algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RsaAlgorithm {
    /// RSA PKCS#1 v1.5 with SHA-1. Verification only.
    Rs1,
    /// RSA PKCS#1 v1.5 with SHA-256.
    Rs256,
    /// RSA PKCS#1 v1.5 with SHA-384.
    Rs384,
    /// RSA PKCS#1 v1.5 with SHA-512.
    Rs512,
}

/// Parses an RSA private key from DER (PKCS#1 or PKCS#8).
///
/// # Errors
///
/// Returns [`SignatureError::InvalidKey`] if neither encoding is accepted.
pub fn load_rsa_key_pair(key_der: &[u8]) -> Result<RsaKeyPair, SignatureError> {
    RsaKeyPair::from_der(key_der)
        .or_else(|_| RsaKeyPair::from_pkcs8(key_der))
        .map_err(|e| SignatureError::InvalidKey(format!("Invalid RSA key: {e}")))
}

/// Generates a fresh RSA key pair.
///
/// Only 2048, 3072, 4096 and 8192 bit moduli are supported.
///
/// # Errors
///
/// Returns [`SignatureError::KeyGeneration`] for unsupported sizes or when the
/// underlying generator fails.
pub fn generate_rsa_key_pair(bits: u32) -> Result<RsaKeyPair, SignatureError> {
    let size = match bits {
        2048 => KeySize::Rsa2048,
        3072 => KeySize::Rsa3072,
        4096 => KeySize::Rsa4096,
        8192 => KeySize::Rsa8192,
        other => {
            return Err(SignatureError::KeyGeneration(format!(
                "unsupported RSA key size: {other}"
            )))
        }
    };

    RsaKeyPair::generate(size)
        .map_err(|e| SignatureError::KeyGeneration(format!("RSA key generation failed: {e}")))
}

/// Returns the DER-encoded `RSAPublicKey` of a key pair.
#[must_use]
pub fn rsa_public_key_der(key_pair: &RsaKeyPair) -> Vec<u8> {
    key_pair.public_key().as_ref().to_vec()
}

/// Signs data using RSA PKCS#1 v1.5.
///
/// # Errors
///
/// Returns [`SignatureError::UnsupportedAlgorithm`] for SHA-1, which is never
/// used to produce new signatures, and [`SignatureError::Signing`] if the
/// signing operation fails.
pub fn rsa_sign(
    key_pair: &RsaKeyPair,
    data: &[u8],
    algorithm: RsaAlgorithm,
) -> Result<Vec<u8>, SignatureError> {
    let padding = match algorithm {
        RsaAlgorithm::Rs1 => {
            return Err(SignatureError::UnsupportedAlgorithm(
                "RSA-SHA1 is accepted for verification only".to_string(),
            ))
        }
        RsaAlgorithm::Rs256 => &signature::RSA_PKCS1_SHA256,
        RsaAlgorithm::Rs384 => &signature::RSA_PKCS1_SHA384,
        RsaAlgorithm::Rs512 => &signature::RSA_PKCS1_SHA512,
    };

    let rng = SystemRandom::new();
    let mut sig = vec![0u8; key_pair.public_modulus_len()];
    key_pair
        .sign(padding, &rng, data, &mut sig)
        .map_err(|e| SignatureError::Signing(format!("RSA signing failed: {e}")))?;

    Ok(sig)
}

/// Verifies an RSA PKCS#1 v1.5 signature.
///
/// `public_key_der` may be a DER `RSAPublicKey` or a `SubjectPublicKeyInfo`.
/// A signature that does not verify yields `Ok(false)`.
///
/// # Errors
///
/// A malformed public key is not an error; it fails verification.
pub fn rsa_verify(
    public_key_der: &[u8],
    data: &[u8],
    sig: &[u8],
    algorithm: RsaAlgorithm,
) -> Result<bool, SignatureError> {
    let verification_alg: &'static dyn signature::VerificationAlgorithm = match algorithm {
        RsaAlgorithm::Rs1 => &signature::RSA_PKCS1_2048_8192_SHA1_FOR_LEGACY_USE_ONLY,
        RsaAlgorithm::Rs256 => &signature::RSA_PKCS1_2048_8192_SHA256,
        RsaAlgorithm::Rs384 => &signature::RSA_PKCS1_2048_8192_SHA384,
        RsaAlgorithm::Rs512 => &signature::RSA_PKCS1_2048_8192_SHA512,
    };

    let public_key = UnparsedPublicKey::new(verification_alg, public_key_der);

    match public_key.verify(data, sig) {
        Ok(()) => Ok(true),
        Err(_) => Ok(false),
    }
}
