//! # saml-crypto
//!
//! Cryptographic primitives used by the SAML binding layer, backed by aws-lc-rs.
//!
//! ## Algorithms
//!
//! - Digests: SHA-256, SHA-384, SHA-512 (SHA-1 only for legacy peers)
//! - Signatures: RSA PKCS#1 v1.5 with SHA-256/384/512
//!
//! SAML 2.0 interoperability still requires RSA-SHA256 for most deployments,
//! so unlike a greenfield token service this crate does not refuse it.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod digest;
pub mod error;
pub mod pem;
pub mod rsa;

pub use digest::{digest, sha1, sha256, sha384, sha512, DigestAlgorithm};
pub use error::SignatureError;
pub use pem::pem_to_der;
pub use rsa::{
    generate_rsa_key_pair, load_rsa_key_pair, rsa_public_key_der, rsa_sign, rsa_verify, RsaAlgorithm,
    RsaKeyPair,
};
