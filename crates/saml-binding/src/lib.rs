//! SAML 2.0 binding layer.
//!
//! This crate covers the outbound half of SAML message transport:
//!
//! - **Artifact map** - Park a message behind an opaque, short-lived artifact and redeem it later
//! - **Endpoint resolution** - Pick the peer URL from metadata, never from the inbound request
//! - **Signing pipeline** - Attach an XML-DSig signature before the message is marshalled
//! - **Binding encoders** - HTTP-POST auto-submit form and SOAP 1.1 envelope
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`types`] - Protocol messages and constants
//! - [`codec`] - Marshalling messages to and from XML
//! - [`signature`] - XML signature signing and validation
//! - [`endpoint`] - Peer endpoint resolution and relay-state checks
//! - [`bindings`] - HTTP-POST and SOAP encoders
//! - [`artifact`] - Artifact map over a storage backend
//! - [`config`] - Environment-driven configuration
//! - [`error`] - Error types for SAML operations
//!
//! # Example
//!
//! ```rust,ignore
//! use saml_binding::bindings::{BufferedResponse, HttpPostEncoder, MessageEncoder};
//! use saml_binding::context::MessageContext;
//! use saml_binding::endpoint::Endpoint;
//!
//! let context = MessageContext::new(Response::success("https://idp.example.com"))
//!     .with_endpoint(Endpoint::new("https://sp.example.com/acs"))
//!     .with_credential(credential);
//!
//! let mut response = BufferedResponse::new();
//! HttpPostEncoder::default().encode(context, &mut response)?;
//! ```
//!
//! # SAML Specifications
//!
//! - [SAML 2.0 Core](https://docs.oasis-open.org/security/saml/v2.0/saml-core-2.0-os.pdf)
//! - [SAML 2.0 Bindings](https://docs.oasis-open.org/security/saml/v2.0/saml-bindings-2.0-os.pdf)
//! - [XML Signature](https://www.w3.org/TR/xmldsig-core1/)

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod artifact;
pub mod bindings;
pub mod codec;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod signature;
pub mod types;

pub use error::{DeserializationError, SamlError, SamlResult};
pub use types::*;
