//! SAML 2.0 protocol messages.
//!
//! The message model is deliberately small: just the fields the binding layer
//! reads or writes. Assertions travel as opaque, already-marshalled elements.

/// Implements [`SamlMessage`] for a struct with `id`, `issuer`,
/// `destination` and `signature` fields.
macro_rules! impl_saml_message {
    ($ty:ty, $element:literal, $caps:expr) => {
        impl $crate::types::SamlMessage for $ty {
            fn element_name(&self) -> &'static str {
                $element
            }

            fn id(&self) -> &str {
                &self.id
            }

            fn issuer(&self) -> &str {
                &self.issuer
            }

            fn capabilities(&self) -> $crate::types::MessageCapabilities {
                $caps
            }

            fn destination(&self) -> Option<&str> {
                self.destination.as_deref()
            }

            fn set_destination(&mut self, destination: Option<String>) {
                self.destination = destination;
            }

            fn signature(&self) -> Option<&$crate::signature::SignatureDescriptor> {
                self.signature.as_ref()
            }

            fn set_signature(&mut self, signature: Option<$crate::signature::SignatureDescriptor>) {
                self.signature = signature;
            }

            fn as_any(&self) -> &dyn ::std::any::Any {
                self
            }
        }
    };
}

pub(crate) use impl_saml_message;

mod authn_request;
mod constants;
mod logout;
mod message;
mod response;
mod status;

pub use authn_request::*;
pub use constants::*;
pub use logout::*;
pub use message::*;
pub use response::*;
pub use status::*;

/// Generates a fresh message ID.
///
/// XML IDs must not start with a digit, so the UUID is prefixed.
pub(crate) fn generate_id() -> String {
    format!("_{}", uuid::Uuid::new_v4().simple())
}
