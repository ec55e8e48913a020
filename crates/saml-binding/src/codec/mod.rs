//! Message codec.
//!
//! Turns protocol messages into their wire text and back. The artifact map
//! stores the serialized form; the signing pipeline signs it.

mod xml;

pub use xml::*;

use crate::error::{DeserializationError, SamlResult};
use crate::types::SamlMessage;

/// Serializes messages to text and back.
pub trait MessageCodec: Send + Sync {
    /// Serializes a message.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SamlError::Serialization`] if the message kind has no
    /// serializer or cannot be written.
    fn serialize(&self, message: &dyn SamlMessage) -> SamlResult<String>;

    /// Parses text back into a message.
    ///
    /// # Errors
    ///
    /// Returns a [`DeserializationError`] describing why the text is unusable.
    fn deserialize(&self, text: &str) -> Result<Box<dyn SamlMessage>, DeserializationError>;
}

/// Marshaller for one message element.
pub trait MessageMarshaller: Send + Sync {
    /// Local name of the root element this marshaller handles.
    fn element_name(&self) -> &'static str;

    /// Writes the message as a compact XML element.
    ///
    /// # Errors
    ///
    /// Returns [`crate::SamlError::Serialization`] if the message is not of
    /// the expected concrete type.
    fn marshall(&self, message: &dyn SamlMessage) -> SamlResult<String>;

    /// Reads a message from its root element. `text` is the full document
    /// text the node was parsed from.
    ///
    /// # Errors
    ///
    /// Returns a [`DeserializationError`] for missing or invalid content.
    fn unmarshall(
        &self,
        node: roxmltree::Node<'_, '_>,
        text: &str,
    ) -> Result<Box<dyn SamlMessage>, DeserializationError>;
}
