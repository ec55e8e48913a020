//! Sign-before-serialize orchestration.
//!
//! The descriptor is attached to the message, the message is marshalled with
//! the empty signature template in place, and the signature is computed over
//! that exact text. Nothing re-serializes the message after signing.

use std::sync::Arc;

use tracing::debug;

use crate::codec::{MessageCodec, XmlMessageCodec};
use crate::error::{SamlError, SamlResult};
use crate::types::SamlMessage;

use super::{SecurityConfig, SignatureDescriptor, Signer, SigningCredential, XmlSigner};

/// Decides whether to sign and enforces the signing order.
#[derive(Clone)]
pub struct SigningPipeline {
    codec: Arc<dyn MessageCodec>,
    signer: Arc<dyn Signer>,
    security: SecurityConfig,
}

impl SigningPipeline {
    /// Creates a pipeline from its collaborators.
    #[must_use]
    pub fn new(
        codec: Arc<dyn MessageCodec>,
        signer: Arc<dyn Signer>,
        security: SecurityConfig,
    ) -> Self {
        Self {
            codec,
            signer,
            security,
        }
    }

    /// XML codec, XML-DSig signer and the given security configuration.
    #[must_use]
    pub fn with_security(security: SecurityConfig) -> Self {
        Self::new(
            Arc::new(XmlMessageCodec::with_defaults()),
            Arc::new(XmlSigner::new()),
            security,
        )
    }

    /// The security configuration used for signature parameters.
    #[must_use]
    pub fn security(&self) -> &SecurityConfig {
        &self.security
    }

    /// The codec used for marshalling.
    #[must_use]
    pub fn codec(&self) -> &Arc<dyn MessageCodec> {
        &self.codec
    }

    /// Builds the signature descriptor to attach to `message`.
    ///
    /// Returns `Ok(None)` when the message kind is not signable or no
    /// credential was supplied.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::SigningPreparation`] if the credential cannot be
    /// used with the configured parameters.
    pub fn sign_message(
        &self,
        message: &dyn SamlMessage,
        credential: Option<&SigningCredential>,
    ) -> SamlResult<Option<SignatureDescriptor>> {
        let Some(credential) = credential else {
            return Ok(None);
        };
        if !message.capabilities().signable {
            debug!(
                message = message.element_name(),
                "Message kind is not signable; skipping signature"
            );
            return Ok(None);
        }

        let mut descriptor = SignatureDescriptor::new(message.id(), credential.clone());
        self.signer
            .prepare_parameters(&mut descriptor, credential, None, &self.security)?;
        Ok(Some(descriptor))
    }

    /// Marshalls `message` and, if it carries a signature descriptor,
    /// computes the signature over the marshalled text.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Encoding`] if the message cannot be marshalled and
    /// [`SamlError::Signing`] if the signature cannot be computed.
    pub fn marshall(&self, message: &dyn SamlMessage) -> SamlResult<String> {
        let serialized = self.codec.serialize(message).map_err(|e| {
            SamlError::Encoding(format!("unable to marshall {}: {e}", message.element_name()))
        })?;

        match message.signature() {
            Some(descriptor) => self.signer.compute_signature(&serialized, descriptor),
            None => Ok(serialized),
        }
    }
}

impl Default for SigningPipeline {
    fn default() -> Self {
        Self::with_security(SecurityConfig::default())
    }
}

impl std::fmt::Debug for SigningPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningPipeline")
            .field("security", &self.security)
            .finish_non_exhaustive()
    }
}
