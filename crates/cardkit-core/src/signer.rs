//! Model signer: attaches self and co-signer signatures to raw models.
//!
//! Every signature covers the content snapshot, followed by the signer's
//! extra-fields snapshot when one is present. Signatures are only ever
//! appended; a model needing a different signature set is regenerated.

use bytes::Bytes;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::canonical::take_snapshot;
use crate::crypto::{CardCrypto, PrivateKey};
use crate::error::{Result, ValidationError};
use crate::model::{RawSignature, RawSignedModel, SELF_SIGNER};

/// Per-signature metadata, snapshotted next to the signature.
pub type ExtraFields = BTreeMap<String, String>;

/// Construct the signed message (content_snapshot || extra_snapshot).
pub fn signed_data(content_snapshot: &[u8], extra_snapshot: Option<&[u8]>) -> Vec<u8> {
    let extra = extra_snapshot.unwrap_or_default();
    let mut buf = Vec::with_capacity(content_snapshot.len() + extra.len());
    buf.extend_from_slice(content_snapshot);
    buf.extend_from_slice(extra);
    buf
}

/// Signs raw signed models through an injected crypto capability.
#[derive(Clone)]
pub struct ModelSigner {
    crypto: Arc<dyn CardCrypto>,
}

impl ModelSigner {
    /// Create a signer backed by `crypto`.
    pub fn new(crypto: Arc<dyn CardCrypto>) -> Self {
        Self { crypto }
    }

    /// Add the owner's signature under the reserved `"self"` signer.
    pub fn self_sign(
        &self,
        model: &mut RawSignedModel,
        private_key: &PrivateKey,
        extra_fields: Option<&ExtraFields>,
    ) -> Result<()> {
        self.sign(model, SELF_SIGNER, private_key, extra_fields)
    }

    /// Add a signature for a named signer role.
    ///
    /// Fails with [`ValidationError::DuplicateSigner`] if `signer` already
    /// signed the model; the model is unchanged in that case.
    pub fn sign(
        &self,
        model: &mut RawSignedModel,
        signer: &str,
        private_key: &PrivateKey,
        extra_fields: Option<&ExtraFields>,
    ) -> Result<()> {
        if signer.is_empty() {
            return Err(ValidationError::EmptySigner.into());
        }
        if model.has_signer(signer) {
            return Err(ValidationError::DuplicateSigner(signer.to_string()).into());
        }

        let extra_snapshot = extra_fields.map(take_snapshot).transpose()?;
        let message = signed_data(model.content_snapshot(), extra_snapshot.as_deref());
        let signature = self.crypto.generate_signature(&message, private_key)?;

        model.push_signature(RawSignature {
            signer: signer.to_string(),
            signature: Bytes::from(signature),
            snapshot: extra_snapshot.map(Bytes::from),
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{Ed25519Crypto, Keypair};
    use crate::error::CoreError;
    use crate::model::CardContentBuilder;

    fn setup() -> (ModelSigner, Ed25519Crypto, Keypair, RawSignedModel) {
        let crypto = Ed25519Crypto::new();
        let keypair = Keypair::from_seed(&[0x42; 32]);
        let model = CardContentBuilder::new("alice", keypair.public_key().0.to_vec())
            .created_at(1_736_870_400)
            .freeze()
            .unwrap();
        (ModelSigner::new(Arc::new(crypto)), crypto, keypair, model)
    }

    #[test]
    fn test_self_sign_covers_content() {
        let (signer, crypto, keypair, mut model) = setup();
        signer.self_sign(&mut model, keypair.private_key(), None).unwrap();

        assert_eq!(model.signatures().len(), 1);
        let sig = &model.signatures()[0];
        assert_eq!(sig.signer, SELF_SIGNER);
        assert!(sig.snapshot.is_none());
        assert!(crypto.verify_signature(
            &sig.signature,
            model.content_snapshot(),
            &keypair.public_key()
        ));
    }

    #[test]
    fn test_self_sign_covers_extra_fields() {
        let (signer, crypto, keypair, mut model) = setup();
        let mut extra = ExtraFields::new();
        extra.insert("device".into(), "laptop".into());

        signer
            .self_sign(&mut model, keypair.private_key(), Some(&extra))
            .unwrap();

        let sig = &model.signatures()[0];
        let snapshot = sig.snapshot.as_ref().expect("extra snapshot");
        let message = signed_data(model.content_snapshot(), Some(&snapshot[..]));
        assert!(crypto.verify_signature(&sig.signature, &message, &keypair.public_key()));
        assert!(!crypto.verify_signature(
            &sig.signature,
            model.content_snapshot(),
            &keypair.public_key()
        ));
    }

    #[test]
    fn test_double_self_sign_fails_and_keeps_signatures() {
        let (signer, _, keypair, mut model) = setup();
        signer.self_sign(&mut model, keypair.private_key(), None).unwrap();
        let before = model.clone();

        let err = signer
            .self_sign(&mut model, keypair.private_key(), None)
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::DuplicateSigner(ref s)) if s == SELF_SIGNER
        ));
        assert_eq!(model, before);
    }

    #[test]
    fn test_named_signers_append_in_order() {
        let (signer, _, keypair, mut model) = setup();
        let witness = Keypair::from_seed(&[0x01; 32]);

        signer.self_sign(&mut model, keypair.private_key(), None).unwrap();
        signer
            .sign(&mut model, "witness", witness.private_key(), None)
            .unwrap();

        let names: Vec<&str> = model.signatures().iter().map(|s| s.signer.as_str()).collect();
        assert_eq!(names, vec![SELF_SIGNER, "witness"]);

        assert!(signer
            .sign(&mut model, "witness", witness.private_key(), None)
            .is_err());
        assert_eq!(model.signatures().len(), 2);
    }

    #[test]
    fn test_empty_signer_rejected() {
        let (signer, _, keypair, mut model) = setup();
        assert!(matches!(
            signer.sign(&mut model, "", keypair.private_key(), None),
            Err(CoreError::Validation(ValidationError::EmptySigner))
        ));
    }

    #[test]
    fn test_signed_data_concatenation() {
        assert_eq!(signed_data(b"abc", None), b"abc".to_vec());
        assert_eq!(signed_data(b"abc", Some(&b"de"[..])), b"abcde".to_vec());
    }
}
