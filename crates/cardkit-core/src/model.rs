//! Raw signed model: the wire and storage form of a card.
//!
//! A model is a content snapshot plus an ordered list of signatures. The
//! content is fixed when the model is produced by [`CardContentBuilder::freeze`];
//! after that the only mutation is appending signatures through
//! [`crate::signer::ModelSigner`]. Changes to content mean a new model.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::canonical::{parse_snapshot, take_snapshot};
use crate::crypto::{CardCrypto, PublicKey};
use crate::error::{CoreError, Result, ValidationError};
use crate::types::CardId;

/// The current card content format version.
pub const CARD_VERSION: &str = "5.0";

/// Signer name reserved for the card owner's own signature.
pub const SELF_SIGNER: &str = "self";

/// Decoded content of a card, as stored in the content snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCardContent {
    /// The identity this card binds a key to.
    pub identity: String,

    /// Exported public key bytes.
    pub public_key: Bytes,

    /// Content format version.
    pub version: String,

    /// Creation time (Unix seconds).
    pub created_at: i64,

    /// Id of the card this one supersedes. Omitted from the snapshot when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_card_id: Option<CardId>,
}

/// Editable content stage.
///
/// All content fields are set here; [`freeze`](Self::freeze) snapshots them
/// into a [`RawSignedModel`] that can no longer be edited.
#[derive(Debug, Clone)]
pub struct CardContentBuilder {
    identity: String,
    public_key: Vec<u8>,
    version: String,
    created_at: Option<i64>,
    previous_card_id: Option<CardId>,
}

impl CardContentBuilder {
    /// Start building content for `identity` and exported public key bytes.
    pub fn new(identity: impl Into<String>, public_key: impl Into<Vec<u8>>) -> Self {
        Self {
            identity: identity.into(),
            public_key: public_key.into(),
            version: CARD_VERSION.to_string(),
            created_at: None,
            previous_card_id: None,
        }
    }

    /// Set the creation time (defaults to now).
    pub fn created_at(mut self, secs: i64) -> Self {
        self.created_at = Some(secs);
        self
    }

    /// Set the content format version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the superseded card.
    pub fn previous_card_id(mut self, id: Option<CardId>) -> Self {
        self.previous_card_id = id;
        self
    }

    /// Snapshot the content into an unsigned model.
    pub fn freeze(self) -> Result<RawSignedModel> {
        if self.identity.trim().is_empty() {
            return Err(ValidationError::MissingIdentity.into());
        }
        if self.public_key.is_empty() {
            return Err(ValidationError::MissingPublicKey.into());
        }

        let content = RawCardContent {
            identity: self.identity,
            public_key: Bytes::from(self.public_key),
            version: self.version,
            created_at: self.created_at.unwrap_or_else(now_secs),
            previous_card_id: self.previous_card_id,
        };
        let snapshot = take_snapshot(&content)?;

        Ok(RawSignedModel {
            content_snapshot: Bytes::from(snapshot),
            previous_card_id: content.previous_card_id,
            signatures: Vec::new(),
        })
    }
}

/// A single signature attached to a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSignature {
    /// Signer role (`"self"` for the owner).
    pub signer: String,

    /// Signature over `content_snapshot || snapshot`.
    pub signature: Bytes,

    /// Optional extra-fields snapshot covered by the signature.
    pub snapshot: Option<Bytes>,
}

/// Content snapshot plus ordered signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSignedModelJson", into = "RawSignedModelJson")]
pub struct RawSignedModel {
    content_snapshot: Bytes,
    previous_card_id: Option<CardId>,
    signatures: Vec<RawSignature>,
}

impl RawSignedModel {
    /// Generate an unsigned model from identity, key and previous card id.
    pub fn generate(
        crypto: &dyn CardCrypto,
        identity: &str,
        public_key: &PublicKey,
        previous_card_id: Option<CardId>,
    ) -> Result<Self> {
        CardContentBuilder::new(identity, crypto.export_public_key(public_key))
            .previous_card_id(previous_card_id)
            .freeze()
    }

    /// Reassemble a model from its parts (e.g. received from a card service).
    ///
    /// Rejects an empty content snapshot and duplicate signer names. When
    /// the content decodes, `previous_card_id` must match the one it carries.
    pub fn from_parts(
        content_snapshot: impl Into<Bytes>,
        previous_card_id: Option<CardId>,
        signatures: Vec<RawSignature>,
    ) -> Result<Self> {
        let content_snapshot = content_snapshot.into();
        if content_snapshot.is_empty() {
            return Err(CoreError::MalformedModel("empty content snapshot".into()));
        }
        if let Ok(content) = parse_snapshot::<RawCardContent>(&content_snapshot) {
            if content.previous_card_id != previous_card_id {
                return Err(CoreError::MalformedModel(
                    "previous_card_id disagrees with the content snapshot".into(),
                ));
            }
        }

        let mut model = Self {
            content_snapshot,
            previous_card_id,
            signatures: Vec::with_capacity(signatures.len()),
        };
        for signature in signatures {
            model
                .push_signature(signature)
                .map_err(|e| CoreError::MalformedModel(e.to_string()))?;
        }
        Ok(model)
    }

    /// The canonical content bytes.
    pub fn content_snapshot(&self) -> &Bytes {
        &self.content_snapshot
    }

    /// The superseded card id carried alongside the content.
    pub fn previous_card_id(&self) -> Option<&CardId> {
        self.previous_card_id.as_ref()
    }

    /// Signatures in insertion order.
    pub fn signatures(&self) -> &[RawSignature] {
        &self.signatures
    }

    /// Look up a signature by signer name.
    pub fn signature(&self, signer: &str) -> Option<&RawSignature> {
        self.signatures.iter().find(|s| s.signer == signer)
    }

    /// Check whether `signer` has signed this model.
    pub fn has_signer(&self, signer: &str) -> bool {
        self.signature(signer).is_some()
    }

    /// Decode the content snapshot.
    pub fn content(&self) -> Result<RawCardContent> {
        parse_snapshot(&self.content_snapshot)
    }

    /// Append a signature, refusing duplicate signers.
    ///
    /// The signature list is left untouched on failure.
    pub(crate) fn push_signature(
        &mut self,
        signature: RawSignature,
    ) -> std::result::Result<(), ValidationError> {
        if signature.signer.is_empty() {
            return Err(ValidationError::EmptySigner);
        }
        if self.has_signer(&signature.signer) {
            return Err(ValidationError::DuplicateSigner(signature.signer));
        }
        self.signatures.push(signature);
        Ok(())
    }

    /// Export as a JSON document.
    pub fn export_as_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CoreError::EncodingError(e.to_string()))
    }

    /// Export as base64 of the JSON document.
    pub fn export_as_string(&self) -> Result<String> {
        Ok(BASE64.encode(self.export_as_json()?))
    }

    /// Import from the JSON form.
    pub fn import_from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Import from the string form.
    pub fn import_from_string(s: &str) -> Result<Self> {
        let json = BASE64.decode(s.trim())?;
        let json = String::from_utf8(json)
            .map_err(|e| CoreError::DecodingError(format!("utf-8: {e}")))?;
        Self::import_from_json(&json)
    }
}

/// JSON wire form. Optional fields are omitted, never null.
#[derive(Serialize, Deserialize)]
struct RawSignedModelJson {
    content_snapshot: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    previous_card_id: Option<CardId>,
    #[serde(default)]
    signatures: Vec<RawSignatureJson>,
}

#[derive(Serialize, Deserialize)]
struct RawSignatureJson {
    signer: String,
    signature: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    snapshot: Option<String>,
}

impl From<RawSignedModel> for RawSignedModelJson {
    fn from(model: RawSignedModel) -> Self {
        Self {
            content_snapshot: BASE64.encode(&model.content_snapshot),
            previous_card_id: model.previous_card_id,
            signatures: model
                .signatures
                .into_iter()
                .map(|s| RawSignatureJson {
                    signer: s.signer,
                    signature: BASE64.encode(&s.signature),
                    snapshot: s.snapshot.map(|b| BASE64.encode(&b)),
                })
                .collect(),
        }
    }
}

impl TryFrom<RawSignedModelJson> for RawSignedModel {
    type Error = CoreError;

    fn try_from(json: RawSignedModelJson) -> Result<Self> {
        let content_snapshot = BASE64.decode(&json.content_snapshot)?;
        let mut signatures = Vec::with_capacity(json.signatures.len());
        for s in json.signatures {
            signatures.push(RawSignature {
                signer: s.signer,
                signature: BASE64.decode(&s.signature)?.into(),
                snapshot: match s.snapshot {
                    Some(snapshot) => Some(BASE64.decode(&snapshot)?.into()),
                    None => None,
                },
            });
        }
        RawSignedModel::from_parts(content_snapshot, json.previous_card_id, signatures)
    }
}

/// Current time in Unix seconds.
fn now_secs() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
