//! Card: the parsed, typed view of a raw signed model.
//!
//! Parsing decodes the content snapshot, imports the public key, derives the
//! card id and decodes each signature's extra fields on a best-effort basis.
//! [`link_chains`] then folds superseded cards into their successors.

use bytes::Bytes;
use std::collections::HashMap;

use crate::canonical::{parse_snapshot, try_parse_snapshot};
use crate::crypto::{CardCrypto, PublicKey};
use crate::error::{CoreError, Result, ValidationError};
use crate::model::{RawCardContent, RawSignature, RawSignedModel, SELF_SIGNER};
use crate::signer::{signed_data, ExtraFields};
use crate::types::{CardId, CARD_ID_LEN};

/// A signature on a parsed card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSignature {
    /// Signer role.
    pub signer: String,

    /// Raw signature bytes.
    pub signature: Bytes,

    /// Decoded extra fields, `None` when absent or undecodable.
    pub extra_fields: Option<ExtraFields>,

    /// The extra-fields snapshot exactly as signed.
    pub snapshot: Option<Bytes>,
}

/// A parsed identity card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    id: CardId,
    identity: String,
    public_key: PublicKey,
    version: String,
    created_at: i64,
    previous_card_id: Option<CardId>,
    previous_card: Option<Box<Card>>,
    signatures: Vec<CardSignature>,
    content_snapshot: Bytes,
    is_outdated: bool,
}

impl Card {
    /// The content-derived id.
    pub fn id(&self) -> &CardId {
        &self.id
    }

    /// The identity bound by this card.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The imported public key.
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// Content format version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Creation time (Unix seconds).
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Id of the card this one supersedes.
    pub fn previous_card_id(&self) -> Option<&CardId> {
        self.previous_card_id.as_ref()
    }

    /// The superseded card, populated only by [`link_chains`].
    pub fn previous_card(&self) -> Option<&Card> {
        self.previous_card.as_deref()
    }

    /// Signatures in the order they were attached.
    pub fn signatures(&self) -> &[CardSignature] {
        &self.signatures
    }

    /// Look up a signature by signer name.
    pub fn signature(&self, signer: &str) -> Option<&CardSignature> {
        self.signatures.iter().find(|s| s.signer == signer)
    }

    /// The owner's signature, if present.
    pub fn self_signature(&self) -> Option<&CardSignature> {
        self.signature(SELF_SIGNER)
    }

    /// The content snapshot this card was parsed from.
    pub fn content_snapshot(&self) -> &Bytes {
        &self.content_snapshot
    }

    /// Whether a newer card is known to supersede this one.
    pub fn is_outdated(&self) -> bool {
        self.is_outdated
    }

    /// Flag this card as superseded.
    pub fn mark_outdated(&mut self) {
        self.is_outdated = true;
    }

    /// Check `signer`'s signature against `public_key`.
    ///
    /// Returns false when the signer has not signed this card.
    pub fn verify_signature(
        &self,
        crypto: &dyn CardCrypto,
        signer: &str,
        public_key: &PublicKey,
    ) -> bool {
        match self.signature(signer) {
            Some(sig) => {
                let message = signed_data(&self.content_snapshot, sig.snapshot.as_deref());
                crypto.verify_signature(&sig.signature, &message, public_key)
            }
            None => false,
        }
    }
}

impl RawSignedModel {
    /// Rebuild the raw signed model a card was parsed from.
    pub fn from_card(card: &Card) -> Result<Self> {
        let signatures = card
            .signatures
            .iter()
            .map(|s| RawSignature {
                signer: s.signer.clone(),
                signature: s.signature.clone(),
                snapshot: s.snapshot.clone(),
            })
            .collect();
        Self::from_parts(card.content_snapshot.clone(), card.previous_card_id, signatures)
    }
}

/// Derive a card id: the first 32 bytes of SHA-512(content_snapshot), hex-encoded on display.
pub fn generate_card_id(crypto: &dyn CardCrypto, content_snapshot: &[u8]) -> Result<CardId> {
    if content_snapshot.is_empty() {
        return Err(ValidationError::InvalidParams("content snapshot is empty".into()).into());
    }

    let fingerprint = crypto.generate_sha512(content_snapshot);
    let prefix = fingerprint.get(..CARD_ID_LEN).ok_or_else(|| {
        CoreError::EncodingError(format!(
            "fingerprint is {} bytes, need at least {}",
            fingerprint.len(),
            CARD_ID_LEN
        ))
    })?;
    CardId::try_from(prefix).map_err(|e| CoreError::EncodingError(e.to_string()))
}

/// Parse a single raw model into a card.
///
/// The content snapshot must decode; extra-field snapshots are optional and
/// decode failures there are treated as absence.
pub fn parse_card(
    crypto: &dyn CardCrypto,
    model: &RawSignedModel,
    is_outdated: bool,
) -> Result<Card> {
    let content: RawCardContent = parse_snapshot(model.content_snapshot())?;

    let signatures = model
        .signatures()
        .iter()
        .map(|s| CardSignature {
            signer: s.signer.clone(),
            signature: s.signature.clone(),
            extra_fields: try_parse_snapshot(s.snapshot.as_deref()),
            snapshot: s.snapshot.clone(),
        })
        .collect();

    Ok(Card {
        id: generate_card_id(crypto, model.content_snapshot())?,
        identity: content.identity,
        public_key: crypto.import_public_key(&content.public_key)?,
        version: content.version,
        created_at: content.created_at,
        previous_card_id: content.previous_card_id,
        previous_card: None,
        signatures,
        content_snapshot: model.content_snapshot().clone(),
        is_outdated,
    })
}

/// Parse each model independently. An empty batch yields an empty result.
pub fn parse_cards(crypto: &dyn CardCrypto, models: &[RawSignedModel]) -> Result<Vec<Card>> {
    models.iter().map(|m| parse_card(crypto, m, false)).collect()
}

/// Link a flat batch of cards into version chains.
///
/// Every card whose predecessor is in the batch takes ownership of it through
/// `previous_card`, and the predecessor is marked outdated. Only chain heads
/// are returned, in input order.
///
/// Two cards superseding the same predecessor is a [`CoreError::ForkedChain`];
/// the same id twice is a [`CoreError::DuplicateCard`].
pub fn link_chains(cards: Vec<Card>) -> Result<Vec<Card>> {
    let mut order = Vec::with_capacity(cards.len());
    let mut by_id: HashMap<CardId, Card> = HashMap::with_capacity(cards.len());

    for card in cards {
        let id = card.id;
        if by_id.insert(id, card).is_some() {
            return Err(CoreError::DuplicateCard(id.to_hex()));
        }
        order.push(id);
    }

    // previous id -> the single card in the batch that supersedes it
    let mut successors: HashMap<CardId, CardId> = HashMap::new();
    for id in &order {
        let Some(previous) = by_id.get(id).and_then(|c| c.previous_card_id) else {
            continue;
        };
        if !by_id.contains_key(&previous) {
            continue;
        }
        if let Some(first) = successors.insert(previous, *id) {
            return Err(CoreError::ForkedChain {
                previous: previous.to_hex(),
                first: first.to_hex(),
                second: id.to_hex(),
            });
        }
    }

    let mut heads = Vec::new();
    for id in &order {
        if successors.contains_key(id) {
            continue;
        }
        if let Some(mut head) = by_id.remove(id) {
            head.previous_card = detach_ancestors(&mut by_id, head.previous_card_id);
            heads.push(head);
        }
    }

    // Anything left is only reachable through a reference cycle.
    if !by_id.is_empty() {
        return Err(CoreError::ChainCycle);
    }

    Ok(heads)
}

/// Remove the ancestors of a head from `by_id` and nest them oldest-last.
fn detach_ancestors(
    by_id: &mut HashMap<CardId, Card>,
    mut next: Option<CardId>,
) -> Option<Box<Card>> {
    let mut chain = Vec::new();
    while let Some(card) = next.and_then(|id| by_id.remove(&id)) {
        next = card.previous_card_id;
        chain.push(card);
    }

    let mut link = None;
    for mut card in chain.into_iter().rev() {
        card.is_outdated = true;
        card.previous_card = link;
        link = Some(Box::new(card));
    }
    link
}
