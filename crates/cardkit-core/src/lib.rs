//! # Cardkit Core
//!
//! Pure primitives for cardkit: raw signed models, signing, card parsing and
//! chain linking.
//!
//! This crate contains no I/O and no networking. Cryptography is consumed
//! through the injectable [`CardCrypto`] capability.
//!
//! ## Key Types
//!
//! - [`RawSignedModel`] - Content snapshot plus ordered signatures (wire form)
//! - [`Card`] - Parsed card with a content-derived [`CardId`]
//! - [`ModelSigner`] - Attaches self and co-signer signatures
//! - [`CardVerifier`] - Pluggable trust policy
//!
//! ## Canonicalization
//!
//! Content and extra-field snapshots are deterministic CBOR. See [`canonical`].

pub mod canonical;
pub mod card;
pub mod crypto;
pub mod error;
pub mod model;
pub mod signer;
pub mod types;
pub mod verifier;

pub use canonical::{parse_snapshot, take_snapshot, try_parse_snapshot};
pub use card::{generate_card_id, link_chains, parse_card, parse_cards, Card, CardSignature};
pub use crypto::{CardCrypto, Ed25519Crypto, Keypair, PrivateKey, PublicKey};
pub use error::{CoreError, Result, ValidationError};
pub use model::{
    CardContentBuilder, RawCardContent, RawSignature, RawSignedModel, CARD_VERSION, SELF_SIGNER,
};
pub use signer::{signed_data, ExtraFields, ModelSigner};
pub use types::CardId;
pub use verifier::{AcceptAllVerifier, CardVerifier, StandardCardVerifier};
