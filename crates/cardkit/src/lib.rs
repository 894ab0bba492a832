//! # Cardkit
//!
//! The unified API for publishing, fetching and searching signed identity
//! cards.
//!
//! ## Overview
//!
//! A card binds a public key to an identity. It is a content snapshot plus
//! one or more signatures: the owner's self signature and optional
//! signatures from other roles (an issuing application, the card service).
//! A card's id is derived from its content, so cards cannot be edited;
//! a new version is a new card naming its predecessor.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use cardkit::{CardManager, CardParams};
//! use cardkit::core::{CardCrypto, Ed25519Crypto, Keypair};
//! use cardkit::client::{AccessToken, ConstAccessTokenProvider, MemoryCardService};
//!
//! async fn example() -> cardkit::Result<()> {
//!     let crypto: Arc<dyn CardCrypto> = Arc::new(Ed25519Crypto::new());
//!     let manager = CardManager::builder()
//!         .crypto(Arc::clone(&crypto))
//!         .token_provider(Arc::new(ConstAccessTokenProvider::new(
//!             AccessToken::new("alice", "token"),
//!         )))
//!         .client(Arc::new(MemoryCardService::new(crypto)))
//!         .build()?;
//!
//!     let keypair = Keypair::generate();
//!     let params = CardParams::new("alice", keypair.public_key(), keypair.private_key().clone());
//!     let card = manager.publish_card(params).await?;
//!
//!     let found = manager.search_cards_by_identity("alice").await?;
//!     assert_eq!(found[0].id(), card.id());
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `cardkit::core` - Models, signing, parsing, verification
//! - `cardkit::client` - Card service and token provider contracts

pub mod error;
pub mod manager;

// Re-export component crates
pub use cardkit_client as client;
pub use cardkit_core as core;

pub use error::{ManagerError, Result};
pub use manager::{
    CallbackError, CardManager, CardManagerBuilder, CardManagerConfig, CardParams, SignCallback,
    DEFAULT_MAX_ATTEMPTS,
};

// Re-export commonly used core types
pub use cardkit_core::{
    Card, CardCrypto, CardId, CardSignature, CardVerifier, Ed25519Crypto, ExtraFields, Keypair,
    RawSignedModel, CARD_VERSION,
};
