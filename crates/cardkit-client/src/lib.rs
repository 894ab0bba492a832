//! # Cardkit Client
//!
//! Contracts for the remote side of card management: the card service that
//! stores published cards and the access-token provider that authorizes
//! calls to it.
//!
//! Both are async traits so real transports (HTTP, gRPC) and test doubles
//! plug in the same way. In-memory implementations are provided:
//!
//! - [`MemoryCardService`] - stores models, tracks outdated cards
//! - [`ConstAccessTokenProvider`] - fixed token
//! - [`CachingTokenProvider`] - caches a [`TokenSource`], honoring `force_reload`
//!
//! Only [`ClientError::Unauthorized`] is treated as retryable by callers.

pub mod client;
pub mod error;
pub mod token;

pub use client::{memory::MemoryCardService, CardClient, GetCardResponse};
pub use error::{ClientError, Result};
pub use token::{
    AccessToken, AccessTokenProvider, CachingTokenProvider, ConstAccessTokenProvider,
    TokenContext, TokenOperation, TokenSource,
};
