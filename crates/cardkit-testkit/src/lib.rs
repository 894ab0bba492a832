//! # Cardkit Testkit
//!
//! Testing utilities for cardkit.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Fixed seeds and inputs with expected snapshots, ids and signatures
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for building signed models and chains
//! - **Stubs**: Scripted card clients, token providers and verifiers
//!
//! ## Golden Vectors
//!
//! ```rust
//! use cardkit_testkit::vectors::verify_all_vectors;
//!
//! for (name, matches, card_id) in verify_all_vectors() {
//!     assert!(matches, "{name}: {card_id}");
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use cardkit_testkit::generators::{model_from_params, ModelParams};
//!
//! proptest! {
//!     #[test]
//!     fn snapshot_is_deterministic(params: ModelParams) {
//!         let m1 = model_from_params(&params);
//!         let m2 = model_from_params(&params);
//!         prop_assert_eq!(m1.content_snapshot(), m2.content_snapshot());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use cardkit_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let chain = fixture.make_chain("alice", 3);
//! assert_eq!(chain.len(), 3);
//! ```

pub mod fixtures;
pub mod generators;
pub mod stubs;
pub mod vectors;

pub use fixtures::{multi_owner_fixtures, TestFixture};
pub use generators::{model_from_params, ModelParams};
pub use stubs::{
    FailingTokenProvider, RecordingTokenProvider, RejectAllVerifier, Reply, ScriptedClient,
};
pub use vectors::{all_vectors, generate_model_from_vector, verify_all_vectors, GoldenVector};
