//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use cardkit_core::{
    parse_card, Card, CardContentBuilder, CardCrypto, CardId, Ed25519Crypto, ExtraFields, Keypair,
    ModelSigner, RawSignedModel,
};

/// A test fixture with a crypto capability and an owner keypair.
pub struct TestFixture {
    pub crypto: Arc<dyn CardCrypto>,
    pub keypair: Keypair,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self {
            crypto: Arc::new(Ed25519Crypto::new()),
            keypair: Keypair::generate(),
        }
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            crypto: Arc::new(Ed25519Crypto::new()),
            keypair: Keypair::from_seed(&seed),
        }
    }

    /// A signer sharing this fixture's crypto.
    pub fn signer(&self) -> ModelSigner {
        ModelSigner::new(Arc::clone(&self.crypto))
    }

    /// Create a self-signed model.
    pub fn make_model(
        &self,
        identity: &str,
        created_at: i64,
        previous_card_id: Option<CardId>,
    ) -> RawSignedModel {
        self.make_model_with_extra(identity, created_at, previous_card_id, None)
    }

    /// Create a self-signed model whose self signature carries extra fields.
    pub fn make_model_with_extra(
        &self,
        identity: &str,
        created_at: i64,
        previous_card_id: Option<CardId>,
        extra_fields: Option<&ExtraFields>,
    ) -> RawSignedModel {
        let mut model = CardContentBuilder::new(
            identity,
            self.crypto.export_public_key(&self.keypair.public_key()),
        )
        .created_at(created_at)
        .previous_card_id(previous_card_id)
        .freeze()
        .expect("fixture content is valid");
        self.signer()
            .self_sign(&mut model, self.keypair.private_key(), extra_fields)
            .expect("fresh model has no self signature");
        model
    }

    /// Parse a model with this fixture's crypto.
    pub fn parse(&self, model: &RawSignedModel) -> Card {
        parse_card(self.crypto.as_ref(), model, false).expect("fixture model parses")
    }

    /// Create `len` successive versions of a card, oldest first.
    pub fn make_chain(&self, identity: &str, len: usize) -> Vec<RawSignedModel> {
        let mut chain: Vec<RawSignedModel> = Vec::with_capacity(len);
        let mut previous = None;
        for i in 0..len {
            let model = self.make_model(identity, 1_736_870_400 + i as i64, previous);
            previous = Some(*self.parse(&model).id());
            chain.push(model);
        }
        chain
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create fixtures for multiple card owners.
pub fn multi_owner_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}
