//! Proptest generators for property-based testing.

use proptest::prelude::*;
use std::sync::Arc;

use cardkit_core::{
    CardContentBuilder, CardId, Ed25519Crypto, ExtraFields, Keypair, ModelSigner, RawSignedModel,
};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random CardId.
pub fn card_id() -> impl Strategy<Value = CardId> {
    any::<[u8; 32]>().prop_map(CardId::from_bytes)
}

/// Generate a non-blank identity.
pub fn identity() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9._@-]{0,31}".prop_map(String::from)
}

/// Generate a reasonable creation time (Unix seconds).
pub fn created_at() -> impl Strategy<Value = i64> {
    0i64..=4_102_444_800i64
}

/// Generate a signer role name other than `"self"`.
pub fn signer_name() -> impl Strategy<Value = String> {
    "[a-z]{1,12}"
        .prop_filter("reserved signer", |s| s != "self")
        .prop_map(String::from)
}

/// Generate a small extra-fields map.
pub fn extra_fields() -> impl Strategy<Value = ExtraFields> {
    prop::collection::btree_map("[a-z_]{1,12}", "[ -~]{0,24}", 0..4)
}

/// Parameters for generating a signed model.
#[derive(Debug, Clone)]
pub struct ModelParams {
    pub keypair: Keypair,
    pub identity: String,
    pub created_at: i64,
    pub previous_card_id: Option<CardId>,
    pub extra_fields: Option<ExtraFields>,
    /// Additional signers, each with its own key seed.
    pub cosigners: Vec<(String, [u8; 32])>,
}

impl Arbitrary for ModelParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<[u8; 32]>(), // owner seed
            identity(),
            created_at(),
            proptest::option::of(card_id()),
            proptest::option::of(extra_fields()),
            prop::collection::btree_map(signer_name(), any::<[u8; 32]>(), 0..3),
        )
            .prop_map(
                |(seed, identity, created_at, previous_card_id, extra_fields, cosigners)| {
                    ModelParams {
                        keypair: Keypair::from_seed(&seed),
                        identity,
                        created_at,
                        previous_card_id,
                        extra_fields,
                        cosigners: cosigners.into_iter().collect(),
                    }
                },
            )
            .boxed()
    }
}

/// Generate a self-signed, possibly co-signed, model from parameters.
pub fn model_from_params(params: &ModelParams) -> RawSignedModel {
    let signer = ModelSigner::new(Arc::new(Ed25519Crypto::new()));

    let mut model = CardContentBuilder::new(
        params.identity.as_str(),
        params.keypair.public_key().0.to_vec(),
    )
    .created_at(params.created_at)
    .previous_card_id(params.previous_card_id)
    .freeze()
    .expect("generated content is valid");

    signer
        .self_sign(
            &mut model,
            params.keypair.private_key(),
            params.extra_fields.as_ref(),
        )
        .expect("fresh model has no self signature");

    for (name, seed) in &params.cosigners {
        signer
            .sign(&mut model, name, Keypair::from_seed(seed).private_key(), None)
            .expect("co-signer names are unique");
    }

    model
}
