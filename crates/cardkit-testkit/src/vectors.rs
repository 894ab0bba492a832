//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the content snapshot encoding, the card id derivation
//! and the (deterministic Ed25519) self signature, so any implementation
//! of the card format can be checked against them.

use std::sync::Arc;

use cardkit_core::{
    generate_card_id, CardContentBuilder, CardId, Ed25519Crypto, Keypair, ModelSigner,
    RawSignedModel,
};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Seed for deterministic key generation.
    pub seed: [u8; 32],
    /// Card identity.
    pub identity: &'static str,
    /// Creation time (Unix seconds).
    pub created_at: i64,
    /// Superseded card id (hex), empty when absent.
    pub previous_card_id: &'static str,
    /// Expected content snapshot (hex).
    pub expected_content_snapshot: &'static str,
    /// Expected card id (hex).
    pub expected_card_id: &'static str,
    /// Expected self signature (hex).
    pub expected_self_signature: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "first card for alice",
            seed: [0x42; 32],
            identity: "alice",
            created_at: 1_736_870_400, // 2025-01-14T16:00:00Z
            previous_card_id: "",
            expected_content_snapshot: "a46776657273696f6e63352e30686964656e7469747965616c6963656a637265617465645f61741a67868a006a7075626c69635f6b657958202152f8d19b791d24453242e15f2eab6cb7cffa7b6a5ed30097960e069881db12",
            expected_card_id: "7dbe2a2e4791adf3b7719fbb6c76597d99fb84a1d8f85ec57efd77802ddd9675",
            expected_self_signature: "a0c5e6b4ba79c96fee6abe25736bd86cd7150954179f7c6b60b8f590d5b11cfb1588c24ffc9e2520b2da4dfa676f25babc4300c492f8819e5f07c3260eb11302",
        },
        GoldenVector {
            name: "bob superseding a card",
            seed: [0x07; 32],
            identity: "bob",
            created_at: 1_736_870_401,
            previous_card_id: "1111111111111111111111111111111111111111111111111111111111111111",
            expected_content_snapshot: "a56776657273696f6e63352e30686964656e7469747963626f626a637265617465645f61741a67868a016a7075626c69635f6b65795820ea4a6c63e29c520abef5507b132ec5f9954776aebebe7b92421eea691446d22c7070726576696f75735f636172645f6964784031313131313131313131313131313131313131313131313131313131313131313131313131313131313131313131313131313131313131313131313131313131",
            expected_card_id: "38644967425af25c667536399ad9aad355db6edf5b21760e40cd1eb83b0b5e07",
            expected_self_signature: "b0b94e09494f7587605a896c094b3c960e18c47e07e3c47b53f263ba387688f8f654bad651a9d1c5f23c255f67dac3117a24be0e8695f20a82998d49ca37a505",
        },
        GoldenVector {
            name: "zero seed at the epoch",
            seed: [0x00; 32],
            identity: "carol@example.com",
            created_at: 0,
            previous_card_id: "",
            expected_content_snapshot: "a46776657273696f6e63352e30686964656e74697479716361726f6c406578616d706c652e636f6d6a637265617465645f6174006a7075626c69635f6b657958203b6a27bcceb6a42d62a3a8d02a6f0d73653215771de243a63ac048a18b59da29",
            expected_card_id: "b0aef63df241c8923832ea6552f42b6b40119db8c9a4bae8743ae759df086a03",
            expected_self_signature: "9ffc03c6f9e9571dcc9ad409c24e4d9fe5e784f937c3a9a6645b8eda8c0225c8614c4f9e056d5c0d8c4d3aada09dc292494d712853918b940ec7d1eaaa8ac005",
        },
    ]
}

/// Generate the self-signed model described by a golden vector.
pub fn generate_model_from_vector(vector: &GoldenVector) -> RawSignedModel {
    let keypair = Keypair::from_seed(&vector.seed);
    let previous = if vector.previous_card_id.is_empty() {
        None
    } else {
        Some(CardId::from_hex(vector.previous_card_id).expect("vector previous id is valid hex"))
    };

    let mut model = CardContentBuilder::new(vector.identity, keypair.public_key().0.to_vec())
        .created_at(vector.created_at)
        .previous_card_id(previous)
        .freeze()
        .expect("vector content is valid");
    ModelSigner::new(Arc::new(Ed25519Crypto::new()))
        .self_sign(&mut model, keypair.private_key(), None)
        .expect("fresh model has no self signature");
    model
}

/// Verify all golden vectors produce the expected card ids.
///
/// Returns `(name, matches, actual card id hex)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .map(|v| {
            let model = generate_model_from_vector(v);
            let hex = generate_card_id(&Ed25519Crypto::new(), model.content_snapshot())
                .map(|id| id.to_hex())
                .unwrap_or_default();
            (v.name.to_string(), hex == v.expected_card_id, hex)
        })
        .collect()
}
