//! Card verification policies.
//!
//! A verifier makes the final trust decision on a parsed card. The card
//! manager rejects the whole operation when any card fails verification.

use std::sync::Arc;

use crate::card::Card;
use crate::crypto::{CardCrypto, PublicKey};
use crate::model::SELF_SIGNER;

/// Pluggable trust policy applied to every card a manager returns.
pub trait CardVerifier: Send + Sync {
    /// Return `true` if the card is acceptable.
    fn verify_card(&self, card: &Card) -> bool;
}

/// Accepts every card. Useful in tests and trusted environments.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllVerifier;

impl CardVerifier for AcceptAllVerifier {
    fn verify_card(&self, _card: &Card) -> bool {
        true
    }
}

/// Signature-checking verifier.
///
/// Checks the owner's self-signature (unless disabled) and, for every
/// whitelisted signer, a valid signature under that signer's registered key.
#[derive(Clone)]
pub struct StandardCardVerifier {
    crypto: Arc<dyn CardCrypto>,
    verify_self_signature: bool,
    whitelist: Vec<(String, PublicKey)>,
}

impl StandardCardVerifier {
    /// Create a verifier that checks self-signatures only.
    pub fn new(crypto: Arc<dyn CardCrypto>) -> Self {
        Self {
            crypto,
            verify_self_signature: true,
            whitelist: Vec::new(),
        }
    }

    /// Enable or disable the self-signature check.
    pub fn verify_self_signature(mut self, enabled: bool) -> Self {
        self.verify_self_signature = enabled;
        self
    }

    /// Require a signature from `signer` under `public_key`.
    ///
    /// Registering the same signer twice replaces its key.
    pub fn require_signer(mut self, signer: impl Into<String>, public_key: PublicKey) -> Self {
        let signer = signer.into();
        self.whitelist.retain(|(name, _)| *name != signer);
        self.whitelist.push((signer, public_key));
        self
    }
}

impl CardVerifier for StandardCardVerifier {
    fn verify_card(&self, card: &Card) -> bool {
        if self.verify_self_signature
            && !card.verify_signature(self.crypto.as_ref(), SELF_SIGNER, card.public_key())
        {
            tracing::debug!(card_id = %card.id(), "self signature check failed");
            return false;
        }

        for (signer, public_key) in &self.whitelist {
            if !card.verify_signature(self.crypto.as_ref(), signer, public_key) {
                tracing::debug!(card_id = %card.id(), signer = %signer, "whitelisted signature missing or invalid");
                return false;
            }
        }

        true
    }
}
