//! Cryptographic capability for cards.
//!
//! The core never calls a signature scheme directly: everything goes through
//! [`CardCrypto`], which is injected by the application. [`Ed25519Crypto`] is
//! the default implementation (Ed25519 signatures, SHA-512 fingerprints).

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha512};
use std::fmt;

use crate::error::{CoreError, Result};

/// Length of an exported public key in bytes.
pub const PUBLIC_KEY_LEN: usize = 32;

/// The crypto capability consumed by model signing, card parsing and verification.
///
/// Implementations must be thread-safe; a single instance is shared by every
/// in-flight operation of a card manager.
pub trait CardCrypto: Send + Sync {
    /// Compute a 512-bit digest of `data`.
    fn generate_sha512(&self, data: &[u8]) -> Vec<u8>;

    /// Sign `data` with `private_key`.
    fn generate_signature(&self, data: &[u8], private_key: &PrivateKey) -> Result<Vec<u8>>;

    /// Check `signature` over `data` against `public_key`.
    fn verify_signature(&self, signature: &[u8], data: &[u8], public_key: &PublicKey) -> bool;

    /// Export a public key to the bytes stored in a content snapshot.
    fn export_public_key(&self, public_key: &PublicKey) -> Vec<u8>;

    /// Import a public key from content-snapshot bytes.
    fn import_public_key(&self, bytes: &[u8]) -> Result<PublicKey>;
}

/// A 32-byte Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; PUBLIC_KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// An Ed25519 private key.
///
/// Debug output shows only the matching public key.
#[derive(Clone)]
pub struct PrivateKey {
    signing_key: SigningKey,
}

impl PrivateKey {
    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Derive the public key.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Get the raw seed bytes (secret key material).
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({:?})", self.public_key())
    }
}

/// A keypair for card owners and co-signers.
#[derive(Clone, Debug)]
pub struct Keypair {
    private_key: PrivateKey,
    public_key: PublicKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self::from_private_key(PrivateKey { signing_key })
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_private_key(PrivateKey::from_seed(seed))
    }

    fn from_private_key(private_key: PrivateKey) -> Self {
        let public_key = private_key.public_key();
        Self {
            private_key,
            public_key,
        }
    }

    /// Get the public key.
    pub fn public_key(&self) -> PublicKey {
        self.public_key
    }

    /// Get the private key.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

/// Default crypto capability: Ed25519 signatures and SHA-512 digests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Crypto;

impl Ed25519Crypto {
    /// Create the default crypto capability.
    pub fn new() -> Self {
        Self
    }
}

impl CardCrypto for Ed25519Crypto {
    fn generate_sha512(&self, data: &[u8]) -> Vec<u8> {
        Sha512::digest(data).to_vec()
    }

    fn generate_signature(&self, data: &[u8], private_key: &PrivateKey) -> Result<Vec<u8>> {
        Ok(private_key.signing_key.sign(data).to_bytes().to_vec())
    }

    fn verify_signature(&self, signature: &[u8], data: &[u8], public_key: &PublicKey) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
            return false;
        };
        let Ok(sig) = Signature::from_slice(signature) else {
            return false;
        };
        verifying_key.verify(data, &sig).is_ok()
    }

    fn export_public_key(&self, public_key: &PublicKey) -> Vec<u8> {
        public_key.0.to_vec()
    }

    fn import_public_key(&self, bytes: &[u8]) -> Result<PublicKey> {
        let arr: [u8; PUBLIC_KEY_LEN] =
            bytes.try_into().map_err(|_| CoreError::InvalidPublicKey)?;
        VerifyingKey::from_bytes(&arr).map_err(|_| CoreError::InvalidPublicKey)?;
        Ok(PublicKey(arr))
    }
}
