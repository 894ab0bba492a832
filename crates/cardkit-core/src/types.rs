//! Strong type definitions for cardkit.
//!
//! Identifiers are newtypes so a card id cannot be confused with arbitrary
//! hex strings or key fingerprints.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Length of a card identifier in bytes.
pub const CARD_ID_LEN: usize = 32;

/// A 32-byte card identifier: the first 32 bytes of SHA-512(content_snapshot).
///
/// Card ids are never transmitted alongside a card; they are always derived
/// from the content snapshot (see [`crate::card::generate_card_id`]).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CardId(pub [u8; CARD_ID_LEN]);

impl CardId {
    /// Create a new CardId from raw bytes.
    pub const fn from_bytes(bytes: [u8; CARD_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; CARD_ID_LEN] {
        &self.0
    }

    /// Convert to lowercase hex string (64 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != CARD_ID_LEN {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; CARD_ID_LEN];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CardId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for CardId {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl AsRef<[u8]> for CardId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; CARD_ID_LEN]> for CardId {
    fn from(bytes: [u8; CARD_ID_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for CardId {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; CARD_ID_LEN] = slice.try_into()?;
        Ok(Self(arr))
    }
}

// Card ids travel as hex text, both inside content snapshots and on the wire.
impl Serialize for CardId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CardId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CardId::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
