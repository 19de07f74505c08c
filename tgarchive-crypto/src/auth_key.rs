//! Telegram `AuthKey`: the 256-byte key negotiated out of band.

use std::fmt;

use crate::sha1;

/// The supplied key material is not exactly 256 bytes long.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidKeyLength(pub usize);

impl fmt::Display for InvalidKeyLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "auth key must be 256 bytes, got {}", self.0)
    }
}

impl std::error::Error for InvalidKeyLength {}

/// A Telegram authorization key plus its pre-computed fingerprint.
#[derive(Clone)]
pub struct AuthKey {
    pub(crate) data: [u8; 256],
    pub(crate) key_id: [u8; 8],
}

impl AuthKey {
    /// Construct from the raw 256 key bytes.
    pub fn from_bytes(data: [u8; 256]) -> Self {
        let sha = sha1!(&data);
        let mut key_id = [0u8; 8];
        key_id.copy_from_slice(&sha[12..20]);
        Self { data, key_id }
    }

    /// Construct from a slice, rejecting anything that is not 256 bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, InvalidKeyLength> {
        let data: [u8; 256] = data.try_into().map_err(|_| InvalidKeyLength(data.len()))?;
        Ok(Self::from_bytes(data))
    }

    /// Return the raw 256-byte representation.
    pub fn to_bytes(&self) -> [u8; 256] { self.data }

    /// The 8-byte fingerprint that prefixes every encrypted packet
    /// (SHA-1(key)[12..20]).
    pub fn key_id(&self) -> [u8; 8] { self.key_id }
}

impl fmt::Debug for AuthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AuthKey(id={})", u64::from_le_bytes(self.key_id))
    }
}

impl PartialEq for AuthKey {
    fn eq(&self, other: &Self) -> bool { self.key_id == other.key_id }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_keys() {
        assert_eq!(AuthKey::from_slice(&[0u8; 32]).unwrap_err(), InvalidKeyLength(32));
    }

    #[test]
    fn key_id_is_sha1_tail() {
        let data = [9u8; 256];
        let key = AuthKey::from_slice(&data).unwrap();
        let sha = sha1!(&data);
        assert_eq!(key.key_id(), sha[12..20]);
    }
}
