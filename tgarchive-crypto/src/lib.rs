//! Cryptographic primitives for opening captured MTProto 2.0 packets.
//!
//! Provides:
//! - AES-256-IGE encryption/decryption
//! - SHA-1 / SHA-256 hash macros
//! - `AuthKey`: 256-byte session key and its fingerprint
//! - MTProto 2.0 packet decryption (and the matching encryption, used to
//!   produce fixtures)

#![deny(unsafe_code)]

pub mod aes;
mod auth_key;
mod sha;

pub use auth_key::{AuthKey, InvalidKeyLength};

// ─── MTProto 2.0 encrypt / decrypt ───────────────────────────────────────────

/// Errors from [`decrypt_data_v2`].
#[derive(Clone, Debug, PartialEq)]
pub enum DecryptError {
    /// Packet too short, or its ciphertext is not block-aligned.
    InvalidBuffer,
    /// The `auth_key_id` in the packet does not match our key.
    AuthKeyMismatch,
    /// The `msg_key` in the packet does not match the decrypted plaintext.
    MessageKeyMismatch,
}

impl std::fmt::Display for DecryptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidBuffer => write!(f, "invalid ciphertext buffer length"),
            Self::AuthKeyMismatch => write!(f, "auth_key_id mismatch"),
            Self::MessageKeyMismatch => write!(f, "msg_key mismatch"),
        }
    }
}
impl std::error::Error for DecryptError {}

/// Which party produced a packet. Selects the key slices used for
/// derivation: `x = 0` for client-sent, `x = 8` for server-sent packets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side { Client, Server }

impl Side {
    fn x(self) -> usize { match self { Side::Client => 0, Side::Server => 8 } }
}

fn calc_key(auth_key: &AuthKey, msg_key: &[u8; 16], side: Side) -> ([u8; 32], [u8; 32]) {
    let x = side.x();
    let sha_a = sha256!(msg_key, &auth_key.data[x..x + 36]);
    let sha_b = sha256!(&auth_key.data[40 + x..40 + x + 36], msg_key);

    let mut aes_key = [0u8; 32];
    aes_key[..8].copy_from_slice(&sha_a[..8]);
    aes_key[8..24].copy_from_slice(&sha_b[8..24]);
    aes_key[24..].copy_from_slice(&sha_a[24..]);

    let mut aes_iv = [0u8; 32];
    aes_iv[..8].copy_from_slice(&sha_b[..8]);
    aes_iv[8..24].copy_from_slice(&sha_a[8..24]);
    aes_iv[24..].copy_from_slice(&sha_b[24..]);

    (aes_key, aes_iv)
}

fn padding_len(len: usize) -> usize {
    16 + (16 - (len % 16))
}

/// Encrypt `plaintext` as `side` would, returning `key_id || msg_key || ciphertext`.
pub fn encrypt_data_v2(plaintext: &[u8], auth_key: &AuthKey, side: Side) -> Vec<u8> {
    let mut rnd = [0u8; 32];
    if getrandom::getrandom(&mut rnd).is_err() {
        // OS RNG unavailable: derive the padding from the plaintext instead.
        rnd = sha256!(plaintext);
    }
    encrypt_data_v2_with_padding(plaintext, auth_key, side, &rnd)
}

/// Like [`encrypt_data_v2`] but with caller-supplied padding bytes, so the
/// output is deterministic.
pub fn encrypt_data_v2_with_padding(
    plaintext: &[u8],
    auth_key: &AuthKey,
    side: Side,
    rnd: &[u8; 32],
) -> Vec<u8> {
    let pad = padding_len(plaintext.len());
    let mut body = Vec::with_capacity(plaintext.len() + pad);
    body.extend_from_slice(plaintext);
    body.extend(rnd.iter().take(pad).copied());

    let msg_key = sha::msg_key_for(&auth_key.data, side.x(), &body);
    let (key, iv) = calc_key(auth_key, &msg_key, side);
    aes::ige_encrypt(&mut body, &key, &iv);

    let mut out = Vec::with_capacity(24 + body.len());
    out.extend_from_slice(&auth_key.key_id);
    out.extend_from_slice(&msg_key);
    out.extend_from_slice(&body);
    out
}

/// Decrypt an MTProto 2.0 packet sent by `side`.
///
/// `packet` must start with `key_id || msg_key || ciphertext`. On success the
/// full plaintext (including padding) is returned; the input is not touched.
pub fn decrypt_data_v2(packet: &[u8], auth_key: &AuthKey, side: Side) -> Result<Vec<u8>, DecryptError> {
    if packet.len() < 8 {
        return Err(DecryptError::InvalidBuffer);
    }
    if auth_key.key_id != packet[..8] {
        return Err(DecryptError::AuthKeyMismatch);
    }
    if packet.len() < 24 || (packet.len() - 24) % 16 != 0 {
        return Err(DecryptError::InvalidBuffer);
    }

    let mut msg_key = [0u8; 16];
    msg_key.copy_from_slice(&packet[8..24]);

    let (key, iv) = calc_key(auth_key, &msg_key, side);
    let mut plaintext = packet[24..].to_vec();
    aes::ige_decrypt(&mut plaintext, &key, &iv);

    if msg_key != sha::msg_key_for(&auth_key.data, side.x(), &plaintext) {
        return Err(DecryptError::MessageKeyMismatch);
    }
    Ok(plaintext)
}
