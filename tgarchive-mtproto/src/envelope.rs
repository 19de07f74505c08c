//! The decrypted MTProto 2.0 envelope of a server-sent packet.
//!
//! ```text
//! salt:       i64
//! session_id: i64
//! msg_id:     i64   (odd)
//! seq_no:     i32
//! body_len:   i32
//! body:       [u8; body_len]
//! padding:    12..1024 bytes
//! ```

use tgarchive_crypto::{AuthKey, DecryptError, Side, decrypt_data_v2, encrypt_data_v2, encrypt_data_v2_with_padding};

const HEADER_LEN: usize = 8 + 8 + 8 + 4 + 4;

/// Errors that can occur when opening a captured packet.
#[derive(Clone, Debug, PartialEq)]
pub enum EnvelopeError {
    /// The packet's `auth_key_id` does not belong to the supplied key.
    AuthKeyMismatch,
    /// Packet too short or not block-aligned.
    Decryption,
    /// `msg_key` does not match the plaintext: tampered or wrongly keyed.
    Integrity,
    /// The decrypted plaintext cannot even hold the header.
    FrameTooShort,
    /// The envelope belongs to another session.
    SessionMismatch { expected: i64, found: i64 },
    /// Server-sent message ids are always odd.
    EvenMessageId(i64),
}

impl std::fmt::Display for EnvelopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AuthKeyMismatch => write!(f, "packet was not encrypted with this auth key"),
            Self::Decryption => write!(f, "ciphertext has an invalid length"),
            Self::Integrity => write!(f, "msg_key mismatch, packet discarded"),
            Self::FrameTooShort => write!(f, "inner plaintext too short"),
            Self::SessionMismatch { expected, found } => {
                write!(f, "session_id mismatch (expected {expected}, got {found})")
            }
            Self::EvenMessageId(id) => write!(f, "msg_id {id} is even"),
        }
    }
}
impl std::error::Error for EnvelopeError {}

impl From<DecryptError> for EnvelopeError {
    fn from(e: DecryptError) -> Self {
        match e {
            DecryptError::InvalidBuffer => Self::Decryption,
            DecryptError::AuthKeyMismatch => Self::AuthKeyMismatch,
            DecryptError::MessageKeyMismatch => Self::Integrity,
        }
    }
}

/// The verified inner message of a packet.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    /// Server salt; not checked.
    pub salt:       i64,
    pub session_id: i64,
    pub msg_id:     i64,
    /// Not checked.
    pub seq_no:     i32,
    /// TL-serialized body, padding stripped.
    pub body:       Vec<u8>,
}

/// Decrypt a server-sent packet and verify its envelope.
///
/// Nothing is decoded unless the key fingerprint, `msg_key`, session id and
/// message id parity all check out.
pub fn open(packet: &[u8], auth_key: &AuthKey, session_id: i64) -> Result<Envelope, EnvelopeError> {
    let plaintext = decrypt_data_v2(packet, auth_key, Side::Server)?;
    if plaintext.len() < HEADER_LEN {
        return Err(EnvelopeError::FrameTooShort);
    }

    let salt     = i64::from_le_bytes(word(&plaintext[..8]));
    let sid      = i64::from_le_bytes(word(&plaintext[8..16]));
    let msg_id   = i64::from_le_bytes(word(&plaintext[16..24]));
    let seq_no   = i32::from_le_bytes(half(&plaintext[24..28]));
    let body_len = u32::from_le_bytes(half(&plaintext[28..32])) as usize;

    if sid != session_id {
        return Err(EnvelopeError::SessionMismatch { expected: session_id, found: sid });
    }
    if msg_id % 2 == 0 {
        return Err(EnvelopeError::EvenMessageId(msg_id));
    }

    let available = plaintext.len() - HEADER_LEN;
    if body_len > available {
        log::warn!("[mtproto] msg {msg_id}: body_len {body_len} exceeds the {available} bytes decrypted, clamping");
    }
    let body = plaintext[HEADER_LEN..HEADER_LEN + body_len.min(available)].to_vec();

    Ok(Envelope { salt, session_id: sid, msg_id, seq_no, body })
}

/// Encrypt an envelope the way the server does (the inverse of [`open`]).
pub fn seal(envelope: &Envelope, auth_key: &AuthKey) -> Vec<u8> {
    encrypt_data_v2(&plaintext(envelope), auth_key, Side::Server)
}

/// [`seal`] with fixed padding bytes, for reproducible packets.
pub fn seal_with_padding(envelope: &Envelope, auth_key: &AuthKey, padding: &[u8; 32]) -> Vec<u8> {
    encrypt_data_v2_with_padding(&plaintext(envelope), auth_key, Side::Server, padding)
}

fn plaintext(envelope: &Envelope) -> Vec<u8> {
    let mut buf = Vec::with_capacity(HEADER_LEN + envelope.body.len());
    buf.extend(envelope.salt.to_le_bytes());
    buf.extend(envelope.session_id.to_le_bytes());
    buf.extend(envelope.msg_id.to_le_bytes());
    buf.extend(envelope.seq_no.to_le_bytes());
    buf.extend((envelope.body.len() as u32).to_le_bytes());
    buf.extend_from_slice(&envelope.body);
    buf
}

fn word(b: &[u8]) -> [u8; 8] {
    let mut out = [0u8; 8];
    out.copy_from_slice(b);
    out
}

fn half(b: &[u8]) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(b);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> AuthKey {
        AuthKey::from_bytes(core::array::from_fn(|i| (i as u8).wrapping_mul(31)))
    }

    fn envelope(msg_id: i64) -> Envelope {
        Envelope { salt: 1, session_id: 0x1122334455667788, msg_id, seq_no: 3, body: vec![0xAB; 20] }
    }

    #[test]
    fn open_recovers_the_envelope() {
        let sealed = seal(&envelope(0x6000_0000_0000_0001), &key());
        assert_eq!(open(&sealed, &key(), 0x1122334455667788), Ok(envelope(0x6000_0000_0000_0001)));
    }

    #[test]
    fn session_and_parity_are_enforced() {
        let sealed = seal(&envelope(5), &key());
        assert_eq!(
            open(&sealed, &key(), 7),
            Err(EnvelopeError::SessionMismatch { expected: 7, found: 0x1122334455667788 })
        );

        let sealed = seal(&envelope(4), &key());
        assert_eq!(open(&sealed, &key(), 0x1122334455667788), Err(EnvelopeError::EvenMessageId(4)));
    }

    #[test]
    fn overlong_body_len_is_clamped() {
        let mut plain = plaintext(&envelope(9));
        plain[28..32].copy_from_slice(&5000u32.to_le_bytes());
        let sealed = encrypt_data_v2_with_padding(&plain, &key(), Side::Server, &[0; 32]);

        let opened = open(&sealed, &key(), 0x1122334455667788).unwrap();
        assert!(opened.body.len() >= 20);
        assert_eq!(&opened.body[..20], &[0xAB; 20]);
    }

    #[test]
    fn crypto_errors_map_onto_envelope_errors() {
        assert_eq!(open(&[0u8; 4], &key(), 0), Err(EnvelopeError::Decryption));
        let other = AuthKey::from_bytes([5; 256]);
        let sealed = seal(&envelope(1), &key());
        assert_eq!(open(&sealed, &other, 0), Err(EnvelopeError::AuthKeyMismatch));
    }
}
