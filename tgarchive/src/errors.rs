//! Packet-level errors.

use std::fmt;

use tgarchive_mtproto::EnvelopeError;
use tgarchive_tl::{DecodeError, UnsupportedLayer};

/// Why a whole packet was discarded.
///
/// Failures of single container entries do not end up here; they are
/// reported next to the successfully decoded objects.
#[derive(Clone, Debug, PartialEq)]
pub enum PacketError {
    /// No schema is loaded for the requested layer. Nothing was decoded.
    UnsupportedLayer(i32),
    /// The auth key is not 256 bytes long.
    InvalidAuthKey(usize),
    AuthKeyMismatch,
    Decryption,
    /// `msg_key` mismatch: the packet is unsafe and must not be reprocessed.
    Integrity,
    SessionMismatch { expected: i64, found: i64 },
    EvenMessageId(i64),
    FrameTooShort,
    /// The envelope body itself could not be decoded.
    Decode(DecodeError),
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnsupportedLayer(layer) => write!(f, "layer {layer} is not supported"),
            Self::InvalidAuthKey(len) => write!(f, "auth key must be 256 bytes, got {len}"),
            Self::AuthKeyMismatch => write!(f, "packet was not encrypted with this auth key"),
            Self::Decryption => write!(f, "ciphertext has an invalid length"),
            Self::Integrity => write!(f, "msg_key mismatch, packet discarded"),
            Self::SessionMismatch { expected, found } => {
                write!(f, "session_id mismatch (expected {expected}, got {found})")
            }
            Self::EvenMessageId(id) => write!(f, "msg_id {id} is even"),
            Self::FrameTooShort => write!(f, "inner plaintext too short"),
            Self::Decode(e) => write!(f, "decode: {e}"),
        }
    }
}

impl std::error::Error for PacketError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<EnvelopeError> for PacketError {
    fn from(e: EnvelopeError) -> Self {
        match e {
            EnvelopeError::AuthKeyMismatch => Self::AuthKeyMismatch,
            EnvelopeError::Decryption => Self::Decryption,
            EnvelopeError::Integrity => Self::Integrity,
            EnvelopeError::FrameTooShort => Self::FrameTooShort,
            EnvelopeError::SessionMismatch { expected, found } => Self::SessionMismatch { expected, found },
            EnvelopeError::EvenMessageId(id) => Self::EvenMessageId(id),
        }
    }
}

impl From<UnsupportedLayer> for PacketError {
    fn from(e: UnsupportedLayer) -> Self { Self::UnsupportedLayer(e.0) }
}

impl From<DecodeError> for PacketError {
    fn from(e: DecodeError) -> Self { Self::Decode(e) }
}
