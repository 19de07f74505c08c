use tgarchive_crypto::AuthKey;
use tgarchive_mtproto::{Envelope, EnvelopeError, open, seal_with_padding};

const SESSION_ID: i64 = 0x1122334455667788;

/// Server-sent packet produced independently of this crate: key bytes
/// `(i * 7 + 3) as u8`, padding `0x5a`, body `0..20`.
const KNOWN_PACKET: &str = "9ed6e6ef196cc93178f5efe182f23baec501a2bdb21955899926ca0e859627531bb23db9e352591c0da3fc093cb689fd463b06764c6c86c8dbe2ced6541ecd6be6cfdcc0c664d9e6534774e0d1cb6c102db44b538bcc9552193f5382b77105b2dc1d89352b4d6901";

fn key() -> AuthKey {
    AuthKey::from_bytes(core::array::from_fn(|i| (i * 7 + 3) as u8))
}

fn known_envelope() -> Envelope {
    Envelope {
        salt: 0x0102030405060708,
        session_id: SESSION_ID,
        msg_id: 0x5f00000000000001,
        seq_no: 7,
        body: (0..20).collect(),
    }
}

fn unhex(s: &str) -> Vec<u8> {
    (0..s.len()).step_by(2).map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap()).collect()
}

#[test]
fn opens_a_known_packet() {
    let packet = unhex(KNOWN_PACKET);
    assert_eq!(open(&packet, &key(), SESSION_ID), Ok(known_envelope()));
}

#[test]
fn sealing_reproduces_the_known_packet() {
    let packet = seal_with_padding(&known_envelope(), &key(), &[0x5a; 32]);
    assert_eq!(packet, unhex(KNOWN_PACKET));
}

#[test]
fn any_flipped_ciphertext_byte_is_an_integrity_error() {
    let packet = unhex(KNOWN_PACKET);
    for i in 24..packet.len() {
        let mut tampered = packet.clone();
        tampered[i] ^= 0x80;
        assert_eq!(open(&tampered, &key(), SESSION_ID), Err(EnvelopeError::Integrity), "byte {i}");
    }
}

#[test]
fn flipped_msg_key_is_an_integrity_error() {
    let mut packet = unhex(KNOWN_PACKET);
    packet[8] ^= 1;
    assert_eq!(open(&packet, &key(), SESSION_ID), Err(EnvelopeError::Integrity));
}

#[test]
fn flipped_fingerprint_is_a_key_mismatch() {
    let mut packet = unhex(KNOWN_PACKET);
    packet[0] ^= 1;
    assert_eq!(open(&packet, &key(), SESSION_ID), Err(EnvelopeError::AuthKeyMismatch));
}

#[test]
fn truncated_packet_is_rejected() {
    let packet = unhex(KNOWN_PACKET);
    assert_eq!(open(&packet[..packet.len() - 3], &key(), SESSION_ID), Err(EnvelopeError::Decryption));
}
