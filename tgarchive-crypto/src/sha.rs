//! Hash helpers shared by key derivation and integrity checks.

/// Calculate the SHA-1 hash of one or more byte slices concatenated.
#[macro_export]
macro_rules! sha1 {
    ( $( $x:expr ),+ ) => {{
        use sha1::{Digest, Sha1};
        let mut h = Sha1::new();
        $( h.update($x); )+
        let out: [u8; 20] = h.finalize().into();
        out
    }};
}

/// Calculate the SHA-256 hash of one or more byte slices concatenated.
#[macro_export]
macro_rules! sha256 {
    ( $( $x:expr ),+ ) => {{
        use sha2::{Digest, Sha256};
        let mut h = Sha256::new();
        $( h.update($x); )+
        let out: [u8; 32] = h.finalize().into();
        out
    }};
}

/// `msg_key` for a plaintext: bytes `[8..24]` of
/// `SHA-256(auth_key[88 + x .. 120 + x] || plaintext)`.
pub(crate) fn msg_key_for(auth_key: &[u8; 256], x: usize, plaintext: &[u8]) -> [u8; 16] {
    let large = sha256!(&auth_key[88 + x..88 + x + 32], plaintext);
    let mut out = [0u8; 16];
    out.copy_from_slice(&large[8..24]);
    out
}
