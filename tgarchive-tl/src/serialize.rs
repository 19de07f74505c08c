//! The [`Serializable`] trait and its implementations for primitive TL types.
//!
//! Encoding follows the [MTProto Binary Serialization] rules.
//!
//! [MTProto Binary Serialization]: https://core.telegram.org/mtproto/serialize

/// Serialize `self` into TL binary format.
pub trait Serializable {
    /// Appends the serialized form of `self` to `buf`.
    fn serialize(&self, buf: &mut Vec<u8>);

    /// Convenience: allocate a fresh `Vec<u8>` and serialize into it.
    fn to_bytes(&self) -> Vec<u8> {
        let mut v = Vec::new();
        self.serialize(&mut v);
        v
    }
}

/// `true` → `boolTrue#997275b5`, `false` → `boolFalse#bc799737`.
impl Serializable for bool {
    fn serialize(&self, buf: &mut Vec<u8>) {
        let id = if *self { crate::BOOL_TRUE_ID } else { crate::BOOL_FALSE_ID };
        id.serialize(buf);
    }
}

macro_rules! le_bytes {
    ( $( $t:ty ),+ ) => {
        $(
            impl Serializable for $t {
                fn serialize(&self, buf: &mut Vec<u8>) {
                    buf.extend_from_slice(&self.to_le_bytes());
                }
            }
        )+
    };
}

le_bytes!(i32, u32, i64, f64);

impl<const N: usize> Serializable for [u8; N] {
    fn serialize(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self);
    }
}

/// Length-prefixed, 4-byte aligned byte string.
///
/// * `len <= 253`: `[len][data][padding]`
/// * `len >= 254`: `[0xfe][len as 3 LE bytes][data][padding]`
impl Serializable for [u8] {
    fn serialize(&self, buf: &mut Vec<u8>) {
        let len = self.len();
        let header = if len <= 253 {
            buf.push(len as u8);
            1
        } else {
            buf.push(0xfe);
            buf.extend_from_slice(&(len as u32).to_le_bytes()[..3]);
            4
        };
        buf.extend_from_slice(self);
        let padding = (4 - (header + len) % 4) % 4;
        buf.extend(std::iter::repeat_n(0u8, padding));
    }
}

impl Serializable for str {
    fn serialize(&self, buf: &mut Vec<u8>) {
        self.as_bytes().serialize(buf);
    }
}
