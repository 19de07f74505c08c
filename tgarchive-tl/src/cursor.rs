//! The [`Cursor`] buffer, the [`Deserializable`] trait and primitive impls.

use crate::errors::{DecodeError, Result};

/// A forward-only reader over an in-memory byte slice.
///
/// Every read is bounds-checked; a short buffer yields
/// [`DecodeError::BufferExhausted`] and leaves the position where it was.
#[derive(Clone, Debug)]
pub struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Create a cursor positioned at the start of `buf`.
    pub fn from_slice(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Current byte offset.
    pub fn pos(&self) -> usize { self.pos }

    /// Restore a position previously returned by [`Cursor::pos`].
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.buf.len());
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize { self.buf.len() - self.pos }

    /// The unread tail, without consuming it.
    pub fn remaining_bytes(&self) -> &'a [u8] { &self.buf[self.pos..] }

    pub fn read_byte(&mut self) -> Result<u8> {
        let b = *self.buf.get(self.pos).ok_or(DecodeError::BufferExhausted)?;
        self.pos += 1;
        Ok(b)
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(DecodeError::BufferExhausted)?;
        let slice = self.buf.get(self.pos..end).ok_or(DecodeError::BufferExhausted)?;
        self.pos = end;
        Ok(slice)
    }

    /// Read exactly `out.len()` bytes.
    pub fn read_exact(&mut self, out: &mut [u8]) -> Result<()> {
        out.copy_from_slice(self.read_raw(out.len())?);
        Ok(())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut b = [0u8; N];
        self.read_exact(&mut b)?;
        Ok(b)
    }
}

/// Alias for the mutable cursor handed to decoders.
pub type Buffer<'a, 'b> = &'a mut Cursor<'b>;

/// Decode a fixed-shape value from TL binary format.
pub trait Deserializable: Sized {
    /// Read `Self` from `buf`, advancing its position.
    fn deserialize(buf: Buffer) -> Result<Self>;

    /// Convenience: deserialize from the start of a byte slice.
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::deserialize(&mut Cursor::from_slice(bytes))
    }
}

impl Deserializable for i32 {
    fn deserialize(buf: Buffer) -> Result<Self> { Ok(i32::from_le_bytes(buf.read_array()?)) }
}

impl Deserializable for u32 {
    fn deserialize(buf: Buffer) -> Result<Self> { Ok(u32::from_le_bytes(buf.read_array()?)) }
}

impl Deserializable for i64 {
    fn deserialize(buf: Buffer) -> Result<Self> { Ok(i64::from_le_bytes(buf.read_array()?)) }
}

impl Deserializable for f64 {
    fn deserialize(buf: Buffer) -> Result<Self> { Ok(f64::from_le_bytes(buf.read_array()?)) }
}

impl Deserializable for [u8; 16] {
    fn deserialize(buf: Buffer) -> Result<Self> { buf.read_array() }
}

impl Deserializable for [u8; 32] {
    fn deserialize(buf: Buffer) -> Result<Self> { buf.read_array() }
}

/// TL `bytes`: one length byte (or `0xfe` + 3 length bytes), the data, then
/// zero padding to a 4-byte boundary.
impl Deserializable for Vec<u8> {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let start = buf.pos();
        let first = buf.read_byte()?;
        let (len, header) = if first != 0xfe {
            (first as usize, 1)
        } else {
            let Ok([a, b, c]) = buf.read_array::<3>() else {
                buf.set_pos(start);
                return Err(DecodeError::BufferExhausted);
            };
            (a as usize | ((b as usize) << 8) | ((c as usize) << 16), 4)
        };

        let padding = (4 - (header + len) % 4) % 4;
        match buf.read_raw(len + padding) {
            Ok(data) => Ok(data[..len].to_vec()),
            Err(e) => {
                buf.set_pos(start);
                Err(e)
            }
        }
    }
}

/// TL `string`: `bytes` decoded as UTF-8, invalid sequences replaced.
impl Deserializable for String {
    fn deserialize(buf: Buffer) -> Result<Self> {
        let bytes = Vec::<u8>::deserialize(buf)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_reads_fail_without_moving() {
        let mut cur = Cursor::from_slice(&[1, 2, 3]);
        assert_eq!(i32::deserialize(&mut cur), Err(DecodeError::BufferExhausted));
        assert_eq!(cur.pos(), 0);
        assert_eq!(cur.read_byte(), Ok(1));
        assert_eq!(cur.remaining_bytes(), &[2, 3]);
    }

    #[test]
    fn short_bytes_with_padding() {
        // len=3, "abc", no padding needed (1 + 3 = 4)
        let data = [3, b'a', b'b', b'c', 0xff];
        let mut cur = Cursor::from_slice(&data);
        assert_eq!(Vec::<u8>::deserialize(&mut cur).unwrap(), b"abc");
        assert_eq!(cur.pos(), 4);

        // len=1, "x", two padding bytes
        let data = [1, b'x', 0, 0];
        let mut cur = Cursor::from_slice(&data);
        assert_eq!(String::deserialize(&mut cur).unwrap(), "x");
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn long_bytes_header() {
        let mut data = vec![0xfe, 0x00, 0x01, 0x00]; // 256
        data.extend(std::iter::repeat_n(7u8, 256));
        let mut cur = Cursor::from_slice(&data);
        let out = Vec::<u8>::deserialize(&mut cur).unwrap();
        assert_eq!(out.len(), 256);
        assert_eq!(cur.remaining(), 0);
    }

    #[test]
    fn declared_length_past_end() {
        let data = [200, 1, 2, 3];
        let mut cur = Cursor::from_slice(&data);
        assert_eq!(Vec::<u8>::deserialize(&mut cur), Err(DecodeError::BufferExhausted));
        assert_eq!(cur.pos(), 0);
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let data = [2, 0xff, b'a', 0];
        assert_eq!(String::from_bytes(&data).unwrap(), "\u{fffd}a");
    }
}
