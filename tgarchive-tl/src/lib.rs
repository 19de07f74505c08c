//! Layer-versioned TL schemas and a schema-driven binary deserializer.
//!
//! Unlike a code generator, this crate compiles `.tl` text at startup into
//! per-constructor field plans and decodes arbitrary objects into a dynamic
//! [`Value`] tree. Every protocol layer gets its own tables, so constructor
//! ids reused across layers never collide.
//!
//! ```rust
//! use tgarchive_tl::{Cursor, Deserializer, LayerSchema};
//!
//! let schema = LayerSchema::from_tl(
//!     1,
//!     "peerUser#59511722 user_id:long = Peer;",
//!     "boolTrue#997275b5 = Bool;",
//! ).unwrap();
//!
//! let mut bytes = 0x59511722u32.to_le_bytes().to_vec();
//! bytes.extend(7i64.to_le_bytes());
//!
//! let value = Deserializer::new(&schema)
//!     .decode_value(&mut Cursor::from_slice(&bytes))
//!     .unwrap();
//! assert_eq!(value.type_name(), Some("peerUser"));
//! ```

#![deny(unsafe_code)]

pub mod cursor;
mod decode;
mod encode;
pub mod errors;
mod iterator;
pub mod plan;
mod registry;
pub mod serialize;
pub mod tl;
mod utils;
mod value;

pub use cursor::{Cursor, Deserializable};
pub use decode::{DEFAULT_MAX_DEPTH, Deserializer};
pub use encode::encode;
pub use errors::{DecodeError, EncodeError, ParseError, SchemaError, UnsupportedLayer};
pub use plan::{Field, FieldKind, FlagCondition, TypeDescriptor};
pub use registry::{LayerSchema, Lookup, SchemaRegistry, Table};
pub use serialize::Serializable;
pub use value::{Object, Value};

/// `boolTrue#997275b5 = Bool`
pub const BOOL_TRUE_ID: u32 = 0x997275b5;
/// `boolFalse#bc799737 = Bool`
pub const BOOL_FALSE_ID: u32 = 0xbc799737;
/// `vector#1cb5c415 {t:Type} # [ t ] = Vector t`
pub const VECTOR_ID: u32 = 0x1cb5c415;
/// `msg_container#73f1f8dc messages:vector<%Message> = MessageContainer`
pub const MSG_CONTAINER_ID: u32 = 0x73f1f8dc;
/// `message msg_id:long seqno:int bytes:int body:Object = Message`
pub const CONTAINER_MESSAGE_ID: u32 = 0x5bb8e511;
/// `gzip_packed#3072cfa1 packed_data:bytes = Object`
pub const GZIP_PACKED_ID: u32 = 0x3072cfa1;
/// `rpc_result#f35c6d01 req_msg_id:long result:Object = RpcResult`
pub const RPC_RESULT_ID: u32 = 0xf35c6d01;

/// Parse TL schema text, yielding each definition with the line it started on.
///
/// `//` comments are stripped, multi-line definitions are joined up to their
/// `;`, and `---functions---` / `---types---` switch the category of what
/// follows. Bad lines come back as errors so the caller decides whether to
/// skip them.
pub fn parse_tl_file(contents: &str) -> impl Iterator<Item = (usize, Result<tl::Definition, ParseError>)> + '_ {
    iterator::TlIterator::new(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_line_definitions_and_sections() {
        let src = "\
// header
peerUser#59511722
    user_id:long = Peer;
---functions---
ping#7abe77ec ping_id:long = Pong;
";
        let defs: Vec<_> = parse_tl_file(src).collect();
        assert_eq!(defs.len(), 2);

        let (line, first) = &defs[0];
        assert_eq!(*line, 2);
        let first = first.as_ref().unwrap();
        assert_eq!(first.params.len(), 1);
        assert_eq!(first.category, tl::Category::Types);

        let (_, second) = &defs[1];
        assert_eq!(second.as_ref().unwrap().category, tl::Category::Functions);
    }

    #[test]
    fn bad_lines_are_reported_with_their_number() {
        let src = "int ? = Int;\nboolTrue#997275b5 = Bool;";
        let defs: Vec<_> = parse_tl_file(src).collect();
        assert_eq!(defs[0].0, 1);
        assert_eq!(defs[0].1, Err(ParseError::NotImplemented));
        assert!(defs[1].1.is_ok());
    }
}
