//! Archive channel messages from captured MTProto traffic.
//!
//! A [`Pipeline`] takes a server-sent [`Packet`] together with the auth key
//! and session it belongs to, and:
//!
//! 1. verifies and decrypts it,
//! 2. decodes the body against the schema of the packet's layer,
//! 3. expands containers, `gzip_packed` and `rpc_result` wrappers,
//! 4. extracts channel messages as [`MessageRecord`]s with their formatting
//!    re-inserted as inline markup (see [`markup`]).
//!
//! Records are handed to a [`MessageStore`] through [`archive`].

#![deny(unsafe_code)]

mod errors;
mod extract;
pub mod markup;
mod pipeline;
mod record;
mod store;

pub use errors::PacketError;
pub use extract::extract;
pub use pipeline::{Packet, Pipeline, Processed};
pub use record::{Audit, CHANNEL_ID_OFFSET, MessageRecord, channel_to_chat_id, chat_to_channel_id};
pub use store::{MemoryStore, MessageStore, archive};

pub use tgarchive_tl as tl;
