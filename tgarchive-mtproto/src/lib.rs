//! MTProto 2.0 framing for captured, server-sent packets.
//!
//! This crate handles:
//! * Opening a packet: decryption, `msg_key` verification, session and
//!   message-id checks ([`open`])
//! * Sealing an envelope the way the server would ([`seal`]), for fixtures
//! * Expanding `msg_container`, `gzip_packed` and `rpc_result` wrappers into
//!   the flat list of objects they carry ([`Unwrapper`])

#![deny(unsafe_code)]

mod envelope;
mod unwrap;

pub use envelope::{Envelope, EnvelopeError, open, seal, seal_with_padding};
pub use unwrap::{DEFAULT_MAX_NESTING, Failure, Flattened, UnwrapError, Unwrapper, inflate};
