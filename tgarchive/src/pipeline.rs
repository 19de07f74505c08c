//! Packet → decoded objects → message records.

use std::sync::Arc;

use tgarchive_crypto::AuthKey;
use tgarchive_mtproto::{DEFAULT_MAX_NESTING, Failure, UnwrapError, Unwrapper, open};
use tgarchive_tl::{Cursor, DEFAULT_MAX_DEPTH, Deserializer, SchemaRegistry, Value};

use crate::errors::PacketError;
use crate::extract::extract;
use crate::record::{Audit, MessageRecord};

/// One captured server-sent packet and what is needed to read it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Packet {
    pub layer:      i32,
    pub auth_key:   Vec<u8>,
    /// As sent on the wire, little-endian.
    pub session_id: [u8; 8],
    pub data:       Vec<u8>,
}

/// Everything recovered from one packet.
#[derive(Clone, Debug, PartialEq)]
pub struct Processed {
    pub msg_id:   i64,
    /// Terminal objects with containers, compression and RPC results expanded.
    pub objects:  Vec<Value>,
    /// Container entries that could not be decoded.
    pub failures: Vec<Failure>,
    pub records:  Vec<MessageRecord>,
}

/// Decrypts, decodes and extracts packets against a fixed set of layers.
///
/// Holds no per-packet state; share it freely between tasks.
#[derive(Clone, Debug)]
pub struct Pipeline {
    registry:    Arc<SchemaRegistry>,
    max_depth:   usize,
    max_nesting: usize,
}

impl Pipeline {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry, max_depth: DEFAULT_MAX_DEPTH, max_nesting: DEFAULT_MAX_NESTING }
    }

    /// Deserializer nesting cap.
    pub fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }

    /// How many container/compression/RPC wrappers may be stacked.
    pub fn with_max_nesting(mut self, limit: usize) -> Self {
        self.max_nesting = limit;
        self
    }

    pub fn registry(&self) -> &SchemaRegistry { &self.registry }

    pub fn process(&self, packet: &Packet) -> Result<Processed, PacketError> {
        let schema = self.registry.layer(packet.layer)?;
        let auth_key = AuthKey::from_slice(&packet.auth_key).map_err(|e| PacketError::InvalidAuthKey(e.0))?;
        let session_id = i64::from_le_bytes(packet.session_id);

        let envelope = open(&packet.data, &auth_key, session_id).inspect_err(|e| {
            tracing::warn!("[pipeline] discarding packet ({} bytes): {e}", packet.data.len());
        })?;

        let de = Deserializer::new(schema).with_max_depth(self.max_depth);
        let root = de.decode_value(&mut Cursor::from_slice(&envelope.body)).inspect_err(|e| {
            match e.constructor_id() {
                Some(id) => tracing::warn!("[pipeline] msg {}: unknown constructor {id:#010x}", envelope.msg_id),
                None => tracing::warn!("[pipeline] msg {}: {e}", envelope.msg_id),
            }
        })?;

        let flat = Unwrapper::new(de).with_max_nesting(self.max_nesting).flatten(root);
        for failure in &flat.failures {
            if let Some(id) = decode_failure_id(failure) {
                tracing::warn!("[pipeline] msg {}: entry {:?} has unknown constructor {id:#010x}", envelope.msg_id, failure.msg_id);
            }
        }

        let audit = Audit {
            auth_key:   Arc::from(packet.auth_key.as_slice()),
            session_id: packet.session_id,
            packet:     Arc::from(packet.data.as_slice()),
        };
        let mut records = extract(&flat.objects, packet.layer);
        for record in &mut records {
            record.audit = audit.clone();
        }

        tracing::info!(
            "[pipeline] msg {} (layer {}): {} objects, {} records, {} failed entries",
            envelope.msg_id,
            packet.layer,
            flat.objects.len(),
            records.len(),
            flat.failures.len(),
        );

        Ok(Processed { msg_id: envelope.msg_id, objects: flat.objects, failures: flat.failures, records })
    }
}

fn decode_failure_id(failure: &Failure) -> Option<u32> {
    match &failure.error {
        UnwrapError::Decode(e) => e.constructor_id(),
        _ => None,
    }
}
