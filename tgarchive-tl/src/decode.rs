//! Schema-driven recursive deserializer.

use std::sync::Arc;

use crate::cursor::{Buffer, Deserializable};
use crate::errors::{DecodeError, Result};
use crate::plan::{FieldKind, TypeDescriptor};
use crate::registry::{LayerSchema, Lookup};
use crate::value::{Object, Value};
use crate::{CONTAINER_MESSAGE_ID, MSG_CONTAINER_ID, VECTOR_ID};

/// Nesting cap applied unless [`Deserializer::with_max_depth`] says otherwise.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Decodes values of one layer.
///
/// Holds nothing but a borrow of the layer's tables, so one instance can be
/// created per packet (or shared across threads) at no cost.
#[derive(Clone, Copy, Debug)]
pub struct Deserializer<'s> {
    schema: &'s LayerSchema,
    max_depth: usize,
}

impl<'s> Deserializer<'s> {
    pub fn new(schema: &'s LayerSchema) -> Self {
        Self { schema, max_depth: DEFAULT_MAX_DEPTH }
    }

    /// Cap on object/vector nesting. Deeper input fails with
    /// [`DecodeError::MaxDepthExceeded`].
    pub fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = limit;
        self
    }

    pub fn schema(&self) -> &'s LayerSchema { self.schema }

    /// Decode one id-prefixed value.
    pub fn decode_value(&self, buf: Buffer) -> Result<Value> {
        self.boxed(buf, 0)
    }

    /// Decode a boxed vector whose elements are themselves id-prefixed.
    pub fn decode_vector(&self, buf: Buffer) -> Result<Vec<Value>> {
        self.expect_vector(buf)?;
        self.elements(buf, &FieldKind::Object, 0)
    }

    /// Decode the fields of `desc` with no leading constructor id.
    pub fn decode_bare(&self, buf: Buffer, desc: &TypeDescriptor) -> Result<Object> {
        self.object(buf, desc, 0)
    }

    fn enter(&self, depth: usize) -> Result<usize> {
        if depth >= self.max_depth {
            return Err(DecodeError::MaxDepthExceeded { limit: self.max_depth });
        }
        Ok(depth + 1)
    }

    fn boxed(&self, buf: Buffer, depth: usize) -> Result<Value> {
        let depth = self.enter(depth)?;
        let start = buf.pos();
        let id = u32::deserialize(buf)?;

        match self.schema.lookup(id) {
            Some(Lookup::BoolTrue) => Ok(Value::Bool(true)),
            Some(Lookup::BoolFalse) => Ok(Value::Bool(false)),
            Some(Lookup::Vector) => self.elements(buf, &FieldKind::Object, depth).map(Value::Vector),
            Some(Lookup::Container) => self.container(buf).map(Value::Object),
            Some(Lookup::Descriptor(desc)) => self.object(buf, desc, depth).map(Value::Object),
            None => {
                buf.set_pos(start);
                Err(DecodeError::TypeNotFound {
                    id,
                    position: start,
                    remaining: buf.remaining_bytes().to_vec(),
                })
            }
        }
    }

    fn object(&self, buf: Buffer, desc: &TypeDescriptor, depth: usize) -> Result<Object> {
        let mut fields: Vec<(Arc<str>, Value)> = Vec::with_capacity(desc.fields.len());

        for field in &desc.fields {
            if let Some(cond) = &field.condition {
                let set = fields
                    .iter()
                    .find(|(name, _)| *name == cond.field)
                    .and_then(|(_, v)| match v {
                        Value::Int(bits) => Some((*bits as u32) & (1 << cond.bit) != 0),
                        _ => None,
                    })
                    .unwrap_or(false);

                if field.kind == FieldKind::True {
                    fields.push((field.name.clone(), Value::Bool(set)));
                    continue;
                }
                if !set {
                    continue;
                }
            }

            let value = self.field(buf, &field.kind, depth)?;
            fields.push((field.name.clone(), value));
        }

        Ok(Object { id: desc.id, name: desc.name.clone(), fields })
    }

    fn field(&self, buf: Buffer, kind: &FieldKind, depth: usize) -> Result<Value> {
        Ok(match kind {
            FieldKind::Int | FieldKind::Flags => Value::Int(i32::deserialize(buf)?),
            FieldKind::Long => Value::Long(i64::deserialize(buf)?),
            FieldKind::Double => Value::Double(f64::deserialize(buf)?),
            FieldKind::Int128 => Value::Int128(<[u8; 16]>::deserialize(buf)?),
            FieldKind::Int256 => Value::Int256(<[u8; 32]>::deserialize(buf)?),
            FieldKind::String => Value::String(String::deserialize(buf)?),
            FieldKind::Bytes => Value::Bytes(Vec::<u8>::deserialize(buf)?),
            FieldKind::True => Value::Bool(true),
            FieldKind::Object => self.boxed(buf, depth)?,
            FieldKind::Vector(elem) => {
                self.expect_vector(buf)?;
                Value::Vector(self.elements(buf, elem, depth)?)
            }
            FieldKind::BareVector(elem) => Value::Vector(self.elements(buf, elem, depth)?),
            FieldKind::Bare { id, name } => match self.schema.lookup(*id) {
                Some(Lookup::Descriptor(desc)) => Value::Object(self.object(buf, desc, self.enter(depth)?)?),
                _ => return Err(DecodeError::UnknownBareType(name.to_string())),
            },
        })
    }

    fn expect_vector(&self, buf: Buffer) -> Result<()> {
        let start = buf.pos();
        let id = u32::deserialize(buf)?;
        if id != VECTOR_ID {
            buf.set_pos(start);
            return Err(DecodeError::TypeNotFound {
                id,
                position: start,
                remaining: buf.remaining_bytes().to_vec(),
            });
        }
        Ok(())
    }

    fn elements(&self, buf: Buffer, elem: &FieldKind, depth: usize) -> Result<Vec<Value>> {
        let depth = self.enter(depth)?;
        let count = read_count(buf)?;
        let mut out = Vec::with_capacity(count.min(buf.remaining() / 4));
        for _ in 0..count {
            out.push(self.field(buf, elem, depth)?);
        }
        Ok(out)
    }

    /// `msg_container`: each inner message's body is sliced out by its
    /// declared length and left undecoded.
    fn container(&self, buf: Buffer) -> Result<Object> {
        let count = read_count(buf)?;
        let mut messages = Vec::with_capacity(count.min(buf.remaining() / 16));

        for _ in 0..count {
            let msg_id = i64::deserialize(buf)?;
            let seqno = i32::deserialize(buf)?;
            let len = i32::deserialize(buf)?;
            let len = usize::try_from(len).map_err(|_| DecodeError::BufferExhausted)?;
            let body = buf.read_raw(len)?.to_vec();

            let message = Object::new(CONTAINER_MESSAGE_ID, "message")
                .with("msg_id", msg_id)
                .with("seqno", seqno)
                .with("bytes", len as i32)
                .with("body", body);
            messages.push(Value::Object(message));
        }

        Ok(Object::new(MSG_CONTAINER_ID, "msg_container").with("messages", messages))
    }
}

/// Element count of a vector, rejected up front when it cannot possibly fit
/// in what is left of the buffer.
fn read_count(buf: Buffer) -> Result<usize> {
    let count = u32::deserialize(buf)? as usize;
    if count > buf.remaining() {
        return Err(DecodeError::BufferExhausted);
    }
    Ok(count)
}
