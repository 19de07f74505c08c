//! Encode [`Value`] trees back into TL bytes using the same field plans the
//! deserializer reads with.
//!
//! Flags fields are recomputed from the conditional fields present on the
//! object, so callers never maintain bitmasks by hand.

use crate::errors::EncodeError;
use crate::plan::{FieldKind, TypeDescriptor};
use crate::registry::{LayerSchema, Lookup};
use crate::serialize::Serializable;
use crate::value::{Object, Value};
use crate::VECTOR_ID;

type Result<T> = std::result::Result<T, EncodeError>;

/// Encode `value` as an id-prefixed (boxed) value.
pub fn encode(schema: &LayerSchema, value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    Encoder { schema }.boxed(value, &mut buf)?;
    Ok(buf)
}

struct Encoder<'s> {
    schema: &'s LayerSchema,
}

impl Encoder<'_> {
    fn boxed(&self, value: &Value, buf: &mut Vec<u8>) -> Result<()> {
        match value {
            Value::Bool(b) => b.serialize(buf),
            Value::Vector(items) => {
                VECTOR_ID.serialize(buf);
                (items.len() as u32).serialize(buf);
                for item in items {
                    self.boxed(item, buf)?;
                }
            }
            Value::Object(obj) => match self.schema.lookup(obj.id) {
                Some(Lookup::Container) => self.container(obj, buf)?,
                Some(Lookup::Descriptor(desc)) => {
                    desc.id.serialize(buf);
                    self.fields(obj, desc, buf)?;
                }
                _ => return Err(EncodeError::UnknownConstructor(format!("{:#010x} ({})", obj.id, obj.name))),
            },
            scalar => self.scalar(scalar, buf),
        }
        Ok(())
    }

    fn scalar(&self, value: &Value, buf: &mut Vec<u8>) {
        match value {
            Value::Int(v) => v.serialize(buf),
            Value::Long(v) => v.serialize(buf),
            Value::Double(v) => v.serialize(buf),
            Value::Int128(v) => v.serialize(buf),
            Value::Int256(v) => v.serialize(buf),
            Value::String(s) => s.as_str().serialize(buf),
            Value::Bytes(b) => b.as_slice().serialize(buf),
            Value::Bool(_) | Value::Vector(_) | Value::Object(_) => {}
        }
    }

    fn fields(&self, obj: &Object, desc: &TypeDescriptor, buf: &mut Vec<u8>) -> Result<()> {
        for field in &desc.fields {
            if field.kind == FieldKind::Flags {
                flags_for(obj, desc, &field.name).serialize(buf);
                continue;
            }
            if field.kind == FieldKind::True {
                continue;
            }

            match obj.get(&field.name) {
                Some(value) => self.field(&field.kind, value, &field.name, buf)?,
                None if field.condition.is_some() => {}
                None => {
                    return Err(EncodeError::MissingField {
                        constructor: desc.name.to_string(),
                        field: field.name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn field(&self, kind: &FieldKind, value: &Value, name: &str, buf: &mut Vec<u8>) -> Result<()> {
        let mismatch = |expected| EncodeError::TypeMismatch { field: name.to_owned(), expected };

        match (kind, value) {
            (FieldKind::Int | FieldKind::Flags, Value::Int(v)) => v.serialize(buf),
            (FieldKind::Long, v) => v.as_i64().ok_or_else(|| mismatch("long"))?.serialize(buf),
            (FieldKind::Double, Value::Double(v)) => v.serialize(buf),
            (FieldKind::Int128, Value::Int128(v)) => v.serialize(buf),
            (FieldKind::Int256, Value::Int256(v)) => v.serialize(buf),
            (FieldKind::String | FieldKind::Bytes, v) => {
                v.as_bytes().ok_or_else(|| mismatch("string or bytes"))?.serialize(buf)
            }
            (FieldKind::True, _) => {}
            (FieldKind::Object, v) => self.boxed(v, buf)?,
            (FieldKind::Vector(elem), Value::Vector(items)) => {
                VECTOR_ID.serialize(buf);
                self.elements(elem, items, name, buf)?;
            }
            (FieldKind::BareVector(elem), Value::Vector(items)) => self.elements(elem, items, name, buf)?,
            (FieldKind::Bare { id, name: ctor }, Value::Object(obj)) => match self.schema.lookup(*id) {
                Some(Lookup::Descriptor(desc)) => self.fields(obj, desc, buf)?,
                _ => return Err(EncodeError::UnknownConstructor(ctor.to_string())),
            },
            (FieldKind::Int | FieldKind::Flags, _) => return Err(mismatch("int")),
            (FieldKind::Double, _) => return Err(mismatch("double")),
            (FieldKind::Int128, _) => return Err(mismatch("int128")),
            (FieldKind::Int256, _) => return Err(mismatch("int256")),
            (FieldKind::Vector(_) | FieldKind::BareVector(_), _) => return Err(mismatch("vector")),
            (FieldKind::Bare { .. }, _) => return Err(mismatch("object")),
        }
        Ok(())
    }

    fn elements(&self, elem: &FieldKind, items: &[Value], name: &str, buf: &mut Vec<u8>) -> Result<()> {
        (items.len() as u32).serialize(buf);
        for item in items {
            self.field(elem, item, name, buf)?;
        }
        Ok(())
    }

    /// Mirror of the container decode: `msg_id`, `seqno`, body length, body.
    fn container(&self, obj: &Object, buf: &mut Vec<u8>) -> Result<()> {
        let messages = obj
            .get("messages")
            .and_then(Value::as_vector)
            .ok_or_else(|| EncodeError::MissingField { constructor: obj.name.to_string(), field: "messages".into() })?;

        crate::MSG_CONTAINER_ID.serialize(buf);
        (messages.len() as u32).serialize(buf);
        for msg in messages {
            let msg = msg.as_object().ok_or(EncodeError::TypeMismatch { field: "messages".into(), expected: "object" })?;
            let get = |field: &str| {
                msg.get(field).ok_or_else(|| EncodeError::MissingField {
                    constructor: msg.name.to_string(),
                    field: field.to_owned(),
                })
            };
            let msg_id = get("msg_id")?.as_i64().ok_or(EncodeError::TypeMismatch { field: "msg_id".into(), expected: "long" })?;
            let seqno = get("seqno")?.as_i64().ok_or(EncodeError::TypeMismatch { field: "seqno".into(), expected: "int" })?;
            let body = get("body")?.as_bytes().ok_or(EncodeError::TypeMismatch { field: "body".into(), expected: "bytes" })?;

            msg_id.serialize(buf);
            (seqno as i32).serialize(buf);
            (body.len() as i32).serialize(buf);
            buf.extend_from_slice(body);
        }
        Ok(())
    }
}

/// Bits of flags field `flags` implied by the conditional fields present.
fn flags_for(obj: &Object, desc: &TypeDescriptor, flags: &str) -> u32 {
    desc.fields
        .iter()
        .filter_map(|f| f.condition.as_ref().map(|c| (f, c)))
        .filter(|(_, c)| &*c.field == flags)
        .filter(|(f, _)| match f.kind {
            FieldKind::True => obj.flag(&f.name),
            _ => obj.get(&f.name).is_some(),
        })
        .fold(0, |acc, (_, c)| acc | (1 << c.bit))
}
