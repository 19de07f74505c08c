//! The decoded object tree.

use std::sync::Arc;

/// One decoded TL value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i32),
    Long(i64),
    Double(f64),
    Int128([u8; 16]),
    Int256([u8; 32]),
    String(String),
    Bytes(Vec<u8>),
    Vector(Vec<Value>),
    Object(Object),
}

/// A composite value: constructor id, name, and fields in wire order.
///
/// Conditional fields whose bit was clear are absent, except `flags.N?true`
/// fields which are always present as [`Value::Bool`].
#[derive(Clone, Debug, PartialEq)]
pub struct Object {
    pub id: u32,
    pub name: Arc<str>,
    pub fields: Vec<(Arc<str>, Value)>,
}

impl Object {
    pub fn new(id: u32, name: impl Into<Arc<str>>) -> Self {
        Self { id, name: name.into(), fields: Vec::new() }
    }

    /// Builder-style field append, handy for fixtures.
    pub fn with(mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| &**n == name).map(|(_, v)| v)
    }

    /// Whether this object was decoded from constructor `name`.
    pub fn is(&self, name: &str) -> bool { &*self.name == name }

    /// `flags.N?true` fields read back as plain booleans; missing is `false`.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), Some(Value::Bool(true)))
    }
}

impl Value {
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<Object> {
        match self {
            Self::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_vector(&self) -> Option<&[Value]> {
        match self {
            Self::Vector(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer fields of either width, widened.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(i64::from(*i)),
            Self::Long(l) => Some(*l),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Raw bytes of a `bytes` field (or of a `string` field).
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            Self::String(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Constructor name if this is an object.
    pub fn type_name(&self) -> Option<&str> {
        self.as_object().map(|o| &*o.name)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self { Self::Bool(v) }
}
impl From<i32> for Value {
    fn from(v: i32) -> Self { Self::Int(v) }
}
impl From<i64> for Value {
    fn from(v: i64) -> Self { Self::Long(v) }
}
impl From<&str> for Value {
    fn from(v: &str) -> Self { Self::String(v.to_owned()) }
}
impl From<String> for Value {
    fn from(v: String) -> Self { Self::String(v) }
}
impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self { Self::Bytes(v) }
}
impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self { Self::Vector(v) }
}
impl From<Object> for Value {
    fn from(v: Object) -> Self { Self::Object(v) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_access() {
        let obj = Object::new(0x59511722, "peerUser").with("user_id", 42i64);
        assert!(obj.is("peerUser"));
        assert_eq!(obj.get("user_id").and_then(Value::as_i64), Some(42));
        assert_eq!(obj.get("missing"), None);
        assert!(!obj.flag("bot"));
    }

    #[test]
    fn widening() {
        assert_eq!(Value::Int(-5).as_i64(), Some(-5));
        assert_eq!(Value::from("x").as_i64(), None);
    }
}
