//! Expands batched, compressed and RPC-wrapped objects into a flat list.

use std::io::Read;

use tgarchive_tl::{Cursor, DecodeError, Deserializer, Object, Value};

/// Compression inside containers inside compression... is allowed, up to here.
pub const DEFAULT_MAX_NESTING: usize = 8;

/// Why one branch of the tree was dropped.
#[derive(Clone, Debug, PartialEq)]
pub enum UnwrapError {
    Decode(DecodeError),
    /// Neither gzip nor zlib could inflate a `gzip_packed` payload.
    Decompression(String),
    /// Wrappers nested deeper than the unwrapper's limit.
    NestingTooDeep { limit: usize },
    /// A wrapper object is missing the field it is unwrapped through.
    Malformed(&'static str),
}

impl std::fmt::Display for UnwrapError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decode(e) => write!(f, "decode: {e}"),
            Self::Decompression(e) => write!(f, "decompression failed: {e}"),
            Self::NestingTooDeep { limit } => write!(f, "wrappers nested deeper than {limit}"),
            Self::Malformed(what) => write!(f, "malformed {what}"),
        }
    }
}

impl std::error::Error for UnwrapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DecodeError> for UnwrapError {
    fn from(e: DecodeError) -> Self { Self::Decode(e) }
}

/// A sub-message of a container that could not be expanded.
#[derive(Clone, Debug, PartialEq)]
pub struct Failure {
    /// `msg_id` of the container entry, `None` for the root itself.
    pub msg_id: Option<i64>,
    pub error:  UnwrapError,
}

/// Result of [`Unwrapper::flatten`]: every terminal object in wire order, plus
/// the branches that had to be skipped.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Flattened {
    pub objects:  Vec<Value>,
    pub failures: Vec<Failure>,
}

/// Recursively expands `msg_container`, `gzip_packed` and `rpc_result`.
#[derive(Clone, Copy, Debug)]
pub struct Unwrapper<'s> {
    de:          Deserializer<'s>,
    max_nesting: usize,
}

impl<'s> Unwrapper<'s> {
    pub fn new(de: Deserializer<'s>) -> Self {
        Self { de, max_nesting: DEFAULT_MAX_NESTING }
    }

    pub fn with_max_nesting(mut self, limit: usize) -> Self {
        self.max_nesting = limit;
        self
    }

    /// Decode a body and flatten it.
    pub fn flatten_bytes(&self, body: &[u8]) -> Flattened {
        match self.decode(body) {
            Ok(root) => self.flatten(root),
            Err(error) => Flattened { objects: Vec::new(), failures: vec![Failure { msg_id: None, error }] },
        }
    }

    /// Flatten an already decoded root.
    ///
    /// A container entry that fails to decode is recorded in
    /// [`Flattened::failures`] and its siblings carry on.
    pub fn flatten(&self, root: Value) -> Flattened {
        let mut out = Flattened::default();
        if let Err(error) = self.walk(root, 0, &mut out) {
            out.failures.push(Failure { msg_id: None, error });
        }
        out
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, UnwrapError> {
        Ok(self.de.decode_value(&mut Cursor::from_slice(bytes))?)
    }

    fn walk(&self, value: Value, nesting: usize, out: &mut Flattened) -> Result<(), UnwrapError> {
        if nesting > self.max_nesting {
            return Err(UnwrapError::NestingTooDeep { limit: self.max_nesting });
        }

        let obj = match value {
            Value::Object(obj) => obj,
            other => {
                out.objects.push(other);
                return Ok(());
            }
        };

        match obj.id {
            tgarchive_tl::MSG_CONTAINER_ID => self.container(obj, nesting, out),
            tgarchive_tl::GZIP_PACKED_ID => {
                let packed = obj
                    .get("packed_data")
                    .or_else(|| obj.get("data"))
                    .and_then(Value::as_bytes)
                    .ok_or(UnwrapError::Malformed("gzip_packed"))?;
                let inner = self.decode(&inflate(packed)?)?;
                self.walk(inner, nesting + 1, out)
            }
            tgarchive_tl::RPC_RESULT_ID => {
                let result = obj
                    .fields
                    .into_iter()
                    .find_map(|(name, v)| (&*name == "result").then_some(v))
                    .ok_or(UnwrapError::Malformed("rpc_result"))?;
                self.walk(result, nesting + 1, out)
            }
            _ => {
                out.objects.push(Value::Object(obj));
                Ok(())
            }
        }
    }

    fn container(&self, obj: Object, nesting: usize, out: &mut Flattened) -> Result<(), UnwrapError> {
        let messages = obj
            .get("messages")
            .and_then(Value::as_vector)
            .ok_or(UnwrapError::Malformed("msg_container"))?;

        for message in messages {
            let Some(message) = message.as_object() else { continue };
            let msg_id = message.get("msg_id").and_then(Value::as_i64);
            let Some(body) = message.get("body").and_then(Value::as_bytes) else {
                out.failures.push(Failure { msg_id, error: UnwrapError::Malformed("container message") });
                continue;
            };

            let result = self.decode(body).and_then(|inner| self.walk(inner, nesting + 1, out));
            if let Err(error) = result {
                log::warn!("[mtproto] skipping container entry {msg_id:?}: {error}");
                out.failures.push(Failure { msg_id, error });
            }
        }
        Ok(())
    }
}

/// Inflate a `gzip_packed` payload, falling back to a bare zlib stream.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>, UnwrapError> {
    let mut out = Vec::new();
    if flate2::read::GzDecoder::new(data).read_to_end(&mut out).is_ok() && !out.is_empty() {
        return Ok(out);
    }
    out.clear();
    flate2::read::ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(|e| UnwrapError::Decompression(e.to_string()))?;
    Ok(out)
}
