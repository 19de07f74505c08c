//! Per-layer constructor tables and the registry that owns them.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use crate::errors::{SchemaError, UnsupportedLayer};
use crate::plan::{self, TypeDescriptor};
use crate::tl::{Category, Definition};
use crate::{BOOL_FALSE_ID, BOOL_TRUE_ID, MSG_CONTAINER_ID, VECTOR_ID};

/// Constructor id → descriptor for one schema file.
#[derive(Clone, Debug, Default)]
pub struct Table {
    by_id: HashMap<u32, Arc<TypeDescriptor>>,
    by_name: HashMap<Arc<str>, u32>,
}

impl Table {
    /// Compile every constructor of a TL source.
    ///
    /// Functions are skipped, and so are lines this parser does not model
    /// (built-in primitive declarations); those are logged and ignored.
    pub fn from_tl(src: &str) -> Result<Self, SchemaError> {
        let defs: Vec<Definition> = crate::parse_tl_file(src)
            .filter_map(|(line, result)| match result {
                Ok(def) if def.category == Category::Types => Some(def),
                Ok(_) => None,
                Err(e) => {
                    tracing::debug!("[tl] skipping line {line}: {e}");
                    None
                }
            })
            .collect();
        Self::from_definitions(&defs)
    }

    pub fn from_definitions(defs: &[Definition]) -> Result<Self, SchemaError> {
        let index = plan::constructor_index(defs);
        let mut table = Self::default();
        for def in defs {
            table.insert(plan::compile(def, &index)?);
        }
        Ok(table)
    }

    /// Add a descriptor. A later constructor with the same id replaces the
    /// earlier one.
    pub fn insert(&mut self, desc: TypeDescriptor) {
        if let Some(old) = self.by_id.get(&desc.id) {
            tracing::warn!("[tl] {:#010x}: {} replaces {}", desc.id, desc.name, old.name);
            self.by_name.remove(&old.name);
        }
        self.by_name.insert(desc.name.clone(), desc.id);
        self.by_id.insert(desc.id, Arc::new(desc));
    }

    pub fn get(&self, id: u32) -> Option<&TypeDescriptor> {
        self.by_id.get(&id).map(|d| &**d)
    }

    pub fn by_name(&self, name: &str) -> Option<&TypeDescriptor> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    pub fn len(&self) -> usize { self.by_id.len() }

    pub fn is_empty(&self) -> bool { self.by_id.is_empty() }
}

/// What a constructor id resolves to.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Lookup<'a> {
    BoolTrue,
    BoolFalse,
    Vector,
    /// `msg_container`, whose inner bodies are kept as raw bytes.
    Container,
    Descriptor(&'a TypeDescriptor),
}

/// The two tables of one layer: application first, then core.
#[derive(Clone, Debug)]
pub struct LayerSchema {
    layer: i32,
    api: Table,
    core: Arc<Table>,
}

impl LayerSchema {
    pub fn new(layer: i32, api: Table, core: Arc<Table>) -> Self {
        Self { layer, api, core }
    }

    /// Compile both tables from TL text.
    pub fn from_tl(layer: i32, api_src: &str, core_src: &str) -> Result<Self, SchemaError> {
        Ok(Self::new(layer, Table::from_tl(api_src)?, Arc::new(Table::from_tl(core_src)?)))
    }

    pub fn layer(&self) -> i32 { self.layer }

    pub fn api(&self) -> &Table { &self.api }

    pub fn core(&self) -> &Table { &self.core }

    /// Resolve a constructor id. Reserved ids never reach the tables.
    pub fn lookup(&self, id: u32) -> Option<Lookup<'_>> {
        match id {
            BOOL_TRUE_ID => Some(Lookup::BoolTrue),
            BOOL_FALSE_ID => Some(Lookup::BoolFalse),
            VECTOR_ID => Some(Lookup::Vector),
            MSG_CONTAINER_ID => Some(Lookup::Container),
            _ => self.api.get(id).or_else(|| self.core.get(id)).map(Lookup::Descriptor),
        }
    }

    /// Resolve a bare constructor by name, application table first.
    pub fn by_name(&self, name: &str) -> Option<&TypeDescriptor> {
        self.api.by_name(name).or_else(|| self.core.by_name(name))
    }
}

/// Every loaded layer, keyed by layer number.
///
/// Built once at startup, then shared read-only (typically in an `Arc`).
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    layers: BTreeMap<i32, LayerSchema>,
}

impl SchemaRegistry {
    pub fn new() -> Self { Self::default() }

    /// Register a layer, returning the one it replaced.
    pub fn insert(&mut self, schema: LayerSchema) -> Option<LayerSchema> {
        self.layers.insert(schema.layer, schema)
    }

    pub fn layer(&self, layer: i32) -> Result<&LayerSchema, UnsupportedLayer> {
        self.layers.get(&layer).ok_or(UnsupportedLayer(layer))
    }

    /// Two-tier lookup of `id` within `layer`.
    pub fn lookup(&self, layer: i32, id: u32) -> Result<Option<Lookup<'_>>, UnsupportedLayer> {
        Ok(self.layer(layer)?.lookup(id))
    }

    /// Loaded layers, newest first.
    pub fn supported_layers(&self) -> Vec<i32> {
        self.layers.keys().rev().copied().collect()
    }

    pub fn is_empty(&self) -> bool { self.layers.is_empty() }

    /// Load `dir/mtproto.tl` as the shared core table and every
    /// `dir/<N>/api.tl` as layer `N`.
    ///
    /// Each `api.tl` must carry a `// LAYER N` line matching its directory.
    pub fn load_dir(dir: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let dir = dir.as_ref();
        let core_path = dir.join("mtproto.tl");
        let core = Arc::new(Table::from_tl(&read(&core_path)?)?);
        tracing::info!("[tl] core schema: {} constructors", core.len());

        let entries = std::fs::read_dir(dir).map_err(|source| SchemaError::Io { path: dir.to_owned(), source })?;
        let mut registry = Self::new();
        for entry in entries {
            let entry = entry.map_err(|source| SchemaError::Io { path: dir.to_owned(), source })?;
            let Some(layer) = entry.file_name().to_str().and_then(|n| n.parse::<i32>().ok()) else {
                continue;
            };
            let api_path = entry.path().join("api.tl");
            if !api_path.is_file() {
                continue;
            }

            let src = read(&api_path)?;
            let found = declared_layer(&src);
            if found != Some(layer) {
                return Err(SchemaError::LayerMismatch { path: api_path, expected: layer, found });
            }

            let api = Table::from_tl(&src)?;
            tracing::info!("[tl] layer {layer}: {} constructors", api.len());
            registry.insert(LayerSchema::new(layer, api, Arc::clone(&core)));
        }

        if registry.is_empty() {
            return Err(SchemaError::NoLayers { path: dir.to_owned() });
        }
        Ok(registry)
    }
}

fn read(path: &Path) -> Result<String, SchemaError> {
    std::fs::read_to_string(path).map_err(|source| SchemaError::Io { path: path.to_owned(), source })
}

/// The `N` of the first `// LAYER N` line.
pub(crate) fn declared_layer(src: &str) -> Option<i32> {
    src.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("//")?.trim_start();
        rest.strip_prefix("LAYER")?.trim().parse().ok()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORE: &str = "
        boolFalse#bc799737 = Bool;
        boolTrue#997275b5 = Bool;
        pong#347773c5 msg_id:long ping_id:long = Pong;
    ";
    const API: &str = "
        // LAYER 7
        peerUser#59511722 user_id:long = Peer;
        pongOverride#347773c5 = Pong;
        ---functions---
        help.getConfig#c4f9186b = Config;
    ";

    #[test]
    fn api_table_shadows_core() {
        let schema = LayerSchema::from_tl(7, API, CORE).unwrap();
        match schema.lookup(0x347773c5) {
            Some(Lookup::Descriptor(d)) => assert_eq!(&*d.name, "pongOverride"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(schema.core().len(), 3);
    }

    #[test]
    fn reserved_ids_short_circuit() {
        let schema = LayerSchema::from_tl(7, API, CORE).unwrap();
        assert_eq!(schema.lookup(BOOL_TRUE_ID), Some(Lookup::BoolTrue));
        assert_eq!(schema.lookup(BOOL_FALSE_ID), Some(Lookup::BoolFalse));
        assert_eq!(schema.lookup(VECTOR_ID), Some(Lookup::Vector));
        assert_eq!(schema.lookup(0xdeadbeef), None);
    }

    #[test]
    fn functions_are_not_constructors() {
        let schema = LayerSchema::from_tl(7, API, CORE).unwrap();
        assert_eq!(schema.lookup(0xc4f9186b), None);
    }

    #[test]
    fn unsupported_layer() {
        let mut registry = SchemaRegistry::new();
        registry.insert(LayerSchema::from_tl(7, API, CORE).unwrap());
        assert_eq!(registry.lookup(8, 0x59511722).unwrap_err(), UnsupportedLayer(8));
        assert!(registry.lookup(7, 0x59511722).unwrap().is_some());
    }

    #[test]
    fn layer_header() {
        assert_eq!(declared_layer("// LAYER 200\nfoo = Bar;"), Some(200));
        assert_eq!(declared_layer("//LAYER 3"), Some(3));
        assert_eq!(declared_layer("// nothing here"), None);
    }
}
