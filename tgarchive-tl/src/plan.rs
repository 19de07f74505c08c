//! Field plans: the decoder descriptor compiled from each TL constructor.

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::SchemaError;
use crate::tl::{Definition, ParameterType, Type};

/// How one field is laid out on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Int,
    Long,
    Double,
    Int128,
    Int256,
    String,
    Bytes,
    /// A `#` bitmask; later conditional fields test its bits.
    Flags,
    /// `flags.N?true`: no bytes, the bit itself is the value.
    True,
    /// Constructor id followed by the body, resolved through the registry.
    /// Covers `Bool`, `Object`, generic `!X` and every boxed type.
    Object,
    /// Boxed `Vector<T>`: vector id, count, then `T` elements.
    Vector(Box<FieldKind>),
    /// Bare `vector<T>`: count, then `T` elements.
    BareVector(Box<FieldKind>),
    /// A constructor written without its id (`%Message`, `future_salt`),
    /// resolved against the table that declares the field.
    Bare { id: u32, name: Arc<str> },
}

/// `flags.N?`: the field exists only when bit `bit` of `field` is set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlagCondition {
    pub field: Arc<str>,
    pub bit: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: Arc<str>,
    pub kind: FieldKind,
    pub condition: Option<FlagCondition>,
}

/// Everything needed to decode one constructor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub id: u32,
    /// Full constructor name, e.g. `updates.channelDifference`.
    pub name: Arc<str>,
    /// Full boxed type name, e.g. `updates.ChannelDifference`.
    pub ty: Arc<str>,
    pub fields: Vec<Field>,
}

/// Names and ids of one table's constructors, for resolving bare fields.
#[derive(Debug, Default)]
pub(crate) struct ConstructorIndex {
    /// Boxed type name → its constructors.
    by_type: HashMap<String, Vec<(String, u32)>>,
    by_name: HashMap<String, u32>,
}

pub(crate) fn constructor_index<'a>(defs: impl IntoIterator<Item = &'a Definition>) -> ConstructorIndex {
    let mut index = ConstructorIndex::default();
    for def in defs {
        let name = def.full_name();
        index.by_type.entry(def.ty.full_name()).or_default().push((name.clone(), def.id));
        index.by_name.insert(name, def.id);
    }
    index
}

pub(crate) fn compile(def: &Definition, index: &ConstructorIndex) -> Result<TypeDescriptor, SchemaError> {
    let name: Arc<str> = def.full_name().into();
    let fields = def
        .params
        .iter()
        .map(|p| {
            let (kind, condition) = match &p.ty {
                ParameterType::Flags => (FieldKind::Flags, None),
                ParameterType::Normal { ty, flag } => (
                    kind_of(ty, &name, index)?,
                    flag.as_ref().map(|f| FlagCondition { field: f.name.as_str().into(), bit: f.index }),
                ),
            };
            Ok(Field { name: p.name.as_str().into(), kind, condition })
        })
        .collect::<Result<Vec<_>, SchemaError>>()?;

    Ok(TypeDescriptor {
        id: def.id,
        name,
        ty: def.ty.full_name().into(),
        fields,
    })
}

fn kind_of(ty: &Type, owner: &str, index: &ConstructorIndex) -> Result<FieldKind, SchemaError> {
    if ty.generic_ref {
        return Ok(FieldKind::Object);
    }

    let full = ty.full_name();
    if ty.bare_of_boxed {
        return match index.by_type.get(&full).map(Vec::as_slice) {
            Some([(name, id)]) => Ok(FieldKind::Bare { id: *id, name: name.as_str().into() }),
            _ => Err(SchemaError::AmbiguousBareType { constructor: owner.to_owned(), ty: full }),
        };
    }

    let element = |ty: &Type| match &ty.generic_arg {
        Some(arg) => kind_of(arg, owner, index).map(Box::new),
        None => Ok(Box::new(FieldKind::Object)),
    };

    Ok(match full.as_str() {
        "int" => FieldKind::Int,
        "long" => FieldKind::Long,
        "double" => FieldKind::Double,
        "int128" => FieldKind::Int128,
        "int256" => FieldKind::Int256,
        "string" => FieldKind::String,
        "bytes" => FieldKind::Bytes,
        "true" => FieldKind::True,
        "Vector" => FieldKind::Vector(element(ty)?),
        "vector" => FieldKind::BareVector(element(ty)?),
        _ if ty.bare => match index.by_name.get(&full) {
            Some(id) => FieldKind::Bare { id: *id, name: full.into() },
            None => return Err(SchemaError::UnknownBareType { constructor: owner.to_owned(), ty: full }),
        },
        _ => FieldKind::Object,
    })
}
