//! Syntax tree of a single TL definition line.

mod definition;
mod parameter;
mod ty;

pub use definition::Definition;
pub use parameter::{Parameter, ParameterType};
pub use ty::Type;

/// Whether a [`Definition`] is a data constructor or an RPC function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Definitions before `---functions---` (or after `---types---`).
    Types,
    Functions,
}

/// A flag reference inside a parameter type, e.g. `flags.0` in `flags.0?true`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Flag {
    /// The flags field holding this bit (`flags`, `flags2`, ...).
    pub name: String,
    pub index: u32,
}
