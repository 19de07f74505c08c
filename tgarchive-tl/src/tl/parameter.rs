use std::fmt;
use std::str::FromStr;

use crate::errors::ParamParseError;
use crate::tl::{Flag, Type};

/// One `name:Type` token of a definition.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Parameter {
    pub name: String,
    pub ty: ParameterType,
}

/// The kind of a single parameter.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ParameterType {
    /// `name:#`, a 32-bit bitmask gating later conditional parameters.
    Flags,
    /// A regular typed parameter, optionally guarded by a flag bit.
    Normal { ty: Type, flag: Option<Flag> },
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ty {
            ParameterType::Flags => write!(f, "{}:#", self.name),
            ParameterType::Normal { ty, flag: Some(fl) } => {
                write!(f, "{}:{}.{}?{ty}", self.name, fl.name, fl.index)
            }
            ParameterType::Normal { ty, flag: None } => write!(f, "{}:{ty}", self.name),
        }
    }
}

impl FromStr for Parameter {
    type Err = ParamParseError;

    /// Parses `flags:#`, `id:long` or `photo:flags.0?InputPhoto`.
    ///
    /// A `{X:Type}` token comes back as `Err(TypeDef)` carrying the name.
    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if let Some(inner) = token.strip_prefix('{') {
            return Err(match inner.strip_suffix(":Type}") {
                Some(name) => ParamParseError::TypeDef { name: name.into() },
                None => ParamParseError::MissingDef,
            });
        }

        let (name, ty) = token.split_once(':').ok_or(ParamParseError::NotImplemented)?;
        if name.is_empty() || ty.is_empty() {
            return Err(ParamParseError::Empty);
        }
        Ok(Self { name: name.to_owned(), ty: ty.parse()? })
    }
}

impl FromStr for ParameterType {
    type Err = ParamParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "#" {
            return Ok(Self::Flags);
        }

        let Some((flag, ty)) = s.split_once('?') else {
            return Ok(Self::Normal { ty: s.parse()?, flag: None });
        };

        let (name, index) = flag.split_once('.').ok_or(ParamParseError::InvalidFlag)?;
        if name.is_empty() {
            return Err(ParamParseError::InvalidFlag);
        }
        let index: u32 = index.parse().map_err(|_| ParamParseError::InvalidFlag)?;
        if index > 31 || ty.contains('?') {
            return Err(ParamParseError::InvalidFlag);
        }

        Ok(Self::Normal {
            ty: ty.parse()?,
            flag: Some(Flag { name: name.to_owned(), index }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditional_parameter() {
        let p: Parameter = "reply_to:flags.3?MessageReplyHeader".parse().unwrap();
        match p.ty {
            ParameterType::Normal { ty, flag: Some(flag) } => {
                assert_eq!(ty.name, "MessageReplyHeader");
                assert_eq!(flag, Flag { name: "flags".into(), index: 3 });
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn generic_definition_is_signalled() {
        assert_eq!(
            "{X:Type}".parse::<Parameter>(),
            Err(ParamParseError::TypeDef { name: "X".into() })
        );
    }

    #[test]
    fn bad_flags() {
        assert_eq!("a:flags?true".parse::<Parameter>(), Err(ParamParseError::InvalidFlag));
        assert_eq!("a:flags.40?true".parse::<Parameter>(), Err(ParamParseError::InvalidFlag));
        assert_eq!("?".parse::<Parameter>(), Err(ParamParseError::NotImplemented));
    }
}
