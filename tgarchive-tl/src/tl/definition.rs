use std::str::FromStr;

use crate::errors::{ParamParseError, ParseError};
use crate::tl::{Category, Parameter, ParameterType, Type};
use crate::utils::tl_id;

/// One TL definition, e.g.
///
/// ```text
/// peerChannel#a2a5371e channel_id:long = Peer;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Definition {
    /// Namespace parts; empty in the global namespace.
    pub namespace: Vec<String>,
    pub name: String,
    /// Explicit `#id`, or the CRC32 of the normalised line.
    pub id: u32,
    pub params: Vec<Parameter>,
    /// The boxed type the constructor belongs to.
    pub ty: Type,
    pub category: Category,
    /// 1-based line the definition started on (0 when parsed standalone).
    pub line: usize,
}

impl Definition {
    /// `namespace.name` joined with dots.
    pub fn full_name(&self) -> String {
        let mut s = self.namespace.join(".");
        if !s.is_empty() {
            s.push('.');
        }
        s.push_str(&self.name);
        s
    }
}

impl FromStr for Definition {
    type Err = ParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim().trim_end_matches(';').trim();
        if raw.is_empty() {
            return Err(ParseError::Empty);
        }

        let (lhs, ty) = raw.split_once('=').ok_or(ParseError::MissingType)?;
        let ty = ty.trim();
        if ty.is_empty() {
            return Err(ParseError::MissingType);
        }
        // `Vector t` style result types belong to built-in declarations.
        if ty.contains(char::is_whitespace) {
            return Err(ParseError::NotImplemented);
        }
        let mut ty: Type = ty.parse().map_err(|_| ParseError::MissingType)?;

        let mut tokens = lhs.split_whitespace();
        let head = tokens.next().ok_or(ParseError::MissingName)?;
        let (full_name, explicit_id) = match head.split_once('#') {
            Some((n, id)) => (n, Some(id)),
            None => (head, None),
        };
        let (namespace, name) = match full_name.rsplit_once('.') {
            Some((ns, n)) => (ns.split('.').map(String::from).collect::<Vec<_>>(), n),
            None => (Vec::new(), full_name),
        };
        if name.is_empty() || namespace.iter().any(|p| p.is_empty()) {
            return Err(ParseError::MissingName);
        }

        let id = match explicit_id {
            Some(hex) => u32::from_str_radix(hex, 16).map_err(ParseError::InvalidId)?,
            None => tl_id(raw),
        };

        let mut generics: Vec<String> = Vec::new();
        let mut flag_fields: Vec<String> = Vec::new();
        let mut params = Vec::new();

        for token in tokens {
            let param = match token.parse::<Parameter>() {
                Ok(p) => p,
                Err(ParamParseError::TypeDef { name }) => {
                    generics.push(name);
                    continue;
                }
                Err(ParamParseError::NotImplemented) => return Err(ParseError::NotImplemented),
                Err(e) => return Err(ParseError::InvalidParam(e)),
            };

            match &param.ty {
                ParameterType::Flags => flag_fields.push(param.name.clone()),
                ParameterType::Normal { ty, flag } => {
                    let undeclared_generic = ty.generic_ref && !generics.contains(&ty.name);
                    let undeclared_flags = flag.as_ref().is_some_and(|f| !flag_fields.contains(&f.name));
                    if undeclared_generic || undeclared_flags {
                        return Err(ParseError::InvalidParam(ParamParseError::MissingDef));
                    }
                }
            }
            params.push(param);
        }

        if generics.contains(&ty.name) {
            ty.generic_ref = true;
        }

        Ok(Definition {
            namespace,
            name: name.to_owned(),
            id,
            params,
            ty,
            category: Category::Types,
            line: 0,
        })
    }
}
