use std::fmt;
use std::str::FromStr;

use crate::errors::ParamParseError;

/// A type expression such as `Vector<%Message>`, `!X` or `messages.Chats`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Type {
    /// Namespace components, e.g. `["updates"]` for `updates.Difference`.
    pub namespace: Vec<String>,

    pub name: String,

    /// Lowercase first letter: the value is written without a constructor id.
    pub bare: bool,

    /// `%T`: the single constructor of boxed type `T`, written bare.
    pub bare_of_boxed: bool,

    /// `!X`: a reference to a `{X:Type}` generic parameter.
    pub generic_ref: bool,

    /// The argument of `Vector<long>` and friends.
    pub generic_arg: Option<Box<Type>>,
}

impl Type {
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

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.generic_ref {
            f.write_str("!")?;
        }
        if self.bare_of_boxed {
            f.write_str("%")?;
        }
        f.write_str(&self.full_name())?;
        if let Some(arg) = &self.generic_arg {
            write!(f, "<{arg}>")?;
        }
        Ok(())
    }
}

impl FromStr for Type {
    type Err = ParamParseError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (raw, generic_ref) = match raw.strip_prefix('!') {
            Some(r) => (r, true),
            None => (raw, false),
        };
        let (raw, bare_of_boxed) = match raw.strip_prefix('%') {
            Some(r) => (r, true),
            None => (raw, false),
        };

        let (name_part, generic_arg) = match raw.split_once('<') {
            Some((name, rest)) => match rest.strip_suffix('>') {
                Some(arg) => (name, Some(Box::new(arg.parse()?))),
                None => return Err(ParamParseError::InvalidGeneric),
            },
            None => (raw, None),
        };

        let (namespace, name) = match name_part.rsplit_once('.') {
            Some((ns, n)) => (ns.split('.').map(String::from).collect::<Vec<_>>(), n),
            None => (Vec::new(), name_part),
        };
        if namespace.iter().any(|p| p.is_empty()) {
            return Err(ParamParseError::Empty);
        }

        let first = name.chars().next().ok_or(ParamParseError::Empty)?;
        Ok(Self {
            namespace,
            name: name.to_owned(),
            bare: first.is_ascii_lowercase(),
            bare_of_boxed,
            generic_ref,
            generic_arg,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_generic() {
        let ty: Type = "Vector<%Message>".parse().unwrap();
        assert_eq!(ty.name, "Vector");
        assert!(!ty.bare);
        let arg = ty.generic_arg.unwrap();
        assert!(arg.bare_of_boxed);
        assert_eq!(arg.name, "Message");
    }

    #[test]
    fn namespaced_and_generic_ref() {
        let ty: Type = "updates.ChannelDifference".parse().unwrap();
        assert_eq!(ty.full_name(), "updates.ChannelDifference");
        assert!("!X".parse::<Type>().unwrap().generic_ref);
    }

    #[test]
    fn unclosed_generic() {
        assert_eq!("Vector<long".parse::<Type>(), Err(ParamParseError::InvalidGeneric));
    }
}
