//! Declared type references
//!
//! A `TypeRef` is the declared type of a parameter, return value, field,
//! property or event handler. It has a compact textual form used by module
//! manifests and capability schemas:
//!
//! ```text
//! void  bool  i32  i64  u32  u64  f32  f64  string  fn  &Name  Name
//! ```
//!
//! `&Name` is a nullable reference to an object of type `Name`. Any other bare
//! name is an opaque value type: the engine can pass it around but has no
//! canonical zero value for it.

use std::fmt;
use std::str::FromStr;

/// Declared type of a member, parameter or return value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// No value
    Void,
    /// Boolean
    Bool,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 32-bit unsigned integer
    U32,
    /// 64-bit unsigned integer
    U64,
    /// 32-bit float
    F32,
    /// 64-bit float
    F64,
    /// Text
    Str,
    /// Nullable reference to an object of the named type
    Ref(String),
    /// Nullable callable handler (event handlers, callbacks)
    Handler,
    /// Value type without a known zero value
    Opaque(String),
}

/// Error returned when a type reference cannot be parsed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid type reference '{0}'")]
pub struct ParseTypeError(pub String);

impl TypeRef {
    /// Create a reference type
    pub fn reference(name: impl Into<String>) -> Self {
        TypeRef::Ref(name.into())
    }

    /// Create an opaque value type
    pub fn opaque(name: impl Into<String>) -> Self {
        TypeRef::Opaque(name.into())
    }

    /// Check if this is one of the integer types
    pub fn is_integer(&self) -> bool {
        matches!(self, TypeRef::I32 | TypeRef::I64 | TypeRef::U32 | TypeRef::U64)
    }

    /// Check if this is one of the floating point types
    pub fn is_float(&self) -> bool {
        matches!(self, TypeRef::F32 | TypeRef::F64)
    }

    /// Check if `null` is a legal value of this type
    pub fn is_nullable(&self) -> bool {
        matches!(self, TypeRef::Ref(_) | TypeRef::Handler)
    }

    /// Check if a value of type `self` can be widened to `target` without loss
    pub fn widens_to(&self, target: &TypeRef) -> bool {
        matches!(
            (self, target),
            (TypeRef::I32, TypeRef::I64)
                | (TypeRef::U32, TypeRef::U64)
                | (TypeRef::U32, TypeRef::I64)
                | (TypeRef::F32, TypeRef::F64)
                | (TypeRef::I32, TypeRef::F64)
        )
    }
}

/// Check if `s` is a legal type or member name: a letter or `_`, then
/// letters, digits, `_`, `.` or `:`
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.' || c == ':')
}

impl FromStr for TypeRef {
    type Err = ParseTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let parsed = match trimmed {
            "void" | "()" => TypeRef::Void,
            "bool" | "boolean" => TypeRef::Bool,
            "i32" | "int" => TypeRef::I32,
            "i64" | "long" => TypeRef::I64,
            "u32" => TypeRef::U32,
            "u64" => TypeRef::U64,
            "f32" | "float" => TypeRef::F32,
            "f64" | "double" => TypeRef::F64,
            "string" | "str" | "text" => TypeRef::Str,
            "fn" | "handler" => TypeRef::Handler,
            _ => {
                if let Some(name) = trimmed.strip_prefix('&') {
                    let name = name.trim();
                    if !is_identifier(name) {
                        return Err(ParseTypeError(s.to_string()));
                    }
                    TypeRef::Ref(name.to_string())
                } else if is_identifier(trimmed) {
                    TypeRef::Opaque(trimmed.to_string())
                } else {
                    return Err(ParseTypeError(s.to_string()));
                }
            }
        };
        Ok(parsed)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Void => write!(f, "void"),
            TypeRef::Bool => write!(f, "bool"),
            TypeRef::I32 => write!(f, "i32"),
            TypeRef::I64 => write!(f, "i64"),
            TypeRef::U32 => write!(f, "u32"),
            TypeRef::U64 => write!(f, "u64"),
            TypeRef::F32 => write!(f, "f32"),
            TypeRef::F64 => write!(f, "f64"),
            TypeRef::Str => write!(f, "string"),
            TypeRef::Ref(name) => write!(f, "&{}", name),
            TypeRef::Handler => write!(f, "fn"),
            TypeRef::Opaque(name) => write!(f, "{}", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_primitives() {
        assert_eq!("i32".parse::<TypeRef>().unwrap(), TypeRef::I32);
        assert_eq!("int".parse::<TypeRef>().unwrap(), TypeRef::I32);
        assert_eq!("string".parse::<TypeRef>().unwrap(), TypeRef::Str);
        assert_eq!(" void ".parse::<TypeRef>().unwrap(), TypeRef::Void);
        assert_eq!("fn".parse::<TypeRef>().unwrap(), TypeRef::Handler);
    }

    #[test]
    fn test_parse_reference_and_opaque() {
        assert_eq!(
            "&Logger".parse::<TypeRef>().unwrap(),
            TypeRef::Ref("Logger".to_string())
        );
        assert_eq!(
            "Decimal".parse::<TypeRef>().unwrap(),
            TypeRef::Opaque("Decimal".to_string())
        );
    }

    #[test]
    fn test_parse_invalid() {
        assert!("".parse::<TypeRef>().is_err());
        assert!("&".parse::<TypeRef>().is_err());
        assert!("1abc".parse::<TypeRef>().is_err());
        assert!("a b".parse::<TypeRef>().is_err());
    }

    #[test]
    fn test_display_parses_back() {
        for ty in [
            TypeRef::Void,
            TypeRef::U64,
            TypeRef::Str,
            TypeRef::reference("Sink"),
            TypeRef::opaque("Money"),
        ] {
            assert_eq!(ty.to_string().parse::<TypeRef>().unwrap(), ty);
        }
    }

    #[test]
    fn test_widening() {
        assert!(TypeRef::I32.widens_to(&TypeRef::I64));
        assert!(TypeRef::F32.widens_to(&TypeRef::F64));
        assert!(!TypeRef::I64.widens_to(&TypeRef::I32));
        assert!(!TypeRef::I32.widens_to(&TypeRef::I32));
        assert!(!TypeRef::F64.widens_to(&TypeRef::I64));
    }

    #[test]
    fn test_nullable() {
        assert!(TypeRef::reference("X").is_nullable());
        assert!(TypeRef::Handler.is_nullable());
        assert!(!TypeRef::Str.is_nullable());
        assert!(!TypeRef::opaque("Money").is_nullable());
    }
}
