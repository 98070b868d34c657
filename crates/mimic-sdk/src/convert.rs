//! Conversion traits between `Value` and Rust types
//!
//! These mirror the declared-type system: every convertible Rust type also
//! names the `TypeRef` it maps to, so native functions can derive their
//! declared signature from their Rust signature.

use crate::error::NativeError;
use crate::types::TypeRef;
use crate::value::Value;

/// Rust types with a fixed declared type
pub trait ValueType {
    /// Declared type this Rust type maps to
    fn type_ref() -> TypeRef;
}

/// Convert from `Value` to a Rust type.
pub trait FromValue: Sized {
    /// Convert, returning an error if the dynamic type doesn't match.
    fn from_value(value: &Value) -> Result<Self, NativeError>;
}

/// Convert from a Rust type to `Value`.
pub trait ToValue {
    /// Convert to a `Value`.
    fn to_value(self) -> Value;
}

fn mismatch(expected: TypeRef, value: &Value) -> NativeError {
    NativeError::TypeMismatch {
        expected: expected.to_string(),
        got: value.type_name(),
    }
}

macro_rules! primitive_conversions {
    ($($ty:ty => $variant:ident, $type_ref:expr;)*) => {
        $(
            impl ValueType for $ty {
                fn type_ref() -> TypeRef {
                    $type_ref
                }
            }

            impl FromValue for $ty {
                fn from_value(value: &Value) -> Result<Self, NativeError> {
                    match value {
                        Value::$variant(v) => Ok(v.clone()),
                        other => Err(mismatch($type_ref, other)),
                    }
                }
            }

            impl ToValue for $ty {
                fn to_value(self) -> Value {
                    Value::$variant(self)
                }
            }
        )*
    };
}

primitive_conversions! {
    bool => Bool, TypeRef::Bool;
    i32 => I32, TypeRef::I32;
    i64 => I64, TypeRef::I64;
    u32 => U32, TypeRef::U32;
    u64 => U64, TypeRef::U64;
    f32 => F32, TypeRef::F32;
    f64 => F64, TypeRef::F64;
    String => Str, TypeRef::Str;
}

impl ValueType for () {
    fn type_ref() -> TypeRef {
        TypeRef::Void
    }
}

// Unit type (for functions that return void)
impl ToValue for () {
    fn to_value(self) -> Value {
        Value::Null
    }
}

impl ToValue for Value {
    fn to_value(self) -> Value {
        self
    }
}
