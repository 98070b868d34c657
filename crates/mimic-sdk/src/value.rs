//! Runtime values passed to and returned from dynamically invoked methods

use std::fmt;

use crate::types::TypeRef;

/// Opaque handle to an object owned by a plugin
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Name of the object's type
    pub type_name: String,
    /// Plugin-defined identity
    pub id: u64,
}

/// A runtime value
///
/// Values carry their own dynamic type, which the invoker compares against
/// declared parameter types during overload resolution.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent value (also the result of `void` methods)
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit signed integer
    I32(i32),
    /// 64-bit signed integer
    I64(i64),
    /// 32-bit unsigned integer
    U32(u32),
    /// 64-bit unsigned integer
    U64(u64),
    /// 32-bit float
    F32(f32),
    /// 64-bit float
    F64(f64),
    /// Text
    Str(String),
    /// Object reference
    Ref(ObjectRef),
}

impl Value {
    /// Create a text value
    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Dynamic type of this value, `None` for null
    pub fn runtime_type(&self) -> Option<TypeRef> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => TypeRef::Bool,
            Value::I32(_) => TypeRef::I32,
            Value::I64(_) => TypeRef::I64,
            Value::U32(_) => TypeRef::U32,
            Value::U64(_) => TypeRef::U64,
            Value::F32(_) => TypeRef::F32,
            Value::F64(_) => TypeRef::F64,
            Value::Str(_) => TypeRef::Str,
            Value::Ref(obj) => TypeRef::Ref(obj.type_name.clone()),
        })
    }

    /// Type name for diagnostics
    pub fn type_name(&self) -> String {
        match self.runtime_type() {
            Some(ty) => ty.to_string(),
            None => "null".to_string(),
        }
    }

    /// Check if this value can be stored in a slot of the declared type
    /// without conversion.
    ///
    /// `null` is accepted by reference and handler types, and is the only
    /// value accepted by `void`.
    pub fn is_assignable_to(&self, ty: &TypeRef) -> bool {
        match (self, ty) {
            (Value::Null, TypeRef::Void) => true,
            (Value::Null, ty) => ty.is_nullable(),
            (value, ty) => value.runtime_type().as_ref() == Some(ty),
        }
    }

    /// Convert to the declared type by lossless widening.
    ///
    /// Returns `None` if no widening exists between the two types.
    pub fn widen_to(&self, ty: &TypeRef) -> Option<Value> {
        let widened = match (self, ty) {
            (Value::I32(v), TypeRef::I64) => Value::I64(*v as i64),
            (Value::U32(v), TypeRef::U64) => Value::U64(*v as u64),
            (Value::U32(v), TypeRef::I64) => Value::I64(*v as i64),
            (Value::F32(v), TypeRef::F64) => Value::F64(*v as f64),
            (Value::I32(v), TypeRef::F64) => Value::F64(*v as f64),
            _ => return None,
        };
        Some(widened)
    }

    /// Canonical zero value of a declared type.
    ///
    /// Integers are `0`, floats `0.0`, `bool` is `false`, text is the empty
    /// string, references, handlers and `void` are null. Opaque types have no
    /// canonical default and yield `None`.
    pub fn default_for(ty: &TypeRef) -> Option<Value> {
        Some(match ty {
            TypeRef::Void => Value::Null,
            TypeRef::Bool => Value::Bool(false),
            TypeRef::I32 => Value::I32(0),
            TypeRef::I64 => Value::I64(0),
            TypeRef::U32 => Value::U32(0),
            TypeRef::U64 => Value::U64(0),
            TypeRef::F32 => Value::F32(0.0),
            TypeRef::F64 => Value::F64(0.0),
            TypeRef::Str => Value::Str(String::new()),
            TypeRef::Ref(_) | TypeRef::Handler => Value::Null,
            TypeRef::Opaque(_) => return None,
        })
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as i32
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as string slice
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}i64", v),
            Value::U32(v) => write!(f, "{}u32", v),
            Value::U64(v) => write!(f, "{}u64", v),
            Value::F32(v) => write!(f, "{:?}f32", v),
            Value::F64(v) => write!(f, "{:?}", v),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Ref(obj) => write!(f, "&{}#{}", obj.type_name, obj.id),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}
