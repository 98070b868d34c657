//! Module manifest format
//!
//! ```toml
//! [module]
//! name = "greeters"
//! version = "0.1.0"
//!
//! [[types]]
//! name = "EnglishGreeter"
//! init = "greeters.init"
//!
//! [[types.properties]]
//! name = "greeting"
//! type = "string"
//!
//! [[types.methods]]
//! name = "greet"
//! params = ["string"]
//! returns = "string"
//! native = "greeters.english"
//! ```

use mimic_sdk::{TypeRef, Value};
use serde::{Deserialize, Serialize};

/// Root of a module manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Module metadata
    pub module: ModuleInfo,

    /// Types in declaration order
    #[serde(default)]
    pub types: Vec<TypeManifest>,
}

/// `[module]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleInfo {
    /// Module name
    pub name: String,

    /// Module version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// `[[types]]` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeManifest {
    /// Type name
    pub name: String,

    /// Whether the type can be default-constructed
    #[serde(default = "default_true")]
    pub default_constructor: bool,

    /// Native function run after default initialization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<String>,

    /// Fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<StorageManifest>,

    /// Properties
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub properties: Vec<StorageManifest>,

    /// Events
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventManifest>,

    /// Methods
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<MethodManifest>,
}

/// Field or property entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageManifest {
    /// Member name
    pub name: String,

    /// Declared type, in `TypeRef` syntax
    #[serde(rename = "type")]
    pub type_name: String,

    /// Readable through `Instance::get`
    #[serde(default = "default_true")]
    pub readable: bool,

    /// Writable through `Instance::set`
    #[serde(default = "default_true")]
    pub writable: bool,
}

/// Event entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventManifest {
    /// Event name
    pub name: String,

    /// Handler type
    #[serde(default = "default_handler")]
    pub handler: String,
}

/// Method entry; exactly one of `native`, `constant` or `default` is set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodManifest {
    /// Method name
    pub name: String,

    /// Parameter types
    #[serde(default)]
    pub params: Vec<String>,

    /// Return type
    #[serde(default = "default_returns")]
    pub returns: String,

    /// Registered native function to forward to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native: Option<String>,

    /// Constant to return
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<Literal>,

    /// Return the default of the return type
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,
}

/// Constant literal as written in a manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    /// `true` / `false`
    Bool(bool),
    /// Integer literal
    Int(i64),
    /// Float literal
    Float(f64),
    /// String literal
    Str(String),
}

impl Literal {
    /// Convert to a value of the declared type.
    ///
    /// Integers fit any numeric type that can hold them exactly; floats fit
    /// either float type.
    pub fn to_value(&self, ty: &TypeRef) -> Option<Value> {
        match (self, ty) {
            (Literal::Bool(b), TypeRef::Bool) => Some(Value::Bool(*b)),
            (Literal::Int(i), TypeRef::I32) => i32::try_from(*i).ok().map(Value::I32),
            (Literal::Int(i), TypeRef::I64) => Some(Value::I64(*i)),
            (Literal::Int(i), TypeRef::U32) => u32::try_from(*i).ok().map(Value::U32),
            (Literal::Int(i), TypeRef::U64) => u64::try_from(*i).ok().map(Value::U64),
            (Literal::Int(i), TypeRef::F32) => exact_f32(*i).map(Value::F32),
            (Literal::Int(i), TypeRef::F64) => exact_f64(*i).map(Value::F64),
            (Literal::Float(f), TypeRef::F32) => Some(Value::F32(*f as f32)),
            (Literal::Float(f), TypeRef::F64) => Some(Value::F64(*f)),
            (Literal::Str(s), TypeRef::Str) => Some(Value::Str(s.clone())),
            _ => None,
        }
    }
}

/// 2^63, the first float past `i64::MAX`
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

fn exact_f32(i: i64) -> Option<f32> {
    let f = i as f32;
    (f64::from(f) < I64_LIMIT && f as i64 == i).then_some(f)
}

fn exact_f64(i: i64) -> Option<f64> {
    let f = i as f64;
    (f < I64_LIMIT && f as i64 == i).then_some(f)
}

fn default_true() -> bool {
    true
}

fn default_handler() -> String {
    "fn".to_string()
}

fn default_returns() -> String {
    "void".to_string()
}
