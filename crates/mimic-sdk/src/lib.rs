//! Mimic SDK - value model and native function ABI
//!
//! This crate provides the minimal types needed to write behavior for Mimic
//! plugin modules without depending on the full engine: runtime values,
//! declared type references, and native functions with declared signatures.
//!
//! # Example
//!
//! ```ignore
//! use mimic_sdk::{NativeFunction, NativeFunctionRegistry};
//!
//! let mut natives = NativeFunctionRegistry::new();
//! natives.register(NativeFunction::from_fn2("math.add", |a: i32, b: i32| a + b));
//! ```

#![warn(missing_docs)]

pub mod convert;
pub mod error;
pub mod function;
pub mod types;
pub mod value;

pub use convert::{FromValue, ToValue, ValueType};
pub use error::{NativeError, NativeResult};
pub use function::{
    DetachedContext, NativeContext, NativeFunction, NativeFunctionRegistry, NativeHandlerFn,
};
pub use types::{is_identifier, ParseTypeError, TypeRef};
pub use value::{ObjectRef, Value};
