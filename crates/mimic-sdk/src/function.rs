//! Native functions: externally defined behavior with a declared signature
//!
//! Plugin modules bind their methods to native functions, and synthesized
//! types delegate to them. A native function declares its parameter and
//! return types up front so the engine can check them at link or synthesis
//! time, before anything is called.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::convert::{FromValue, ToValue, ValueType};
use crate::error::{NativeError, NativeResult};
use crate::types::TypeRef;
use crate::value::Value;

/// Access to the receiving instance during a native call.
///
/// The engine implements this over an instance's storage. Natives only see
/// the trait and never the engine's instance type.
pub trait NativeContext {
    /// Name of the receiver's type
    fn type_name(&self) -> &str;

    /// Read a field or property of the receiver
    fn field(&self, name: &str) -> Option<&Value>;

    /// Write a field or property of the receiver
    fn set_field(&mut self, name: &str, value: Value) -> NativeResult<()>;
}

/// Context with no receiver, for calling a function outside of an instance
#[derive(Debug, Default)]
pub struct DetachedContext;

impl NativeContext for DetachedContext {
    fn type_name(&self) -> &str {
        "<detached>"
    }

    fn field(&self, _name: &str) -> Option<&Value> {
        None
    }

    fn set_field(&mut self, name: &str, _value: Value) -> NativeResult<()> {
        Err(NativeError::ArgumentError(format!(
            "no receiver to store field '{}'",
            name
        )))
    }
}

/// Native handler function type
pub type NativeHandlerFn =
    Arc<dyn Fn(&mut dyn NativeContext, &[Value]) -> NativeResult<Value> + Send + Sync>;

/// A named native function with its declared signature
#[derive(Clone)]
pub struct NativeFunction {
    name: String,
    params: Vec<TypeRef>,
    returns: TypeRef,
    handler: NativeHandlerFn,
}

impl NativeFunction {
    /// Create a native function from a raw handler.
    ///
    /// The handler receives arguments already checked against `params`.
    pub fn new(
        name: impl Into<String>,
        params: Vec<TypeRef>,
        returns: TypeRef,
        handler: impl Fn(&mut dyn NativeContext, &[Value]) -> NativeResult<Value>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            returns,
            handler: Arc::new(handler),
        }
    }

    /// Create a zero-argument function; the signature is taken from `R`.
    pub fn from_fn0<R, F>(name: impl Into<String>, f: F) -> Self
    where
        R: ToValue + ValueType,
        F: Fn() -> R + Send + Sync + 'static,
    {
        Self::new(name, Vec::new(), R::type_ref(), move |_ctx, _args| {
            Ok(f().to_value())
        })
    }

    /// Create a one-argument function; the signature is taken from `A` and `R`.
    pub fn from_fn1<A, R, F>(name: impl Into<String>, f: F) -> Self
    where
        A: FromValue + ValueType,
        R: ToValue + ValueType,
        F: Fn(A) -> R + Send + Sync + 'static,
    {
        Self::new(name, vec![A::type_ref()], R::type_ref(), move |_ctx, args| {
            let a = A::from_value(arg(args, 0)?)?;
            Ok(f(a).to_value())
        })
    }

    /// Create a two-argument function; the signature is taken from `A`, `B` and `R`.
    pub fn from_fn2<A, B, R, F>(name: impl Into<String>, f: F) -> Self
    where
        A: FromValue + ValueType,
        B: FromValue + ValueType,
        R: ToValue + ValueType,
        F: Fn(A, B) -> R + Send + Sync + 'static,
    {
        Self::new(
            name,
            vec![A::type_ref(), B::type_ref()],
            R::type_ref(),
            move |_ctx, args| {
                let a = A::from_value(arg(args, 0)?)?;
                let b = B::from_value(arg(args, 1)?)?;
                Ok(f(a, b).to_value())
            },
        )
    }

    /// Function name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared parameter types
    pub fn params(&self) -> &[TypeRef] {
        &self.params
    }

    /// Declared return type
    pub fn returns(&self) -> &TypeRef {
        &self.returns
    }

    /// Call the handler
    pub fn call(&self, ctx: &mut dyn NativeContext, args: &[Value]) -> NativeResult<Value> {
        (self.handler)(ctx, args)
    }
}

fn arg(args: &[Value], index: usize) -> NativeResult<&Value> {
    args.get(index)
        .ok_or_else(|| NativeError::ArgumentError(format!("missing argument {}", index)))
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .finish()
    }
}

/// Registry of native functions, resolved by name when a module is linked
#[derive(Debug, Clone, Default)]
pub struct NativeFunctionRegistry {
    functions: HashMap<String, NativeFunction>,
}

impl NativeFunctionRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a function under its own name, replacing any previous one
    pub fn register(&mut self, function: NativeFunction) {
        self.functions.insert(function.name.clone(), function);
    }

    /// Get a function by name (used at link time)
    pub fn get(&self, name: &str) -> Option<&NativeFunction> {
        self.functions.get(name)
    }

    /// Check if a function is registered
    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Get all registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get the number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_function_signature() {
        let add = NativeFunction::from_fn2("math.add", |a: i32, b: i32| a + b);
        assert_eq!(add.name(), "math.add");
        assert_eq!(add.params(), &[TypeRef::I32, TypeRef::I32]);
        assert_eq!(add.returns(), &TypeRef::I32);

        let result = add
            .call(&mut DetachedContext, &[Value::I32(2), Value::I32(3)])
            .unwrap();
        assert_eq!(result, Value::I32(5));
    }

    #[test]
    fn test_typed_function_bad_argument() {
        let neg = NativeFunction::from_fn1("math.neg", |a: i64| -a);
        let err = neg.call(&mut DetachedContext, &[Value::str("x")]).unwrap_err();
        assert!(matches!(err, NativeError::TypeMismatch { .. }));

        let err = neg.call(&mut DetachedContext, &[]).unwrap_err();
        assert!(matches!(err, NativeError::ArgumentError(_)));
    }

    #[test]
    fn test_raw_function_uses_context() {
        let read = NativeFunction::new("ctx.read", vec![], TypeRef::I32, |ctx, _| {
            Ok(ctx.field("count").cloned().unwrap_or(Value::I32(-1)))
        });
        assert_eq!(
            read.call(&mut DetachedContext, &[]).unwrap(),
            Value::I32(-1)
        );
    }

    #[test]
    fn test_registry() {
        let mut registry = NativeFunctionRegistry::new();
        registry.register(NativeFunction::from_fn0("greet", || "hi".to_string()));
        registry.register(NativeFunction::from_fn0("answer", || 42i32));

        assert!(registry.contains("greet"));
        assert!(!registry.contains("missing"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.names(), vec!["answer", "greet"]);
        assert_eq!(registry.get("greet").unwrap().returns(), &TypeRef::Str);
    }
}
