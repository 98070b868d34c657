//! Dynamic invocation by name
//!
//! Overload resolution:
//!
//! 1. Collect every method with the requested name.
//! 2. Keep those whose arity matches and whose parameters accept the
//!    arguments, either exactly (`null` counts as exact for reference and
//!    handler types, and for `string` under the null text policy) or by
//!    lossless widening when enabled.
//! 3. One survivor wins. Among several, the single all-exact survivor wins;
//!    anything else is ambiguous.

use std::sync::Arc;

use mimic_sdk::{NativeError, TypeRef, Value};

use crate::activator::{call_guarded, Instance};
use crate::config::TextDefault;
use crate::descriptor::{MethodImpl, MethodInfo, TypeDescriptor};
use crate::error::{Error, Result};

/// Invoker settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvokeOptions {
    /// Accept lossless numeric widening of arguments
    pub allow_widening: bool,
}

impl Default for InvokeOptions {
    fn default() -> Self {
        Self {
            allow_widening: true,
        }
    }
}

/// Resolves and executes methods on instances
#[derive(Debug, Clone, Copy, Default)]
pub struct Invoker {
    options: InvokeOptions,
}

impl Invoker {
    /// Create an invoker
    pub fn new(options: InvokeOptions) -> Self {
        Self { options }
    }

    /// Current options
    pub fn options(&self) -> InvokeOptions {
        self.options
    }

    /// Call `method` on `instance` with `args`
    pub fn invoke(&self, instance: &mut Instance, method: &str, args: &[Value]) -> Result<Value> {
        let descriptor = Arc::clone(instance.descriptor());
        let _live = descriptor.check_live()?;

        let text_default = instance.text_default();
        let target = self.resolve_with(&descriptor, method, args, text_default)?;
        let args = coerce(target.signature.params(), args, text_default);
        execute(&descriptor, target, instance, &args, text_default)
    }

    /// Pick the overload of `method` that `args` select
    pub fn resolve<'d>(
        &self,
        ty: &'d TypeDescriptor,
        method: &str,
        args: &[Value],
    ) -> Result<&'d MethodInfo> {
        self.resolve_with(ty, method, args, TextDefault::default())
    }

    fn resolve_with<'d>(
        &self,
        ty: &'d TypeDescriptor,
        method: &str,
        args: &[Value],
        text_default: TextDefault,
    ) -> Result<&'d MethodInfo> {
        let overloads: Vec<&MethodInfo> = ty.methods_named(method).collect();
        if overloads.is_empty() {
            return Err(Error::MethodNotFound {
                type_name: ty.name().to_string(),
                method: method.to_string(),
                available: available_methods(ty),
            });
        }

        let candidates: Vec<(&MethodInfo, bool)> = overloads
            .iter()
            .filter_map(|m| {
                self.compatibility(m.signature.params(), args, text_default)
                    .map(|exact| (*m, exact))
            })
            .collect();

        match candidates.as_slice() {
            [] => Err(Error::ArgumentMismatch {
                type_name: ty.name().to_string(),
                member: method.to_string(),
                expected: join(overloads.iter().map(|m| m.signature.to_string()), " or "),
                actual: arg_types(args),
            }),
            [(only, _)] => Ok(*only),
            several => {
                let exact: Vec<&MethodInfo> = several
                    .iter()
                    .filter(|(_, exact)| *exact)
                    .map(|(m, _)| *m)
                    .collect();
                match exact.as_slice() {
                    [only] => Ok(*only),
                    _ => Err(Error::AmbiguousMethod {
                        type_name: ty.name().to_string(),
                        method: method.to_string(),
                        args: arg_types(args),
                        candidates: join(several.iter().map(|(m, _)| m.signature.to_string()), ", "),
                    }),
                }
            }
        }
    }

    /// `Some(true)` for an exact fit, `Some(false)` for a fit that needs
    /// widening, `None` if the arguments do not fit
    fn compatibility(
        &self,
        params: &[TypeRef],
        args: &[Value],
        text_default: TextDefault,
    ) -> Option<bool> {
        if params.len() != args.len() {
            return None;
        }
        let mut exact = true;
        for (param, arg) in params.iter().zip(args) {
            if text_default.accepts(arg, param) {
                continue;
            }
            if self.options.allow_widening && arg.widen_to(param).is_some() {
                exact = false;
                continue;
            }
            return None;
        }
        Some(exact)
    }
}

/// Call `method` on `instance` with the default invoker
pub fn invoke(instance: &mut Instance, method: &str, args: &[Value]) -> Result<Value> {
    Invoker::default().invoke(instance, method, args)
}

fn execute(
    descriptor: &TypeDescriptor,
    target: &MethodInfo,
    instance: &mut Instance,
    args: &[Value],
    text_default: TextDefault,
) -> Result<Value> {
    let function = match &target.body {
        MethodImpl::Constant(value) | MethodImpl::Default(value) => return Ok(value.clone()),
        MethodImpl::Native(function) => function,
    };

    let failed = |source: NativeError| {
        tracing::debug!(
            type_name = %descriptor.name(),
            method = %target.signature,
            error = %source,
            "method failed"
        );
        Error::InvocationTarget {
            type_name: descriptor.name().to_string(),
            method: target.signature.name().to_string(),
            source,
        }
    };

    let mut ctx = instance.context();
    let value = call_guarded(function, &mut ctx, args).map_err(failed)?;

    let returns = target.signature.returns();
    if !text_default.accepts(&value, returns) {
        return Err(failed(NativeError::TypeMismatch {
            expected: returns.to_string(),
            got: value.type_name(),
        }));
    }
    Ok(value)
}

fn coerce(params: &[TypeRef], args: &[Value], text_default: TextDefault) -> Vec<Value> {
    params
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            if text_default.accepts(arg, param) {
                arg.clone()
            } else {
                arg.widen_to(param).unwrap_or_else(|| arg.clone())
            }
        })
        .collect()
}

fn available_methods(ty: &TypeDescriptor) -> String {
    let mut names: Vec<&str> = Vec::new();
    for sig in ty.methods() {
        if !names.contains(&sig.name()) {
            names.push(sig.name());
        }
    }
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}

fn arg_types(args: &[Value]) -> String {
    format!("({})", join(args.iter().map(Value::type_name), ", "))
}

fn join(items: impl Iterator<Item = String>, sep: &str) -> String {
    items.collect::<Vec<_>>().join(sep)
}
