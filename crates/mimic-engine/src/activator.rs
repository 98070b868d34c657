//! Instance activation
//!
//! Activation default-constructs an instance of a descriptor: storage for
//! every field and property starts at its type's canonical default, then
//! the optional constructor hook runs over the fresh instance.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use mimic_sdk::{NativeContext, NativeError, NativeFunction, NativeResult, Value};
use rustc_hash::FxHashMap;

use crate::config::TextDefault;
use crate::descriptor::{MemberDescriptor, StorageInfo, TypeDescriptor};
use crate::error::{Error, Result};
use crate::invoker::Invoker;

/// Creates instances of descriptors
#[derive(Debug, Clone, Copy, Default)]
pub struct Activator {
    text_default: TextDefault,
}

impl Activator {
    /// Create an activator using `text_default` for `string` storage
    pub fn new(text_default: TextDefault) -> Self {
        Self { text_default }
    }

    /// Default-construct an instance of `ty`
    pub fn activate(&self, ty: &Arc<TypeDescriptor>) -> Result<Instance> {
        let _live = ty.check_live()?;

        let constructor = ty.constructor().ok_or_else(|| Error::Activation {
            type_name: ty.name().to_string(),
            reason: "type has no default constructor".to_string(),
            source: None,
        })?;

        let mut storage = FxHashMap::default();
        for slot in ty.fields().chain(ty.properties()) {
            let value = self
                .text_default
                .default_for(&slot.type_ref)
                .ok_or_else(|| Error::Activation {
                    type_name: ty.name().to_string(),
                    reason: format!(
                        "{} '{}' has type {} with no default value",
                        slot_kind(ty, slot),
                        slot.name,
                        slot.type_ref
                    ),
                    source: None,
                })?;
            storage.insert(slot.name.clone(), value);
        }

        let mut instance = Instance {
            descriptor: Arc::clone(ty),
            storage,
            text_default: self.text_default,
        };

        if let Some(init) = &constructor.init {
            let mut ctx = instance.context();
            call_guarded(init, &mut ctx, &[]).map_err(|e| Error::Activation {
                type_name: ty.name().to_string(),
                reason: format!("constructor hook '{}' failed", init.name()),
                source: Some(e),
            })?;
        }

        tracing::trace!(type_name = %ty.name(), "activated instance");
        Ok(instance)
    }
}

/// Default-construct `ty` with the default activator
pub fn activate(ty: &Arc<TypeDescriptor>) -> Result<Instance> {
    Activator::default().activate(ty)
}

fn slot_kind(ty: &TypeDescriptor, slot: &StorageInfo) -> &'static str {
    match ty.find_member(&slot.name) {
        Ok(MemberDescriptor::Property(_)) => "property",
        _ => "field",
    }
}

/// A live object of some descriptor, owning its field and property storage
#[derive(Debug)]
pub struct Instance {
    descriptor: Arc<TypeDescriptor>,
    storage: FxHashMap<String, Value>,
    text_default: TextDefault,
}

impl Instance {
    /// Name of the instance's type
    pub fn type_name(&self) -> &str {
        self.descriptor.name()
    }

    /// Descriptor this instance was activated from
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// Text policy the instance was activated under
    pub fn text_default(&self) -> TextDefault {
        self.text_default
    }

    /// Read a field or property
    pub fn get(&self, name: &str) -> Result<Value> {
        let _live = self.descriptor.check_live()?;
        let slot = slot_of(&self.descriptor, name)?;
        if !slot.readable {
            return Err(self.access_error(name, "member is not readable"));
        }
        Ok(self.storage.get(name).cloned().unwrap_or_default())
    }

    /// Write a field or property.
    ///
    /// The value must fit the declared type, allowing lossless widening.
    pub fn set(&mut self, name: &str, value: Value) -> Result<()> {
        let descriptor = Arc::clone(&self.descriptor);
        let _live = descriptor.check_live()?;
        let slot = slot_of(&descriptor, name)?;
        if !slot.writable {
            return Err(self.access_error(name, "member is not writable"));
        }

        let value =
            fit(value, &slot.type_ref, self.text_default).map_err(|value| Error::ArgumentMismatch {
                type_name: descriptor.name().to_string(),
                member: name.to_string(),
                expected: slot.type_ref.to_string(),
                actual: value.type_name(),
            })?;
        self.storage.insert(name.to_string(), value);
        Ok(())
    }

    /// Invoke a method with the default invoker
    pub fn invoke(&mut self, method: &str, args: &[Value]) -> Result<Value> {
        Invoker::default().invoke(self, method, args)
    }

    /// Check if the owning module is still loaded
    pub fn is_live(&self) -> bool {
        self.descriptor.check_live().is_ok()
    }

    pub(crate) fn context(&mut self) -> InstanceContext<'_> {
        InstanceContext {
            descriptor: &self.descriptor,
            storage: &mut self.storage,
            text_default: self.text_default,
        }
    }

    fn access_error(&self, name: &str, reason: &'static str) -> Error {
        access_error(&self.descriptor, name, reason)
    }
}

fn slot_of<'d>(descriptor: &'d TypeDescriptor, name: &str) -> Result<&'d StorageInfo> {
    descriptor
        .find_member(name)?
        .as_storage()
        .ok_or_else(|| access_error(descriptor, name, "member is not a field or property"))
}

fn access_error(descriptor: &TypeDescriptor, name: &str, reason: &'static str) -> Error {
    Error::MemberAccess {
        type_name: descriptor.name().to_string(),
        member: name.to_string(),
        reason,
    }
}

/// Native view of an instance during a call.
///
/// Natives belong to the type, so they may write readonly members; the
/// declared type is still enforced.
pub(crate) struct InstanceContext<'a> {
    descriptor: &'a TypeDescriptor,
    storage: &'a mut FxHashMap<String, Value>,
    text_default: TextDefault,
}

impl NativeContext for InstanceContext<'_> {
    fn type_name(&self) -> &str {
        self.descriptor.name()
    }

    fn field(&self, name: &str) -> Option<&Value> {
        self.storage.get(name)
    }

    fn set_field(&mut self, name: &str, value: Value) -> NativeResult<()> {
        let slot = self.descriptor.storage(name).ok_or_else(|| {
            NativeError::ArgumentError(format!(
                "'{}' has no field or property '{}'",
                self.descriptor.name(),
                name
            ))
        })?;
        let value = fit(value, &slot.type_ref, self.text_default).map_err(|value| {
            NativeError::TypeMismatch {
                expected: slot.type_ref.to_string(),
                got: value.type_name(),
            }
        })?;
        self.storage.insert(name.to_string(), value);
        Ok(())
    }
}

/// Accept `value` as-is or widened to `ty`, handing it back on failure
fn fit(
    value: Value,
    ty: &mimic_sdk::TypeRef,
    text_default: TextDefault,
) -> std::result::Result<Value, Value> {
    if text_default.accepts(&value, ty) {
        return Ok(value);
    }
    value.widen_to(ty).ok_or(value)
}

/// Call a native function, turning a panic into `NativeError::Panic`
pub(crate) fn call_guarded(
    function: &NativeFunction,
    ctx: &mut dyn NativeContext,
    args: &[Value],
) -> NativeResult<Value> {
    catch_unwind(AssertUnwindSafe(|| function.call(ctx, args))).unwrap_or_else(|panic| {
        let msg = if let Some(s) = panic.downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };
        Err(NativeError::Panic(msg))
    })
}
