//! Member descriptors
//!
//! A type's members are fields, properties, methods and events. Fields and
//! properties are backed by per-instance storage; methods are bound to an
//! executable body.

use std::fmt;

use mimic_sdk::{NativeFunction, TypeRef, Value};

use super::MethodSignature;

/// Member kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemberKind {
    /// Plain storage slot
    Field,
    /// Named accessor backed by storage
    Property,
    /// Callable method
    Method,
    /// Event with a handler type
    Event,
}

impl fmt::Display for MemberKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemberKind::Field => write!(f, "field"),
            MemberKind::Property => write!(f, "property"),
            MemberKind::Method => write!(f, "method"),
            MemberKind::Event => write!(f, "event"),
        }
    }
}

/// Field or property information
#[derive(Debug, Clone, PartialEq)]
pub struct StorageInfo {
    /// Member name
    pub name: String,
    /// Declared type
    pub type_ref: TypeRef,
    /// Readable through `Instance::get`
    pub readable: bool,
    /// Writable through `Instance::set`
    pub writable: bool,
}

impl StorageInfo {
    /// Create a readable and writable slot
    pub fn new(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_ref,
            readable: true,
            writable: true,
        }
    }

    /// Mark as readonly
    pub fn readonly(mut self) -> Self {
        self.writable = false;
        self
    }

    /// Mark as write-only
    pub fn write_only(mut self) -> Self {
        self.readable = false;
        self
    }
}

/// Executable form of a method body.
///
/// Bodies are data interpreted by the invoker; nothing is compiled to
/// machine code.
#[derive(Debug, Clone)]
pub enum MethodImpl {
    /// Always returns this value
    Constant(Value),
    /// Always returns the canonical default of the return type
    Default(Value),
    /// Forwards to a native function
    Native(NativeFunction),
}

impl MethodImpl {
    /// Short description for reports, e.g. `native math.add`
    pub fn describe(&self) -> String {
        match self {
            MethodImpl::Constant(v) => format!("constant {}", v),
            MethodImpl::Default(v) => format!("default {}", v),
            MethodImpl::Native(f) => format!("native {}", f.name()),
        }
    }
}

/// Method information
#[derive(Debug, Clone)]
pub struct MethodInfo {
    /// Method signature
    pub signature: MethodSignature,
    /// Bound body
    pub body: MethodImpl,
}

impl MethodInfo {
    /// Create a method
    pub fn new(signature: MethodSignature, body: MethodImpl) -> Self {
        Self { signature, body }
    }
}

/// Event information
#[derive(Debug, Clone, PartialEq)]
pub struct EventInfo {
    /// Event name
    pub name: String,
    /// Declared handler type
    pub handler_type: TypeRef,
}

/// Default constructor of a type
#[derive(Debug, Clone, Default)]
pub struct ConstructorInfo {
    /// Runs after storage has been default-initialized
    pub init: Option<NativeFunction>,
}

/// A member of a type
#[derive(Debug, Clone)]
pub enum MemberDescriptor {
    /// Field
    Field(StorageInfo),
    /// Property
    Property(StorageInfo),
    /// Method
    Method(MethodInfo),
    /// Event
    Event(EventInfo),
}

impl MemberDescriptor {
    /// Member name
    pub fn name(&self) -> &str {
        match self {
            MemberDescriptor::Field(f) | MemberDescriptor::Property(f) => &f.name,
            MemberDescriptor::Method(m) => m.signature.name(),
            MemberDescriptor::Event(e) => &e.name,
        }
    }

    /// Member kind
    pub fn kind(&self) -> MemberKind {
        match self {
            MemberDescriptor::Field(_) => MemberKind::Field,
            MemberDescriptor::Property(_) => MemberKind::Property,
            MemberDescriptor::Method(_) => MemberKind::Method,
            MemberDescriptor::Event(_) => MemberKind::Event,
        }
    }

    /// Declared type (the return type for methods, the handler type for events)
    pub fn declared_type(&self) -> &TypeRef {
        match self {
            MemberDescriptor::Field(f) | MemberDescriptor::Property(f) => &f.type_ref,
            MemberDescriptor::Method(m) => m.signature.returns(),
            MemberDescriptor::Event(e) => &e.handler_type,
        }
    }

    /// Storage info if this is a field or property
    pub fn as_storage(&self) -> Option<&StorageInfo> {
        match self {
            MemberDescriptor::Field(f) | MemberDescriptor::Property(f) => Some(f),
            _ => None,
        }
    }

    /// Method info if this is a method
    pub fn as_method(&self) -> Option<&MethodInfo> {
        match self {
            MemberDescriptor::Method(m) => Some(m),
            _ => None,
        }
    }
}
