//! Type descriptor model
//!
//! A `TypeDescriptor` is the immutable shape of a type: its members, their
//! signatures, and the bodies bound to its methods. Descriptors are produced
//! either by a module loader or by the type synthesizer and are shared via
//! `Arc` from then on.
//!
//! Member names are unique per descriptor with one exception: methods may be
//! overloaded, in which case `(name, parameter types)` is unique instead.
//! A field, property or event never shares its name with any other member.

mod member;
mod signature;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use mimic_sdk::{NativeFunction, TypeRef, Value};
use rustc_hash::FxHashMap;

use crate::error::{Error, Result};
use crate::loader::{LeaseGuard, ModuleLease};
use crate::synth::SynthesisSpec;

pub use member::{
    ConstructorInfo, EventInfo, MemberDescriptor, MemberKind, MethodImpl, MethodInfo, StorageInfo,
};
pub(crate) use signature::format_types;
pub use signature::{MethodSignature, ParseSignatureError};

/// Global counter for descriptor IDs
static NEXT_DESCRIPTOR_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of a descriptor within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(u64);

impl DescriptorId {
    fn next() -> Self {
        DescriptorId(NEXT_DESCRIPTOR_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Where a descriptor came from
#[derive(Debug, Clone)]
pub enum Origin {
    /// Loaded from a module; valid only while the module is loaded
    Loaded(ModuleLease),
    /// Built by the type synthesizer from this spec
    Synthesized(Arc<SynthesisSpec>),
}

/// Errors raised while assembling a descriptor
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DescriptorError {
    /// Type name is empty
    #[error("type name cannot be empty")]
    EmptyTypeName,

    /// A member has an empty name
    #[error("type '{type_name}' declares a member with an empty name")]
    EmptyMemberName {
        /// Type being built
        type_name: String,
    },

    /// Two members share a name
    #[error("type '{type_name}' declares '{member}' as both {first} and {second}")]
    DuplicateMember {
        /// Type being built
        type_name: String,
        /// Colliding name
        member: String,
        /// Kind of the first declaration
        first: MemberKind,
        /// Kind of the second declaration
        second: MemberKind,
    },

    /// Two methods share name and parameter types
    #[error("type '{type_name}' declares '{signature}' more than once")]
    DuplicateMethod {
        /// Type being built
        type_name: String,
        /// Second declaration
        signature: String,
    },

    /// Constant body does not fit the declared return type
    #[error("'{type_name}::{signature}' returns a constant of type {actual}")]
    ConstantTypeMismatch {
        /// Type being built
        type_name: String,
        /// Method signature
        signature: String,
        /// Type of the constant
        actual: String,
    },

    /// Native body has a different signature than the method
    #[error("'{type_name}::{signature}' is bound to native '{function}' with signature {found}")]
    NativeSignatureMismatch {
        /// Type being built
        type_name: String,
        /// Method signature
        signature: String,
        /// Native function name
        function: String,
        /// Native function's declared signature
        found: String,
    },
}

/// Immutable description of a type
#[derive(Debug)]
pub struct TypeDescriptor {
    id: DescriptorId,
    name: String,
    members: Vec<MemberDescriptor>,
    /// Member name to indices into `members` (several for overloads)
    index: FxHashMap<String, Vec<usize>>,
    constructor: Option<ConstructorInfo>,
    origin: Origin,
}

impl TypeDescriptor {
    /// Start building a descriptor
    pub fn builder(name: impl Into<String>) -> TypeDescriptorBuilder {
        TypeDescriptorBuilder::new(name)
    }

    /// Unique identity
    pub fn id(&self) -> DescriptorId {
        self.id
    }

    /// Type name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All members in declaration order
    pub fn members(&self) -> &[MemberDescriptor] {
        &self.members
    }

    /// Find a member by name.
    ///
    /// For an overloaded method this returns the first declared overload.
    pub fn find_member(&self, name: &str) -> Result<&MemberDescriptor> {
        self.index
            .get(name)
            .and_then(|indices| indices.first())
            .map(|&i| &self.members[i])
            .ok_or_else(|| Error::NotFound {
                type_name: self.name.clone(),
                member: name.to_string(),
            })
    }

    /// All method signatures in declaration order
    pub fn methods(&self) -> impl Iterator<Item = &MethodSignature> {
        self.method_infos().map(|m| &m.signature)
    }

    /// All methods in declaration order
    pub fn method_infos(&self) -> impl Iterator<Item = &MethodInfo> {
        self.members.iter().filter_map(MemberDescriptor::as_method)
    }

    /// Overloads of a method name in declaration order
    pub fn methods_named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a MethodInfo> {
        self.index
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(move |&i| self.members[i].as_method())
    }

    /// Check for a method with exactly this signature
    pub fn has_method(&self, signature: &MethodSignature) -> bool {
        self.methods_named(signature.name())
            .any(|m| &m.signature == signature)
    }

    /// Fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &StorageInfo> {
        self.members.iter().filter_map(|m| match m {
            MemberDescriptor::Field(f) => Some(f),
            _ => None,
        })
    }

    /// Properties in declaration order
    pub fn properties(&self) -> impl Iterator<Item = &StorageInfo> {
        self.members.iter().filter_map(|m| match m {
            MemberDescriptor::Property(p) => Some(p),
            _ => None,
        })
    }

    /// Events in declaration order
    pub fn events(&self) -> impl Iterator<Item = &EventInfo> {
        self.members.iter().filter_map(|m| match m {
            MemberDescriptor::Event(e) => Some(e),
            _ => None,
        })
    }

    /// Storage info for a field or property
    pub fn storage(&self, name: &str) -> Option<&StorageInfo> {
        self.find_member(name).ok().and_then(MemberDescriptor::as_storage)
    }

    /// Default constructor, if the type declares one
    pub fn constructor(&self) -> Option<&ConstructorInfo> {
        self.constructor.as_ref()
    }

    /// Where this descriptor came from
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Check if the type was synthesized rather than loaded
    pub fn is_synthesized(&self) -> bool {
        matches!(self.origin, Origin::Synthesized(_))
    }

    /// Spec this type was synthesized from
    pub fn synthesis_spec(&self) -> Option<&SynthesisSpec> {
        match &self.origin {
            Origin::Synthesized(spec) => Some(&**spec),
            Origin::Loaded(_) => None,
        }
    }

    /// Name of the owning module, if loaded
    pub fn module_name(&self) -> Option<&str> {
        match &self.origin {
            Origin::Loaded(lease) => Some(lease.module_name()),
            Origin::Synthesized(_) => None,
        }
    }

    /// Fail with `StaleModule` if the owning module was unloaded.
    ///
    /// The returned guard keeps the module loaded until dropped; synthesized
    /// types have nothing to guard.
    pub fn check_live(&self) -> Result<Option<LeaseGuard<'_>>> {
        match &self.origin {
            Origin::Loaded(lease) => lease.acquire().map(Some),
            Origin::Synthesized(_) => Ok(None),
        }
    }
}

/// Builder for type descriptors
#[derive(Debug)]
pub struct TypeDescriptorBuilder {
    name: String,
    members: Vec<MemberDescriptor>,
    constructor: Option<ConstructorInfo>,
}

impl TypeDescriptorBuilder {
    /// Create a builder with a default constructor and no members
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            constructor: Some(ConstructorInfo::default()),
        }
    }

    /// Type name being built
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add any member
    pub fn member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(member);
        self
    }

    /// Add a readable and writable field
    pub fn field(self, name: impl Into<String>, type_ref: TypeRef) -> Self {
        self.member(MemberDescriptor::Field(StorageInfo::new(name, type_ref)))
    }

    /// Add a readable and writable property
    pub fn property(self, name: impl Into<String>, type_ref: TypeRef) -> Self {
        self.member(MemberDescriptor::Property(StorageInfo::new(name, type_ref)))
    }

    /// Add an event
    pub fn event(self, name: impl Into<String>, handler_type: TypeRef) -> Self {
        self.member(MemberDescriptor::Event(EventInfo {
            name: name.into(),
            handler_type,
        }))
    }

    /// Add a method with an explicit body
    pub fn method(self, signature: MethodSignature, body: MethodImpl) -> Self {
        self.member(MemberDescriptor::Method(MethodInfo::new(signature, body)))
    }

    /// Add a method forwarding to a native function; the signature is the
    /// function's
    pub fn native_method(self, name: impl Into<String>, function: NativeFunction) -> Self {
        let signature = MethodSignature::new(
            name,
            function.params().to_vec(),
            function.returns().clone(),
        );
        self.method(signature, MethodImpl::Native(function))
    }

    /// Add a method returning a constant
    pub fn constant_method(self, signature: MethodSignature, value: Value) -> Self {
        self.method(signature, MethodImpl::Constant(value))
    }

    /// Declare that the type has no default constructor
    pub fn without_constructor(mut self) -> Self {
        self.constructor = None;
        self
    }

    /// Run a native function after default initialization
    pub fn init(mut self, function: NativeFunction) -> Self {
        self.constructor = Some(ConstructorInfo {
            init: Some(function),
        });
        self
    }

    /// Validate and build the descriptor
    pub(crate) fn build(self, origin: Origin) -> std::result::Result<TypeDescriptor, DescriptorError> {
        if self.name.trim().is_empty() {
            return Err(DescriptorError::EmptyTypeName);
        }

        let mut index: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        for (i, member) in self.members.iter().enumerate() {
            let name = member.name();
            if name.trim().is_empty() {
                return Err(DescriptorError::EmptyMemberName {
                    type_name: self.name.clone(),
                });
            }

            if let Some(existing) = index.get(name) {
                let first = &self.members[existing[0]];
                match (first, member) {
                    (MemberDescriptor::Method(_), MemberDescriptor::Method(method)) => {
                        let clash = existing.iter().any(|&j| {
                            self.members[j]
                                .as_method()
                                .is_some_and(|m| m.signature.same_overload(&method.signature))
                        });
                        if clash {
                            return Err(DescriptorError::DuplicateMethod {
                                type_name: self.name.clone(),
                                signature: method.signature.to_string(),
                            });
                        }
                    }
                    _ => {
                        return Err(DescriptorError::DuplicateMember {
                            type_name: self.name.clone(),
                            member: name.to_string(),
                            first: first.kind(),
                            second: member.kind(),
                        });
                    }
                }
            }

            if let MemberDescriptor::Method(method) = member {
                check_body(&self.name, method)?;
            }

            index.entry(name.to_string()).or_default().push(i);
        }

        Ok(TypeDescriptor {
            id: DescriptorId::next(),
            name: self.name,
            members: self.members,
            index,
            constructor: self.constructor,
            origin,
        })
    }
}

fn check_body(type_name: &str, method: &MethodInfo) -> std::result::Result<(), DescriptorError> {
    let signature = &method.signature;
    match &method.body {
        MethodImpl::Constant(value) if !value.is_assignable_to(signature.returns()) => {
            Err(DescriptorError::ConstantTypeMismatch {
                type_name: type_name.to_string(),
                signature: signature.to_string(),
                actual: value.type_name(),
            })
        }
        MethodImpl::Native(function) if !signature.accepts_function(function) => {
            Err(DescriptorError::NativeSignatureMismatch {
                type_name: type_name.to_string(),
                signature: signature.to_string(),
                function: function.name().to_string(),
                found: format!(
                    "{} -> {}",
                    format_types(function.params()),
                    function.returns()
                ),
            })
        }
        _ => Ok(()),
    }
}
