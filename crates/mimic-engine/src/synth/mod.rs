//! Runtime type synthesis
//!
//! Method bodies are data: each `MethodBody` compiles to a `MethodImpl`
//! that the invoker interprets. A synthesized descriptor keeps its spec as
//! its origin and is indistinguishable from a loaded one at invocation time.

mod spec;

use std::sync::Arc;

use thiserror::Error;

use crate::config::TextDefault;
use crate::descriptor::{DescriptorError, MemberKind, MethodImpl, Origin, TypeDescriptor};

pub use spec::{MethodBody, SynthesisSpec};

/// Errors raised while synthesizing a type
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SynthesisError {
    /// Type name is empty or not an identifier
    #[error("invalid type name '{name}'")]
    InvalidTypeName {
        /// Offending name
        name: String,
    },

    /// A property or method has an empty name
    #[error("type '{type_name}' declares a member with an empty name")]
    InvalidMemberName {
        /// Type being synthesized
        type_name: String,
    },

    /// Property declared twice
    #[error("type '{type_name}' declares property '{property}' more than once")]
    DuplicateProperty {
        /// Type being synthesized
        type_name: String,
        /// Property name
        property: String,
    },

    /// Property and method share a name
    #[error("type '{type_name}' uses '{member}' as both a property and a method")]
    NameCollision {
        /// Type being synthesized
        type_name: String,
        /// Colliding name
        member: String,
    },

    /// Two methods share name and parameter types
    #[error("type '{type_name}' declares '{signature}' more than once")]
    DuplicateMethod {
        /// Type being synthesized
        type_name: String,
        /// Repeated signature
        signature: String,
    },

    /// Constant does not fit the declared return type
    #[error("'{type_name}::{signature}' cannot return a constant of type {actual}")]
    ConstantTypeMismatch {
        /// Type being synthesized
        type_name: String,
        /// Method signature
        signature: String,
        /// Type of the constant
        actual: String,
    },

    /// Declared type has no canonical default
    #[error("'{type_name}::{member}' has type {type_ref}, which has no default value")]
    NoDefault {
        /// Type being synthesized
        type_name: String,
        /// Method or property needing a default
        member: String,
        /// Type without a default
        type_ref: String,
    },

    /// Delegate's signature differs from the method's
    #[error("'{type_name}::{signature}' cannot delegate to '{function}' with signature {found}")]
    DelegateSignatureMismatch {
        /// Type being synthesized
        type_name: String,
        /// Method signature
        signature: String,
        /// Delegate name
        function: String,
        /// Delegate's signature
        found: String,
    },

    /// Mock override names no requirement of the capability
    #[error("mock '{type_name}' overrides '{method}', which the capability does not require")]
    UnknownOverride {
        /// Mock type name
        type_name: String,
        /// Overridden method name
        method: String,
    },
}

impl SynthesisError {
    fn from_descriptor(type_name: &str, err: DescriptorError) -> Self {
        match err {
            DescriptorError::EmptyTypeName => SynthesisError::InvalidTypeName {
                name: type_name.to_string(),
            },
            DescriptorError::EmptyMemberName { type_name } => {
                SynthesisError::InvalidMemberName { type_name }
            }
            DescriptorError::DuplicateMember {
                type_name,
                member,
                first: MemberKind::Property,
                second: MemberKind::Property,
            } => SynthesisError::DuplicateProperty {
                type_name,
                property: member,
            },
            DescriptorError::DuplicateMember {
                type_name, member, ..
            } => SynthesisError::NameCollision { type_name, member },
            DescriptorError::DuplicateMethod {
                type_name,
                signature,
            } => SynthesisError::DuplicateMethod {
                type_name,
                signature,
            },
            DescriptorError::ConstantTypeMismatch {
                type_name,
                signature,
                actual,
            } => SynthesisError::ConstantTypeMismatch {
                type_name,
                signature,
                actual,
            },
            DescriptorError::NativeSignatureMismatch {
                type_name,
                signature,
                function,
                found,
            } => SynthesisError::DelegateSignatureMismatch {
                type_name,
                signature,
                function,
                found,
            },
        }
    }
}

/// Builds descriptors from synthesis specs
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeSynthesizer {
    text_default: TextDefault,
}

impl TypeSynthesizer {
    /// Create a synthesizer using `text_default` for `string` defaults
    pub fn new(text_default: TextDefault) -> Self {
        Self { text_default }
    }

    /// Build a new type from `spec`.
    ///
    /// Every call yields a descriptor with a fresh identity, even for equal
    /// specs.
    pub fn synthesize(&self, spec: SynthesisSpec) -> Result<Arc<TypeDescriptor>, SynthesisError> {
        let type_name = spec.type_name();
        if !mimic_sdk::is_identifier(type_name) {
            return Err(SynthesisError::InvalidTypeName {
                name: type_name.to_string(),
            });
        }

        let mut builder = TypeDescriptor::builder(type_name);
        for (name, type_ref) in spec.properties() {
            if self.text_default.default_for(type_ref).is_none() {
                return Err(SynthesisError::NoDefault {
                    type_name: type_name.to_string(),
                    member: name.clone(),
                    type_ref: type_ref.to_string(),
                });
            }
            builder = builder.property(name.clone(), type_ref.clone());
        }

        for (signature, body) in spec.methods() {
            let body = match body {
                MethodBody::ConstantReturn(value) => MethodImpl::Constant(value.clone()),
                MethodBody::DefaultForType => {
                    let value = self.text_default.default_for(signature.returns()).ok_or_else(|| {
                        SynthesisError::NoDefault {
                            type_name: type_name.to_string(),
                            member: signature.to_string(),
                            type_ref: signature.returns().to_string(),
                        }
                    })?;
                    MethodImpl::Default(value)
                }
                MethodBody::DelegateTo(function) => MethodImpl::Native(function.clone()),
            };
            builder = builder.method(signature.clone(), body);
        }

        let name = type_name.to_string();
        let descriptor = builder
            .build(Origin::Synthesized(Arc::new(spec)))
            .map_err(|e| SynthesisError::from_descriptor(&name, e))?;

        tracing::debug!(
            type_name = %name,
            id = descriptor.id().as_u64(),
            members = descriptor.members().len(),
            "synthesized type"
        );
        Ok(Arc::new(descriptor))
    }
}

/// Synthesize with the default policy
pub fn synthesize(spec: SynthesisSpec) -> Result<Arc<TypeDescriptor>, SynthesisError> {
    TypeSynthesizer::default().synthesize(spec)
}
