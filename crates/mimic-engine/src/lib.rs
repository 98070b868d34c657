//! Mimic Engine
//!
//! Runtime capability discovery and type synthesis:
//! - **Loader**: modules of type descriptors sharing a liveness lease (`loader` module)
//! - **Discovery**: structural capability matching and plugin activation (`capability`, `registry`)
//! - **Invocation**: overload resolution and execution by name (`invoker`)
//! - **Synthesis**: new types and mocks built at runtime (`synth`, `mock`)
//!
//! # Example
//!
//! ```rust,ignore
//! use mimic_engine::{generate_mock, CapabilityInterface, Value};
//!
//! let greeter = CapabilityInterface::builder("Greeter")
//!     .method("greet(string) -> string".parse()?)
//!     .build()?;
//!
//! let mock = generate_mock(&greeter)?;
//! let mut instance = mimic_engine::activate(&mock)?;
//! assert_eq!(instance.invoke("greet", &[Value::str("bob")])?, Value::str(""));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// ============================================================================
// Type model
// ============================================================================

/// Type descriptors, members and method signatures
pub mod descriptor;

/// Module loading and liveness
pub mod loader;

// ============================================================================
// Discovery and invocation
// ============================================================================

pub mod activator;
pub mod capability;
pub mod invoker;
pub mod registry;

// ============================================================================
// Synthesis
// ============================================================================

/// Runtime type synthesis
pub mod synth;

pub mod mock;

// ============================================================================
// Support
// ============================================================================

pub mod config;
pub mod error;
pub mod inspect;

pub use activator::{activate, Activator, Instance};
pub use capability::{
    matches, missing, CapabilityBuilder, CapabilityError, CapabilityInterface, CapabilityMatcher,
    CapabilitySchema, SignatureSchema,
};
pub use config::{ConfigError, EngineConfig, TextDefault};
pub use descriptor::{
    DescriptorError, DescriptorId, MemberDescriptor, MemberKind, MethodImpl, MethodInfo,
    MethodSignature, Origin, TypeDescriptor, TypeDescriptorBuilder,
};
pub use error::{Error, Result};
pub use inspect::InspectionReport;
pub use invoker::{invoke, InvokeOptions, Invoker};
pub use loader::{
    LoadError, LoadedModule, ManifestFormat, ManifestLoader, ModuleBuilder, ModuleLoader,
};
pub use mock::{generate_mock, MockBuilder};
pub use registry::{
    ActivationFailure, Discovery, DiscoveryReport, PluginOutcome, PluginRegistry, RunReport,
};
pub use synth::{synthesize, MethodBody, SynthesisError, SynthesisSpec, TypeSynthesizer};

pub use mimic_sdk::{NativeError, NativeFunction, NativeFunctionRegistry, TypeRef, Value};
