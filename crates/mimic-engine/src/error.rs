//! Engine error taxonomy
//!
//! Every failure names the type and member involved, and signature failures
//! carry the expected and actual shapes, so a failure can be diagnosed from
//! its message alone.

use mimic_sdk::NativeError;

use crate::capability::CapabilityError;
use crate::loader::LoadError;
use crate::synth::SynthesisError;

/// Engine errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Module could not be loaded
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Type synthesis failed
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// Capability declaration is malformed
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Queried member does not exist
    #[error("member '{member}' not found on type '{type_name}'")]
    NotFound {
        /// Type that was queried
        type_name: String,
        /// Member name that was looked up
        member: String,
    },

    /// Type could not be default-constructed
    #[error("cannot activate '{type_name}': {reason}")]
    Activation {
        /// Type being activated
        type_name: String,
        /// What went wrong
        reason: String,
        /// Failure raised by the constructor hook, if any
        #[source]
        source: Option<NativeError>,
    },

    /// No method with this name exists
    #[error("method '{method}' not found on '{type_name}' (available: {available})")]
    MethodNotFound {
        /// Type (or capability) that was searched
        type_name: String,
        /// Requested method name
        method: String,
        /// Method names that do exist
        available: String,
    },

    /// More than one overload accepts the arguments equally well
    #[error("call to '{type_name}::{method}{args}' is ambiguous between {candidates}")]
    AmbiguousMethod {
        /// Receiver type
        type_name: String,
        /// Requested method name
        method: String,
        /// Argument types of the call
        args: String,
        /// Overloads that remained after filtering
        candidates: String,
    },

    /// Arguments or value do not fit the declared types
    #[error("argument mismatch for '{type_name}::{member}': expected {expected}, got {actual}")]
    ArgumentMismatch {
        /// Receiver type
        type_name: String,
        /// Method or property name
        member: String,
        /// Expected signature(s) or type
        expected: String,
        /// Actual argument types
        actual: String,
    },

    /// The method existed and failed while running
    #[error("'{type_name}::{method}' failed: {source}")]
    InvocationTarget {
        /// Receiver type
        type_name: String,
        /// Method that failed
        method: String,
        /// Original failure
        #[source]
        source: NativeError,
    },

    /// The owning module has been unloaded
    #[error("module '{module}' has been unloaded")]
    StaleModule {
        /// Module name
        module: String,
    },

    /// Field or property access not permitted
    #[error("cannot access '{type_name}::{member}': {reason}")]
    MemberAccess {
        /// Receiver type
        type_name: String,
        /// Member name
        member: String,
        /// Why access was refused
        reason: &'static str,
    },
}

impl Error {
    /// Check if this is a failure raised inside an executed method body
    pub fn is_invocation_target(&self) -> bool {
        matches!(self, Error::InvocationTarget { .. })
    }
}

/// Engine result type
pub type Result<T> = std::result::Result<T, Error>;
