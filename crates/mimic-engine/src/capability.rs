//! Capability interfaces and structural matching
//!
//! A capability is a named set of required method signatures. A type
//! satisfies a capability iff it declares a method exactly equal to every
//! requirement; the type's own name and any extra members are irrelevant.

use std::hash::{Hash, Hasher};
use std::path::Path;

use dashmap::DashMap;
use mimic_sdk::{is_identifier, ParseTypeError, TypeRef};
use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::{DescriptorId, MethodSignature, TypeDescriptor};

/// Errors raised while declaring a capability
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// Capability name is empty
    #[error("capability name cannot be empty")]
    EmptyName,

    /// Capability name is not an identifier
    #[error("invalid capability name '{name}'")]
    InvalidName {
        /// Offending name
        name: String,
    },

    /// A requirement's method name is not an identifier
    #[error("capability '{capability}' requires a method with invalid name '{method}'")]
    InvalidMethodName {
        /// Capability name
        capability: String,
        /// Offending method name
        method: String,
    },

    /// Two requirements share name and parameter types
    #[error("capability '{capability}' requires '{signature}' more than once")]
    DuplicateRequirement {
        /// Capability name
        capability: String,
        /// Repeated requirement
        signature: String,
    },

    /// A type in a schema could not be parsed
    #[error("capability '{capability}', method '{method}': {reason}")]
    InvalidType {
        /// Capability name
        capability: String,
        /// Method with the bad type
        method: String,
        /// Parser message
        reason: String,
    },

    /// Schema document could not be read
    #[error("Failed to read capability {path}: {source}")]
    Io {
        /// Path that was attempted
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Schema document is malformed
    #[error("Failed to parse capability: {0}")]
    Parse(String),
}

/// A behavioral contract: a name plus required method signatures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityInterface {
    name: String,
    required: Vec<MethodSignature>,
    fingerprint: u64,
}

impl CapabilityInterface {
    /// Create a capability.
    ///
    /// The name and every required method name must be identifiers, so any
    /// capability that constructs can also be mocked.
    pub fn new(
        name: impl Into<String>,
        required: Vec<MethodSignature>,
    ) -> Result<Self, CapabilityError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(CapabilityError::EmptyName);
        }
        if !is_identifier(&name) {
            return Err(CapabilityError::InvalidName { name });
        }

        if let Some(sig) = required.iter().find(|sig| !is_identifier(sig.name())) {
            return Err(CapabilityError::InvalidMethodName {
                capability: name,
                method: sig.name().to_string(),
            });
        }

        for (i, sig) in required.iter().enumerate() {
            if required[..i].iter().any(|prev| prev.same_overload(sig)) {
                return Err(CapabilityError::DuplicateRequirement {
                    capability: name,
                    signature: sig.to_string(),
                });
            }
        }

        let mut hasher = FxHasher::default();
        name.hash(&mut hasher);
        required.hash(&mut hasher);
        let fingerprint = hasher.finish();

        Ok(Self {
            name,
            required,
            fingerprint,
        })
    }

    /// Start building a capability
    pub fn builder(name: impl Into<String>) -> CapabilityBuilder {
        CapabilityBuilder {
            name: name.into(),
            required: Vec::new(),
        }
    }

    /// Build from a declarative schema
    pub fn from_schema(schema: &CapabilitySchema) -> Result<Self, CapabilityError> {
        let required = schema
            .methods
            .iter()
            .map(|m| m.to_signature(&schema.name))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(schema.name.clone(), required)
    }

    /// Capability name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Required signatures in declaration order
    pub fn required(&self) -> &[MethodSignature] {
        &self.required
    }

    /// Identity of the name and requirement set, used as a cache key
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Check if any requirement has this method name
    pub fn declares_method(&self, name: &str) -> bool {
        self.required.iter().any(|s| s.name() == name)
    }

    /// Required method names, deduplicated, in declaration order
    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for sig in &self.required {
            if !names.contains(&sig.name()) {
                names.push(sig.name());
            }
        }
        names
    }
}

/// Builder for `CapabilityInterface`
#[derive(Debug)]
pub struct CapabilityBuilder {
    name: String,
    required: Vec<MethodSignature>,
}

impl CapabilityBuilder {
    /// Add a required signature
    pub fn method(mut self, signature: MethodSignature) -> Self {
        self.required.push(signature);
        self
    }

    /// Finish, validating the requirements
    pub fn build(self) -> Result<CapabilityInterface, CapabilityError> {
        CapabilityInterface::new(self.name, self.required)
    }
}

/// Declarative capability document (TOML or JSON)
///
/// ```toml
/// name = "Greeter"
///
/// [[methods]]
/// name = "greet"
/// params = ["string"]
/// returns = "string"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySchema {
    /// Capability name
    pub name: String,

    /// Required methods
    #[serde(default)]
    pub methods: Vec<SignatureSchema>,
}

/// One required method in a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureSchema {
    /// Method name
    pub name: String,

    /// Parameter types
    #[serde(default)]
    pub params: Vec<String>,

    /// Return type
    #[serde(default = "default_returns")]
    pub returns: String,
}

fn default_returns() -> String {
    "void".to_string()
}

impl SignatureSchema {
    fn to_signature(&self, capability: &str) -> Result<MethodSignature, CapabilityError> {
        let invalid = |e: ParseTypeError| CapabilityError::InvalidType {
            capability: capability.to_string(),
            method: self.name.clone(),
            reason: e.to_string(),
        };
        let params = self
            .params
            .iter()
            .map(|p| p.parse::<TypeRef>().map_err(invalid))
            .collect::<Result<Vec<_>, _>>()?;
        let returns = self.returns.parse::<TypeRef>().map_err(invalid)?;
        Ok(MethodSignature::new(&self.name, params, returns))
    }
}

impl CapabilitySchema {
    /// Parse a TOML document
    pub fn from_toml_str(source: &str) -> Result<Self, CapabilityError> {
        toml::from_str(source).map_err(|e| CapabilityError::Parse(e.to_string()))
    }

    /// Parse a JSON document
    pub fn from_json_str(source: &str) -> Result<Self, CapabilityError> {
        serde_json::from_str(source).map_err(|e| CapabilityError::Parse(e.to_string()))
    }

    /// Read a `.toml` or `.json` file
    pub fn load(path: &Path) -> Result<Self, CapabilityError> {
        let source = std::fs::read_to_string(path).map_err(|source| CapabilityError::Io {
            path: path.display().to_string(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&source),
            _ => Self::from_toml_str(&source),
        }
    }
}

/// Check if `ty` declares every method `capability` requires.
///
/// A capability with no requirements matches every type.
pub fn matches(ty: &TypeDescriptor, capability: &CapabilityInterface) -> bool {
    capability.required.iter().all(|sig| ty.has_method(sig))
}

/// Requirements of `capability` that `ty` does not declare
pub fn missing<'c>(ty: &TypeDescriptor, capability: &'c CapabilityInterface) -> Vec<&'c MethodSignature> {
    capability
        .required
        .iter()
        .filter(|sig| !ty.has_method(sig))
        .collect()
}

/// Memoizing matcher.
///
/// Descriptors and capabilities never change, so a result computed once
/// for a `(descriptor, capability)` pair holds until the entry is evicted.
/// The cache holds at most `capacity` results and starts over when full.
#[derive(Debug)]
pub struct CapabilityMatcher {
    cache: DashMap<(DescriptorId, u64), bool>,
    capacity: usize,
}

impl Default for CapabilityMatcher {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl CapabilityMatcher {
    /// Cached results kept by `new`
    pub const DEFAULT_CAPACITY: usize = 4096;

    /// Create an empty matcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty matcher holding at most `capacity` results
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cache: DashMap::new(),
            capacity: capacity.max(1),
        }
    }

    /// Cached `matches`
    pub fn matches(&self, ty: &TypeDescriptor, capability: &CapabilityInterface) -> bool {
        let key = (ty.id(), capability.fingerprint());
        if let Some(hit) = self.cache.get(&key) {
            return *hit;
        }
        let result = matches(ty, capability);
        if self.cache.len() >= self.capacity {
            tracing::debug!(capacity = self.capacity, "match cache full, clearing");
            self.cache.clear();
        }
        self.cache.insert(key, result);
        result
    }

    /// Evict every result cached for `ty`
    pub fn forget(&self, ty: &TypeDescriptor) {
        let id = ty.id();
        self.cache.retain(|(cached, _), _| *cached != id);
    }

    /// Number of cached results
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    /// Drop all cached results
    pub fn clear(&self) {
        self.cache.clear();
    }
}
