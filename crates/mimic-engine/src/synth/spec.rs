//! Synthesis input

use mimic_sdk::{NativeFunction, TypeRef, Value};

use crate::descriptor::MethodSignature;

/// Body to generate for a synthesized method
#[derive(Debug, Clone)]
pub enum MethodBody {
    /// Return this value on every call
    ConstantReturn(Value),
    /// Return the canonical default of the return type
    DefaultForType,
    /// Forward to a native function with the same signature
    DelegateTo(NativeFunction),
}

/// Description of a type to synthesize
#[derive(Debug, Clone)]
pub struct SynthesisSpec {
    type_name: String,
    properties: Vec<(String, TypeRef)>,
    methods: Vec<(MethodSignature, MethodBody)>,
}

impl SynthesisSpec {
    /// Start a spec for `type_name`
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            properties: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Add a readable and writable property
    pub fn property(mut self, name: impl Into<String>, type_ref: TypeRef) -> Self {
        self.properties.push((name.into(), type_ref));
        self
    }

    /// Add a method
    pub fn method(mut self, signature: MethodSignature, body: MethodBody) -> Self {
        self.methods.push((signature, body));
        self
    }

    /// Target type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Properties in declaration order
    pub fn properties(&self) -> &[(String, TypeRef)] {
        &self.properties
    }

    /// Methods in declaration order
    pub fn methods(&self) -> &[(MethodSignature, MethodBody)] {
        &self.methods
    }
}
