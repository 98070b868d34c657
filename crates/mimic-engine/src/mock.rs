//! Mock generation
//!
//! A mock of a capability is a synthesized type declaring every required
//! method with a `DefaultForType` body, so it satisfies the capability by
//! construction.

use std::sync::Arc;

use mimic_sdk::Value;

use crate::capability::CapabilityInterface;
use crate::descriptor::TypeDescriptor;
use crate::synth::{MethodBody, SynthesisError, SynthesisSpec, TypeSynthesizer};

/// Synthesize `<Capability>Mock` returning defaults from every requirement.
///
/// Fails only if a required return type has no default value.
pub fn generate_mock(capability: &CapabilityInterface) -> Result<Arc<TypeDescriptor>, SynthesisError> {
    MockBuilder::new(capability).build()
}

/// Mock with selected requirements overridden
#[derive(Debug)]
pub struct MockBuilder<'c> {
    capability: &'c CapabilityInterface,
    name: Option<String>,
    overrides: Vec<(String, Value)>,
    synthesizer: TypeSynthesizer,
}

impl<'c> MockBuilder<'c> {
    /// Start a mock of `capability`
    pub fn new(capability: &'c CapabilityInterface) -> Self {
        Self {
            capability,
            name: None,
            overrides: Vec::new(),
            synthesizer: TypeSynthesizer::default(),
        }
    }

    /// Return `value` from every overload of `method` instead of the default
    pub fn returning(mut self, method: impl Into<String>, value: Value) -> Self {
        self.overrides.push((method.into(), value));
        self
    }

    /// Use a type name other than `<Capability>Mock`
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Synthesize with a specific policy
    pub fn with_synthesizer(mut self, synthesizer: TypeSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    /// Synthesize the mock
    pub fn build(self) -> Result<Arc<TypeDescriptor>, SynthesisError> {
        let name = self
            .name
            .unwrap_or_else(|| format!("{}Mock", self.capability.name()));

        if let Some((method, _)) = self
            .overrides
            .iter()
            .find(|(method, _)| !self.capability.declares_method(method))
        {
            return Err(SynthesisError::UnknownOverride {
                type_name: name,
                method: method.clone(),
            });
        }

        let mut spec = SynthesisSpec::new(name);
        for required in self.capability.required() {
            let body = self
                .overrides
                .iter()
                .rev()
                .find(|(method, _)| method == required.name())
                .map(|(_, value)| MethodBody::ConstantReturn(value.clone()))
                .unwrap_or(MethodBody::DefaultForType);
            spec = spec.method(required.clone(), body);
        }

        self.synthesizer.synthesize(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activator::activate;
    use crate::capability::matches;
    use crate::config::TextDefault;

    fn repository() -> CapabilityInterface {
        CapabilityInterface::builder("Repository")
            .method("count() -> i64".parse().unwrap())
            .method("find(i64) -> &User".parse().unwrap())
            .method("name() -> string".parse().unwrap())
            .method("ready() -> bool".parse().unwrap())
            .method("ratio() -> f32".parse().unwrap())
            .method("clear()".parse().unwrap())
            .build()
            .unwrap()
    }

    #[test]
    fn test_mock_returns_defaults() {
        let cap = repository();
        let mock = generate_mock(&cap).unwrap();
        assert_eq!(mock.name(), "RepositoryMock");
        assert!(matches(&mock, &cap));
        assert_eq!(mock.properties().count(), 0);

        let mut repo = activate(&mock).unwrap();
        assert_eq!(repo.invoke("count", &[]).unwrap(), Value::I64(0));
        assert_eq!(repo.invoke("find", &[Value::I64(7)]).unwrap(), Value::Null);
        assert_eq!(repo.invoke("name", &[]).unwrap(), Value::str(""));
        assert_eq!(repo.invoke("ready", &[]).unwrap(), Value::Bool(false));
        assert_eq!(repo.invoke("ratio", &[]).unwrap(), Value::F32(0.0));
        assert_eq!(repo.invoke("clear", &[]).unwrap(), Value::Null);
    }

    #[test]
    fn test_unmappable_return_type() {
        let cap = CapabilityInterface::builder("Bank")
            .method("balance() -> Money".parse().unwrap())
            .build()
            .unwrap();
        assert!(matches!(
            generate_mock(&cap),
            Err(SynthesisError::NoDefault { .. })
        ));
    }

    #[test]
    fn test_every_constructible_capability_mocks() {
        let cap = CapabilityInterface::builder("text_formatter")
            .method("format(string) -> string".parse().unwrap())
            .method("ns.reset()".parse().unwrap())
            .build()
            .unwrap();
        let mock = generate_mock(&cap).unwrap();
        assert_eq!(mock.name(), "text_formatterMock");
        assert!(matches(&mock, &cap));
    }

    #[test]
    fn test_overrides() {
        let cap = repository();
        let mock = MockBuilder::new(&cap)
            .returning("count", Value::I64(3))
            .named("FakeRepo")
            .build()
            .unwrap();
        assert_eq!(mock.name(), "FakeRepo");

        let mut repo = activate(&mock).unwrap();
        assert_eq!(repo.invoke("count", &[]).unwrap(), Value::I64(3));
        assert_eq!(repo.invoke("ready", &[]).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_override_errors() {
        let cap = repository();
        assert!(matches!(
            MockBuilder::new(&cap).returning("delete", Value::Null).build(),
            Err(SynthesisError::UnknownOverride { .. })
        ));
        assert!(matches!(
            MockBuilder::new(&cap).returning("count", Value::str("3")).build(),
            Err(SynthesisError::ConstantTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_mock_with_null_text() {
        let cap = repository();
        let mock = MockBuilder::new(&cap)
            .with_synthesizer(TypeSynthesizer::new(TextDefault::Null))
            .build()
            .unwrap();
        let mut repo = activate(&mock).unwrap();
        assert_eq!(repo.invoke("name", &[]).unwrap(), Value::Null);
    }
}
