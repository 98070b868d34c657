//! Read-only inspection reports

use std::fmt;

use serde::Serialize;

use crate::descriptor::{Origin, StorageInfo, TypeDescriptor};

/// Members of a type grouped by kind
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectionReport {
    /// Type name
    pub name: String,
    /// Descriptor identity
    pub id: u64,
    /// `module <name>` or `synthesized`
    pub origin: String,
    /// Whether the type has a default constructor
    pub constructible: bool,
    /// Fields
    pub fields: Vec<StorageEntry>,
    /// Properties
    pub properties: Vec<StorageEntry>,
    /// Methods
    pub methods: Vec<MethodEntry>,
    /// Events
    pub events: Vec<EventEntry>,
}

/// Field or property line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageEntry {
    /// Member name
    pub name: String,
    /// Declared type
    #[serde(rename = "type")]
    pub type_name: String,
    /// Readable flag
    pub readable: bool,
    /// Writable flag
    pub writable: bool,
}

/// Method line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodEntry {
    /// Full signature
    pub signature: String,
    /// Body summary
    pub body: String,
}

/// Event line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventEntry {
    /// Event name
    pub name: String,
    /// Handler type
    pub handler: String,
}

impl InspectionReport {
    /// Build the report for `ty`
    pub fn of(ty: &TypeDescriptor) -> Self {
        let origin = match ty.origin() {
            Origin::Loaded(lease) => format!("module {}", lease.module_name()),
            Origin::Synthesized(_) => "synthesized".to_string(),
        };
        Self {
            name: ty.name().to_string(),
            id: ty.id().as_u64(),
            origin,
            constructible: ty.constructor().is_some(),
            fields: ty.fields().map(StorageEntry::from).collect(),
            properties: ty.properties().map(StorageEntry::from).collect(),
            methods: ty
                .method_infos()
                .map(|m| MethodEntry {
                    signature: m.signature.to_string(),
                    body: m.body.describe(),
                })
                .collect(),
            events: ty
                .events()
                .map(|e| EventEntry {
                    name: e.name.clone(),
                    handler: e.handler_type.to_string(),
                })
                .collect(),
        }
    }
}

impl From<&StorageInfo> for StorageEntry {
    fn from(info: &StorageInfo) -> Self {
        Self {
            name: info.name.clone(),
            type_name: info.type_ref.to_string(),
            readable: info.readable,
            writable: info.writable,
        }
    }
}

impl StorageEntry {
    fn access(&self) -> &'static str {
        match (self.readable, self.writable) {
            (true, true) => "rw",
            (true, false) => "r",
            (false, true) => "w",
            (false, false) => "-",
        }
    }
}

impl fmt::Display for InspectionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type {} ({})", self.name, self.origin)?;
        if !self.constructible {
            write!(f, " [no default constructor]")?;
        }
        writeln!(f)?;

        if !self.fields.is_empty() {
            writeln!(f, "  fields:")?;
            for field in &self.fields {
                writeln!(f, "    {}: {} [{}]", field.name, field.type_name, field.access())?;
            }
        }
        if !self.properties.is_empty() {
            writeln!(f, "  properties:")?;
            for prop in &self.properties {
                writeln!(f, "    {}: {} [{}]", prop.name, prop.type_name, prop.access())?;
            }
        }
        if !self.methods.is_empty() {
            writeln!(f, "  methods:")?;
            for method in &self.methods {
                writeln!(f, "    {} = {}", method.signature, method.body)?;
            }
        }
        if !self.events.is_empty() {
            writeln!(f, "  events:")?;
            for event in &self.events {
                writeln!(f, "    {}: {}", event.name, event.handler)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{MemberDescriptor, TypeDescriptor};
    use crate::loader::ModuleBuilder;
    use mimic_sdk::{NativeFunction, TypeRef, Value};

    #[test]
    fn test_report_groups_members() {
        let module = ModuleBuilder::new("widgets")
            .with_type(
                TypeDescriptor::builder("Button")
                    .member(MemberDescriptor::Field(
                        StorageInfo::new("id", TypeRef::I64).readonly(),
                    ))
                    .property("label", TypeRef::Str)
                    .event("clicked", TypeRef::Handler)
                    .constant_method("kind() -> string".parse().unwrap(), Value::str("button"))
                    .native_method("area", NativeFunction::from_fn0("widgets.area", || 0.0f64)),
            )
            .build()
            .unwrap();

        let report = InspectionReport::of(&module.types()[0]);
        assert_eq!(report.origin, "module widgets");
        assert_eq!(report.fields.len(), 1);
        assert_eq!(report.properties.len(), 1);
        assert_eq!(report.methods.len(), 2);
        assert_eq!(report.events.len(), 1);

        let text = report.to_string();
        assert!(text.starts_with("type Button (module widgets)\n"));
        assert!(text.contains("    id: i64 [r]\n"));
        assert!(text.contains("    kind() -> string = constant \"button\"\n"));
        assert!(text.contains("    area() -> f64 = native widgets.area\n"));
        assert!(text.contains("    clicked: fn\n"));
    }

    #[test]
    fn test_report_json() {
        let ty = crate::synth::synthesize(
            crate::synth::SynthesisSpec::new("Point").property("x", TypeRef::I32),
        )
        .unwrap();
        let json = serde_json::to_value(InspectionReport::of(&ty)).unwrap();
        assert_eq!(json["origin"], "synthesized");
        assert_eq!(json["properties"][0]["type"], "i32");
        assert_eq!(json["methods"].as_array().unwrap().len(), 0);
    }
}
