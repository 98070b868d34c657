//! Loaded module handle

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustc_hash::FxHashSet;

use crate::descriptor::{Origin, TypeDescriptor, TypeDescriptorBuilder};

use super::lease::ModuleLease;
use super::LoadError;

#[derive(Debug)]
struct ModuleInner {
    name: String,
    version: Option<String>,
    path: Option<PathBuf>,
    types: Vec<Arc<TypeDescriptor>>,
    lease: ModuleLease,
}

/// A module loaded at runtime.
///
/// Cheap to clone; all clones share the same types and liveness.
#[derive(Debug, Clone)]
pub struct LoadedModule {
    inner: Arc<ModuleInner>,
}

impl LoadedModule {
    /// Module name
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Module version, if declared
    pub fn version(&self) -> Option<&str> {
        self.inner.version.as_deref()
    }

    /// File the module was loaded from
    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    /// Types in declaration order
    pub fn types(&self) -> &[Arc<TypeDescriptor>] {
        &self.inner.types
    }

    /// Look up a type by name
    pub fn type_named(&self, name: &str) -> Option<&Arc<TypeDescriptor>> {
        self.inner.types.iter().find(|t| t.name() == name)
    }

    /// Liveness lease shared with this module's types
    pub fn lease(&self) -> &ModuleLease {
        &self.inner.lease
    }

    /// Check if the module is still loaded
    pub fn is_loaded(&self) -> bool {
        self.inner.lease.is_live()
    }

    /// Unload the module.
    ///
    /// Waits for in-flight discovery, activation and invocation to finish.
    /// Afterwards every descriptor and instance derived from this module
    /// fails with `StaleModule`. Returns `false` if already unloaded.
    pub fn unload(&self) -> bool {
        let unloaded = self.inner.lease.revoke();
        if unloaded {
            tracing::info!(module = %self.inner.name, "unloaded module");
        }
        unloaded
    }
}

/// Builds a `LoadedModule` from type builders
#[derive(Debug)]
pub struct ModuleBuilder {
    name: String,
    version: Option<String>,
    path: Option<PathBuf>,
    types: Vec<TypeDescriptorBuilder>,
}

impl ModuleBuilder {
    /// Start a module
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
            path: None,
            types: Vec::new(),
        }
    }

    /// Set the version
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Record the source path
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add a type
    pub fn with_type(mut self, builder: TypeDescriptorBuilder) -> Self {
        self.types.push(builder);
        self
    }

    /// Build every type and bind it to a fresh lease
    pub fn build(self) -> Result<LoadedModule, LoadError> {
        if self.name.trim().is_empty() {
            return Err(LoadError::InvalidManifest {
                module: self.name,
                reason: "module name cannot be empty".to_string(),
            });
        }

        let mut seen = FxHashSet::default();
        for builder in &self.types {
            if !seen.insert(builder.name()) {
                return Err(LoadError::InvalidManifest {
                    module: self.name.clone(),
                    reason: format!("type '{}' declared more than once", builder.name()),
                });
            }
        }

        let lease = ModuleLease::new(self.name.clone());
        let types = self
            .types
            .into_iter()
            .map(|b| b.build(Origin::Loaded(lease.clone())).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(module = %self.name, types = types.len(), "loaded module");

        Ok(LoadedModule {
            inner: Arc::new(ModuleInner {
                name: self.name,
                version: self.version,
                path: self.path,
                types,
                lease,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use mimic_sdk::TypeRef;

    fn sample() -> LoadedModule {
        ModuleBuilder::new("shapes")
            .version("1.0.0")
            .with_type(TypeDescriptor::builder("Circle").field("r", TypeRef::F64))
            .with_type(TypeDescriptor::builder("Square").field("side", TypeRef::F64))
            .build()
            .unwrap()
    }

    #[test]
    fn test_types_in_declaration_order() {
        let module = sample();
        let names: Vec<_> = module.types().iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["Circle", "Square"]);
        assert_eq!(module.version(), Some("1.0.0"));
        assert!(module.type_named("Square").is_some());
        assert_eq!(
            module.type_named("Circle").unwrap().module_name(),
            Some("shapes")
        );
    }

    #[test]
    fn test_duplicate_type_rejected() {
        let err = ModuleBuilder::new("m")
            .with_type(TypeDescriptor::builder("A"))
            .with_type(TypeDescriptor::builder("A"))
            .build()
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidManifest { .. }));
    }

    #[test]
    fn test_unload_makes_types_stale() {
        let module = sample();
        let circle = Arc::clone(&module.types()[0]);
        assert!(circle.check_live().is_ok());

        assert!(module.unload());
        assert!(!module.is_loaded());
        assert!(matches!(circle.check_live(), Err(Error::StaleModule { .. })));
        assert!(!module.unload());
    }
}
