//! Module loading
//!
//! A module loader turns a file into a `LoadedModule`: a set of type
//! descriptors sharing one liveness lease. The engine ships a manifest
//! loader whose method bodies are linked against a registry of native
//! functions; other loaders plug in through the `ModuleLoader` trait.

mod lease;
mod manifest;
mod module;

use std::path::Path;
use std::sync::Arc;

use mimic_sdk::{NativeFunction, NativeFunctionRegistry, TypeRef};
use thiserror::Error;

use crate::config::TextDefault;
use crate::descriptor::{
    format_types, DescriptorError, EventInfo, MemberDescriptor, MethodImpl, MethodSignature,
    StorageInfo, TypeDescriptor, TypeDescriptorBuilder,
};

pub use lease::{LeaseGuard, ModuleLease, ModuleState};
pub use manifest::{
    EventManifest, Literal, MethodManifest, ModuleInfo, ModuleManifest, StorageManifest,
    TypeManifest,
};
pub use module::{LoadedModule, ModuleBuilder};

/// Errors that can occur while loading a module
#[derive(Debug, Error)]
pub enum LoadError {
    /// Module file could not be read
    #[error("Failed to read module {path}: {source}")]
    Io {
        /// Path that was attempted
        path: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Module file does not exist
    #[error("Module not found: {path}")]
    NotFound {
        /// Path that was attempted
        path: String,
    },

    /// Module file is not valid TOML or JSON
    #[error("Failed to parse module {path}: {reason}")]
    Parse {
        /// Path (or `<inline>`) of the source
        path: String,
        /// Parser message
        reason: String,
    },

    /// File extension is not a known manifest format
    #[error("Unsupported module format '{extension}' for {path} (expected .toml or .json)")]
    UnsupportedFormat {
        /// Path that was attempted
        path: String,
        /// Extension found
        extension: String,
    },

    /// Manifest content is invalid
    #[error("Invalid module '{module}': {reason}")]
    InvalidManifest {
        /// Module name
        module: String,
        /// What was wrong
        reason: String,
    },

    /// A method refers to a native function that is not registered
    #[error("'{type_name}::{member}' refers to unknown native function '{function}'")]
    UnresolvedNative {
        /// Declaring type
        type_name: String,
        /// Method (or `init`)
        member: String,
        /// Missing function name
        function: String,
    },

    /// A native function's signature differs from the declared one
    #[error("'{type_name}::{member}' expects {expected} but native '{function}' is {found}")]
    SignatureMismatch {
        /// Declaring type
        type_name: String,
        /// Method (or `init`)
        member: String,
        /// Native function name
        function: String,
        /// Declared signature
        expected: String,
        /// Native function's signature
        found: String,
    },

    /// Type declaration violates the descriptor invariants
    #[error(transparent)]
    Descriptor(#[from] DescriptorError),
}

/// Source of loaded modules
pub trait ModuleLoader {
    /// Load a module from `path`
    fn load(&self, path: &Path) -> Result<LoadedModule, LoadError>;

    /// Unload a module; blocks until in-flight readers finish
    fn unload(&self, module: &LoadedModule) {
        module.unload();
    }
}

/// Manifest encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl ManifestFormat {
    /// Pick the format from a file extension
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        match extension {
            "toml" => Ok(ManifestFormat::Toml),
            "json" => Ok(ManifestFormat::Json),
            other => Err(LoadError::UnsupportedFormat {
                path: path.display().to_string(),
                extension: other.to_string(),
            }),
        }
    }
}

/// Loads modules from TOML or JSON manifests
#[derive(Debug, Clone)]
pub struct ManifestLoader {
    natives: Arc<NativeFunctionRegistry>,
    text_default: TextDefault,
}

impl ManifestLoader {
    /// Create a loader linking against `natives`
    pub fn new(natives: Arc<NativeFunctionRegistry>) -> Self {
        Self {
            natives,
            text_default: TextDefault::default(),
        }
    }

    /// Policy for `default = true` bodies returning `string`
    pub fn with_text_default(mut self, text_default: TextDefault) -> Self {
        self.text_default = text_default;
        self
    }

    /// Native functions available for linking
    pub fn natives(&self) -> &NativeFunctionRegistry {
        &self.natives
    }

    /// Load a manifest from a string
    pub fn load_str(&self, source: &str, format: ManifestFormat) -> Result<LoadedModule, LoadError> {
        let manifest = parse(source, format, "<inline>")?;
        self.link(manifest, None)
    }

    /// Link a parsed manifest into a module
    pub fn link(&self, manifest: ModuleManifest, path: Option<&Path>) -> Result<LoadedModule, LoadError> {
        let module = manifest.module.name.clone();
        let mut builder = ModuleBuilder::new(manifest.module.name);
        if let Some(version) = manifest.module.version {
            builder = builder.version(version);
        }
        if let Some(path) = path {
            builder = builder.path(path);
        }

        for ty in &manifest.types {
            builder = builder.with_type(self.link_type(&module, ty)?);
        }
        builder.build()
    }

    fn link_type(&self, module: &str, ty: &TypeManifest) -> Result<TypeDescriptorBuilder, LoadError> {
        let invalid = |reason: String| LoadError::InvalidManifest {
            module: module.to_string(),
            reason,
        };
        let parse_type = |member: &str, text: &str| {
            text.parse::<TypeRef>()
                .map_err(|e| invalid(format!("'{}::{}': {}", ty.name, member, e)))
        };

        let mut builder = TypeDescriptor::builder(&ty.name);

        for field in &ty.fields {
            let info = storage(field, parse_type(&field.name, &field.type_name)?);
            builder = builder.member(MemberDescriptor::Field(info));
        }
        for property in &ty.properties {
            let info = storage(property, parse_type(&property.name, &property.type_name)?);
            builder = builder.member(MemberDescriptor::Property(info));
        }
        for event in &ty.events {
            builder = builder.member(MemberDescriptor::Event(EventInfo {
                name: event.name.clone(),
                handler_type: parse_type(&event.name, &event.handler)?,
            }));
        }

        for method in &ty.methods {
            let params = method
                .params
                .iter()
                .map(|p| parse_type(&method.name, p))
                .collect::<Result<Vec<_>, _>>()?;
            let returns = parse_type(&method.name, &method.returns)?;
            let signature = MethodSignature::new(&method.name, params, returns);
            let body = self.link_body(&ty.name, &signature, method, &invalid)?;
            builder = builder.method(signature, body);
        }

        if !ty.default_constructor {
            builder = builder.without_constructor();
        } else if let Some(init) = &ty.init {
            builder = builder.init(self.link_init(&ty.name, init)?);
        }

        tracing::debug!(module, type_name = %ty.name, "linked type");
        Ok(builder)
    }

    fn link_body(
        &self,
        type_name: &str,
        signature: &MethodSignature,
        method: &MethodManifest,
        invalid: &dyn Fn(String) -> LoadError,
    ) -> Result<MethodImpl, LoadError> {
        match (&method.native, &method.constant, method.default) {
            (Some(name), None, false) => {
                let function = self.resolve(type_name, signature.name(), name)?;
                if !signature.accepts_function(function) {
                    return Err(LoadError::SignatureMismatch {
                        type_name: type_name.to_string(),
                        member: signature.name().to_string(),
                        function: name.clone(),
                        expected: signature.to_string(),
                        found: native_signature(function),
                    });
                }
                Ok(MethodImpl::Native(function.clone()))
            }
            (None, Some(literal), false) => literal
                .to_value(signature.returns())
                .map(MethodImpl::Constant)
                .ok_or_else(|| {
                    invalid(format!(
                        "constant {:?} of '{}::{}' does not fit {}",
                        literal,
                        type_name,
                        signature,
                        signature.returns()
                    ))
                }),
            (None, None, true) => self
                .text_default
                .default_for(signature.returns())
                .map(MethodImpl::Default)
                .ok_or_else(|| {
                    invalid(format!(
                        "'{}::{}' has no default for {}",
                        type_name,
                        signature,
                        signature.returns()
                    ))
                }),
            _ => Err(invalid(format!(
                "'{}::{}' must set exactly one of native, constant or default",
                type_name, signature
            ))),
        }
    }

    fn link_init(&self, type_name: &str, name: &str) -> Result<NativeFunction, LoadError> {
        let function = self.resolve(type_name, "init", name)?;
        if !function.params().is_empty() {
            return Err(LoadError::SignatureMismatch {
                type_name: type_name.to_string(),
                member: "init".to_string(),
                function: name.to_string(),
                expected: "() -> void".to_string(),
                found: native_signature(function),
            });
        }
        Ok(function.clone())
    }

    fn resolve(&self, type_name: &str, member: &str, name: &str) -> Result<&NativeFunction, LoadError> {
        self.natives
            .get(name)
            .ok_or_else(|| LoadError::UnresolvedNative {
                type_name: type_name.to_string(),
                member: member.to_string(),
                function: name.to_string(),
            })
    }
}

impl ModuleLoader for ManifestLoader {
    fn load(&self, path: &Path) -> Result<LoadedModule, LoadError> {
        if !path.exists() {
            return Err(LoadError::NotFound {
                path: path.display().to_string(),
            });
        }
        let format = ManifestFormat::from_path(path)?;
        let source = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;

        tracing::debug!(path = %path.display(), ?format, "loading module manifest");
        let manifest = parse(&source, format, &path.display().to_string())?;
        self.link(manifest, Some(path))
    }
}

fn parse(source: &str, format: ManifestFormat, path: &str) -> Result<ModuleManifest, LoadError> {
    let parsed = match format {
        ManifestFormat::Toml => toml::from_str(source).map_err(|e| e.to_string()),
        ManifestFormat::Json => serde_json::from_str(source).map_err(|e| e.to_string()),
    };
    parsed.map_err(|reason| LoadError::Parse {
        path: path.to_string(),
        reason,
    })
}

fn storage(manifest: &StorageManifest, type_ref: TypeRef) -> StorageInfo {
    StorageInfo {
        name: manifest.name.clone(),
        type_ref,
        readable: manifest.readable,
        writable: manifest.writable,
    }
}

fn native_signature(function: &NativeFunction) -> String {
    format!("{} -> {}", format_types(function.params()), function.returns())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mimic_sdk::Value;

    fn natives() -> Arc<NativeFunctionRegistry> {
        let mut registry = NativeFunctionRegistry::new();
        registry.register(NativeFunction::from_fn2("math.add", |a: i32, b: i32| a + b));
        registry.register(NativeFunction::from_fn1("math.neg", |a: i64| -a));
        Arc::new(registry)
    }

    const CALC: &str = r#"
        [module]
        name = "calc"
        version = "0.1.0"

        [[types]]
        name = "Adder"

        [[types.methods]]
        name = "add"
        params = ["i32", "i32"]
        returns = "i32"
        native = "math.add"

        [[types.methods]]
        name = "zero"
        returns = "i32"
        default = true

        [[types.methods]]
        name = "label"
        returns = "string"
        constant = "adder"
    "#;

    #[test]
    fn test_load_and_link() {
        let loader = ManifestLoader::new(natives());
        let module = loader.load_str(CALC, ManifestFormat::Toml).unwrap();

        assert_eq!(module.name(), "calc");
        assert_eq!(module.version(), Some("0.1.0"));
        let adder = module.type_named("Adder").unwrap();
        assert!(adder.has_method(&"add(i32, i32) -> i32".parse().unwrap()));

        let zero = adder.methods_named("zero").next().unwrap();
        assert!(matches!(zero.body, MethodImpl::Default(Value::I32(0))));
        let label = adder.methods_named("label").next().unwrap();
        assert!(matches!(&label.body, MethodImpl::Constant(Value::Str(s)) if s == "adder"));
    }

    #[test]
    fn test_unresolved_native() {
        let source = CALC.replace("math.add", "math.mul");
        let err = ManifestLoader::new(natives())
            .load_str(&source, ManifestFormat::Toml)
            .unwrap_err();
        match err {
            LoadError::UnresolvedNative { type_name, member, function } => {
                assert_eq!(type_name, "Adder");
                assert_eq!(member, "add");
                assert_eq!(function, "math.mul");
            }
            other => panic!("expected UnresolvedNative, got {:?}", other),
        }
    }

    #[test]
    fn test_signature_mismatch() {
        let source = CALC.replace("native = \"math.add\"", "native = \"math.neg\"");
        let err = ManifestLoader::new(natives())
            .load_str(&source, ManifestFormat::Toml)
            .unwrap_err();
        assert!(matches!(err, LoadError::SignatureMismatch { .. }));
    }

    #[test]
    fn test_invalid_bodies() {
        let loader = ManifestLoader::new(natives());

        let both = CALC.replace("default = true", "default = true\nconstant = 1");
        assert!(matches!(
            loader.load_str(&both, ManifestFormat::Toml),
            Err(LoadError::InvalidManifest { .. })
        ));

        let wrong_constant = CALC.replace("constant = \"adder\"", "constant = 3");
        assert!(matches!(
            loader.load_str(&wrong_constant, ManifestFormat::Toml),
            Err(LoadError::InvalidManifest { .. })
        ));

        let opaque_default = CALC.replace("returns = \"i32\"\n        default", "returns = \"Money\"\n        default");
        assert!(matches!(
            loader.load_str(&opaque_default, ManifestFormat::Toml),
            Err(LoadError::InvalidManifest { .. })
        ));
    }

    #[test]
    fn test_parse_error() {
        let err = ManifestLoader::new(natives())
            .load_str("[module", ManifestFormat::Toml)
            .unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }

    #[test]
    fn test_descriptor_error_surfaces() {
        let source = r#"
            [module]
            name = "m"
            [[types]]
            name = "T"
            [[types.fields]]
            name = "x"
            type = "i32"
            [[types.properties]]
            name = "x"
            type = "i32"
        "#;
        let err = ManifestLoader::new(natives())
            .load_str(source, ManifestFormat::Toml)
            .unwrap_err();
        assert!(matches!(
            err,
            LoadError::Descriptor(DescriptorError::DuplicateMember { .. })
        ));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            ManifestFormat::from_path(Path::new("a/b.toml")).unwrap(),
            ManifestFormat::Toml
        );
        assert_eq!(
            ManifestFormat::from_path(Path::new("b.json")).unwrap(),
            ManifestFormat::Json
        );
        assert!(matches!(
            ManifestFormat::from_path(Path::new("lib.so")),
            Err(LoadError::UnsupportedFormat { .. })
        ));
    }
}
