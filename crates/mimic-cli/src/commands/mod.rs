//! Subcommand implementations

pub mod discover;
pub mod inspect;
pub mod mock;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use mimic_engine::{
    CapabilityInterface, CapabilitySchema, EngineConfig, LoadedModule, ManifestLoader,
    ModuleLoader,
};

use crate::natives;

/// Load a module manifest, linking against the builtin natives
pub fn load_module(config: &EngineConfig, path: &Path) -> anyhow::Result<LoadedModule> {
    let loader = ManifestLoader::new(Arc::new(natives::builtin()))
        .with_text_default(config.synthesis.text_default);
    let module = loader
        .load(path)
        .with_context(|| format!("loading module {}", path.display()))?;
    tracing::debug!(
        path = %path.display(),
        module = %module.name(),
        types = module.types().len(),
        "module loaded"
    );
    Ok(module)
}

/// Load a capability schema
pub fn load_capability(path: &Path) -> anyhow::Result<CapabilityInterface> {
    let schema = CapabilitySchema::load(path)
        .with_context(|| format!("loading capability {}", path.display()))?;
    let capability = CapabilityInterface::from_schema(&schema)?;
    tracing::debug!(
        capability = %capability.name(),
        required = capability.required().len(),
        "capability loaded"
    );
    Ok(capability)
}
