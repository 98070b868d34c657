//! `mimic inspect` - print the members of every type in a module.

use std::path::Path;

use mimic_engine::{EngineConfig, InspectionReport};

use crate::output::StyledOutput;

pub fn execute(
    out: &mut StyledOutput,
    config: &EngineConfig,
    module_path: &Path,
    json: bool,
) -> anyhow::Result<()> {
    let module = super::load_module(config, module_path)?;
    let reports: Vec<InspectionReport> = module
        .types()
        .iter()
        .map(|ty| InspectionReport::of(ty))
        .collect();

    if json {
        let doc = serde_json::json!({
            "module": module.name(),
            "version": module.version(),
            "types": reports,
        });
        out.line(&serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    out.bold(&format!("module {}", module.name()));
    if let Some(version) = module.version() {
        out.plain(&format!(" v{}", version));
    }
    out.newline();
    for report in &reports {
        out.newline();
        out.plain(&report.to_string());
    }
    Ok(())
}
