//! `mimic discover` - find and optionally run the plugins in a module.

use std::path::Path;

use mimic_engine::{EngineConfig, Value};

use crate::literal;
use crate::output::StyledOutput;

pub fn execute(
    out: &mut StyledOutput,
    config: &EngineConfig,
    module_path: &Path,
    capability_path: &Path,
    run: Option<&str>,
    raw_args: &[String],
    parallel: bool,
) -> anyhow::Result<()> {
    let module = super::load_module(config, module_path)?;
    let capability = super::load_capability(capability_path)?;
    let registry = config.registry();

    let report = registry.discover(&module, &capability)?.into_report();

    out.bold(&format!(
        "{} plugin(s) implementing {} in {}",
        report.instances.len(),
        capability.name(),
        module.name()
    ));
    out.newline();
    for instance in &report.instances {
        out.success("  found ");
        out.line(instance.type_name());
    }
    for failure in &report.failures {
        out.error("  failed ");
        out.line(&format!("{}: {}", failure.type_name, failure.error));
    }

    let Some(method) = run else {
        return Ok(());
    };

    let args: Vec<Value> = raw_args.iter().map(|a| literal::parse(a)).collect();
    let mut instances = report.instances;
    let run_report = if parallel {
        registry.run_all_parallel(&mut instances, &capability, method, &args)?
    } else {
        registry.run_all(&mut instances, &capability, method, &args)?
    };

    out.newline();
    let shown: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    out.bold(&format!("{}({})", method, shown.join(", ")));
    out.newline();
    for outcome in &run_report.outcomes {
        match &outcome.result {
            Ok(value) => {
                out.success("  ok    ");
                out.line(&format!("{} => {}", outcome.type_name, value));
            }
            Err(e) => {
                out.error("  error ");
                out.line(&format!("{} => {}", outcome.type_name, e));
            }
        }
    }

    let failed = run_report.failed().count();
    if failed > 0 {
        out.warning(&format!("{} of {} call(s) failed", failed, run_report.outcomes.len()));
        out.newline();
    }
    Ok(())
}
