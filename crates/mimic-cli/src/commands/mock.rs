//! `mimic mock` - synthesize a mock of a capability and call each requirement.

use std::path::Path;

use mimic_engine::{EngineConfig, InspectionReport, MockBuilder, Value};

use crate::literal;
use crate::output::StyledOutput;

pub fn execute(
    out: &mut StyledOutput,
    config: &EngineConfig,
    capability_path: &Path,
    overrides: &[String],
) -> anyhow::Result<()> {
    let capability = super::load_capability(capability_path)?;

    let mut builder = MockBuilder::new(&capability).with_synthesizer(config.synthesizer());
    for raw in overrides {
        let (method, value) = literal::parse_override(raw)?;
        // Literals are untyped; convert to the declared return type when exact
        let value = match capability.required().iter().find(|sig| sig.name() == method) {
            Some(sig) => literal::convert_to(value, sig.returns()),
            None => value,
        };
        builder = builder.returning(method, value);
    }
    let mock = builder.build()?;

    out.plain(&InspectionReport::of(&mock).to_string());
    out.newline();

    let mut instance = config.activator().activate(&mock)?;
    let invoker = config.invoker();
    for sig in capability.required() {
        let args: Option<Vec<Value>> = sig
            .params()
            .iter()
            .map(|p| config.synthesis.text_default.default_for(p))
            .collect();
        let Some(args) = args else {
            out.warning("  skip  ");
            out.line(&format!("{} (no default argument)", sig));
            continue;
        };

        match invoker.invoke(&mut instance, sig.name(), &args) {
            Ok(value) => {
                out.success("  ok    ");
                out.line(&format!("{} => {}", sig, value));
            }
            Err(e) => {
                out.error("  error ");
                out.line(&format!("{} => {}", sig, e));
            }
        }
    }
    Ok(())
}
