//! Integration tests for plugin discovery
//!
//! Tests the path from a loaded module through capability matching,
//! activation, invocation and unloading.

use std::sync::Arc;

use mimic_engine::{
    matches, CapabilityInterface, Error, LoadedModule, ModuleBuilder, NativeError, NativeFunction,
    PluginRegistry, TypeDescriptor, TypeRef, Value,
};

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

fn formatter() -> CapabilityInterface {
    CapabilityInterface::builder("Formatter")
        .method("format(string) -> string".parse().unwrap())
        .method("name() -> string".parse().unwrap())
        .build()
        .unwrap()
}

/// Three types, of which `Upper` and `Quote` satisfy `Formatter`
fn formatters_module() -> LoadedModule {
    let upper = NativeFunction::from_fn1("fmt.upper", |s: String| s.to_uppercase());
    let quote = NativeFunction::from_fn1("fmt.quote", |s: String| format!("\"{}\"", s));

    ModuleBuilder::new("formatters")
        .version("1.2.0")
        .with_type(
            TypeDescriptor::builder("Upper")
                .native_method("format", upper)
                .constant_method("name() -> string".parse().unwrap(), Value::str("upper")),
        )
        .with_type(
            TypeDescriptor::builder("Counter")
                .field("count", TypeRef::I32)
                .constant_method("name() -> string".parse().unwrap(), Value::str("counter")),
        )
        .with_type(
            TypeDescriptor::builder("Quote")
                .property("style", TypeRef::Str)
                .native_method("format", quote)
                .constant_method("name() -> string".parse().unwrap(), Value::str("quote")),
        )
        .build()
        .unwrap()
}

// =============================================================================
// DISCOVERY
// =============================================================================

#[test]
fn test_discovers_matching_types_in_order() {
    let module = formatters_module();
    let registry = PluginRegistry::default();
    let cap = formatter();

    let found: Vec<_> = registry
        .discover(&module, &cap)
        .unwrap()
        .map(|r| r.unwrap().type_name().to_string())
        .collect();

    assert_eq!(found, vec!["Upper", "Quote"]);
}

#[test]
fn test_empty_capability_matches_every_type() {
    let module = formatters_module();
    let registry = PluginRegistry::default();
    let anything = CapabilityInterface::new("Anything", vec![]).unwrap();

    let report = registry.discover(&module, &anything).unwrap().into_report();
    assert_eq!(report.instances.len(), 3);
    assert!(report.failures.is_empty());
}

#[test]
fn test_activation_failure_does_not_stop_scan() {
    let module = ModuleBuilder::new("mixed")
        .with_type(
            TypeDescriptor::builder("Broken")
                .field("balance", TypeRef::opaque("Money"))
                .constant_method("name() -> string".parse().unwrap(), Value::str("broken")),
        )
        .with_type(
            TypeDescriptor::builder("Fine")
                .constant_method("name() -> string".parse().unwrap(), Value::str("fine")),
        )
        .build()
        .unwrap();
    let cap = CapabilityInterface::builder("Named")
        .method("name() -> string".parse().unwrap())
        .build()
        .unwrap();

    let items: Vec<_> = PluginRegistry::default()
        .discover(&module, &cap)
        .unwrap()
        .collect();
    assert_eq!(items.len(), 2);

    let failure = items[0].as_ref().unwrap_err();
    assert_eq!(failure.type_name, "Broken");
    assert!(matches!(failure.error, Error::Activation { .. }));
    assert_eq!(items[1].as_ref().unwrap().type_name(), "Fine");
}

// =============================================================================
// INVOCATION
// =============================================================================

#[test]
fn test_invoke_discovered_instances() {
    let module = formatters_module();
    let registry = PluginRegistry::default();
    let cap = formatter();
    let mut instances = registry.discover(&module, &cap).unwrap().into_report().instances;

    let report = registry
        .run_all(&mut instances, &cap, "format", &[Value::str("hi")])
        .unwrap();
    let results: Vec<_> = report
        .outcomes
        .iter()
        .map(|o| o.result.as_ref().unwrap().clone())
        .collect();
    assert_eq!(results, vec![Value::str("HI"), Value::str("\"hi\"")]);
}

#[test]
fn test_run_all_isolates_failing_plugin() {
    let fails = NativeFunction::new("fmt.fail", vec![TypeRef::Str], TypeRef::Str, |_, _| {
        Err(NativeError::Failed("formatter offline".to_string()))
    });
    let panics = NativeFunction::new("fmt.panic", vec![TypeRef::Str], TypeRef::Str, |_, _| {
        panic!("formatter crashed")
    });
    let echo = NativeFunction::from_fn1("fmt.echo", |s: String| s);

    let module = ModuleBuilder::new("flaky")
        .with_type(TypeDescriptor::builder("Offline").native_method("format", fails))
        .with_type(TypeDescriptor::builder("Crashy").native_method("format", panics))
        .with_type(TypeDescriptor::builder("Echo").native_method("format", echo))
        .build()
        .unwrap();
    let cap = CapabilityInterface::builder("Format")
        .method("format(string) -> string".parse().unwrap())
        .build()
        .unwrap();

    let registry = PluginRegistry::default();
    let mut instances = registry.discover(&module, &cap).unwrap().into_report().instances;
    let report = registry
        .run_all(&mut instances, &cap, "format", &[Value::str("x")])
        .unwrap();

    assert_eq!(report.failed().count(), 2);
    assert!(matches!(
        report.outcomes[1].result,
        Err(Error::InvocationTarget {
            source: NativeError::Panic(_),
            ..
        })
    ));
    assert_eq!(
        report.outcomes[2].result.as_ref().unwrap(),
        &Value::str("x")
    );
}

// =============================================================================
// UNLOADING
// =============================================================================

#[test]
fn test_unload_then_invoke_is_stale() {
    let module = formatters_module();
    let registry = PluginRegistry::default();
    let cap = formatter();
    let mut instances = registry.discover(&module, &cap).unwrap().into_report().instances;

    assert!(module.unload());

    let err = instances[0].invoke("name", &[]).unwrap_err();
    match err {
        Error::StaleModule { module } => assert_eq!(module, "formatters"),
        other => panic!("expected StaleModule, got {:?}", other),
    }
    assert!(matches!(
        registry.discover(&module, &cap),
        Err(Error::StaleModule { .. })
    ));
}

#[test]
fn test_unload_waits_for_discovery() {
    let module = formatters_module();
    let registry = PluginRegistry::default();
    let cap = formatter();

    let discovery = registry.discover(&module, &cap).unwrap();
    let unloader = {
        let module = module.clone();
        std::thread::spawn(move || module.unload())
    };

    std::thread::sleep(std::time::Duration::from_millis(20));
    assert!(module.is_loaded());

    let found = discovery.count();
    assert_eq!(found, 2);
    assert!(unloader.join().unwrap());
    assert!(!module.is_loaded());
}

#[test]
fn test_descriptors_outlive_module_handle() {
    let ty = {
        let module = formatters_module();
        Arc::clone(&module.types()[0])
    };
    // The lease lives on in the descriptor
    assert!(ty.check_live().is_ok());
    assert!(matches(&ty, &formatter()));
}
