//! Plugin discovery and fan-out invocation
//!
//! Discovery walks a module's types in declaration order, skips those that
//! do not satisfy the capability, and activates the rest. Activation
//! failures are yielded alongside instances instead of ending the scan.

use std::sync::Arc;

use mimic_sdk::{NativeError, Value};
use thiserror::Error;

use crate::activator::{Activator, Instance};
use crate::capability::{CapabilityInterface, CapabilityMatcher};
use crate::descriptor::TypeDescriptor;
use crate::error::{Error, Result};
use crate::invoker::Invoker;
use crate::loader::{LeaseGuard, LoadedModule};

/// A matching type that could not be activated
#[derive(Debug, Error)]
#[error("failed to activate '{type_name}': {error}")]
pub struct ActivationFailure {
    /// Type that failed
    pub type_name: String,
    /// Why it failed
    #[source]
    pub error: Error,
}

/// Everything one discovery pass produced
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Activated instances in declaration order
    pub instances: Vec<Instance>,
    /// Matching types that failed to activate
    pub failures: Vec<ActivationFailure>,
}

/// Result of invoking one instance during `run_all`
#[derive(Debug)]
pub struct PluginOutcome {
    /// Instance's type
    pub type_name: String,
    /// Return value or failure
    pub result: Result<Value>,
}

/// Per-instance outcomes of `run_all`, in input order
#[derive(Debug, Default)]
pub struct RunReport {
    /// One outcome per instance
    pub outcomes: Vec<PluginOutcome>,
}

impl RunReport {
    /// Outcomes that returned a value
    pub fn succeeded(&self) -> impl Iterator<Item = &PluginOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_ok())
    }

    /// Outcomes that failed
    pub fn failed(&self) -> impl Iterator<Item = &PluginOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// Check if every instance succeeded
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }
}

/// Lazy discovery pass over one module.
///
/// Holds the module's lease while alive, so `unload` waits for it.
pub struct Discovery<'a> {
    registry: &'a PluginRegistry,
    capability: &'a CapabilityInterface,
    module: &'a str,
    types: std::slice::Iter<'a, Arc<TypeDescriptor>>,
    _lease: LeaseGuard<'a>,
}

impl Discovery<'_> {
    /// Drain the pass into a report
    pub fn into_report(self) -> DiscoveryReport {
        let mut report = DiscoveryReport::default();
        for item in self {
            match item {
                Ok(instance) => report.instances.push(instance),
                Err(failure) => report.failures.push(failure),
            }
        }
        report
    }
}

impl Iterator for Discovery<'_> {
    type Item = std::result::Result<Instance, ActivationFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        for ty in self.types.by_ref() {
            if !self.registry.matcher.matches(ty, self.capability) {
                tracing::debug!(
                    module = self.module,
                    type_name = %ty.name(),
                    capability = %self.capability.name(),
                    "type does not match capability"
                );
                continue;
            }

            return Some(match self.registry.activator.activate(ty) {
                Ok(instance) => Ok(instance),
                Err(error) => {
                    tracing::warn!(
                        module = self.module,
                        type_name = %ty.name(),
                        error = %error,
                        "failed to activate plugin"
                    );
                    Err(ActivationFailure {
                        type_name: ty.name().to_string(),
                        error,
                    })
                }
            });
        }
        None
    }
}

/// Discovers plugins and drives them through the invoker
#[derive(Debug)]
pub struct PluginRegistry {
    activator: Activator,
    invoker: Invoker,
    matcher: CapabilityMatcher,
    parallel_threads: usize,
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new(Activator::default(), Invoker::default())
    }
}

impl PluginRegistry {
    /// Create a registry
    pub fn new(activator: Activator, invoker: Invoker) -> Self {
        Self {
            activator,
            invoker,
            matcher: CapabilityMatcher::new(),
            parallel_threads: num_cpus::get(),
        }
    }

    /// Set the worker count for `run_all_parallel`
    pub fn with_parallel_threads(mut self, threads: usize) -> Self {
        self.parallel_threads = threads.max(1);
        self
    }

    /// Match cache
    pub fn matcher(&self) -> &CapabilityMatcher {
        &self.matcher
    }

    /// Evict cached match results for every type of `module`
    pub fn forget_module(&self, module: &LoadedModule) {
        for ty in module.types() {
            self.matcher.forget(ty);
        }
    }

    /// Start a discovery pass; fails with `StaleModule` if `module` was
    /// unloaded, evicting its cached match results
    pub fn discover<'a>(
        &'a self,
        module: &'a LoadedModule,
        capability: &'a CapabilityInterface,
    ) -> Result<Discovery<'a>> {
        let lease = module.lease().acquire().map_err(|e| {
            self.forget_module(module);
            e
        })?;
        tracing::info!(
            module = %module.name(),
            capability = %capability.name(),
            types = module.types().len(),
            "discovering plugins"
        );
        Ok(Discovery {
            registry: self,
            capability,
            module: module.name(),
            types: module.types().iter(),
            _lease: lease,
        })
    }

    /// Invoke `method` on every instance, collecting per-instance outcomes.
    ///
    /// Fails up front with `MethodNotFound` if the capability does not
    /// declare `method`.
    pub fn run_all(
        &self,
        instances: &mut [Instance],
        capability: &CapabilityInterface,
        method: &str,
        args: &[Value],
    ) -> Result<RunReport> {
        check_declared(capability, method)?;
        let outcomes = instances
            .iter_mut()
            .map(|instance| run_one(self.invoker, instance, method, args))
            .collect();
        Ok(RunReport { outcomes })
    }

    /// `run_all` across scoped worker threads; outcomes keep input order
    pub fn run_all_parallel(
        &self,
        instances: &mut [Instance],
        capability: &CapabilityInterface,
        method: &str,
        args: &[Value],
    ) -> Result<RunReport> {
        check_declared(capability, method)?;
        if instances.is_empty() {
            return Ok(RunReport::default());
        }

        let type_names: Vec<String> = instances.iter().map(|i| i.type_name().to_string()).collect();
        let chunk_size = instances.len().div_ceil(self.parallel_threads);
        let invoker = self.invoker;
        let (tx, rx) = crossbeam::channel::unbounded();

        let scoped = crossbeam::thread::scope(|s| {
            for (chunk_index, chunk) in instances.chunks_mut(chunk_size).enumerate() {
                let tx = tx.clone();
                s.spawn(move |_| {
                    for (offset, instance) in chunk.iter_mut().enumerate() {
                        let outcome = run_one(invoker, instance, method, args);
                        // The receiver outlives the scope
                        let _ = tx.send((chunk_index * chunk_size + offset, outcome));
                    }
                });
            }
        });
        drop(tx);

        if scoped.is_err() {
            tracing::error!(method, "plugin worker thread panicked");
        }

        let mut slots: Vec<Option<PluginOutcome>> = type_names.iter().map(|_| None).collect();
        for (index, outcome) in rx.iter() {
            slots[index] = Some(outcome);
        }

        let outcomes = slots
            .into_iter()
            .zip(type_names)
            .map(|(slot, type_name)| {
                slot.unwrap_or_else(|| PluginOutcome {
                    result: Err(Error::InvocationTarget {
                        type_name: type_name.clone(),
                        method: method.to_string(),
                        source: NativeError::Panic("worker thread panicked".to_string()),
                    }),
                    type_name,
                })
            })
            .collect();
        Ok(RunReport { outcomes })
    }
}

fn check_declared(capability: &CapabilityInterface, method: &str) -> Result<()> {
    if capability.declares_method(method) {
        return Ok(());
    }
    Err(Error::MethodNotFound {
        type_name: capability.name().to_string(),
        method: method.to_string(),
        available: capability.method_names().join(", "),
    })
}

fn run_one(invoker: Invoker, instance: &mut Instance, method: &str, args: &[Value]) -> PluginOutcome {
    let result = invoker.invoke(instance, method, args);
    if let Err(e) = &result {
        tracing::warn!(type_name = %instance.type_name(), method, error = %e, "plugin call failed");
    }
    PluginOutcome {
        type_name: instance.type_name().to_string(),
        result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::ModuleBuilder;
    use mimic_sdk::{NativeFunction, TypeRef};

    fn greeter() -> CapabilityInterface {
        CapabilityInterface::builder("Greeter")
            .method("greet(string) -> string".parse().unwrap())
            .build()
            .unwrap()
    }

    fn module() -> LoadedModule {
        let hello = NativeFunction::from_fn1("hello", |name: String| format!("hello {}", name));
        let fails = NativeFunction::new("fails", vec![TypeRef::Str], TypeRef::Str, |_, _| {
            Err(NativeError::Failed("no greeting today".to_string()))
        });
        ModuleBuilder::new("greeters")
            .with_type(TypeDescriptor::builder("English").native_method("greet", hello))
            .with_type(TypeDescriptor::builder("Rock").field("weight", TypeRef::F64))
            .with_type(TypeDescriptor::builder("Grumpy").native_method("greet", fails))
            .with_type(
                TypeDescriptor::builder("Abstract")
                    .constant_method("greet(string) -> string".parse().unwrap(), Value::str("?"))
                    .without_constructor(),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_discovery_skips_and_reports() {
        let registry = PluginRegistry::default();
        let module = module();
        let cap = greeter();

        let report = registry.discover(&module, &cap).unwrap().into_report();
        let names: Vec<_> = report.instances.iter().map(|i| i.type_name()).collect();
        assert_eq!(names, vec!["English", "Grumpy"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].type_name, "Abstract");
    }

    #[test]
    fn test_discovery_is_restartable() {
        let registry = PluginRegistry::default();
        let module = module();
        let cap = greeter();

        let first = registry.discover(&module, &cap).unwrap().count();
        let second = registry.discover(&module, &cap).unwrap().count();
        assert_eq!(first, 3);
        assert_eq!(first, second);
    }

    #[test]
    fn test_run_all_isolates_failures() {
        let registry = PluginRegistry::default();
        let module = module();
        let cap = greeter();
        let mut instances = registry.discover(&module, &cap).unwrap().into_report().instances;

        let report = registry
            .run_all(&mut instances, &cap, "greet", &[Value::str("bob")])
            .unwrap();
        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(
            report.outcomes[0].result.as_ref().unwrap(),
            &Value::str("hello bob")
        );
        assert!(report.outcomes[1].result.as_ref().unwrap_err().is_invocation_target());
        assert_eq!(report.succeeded().count(), 1);
        assert_eq!(report.failed().count(), 1);
        assert!(!report.all_succeeded());
    }

    #[test]
    fn test_run_all_requires_declared_method() {
        let registry = PluginRegistry::default();
        let module = module();
        let cap = greeter();
        let mut instances = registry.discover(&module, &cap).unwrap().into_report().instances;

        assert!(matches!(
            registry.run_all(&mut instances, &cap, "wave", &[]),
            Err(Error::MethodNotFound { .. })
        ));
    }

    #[test]
    fn test_run_all_parallel_keeps_order() {
        let registry = PluginRegistry::default().with_parallel_threads(2);
        let module = module();
        let cap = greeter();

        let mut instances = Vec::new();
        for _ in 0..5 {
            instances.extend(registry.discover(&module, &cap).unwrap().into_report().instances);
        }

        let report = registry
            .run_all_parallel(&mut instances, &cap, "greet", &[Value::str("ann")])
            .unwrap();
        let names: Vec<_> = report.outcomes.iter().map(|o| o.type_name.as_str()).collect();
        assert_eq!(names, ["English", "Grumpy"].repeat(5));
        assert_eq!(report.succeeded().count(), 5);
    }

    #[test]
    fn test_discover_unloaded_module() {
        let registry = PluginRegistry::default();
        let module = module();
        registry.discover(&module, &greeter()).unwrap().into_report();
        assert!(registry.matcher().cached() > 0);

        module.unload();
        assert!(matches!(
            registry.discover(&module, &greeter()),
            Err(Error::StaleModule { .. })
        ));
        assert_eq!(registry.matcher().cached(), 0);
    }
}
