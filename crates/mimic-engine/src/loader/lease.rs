//! Module liveness lease
//!
//! One lock per loaded module, shared by the module handle, its descriptors
//! and every instance activated from them. Readers (discovery, activation,
//! invocation) hold it shared; unloading takes it exclusively and flips the
//! state, after which every reader fails with `StaleModule`.

use std::sync::Arc;

use parking_lot::{RwLock, RwLockReadGuard};

use crate::error::{Error, Result};

/// Lifecycle state of a module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleState {
    /// Types may be activated and invoked
    Loaded,
    /// Every use fails with `StaleModule`
    Unloaded,
}

#[derive(Debug)]
struct LeaseInner {
    module: String,
    state: RwLock<ModuleState>,
}

/// Shared handle to a module's liveness
#[derive(Debug, Clone)]
pub struct ModuleLease {
    inner: Arc<LeaseInner>,
}

/// Shared hold on a live module; unloading waits until it is dropped
#[derive(Debug)]
pub struct LeaseGuard<'a> {
    _state: RwLockReadGuard<'a, ModuleState>,
}

impl ModuleLease {
    pub(crate) fn new(module: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(LeaseInner {
                module: module.into(),
                state: RwLock::new(ModuleState::Loaded),
            }),
        }
    }

    /// Name of the module this lease guards
    pub fn module_name(&self) -> &str {
        &self.inner.module
    }

    /// Take a shared hold, failing if the module was unloaded.
    ///
    /// Recursive so that a thread already holding the lease (a discovery
    /// in progress) can activate and invoke without deadlocking against a
    /// queued unload.
    pub fn acquire(&self) -> Result<LeaseGuard<'_>> {
        let state = self.inner.state.read_recursive();
        match *state {
            ModuleState::Loaded => Ok(LeaseGuard { _state: state }),
            ModuleState::Unloaded => Err(Error::StaleModule {
                module: self.inner.module.clone(),
            }),
        }
    }

    /// Current state
    pub fn state(&self) -> ModuleState {
        *self.inner.state.read_recursive()
    }

    /// Check if the module is still loaded
    pub fn is_live(&self) -> bool {
        self.state() == ModuleState::Loaded
    }

    /// Mark the module unloaded, waiting for in-flight readers.
    ///
    /// Returns `false` if it was already unloaded.
    pub(crate) fn revoke(&self) -> bool {
        let mut state = self.inner.state.write();
        let was_loaded = *state == ModuleState::Loaded;
        *state = ModuleState::Unloaded;
        was_loaded
    }
}
