//! Shared pipeline core built from the frozen configuration.
//!
//! # Responsibility
//! - Own the frozen configuration and the component registry.
//! - Accept registrations only while the register phase is open.
//! - Serve loader lookups once sealed.
//!
//! # Invariants
//! - Configuration never changes after construction.
//! - Lookups only consult the sealed, read-only registry.

use crate::config::ImmutableConfig;
use crate::context::Context;
use crate::frozen::{AlreadyFrozenError, FrozenTarget};
use crate::registry::{
    ComponentKey, ComponentRegistry, LoaderFactory, ModelLoader, ReadOnlyRegistry,
};
use log::info;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug)]
enum Components {
    Open(ComponentRegistry),
    Sealed(ReadOnlyRegistry),
}

/// The process singleton handed to units and, once ready, to every caller.
#[derive(Debug)]
pub struct Pipeline {
    instance_id: Uuid,
    config: ImmutableConfig,
    components: Components,
}

impl Pipeline {
    /// Constructs the core with an open registry.
    pub(crate) fn new(config: ImmutableConfig) -> Self {
        let instance_id = Uuid::new_v4();
        info!(
            "event=pipeline_built module=pipeline status=ok instance_id={instance_id} option_count={}",
            config.len()
        );
        Self {
            instance_id,
            config,
            components: Components::Open(ComponentRegistry::new()),
        }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn config(&self) -> &ImmutableConfig {
        &self.config
    }

    /// Registers a loader factory for `(M, D)`, replacing any earlier one.
    ///
    /// # Errors
    /// - `AlreadyFrozenError` after the pipeline is sealed.
    pub fn register<M: 'static, D: 'static>(
        &mut self,
        factory: Arc<dyn LoaderFactory<M, D>>,
    ) -> Result<(), AlreadyFrozenError> {
        match &mut self.components {
            Components::Open(registry) => registry.register(factory).map(|_| ()),
            Components::Sealed(_) => Err(AlreadyFrozenError::new(FrozenTarget::Registry)),
        }
    }

    /// Freezes the registry and closes the register phase.
    pub(crate) fn seal(&mut self) -> Result<(), AlreadyFrozenError> {
        let frozen = match &mut self.components {
            Components::Open(registry) => registry.freeze()?,
            Components::Sealed(_) => return Err(AlreadyFrozenError::new(FrozenTarget::Registry)),
        };
        info!(
            "event=registry_frozen module=pipeline status=ok instance_id={} component_count={}",
            self.instance_id,
            frozen.len()
        );
        self.components = Components::Sealed(frozen);
        Ok(())
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self.components, Components::Sealed(_))
    }

    /// Returns the factory registered for `(M, D)`.
    ///
    /// Always `None` before the pipeline is sealed.
    pub fn lookup<M: 'static, D: 'static>(&self) -> Option<Arc<dyn LoaderFactory<M, D>>> {
        match &self.components {
            Components::Sealed(registry) => registry.lookup::<M, D>(),
            Components::Open(_) => None,
        }
    }

    /// Builds a loader for `(M, D)` from the registered factory.
    pub fn build_loader<M: 'static, D: 'static>(
        &self,
        context: &Context,
    ) -> Option<Box<dyn ModelLoader<M, D>>> {
        self.lookup::<M, D>().map(|factory| factory.build(context))
    }

    /// Keys of all sealed registrations; empty before sealing.
    pub fn component_keys(&self) -> Vec<ComponentKey> {
        match &self.components {
            Components::Sealed(registry) => registry.keys(),
            Components::Open(_) => Vec::new(),
        }
    }
}
