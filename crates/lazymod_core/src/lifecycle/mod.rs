//! Lazy, exactly-once pipeline initialization driven by extension units.
//!
//! # Responsibility
//! - Run discovery, configure, build, register and ready phases once.
//! - Block concurrent first callers until the single initializer settles.
//! - Deliver the same pipeline or the same failure to every caller.
//!
//! # Invariants
//! - No unit callback runs more than once per lifecycle instance.
//! - Every unit's `apply_options` finishes before any `register_components`.
//! - A failure in any phase publishes no pipeline; there is no automatic retry.
//! - Discovery order is the invocation order; nothing else is promised
//!   between units.

mod error;
mod gate;
mod state;

pub use error::LifecycleError;
pub use state::LifecycleState;

use crate::config::ConfigBuilder;
use crate::context::Context;
use crate::extension::discovery::{UnitDiscovery, UnitId};
use crate::extension::unit::{ExtensionUnit, UnitResult};
use crate::logging::panic_payload_message;
use crate::pipeline::Pipeline;
use gate::InitGate;
use log::{error, info, warn};
use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

struct LoadedUnit {
    id: UnitId,
    unit: Arc<dyn ExtensionUnit>,
}

struct Initialized {
    pipeline: Arc<Pipeline>,
    units: Vec<LoadedUnit>,
}

/// Orchestrates the one-time initialization of the pipeline singleton.
pub struct SingletonLifecycle<D: UnitDiscovery> {
    discovery: D,
    gate: InitGate<Initialized>,
}

impl<D: UnitDiscovery> SingletonLifecycle<D> {
    pub fn new(discovery: D) -> Self {
        Self {
            discovery,
            gate: InitGate::new(),
        }
    }

    /// Returns the ready pipeline, initializing it on first access.
    ///
    /// The `context` of the caller that wins the race is the one handed to
    /// units; later callers' contexts are not consulted.
    ///
    /// # Errors
    /// - The initialization failure, identical for every caller, until `reset`.
    /// - `Reentrant` when a unit calls back into this lifecycle during
    ///   initialization; the outer initialization carries on.
    pub fn get(&self, context: &Context) -> Result<Arc<Pipeline>, LifecycleError> {
        self.gate
            .get_or_init(|| self.initialize(context))
            .map(|initialized| initialized.pipeline.clone())
    }

    pub fn state(&self) -> LifecycleState {
        self.gate.state()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == LifecycleState::Ready
    }

    /// Identifiers of the units that configured the ready pipeline, in
    /// invocation order. Empty until ready.
    pub fn unit_ids(&self) -> Vec<UnitId> {
        self.gate
            .ready()
            .map(|initialized| {
                initialized
                    .units
                    .iter()
                    .map(|loaded| loaded.id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns a failed lifecycle to `Uninitialized` for an explicit re-attempt.
    ///
    /// # Errors
    /// - `ResetRejected` unless the current state is `Failed`.
    pub fn reset(&self) -> Result<(), LifecycleError> {
        self.gate.reset()?;
        info!("event=lifecycle_reset module=lifecycle status=ok");
        Ok(())
    }

    fn initialize(&self, context: &Context) -> Result<Initialized, LifecycleError> {
        let started_at = Instant::now();
        info!(
            "event=lifecycle_start module=lifecycle status=start application_id={}",
            context.application_id()
        );

        match self.run_phases(context) {
            Ok(initialized) => {
                info!(
                    "event=pipeline_ready module=lifecycle status=ok instance_id={} unit_count={} duration_ms={}",
                    initialized.pipeline.instance_id(),
                    initialized.units.len(),
                    started_at.elapsed().as_millis()
                );
                Ok(initialized)
            }
            Err(err) => {
                error!(
                    "event=lifecycle_failed module=lifecycle status=error phase={} duration_ms={} error_code={} error={}",
                    self.gate.state(),
                    started_at.elapsed().as_millis(),
                    err.code(),
                    err
                );
                Err(err)
            }
        }
    }

    fn run_phases(&self, context: &Context) -> Result<Initialized, LifecycleError> {
        self.gate.advance(LifecycleState::Discovering);
        let units = self.discover()?;

        self.gate.advance(LifecycleState::Configuring);
        let mut builder = ConfigBuilder::new();
        for loaded in &units {
            info!(
                "event=unit_apply_options module=lifecycle status=start unit={}",
                loaded.id
            );
            invoke_unit(LifecycleState::Configuring, &loaded.id, || {
                loaded.unit.apply_options(context, &mut builder)
            })?;
        }
        let config = builder.freeze()?;
        let mut pipeline = Pipeline::new(config);
        self.gate.advance(LifecycleState::Built);

        self.gate.advance(LifecycleState::Registering);
        for loaded in &units {
            info!(
                "event=unit_register_components module=lifecycle status=start unit={}",
                loaded.id
            );
            invoke_unit(LifecycleState::Registering, &loaded.id, || {
                loaded.unit.register_components(context, &mut pipeline)
            })?;
        }
        pipeline.seal()?;

        Ok(Initialized {
            pipeline: Arc::new(pipeline),
            units,
        })
    }

    fn discover(&self) -> Result<Vec<LoadedUnit>, LifecycleError> {
        let ids = self.discovery.list_unit_identifiers()?;
        let mut seen = BTreeSet::new();
        let mut units = Vec::with_capacity(ids.len());
        for id in ids {
            if !seen.insert(id.clone()) {
                warn!("event=unit_discovered module=lifecycle status=duplicate unit={id}");
                continue;
            }
            let unit = self.discovery.instantiate(&id)?;
            info!("event=unit_discovered module=lifecycle status=ok unit={id}");
            units.push(LoadedUnit { id, unit });
        }
        Ok(units)
    }
}

/// Runs one unit callback, mapping errors and panics to the phase's failure.
fn invoke_unit(
    phase: LifecycleState,
    id: &UnitId,
    call: impl FnOnce() -> UnitResult,
) -> Result<(), LifecycleError> {
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(cause)) if phase == LifecycleState::Configuring => {
            Err(LifecycleError::Configuration {
                unit: id.clone(),
                cause,
            })
        }
        Ok(Err(cause)) => Err(LifecycleError::Registration {
            unit: id.clone(),
            cause,
        }),
        Err(payload) => Err(LifecycleError::Panicked {
            phase,
            unit: Some(id.clone()),
            message: panic_payload_message(payload.as_ref()),
        }),
    }
}
