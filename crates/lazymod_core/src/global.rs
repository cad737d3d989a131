//! Process-wide pipeline singleton.
//!
//! # Responsibility
//! - Hold the single lifecycle instance shared by the whole process.
//! - Let startup code choose the discovery before first access.
//!
//! # Invariants
//! - The discovery is fixed once the lifecycle exists.
//! - Without an installed discovery, no units are discovered.

use crate::context::Context;
use crate::extension::discovery::{StaticDiscovery, UnitDiscovery};
use crate::lifecycle::{LifecycleError, LifecycleState, SingletonLifecycle};
use crate::pipeline::Pipeline;
use log::info;
use once_cell::sync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

type GlobalLifecycle = SingletonLifecycle<Box<dyn UnitDiscovery>>;

static GLOBAL: OnceCell<GlobalLifecycle> = OnceCell::new();

/// Global singleton setup errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlobalError {
    /// The lifecycle already exists, either installed or created by first access.
    AlreadyInstalled,
}

impl Display for GlobalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyInstalled => write!(f, "global pipeline lifecycle already exists"),
        }
    }
}

impl Error for GlobalError {}

/// Sets the discovery backing the process-wide pipeline.
///
/// # Errors
/// - `AlreadyInstalled` after a previous install or a first `get`.
pub fn install(discovery: impl UnitDiscovery + 'static) -> Result<(), GlobalError> {
    let boxed: Box<dyn UnitDiscovery> = Box::new(discovery);
    GLOBAL
        .set(SingletonLifecycle::new(boxed))
        .map_err(|_| GlobalError::AlreadyInstalled)?;
    info!("event=global_install module=global status=ok");
    Ok(())
}

fn lifecycle() -> &'static GlobalLifecycle {
    GLOBAL.get_or_init(|| {
        info!("event=global_install module=global status=default discovery=empty");
        let discovery: Box<dyn UnitDiscovery> = Box::new(StaticDiscovery::empty());
        SingletonLifecycle::new(discovery)
    })
}

/// Returns the process-wide pipeline, initializing it on first access.
pub fn get(context: &Context) -> Result<Arc<Pipeline>, LifecycleError> {
    lifecycle().get(context)
}

/// Current state, `Uninitialized` before the lifecycle exists.
pub fn state() -> LifecycleState {
    GLOBAL
        .get()
        .map(SingletonLifecycle::state)
        .unwrap_or(LifecycleState::Uninitialized)
}

/// Explicit re-attempt after a failed global initialization.
pub fn reset() -> Result<(), LifecycleError> {
    lifecycle().reset()
}
