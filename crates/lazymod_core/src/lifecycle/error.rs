//! Initialization failures delivered to every singleton accessor.

use crate::extension::discovery::{DiscoveryError, InstantiationError, UnitId};
use crate::extension::unit::UnitError;
use crate::frozen::AlreadyFrozenError;
use crate::lifecycle::state::LifecycleState;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Why the singleton could not be made ready.
///
/// `Clone` so one failure can be handed to every blocked caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    Discovery(DiscoveryError),
    Instantiation(InstantiationError),
    /// A unit's `apply_options` returned an error.
    Configuration { unit: UnitId, cause: UnitError },
    /// A unit's `register_components` returned an error.
    Registration { unit: UnitId, cause: UnitError },
    Frozen(AlreadyFrozenError),
    /// A unit (or the initializer itself) panicked.
    Panicked {
        phase: LifecycleState,
        unit: Option<UnitId>,
        message: String,
    },
    /// The singleton was requested again from inside its own initialization.
    Reentrant { phase: LifecycleState },
    /// `reset` is only accepted from `Failed`.
    ResetRejected(LifecycleState),
}

impl LifecycleError {
    /// Stable error code for logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Discovery(_) => "discovery_failed",
            Self::Instantiation(_) => "instantiation_failed",
            Self::Configuration { .. } => "configuration_failed",
            Self::Registration { .. } => "registration_failed",
            Self::Frozen(_) => "already_frozen",
            Self::Panicked { .. } => "unit_panicked",
            Self::Reentrant { .. } => "reentrant_access",
            Self::ResetRejected(_) => "reset_rejected",
        }
    }
}

impl Display for LifecycleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Discovery(err) => write!(f, "unit discovery failed: {err}"),
            Self::Instantiation(err) => write!(f, "unit instantiation failed: {err}"),
            Self::Configuration { unit, cause } => {
                write!(f, "unit `{unit}` failed to apply options: {cause}")
            }
            Self::Registration { unit, cause } => {
                write!(f, "unit `{unit}` failed to register components: {cause}")
            }
            Self::Frozen(err) => write!(f, "lifecycle protocol violation: {err}"),
            Self::Panicked {
                phase,
                unit: Some(unit),
                message,
            } => write!(f, "unit `{unit}` panicked while {phase}: {message}"),
            Self::Panicked {
                phase,
                unit: None,
                message,
            } => write!(f, "initializer panicked while {phase}: {message}"),
            Self::Reentrant { phase } => {
                write!(f, "pipeline requested from its own initializer while {phase}")
            }
            Self::ResetRejected(state) => {
                write!(f, "lifecycle reset is only allowed after failure, state is {state}")
            }
        }
    }
}

impl Error for LifecycleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Discovery(err) => Some(err),
            Self::Instantiation(err) => Some(err),
            Self::Configuration { cause, .. } | Self::Registration { cause, .. } => Some(cause),
            Self::Frozen(err) => Some(err),
            Self::Panicked { .. } | Self::Reentrant { .. } | Self::ResetRejected(_) => None,
        }
    }
}

impl From<DiscoveryError> for LifecycleError {
    fn from(value: DiscoveryError) -> Self {
        Self::Discovery(value)
    }
}

impl From<InstantiationError> for LifecycleError {
    fn from(value: InstantiationError) -> Self {
        Self::Instantiation(value)
    }
}

impl From<AlreadyFrozenError> for LifecycleError {
    fn from(value: AlreadyFrozenError) -> Self {
        Self::Frozen(value)
    }
}
