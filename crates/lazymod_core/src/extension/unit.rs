//! Extension unit capability contract.
//!
//! # Responsibility
//! - Define the two callbacks every extension unit provides.
//!
//! # Invariants
//! - Each callback runs at most once per unit per process.
//! - `apply_options` of a unit always runs before its `register_components`.
//! - Units keep no state that the lifecycle depends on.

use crate::config::ConfigBuilder;
use crate::context::Context;
use crate::pipeline::Pipeline;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type UnitResult = Result<(), UnitError>;

/// Capability implemented by independently authored extension units.
///
/// Any `Send + Sync` type implementing both callbacks qualifies as a unit.
/// Returning `Err` (or panicking) aborts pipeline initialization.
pub trait ExtensionUnit: Send + Sync {
    /// Applies options to the builder immediately before the pipeline is built.
    fn apply_options(&self, context: &Context, builder: &mut ConfigBuilder) -> UnitResult;

    /// Registers components on the freshly built pipeline before it is exposed.
    fn register_components(&self, context: &Context, pipeline: &mut Pipeline) -> UnitResult;
}

/// Failure reported by a unit callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitError {
    pub code: Option<String>,
    pub message: String,
}

impl UnitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            code: None,
            message: message.into(),
        }
    }

    /// Attaches a stable machine-readable code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl Display for UnitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.code {
            Some(code) => write!(f, "[{code}] {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Error for UnitError {}

impl From<crate::frozen::AlreadyFrozenError> for UnitError {
    fn from(value: crate::frozen::AlreadyFrozenError) -> Self {
        Self::new(value.to_string()).with_code("already_frozen")
    }
}

impl From<crate::config::ConfigError> for UnitError {
    fn from(value: crate::config::ConfigError) -> Self {
        Self::new(value.to_string()).with_code(value.code())
    }
}
