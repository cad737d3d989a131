//! Protocol-violation error for write-once accumulators.

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Accumulator that rejected a write or a second freeze.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrozenTarget {
    Config,
    Registry,
}

impl FrozenTarget {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::Registry => "registry",
        }
    }
}

/// Mutation or freeze attempted after the target was frozen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyFrozenError {
    pub target: FrozenTarget,
}

impl AlreadyFrozenError {
    pub fn new(target: FrozenTarget) -> Self {
        Self { target }
    }
}

impl Display for AlreadyFrozenError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} is already frozen", self.target.as_str())
    }
}

impl Error for AlreadyFrozenError {}
