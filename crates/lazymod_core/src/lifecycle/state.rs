//! Singleton lifecycle states.

use std::fmt::{Display, Formatter};

/// Initialization progress of the pipeline singleton.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Uninitialized,
    Discovering,
    Configuring,
    Built,
    Registering,
    Ready,
    /// Terminal until an explicit `reset`.
    Failed,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Discovering => "discovering",
            Self::Configuring => "configuring",
            Self::Built => "built",
            Self::Registering => "registering",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }

    /// Whether `next` is a legal successor of `self`.
    pub fn can_advance_to(self, next: LifecycleState) -> bool {
        matches!(
            (self, next),
            (Self::Uninitialized, Self::Discovering)
                | (Self::Discovering, Self::Configuring)
                | (Self::Configuring, Self::Built)
                | (Self::Built, Self::Registering)
                | (Self::Registering, Self::Ready)
                | (Self::Failed, Self::Uninitialized)
        ) || (next == Self::Failed && self != Self::Ready && self != Self::Failed)
    }
}

impl Display for LifecycleState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
