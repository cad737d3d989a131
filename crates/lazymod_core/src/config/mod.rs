//! Pipeline configuration accumulated from extension units.
//!
//! # Responsibility
//! - Hold the option set units write before the pipeline exists.
//! - Expose typed well-known options with defaults after freeze.
//!
//! # See also
//! - `crate::lifecycle` for when the builder is opened and frozen.

mod builder;
pub mod options;

pub use builder::{ConfigBuilder, ConfigError, ImmutableConfig};
pub use options::{DecodeFormat, OptionValue};
