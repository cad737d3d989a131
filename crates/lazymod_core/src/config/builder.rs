//! Pre-construction option accumulator.
//!
//! # Responsibility
//! - Collect named options from every unit's `apply_options` call.
//! - Freeze the collected options into the configuration the pipeline is built from.
//!
//! # Invariants
//! - Last write for a given option name wins.
//! - `freeze` succeeds exactly once; every later write or freeze fails.
//! - Cross-option consistency is not validated.

use crate::config::options::{
    default_source_threads, DecodeFormat, OptionValue, DEFAULT_BITMAP_POOL_BYTES,
    DEFAULT_DISK_CACHE_BYTES, DEFAULT_DISK_CACHE_THREADS, DEFAULT_MEMORY_CACHE_BYTES,
    OPTION_BITMAP_POOL_BYTES, OPTION_DECODE_FORMAT, OPTION_DISK_CACHE_BYTES,
    OPTION_DISK_CACHE_THREADS, OPTION_MEMORY_CACHE_BYTES, OPTION_SOURCE_THREADS,
};
use crate::frozen::{AlreadyFrozenError, FrozenTarget};
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

static OPTION_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_.]*$").expect("valid option name regex"));

/// Option write errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidOptionName(String),
    AlreadyFrozen(AlreadyFrozenError),
}

impl ConfigError {
    /// Stable error code for diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidOptionName(_) => "invalid_option_name",
            Self::AlreadyFrozen(_) => "already_frozen",
        }
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidOptionName(name) => write!(f, "option name is invalid: `{name}`"),
            Self::AlreadyFrozen(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::AlreadyFrozen(err) => Some(err),
            Self::InvalidOptionName(_) => None,
        }
    }
}

impl From<AlreadyFrozenError> for ConfigError {
    fn from(value: AlreadyFrozenError) -> Self {
        Self::AlreadyFrozen(value)
    }
}

/// Mutable option record populated during the configure phase.
///
/// Units only write options; freezing belongs to the lifecycle.
///
/// ```compile_fail
/// let mut builder = lazymod_core::ConfigBuilder::new();
/// let _ = builder.freeze();
/// ```
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    options: BTreeMap<String, OptionValue>,
    frozen: bool,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one option, replacing any earlier value for `name`.
    pub fn set_option(
        &mut self,
        name: &str,
        value: impl Into<OptionValue>,
    ) -> Result<(), ConfigError> {
        if self.frozen {
            return Err(AlreadyFrozenError::new(FrozenTarget::Config).into());
        }
        if !OPTION_NAME_RE.is_match(name) {
            return Err(ConfigError::InvalidOptionName(name.to_string()));
        }

        let value = value.into();
        if let Some(previous) = self.options.insert(name.to_string(), value.clone()) {
            if previous != value {
                debug!(
                    "event=option_overwritten module=config option={name} previous={previous:?} value={value:?}"
                );
            }
        }
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn set_decode_format(&mut self, format: DecodeFormat) -> Result<(), ConfigError> {
        self.set_option(OPTION_DECODE_FORMAT, format.as_str())
    }

    pub fn set_memory_cache_bytes(&mut self, bytes: u64) -> Result<(), ConfigError> {
        self.set_option(OPTION_MEMORY_CACHE_BYTES, saturating_i64(bytes))
    }

    pub fn set_bitmap_pool_bytes(&mut self, bytes: u64) -> Result<(), ConfigError> {
        self.set_option(OPTION_BITMAP_POOL_BYTES, saturating_i64(bytes))
    }

    pub fn set_disk_cache_bytes(&mut self, bytes: u64) -> Result<(), ConfigError> {
        self.set_option(OPTION_DISK_CACHE_BYTES, saturating_i64(bytes))
    }

    pub fn set_source_threads(&mut self, threads: usize) -> Result<(), ConfigError> {
        self.set_option(OPTION_SOURCE_THREADS, saturating_i64(threads as u64))
    }

    pub fn set_disk_cache_threads(&mut self, threads: usize) -> Result<(), ConfigError> {
        self.set_option(OPTION_DISK_CACHE_THREADS, saturating_i64(threads as u64))
    }

    /// Freezes the builder into an immutable snapshot.
    ///
    /// # Errors
    /// - `AlreadyFrozenError` on every call after the first.
    pub(crate) fn freeze(&mut self) -> Result<ImmutableConfig, AlreadyFrozenError> {
        if self.frozen {
            return Err(AlreadyFrozenError::new(FrozenTarget::Config));
        }
        self.frozen = true;
        Ok(ImmutableConfig {
            options: std::mem::take(&mut self.options),
        })
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Frozen configuration the pipeline is built from.
///
/// Typed accessors fall back to defaults when an option is absent or holds a
/// value of the wrong shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImmutableConfig {
    options: BTreeMap<String, OptionValue>,
}

impl ImmutableConfig {
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.options.get(name)
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn option_names(&self) -> impl Iterator<Item = &str> {
        self.options.keys().map(String::as_str)
    }

    pub fn decode_format(&self) -> DecodeFormat {
        match self.get(OPTION_DECODE_FORMAT) {
            None => DecodeFormat::default(),
            Some(value) => match value.as_text().and_then(DecodeFormat::parse) {
                Some(format) => format,
                None => {
                    warn!(
                        "event=option_fallback module=config option={OPTION_DECODE_FORMAT} value={value:?}"
                    );
                    DecodeFormat::default()
                }
            },
        }
    }

    pub fn memory_cache_bytes(&self) -> u64 {
        self.non_negative(OPTION_MEMORY_CACHE_BYTES)
            .unwrap_or(DEFAULT_MEMORY_CACHE_BYTES)
    }

    pub fn bitmap_pool_bytes(&self) -> u64 {
        self.non_negative(OPTION_BITMAP_POOL_BYTES)
            .unwrap_or(DEFAULT_BITMAP_POOL_BYTES)
    }

    pub fn disk_cache_bytes(&self) -> u64 {
        self.non_negative(OPTION_DISK_CACHE_BYTES)
            .unwrap_or(DEFAULT_DISK_CACHE_BYTES)
    }

    pub fn source_threads(&self) -> usize {
        self.thread_count(OPTION_SOURCE_THREADS)
            .unwrap_or_else(default_source_threads)
    }

    pub fn disk_cache_threads(&self) -> usize {
        self.thread_count(OPTION_DISK_CACHE_THREADS)
            .unwrap_or(DEFAULT_DISK_CACHE_THREADS)
    }

    /// Serializes all explicitly set options.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.options).unwrap_or(serde_json::Value::Null)
    }

    fn non_negative(&self, name: &str) -> Option<u64> {
        let value = self.get(name)?;
        match value.as_int().and_then(|raw| u64::try_from(raw).ok()) {
            Some(bytes) => Some(bytes),
            None => {
                warn!("event=option_fallback module=config option={name} value={value:?}");
                None
            }
        }
    }

    fn thread_count(&self, name: &str) -> Option<usize> {
        let count = self.non_negative(name)?;
        match usize::try_from(count) {
            Ok(0) | Err(_) => None,
            Ok(count) => Some(count),
        }
    }
}
