//! Option values and well-known pipeline option names.

use serde::{Deserialize, Serialize};

/// Value stored under one option name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum OptionValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl OptionValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// Preferred bitmap configuration for decoded images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeFormat {
    /// Smaller memory footprint, no alpha unless the source requires it.
    #[default]
    PreferRgb565,
    /// Full 32-bit color.
    AlwaysArgb8888,
}

impl DecodeFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PreferRgb565 => "prefer_rgb_565",
            Self::AlwaysArgb8888 => "always_argb_8888",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "prefer_rgb_565" => Some(Self::PreferRgb565),
            "always_argb_8888" => Some(Self::AlwaysArgb8888),
            _ => None,
        }
    }
}

pub const OPTION_DECODE_FORMAT: &str = "decodeFormat";
pub const OPTION_MEMORY_CACHE_BYTES: &str = "memoryCacheBytes";
pub const OPTION_BITMAP_POOL_BYTES: &str = "bitmapPoolBytes";
pub const OPTION_DISK_CACHE_BYTES: &str = "diskCacheBytes";
pub const OPTION_SOURCE_THREADS: &str = "sourceThreads";
pub const OPTION_DISK_CACHE_THREADS: &str = "diskCacheThreads";

pub const DEFAULT_MEMORY_CACHE_BYTES: u64 = 32 * 1024 * 1024;
pub const DEFAULT_BITMAP_POOL_BYTES: u64 = 32 * 1024 * 1024;
pub const DEFAULT_DISK_CACHE_BYTES: u64 = 250 * 1024 * 1024;
pub const DEFAULT_DISK_CACHE_THREADS: usize = 1;

/// Source thread default: available parallelism, at least one.
pub fn default_source_threads() -> usize {
    std::thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
}
