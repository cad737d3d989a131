//! Environment handle shared with extension units.
//!
//! # Responsibility
//! - Carry caller-owned environment facts into unit callbacks.
//!
//! # Invariants
//! - Units only ever borrow the context; the lifecycle never mutates it.

use std::collections::BTreeMap;

/// Opaque environment handle passed unchanged to every unit operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Context {
    application_id: String,
    attributes: BTreeMap<String, String>,
}

impl Context {
    pub fn new(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Adds one environment attribute, replacing an existing value.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }
}
