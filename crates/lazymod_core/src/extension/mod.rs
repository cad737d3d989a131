//! Extension unit contracts.
//!
//! This module defines the unit capability, identifier discovery and the
//! explicit constructor catalog that replaces reflective instantiation.

pub mod discovery;
pub mod manifest;
pub mod unit;
