//! Unit declarations read from application metadata.
//!
//! # Responsibility
//! - Parse the JSON metadata document that declares extension units.
//! - Provide a `UnitDiscovery` backed by that document and a `UnitCatalog`.
//!
//! # Invariants
//! - Only entries whose `value` equals `UNIT_MARKER` declare units.
//! - Declared identifiers keep document order.
//! - Structure or identifier errors surface as `DiscoveryError::Malformed`.

use crate::extension::discovery::{
    DiscoveryError, InstantiationError, UnitCatalog, UnitDiscovery, UnitId,
};
use crate::extension::unit::ExtensionUnit;
use log::{error, info};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Metadata value marking an entry as an extension unit declaration.
pub const UNIT_MARKER: &str = "ExtensionUnit";

const INLINE_ORIGIN: &str = "<inline>";

#[derive(Debug, Deserialize)]
struct RawManifest {
    #[serde(default)]
    metadata: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    name: String,
    value: String,
}

/// Parsed unit declarations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitManifest {
    units: Vec<UnitId>,
}

impl UnitManifest {
    /// Parses a manifest document.
    ///
    /// # Errors
    /// - `Malformed` when the JSON is invalid or a declared identifier is invalid.
    pub fn from_json_str(raw: &str) -> Result<Self, DiscoveryError> {
        parse_manifest(raw, INLINE_ORIGIN)
    }

    /// Reads and parses a manifest file.
    ///
    /// # Errors
    /// - `Unreadable` when the file cannot be read.
    /// - `Malformed` as for `from_json_str`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DiscoveryError> {
        let path = path.as_ref();
        let origin = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            error!(
                "event=manifest_parse module=manifest status=error error_code=manifest_unreadable origin={origin} error={err}"
            );
            DiscoveryError::Unreadable {
                origin: origin.clone(),
                reason: err.to_string(),
            }
        })?;
        parse_manifest(&raw, &origin)
    }

    pub fn units(&self) -> &[UnitId] {
        &self.units
    }
}

fn parse_manifest(raw: &str, origin: &str) -> Result<UnitManifest, DiscoveryError> {
    let malformed = |reason: String| {
        error!(
            "event=manifest_parse module=manifest status=error error_code=manifest_malformed origin={origin} error={reason}"
        );
        DiscoveryError::Malformed {
            origin: origin.to_string(),
            reason,
        }
    };

    let manifest: RawManifest =
        serde_json::from_str(raw).map_err(|err| malformed(err.to_string()))?;

    let mut units = Vec::new();
    for entry in manifest.metadata {
        if entry.value.trim() != UNIT_MARKER {
            continue;
        }
        let id = UnitId::parse(&entry.name).map_err(|err| malformed(err.to_string()))?;
        units.push(id);
    }

    info!(
        "event=manifest_parse module=manifest status=ok origin={origin} unit_count={}",
        units.len()
    );
    Ok(UnitManifest { units })
}

/// Where `ManifestDiscovery` loads its document from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    File(PathBuf),
    Inline(String),
}

/// Discovery that reads declarations from a manifest on each listing.
#[derive(Clone)]
pub struct ManifestDiscovery {
    source: ManifestSource,
    catalog: UnitCatalog,
}

impl ManifestDiscovery {
    pub fn new(source: ManifestSource, catalog: UnitCatalog) -> Self {
        Self { source, catalog }
    }

    pub fn from_path(path: impl Into<PathBuf>, catalog: UnitCatalog) -> Self {
        Self::new(ManifestSource::File(path.into()), catalog)
    }
}

impl UnitDiscovery for ManifestDiscovery {
    fn list_unit_identifiers(&self) -> Result<Vec<UnitId>, DiscoveryError> {
        let manifest = match &self.source {
            ManifestSource::File(path) => UnitManifest::from_path(path)?,
            ManifestSource::Inline(raw) => UnitManifest::from_json_str(raw)?,
        };
        Ok(manifest.units)
    }

    fn instantiate(&self, id: &UnitId) -> Result<Arc<dyn ExtensionUnit>, InstantiationError> {
        self.catalog.instantiate(id)
    }
}
