//! Unit discovery contracts and the explicit constructor catalog.
//!
//! # Responsibility
//! - Define how the lifecycle obtains unit identifiers and unit instances.
//! - Map identifiers to constructor functions registered at startup.
//!
//! # Invariants
//! - `UnitId` values are validated on construction.
//! - One catalog identifier maps to exactly one constructor.
//! - `StaticDiscovery` yields identifiers in the order they were supplied.

use crate::extension::unit::{ExtensionUnit, UnitError};
use log::debug;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Validated extension unit identifier, e.g. `com.example.FlickrUnit`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UnitId(String);

impl UnitId {
    pub fn parse(value: &str) -> Result<Self, InvalidUnitId> {
        let trimmed = value.trim();
        if !is_valid_unit_id(trimmed) {
            return Err(InvalidUnitId(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for UnitId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier rejected by `UnitId::parse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidUnitId(pub String);

impl Display for InvalidUnitId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unit identifier is invalid: `{}`", self.0)
    }
}

impl Error for InvalidUnitId {}

fn is_valid_unit_id(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {}
        _ => return false,
    }

    let mut prev_separator = false;
    for c in chars {
        if c.is_ascii_alphanumeric() {
            prev_separator = false;
            continue;
        }
        if c == '.' || c == '_' || c == '-' {
            if prev_separator {
                return false;
            }
            prev_separator = true;
            continue;
        }
        return false;
    }
    !prev_separator
}

/// Backing identifier source could not produce a unit list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    Unreadable { origin: String, reason: String },
    Malformed { origin: String, reason: String },
}

impl Display for DiscoveryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unreadable { origin, reason } => {
                write!(f, "unit manifest `{origin}` is unreadable: {reason}")
            }
            Self::Malformed { origin, reason } => {
                write!(f, "unit manifest `{origin}` is malformed: {reason}")
            }
        }
    }
}

impl Error for DiscoveryError {}

/// One identifier could not be turned into a unit instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstantiationError {
    /// No constructor is registered under the identifier.
    UnknownIdentifier(UnitId),
    /// The constructor ran but could not produce a unit.
    ConstructorFailed { id: UnitId, reason: UnitError },
}

impl Display for InstantiationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownIdentifier(id) => {
                write!(f, "no constructor registered for unit `{id}`")
            }
            Self::ConstructorFailed { id, reason } => {
                write!(f, "constructor for unit `{id}` failed: {reason}")
            }
        }
    }
}

impl Error for InstantiationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ConstructorFailed { reason, .. } => Some(reason),
            Self::UnknownIdentifier(_) => None,
        }
    }
}

/// Source of unit identifiers and unit instances consumed by the lifecycle.
pub trait UnitDiscovery: Send + Sync {
    /// Returns identifiers in discovery order.
    fn list_unit_identifiers(&self) -> Result<Vec<UnitId>, DiscoveryError>;

    fn instantiate(&self, id: &UnitId) -> Result<Arc<dyn ExtensionUnit>, InstantiationError>;
}

impl<T: UnitDiscovery + ?Sized> UnitDiscovery for Box<T> {
    fn list_unit_identifiers(&self) -> Result<Vec<UnitId>, DiscoveryError> {
        (**self).list_unit_identifiers()
    }

    fn instantiate(&self, id: &UnitId) -> Result<Arc<dyn ExtensionUnit>, InstantiationError> {
        (**self).instantiate(id)
    }
}

impl<T: UnitDiscovery + ?Sized> UnitDiscovery for Arc<T> {
    fn list_unit_identifiers(&self) -> Result<Vec<UnitId>, DiscoveryError> {
        (**self).list_unit_identifiers()
    }

    fn instantiate(&self, id: &UnitId) -> Result<Arc<dyn ExtensionUnit>, InstantiationError> {
        (**self).instantiate(id)
    }
}

/// Constructor stored in a `UnitCatalog`.
pub type UnitFactory =
    Arc<dyn Fn() -> Result<Arc<dyn ExtensionUnit>, UnitError> + Send + Sync + 'static>;

/// Catalog registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    InvalidIdentifier(InvalidUnitId),
    DuplicateIdentifier(UnitId),
}

impl Display for CatalogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidIdentifier(err) => write!(f, "{err}"),
            Self::DuplicateIdentifier(id) => write!(f, "unit already registered: {id}"),
        }
    }
}

impl Error for CatalogError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidIdentifier(err) => Some(err),
            Self::DuplicateIdentifier(_) => None,
        }
    }
}

/// Startup-time mapping from identifier to unit constructor.
#[derive(Default, Clone)]
pub struct UnitCatalog {
    factories: BTreeMap<UnitId, UnitFactory>,
}

impl UnitCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a fallible constructor under `id`.
    pub fn register<F>(&mut self, id: &str, factory: F) -> Result<UnitId, CatalogError>
    where
        F: Fn() -> Result<Arc<dyn ExtensionUnit>, UnitError> + Send + Sync + 'static,
    {
        let id = UnitId::parse(id).map_err(CatalogError::InvalidIdentifier)?;
        if self.factories.contains_key(&id) {
            return Err(CatalogError::DuplicateIdentifier(id));
        }
        self.factories.insert(id.clone(), Arc::new(factory));
        Ok(id)
    }

    /// Registers a unit type constructed through `Default`.
    pub fn register_default<U>(&mut self, id: &str) -> Result<UnitId, CatalogError>
    where
        U: ExtensionUnit + Default + 'static,
    {
        self.register(id, || Ok(Arc::new(U::default()) as Arc<dyn ExtensionUnit>))
    }

    pub fn contains(&self, id: &UnitId) -> bool {
        self.factories.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Runs the constructor registered for `id`.
    pub fn instantiate(&self, id: &UnitId) -> Result<Arc<dyn ExtensionUnit>, InstantiationError> {
        let Some(factory) = self.factories.get(id) else {
            return Err(InstantiationError::UnknownIdentifier(id.clone()));
        };
        debug!("event=unit_instantiate module=discovery status=start unit={id}");
        factory().map_err(|reason| InstantiationError::ConstructorFailed {
            id: id.clone(),
            reason,
        })
    }
}

/// Discovery over a fixed identifier list.
///
/// Identifiers are yielded exactly in the supplied order.
#[derive(Clone, Default)]
pub struct StaticDiscovery {
    catalog: UnitCatalog,
    identifiers: Vec<UnitId>,
}

impl StaticDiscovery {
    pub fn new(catalog: UnitCatalog, identifiers: Vec<UnitId>) -> Self {
        Self {
            catalog,
            identifiers,
        }
    }

    /// Discovers no units at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Discovers every catalog entry, in identifier sort order.
    pub fn all_of(catalog: UnitCatalog) -> Self {
        let identifiers = catalog.factories.keys().cloned().collect();
        Self::new(catalog, identifiers)
    }
}

impl UnitDiscovery for StaticDiscovery {
    fn list_unit_identifiers(&self) -> Result<Vec<UnitId>, DiscoveryError> {
        Ok(self.identifiers.clone())
    }

    fn instantiate(&self, id: &UnitId) -> Result<Arc<dyn ExtensionUnit>, InstantiationError> {
        self.catalog.instantiate(id)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        CatalogError, InstantiationError, StaticDiscovery, UnitCatalog, UnitDiscovery, UnitId,
    };
    use crate::config::ConfigBuilder;
    use crate::context::Context;
    use crate::extension::unit::{ExtensionUnit, UnitError, UnitResult};
    use crate::pipeline::Pipeline;

    #[derive(Default)]
    struct NoopUnit;

    impl ExtensionUnit for NoopUnit {
        fn apply_options(&self, _context: &Context, _builder: &mut ConfigBuilder) -> UnitResult {
            Ok(())
        }

        fn register_components(&self, _context: &Context, _pipeline: &mut Pipeline) -> UnitResult {
            Ok(())
        }
    }

    #[test]
    fn unit_id_accepts_qualified_type_names() {
        for value in ["com.example.FlickrUnit", "unit_a", "svg-unit.v2", "A"] {
            UnitId::parse(value).expect("identifier should be valid");
        }
        assert_eq!(
            UnitId::parse("  com.example.A ").expect("trimmed").as_str(),
            "com.example.A"
        );
    }

    #[test]
    fn unit_id_rejects_malformed_values() {
        for value in ["", "   ", ".leading", "trailing.", "double..dot", "with space", "ümlaut"] {
            assert!(UnitId::parse(value).is_err(), "`{value}` must be rejected");
        }
    }

    #[test]
    fn catalog_rejects_duplicate_identifier() {
        let mut catalog = UnitCatalog::new();
        catalog
            .register_default::<NoopUnit>("com.example.Noop")
            .expect("first registration");
        let err = catalog
            .register_default::<NoopUnit>("com.example.Noop")
            .expect_err("duplicate must fail");
        assert!(matches!(err, CatalogError::DuplicateIdentifier(_)));
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains(&UnitId::parse("com.example.Noop").expect("valid id")));
        assert!(!catalog.contains(&UnitId::parse("com.example.Other").expect("valid id")));
    }

    #[test]
    fn catalog_reports_unknown_and_failing_constructors() {
        let mut catalog = UnitCatalog::new();
        let failing = catalog
            .register("com.example.Broken", || Err(UnitError::new("no default ctor")))
            .expect("registration");

        let unknown = UnitId::parse("com.example.Missing").expect("valid id");
        assert!(matches!(
            catalog.instantiate(&unknown),
            Err(InstantiationError::UnknownIdentifier(id)) if id == unknown
        ));
        assert!(matches!(
            catalog.instantiate(&failing),
            Err(InstantiationError::ConstructorFailed { .. })
        ));
    }

    #[test]
    fn static_discovery_preserves_supplied_order() {
        let mut catalog = UnitCatalog::new();
        let b = catalog.register_default::<NoopUnit>("b.Unit").expect("b");
        let a = catalog.register_default::<NoopUnit>("a.Unit").expect("a");

        let discovery = StaticDiscovery::new(catalog.clone(), vec![b.clone(), a.clone()]);
        assert_eq!(
            discovery.list_unit_identifiers().expect("list"),
            vec![b.clone(), a.clone()]
        );
        assert_eq!(
            StaticDiscovery::all_of(catalog)
                .list_unit_identifiers()
                .expect("list"),
            vec![a, b]
        );
        assert!(StaticDiscovery::empty()
            .list_unit_identifiers()
            .expect("list")
            .is_empty());
    }
}
