//! Lazily initialized pipeline singleton configured by extension units.
//! Units are discovered once, apply options before the pipeline is built and
//! register components before it is handed out.

pub mod config;
pub mod context;
pub mod extension;
pub mod frozen;
pub mod global;
pub mod lifecycle;
pub mod logging;
pub mod pipeline;
pub mod registry;

pub use config::{ConfigBuilder, ConfigError, DecodeFormat, ImmutableConfig, OptionValue};
pub use context::Context;
pub use extension::discovery::{
    CatalogError, DiscoveryError, InstantiationError, StaticDiscovery, UnitCatalog,
    UnitDiscovery, UnitId,
};
pub use extension::manifest::{ManifestDiscovery, ManifestSource, UnitManifest, UNIT_MARKER};
pub use extension::unit::{ExtensionUnit, UnitError, UnitResult};
pub use frozen::{AlreadyFrozenError, FrozenTarget};
pub use lifecycle::{LifecycleError, LifecycleState, SingletonLifecycle};
pub use logging::{default_log_level, init_logging, logging_status};
pub use pipeline::Pipeline;
pub use registry::{
    ComponentKey, ComponentRegistry, FnLoaderFactory, LoaderFactory, ModelLoader,
    ReadOnlyRegistry, TypeKey,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
