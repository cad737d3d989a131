//! Component registry keyed by (model type, data type).
//!
//! # Responsibility
//! - Collect loader factories during the register phase.
//! - Serve typed lookups from a read-only snapshot afterwards.
//!
//! # Invariants
//! - Registering an existing key replaces the earlier factory (last write wins)
//!   and tears the replaced factory down.
//! - `freeze` succeeds exactly once; later writes or freezes fail.
//! - `ReadOnlyRegistry` never mutates.

mod loader;

pub use loader::{FnLoaderFactory, LoaderFactory, ModelLoader};

use crate::frozen::{AlreadyFrozenError, FrozenTarget};
use log::info;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt::{Debug, Display, Formatter};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identity of one Rust type, with its name kept for diagnostics.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Debug for TypeKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

/// Registry key: (model type, data type).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ComponentKey {
    pub model: TypeKey,
    pub data: TypeKey,
}

impl ComponentKey {
    pub fn of<M: 'static, D: 'static>() -> Self {
        Self {
            model: TypeKey::of::<M>(),
            data: TypeKey::of::<D>(),
        }
    }
}

impl Display for ComponentKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.model.name, self.data.name)
    }
}

/// Type-erased `Arc<dyn LoaderFactory<M, D>>`.
type ErasedFactory = Arc<dyn Any + Send + Sync>;

fn downcast_factory<M: 'static, D: 'static>(
    erased: &ErasedFactory,
) -> Option<Arc<dyn LoaderFactory<M, D>>> {
    erased
        .downcast_ref::<Arc<dyn LoaderFactory<M, D>>>()
        .cloned()
}

fn sorted_keys(entries: &HashMap<ComponentKey, ErasedFactory>) -> Vec<ComponentKey> {
    let mut keys: Vec<ComponentKey> = entries.keys().copied().collect();
    keys.sort_by_key(|key| (key.model.name, key.data.name));
    keys
}

/// Open registry populated during the register phase.
#[derive(Default)]
pub struct ComponentRegistry {
    entries: HashMap<ComponentKey, ErasedFactory>,
    frozen: bool,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `factory` for `(M, D)`.
    ///
    /// Returns `true` when an earlier factory was replaced; the replaced
    /// factory's `teardown` has run by the time this returns.
    ///
    /// # Errors
    /// - `AlreadyFrozenError` once the registry is frozen.
    pub fn register<M: 'static, D: 'static>(
        &mut self,
        factory: Arc<dyn LoaderFactory<M, D>>,
    ) -> Result<bool, AlreadyFrozenError> {
        if self.frozen {
            return Err(AlreadyFrozenError::new(FrozenTarget::Registry));
        }

        let key = ComponentKey::of::<M, D>();
        let erased: ErasedFactory = Arc::new(factory);
        let Some(previous) = self.entries.insert(key, erased) else {
            return Ok(false);
        };

        info!("event=component_replaced module=registry key={key}");
        if let Some(previous) = downcast_factory::<M, D>(&previous) {
            previous.teardown();
        }
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Freezes the registry into a read-only snapshot.
    ///
    /// # Errors
    /// - `AlreadyFrozenError` on every call after the first.
    pub(crate) fn freeze(&mut self) -> Result<ReadOnlyRegistry, AlreadyFrozenError> {
        if self.frozen {
            return Err(AlreadyFrozenError::new(FrozenTarget::Registry));
        }
        self.frozen = true;
        Ok(ReadOnlyRegistry {
            entries: std::mem::take(&mut self.entries),
        })
    }
}

impl Debug for ComponentRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("keys", &sorted_keys(&self.entries))
            .field("frozen", &self.frozen)
            .finish()
    }
}

/// Frozen registry consulted at request time.
#[derive(Default)]
pub struct ReadOnlyRegistry {
    entries: HashMap<ComponentKey, ErasedFactory>,
}

impl ReadOnlyRegistry {
    pub fn lookup<M: 'static, D: 'static>(&self) -> Option<Arc<dyn LoaderFactory<M, D>>> {
        self.entries
            .get(&ComponentKey::of::<M, D>())
            .and_then(downcast_factory::<M, D>)
    }

    pub fn contains(&self, key: &ComponentKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered keys sorted by type names.
    pub fn keys(&self) -> Vec<ComponentKey> {
        sorted_keys(&self.entries)
    }
}

impl Debug for ReadOnlyRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadOnlyRegistry")
            .field("keys", &self.keys())
            .finish()
    }
}
