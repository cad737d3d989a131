//! Loader collaborator contracts stored in the component registry.

use crate::context::Context;

/// Produces data of type `D` for models of type `M`.
pub trait ModelLoader<M, D> {
    /// Returns `None` when the loader cannot handle this model.
    fn fetch(&self, model: &M) -> Option<D>;
}

/// Builds `ModelLoader`s for one (model, data) pair.
pub trait LoaderFactory<M, D>: Send + Sync {
    fn build(&self, context: &Context) -> Box<dyn ModelLoader<M, D>>;

    /// Releases factory resources once the factory is replaced.
    fn teardown(&self) {}
}

/// Factory backed by a plain function, for loaders without retained state.
pub struct FnLoaderFactory<M, D> {
    fetch: fn(&M) -> Option<D>,
}

impl<M, D> FnLoaderFactory<M, D> {
    pub fn new(fetch: fn(&M) -> Option<D>) -> Self {
        Self { fetch }
    }
}

struct FnLoader<M, D> {
    fetch: fn(&M) -> Option<D>,
}

impl<M, D> ModelLoader<M, D> for FnLoader<M, D> {
    fn fetch(&self, model: &M) -> Option<D> {
        (self.fetch)(model)
    }
}

impl<M: 'static, D: 'static> LoaderFactory<M, D> for FnLoaderFactory<M, D> {
    fn build(&self, _context: &Context) -> Box<dyn ModelLoader<M, D>> {
        Box::new(FnLoader { fetch: self.fetch })
    }
}
