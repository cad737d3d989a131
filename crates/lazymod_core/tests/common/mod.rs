#![allow(dead_code)]

use lazymod_core::{
    ConfigBuilder, Context, ExtensionUnit, LoaderFactory, ModelLoader, OptionValue, Pipeline,
    StaticDiscovery, UnitCatalog, UnitError, UnitId, UnitResult,
};
use std::sync::{Arc, Mutex};

pub struct Photo(pub &'static str);
pub struct Bytes(pub Vec<u8>);

/// One observed unit callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Applied(String),
    Registered(String),
}

/// Records unit callbacks in the order they happen.
#[derive(Default)]
pub struct Journal {
    events: Mutex<Vec<Event>>,
}

impl Journal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn push(&self, event: Event) {
        self.events.lock().expect("journal lock").push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().expect("journal lock").clone()
    }

    pub fn count(&self, event: &Event) -> usize {
        self.events().iter().filter(|seen| *seen == event).count()
    }

    pub fn position(&self, event: &Event) -> Option<usize> {
        self.events().iter().position(|seen| seen == event)
    }
}

/// Loader factory tagging every fetched payload with one byte.
pub struct TaggedFactory(pub u8);

struct TaggedLoader(u8);

impl ModelLoader<Photo, Bytes> for TaggedLoader {
    fn fetch(&self, _model: &Photo) -> Option<Bytes> {
        Some(Bytes(vec![self.0]))
    }
}

impl LoaderFactory<Photo, Bytes> for TaggedFactory {
    fn build(&self, _context: &Context) -> Box<dyn ModelLoader<Photo, Bytes>> {
        Box::new(TaggedLoader(self.0))
    }
}

/// What a `ScriptedUnit` does in each callback.
#[derive(Clone, Default)]
pub struct Script {
    pub option: Option<(&'static str, OptionValue)>,
    pub factory_tag: Option<u8>,
    pub fail_apply: bool,
    pub fail_register: bool,
    pub panic_register: bool,
}

pub struct ScriptedUnit {
    name: String,
    script: Script,
    journal: Arc<Journal>,
}

impl ExtensionUnit for ScriptedUnit {
    fn apply_options(&self, _context: &Context, builder: &mut ConfigBuilder) -> UnitResult {
        self.journal.push(Event::Applied(self.name.clone()));
        if self.script.fail_apply {
            return Err(UnitError::new("refusing to configure").with_code("apply_failed"));
        }
        if let Some((name, value)) = &self.script.option {
            builder.set_option(name, value.clone())?;
        }
        Ok(())
    }

    fn register_components(&self, _context: &Context, pipeline: &mut Pipeline) -> UnitResult {
        self.journal.push(Event::Registered(self.name.clone()));
        if self.script.panic_register {
            panic!("unit {} exploded", self.name);
        }
        if self.script.fail_register {
            return Err(UnitError::new("refusing to register"));
        }
        if let Some(tag) = self.script.factory_tag {
            let factory: Arc<dyn LoaderFactory<Photo, Bytes>> = Arc::new(TaggedFactory(tag));
            pipeline.register(factory)?;
        }
        Ok(())
    }
}

/// Registers a scripted unit under `name` in `catalog`.
pub fn add_unit(
    catalog: &mut UnitCatalog,
    journal: &Arc<Journal>,
    name: &str,
    script: Script,
) -> UnitId {
    let journal = journal.clone();
    let unit_name = name.to_string();
    catalog
        .register(name, move || {
            Ok(Arc::new(ScriptedUnit {
                name: unit_name.clone(),
                script: script.clone(),
                journal: journal.clone(),
            }) as Arc<dyn ExtensionUnit>)
        })
        .expect("unit registration")
}

/// Discovery over scripted units in the given order.
pub fn scripted_discovery(journal: &Arc<Journal>, units: &[(&str, Script)]) -> StaticDiscovery {
    let mut catalog = UnitCatalog::new();
    let ids = units
        .iter()
        .map(|(name, script)| add_unit(&mut catalog, journal, name, script.clone()))
        .collect();
    StaticDiscovery::new(catalog, ids)
}

pub fn context() -> Context {
    Context::new("test.app").with_attribute("cache_dir", "/tmp/lazymod-test")
}

/// Fetches the tag byte produced by the (Photo, Bytes) loader.
pub fn loaded_tag(pipeline: &Pipeline) -> Option<u8> {
    let loader = pipeline.build_loader::<Photo, Bytes>(&context())?;
    loader.fetch(&Photo("any.jpg")).map(|bytes| bytes.0[0])
}
