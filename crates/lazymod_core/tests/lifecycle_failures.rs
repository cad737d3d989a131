mod common;

use common::{add_unit, context, scripted_discovery, Event, Journal, Script};
use lazymod_core::{
    ConfigBuilder, Context, DiscoveryError, ExtensionUnit, InstantiationError, LifecycleError,
    LifecycleState, Pipeline, SingletonLifecycle, StaticDiscovery, UnitCatalog, UnitDiscovery,
    UnitError, UnitId, UnitResult,
};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Barrier, Mutex, Weak};
use std::thread;
use std::time::Duration;

#[test]
fn instantiation_failure_blocks_every_registration() {
    let journal = Journal::new();
    let mut catalog = UnitCatalog::new();
    let good = add_unit(&mut catalog, &journal, "com.example.Good", Script::default());
    let broken = catalog
        .register("com.example.Broken", || {
            Err(UnitError::new("missing zero-argument constructor"))
        })
        .expect("registration");
    let lifecycle = Arc::new(SingletonLifecycle::new(StaticDiscovery::new(
        catalog,
        vec![good, broken],
    )));

    let callers = 8;
    let barrier = Arc::new(Barrier::new(callers));
    let handles: Vec<_> = (0..callers)
        .map(|_| {
            let lifecycle = lifecycle.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                lifecycle
                    .get(&context())
                    .expect_err("initialization must fail")
            })
        })
        .collect();
    let errors: Vec<LifecycleError> = handles
        .into_iter()
        .map(|handle| handle.join().expect("caller thread should not panic"))
        .collect();

    assert!(errors.iter().all(|err| err == &errors[0]));
    assert!(matches!(
        errors[0],
        LifecycleError::Instantiation(InstantiationError::ConstructorFailed { .. })
    ));
    assert!(journal.events().is_empty());
    assert_eq!(lifecycle.state(), LifecycleState::Failed);
    assert!(!lifecycle.is_ready());
}

#[test]
fn unknown_identifier_is_an_instantiation_error() {
    let missing = UnitId::parse("com.example.Missing").expect("valid id");
    let lifecycle =
        SingletonLifecycle::new(StaticDiscovery::new(UnitCatalog::new(), vec![missing.clone()]));

    let err = lifecycle.get(&context()).expect_err("must fail");
    assert_eq!(
        err,
        LifecycleError::Instantiation(InstantiationError::UnknownIdentifier(missing))
    );
}

struct BrokenManifest;

impl UnitDiscovery for BrokenManifest {
    fn list_unit_identifiers(&self) -> Result<Vec<UnitId>, DiscoveryError> {
        Err(DiscoveryError::Unreadable {
            origin: "AndroidManifest.json".to_string(),
            reason: "permission denied".to_string(),
        })
    }

    fn instantiate(&self, id: &UnitId) -> Result<Arc<dyn ExtensionUnit>, InstantiationError> {
        Err(InstantiationError::UnknownIdentifier(id.clone()))
    }
}

#[test]
fn discovery_failure_is_fatal() {
    let lifecycle = SingletonLifecycle::new(BrokenManifest);
    let err = lifecycle.get(&context()).expect_err("must fail");
    assert!(matches!(err, LifecycleError::Discovery(DiscoveryError::Unreadable { .. })));
    assert_eq!(err.code(), "discovery_failed");
}

#[test]
fn configuration_error_stops_before_any_registration() {
    let journal = Journal::new();
    let lifecycle = SingletonLifecycle::new(scripted_discovery(
        &journal,
        &[
            ("com.example.A", Script::default()),
            (
                "com.example.B",
                Script {
                    fail_apply: true,
                    ..Script::default()
                },
            ),
            ("com.example.C", Script::default()),
        ],
    ));

    let err = lifecycle.get(&context()).expect_err("must fail");
    match &err {
        LifecycleError::Configuration { unit, cause } => {
            assert_eq!(unit.as_str(), "com.example.B");
            assert_eq!(cause.code.as_deref(), Some("apply_failed"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        journal.events(),
        vec![
            Event::Applied("com.example.A".to_string()),
            Event::Applied("com.example.B".to_string()),
        ]
    );
}

#[test]
fn registration_error_and_panic_never_publish_a_pipeline() {
    let journal = Journal::new();
    let failing = SingletonLifecycle::new(scripted_discovery(
        &journal,
        &[(
            "com.example.Reg",
            Script {
                fail_register: true,
                ..Script::default()
            },
        )],
    ));
    let err = failing.get(&context()).expect_err("must fail");
    assert!(matches!(err, LifecycleError::Registration { .. }));
    assert_eq!(failing.state(), LifecycleState::Failed);

    let panicking = SingletonLifecycle::new(scripted_discovery(
        &journal,
        &[(
            "com.example.Boom",
            Script {
                panic_register: true,
                ..Script::default()
            },
        )],
    ));
    let err = panicking.get(&context()).expect_err("panic must fail init");
    assert!(matches!(
        err,
        LifecycleError::Panicked {
            phase: LifecycleState::Registering,
            unit: Some(_),
            ..
        }
    ));
    assert!(err.to_string().contains("exploded"));
    let again = panicking.get(&context()).expect_err("failure is sticky");
    assert_eq!(err, again);
    assert_eq!(
        journal.count(&Event::Registered("com.example.Boom".to_string())),
        1
    );
}

/// Discovery whose listing fails until `healthy_after` attempts.
struct FlakyDiscovery {
    attempts: AtomicUsize,
    healthy_after: usize,
    inner: StaticDiscovery,
}

impl UnitDiscovery for FlakyDiscovery {
    fn list_unit_identifiers(&self) -> Result<Vec<UnitId>, DiscoveryError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.healthy_after {
            return Err(DiscoveryError::Malformed {
                origin: "<flaky>".to_string(),
                reason: format!("attempt {attempt}"),
            });
        }
        self.inner.list_unit_identifiers()
    }

    fn instantiate(&self, id: &UnitId) -> Result<Arc<dyn ExtensionUnit>, InstantiationError> {
        self.inner.instantiate(id)
    }
}

#[test]
fn explicit_reset_restarts_from_uninitialized() {
    let journal = Journal::new();
    let lifecycle = SingletonLifecycle::new(FlakyDiscovery {
        attempts: AtomicUsize::new(0),
        healthy_after: 1,
        inner: scripted_discovery(&journal, &[("com.example.A", Script::default())]),
    });

    let err = lifecycle.reset().expect_err("reset before failure is rejected");
    assert_eq!(err, LifecycleError::ResetRejected(LifecycleState::Uninitialized));

    lifecycle.get(&context()).expect_err("first attempt fails");
    lifecycle
        .get(&context())
        .expect_err("no automatic retry after failure");

    lifecycle.reset().expect("reset after failure");
    assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);
    lifecycle.get(&context()).expect("second attempt succeeds");
    assert!(lifecycle.is_ready());
    assert_eq!(journal.count(&Event::Applied("com.example.A".to_string())), 1);
    assert!(matches!(
        lifecycle.reset(),
        Err(LifecycleError::ResetRejected(LifecycleState::Ready))
    ));
}

type StaticLifecycle = SingletonLifecycle<StaticDiscovery>;

/// Unit that asks its own lifecycle for the pipeline while registering.
struct CallbackUnit {
    lifecycle: Arc<OnceCell<Weak<StaticLifecycle>>>,
    nested: Arc<Mutex<Option<LifecycleError>>>,
}

impl ExtensionUnit for CallbackUnit {
    fn apply_options(&self, _context: &Context, _builder: &mut ConfigBuilder) -> UnitResult {
        Ok(())
    }

    fn register_components(&self, context: &Context, _pipeline: &mut Pipeline) -> UnitResult {
        let lifecycle = self
            .lifecycle
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| UnitError::new("lifecycle handle missing"))?;
        let nested = lifecycle.get(context).err();
        *self.nested.lock().expect("nested lock") = nested;
        Ok(())
    }
}

#[test]
fn unit_reentering_its_lifecycle_gets_an_error_instead_of_blocking() {
    let handle = Arc::new(OnceCell::new());
    let nested = Arc::new(Mutex::new(None));
    let mut catalog = UnitCatalog::new();
    let id = {
        let handle = handle.clone();
        let nested = nested.clone();
        catalog
            .register("com.example.Callback", move || {
                Ok(Arc::new(CallbackUnit {
                    lifecycle: handle.clone(),
                    nested: nested.clone(),
                }) as Arc<dyn ExtensionUnit>)
            })
            .expect("registration")
    };
    let lifecycle = Arc::new(SingletonLifecycle::new(StaticDiscovery::new(catalog, vec![id])));
    assert!(handle.set(Arc::downgrade(&lifecycle)).is_ok());

    let (sender, receiver) = mpsc::channel();
    let worker = {
        let lifecycle = lifecycle.clone();
        thread::spawn(move || {
            let _ = sender.send(lifecycle.get(&context()).is_ok());
        })
    };
    let ready = receiver
        .recv_timeout(Duration::from_secs(5))
        .expect("initialization must settle instead of waiting on itself");
    worker.join().expect("caller thread should not panic");

    assert!(ready);
    assert_eq!(
        nested.lock().expect("nested lock").clone(),
        Some(LifecycleError::Reentrant {
            phase: LifecycleState::Registering
        })
    );
    assert!(lifecycle.is_ready());
}
