mod common;

use common::{context, loaded_tag, scripted_discovery, Event, Journal, Script};
use lazymod_core::{global, LifecycleState, StaticDiscovery};
use std::sync::Arc;
use std::thread;

// Global state is per process, so this file holds a single test.
#[test]
fn global_pipeline_is_installed_once_and_shared() {
    assert_eq!(global::state(), LifecycleState::Uninitialized);

    let journal = Journal::new();
    global::install(scripted_discovery(
        &journal,
        &[(
            "com.example.GlobalUnit",
            Script {
                factory_tag: Some(5),
                ..Script::default()
            },
        )],
    ))
    .expect("first install");
    assert_eq!(
        global::install(StaticDiscovery::empty()),
        Err(global::GlobalError::AlreadyInstalled)
    );

    let handles: Vec<_> = (0..8)
        .map(|_| thread::spawn(|| global::get(&context()).expect("global pipeline")))
        .collect();
    let pipelines: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("caller thread should not panic"))
        .collect();

    assert!(pipelines
        .iter()
        .all(|pipeline| Arc::ptr_eq(pipeline, &pipelines[0])));
    assert_eq!(loaded_tag(&pipelines[0]), Some(5));
    assert_eq!(global::state(), LifecycleState::Ready);
    assert_eq!(
        journal.count(&Event::Registered("com.example.GlobalUnit".to_string())),
        1
    );
    assert!(global::reset().is_err());
}
