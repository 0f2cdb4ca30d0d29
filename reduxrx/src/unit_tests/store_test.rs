use crate::unit_tests::{test_reducer, TestState};
use crate::{
    action_types, apply_middleware, compose_enhancers, create_store, Action, Dispatcher,
    Middleware, Reducer, Store, StoreCreator, StoreEnhancer, StoreError, SubscribeOptions,
    WeakStore,
};
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, OnceLock};

fn test_store() -> Store<TestState> {
    create_store(test_reducer(), TestState::default(), None).unwrap()
}

// Test store initialization
#[test]
fn test_create_store_dispatches_init() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    let recording: Reducer<TestState> = Arc::new(move |state: TestState, action: &Action| {
        seen_clone.lock().push(action.kind().to_string());
        state
    });
    let store = create_store(recording, TestState::default().add_count(3), None).unwrap();

    assert_eq!(store.get_state().count, 3);
    assert_eq!(*seen.lock(), vec![action_types::INIT.to_string()]);
}

#[test]
fn test_dispatch_updates_state() -> Result<(), StoreError> {
    let store = test_store();
    store.dispatch_type("increment")?;
    store.dispatch_payload("add", 10)?;
    store.dispatch_payload("label", "done".to_string())?;

    assert_eq!(
        store.get_state(),
        TestState {
            count: 11,
            label: "done".to_string()
        }
    );
    Ok(())
}

#[test]
fn test_dispatch_rejects_empty_type() {
    let store = test_store();
    assert!(store.dispatch_type("").unwrap_err().is_invalid_argument());
    assert!(store.dispatch(Action::new("")).unwrap_err().is_invalid_argument());
}

#[test]
fn test_subscribe_only_fires_on_change() -> Result<(), StoreError> {
    let store = test_store();
    let counts = Arc::new(Mutex::new(Vec::new()));
    let counts_clone = counts.clone();
    store.subscribe(
        |state: &TestState| state.count,
        move |count: &i32| counts_clone.lock().push(*count),
        SubscribeOptions::default(),
    );

    store.dispatch_type("increment")?;
    store.dispatch_payload("label", "unrelated".to_string())?;
    store.dispatch_type("increment")?;

    assert_eq!(*counts.lock(), vec![1, 2]);
    Ok(())
}

#[test]
fn test_subscribe_fire_immediately_and_comparer() -> Result<(), StoreError> {
    let store = test_store();
    let counts = Arc::new(Mutex::new(Vec::new()));
    let counts_clone = counts.clone();
    // only even counts are considered a change
    store.subscribe(
        |state: &TestState| state.count,
        move |count: &i32| counts_clone.lock().push(*count),
        SubscribeOptions::fire_immediately().with_comparer(|_: &i32, next: &i32| next % 2 != 0),
    );

    for _ in 0..4 {
        store.dispatch_type("increment")?;
    }
    assert_eq!(*counts.lock(), vec![0, 2, 4]);
    Ok(())
}

#[test]
fn test_unsubscribe_is_idempotent() -> Result<(), StoreError> {
    let store = test_store();
    let calls = Arc::new(Mutex::new(0));
    let calls_clone = calls.clone();
    let subscription = store.subscribe_state(
        move |_: &TestState| *calls_clone.lock() += 1,
        SubscribeOptions::default(),
    );
    assert!(subscription.is_valid());
    assert_eq!(store.subscriber_count(), 1);

    store.dispatch_type("increment")?;
    assert!(store.unsubscribe(&subscription));
    assert!(!subscription.unsubscribe());
    assert!(!subscription.is_valid());
    store.dispatch_type("increment")?;

    assert_eq!(*calls.lock(), 1);
    assert_eq!(store.subscriber_count(), 0);
    Ok(())
}

#[test]
fn test_unsubscribe_after_store_dropped() {
    let store = test_store();
    let subscription = store.subscribe_state(|_: &TestState| {}, SubscribeOptions::default());
    drop(store);
    assert!(!subscription.unsubscribe());
}

#[test]
fn test_unsubscribe_from_other_store_is_refused() {
    let store = test_store();
    let other = test_store();
    let subscription = store.subscribe_state(|_: &TestState| {}, SubscribeOptions::default());
    assert!(!other.unsubscribe(&subscription));
    assert!(subscription.is_valid());
}

#[test]
fn test_nested_dispatch_from_listener() -> Result<(), StoreError> {
    let store = test_store();
    let first_seen = Arc::new(Mutex::new(Vec::new()));
    let second_seen = Arc::new(Mutex::new(Vec::new()));

    let weak = store.downgrade();
    let first_clone = first_seen.clone();
    store.subscribe(
        |state: &TestState| state.count,
        move |count: &i32| {
            first_clone.lock().push(*count);
            if *count == 1 {
                weak.dispatch(Action::new("increment")).unwrap();
            }
        },
        SubscribeOptions::default(),
    );
    let second_clone = second_seen.clone();
    store.subscribe(
        |state: &TestState| state.count,
        move |count: &i32| second_clone.lock().push(*count),
        SubscribeOptions::default(),
    );

    store.dispatch_type("increment")?;

    assert_eq!(*first_seen.lock(), vec![1, 2]);
    // the nested dispatch already delivered 2, the outer one has nothing new
    assert_eq!(*second_seen.lock(), vec![2]);
    assert_eq!(store.get_state().count, 2);
    Ok(())
}

#[test]
fn test_reducer_may_not_dispatch() -> Result<(), StoreError> {
    let handle: Arc<OnceLock<WeakStore<TestState>>> = Arc::new(OnceLock::new());
    let nested = Arc::new(Mutex::new(None));

    let handle_clone = handle.clone();
    let nested_clone = nested.clone();
    let reducer: Reducer<TestState> = Arc::new(move |state: TestState, action: &Action| {
        if action.kind() == "nested" {
            if let Some(store) = handle_clone.get() {
                *nested_clone.lock() = Some(store.dispatch(Action::new("increment")));
            }
        }
        state
    });
    let store = create_store(reducer, TestState::default(), None)?;
    let _ = handle.set(store.downgrade());

    store.dispatch_type("nested")?;
    assert_eq!(*nested.lock(), Some(Err(StoreError::DispatchWhileReducing)));
    Ok(())
}

#[test]
fn test_reducer_panic_leaves_store_usable() -> Result<(), StoreError> {
    let store = test_store();
    store.dispatch_type("increment")?;

    let result = panic::catch_unwind(AssertUnwindSafe(|| store.dispatch_type("explode")));
    assert!(result.is_err());

    assert_eq!(store.get_state().count, 1);
    store.dispatch_type("increment")?;
    assert_eq!(store.get_state().count, 2);
    Ok(())
}

#[test]
fn test_listener_panic_is_isolated() -> Result<(), StoreError> {
    let store = test_store();
    store.subscribe_state(
        |_: &TestState| panic!("listener exploded"),
        SubscribeOptions::default(),
    );
    let calls = Arc::new(Mutex::new(0));
    let calls_clone = calls.clone();
    store.subscribe_state(
        move |_: &TestState| *calls_clone.lock() += 1,
        SubscribeOptions::default(),
    );

    store.dispatch_type("increment")?;
    assert_eq!(*calls.lock(), 1);
    Ok(())
}

#[test]
fn test_dispose() {
    let store = test_store();
    let subscription = store.subscribe_state(|_: &TestState| {}, SubscribeOptions::default());
    let hook_ran = Arc::new(Mutex::new(false));
    let hook_clone = hook_ran.clone();
    store.on_dispose(move || *hook_clone.lock() = true);

    store.dispose();
    store.dispose();

    assert!(store.is_disposed());
    assert!(*hook_ran.lock());
    assert!(!subscription.is_valid());
    assert_eq!(store.dispatch_type("increment"), Err(StoreError::Disposed));

    let late = store.subscribe_state(|_: &TestState| {}, SubscribeOptions::default());
    assert!(!late.is_valid());
    assert_eq!(store.subscriber_count(), 0);
}

#[test]
fn test_concurrent_dispatch_is_serialized() {
    let store = test_store();
    let threads: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            std::thread::spawn(move || {
                for _ in 0..100 {
                    store.dispatch_type("increment").unwrap();
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }
    assert_eq!(store.get_state().count, 400);
}

fn recording_middleware(name: &'static str, log: Arc<Mutex<Vec<String>>>) -> Middleware<TestState> {
    Arc::new(move |_: WeakStore<TestState>, next: Dispatcher| -> Dispatcher {
        let log = log.clone();
        Arc::new(move |action: Action| {
            log.lock().push(format!("{}:{}", name, action.kind()));
            next(action)
        })
    })
}

#[test]
fn test_first_middleware_sees_action_first() -> Result<(), StoreError> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let enhancer = apply_middleware(vec![
        recording_middleware("a", log.clone()),
        recording_middleware("b", log.clone()),
    ]);
    let store = create_store(test_reducer(), TestState::default(), Some(enhancer))?;
    log.lock().clear();

    store.dispatch_type("increment")?;
    assert_eq!(*log.lock(), vec!["a:increment", "b:increment"]);
    assert_eq!(store.get_state().count, 1);
    Ok(())
}

#[test]
fn test_middleware_can_swallow_actions() -> Result<(), StoreError> {
    let filter: Middleware<TestState> = Arc::new(|_: WeakStore<TestState>, next: Dispatcher| -> Dispatcher {
        Arc::new(move |action: Action| {
            if action.kind() == "add" {
                return Ok(());
            }
            next(action)
        })
    });
    let store = create_store(test_reducer(), TestState::default(), Some(apply_middleware(vec![filter])))?;
    store.dispatch_payload("add", 5)?;
    store.dispatch_type("increment")?;
    assert_eq!(store.get_state().count, 1);
    Ok(())
}

fn recording_enhancer(name: &'static str, log: Arc<Mutex<Vec<&'static str>>>) -> StoreEnhancer<TestState> {
    Arc::new(move |creator: StoreCreator<TestState>| -> StoreCreator<TestState> {
        let log = log.clone();
        Arc::new(move |reducer: Reducer<TestState>, initial_state: TestState| {
            log.lock().push(name);
            creator(reducer, initial_state)
        })
    })
}

#[test]
fn test_compose_enhancers_outermost_first() -> Result<(), StoreError> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let enhancer = compose_enhancers(vec![
        recording_enhancer("a", log.clone()),
        recording_enhancer("b", log.clone()),
        recording_enhancer("c", log.clone()),
    ]);
    create_store(test_reducer(), TestState::default(), Some(enhancer))?;
    assert_eq!(*log.lock(), vec!["a", "b", "c"]);
    Ok(())
}

#[test]
fn test_plain_store_is_not_instrumented() {
    let store = test_store();
    assert_eq!(store.instrumented().unwrap_err(), StoreError::NotInstrumented);
}
