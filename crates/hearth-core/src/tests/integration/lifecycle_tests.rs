#![cfg(test)]

use std::sync::Arc;

use super::common::{Ticker, journal, running_app, ticker_factory};
use crate::container::ContainerError;
use crate::driver::{Driver, DriverError, LifecycleBridge, SharedBehaviour, behaviour_instance};
use crate::kernel::ErrorKind;

#[test]
fn test_resolving_a_ticker_attaches_it() {
    let app = running_app().unwrap();
    let log = journal();
    let factory = ticker_factory("player", &log);
    app.container()
        .singleton("player", move |c, args| factory(c, args))
        .unwrap();

    let driver = app.make_as::<Driver>(Driver::KEY).unwrap();
    assert_eq!(driver.attached_count(), 0);

    app.make("player").unwrap();
    assert_eq!(driver.attached_count(), 1);

    driver.tick().unwrap();
    driver.late_tick().unwrap();
    assert_eq!(*log.lock(), vec!["update:player", "late:player"]);
}

#[test]
fn test_releasing_detaches_and_destroys() {
    let app = running_app().unwrap();
    let log = journal();
    let factory = ticker_factory("player", &log);
    app.container()
        .singleton("player", move |c, args| factory(c, args))
        .unwrap();
    app.make("player").unwrap();
    let driver = app.make_as::<Driver>(Driver::KEY).unwrap();

    assert!(app.container().release("player").unwrap());
    assert_eq!(driver.attached_count(), 0);
    assert_eq!(*log.lock(), vec!["destroy:player"]);

    driver.tick().unwrap();
    assert_eq!(log.lock().len(), 1);
}

#[test]
fn test_installing_none_unloads_the_instance() {
    let app = running_app().unwrap();
    let log = journal();
    let ticker = Ticker::new("hud", &log);
    app.container()
        .instance("hud", Some(behaviour_instance(ticker.clone())))
        .unwrap();
    let driver = app.make_as::<Driver>(Driver::KEY).unwrap();
    assert_eq!(driver.attached_count(), 1);

    app.container().instance("hud", None).unwrap();
    assert_eq!(driver.attached_count(), 0);
    assert_eq!(ticker.destroy_count(), 1);
}

#[test]
fn test_attaching_the_same_object_twice_is_rejected() {
    let app = running_app().unwrap();
    let log = journal();
    let driver = app.make_as::<Driver>(Driver::KEY).unwrap();
    let ticker: SharedBehaviour = Ticker::new("twice", &log);

    assert!(driver.attach(ticker.clone()).unwrap());
    let err = driver.attach(ticker).unwrap_err();
    assert!(matches!(err, DriverError::AlreadyAttached { ref name } if name == "twice"));
    assert_eq!(err.kind(), ErrorKind::Duplicate);
}

#[test]
fn test_transients_are_attached_per_instance() {
    let app = running_app().unwrap();
    let log = journal();
    let factory = ticker_factory("bullet", &log);
    app.container()
        .transient("bullet", move |c, args| factory(c, args))
        .unwrap();
    let driver = app.make_as::<Driver>(Driver::KEY).unwrap();

    let first = app.make("bullet").unwrap();
    let second = app.make("bullet").unwrap();
    assert!(!first.ptr_eq(&second));
    assert_eq!(driver.attached_count(), 2);
}

#[test]
fn test_terminate_tears_down_without_double_destroy() {
    let app = running_app().unwrap();
    let log = journal();
    let factory = ticker_factory("player", &log);
    app.container()
        .singleton("player", move |c, args| factory(c, args))
        .unwrap();
    let hud = Ticker::new("hud", &log);
    app.container()
        .instance("hud", Some(behaviour_instance(hud.clone())))
        .unwrap();
    let player = app.make_as::<Ticker>("player").unwrap();
    let driver = app.make_as::<Driver>(Driver::KEY).unwrap();
    let bridge = app.make_as::<LifecycleBridge>(LifecycleBridge::KEY).unwrap();
    assert_eq!(bridge.tracked_keys(), vec!["hud", "player"]);

    app.terminate().unwrap();

    assert_eq!(driver.attached_count(), 0);
    assert_eq!(player.destroy_count(), 1);
    assert_eq!(hud.destroy_count(), 1);
    assert!(!app.container().has_instance("player"));
    assert!(!app.container().has_instance("hud"));
    assert!(bridge.tracked_keys().is_empty());
}

#[test]
fn test_failing_release_hook_still_detaches() {
    let app = running_app().unwrap();
    let log = journal();
    let factory = ticker_factory("player", &log);
    app.container()
        .singleton("player", move |c, args| factory(c, args))
        .unwrap()
        .on_release(|_, _| Err("save failed".into()));
    app.make("player").unwrap();
    let driver = app.make_as::<Driver>(Driver::KEY).unwrap();

    let err = app.container().release("player").unwrap_err();
    assert!(matches!(err, ContainerError::Hooks { .. }));
    assert_eq!(driver.attached_count(), 0);
    assert_eq!(*log.lock(), vec!["destroy:player"]);
}

#[test]
fn test_work_from_other_threads_runs_on_tick() {
    let app = running_app().unwrap();
    let driver = app.make_as::<Driver>(Driver::KEY).unwrap();
    let log = journal();

    let workers: Vec<_> = (0..4)
        .map(|i| {
            let driver = Arc::clone(&driver);
            let log = log.clone();
            std::thread::spawn(move || {
                driver.enqueue_on_main_thread(move || log.lock().push(format!("job:{i}")));
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert!(log.lock().is_empty());
    assert_eq!(driver.pending_count(), 4);

    driver.tick().unwrap();
    let mut ran = log.lock().clone();
    ran.sort();
    assert_eq!(ran, vec!["job:0", "job:1", "job:2", "job:3"]);
}
