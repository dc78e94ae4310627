#![cfg(test)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::common::{journal, running_app, ticker_factory};
use crate::container::{Container, ContainerError, Factory, Instance};
use crate::driver::{Driver, DriverProvider};
use crate::event::{EventDispatcher, EventsProvider, ListenerOptions, Payload, SystemEvent};
use crate::kernel::error::Result as KernelResult;
use crate::kernel::{
    Application, KernelSettings, ProcessState, ProvidersBootstrap, ServiceProvider, SharedStage,
    StartBootstrap, provider_instance,
};

/// Counts the start-completed notifications it receives.
struct Greeter {
    greeted: Arc<AtomicUsize>,
}

impl ServiceProvider for Greeter {
    fn name(&self) -> &str {
        "greeter"
    }

    fn init(&self, app: &Application) -> KernelResult<()> {
        let greeted = self.greeted.clone();
        app.on(SystemEvent::StartCompleted.name(), move |_| {
            greeted.fetch_add(1, Ordering::SeqCst);
            Payload::none()
        })?;
        Ok(())
    }
}

fn provider_factory<P>(make: impl Fn() -> P + Send + Sync + 'static) -> Factory
where
    P: ServiceProvider + 'static,
{
    Arc::new(move |_: &Container, _: &[Instance]| Ok::<_, ContainerError>(provider_instance(make())))
}

#[test]
fn test_settings_driven_startup() {
    let settings = KernelSettings {
        providers: vec!["greeter".into(), "driver".into(), "events".into()],
        ..KernelSettings::default()
    };
    let app = Application::with_settings(settings);
    let greeted = Arc::new(AtomicUsize::new(0));
    let counter = greeted.clone();
    app.on_find_type(move |name| match name {
        "events" => Some(provider_factory(|| EventsProvider)),
        "driver" => Some(provider_factory(|| DriverProvider)),
        "greeter" => {
            let greeted = counter.clone();
            Some(provider_factory(move || Greeter {
                greeted: greeted.clone(),
            }))
        }
        _ => None,
    });

    let stages: Vec<SharedStage> = vec![Arc::new(ProvidersBootstrap), Arc::new(StartBootstrap)];
    app.bootstrap(&stages).unwrap();
    assert_eq!(app.process(), ProcessState::Bootstrapped);
    assert_eq!(app.provider_names(), vec!["greeter", "driver", "events"]);

    app.init().unwrap();
    assert_eq!(app.process(), ProcessState::Inited);
    assert_eq!(greeted.load(Ordering::SeqCst), 1);
    assert!(app.make_as::<Driver>(Driver::KEY).is_ok());
    assert!(app.make_as::<EventDispatcher>(EventDispatcher::KEY).is_ok());

    app.terminate().unwrap();
    assert!(app.is_terminated());
}

#[test]
fn test_unbound_names_resolve_through_the_type_finder() {
    let app = running_app().unwrap();
    let log = journal();
    let factory = ticker_factory("spawned", &log);
    app.on_find_type(move |name| (name == "spawned").then(|| factory.clone()));

    let driver = app.make_as::<Driver>(Driver::KEY).unwrap();
    let first = app.make("spawned").unwrap();
    let second = app.make("spawned").unwrap();
    assert!(!first.ptr_eq(&second));
    assert_eq!(driver.attached_count(), 2);

    let err = app.make("missing").unwrap_err();
    assert_eq!(err.kind(), crate::kernel::ErrorKind::NotFound);
}

#[test]
fn test_application_events_follow_priority() {
    let app = running_app().unwrap();
    let order = journal();

    for (priority, label) in [(200, "late"), (5, "early"), (100, "default")] {
        let order = order.clone();
        app.on_with(
            "score.changed",
            ListenerOptions::default().with_priority(priority),
            move |payload| {
                let score = payload.downcast_ref::<u32>().copied().unwrap_or_default();
                order.lock().push(format!("{label}:{score}"));
                Payload::new(label)
            },
        )
        .unwrap();
    }

    let response = app.trigger("score.changed", Payload::new(7u32)).unwrap();
    assert_eq!(response.len(), 3);
    assert_eq!(*order.lock(), vec!["early:7", "default:7", "late:7"]);

    let first = app
        .trigger_halt("score.changed", Payload::new(8u32))
        .unwrap()
        .unwrap();
    assert_eq!(first.downcast_ref::<&'static str>(), Some(&"early"));
}

#[test]
fn test_wildcard_listener_sees_application_events() {
    let app = running_app().unwrap();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = seen.clone();
    app.on("application.*", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Payload::none()
    })
    .unwrap();

    app.terminate().unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 1);
}
