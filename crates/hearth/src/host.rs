//! Boots an [`Application`] from settings and drives its scheduler from a
//! tokio interval on the main thread.
use std::sync::Arc;
use std::time::Duration;

use hearth_core::container::{Container, ContainerError, Factory, Instance};
use hearth_core::driver::{Driver, DriverProvider};
use hearth_core::event::EventsProvider;
use hearth_core::kernel::error::Result as KernelResult;
use hearth_core::kernel::{
    Application, KernelSettings, ProvidersBootstrap, ServiceProvider, SharedStage, StartBootstrap,
    provider_instance,
};

use core_logging::LoggingProvider;
use log::{debug, info};

use crate::heartbeat::{HEARTBEAT_KEY, Heartbeat, HeartbeatProvider};

/// Providers registered when the settings name none.
pub const DEFAULT_PROVIDERS: [&str; 4] = ["logging", "events", "driver", "heartbeat"];

fn provider_factory<P: ServiceProvider + Default + 'static>() -> Factory {
    Arc::new(|_: &Container, _: &[Instance]| Ok::<_, ContainerError>(provider_instance(P::default())))
}

/// Maps provider names from the settings to implementations.
pub fn find_provider(name: &str) -> Option<Factory> {
    match name {
        "logging" => Some(provider_factory::<LoggingProvider>()),
        "events" => Some(provider_factory::<EventsProvider>()),
        "driver" => Some(provider_factory::<DriverProvider>()),
        "heartbeat" => Some(provider_factory::<HeartbeatProvider>()),
        _ => None,
    }
}

pub fn with_default_providers(mut settings: KernelSettings) -> KernelSettings {
    if settings.providers.is_empty() {
        settings.providers = DEFAULT_PROVIDERS.iter().map(|p| p.to_string()).collect();
    }
    settings
}

#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub frames: u32,
    pub workers: usize,
}

/// Bootstrap, initialize, drive `frames` ticks, then terminate.
pub async fn run(settings: KernelSettings, options: RunOptions) -> KernelResult<()> {
    let app = Application::with_settings(settings);
    app.on_find_type(find_provider);

    let stages: Vec<SharedStage> = vec![Arc::new(ProvidersBootstrap), Arc::new(StartBootstrap)];
    app.bootstrap(&stages)?;
    app.init()?;

    let driver = app.make_as::<Driver>(Driver::KEY)?;

    let workers: Vec<_> = (0..options.workers)
        .map(|i| {
            let driver = driver.clone();
            tokio::task::spawn_blocking(move || {
                driver.enqueue_on_main_thread(move || {
                    println!("worker {i} reported on main thread");
                });
            })
        })
        .collect();
    for worker in workers {
        worker
            .await
            .map_err(|e| format!("worker task failed: {e}"))?;
    }
    debug!("{} action(s) queued by workers", driver.pending_count());

    let countdown = driver.enqueue_steps((1..=options.frames).rev().map(|n| {
        println!("countdown {n}");
    }));

    let period = Duration::from_secs_f64(1.0 / f64::from(app.settings().tick_rate_hz));
    let mut interval = tokio::time::interval(period);
    for _ in 0..options.frames {
        interval.tick().await;
        driver.tick()?;
        driver.late_tick()?;
    }

    if let Ok(heartbeat) = app.make_as::<Heartbeat>(HEARTBEAT_KEY) {
        info!("Heartbeat counted {} frame(s)", heartbeat.frames());
    }
    if countdown.is_live() {
        debug!("Countdown still running at shutdown");
    }

    app.terminate()?;
    Ok(())
}
