/// Application name
pub const APP_NAME: &str = "Hearth";

/// Kernel version, checked against provider requirements
pub const KERNEL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Priority given to providers that do not choose one (lower runs first)
pub const DEFAULT_PRIORITY: i32 = 100;

/// Priority of the built-in events provider
pub const EVENTS_PROVIDER_PRIORITY: i32 = 10;

/// Priority of the built-in driver provider
pub const DRIVER_PROVIDER_PRIORITY: i32 = 20;

/// Environment variable holding the log filter directive
pub const ENV_LOG: &str = "HEARTH_LOG";

/// Log filter used when neither the environment nor the settings set one
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Frames per second the host drives the scheduler at
pub const DEFAULT_TICK_RATE_HZ: u32 = 60;
