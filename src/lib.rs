//! Device Inspector
//!
//! Inspects the host it runs on: identity, screen and terminal, hardware,
//! network, storage and navigation timing are gathered by independent,
//! individually contained probes and merged into one device record. A
//! sequential latency/download/upload speed test runs on request.

pub mod aggregator;
pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod host;
pub mod interactive;
pub mod logging;
pub mod models;
pub mod output;
pub mod probes;
pub mod speedtest;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use aggregator::{DeviceProbeAggregator, ProbeState};
pub use error::{AppError, Result};
pub use host::{HostEnvironment, KeyboardMonitor, NativeHost};
pub use models::{Config, DeviceRecord, SpeedTestResult};
pub use output::{ColoredFormatter, OutputFormatter, OutputFormatterFactory, PlainFormatter};
pub use speedtest::{RunOutcome, SpeedTestSequencer, SpeedTestState};
pub use types::{LatencyRating, ProbeKind, ProbeOutcome, SpeedRating};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build metadata recorded by build.rs
pub const BUILD_TIME: &str = env!("BUILD_TIME");
pub const TARGET_TRIPLE: &str = env!("TARGET_TRIPLE");
pub const GIT_COMMIT: Option<&str> = option_env!("GIT_COMMIT");

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_IP_LOOKUP_URL: &str = "https://api.ipify.org?format=json";
    pub const DEFAULT_GEO_LOOKUP_URL: &str = "https://ipapi.co/{ip}/json/";
    pub const DEFAULT_TRACE_URL: &str = "https://www.cloudflare.com/cdn-cgi/trace";
    pub const DEFAULT_DOWNLOAD_URL: &str = "https://speed.cloudflare.com/__down";
    pub const DEFAULT_UPLOAD_URL: &str = "https://httpbin.org/post";

    pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_LAN_DISCOVERY_WINDOW: Duration = Duration::from_secs(1);

    pub const DEFAULT_LATENCY_SAMPLES: u32 = 10;
    pub const DEFAULT_LATENCY_INTERVAL: Duration = Duration::from_millis(200);
    pub const DEFAULT_DOWNLOAD_BYTES: u64 = 50 * 1024 * 1024;
    pub const DEFAULT_UPLOAD_BYTES: u64 = 20 * 1024 * 1024;
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    pub const DEFAULT_ENABLE_COLOR: bool = true;
    pub const DEFAULT_RETRIES: u32 = 0;
}
