//! Host environment abstraction
//!
//! Every probe reads the machine through [`HostEnvironment`]. The native
//! implementation inspects the local system; tests substitute doubles that
//! fail or panic on demand.

pub mod candidates;
pub mod canvas;
pub mod keyboard;
pub mod native;

#[cfg(test)]
pub mod fake;

pub use candidates::CandidateSession;
pub use canvas::{blank_baseline, Bitmap, BlockedCanvas, Canvas2d, Rgba};
pub use keyboard::{KeyboardGuard, KeyboardMonitor, KeyboardState};
pub use native::NativeHost;

use crate::models::{NavigationTiming, ScreenInfo, StorageInfo};
use crate::types::{Capability, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Synchronous facts about the host, read in one pass before probing
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentSnapshot {
    pub user_agent: String,
    pub language: String,
    pub cookies_enabled: bool,
    pub do_not_track: Option<String>,
    pub plugins: Vec<String>,
    pub screen: ScreenInfo,
    pub platform: String,
    pub cores: u32,
    pub memory_gb: Option<u64>,
    pub connection: Option<String>,
    pub pointer: bool,
    pub touch: bool,
    pub speech_synthesis: bool,
    pub storage: StorageInfo,
    pub window_size: Option<(u32, u32)>,
    pub referrer: Option<String>,
    pub hostname: Option<String>,
}

/// Storage usage and quota in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageEstimate {
    pub usage_bytes: u64,
    pub quota_bytes: u64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryStatus {
    /// Charge level in `0.0..=1.0`
    pub level: f64,
    pub charging: bool,
}

/// What the graphics stack is willing to disclose
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphicsAccess {
    Unsupported,
    Restricted,
    Detailed { vendor: String, renderer: String },
}

/// Geolocation/ISP facts reported for a public address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub proxy: bool,
}

/// The machine the probes inspect
#[async_trait]
pub trait HostEnvironment: Send + Sync {
    /// Read the synchronous environment facts; failure here fails the whole aggregation
    fn snapshot(&self) -> Result<EnvironmentSnapshot>;

    fn has_capability(&self, capability: Capability) -> bool;

    /// Offscreen 2-D surface, `None` when the host has no 2-D drawing support
    fn create_canvas(&self, width: u32, height: u32) -> Option<Box<dyn Canvas2d>>;

    /// Page fetch milestones, `None` when the host does not record them
    fn navigation_timing(&self) -> Option<NavigationTiming>;

    /// Current wall clock in epoch milliseconds
    fn now_ms(&self) -> i64;

    async fn storage_estimate(&self) -> Result<Option<StorageEstimate>>;

    async fn extensions(&self) -> Result<Vec<String>>;

    /// Whether a bait element that blockers target was hidden or refused
    async fn ad_bait_blocked(&self) -> Result<bool>;

    async fn content_filtering(&self) -> Result<String>;

    async fn battery(&self) -> Result<Option<BatteryStatus>>;

    /// Renderer string for the GPU probe
    async fn gpu_renderer(&self) -> Result<GraphicsAccess>;

    /// Vendor and renderer for the graphics API probe
    async fn webgl_info(&self) -> Result<GraphicsAccess>;

    async fn audio_outputs(&self) -> Result<usize>;

    /// Construct and immediately release an audio processing context
    async fn open_audio_context(&self) -> Result<()>;

    async fn public_address(&self) -> Result<String>;

    async fn geolocate(&self, ip: &str) -> Result<GeoLocation>;

    /// Start local candidate gathering with no remote peer
    async fn gather_candidates(&self) -> Result<CandidateSession>;

    async fn http_version(&self) -> Result<Option<String>>;

    async fn tls_version(&self) -> Result<Option<String>>;

    async fn cipher_suite(&self) -> Result<Option<String>>;
}
