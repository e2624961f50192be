//! Scriptable host double for probe and aggregator tests

use super::{
    BatteryStatus, Bitmap, BlockedCanvas, CandidateSession, Canvas2d, EnvironmentSnapshot, GeoLocation,
    GraphicsAccess, HostEnvironment, Rgba, StorageEstimate,
};
use crate::error::{AppError, Result};
use crate::models::{NavigationTiming, ScreenInfo, StorageInfo};
use crate::probes::fingerprint::{FINGERPRINT_TEXT, RESISTANCE_TEXT};
use crate::types::{Capability, ProbeKind};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;

/// How an injected probe failure manifests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Error,
    Panic,
    Hang,
}

/// What local candidate gathering produces
#[derive(Debug, Clone)]
pub enum CandidateScript {
    Lines(Vec<String>),
    Silent,
    SetupFails,
}

pub struct FakeHost {
    failure: Option<(ProbeKind, Failure)>,
    snapshot_fails: AtomicBool,
    canvas: Option<bool>,
    storage: Option<StorageEstimate>,
    battery: Option<BatteryStatus>,
    graphics: GraphicsAccess,
    address_fails: bool,
    geolocation_fails: bool,
    candidates: CandidateScript,
    navigation: Option<NavigationTiming>,
    protocol_details: bool,
}

impl FakeHost {
    /// Every facility present and answering
    pub fn healthy() -> Self {
        Self {
            failure: None,
            snapshot_fails: AtomicBool::new(false),
            canvas: Some(false),
            storage: Some(StorageEstimate {
                usage_bytes: 10 * 1024 * 1024,
                quota_bytes: 100 * 1024 * 1024,
            }),
            battery: Some(BatteryStatus { level: 0.5, charging: true }),
            graphics: GraphicsAccess::Detailed {
                vendor: "Acme".to_string(),
                renderer: "Acme R1".to_string(),
            },
            address_fails: false,
            geolocation_fails: false,
            candidates: CandidateScript::Lines(vec!["candidate:1 1 udp 2122260223 10.0.0.5 54321 typ host".to_string()]),
            navigation: Some(NavigationTiming {
                navigation_start: 1_000,
                fetch_start: 1_005,
                domain_lookup_start: 1_010,
                domain_lookup_end: 1_030,
                connect_start: 1_030,
                connect_end: 1_075,
                request_start: 1_080,
                response_start: 1_200,
                response_end: 1_260,
                dom_loading: 1_270,
            }),
            protocol_details: true,
        }
    }

    pub fn failing(mut self, kind: ProbeKind, failure: Failure) -> Self {
        self.failure = Some((kind, failure));
        self
    }

    pub fn set_snapshot_failure(&self, fails: bool) {
        self.snapshot_fails.store(fails, Ordering::SeqCst);
    }

    pub fn with_blocked_canvas(mut self) -> Self {
        self.canvas = Some(true);
        self
    }

    pub fn without_canvas(mut self) -> Self {
        self.canvas = None;
        self
    }

    pub fn with_storage(mut self, storage: Option<StorageEstimate>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_battery(mut self, battery: Option<BatteryStatus>) -> Self {
        self.battery = battery;
        self
    }

    pub fn with_graphics(mut self, graphics: GraphicsAccess) -> Self {
        self.graphics = graphics;
        self
    }

    pub fn with_failed_address_lookup(mut self) -> Self {
        self.address_fails = true;
        self
    }

    pub fn with_failed_geolocation(mut self) -> Self {
        self.geolocation_fails = true;
        self
    }

    pub fn with_candidates(mut self, candidates: CandidateScript) -> Self {
        self.candidates = candidates;
        self
    }

    pub fn without_navigation_timing(mut self) -> Self {
        self.navigation = None;
        self
    }

    pub fn without_protocol_details(mut self) -> Self {
        self.protocol_details = false;
        self
    }

    fn injected(&self, kind: ProbeKind) -> Option<Failure> {
        match self.failure {
            Some((failing, mode)) if failing == kind => Some(mode),
            _ => None,
        }
    }

    async fn trip(&self, kind: ProbeKind) -> Result<()> {
        match self.injected(kind) {
            Some(Failure::Error) => Err(AppError::probe(format!("injected {} failure", kind))),
            Some(Failure::Panic) => panic!("injected {} panic", kind),
            Some(Failure::Hang) => std::future::pending().await,
            None => Ok(()),
        }
    }

    /// Synchronous facilities can only fail by panicking
    fn trip_sync(&self, kind: ProbeKind) {
        if self.injected(kind).is_some() {
            panic!("injected {} panic", kind);
        }
    }
}

/// Canvas that panics when asked to draw one particular text
struct TrippingCanvas {
    inner: Box<dyn Canvas2d>,
    poison: Option<&'static str>,
}

impl Canvas2d for TrippingCanvas {
    fn width(&self) -> u32 {
        self.inner.width()
    }

    fn height(&self) -> u32 {
        self.inner.height()
    }

    fn set_font(&mut self, font: &str) {
        self.inner.set_font(font)
    }

    fn set_fill_style(&mut self, color: Rgba) {
        self.inner.set_fill_style(color)
    }

    fn fill_rect(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.inner.fill_rect(x, y, width, height)
    }

    fn fill_text(&mut self, text: &str, x: i32, y: i32) {
        if self.poison == Some(text) {
            panic!("injected canvas panic drawing {:?}", text);
        }
        self.inner.fill_text(text, x, y)
    }

    fn serialize(&self) -> String {
        self.inner.serialize()
    }
}

#[async_trait]
impl HostEnvironment for FakeHost {
    fn snapshot(&self) -> Result<EnvironmentSnapshot> {
        if self.snapshot_fails.load(Ordering::SeqCst) {
            return Err(AppError::aggregation("environment snapshot unavailable"));
        }
        Ok(EnvironmentSnapshot {
            user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:88.0) Gecko/20100101 Firefox/88.0".to_string(),
            language: "en-US".to_string(),
            cookies_enabled: true,
            do_not_track: Some("1".to_string()),
            plugins: vec!["PDF Viewer".to_string()],
            screen: ScreenInfo {
                width: Some(1920),
                height: Some(1080),
                color_depth: Some(24),
                orientation: "landscape-primary".to_string(),
                pixel_ratio: Some(1.0),
                touch_screen: false,
            },
            platform: "Linux x86_64".to_string(),
            cores: 8,
            memory_gb: Some(16),
            connection: Some("4g (10 Mbps)".to_string()),
            pointer: true,
            touch: false,
            speech_synthesis: false,
            storage: StorageInfo {
                local_storage: true,
                session_storage: true,
                indexed_db: true,
            },
            window_size: Some((1280, 720)),
            referrer: None,
            hostname: Some("fakehost".to_string()),
        })
    }

    fn has_capability(&self, capability: Capability) -> bool {
        let kind = match capability {
            Capability::Bluetooth => ProbeKind::Bluetooth,
            Capability::DeviceOrientation => ProbeKind::Direction,
            Capability::DeviceMotion => ProbeKind::DeviceMotion,
            Capability::MediaCapture => ProbeKind::WebRtc,
        };
        self.trip_sync(kind);
        true
    }

    fn create_canvas(&self, width: u32, height: u32) -> Option<Box<dyn Canvas2d>> {
        let blocked = self.canvas?;
        let inner: Box<dyn Canvas2d> = if blocked {
            Box::new(BlockedCanvas::new(width, height))
        } else {
            Box::new(Bitmap::new(width, height))
        };
        let poison = match self.failure {
            Some((ProbeKind::CanvasFingerprint, _)) => Some(FINGERPRINT_TEXT),
            Some((ProbeKind::FingerprintingResistance, _)) => Some(RESISTANCE_TEXT),
            _ => None,
        };
        Some(Box::new(TrippingCanvas { inner, poison }))
    }

    fn navigation_timing(&self) -> Option<NavigationTiming> {
        self.trip_sync(ProbeKind::Performance);
        self.navigation
    }

    fn now_ms(&self) -> i64 {
        2_000
    }

    async fn storage_estimate(&self) -> Result<Option<StorageEstimate>> {
        self.trip(ProbeKind::Cache).await?;
        Ok(self.storage)
    }

    async fn extensions(&self) -> Result<Vec<String>> {
        self.trip(ProbeKind::Extensions).await?;
        Ok(vec!["Extension access restricted".to_string()])
    }

    async fn ad_bait_blocked(&self) -> Result<bool> {
        self.trip(ProbeKind::AdBlocker).await?;
        Ok(true)
    }

    async fn content_filtering(&self) -> Result<String> {
        self.trip(ProbeKind::ContentFiltering).await?;
        Ok("Filtering unknown".to_string())
    }

    async fn battery(&self) -> Result<Option<BatteryStatus>> {
        self.trip(ProbeKind::Battery).await?;
        Ok(self.battery)
    }

    async fn gpu_renderer(&self) -> Result<GraphicsAccess> {
        self.trip(ProbeKind::Gpu).await?;
        Ok(self.graphics.clone())
    }

    async fn webgl_info(&self) -> Result<GraphicsAccess> {
        self.trip(ProbeKind::WebGl).await?;
        Ok(self.graphics.clone())
    }

    async fn audio_outputs(&self) -> Result<usize> {
        self.trip(ProbeKind::Speakers).await?;
        Ok(2)
    }

    async fn open_audio_context(&self) -> Result<()> {
        self.trip(ProbeKind::AudioContext).await
    }

    async fn public_address(&self) -> Result<String> {
        self.trip(ProbeKind::Network).await?;
        if self.address_fails {
            return Err(AppError::network("address lookup refused"));
        }
        Ok("203.0.113.9".to_string())
    }

    async fn geolocate(&self, _ip: &str) -> Result<GeoLocation> {
        if self.geolocation_fails {
            return Err(AppError::http_request("Geolocation service error: RateLimited"));
        }
        Ok(GeoLocation {
            org: Some("Example ISP".to_string()),
            latitude: Some(48.85),
            longitude: Some(2.35),
            proxy: false,
        })
    }

    async fn gather_candidates(&self) -> Result<CandidateSession> {
        match &self.candidates {
            CandidateScript::Lines(lines) => {
                let (tx, rx) = mpsc::channel(lines.len().max(1));
                for line in lines {
                    let _ = tx.try_send(line.clone());
                }
                Ok(CandidateSession::from_receiver(rx))
            }
            CandidateScript::Silent => {
                let (tx, rx) = mpsc::channel::<String>(1);
                let producer = tokio::spawn(async move {
                    let _tx = tx;
                    std::future::pending::<()>().await;
                });
                Ok(CandidateSession::new(rx, producer))
            }
            CandidateScript::SetupFails => Err(AppError::network("candidate gathering refused")),
        }
    }

    async fn http_version(&self) -> Result<Option<String>> {
        self.trip(ProbeKind::HttpVersion).await?;
        Ok(self.protocol_details.then(|| "HTTP/2".to_string()))
    }

    async fn tls_version(&self) -> Result<Option<String>> {
        self.trip(ProbeKind::TlsVersion).await?;
        Ok(self.protocol_details.then(|| "TLSv1.3".to_string()))
    }

    async fn cipher_suite(&self) -> Result<Option<String>> {
        self.trip(ProbeKind::Cipher).await?;
        Ok(self.protocol_details.then(|| "TLS_AES_128_GCM_SHA256".to_string()))
    }
}
