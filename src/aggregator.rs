//! Device probe aggregation
//!
//! Fires every probe concurrently, each in its own task with its own timeout,
//! and merges whatever comes back into one [`DeviceRecord`]. A probe that
//! errors, panics or hangs resolves to its fallback value; only a failure to
//! read the environment snapshot fails the run as a whole.

use crate::error::Result;
use crate::host::{HostEnvironment, KeyboardMonitor};
use crate::logging::{ErrorEventLogger, ProbeLogger};
use crate::models::{
    BrowserInfo, Config, DeviceRecord, NetworkInfo, OtherInfo, PerformanceInfo, SystemInfo, TimeInfo,
};
use crate::probes::{device, fingerprint, network, timing, IdentityParser};
use crate::types::{sentinel, Capability, ProbeKind, ProbeOutcome};
use chrono::Utc;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::timeout;

/// The one message shown when an aggregation run fails
pub const DEVICE_ERROR_MESSAGE: &str = "Failed to fetch device information. Please try again.";

/// Published lifecycle of the most recently completed run
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeState {
    Loading,
    Ready(Box<DeviceRecord>),
    Failed(String),
}

impl ProbeState {
    pub fn record(&self) -> Option<&DeviceRecord> {
        match self {
            Self::Ready(record) => Some(record.as_ref()),
            _ => None,
        }
    }
}

pub struct DeviceProbeAggregator {
    host: Arc<dyn HostEnvironment>,
    keyboard: KeyboardMonitor,
    identity: IdentityParser,
    probe_timeout: Duration,
    lan_window: Duration,
    state: watch::Sender<ProbeState>,
    probe_logger: ProbeLogger,
    error_logger: ErrorEventLogger,
}

impl DeviceProbeAggregator {
    pub fn new(host: Arc<dyn HostEnvironment>, keyboard: KeyboardMonitor, config: &Config) -> Result<Self> {
        let (state, _) = watch::channel(ProbeState::Loading);
        Ok(Self {
            host,
            keyboard,
            identity: IdentityParser::new()?,
            probe_timeout: config.probe_timeout(),
            lan_window: config.lan_discovery_window(),
            state,
            probe_logger: ProbeLogger::new(config),
            error_logger: ErrorEventLogger::new(config),
        })
    }

    /// Replace the default loggers, e.g. with ones sharing a session ID
    pub fn with_loggers(mut self, probe_logger: ProbeLogger, error_logger: ErrorEventLogger) -> Self {
        self.probe_logger = probe_logger;
        self.error_logger = error_logger;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<ProbeState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ProbeState {
        self.state.borrow().clone()
    }

    /// Run every probe and publish the merged record.
    ///
    /// Overlapping runs are not serialized; each publishes when it finishes.
    pub async fn run(&self) -> Result<DeviceRecord> {
        self.state.send_replace(ProbeState::Loading);
        let logger = self.probe_logger.logger();
        let correlation_id = logger.start_operation("device aggregation").await;
        let started = Instant::now();

        match self.collect().await {
            Ok((record, unavailable)) => {
                let elapsed = started.elapsed();
                self.probe_logger
                    .log_aggregation_summary(&correlation_id, ProbeKind::ALL.len(), unavailable, elapsed)
                    .await;
                logger.end_operation(&correlation_id, "device aggregation", true, elapsed).await;
                self.state.send_replace(ProbeState::Ready(Box::new(record.clone())));
                Ok(record)
            }
            Err(e) => {
                self.error_logger
                    .log_error(&e, Some("device aggregation"), Some(&correlation_id))
                    .await;
                logger
                    .end_operation(&correlation_id, "device aggregation", false, started.elapsed())
                    .await;
                self.state.send_replace(ProbeState::Failed(DEVICE_ERROR_MESSAGE.to_string()));
                Err(e)
            }
        }
    }

    /// Manual retry: a full re-run from a clean state
    pub async fn retry(&self) -> Result<DeviceRecord> {
        self.run().await
    }

    fn host(&self) -> Arc<dyn HostEnvironment> {
        Arc::clone(&self.host)
    }

    async fn collect(&self) -> Result<(DeviceRecord, usize)> {
        let snapshot = self.host.snapshot()?;
        let keys = self.keyboard.snapshot();
        let identity = self.identity.parse(&snapshot.user_agent);
        let hostname = snapshot.hostname.clone();
        let lan_window = self.lan_window;
        let lookup_timeout = self.probe_timeout;

        let (
            cache,
            extensions,
            ad_blocker,
            content_filtering,
            resistance,
            battery,
            gpu,
            speakers,
            bluetooth,
            direction,
            device_motion,
            network_info,
            performance,
            canvas,
            audio_context,
            web_rtc,
            web_gl,
            http_version,
            tls_version,
            cipher,
        ) = tokio::join!(
            self.contain(ProbeKind::Cache, {
                let host = self.host();
                async move { device::cache(host.as_ref()).await }
            }),
            self.contain(ProbeKind::Extensions, {
                let host = self.host();
                async move { device::extensions(host.as_ref()).await }
            }),
            self.contain(ProbeKind::AdBlocker, {
                let host = self.host();
                async move { device::ad_blocker(host.as_ref()).await }
            }),
            self.contain(ProbeKind::ContentFiltering, {
                let host = self.host();
                async move { device::content_filtering(host.as_ref()).await }
            }),
            self.contain(ProbeKind::FingerprintingResistance, {
                let host = self.host();
                async move { Ok(fingerprint::fingerprinting_resistance(host.as_ref())) }
            }),
            self.contain(ProbeKind::Battery, {
                let host = self.host();
                async move { device::battery(host.as_ref()).await }
            }),
            self.contain(ProbeKind::Gpu, {
                let host = self.host();
                async move { device::gpu(host.as_ref()).await }
            }),
            self.contain(ProbeKind::Speakers, {
                let host = self.host();
                async move { device::speakers(host.as_ref()).await }
            }),
            self.contain(ProbeKind::Bluetooth, {
                let host = self.host();
                async move { Ok(device::capability(host.as_ref(), Capability::Bluetooth)) }
            }),
            self.contain(ProbeKind::Direction, {
                let host = self.host();
                async move { Ok(device::capability(host.as_ref(), Capability::DeviceOrientation)) }
            }),
            self.contain(ProbeKind::DeviceMotion, {
                let host = self.host();
                async move { Ok(device::capability(host.as_ref(), Capability::DeviceMotion)) }
            }),
            self.contain_within(ProbeKind::Network, self.network_budget(), {
                let host = self.host();
                let hostname = hostname.clone();
                async move { network::network_info(host.as_ref(), hostname, lookup_timeout, lan_window).await }
            }),
            self.contain(ProbeKind::Performance, {
                let host = self.host();
                async move { timing::performance(host.as_ref()) }
            }),
            self.contain(ProbeKind::CanvasFingerprint, {
                let host = self.host();
                async move { Ok(fingerprint::canvas_fingerprint(host.as_ref())) }
            }),
            self.contain(ProbeKind::AudioContext, {
                let host = self.host();
                async move { device::audio_context(host.as_ref()).await }
            }),
            self.contain(ProbeKind::WebRtc, {
                let host = self.host();
                async move { Ok(device::capability(host.as_ref(), Capability::MediaCapture)) }
            }),
            self.contain(ProbeKind::WebGl, {
                let host = self.host();
                async move { device::web_gl(host.as_ref()).await }
            }),
            self.contain(ProbeKind::HttpVersion, {
                let host = self.host();
                async move { device::http_version(host.as_ref()).await }
            }),
            self.contain(ProbeKind::TlsVersion, {
                let host = self.host();
                async move { device::tls_version(host.as_ref()).await }
            }),
            self.contain(ProbeKind::Cipher, {
                let host = self.host();
                async move { device::cipher(host.as_ref()).await }
            }),
        );

        let unavailable = [
            cache.is_ok(),
            extensions.is_ok(),
            ad_blocker.is_ok(),
            content_filtering.is_ok(),
            resistance.is_ok(),
            battery.is_ok(),
            gpu.is_ok(),
            speakers.is_ok(),
            bluetooth.is_ok(),
            direction.is_ok(),
            device_motion.is_ok(),
            network_info.is_ok(),
            performance.is_ok(),
            canvas.is_ok(),
            audio_context.is_ok(),
            web_rtc.is_ok(),
            web_gl.is_ok(),
            http_version.is_ok(),
            tls_version.is_ok(),
            cipher.is_ok(),
        ]
        .iter()
        .filter(|ok| !**ok)
        .count();

        let text = |outcome: ProbeOutcome<String>, kind: ProbeKind| {
            outcome.unwrap_or_else(|| kind.fallback_text().to_string())
        };
        let collected_at = Utc::now();

        let record = DeviceRecord {
            browser: BrowserInfo {
                name: identity.name,
                version: identity.version,
                user_agent: snapshot.user_agent,
                language: snapshot.language,
                cookies_enabled: snapshot.cookies_enabled,
                do_not_track: snapshot.do_not_track,
                cache: text(cache, ProbeKind::Cache),
                plugins: snapshot.plugins,
                extensions: extensions.unwrap_or_else(|| vec![sentinel::NOT_AVAILABLE.to_string()]),
                ad_blocker: text(ad_blocker, ProbeKind::AdBlocker),
                content_filtering: text(content_filtering, ProbeKind::ContentFiltering),
                fingerprinting_resistance: text(resistance, ProbeKind::FingerprintingResistance),
                last_key_pressed: keys.last_key,
                caps_lock: keys.caps_lock,
            },
            screen: snapshot.screen,
            system: SystemInfo {
                platform: snapshot.platform,
                cores: snapshot.cores,
                memory: snapshot.memory_gb.map(|gb| format!("{} GB", gb)),
                connection: snapshot.connection,
                battery: battery.ok().flatten(),
                gpu: text(gpu, ProbeKind::Gpu),
                speakers: text(speakers, ProbeKind::Speakers),
                bluetooth: text(bluetooth, ProbeKind::Bluetooth),
                direction: text(direction, ProbeKind::Direction),
                device_motion: text(device_motion, ProbeKind::DeviceMotion),
                mouse: device::supported(snapshot.pointer),
                touchscreen: device::supported(snapshot.touch),
                speech_synthesis: device::supported(snapshot.speech_synthesis),
            },
            network: network_info.unwrap_or_else(|| NetworkInfo::unavailable(hostname)),
            time: TimeInfo::at(collected_at),
            storage: snapshot.storage,
            performance: performance.unwrap_or_else(PerformanceInfo::unavailable),
            other: OtherInfo {
                canvas_fingerprint: text(canvas, ProbeKind::CanvasFingerprint),
                audio_context: text(audio_context, ProbeKind::AudioContext),
                web_rtc: text(web_rtc, ProbeKind::WebRtc),
                web_gl: text(web_gl, ProbeKind::WebGl),
                window_size: snapshot
                    .window_size
                    .map(|(w, h)| format!("{}x{}", w, h))
                    .unwrap_or_else(|| sentinel::NOT_AVAILABLE.to_string()),
                http_version: text(http_version, ProbeKind::HttpVersion),
                tls_version: text(tls_version, ProbeKind::TlsVersion),
                cipher: text(cipher, ProbeKind::Cipher),
                page_referrer: snapshot.referrer.unwrap_or_else(|| sentinel::NOT_AVAILABLE.to_string()),
            },
            collected_at,
        };

        Ok((record, unavailable))
    }

    /// The network probe bounds its lookups and its LAN window separately;
    /// the outer guard only has to cover both.
    fn network_budget(&self) -> Duration {
        self.probe_timeout + self.lan_window
    }

    async fn contain<T, F>(&self, kind: ProbeKind, probe: F) -> ProbeOutcome<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        self.contain_within(kind, self.probe_timeout, probe).await
    }

    /// Run one probe in its own task under `budget`.
    ///
    /// Errors, panics and timeouts all become `Unavailable`; the task is
    /// aborted when the timeout fires.
    async fn contain_within<T, F>(&self, kind: ProbeKind, budget: Duration, probe: F) -> ProbeOutcome<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let started = Instant::now();
        let mut handle = tokio::spawn(probe);

        let outcome = match timeout(budget, &mut handle).await {
            Ok(Ok(result)) => ProbeOutcome::from(result),
            Ok(Err(join_error)) if join_error.is_panic() => {
                ProbeOutcome::unavailable(format!("panicked: {}", panic_message(join_error.into_panic())))
            }
            Ok(Err(_)) => ProbeOutcome::unavailable("cancelled"),
            Err(_) => {
                handle.abort();
                ProbeOutcome::unavailable(format!("timed out after {}ms", budget.as_millis()))
            }
        };

        let elapsed = started.elapsed();
        match outcome.reason() {
            Some(reason) => self.probe_logger.log_probe_unavailable(kind, reason, elapsed).await,
            None => self.probe_logger.log_probe_success(kind, elapsed).await,
        }
        outcome
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
