//! Type definitions and aliases

use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Placeholder values substituted when a probe cannot produce a real value
pub mod sentinel {
    pub const NOT_AVAILABLE: &str = "Not available";
    pub const NOT_SUPPORTED: &str = "Not supported";
    pub const SUPPORTED: &str = "Supported";
    pub const DETECTED: &str = "Detected";
    pub const NOT_DETECTED: &str = "Not detected";
    pub const UNKNOWN: &str = "Unknown";
    pub const SERVER_SIDE_ONLY: &str = "Detection requires server-side information";
}

/// Result of a single contained probe: either a value or the reason it is unavailable
#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome<T> {
    Ok(T),
    Unavailable(String),
}

impl<T> ProbeOutcome<T> {
    pub fn unavailable<S: Into<String>>(reason: S) -> Self {
        Self::Unavailable(reason.into())
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    /// Reason the probe could not produce a value
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Ok(_) => None,
            Self::Unavailable(reason) => Some(reason),
        }
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Self::Ok(value) => Some(value),
            Self::Unavailable(_) => None,
        }
    }

    pub fn unwrap_or(self, fallback: T) -> T {
        self.ok().unwrap_or(fallback)
    }

    pub fn unwrap_or_else<F: FnOnce() -> T>(self, fallback: F) -> T {
        self.ok().unwrap_or_else(fallback)
    }
}

impl<T> From<Result<T>> for ProbeOutcome<T> {
    fn from(result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Ok(value),
            Err(e) => Self::Unavailable(e.to_string()),
        }
    }
}

/// The independently contained probes fired by the device aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProbeKind {
    Cache,
    Extensions,
    AdBlocker,
    ContentFiltering,
    FingerprintingResistance,
    Battery,
    Gpu,
    Speakers,
    Bluetooth,
    Direction,
    DeviceMotion,
    Network,
    Performance,
    CanvasFingerprint,
    AudioContext,
    WebRtc,
    WebGl,
    HttpVersion,
    TlsVersion,
    Cipher,
}

impl ProbeKind {
    pub const ALL: [ProbeKind; 20] = [
        ProbeKind::Cache,
        ProbeKind::Extensions,
        ProbeKind::AdBlocker,
        ProbeKind::ContentFiltering,
        ProbeKind::FingerprintingResistance,
        ProbeKind::Battery,
        ProbeKind::Gpu,
        ProbeKind::Speakers,
        ProbeKind::Bluetooth,
        ProbeKind::Direction,
        ProbeKind::DeviceMotion,
        ProbeKind::Network,
        ProbeKind::Performance,
        ProbeKind::CanvasFingerprint,
        ProbeKind::AudioContext,
        ProbeKind::WebRtc,
        ProbeKind::WebGl,
        ProbeKind::HttpVersion,
        ProbeKind::TlsVersion,
        ProbeKind::Cipher,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Extensions => "extensions",
            Self::AdBlocker => "ad_blocker",
            Self::ContentFiltering => "content_filtering",
            Self::FingerprintingResistance => "fingerprinting_resistance",
            Self::Battery => "battery",
            Self::Gpu => "gpu",
            Self::Speakers => "speakers",
            Self::Bluetooth => "bluetooth",
            Self::Direction => "direction",
            Self::DeviceMotion => "device_motion",
            Self::Network => "network",
            Self::Performance => "performance",
            Self::CanvasFingerprint => "canvas_fingerprint",
            Self::AudioContext => "audio_context",
            Self::WebRtc => "web_rtc",
            Self::WebGl => "web_gl",
            Self::HttpVersion => "http_version",
            Self::TlsVersion => "tls_version",
            Self::Cipher => "cipher",
        }
    }

    /// Text shown in place of a string-valued probe that failed
    pub fn fallback_text(&self) -> &'static str {
        match self {
            Self::Speakers => "Access denied or not available",
            Self::Bluetooth | Self::Direction | Self::DeviceMotion
            | Self::AudioContext | Self::WebRtc => sentinel::NOT_SUPPORTED,
            _ => sentinel::NOT_AVAILABLE,
        }
    }
}

impl fmt::Display for ProbeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Binary presence checks against named host facilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Bluetooth,
    DeviceOrientation,
    DeviceMotion,
    MediaCapture,
}

/// Throughput classification, thresholds in Mbps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpeedRating {
    Slow,
    Moderate,
    Good,
    Fast,
    VeryFast,
}

impl SpeedRating {
    const THRESHOLDS: [(f64, SpeedRating); 4] = [
        (5.0, SpeedRating::Slow),
        (25.0, SpeedRating::Moderate),
        (50.0, SpeedRating::Good),
        (100.0, SpeedRating::Fast),
    ];

    /// First threshold the value stays below wins; bounds are half-open
    pub fn from_mbps(mbps: f64) -> Self {
        Self::THRESHOLDS
            .iter()
            .find(|(limit, _)| mbps < *limit)
            .map(|(_, rating)| *rating)
            .unwrap_or(SpeedRating::VeryFast)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Slow => "Slow",
            Self::Moderate => "Moderate",
            Self::Good => "Good",
            Self::Fast => "Fast",
            Self::VeryFast => "Very Fast",
        }
    }
}

impl fmt::Display for SpeedRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latency classification, thresholds in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LatencyRating {
    Excellent,
    Good,
    Average,
    Poor,
    Bad,
}

impl LatencyRating {
    const THRESHOLDS: [(f64, LatencyRating); 4] = [
        (20.0, LatencyRating::Excellent),
        (50.0, LatencyRating::Good),
        (100.0, LatencyRating::Average),
        (150.0, LatencyRating::Poor),
    ];

    pub fn from_ms(ms: f64) -> Self {
        Self::THRESHOLDS
            .iter()
            .find(|(limit, _)| ms < *limit)
            .map(|(_, rating)| *rating)
            .unwrap_or(LatencyRating::Bad)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Average => "Average",
            Self::Poor => "Poor",
            Self::Bad => "Bad",
        }
    }
}

impl fmt::Display for LatencyRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
