//! Configuration data model and validation

use crate::types::{Result, AppError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest transfer the speed test will attempt in either direction
pub const MAX_TRANSFER_BYTES: u64 = 1024 * 1024 * 1024;

/// Placeholder substituted with the resolved public address in the geolocation URL
pub const IP_PLACEHOLDER: &str = "{ip}";

/// Main application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Service returning the caller's public address as `{"ip": "..."}`
    #[serde(default = "default_ip_lookup_url")]
    pub ip_lookup_url: String,

    /// Geolocation/ISP service; `{ip}` is replaced with the public address
    #[serde(default = "default_geo_lookup_url")]
    pub geo_lookup_url: String,

    /// Lightweight endpoint used only for round-trip sampling
    #[serde(default = "default_trace_url")]
    pub trace_url: String,

    /// Fixed-size payload endpoint accepting a `bytes` query parameter
    #[serde(default = "default_download_url")]
    pub download_url: String,

    /// Form-data echo endpoint for the upload phase
    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    /// Page whose fetch milestones feed the navigation timing probe
    #[serde(default)]
    pub page_url: Option<String>,

    /// Identity string override; the host default is used when unset
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Upper bound for any single device probe
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Wait window for local address candidates
    #[serde(default = "default_lan_window_ms")]
    pub lan_discovery_window_ms: u64,

    /// Number of round-trip samples in the latency phase
    #[serde(default = "default_latency_samples")]
    pub latency_samples: u32,

    /// Pause between consecutive round-trip samples
    #[serde(default = "default_latency_interval_ms")]
    pub latency_interval_ms: u64,

    /// Payload size requested in the download phase
    #[serde(default = "default_download_bytes")]
    pub download_bytes: u64,

    /// Payload size generated for the upload phase
    #[serde(default = "default_upload_bytes")]
    pub upload_bytes: u64,

    /// HTTP timeout for speed test transfers
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_seconds: u64,

    /// Serialize blank canvases, as a fingerprint-resistant host would
    #[serde(default)]
    pub resist_fingerprinting: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Emit JSON instead of formatted text
    #[serde(default)]
    pub json_output: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ip_lookup_url: default_ip_lookup_url(),
            geo_lookup_url: default_geo_lookup_url(),
            trace_url: default_trace_url(),
            download_url: default_download_url(),
            upload_url: default_upload_url(),
            page_url: None,
            user_agent: None,
            probe_timeout_ms: default_probe_timeout_ms(),
            lan_discovery_window_ms: default_lan_window_ms(),
            latency_samples: default_latency_samples(),
            latency_interval_ms: default_latency_interval_ms(),
            download_bytes: default_download_bytes(),
            upload_bytes: default_upload_bytes(),
            request_timeout_seconds: default_request_timeout_secs(),
            resist_fingerprinting: false,
            enable_color: default_enable_color(),
            json_output: false,
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn lan_discovery_window(&self) -> Duration {
        Duration::from_millis(self.lan_discovery_window_ms)
    }

    pub fn latency_interval(&self) -> Duration {
        Duration::from_millis(self.latency_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Geolocation URL for a resolved public address
    pub fn geo_lookup_url_for(&self, ip: &str) -> String {
        self.geo_lookup_url.replace(IP_PLACEHOLDER, ip)
    }

    /// Validate the configuration and return the first error found
    pub fn validate(&self) -> Result<()> {
        let endpoints = [
            ("IP lookup", &self.ip_lookup_url),
            ("geolocation lookup", &self.geo_lookup_url),
            ("trace", &self.trace_url),
            ("download", &self.download_url),
            ("upload", &self.upload_url),
        ];
        for (label, url) in endpoints {
            validate_http_url(label, url)?;
        }

        if !self.geo_lookup_url.contains(IP_PLACEHOLDER) {
            return Err(AppError::config(format!(
                "Geolocation lookup URL must contain the {} placeholder: {}",
                IP_PLACEHOLDER, self.geo_lookup_url
            )));
        }

        if let Some(page_url) = &self.page_url {
            validate_http_url("page", page_url)?;
        }

        if let Some(user_agent) = &self.user_agent {
            if user_agent.trim().is_empty() {
                return Err(AppError::config("User agent override cannot be empty"));
            }
        }

        if self.probe_timeout_ms < 100 || self.probe_timeout_ms > 120_000 {
            return Err(AppError::config("Probe timeout must be between 100 and 120000 milliseconds"));
        }

        if self.lan_discovery_window_ms == 0 || self.lan_discovery_window_ms > self.probe_timeout_ms {
            return Err(AppError::config("LAN discovery window must be positive and no longer than the probe timeout"));
        }

        if self.latency_samples == 0 || self.latency_samples > 100 {
            return Err(AppError::config("Latency sample count must be between 1 and 100"));
        }

        if self.latency_interval_ms > 10_000 {
            return Err(AppError::config("Latency interval cannot exceed 10000 milliseconds"));
        }

        for (label, bytes) in [("Download", self.download_bytes), ("Upload", self.upload_bytes)] {
            if bytes == 0 {
                return Err(AppError::config(format!("{} size must be greater than 0", label)));
            }
            if bytes > MAX_TRANSFER_BYTES {
                return Err(AppError::config(format!("{} size cannot exceed {} bytes", label, MAX_TRANSFER_BYTES)));
            }
        }

        if self.request_timeout_seconds == 0 || self.request_timeout_seconds > 600 {
            return Err(AppError::config("Request timeout must be between 1 and 600 seconds"));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        let url_vars: [(&str, &mut String); 5] = [
            ("IP_LOOKUP_URL", &mut self.ip_lookup_url),
            ("GEO_LOOKUP_URL", &mut self.geo_lookup_url),
            ("TRACE_URL", &mut self.trace_url),
            ("DOWNLOAD_URL", &mut self.download_url),
            ("UPLOAD_URL", &mut self.upload_url),
        ];
        for (key, slot) in url_vars {
            if let Ok(value) = std::env::var(key) {
                let value = value.trim();
                if !value.is_empty() {
                    *slot = value.to_string();
                }
            }
        }

        if let Ok(page_url) = std::env::var("PAGE_URL") {
            let page_url = page_url.trim();
            self.page_url = (!page_url.is_empty()).then(|| page_url.to_string());
        }

        if let Ok(user_agent) = std::env::var("USER_AGENT") {
            if !user_agent.trim().is_empty() {
                self.user_agent = Some(user_agent);
            }
        }

        if let Ok(timeout) = std::env::var("PROBE_TIMEOUT_MS") {
            self.probe_timeout_ms = timeout.parse()
                .map_err(|e| AppError::config(format!("Invalid PROBE_TIMEOUT_MS value '{}': {}", timeout, e)))?;
        }

        if let Ok(samples) = std::env::var("LATENCY_SAMPLES") {
            self.latency_samples = samples.parse()
                .map_err(|e| AppError::config(format!("Invalid LATENCY_SAMPLES value '{}': {}", samples, e)))?;
        }

        if let Ok(bytes) = std::env::var("DOWNLOAD_BYTES") {
            self.download_bytes = bytes.parse()
                .map_err(|e| AppError::config(format!("Invalid DOWNLOAD_BYTES value '{}': {}", bytes, e)))?;
        }

        if let Ok(bytes) = std::env::var("UPLOAD_BYTES") {
            self.upload_bytes = bytes.parse()
                .map_err(|e| AppError::config(format!("Invalid UPLOAD_BYTES value '{}': {}", bytes, e)))?;
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

fn validate_http_url(label: &str, url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(AppError::config(format!("The {} URL cannot be empty", label)));
    }

    // The placeholder is not a valid host character, substitute before parsing
    let parsed = url::Url::parse(&url.replace(IP_PLACEHOLDER, "0.0.0.0"))
        .map_err(|e| AppError::config(format!("Invalid {} URL '{}': {}", label, url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(AppError::config(format!(
            "The {} URL must use http or https, got '{}': {}",
            label, other, url
        ))),
    }
}

// Default value functions for serde
fn default_ip_lookup_url() -> String {
    crate::defaults::DEFAULT_IP_LOOKUP_URL.to_string()
}

fn default_geo_lookup_url() -> String {
    crate::defaults::DEFAULT_GEO_LOOKUP_URL.to_string()
}

fn default_trace_url() -> String {
    crate::defaults::DEFAULT_TRACE_URL.to_string()
}

fn default_download_url() -> String {
    crate::defaults::DEFAULT_DOWNLOAD_URL.to_string()
}

fn default_upload_url() -> String {
    crate::defaults::DEFAULT_UPLOAD_URL.to_string()
}

fn default_probe_timeout_ms() -> u64 {
    crate::defaults::DEFAULT_PROBE_TIMEOUT.as_millis() as u64
}

fn default_lan_window_ms() -> u64 {
    crate::defaults::DEFAULT_LAN_DISCOVERY_WINDOW.as_millis() as u64
}

fn default_latency_samples() -> u32 {
    crate::defaults::DEFAULT_LATENCY_SAMPLES
}

fn default_latency_interval_ms() -> u64 {
    crate::defaults::DEFAULT_LATENCY_INTERVAL.as_millis() as u64
}

fn default_download_bytes() -> u64 {
    crate::defaults::DEFAULT_DOWNLOAD_BYTES
}

fn default_upload_bytes() -> u64 {
    crate::defaults::DEFAULT_UPLOAD_BYTES
}

fn default_request_timeout_secs() -> u64 {
    crate::defaults::DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_enable_color() -> bool {
    crate::defaults::DEFAULT_ENABLE_COLOR
}
