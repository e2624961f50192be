//! Configuration validation utilities and rules
//!
//! [`Config::validate`] rejects configurations that cannot work. The checks
//! here run afterwards and only produce warnings about settings that work but
//! are likely to give misleading results.

use crate::{
    models::{config::IP_PLACEHOLDER, Config},
    error::{AppError, Result},
};

/// Transfers above this size get a warning about run time and data usage
const LARGE_TRANSFER_BYTES: u64 = 200 * 1024 * 1024;

/// Configuration validator with advanced validation rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration with comprehensive checks
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        config.validate()?;

        warnings.extend(Self::validate_endpoints(config)?);
        warnings.extend(Self::validate_probe_settings(config));
        warnings.extend(Self::validate_speed_settings(config));

        Ok(warnings)
    }

    /// Inspect every configured endpoint URL
    fn validate_endpoints(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        let mut endpoints = vec![
            ("IP lookup", config.ip_lookup_url.as_str()),
            ("geolocation lookup", config.geo_lookup_url.as_str()),
            ("trace", config.trace_url.as_str()),
            ("download", config.download_url.as_str()),
            ("upload", config.upload_url.as_str()),
        ];
        if let Some(page_url) = config.page_url.as_deref() {
            endpoints.push(("page", page_url));
        }

        for (label, url) in endpoints {
            let parsed = url::Url::parse(&url.replace(IP_PLACEHOLDER, "0.0.0.0"))
                .map_err(|e| AppError::config(format!("Invalid {} URL '{}': {}", label, url, e)))?;

            if parsed.scheme() == "http" {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("The {} URL '{}' uses HTTP instead of HTTPS", label, url),
                ));
            }

            if let Some(port) = parsed.port() {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("The {} URL '{}' uses non-standard port {}", label, url, port),
                ));
            }

            let local = match parsed.host() {
                Some(url::Host::Ipv4(ip)) => ip.is_private() || ip.is_loopback(),
                Some(url::Host::Ipv6(ip)) => ip.is_loopback(),
                Some(url::Host::Domain(domain)) => domain == "localhost",
                None => false,
            };
            if local {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("The {} URL '{}' targets a private or local network", label, url),
                ));
            }
        }

        Ok(warnings)
    }

    /// Probe timeout and candidate gathering window
    fn validate_probe_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.probe_timeout_ms < 1000 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Probe timeout of {}ms may be too short for the network lookups; they will report Not available",
                    config.probe_timeout_ms
                ),
            ));
        } else if config.probe_timeout_ms > 30_000 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("Long probe timeout of {}ms will delay the report when a probe hangs", config.probe_timeout_ms),
            ));
        }

        // The network probe waits for whichever of its lookups and LAN window ends last
        if config.lan_discovery_window_ms * 2 > config.probe_timeout_ms {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "LAN discovery window of {}ms can hold the network probe open for up to {}ms when no local address is offered",
                    config.lan_discovery_window_ms, config.lan_discovery_window_ms.max(config.probe_timeout_ms)
                ),
            ));
        }

        warnings
    }

    /// Latency sampling and transfer sizes
    fn validate_speed_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.latency_samples < 3 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "{} latency sample(s) may not give a meaningful jitter figure (recommended: >= 3)",
                    config.latency_samples
                ),
            ));
        }

        for (label, bytes) in [("Download", config.download_bytes), ("Upload", config.upload_bytes)] {
            if bytes > LARGE_TRANSFER_BYTES {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("{} size of {} MiB will take a long time on slow links", label, bytes / (1024 * 1024)),
                ));
            } else if bytes < 1024 * 1024 {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("{} size of {} bytes is too small for a stable throughput figure", label, bytes),
                ));
            }
        }

        let transfer_budget = (config.download_bytes.max(config.upload_bytes) as f64 * 8.0) / 1_000_000.0;
        let floor_mbps = transfer_budget / config.request_timeout_seconds as f64;
        if floor_mbps > 10.0 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!(
                    "Transfers need at least {:.1} Mbps to finish within the {}s request timeout",
                    floor_mbps, config.request_timeout_seconds
                ),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
    Error,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        }
    }

    /// Get color for terminal display
    pub fn color(&self) -> &'static str {
        match self {
            Self::Info => "blue",
            Self::Warning => "yellow",
            Self::Error => "red",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        if use_color {
            use colored::Colorize;
            format!("{} {}", tag.color(self.level.color()), self.message)
        } else {
            format!("{} {}", tag, self.message)
        }
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
