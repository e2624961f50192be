//! Output formatting and display system
//!
//! Device records and speed test results are rendered either as colored or
//! plain text sections, or as one JSON document for scripts.

mod colored;
mod formatter;

pub use colored::{latency_color, speed_color, ColorScheme, ColoredFormatter};
pub use formatter::{Alignment, Column, FormattingOptions, OutputFormatter, PlainFormatter, RowData, TableFormat};

use crate::{
    error::Result,
    models::{Config, DeviceRecord, SpeedTestResult},
    types::{LatencyRating, SpeedRating},
};
use serde::Serialize;

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            table_borders: !enable_color,
            max_width: if verbose { 512 } else { 120 },
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    pub fn from_config(config: &Config) -> Box<dyn OutputFormatter> {
        Self::create_formatter(config.enable_color, config.verbose)
    }
}

/// Speed test figures with their ratings spelled out
#[derive(Debug, Clone, Serialize)]
pub struct SpeedTestReport {
    #[serde(flatten)]
    pub result: SpeedTestResult,
    pub download_rating: Option<SpeedRating>,
    pub upload_rating: Option<SpeedRating>,
    pub ping_rating: Option<LatencyRating>,
}

impl From<SpeedTestResult> for SpeedTestReport {
    fn from(result: SpeedTestResult) -> Self {
        Self {
            download_rating: result.download_rating(),
            upload_rating: result.upload_rating(),
            ping_rating: result.ping_rating(),
            result,
        }
    }
}

/// Everything one invocation produced, for JSON output
#[derive(Debug, Clone, Default, Serialize)]
pub struct JsonReport {
    pub version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_test: Option<SpeedTestReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl JsonReport {
    pub fn new() -> Self {
        Self {
            version: crate::VERSION,
            ..Self::default()
        }
    }

    pub fn render(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Main output coordinator that handles all result display
pub struct OutputCoordinator {
    formatter: Box<dyn OutputFormatter>,
}

impl OutputCoordinator {
    pub fn new(formatter: Box<dyn OutputFormatter>) -> Self {
        Self { formatter }
    }

    pub fn display_device_record(&self, record: &DeviceRecord) -> Result<String> {
        let mut output = self.formatter.format_header("Device Information")?;
        output.push_str("\n\n");
        output.push_str(&self.formatter.format_device_record(record)?);
        Ok(output)
    }

    pub fn display_speed_test(&self, result: &SpeedTestResult) -> Result<String> {
        self.formatter.format_speed_test(result)
    }

    pub fn display_error(&self, message: &str) -> Result<String> {
        self.formatter.format_error(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_json_report_includes_ratings() {
        let mut report = JsonReport::new();
        report.speed_test = Some(SpeedTestReport::from(SpeedTestResult {
            download_mbps: Some(25.0),
            upload_mbps: Some(50.0),
            ping_ms: Some(20.0),
            jitter_ms: Some(0.0),
            download_simulated: false,
            upload_simulated: true,
            completed_at: Utc::now(),
        }));

        let value: serde_json::Value = serde_json::from_str(&report.render().unwrap()).unwrap();
        assert_eq!(value["speed_test"]["download_rating"], "Good");
        assert_eq!(value["speed_test"]["upload_rating"], "Fast");
        assert_eq!(value["speed_test"]["ping_rating"], "Good");
        assert_eq!(value["speed_test"]["upload_simulated"], true);
        assert!(value.get("device").is_none());
        assert!(value.get("errors").is_none());
    }

    #[test]
    fn test_factory_respects_color_flag() {
        let coordinator = OutputCoordinator::new(OutputFormatterFactory::create_formatter(false, false));
        assert_eq!(coordinator.display_error("x").unwrap(), "ERROR: x");
    }
}
