//! Colored formatter implementation with terminal color support
//!
//! This module provides a rich colored output formatter that uses
//! ANSI colors for rating and availability cues.

use super::formatter::{
    align_text, speed_rows, speed_table_format, truncate_to, FormattingOptions, OutputFormatter, PlainFormatter,
    SIMULATED_NOTE,
};
use crate::{
    error::Result,
    models::{DeviceRecord, SpeedTestResult},
    types::{sentinel, LatencyRating, SpeedRating},
};
use colored::*;
use std::fmt::Write as _;

/// Color for a throughput rating
pub fn speed_color(rating: SpeedRating) -> Color {
    match rating {
        SpeedRating::Slow => Color::Red,
        SpeedRating::Moderate => Color::Yellow,
        SpeedRating::Good => Color::Cyan,
        SpeedRating::Fast | SpeedRating::VeryFast => Color::Green,
    }
}

/// Color for a latency rating
pub fn latency_color(rating: LatencyRating) -> Color {
    match rating {
        LatencyRating::Excellent => Color::Green,
        LatencyRating::Good => Color::Cyan,
        LatencyRating::Average => Color::Yellow,
        LatencyRating::Poor => Color::Magenta,
        LatencyRating::Bad => Color::Red,
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub label: Color,
    pub muted: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            label: Color::Cyan,
            muted: Color::BrightBlack,
            border: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    plain_formatter: PlainFormatter,
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self::with_color_scheme(options, ColorScheme::default())
    }

    /// Create a colored formatter with custom color scheme
    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        let plain_formatter = PlainFormatter::new(options.clone());
        Self {
            plain_formatter,
            options,
            color_scheme,
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    fn heading(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold().color(self.color_scheme.header)
        } else {
            text.normal()
        }
    }

    fn symbol(&self, symbol: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            symbol.color(color).bold()
        } else {
            symbol.normal()
        }
    }

    /// Dim placeholder values so real readings stand out
    fn value(&self, text: &str) -> ColoredString {
        let truncated = truncate_to(text, self.options.max_width);
        match text {
            sentinel::NOT_AVAILABLE | sentinel::NOT_SUPPORTED | sentinel::NOT_DETECTED | sentinel::UNKNOWN => {
                self.colorize(&truncated, self.color_scheme.muted)
            }
            sentinel::SUPPORTED => self.colorize(&truncated, self.color_scheme.success),
            sentinel::DETECTED => self.colorize(&truncated, self.color_scheme.warning),
            _ => truncated.normal(),
        }
    }

    fn rating_cell(&self, text: &str, width: usize, color: Option<Color>) -> String {
        let padded = align_text(text, width, &super::formatter::Alignment::Left);
        match color {
            Some(color) => self.colorize(&padded, color).to_string(),
            None => padded,
        }
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let border = "=".repeat(title.len() + 4);
        Ok(format!(
            "{}\n  {}  \n{}",
            self.colorize(&border, self.color_scheme.border),
            self.heading(title),
            self.colorize(&border, self.color_scheme.border)
        ))
    }

    fn format_device_record(&self, record: &DeviceRecord) -> Result<String> {
        let mut output = String::new();

        for section in record.sections() {
            let width = section.rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0);
            let _ = writeln!(output, "{}", self.heading(section.title));
            for (label, value) in &section.rows {
                let padded = format!("{:<width$}", label, width = width);
                let _ = writeln!(output, "  {}  {}", self.colorize(&padded, self.color_scheme.label), self.value(value));
            }
            output.push('\n');
        }

        if self.options.verbose_mode {
            let collected = format!("Collected at {}", record.collected_at.to_rfc3339());
            let _ = writeln!(output, "{}", self.colorize(&collected, self.color_scheme.muted));
        }

        Ok(output.trim_end().to_string())
    }

    fn format_speed_test(&self, result: &SpeedTestResult) -> Result<String> {
        if !self.options.enable_color {
            return self.plain_formatter.format_speed_test(result);
        }

        let format = speed_table_format(false);
        let rows = speed_rows(result);
        let rating_colors = [
            result.download_rating().map(speed_color),
            result.upload_rating().map(speed_color),
            result.ping_rating().map(latency_color),
            None,
        ];

        let mut output = String::new();
        let _ = writeln!(output, "{}", self.heading("Speed Test"));
        for (row, color) in rows.iter().zip(rating_colors) {
            let _ = writeln!(
                output,
                "  {}  {}  {}",
                self.colorize(&align_text(&row[0], format.columns[0].min_width, &format.columns[0].alignment), self.color_scheme.label),
                align_text(&row[1], format.columns[1].max_width, &format.columns[1].alignment),
                self.rating_cell(&row[2], format.columns[2].min_width, color)
            );
        }

        if result.has_simulated_values() {
            let _ = write!(output, "{}", self.colorize(SIMULATED_NOTE, self.color_scheme.warning));
        }

        Ok(output.trim_end().to_string())
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("{} {}", self.symbol("✗", self.color_scheme.error), self.colorize(error, self.color_scheme.error)))
    }
}
