//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface and provides
//! a plain text implementation with table formatting capabilities.

use crate::{
    error::{AppError, Result},
    models::{DeviceRecord, RecordSection, SpeedTestResult},
};
use std::fmt::Write as _;

/// Main trait for output formatting
pub trait OutputFormatter {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Format every category of a device record
    fn format_device_record(&self, record: &DeviceRecord) -> Result<String>;

    /// Format speed test figures with their ratings
    fn format_speed_test(&self, result: &SpeedTestResult) -> Result<String>;

    /// Format error messages
    fn format_error(&self, error: &str) -> Result<String>;
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Enable verbose mode with detailed information
    pub verbose_mode: bool,
    /// Show table borders
    pub table_borders: bool,
    /// Longest value printed before truncation
    pub max_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            table_borders: true,
            max_width: 120,
        }
    }
}

/// Table formatting configuration
#[derive(Debug, Clone)]
pub struct TableFormat {
    pub columns: Vec<Column>,
    pub show_borders: bool,
    pub show_header: bool,
}

/// Column definition for table formatting
#[derive(Debug, Clone)]
pub struct Column {
    pub header: String,
    pub alignment: Alignment,
    pub min_width: usize,
    pub max_width: usize,
}

impl Column {
    pub fn new(header: &str, alignment: Alignment, min_width: usize, max_width: usize) -> Self {
        Self {
            header: header.to_string(),
            alignment,
            min_width,
            max_width,
        }
    }
}

/// Text alignment options
#[derive(Debug, Clone)]
pub enum Alignment {
    Left,
    Right,
    Center,
}

/// Row data for table formatting
pub type RowData = Vec<String>;

/// The speed test table layout shared by both formatters
pub(crate) fn speed_table_format(borders: bool) -> TableFormat {
    TableFormat {
        columns: vec![
            Column::new("Metric", Alignment::Left, 8, 12),
            Column::new("Value", Alignment::Right, 10, 16),
            Column::new("Rating", Alignment::Left, 8, 12),
        ],
        show_borders: borders,
        show_header: true,
    }
}

pub(crate) fn format_mbps(value: Option<f64>, simulated: bool) -> String {
    match value {
        Some(mbps) if simulated => format!("{:.2} Mbps*", mbps),
        Some(mbps) => format!("{:.2} Mbps", mbps),
        None => "-".to_string(),
    }
}

pub(crate) fn format_ms(value: Option<f64>) -> String {
    value.map_or("-".to_string(), |ms| format!("{:.1} ms", ms))
}

/// Plain-text speed test rows: metric, value, rating
pub(crate) fn speed_rows(result: &SpeedTestResult) -> Vec<RowData> {
    let rating = |r: Option<String>| r.unwrap_or_else(|| "-".to_string());
    vec![
        vec![
            "Download".to_string(),
            format_mbps(result.download_mbps, result.download_simulated),
            rating(result.download_rating().map(|r| r.to_string())),
        ],
        vec![
            "Upload".to_string(),
            format_mbps(result.upload_mbps, result.upload_simulated),
            rating(result.upload_rating().map(|r| r.to_string())),
        ],
        vec![
            "Ping".to_string(),
            format_ms(result.ping_ms),
            rating(result.ping_rating().map(|r| r.to_string())),
        ],
        vec!["Jitter".to_string(), format_ms(result.jitter_ms), "-".to_string()],
    ]
}

pub(crate) const SIMULATED_NOTE: &str = "* transfer failed; figure is a random estimate";

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    /// Create a table with the given format and data
    pub(crate) fn create_table(&self, format: &TableFormat, rows: &[RowData]) -> String {
        if rows.is_empty() {
            return String::new();
        }

        let column_widths = self.calculate_column_widths(format, rows);
        let mut output = String::new();

        if format.show_header && !format.columns.is_empty() {
            if format.show_borders {
                output.push_str(&self.create_horizontal_border(&column_widths));
                output.push('\n');
            }

            let headers: Vec<String> = format.columns.iter().map(|c| c.header.clone()).collect();
            output.push_str(&self.create_row(&headers, &column_widths, format));
            output.push('\n');

            if format.show_borders {
                output.push_str(&self.create_horizontal_border(&column_widths));
                output.push('\n');
            }
        }

        for row in rows {
            output.push_str(&self.create_row(row, &column_widths, format));
            output.push('\n');
        }

        if format.show_borders {
            output.push_str(&self.create_horizontal_border(&column_widths));
        }

        output
    }

    fn calculate_column_widths(&self, format: &TableFormat, rows: &[RowData]) -> Vec<usize> {
        format
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let content = rows.iter().filter_map(|row| row.get(idx)).map(|cell| cell.chars().count());
                content
                    .fold(column.min_width.max(column.header.len()), usize::max)
                    .min(column.max_width)
            })
            .collect()
    }

    fn create_row(&self, data: &[String], widths: &[usize], format: &TableFormat) -> String {
        let mut row = String::new();

        if format.show_borders {
            row.push('|');
        }

        for (idx, (cell, &width)) in data.iter().zip(widths.iter()).enumerate() {
            let alignment = format.columns.get(idx).map_or(&Alignment::Left, |c| &c.alignment);
            let padded_cell = align_text(cell, width, alignment);

            if format.show_borders {
                row.push(' ');
            }
            row.push_str(&padded_cell);
            if format.show_borders {
                row.push_str(" |");
            } else {
                row.push_str("  ");
            }
        }

        row.trim_end().to_string()
    }

    fn create_horizontal_border(&self, widths: &[usize]) -> String {
        let mut border = String::new();

        if !widths.is_empty() {
            border.push('+');
            for &width in widths {
                border.push_str(&"-".repeat(width + 2));
                border.push('+');
            }
        }

        border
    }

    /// Label column width for one section
    fn label_width(section: &RecordSection) -> usize {
        section.rows.iter().map(|(label, _)| label.len()).max().unwrap_or(0)
    }

    fn truncate(&self, value: &str) -> String {
        truncate_to(value, self.options.max_width)
    }
}

/// Pad or cut `text` to exactly `width` characters
pub(crate) fn align_text(text: &str, width: usize, alignment: &Alignment) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.chars().take(width).collect();
    }

    let padding = width - len;
    match alignment {
        Alignment::Left => format!("{}{}", text, " ".repeat(padding)),
        Alignment::Right => format!("{}{}", " ".repeat(padding), text),
        Alignment::Center => {
            let left_pad = padding / 2;
            let right_pad = padding - left_pad;
            format!("{}{}{}", " ".repeat(left_pad), text, " ".repeat(right_pad))
        }
    }
}

pub(crate) fn truncate_to(value: &str, max_width: usize) -> String {
    if value.chars().count() <= max_width || max_width < 4 {
        return value.to_string();
    }
    let kept: String = value.chars().take(max_width - 3).collect();
    format!("{}...", kept)
}

fn write_err(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format output: {}", e))
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.len() + 4);

        writeln!(output, "{}", border).map_err(write_err)?;
        writeln!(output, "  {}  ", title).map_err(write_err)?;
        write!(output, "{}", border).map_err(write_err)?;

        Ok(output)
    }

    fn format_device_record(&self, record: &DeviceRecord) -> Result<String> {
        let mut output = String::new();

        for section in record.sections() {
            let width = Self::label_width(&section);
            writeln!(output, "{}:", section.title).map_err(write_err)?;
            writeln!(output, "{}", "-".repeat(section.title.len() + 1)).map_err(write_err)?;
            for (label, value) in &section.rows {
                writeln!(output, "  {:<width$}  {}", label, self.truncate(value), width = width).map_err(write_err)?;
            }
            output.push('\n');
        }

        if self.options.verbose_mode {
            writeln!(output, "Collected at {}", record.collected_at.to_rfc3339()).map_err(write_err)?;
        }

        Ok(output.trim_end().to_string())
    }

    fn format_speed_test(&self, result: &SpeedTestResult) -> Result<String> {
        let mut output = String::new();

        writeln!(output, "Speed Test:").map_err(write_err)?;
        writeln!(output, "-----------").map_err(write_err)?;
        output.push_str(&self.create_table(&speed_table_format(self.options.table_borders), &speed_rows(result)));

        if result.has_simulated_values() {
            write!(output, "\n{}", SIMULATED_NOTE).map_err(write_err)?;
        }

        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("ERROR: {}", error))
    }
}
