//! Latency and throughput arithmetic for the speed test

use serde::{Deserialize, Serialize};
use std::time::Duration;

const BITS_PER_BYTE: f64 = 8.0;
const BITS_PER_MEGABIT: f64 = 1_000_000.0;

/// Summary of a series of round-trip samples
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    /// Arithmetic mean of the samples
    pub mean_ms: f64,
    /// Mean absolute deviation from the mean
    pub jitter_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub sample_count: usize,
}

impl LatencySummary {
    /// Summarize round-trip samples; `None` when there are no samples
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        let mean_ms = mean(samples)?;
        let jitter_ms = mean_absolute_deviation(samples)?;
        let min_ms = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max_ms = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Some(Self {
            mean_ms,
            jitter_ms,
            min_ms,
            max_ms,
            sample_count: samples.len(),
        })
    }
}

/// Arithmetic mean
pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Mean absolute deviation from the arithmetic mean.
///
/// This is the jitter figure reported by the speed test; it is not the
/// standard deviation.
pub fn mean_absolute_deviation(samples: &[f64]) -> Option<f64> {
    let center = mean(samples)?;
    let total: f64 = samples.iter().map(|sample| (sample - center).abs()).sum();
    Some(total / samples.len() as f64)
}

/// Throughput in megabits per second for `bytes` moved in `elapsed`.
///
/// Returns `None` for a zero-length interval, which cannot be measured.
pub fn throughput_mbps(bytes: u64, elapsed: Duration) -> Option<f64> {
    throughput_mbps_from_secs(bytes, elapsed.as_secs_f64())
}

pub fn throughput_mbps_from_secs(bytes: u64, elapsed_secs: f64) -> Option<f64> {
    if elapsed_secs <= 0.0 || !elapsed_secs.is_finite() {
        return None;
    }
    Some((bytes as f64 * BITS_PER_BYTE) / (elapsed_secs * BITS_PER_MEGABIT))
}
