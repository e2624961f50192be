//! Speed test result data model

use crate::types::{LatencyRating, SpeedRating};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a completed speed test run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedTestResult {
    pub download_mbps: Option<f64>,
    pub upload_mbps: Option<f64>,
    pub ping_ms: Option<f64>,
    pub jitter_ms: Option<f64>,

    /// Download figure is a pseudo-random stand-in for a failed transfer
    #[serde(default)]
    pub download_simulated: bool,

    /// Upload figure is a pseudo-random stand-in for a failed transfer
    #[serde(default)]
    pub upload_simulated: bool,

    pub completed_at: DateTime<Utc>,
}

impl SpeedTestResult {
    pub fn download_rating(&self) -> Option<SpeedRating> {
        self.download_mbps.map(SpeedRating::from_mbps)
    }

    pub fn upload_rating(&self) -> Option<SpeedRating> {
        self.upload_mbps.map(SpeedRating::from_mbps)
    }

    pub fn ping_rating(&self) -> Option<LatencyRating> {
        self.ping_ms.map(LatencyRating::from_ms)
    }

    /// True when either throughput figure was substituted
    pub fn has_simulated_values(&self) -> bool {
        self.download_simulated || self.upload_simulated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratings_follow_values() {
        let result = SpeedTestResult {
            download_mbps: Some(25.0),
            upload_mbps: Some(50.0),
            ping_ms: Some(20.0),
            jitter_ms: Some(1.0),
            download_simulated: false,
            upload_simulated: true,
            completed_at: Utc::now(),
        };
        assert_eq!(result.download_rating(), Some(SpeedRating::Good));
        assert_eq!(result.upload_rating(), Some(SpeedRating::Fast));
        assert_eq!(result.ping_rating(), Some(LatencyRating::Good));
        assert!(result.has_simulated_values());
    }
}
