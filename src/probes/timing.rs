//! Navigation timing readout

use crate::error::Result;
use crate::host::HostEnvironment;
use crate::models::PerformanceInfo;

/// Derived page timings relative to the host clock; all unavailable when milestones are not recorded
pub fn performance(host: &dyn HostEnvironment) -> Result<PerformanceInfo> {
    Ok(match host.navigation_timing() {
        Some(timing) => timing.derive(host.now_ms()),
        None => PerformanceInfo::unavailable(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fake::FakeHost;

    #[test]
    fn test_recorded_milestones() {
        let perf = performance(&FakeHost::healthy()).unwrap();
        assert_eq!(perf.dns_lookup_time, "20ms");
        assert_eq!(perf.page_load_time, "1000ms");
    }

    #[test]
    fn test_missing_facility() {
        let perf = performance(&FakeHost::healthy().without_navigation_timing()).unwrap();
        assert_eq!(perf, PerformanceInfo::unavailable());
    }
}
