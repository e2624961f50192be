//! Navigation timing milestones and their derived durations

use crate::models::PerformanceInfo;
use serde::{Deserialize, Serialize};

/// Page fetch milestones in epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationTiming {
    pub navigation_start: i64,
    pub fetch_start: i64,
    pub domain_lookup_start: i64,
    pub domain_lookup_end: i64,
    pub connect_start: i64,
    pub connect_end: i64,
    pub request_start: i64,
    pub response_start: i64,
    pub response_end: i64,
    pub dom_loading: i64,
}

impl NavigationTiming {
    /// Milliseconds from navigation start until `now`
    pub fn page_load_ms(&self, now: i64) -> i64 {
        now - self.navigation_start
    }

    pub fn network_ms(&self) -> i64 {
        self.response_end - self.fetch_start
    }

    pub fn dns_lookup_ms(&self) -> i64 {
        self.domain_lookup_end - self.domain_lookup_start
    }

    pub fn tcp_connection_ms(&self) -> i64 {
        self.connect_end - self.connect_start
    }

    pub fn server_response_ms(&self) -> i64 {
        self.response_start - self.request_start
    }

    pub fn page_download_ms(&self) -> i64 {
        self.response_end - self.response_start
    }

    pub fn render_ms(&self, now: i64) -> i64 {
        now - self.dom_loading
    }

    /// The seven derived durations rendered as `<n>ms`
    pub fn derive(&self, now: i64) -> PerformanceInfo {
        let ms = |value: i64| format!("{}ms", value);
        PerformanceInfo {
            page_load_time: ms(self.page_load_ms(now)),
            network_time: ms(self.network_ms()),
            dns_lookup_time: ms(self.dns_lookup_ms()),
            tcp_connection_time: ms(self.tcp_connection_ms()),
            server_response_time: ms(self.server_response_ms()),
            page_download_time: ms(self.page_download_ms()),
            browser_render_time: ms(self.render_ms(now)),
        }
    }
}
