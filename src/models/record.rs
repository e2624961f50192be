//! Device record data model

use crate::types::sentinel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything the probe aggregator learned about the host in one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub browser: BrowserInfo,
    pub screen: ScreenInfo,
    pub system: SystemInfo,
    pub network: NetworkInfo,
    pub time: TimeInfo,
    pub storage: StorageInfo,
    pub performance: PerformanceInfo,
    pub other: OtherInfo,
    /// When the aggregation finished
    pub collected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrowserInfo {
    pub name: String,
    pub version: String,
    pub user_agent: String,
    pub language: String,
    pub cookies_enabled: bool,
    pub do_not_track: Option<String>,
    pub cache: String,
    pub plugins: Vec<String>,
    pub extensions: Vec<String>,
    pub ad_blocker: String,
    pub content_filtering: String,
    pub fingerprinting_resistance: String,
    pub last_key_pressed: String,
    pub caps_lock: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenInfo {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub color_depth: Option<u32>,
    pub orientation: String,
    pub pixel_ratio: Option<f64>,
    pub touch_screen: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemInfo {
    pub platform: String,
    /// Logical processors; 0 when the host does not report them
    pub cores: u32,
    pub memory: Option<String>,
    pub connection: Option<String>,
    pub battery: Option<String>,
    pub gpu: String,
    pub speakers: String,
    pub bluetooth: String,
    pub direction: String,
    pub device_motion: String,
    pub mouse: String,
    pub touchscreen: String,
    pub speech_synthesis: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkInfo {
    pub ip: String,
    pub vpn: String,
    pub tor: String,
    pub proxy: String,
    pub isp: String,
    pub wan: String,
    pub lan: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hostname: Option<String>,
}

impl NetworkInfo {
    /// Record used when the self-lookup chain fails; only the locally derived hostname survives
    pub fn unavailable(hostname: Option<String>) -> Self {
        let na = || sentinel::NOT_AVAILABLE.to_string();
        Self {
            ip: na(),
            vpn: na(),
            tor: na(),
            proxy: na(),
            isp: na(),
            wan: na(),
            lan: na(),
            latitude: None,
            longitude: None,
            hostname,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeInfo {
    pub local: String,
    pub utc: String,
}

impl TimeInfo {
    pub fn at(instant: DateTime<Utc>) -> Self {
        let local = instant.with_timezone(&chrono::Local);
        Self {
            local: local.format("%Y-%m-%d %H:%M:%S").to_string(),
            utc: instant.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageInfo {
    pub local_storage: bool,
    pub session_storage: bool,
    pub indexed_db: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceInfo {
    pub page_load_time: String,
    pub network_time: String,
    pub dns_lookup_time: String,
    pub tcp_connection_time: String,
    pub server_response_time: String,
    pub page_download_time: String,
    pub browser_render_time: String,
}

impl PerformanceInfo {
    pub fn unavailable() -> Self {
        let na = || sentinel::NOT_AVAILABLE.to_string();
        Self {
            page_load_time: na(),
            network_time: na(),
            dns_lookup_time: na(),
            tcp_connection_time: na(),
            server_response_time: na(),
            page_download_time: na(),
            browser_render_time: na(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtherInfo {
    pub canvas_fingerprint: String,
    pub audio_context: String,
    pub web_rtc: String,
    pub web_gl: String,
    pub window_size: String,
    pub http_version: String,
    pub tls_version: String,
    pub cipher: String,
    pub page_referrer: String,
}

/// A titled group of label/value rows, in display order
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSection {
    pub title: &'static str,
    pub rows: Vec<(&'static str, String)>,
}

impl RecordSection {
    fn new(title: &'static str) -> Self {
        Self { title, rows: Vec::new() }
    }

    fn row<V: Into<String>>(mut self, label: &'static str, value: V) -> Self {
        self.rows.push((label, value.into()));
        self
    }
}

fn or_not_available<T: ToString>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| sentinel::NOT_AVAILABLE.to_string())
}

fn yes_no(value: bool) -> String {
    let text = if value { "Yes" } else { "No" };
    text.to_string()
}

fn join_or_none(values: &[String]) -> String {
    if values.is_empty() {
        "None".to_string()
    } else {
        values.join(", ")
    }
}

impl DeviceRecord {
    /// Flatten the record into labelled sections; nulls render as "Not available"
    pub fn sections(&self) -> Vec<RecordSection> {
        let b = &self.browser;
        let s = &self.screen;
        let sys = &self.system;
        let n = &self.network;
        let p = &self.performance;
        let o = &self.other;

        vec![
            RecordSection::new("Browser")
                .row("Name", b.name.clone())
                .row("Version", b.version.clone())
                .row("User Agent", b.user_agent.clone())
                .row("Language", b.language.clone())
                .row("Cookies Enabled", yes_no(b.cookies_enabled))
                .row("Do Not Track", or_not_available(&b.do_not_track))
                .row("Cache", b.cache.clone())
                .row("Plugins", join_or_none(&b.plugins))
                .row("Extensions", join_or_none(&b.extensions))
                .row("Ad Blocker", b.ad_blocker.clone())
                .row("Content Filtering", b.content_filtering.clone())
                .row("Fingerprinting Resistance", b.fingerprinting_resistance.clone())
                .row("Last Key Pressed", b.last_key_pressed.clone())
                .row("Caps Lock", if b.caps_lock { "On" } else { "Off" }),
            RecordSection::new("Screen")
                .row("Width", or_not_available(&s.width))
                .row("Height", or_not_available(&s.height))
                .row("Color Depth", or_not_available(&s.color_depth))
                .row("Orientation", s.orientation.clone())
                .row("Pixel Ratio", or_not_available(&s.pixel_ratio))
                .row("Touch Screen", yes_no(s.touch_screen)),
            RecordSection::new("System")
                .row("Platform", sys.platform.clone())
                .row("CPU Cores", if sys.cores == 0 { sentinel::NOT_AVAILABLE.to_string() } else { sys.cores.to_string() })
                .row("Memory", or_not_available(&sys.memory))
                .row("Connection", or_not_available(&sys.connection))
                .row("Battery", or_not_available(&sys.battery))
                .row("GPU", sys.gpu.clone())
                .row("Speakers", sys.speakers.clone())
                .row("Bluetooth", sys.bluetooth.clone())
                .row("Direction", sys.direction.clone())
                .row("Device Motion", sys.device_motion.clone())
                .row("Mouse", sys.mouse.clone())
                .row("Touchscreen", sys.touchscreen.clone())
                .row("Speech Synthesis", sys.speech_synthesis.clone()),
            RecordSection::new("Network")
                .row("IP Address", n.ip.clone())
                .row("VPN", n.vpn.clone())
                .row("Tor", n.tor.clone())
                .row("Proxy", n.proxy.clone())
                .row("ISP", n.isp.clone())
                .row("WAN", n.wan.clone())
                .row("LAN", n.lan.clone())
                .row("Latitude", or_not_available(&n.latitude))
                .row("Longitude", or_not_available(&n.longitude))
                .row("Hostname", or_not_available(&n.hostname)),
            RecordSection::new("Time")
                .row("Local", self.time.local.clone())
                .row("UTC", self.time.utc.clone()),
            RecordSection::new("Storage")
                .row("Local Storage", yes_no(self.storage.local_storage))
                .row("Session Storage", yes_no(self.storage.session_storage))
                .row("IndexedDB", yes_no(self.storage.indexed_db)),
            RecordSection::new("Performance")
                .row("Page Load Time", p.page_load_time.clone())
                .row("Network Time", p.network_time.clone())
                .row("DNS Lookup Time", p.dns_lookup_time.clone())
                .row("TCP Connection Time", p.tcp_connection_time.clone())
                .row("Server Response Time", p.server_response_time.clone())
                .row("Page Download Time", p.page_download_time.clone())
                .row("Render Time", p.browser_render_time.clone()),
            RecordSection::new("Other")
                .row("Canvas Fingerprint", o.canvas_fingerprint.clone())
                .row("Audio Context", o.audio_context.clone())
                .row("WebRTC", o.web_rtc.clone())
                .row("WebGL", o.web_gl.clone())
                .row("Window Size", o.window_size.clone())
                .row("HTTP Version", o.http_version.clone())
                .row("TLS Version", o.tls_version.clone())
                .row("Cipher", o.cipher.clone())
                .row("Page Referrer", o.page_referrer.clone()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_network_keeps_hostname() {
        let network = NetworkInfo::unavailable(Some("workstation".to_string()));
        assert_eq!(network.ip, "Not available");
        assert_eq!(network.lan, "Not available");
        assert_eq!(network.latitude, None);
        assert_eq!(network.hostname.as_deref(), Some("workstation"));
    }

    #[test]
    fn test_unavailable_performance() {
        let perf = PerformanceInfo::unavailable();
        assert_eq!(perf.page_load_time, "Not available");
        assert_eq!(perf.browser_render_time, "Not available");
    }

    #[test]
    fn test_time_info_utc_format() {
        let instant = DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z").unwrap().with_timezone(&Utc);
        let time = TimeInfo::at(instant);
        assert_eq!(time.utc, "Fri, 01 Mar 2024 12:00:00 GMT");
    }

    #[test]
    fn test_null_helpers() {
        assert_eq!(or_not_available::<u32>(&None), "Not available");
        assert_eq!(or_not_available(&Some(24u32)), "24");
        assert_eq!(join_or_none(&[]), "None");
    }
}
