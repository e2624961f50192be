//! Host environment backed by the local machine
//!
//! Hardware facts come from sysfs/procfs where available; anything the
//! platform does not expose is reported as absent rather than guessed.

use super::{
    BatteryStatus, Bitmap, BlockedCanvas, CandidateSession, Canvas2d, EnvironmentSnapshot, GeoLocation,
    GraphicsAccess, HostEnvironment, StorageEstimate,
};
use crate::client::{build_http_client, default_user_agent, measure_page_load, NetworkIdentityClient, PageLoad};
use crate::error::{AppError, Result};
use crate::logging::NetworkLogger;
use crate::models::{Config, NavigationTiming, ScreenInfo, StorageInfo};
use crate::types::Capability;
use anyhow::{bail, Context};
use async_trait::async_trait;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;

/// Hostname whose resolution content blockers commonly sinkhole
const AD_BAIT_HOST: &str = "pagead2.googlesyndication.com";
/// Hostname that must resolve for the bait check to mean anything
const AD_CONTROL_HOST: &str = "www.google.com";
/// Public address used only to pick the outbound interface; nothing is sent
const CANDIDATE_ROUTE_PROBE: &str = "8.8.8.8:80";

const EXTENSIONS_NOTICE: &str = "Browser security restricts access to extension information";
const CONTENT_FILTERING_NOTICE: &str = "Detection requires server-side validation";

/// Native host environment
pub struct NativeHost {
    user_agent: String,
    resist_fingerprinting: bool,
    identity: NetworkIdentityClient,
    page_load: Option<PageLoad>,
    sys_root: PathBuf,
    proc_root: PathBuf,
    dev_root: PathBuf,
}

impl NativeHost {
    /// Build the host and, when a page URL is configured, fetch it once to record navigation milestones
    pub async fn initialize(config: &Config, logger: NetworkLogger) -> Result<Self> {
        let identity = NetworkIdentityClient::new(config, logger.clone())?;

        let page_load = match &config.page_url {
            Some(page_url) => {
                let client = build_http_client(config, config.probe_timeout())?;
                match measure_page_load(&client, page_url, config.probe_timeout()).await {
                    Ok(load) => Some(load),
                    Err(e) => {
                        logger
                            .logger()
                            .info(&format!("Page timing unavailable for {}: {}", page_url, e))
                            .error_info(&e)
                            .log()
                            .await;
                        None
                    }
                }
            }
            None => None,
        };

        Ok(Self {
            user_agent: config.user_agent.clone().unwrap_or_else(default_user_agent),
            resist_fingerprinting: config.resist_fingerprinting,
            identity,
            page_load,
            sys_root: PathBuf::from("/sys"),
            proc_root: PathBuf::from("/proc"),
            dev_root: PathBuf::from("/dev"),
        })
    }

    fn data_dir() -> Option<PathBuf> {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|home| PathBuf::from(home).join(".local/share")))
    }

    fn hostname(&self) -> Option<String> {
        std::env::var("HOSTNAME")
            .ok()
            .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
    }

    fn terminal_size() -> Option<(u32, u32)> {
        let columns = std::env::var("COLUMNS").ok()?.parse().ok()?;
        let lines = std::env::var("LINES").ok()?.parse().ok()?;
        Some((columns, lines))
    }

    async fn graphics(&self) -> GraphicsAccess {
        read_graphics(&self.sys_root.join("class/drm")).await
    }
}

#[async_trait]
impl HostEnvironment for NativeHost {
    fn snapshot(&self) -> Result<EnvironmentSnapshot> {
        let window_size = Self::terminal_size();
        let memory_gb = std::fs::read_to_string(self.proc_root.join("meminfo"))
            .ok()
            .and_then(|contents| parse_meminfo_gb(&contents));

        Ok(EnvironmentSnapshot {
            user_agent: self.user_agent.clone(),
            language: std::env::var("LANG")
                .ok()
                .and_then(|raw| language_tag(&raw))
                .unwrap_or_else(|| crate::types::sentinel::UNKNOWN.to_string()),
            cookies_enabled: false,
            do_not_track: std::env::var("DO_NOT_TRACK").ok().filter(|v| !v.is_empty()),
            plugins: Vec::new(),
            screen: ScreenInfo {
                width: window_size.map(|(w, _)| w),
                height: window_size.map(|(_, h)| h),
                color_depth: color_depth(
                    std::env::var("COLORTERM").ok().as_deref(),
                    std::env::var("TERM").ok().as_deref(),
                ),
                orientation: orientation(window_size),
                pixel_ratio: Some(1.0),
                touch_screen: false,
            },
            platform: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            cores: num_cpus::get() as u32,
            memory_gb,
            connection: None,
            pointer: false,
            touch: false,
            speech_synthesis: false,
            storage: StorageInfo {
                local_storage: Self::data_dir().is_some_and(|dir| dir.is_dir()),
                session_storage: std::env::temp_dir().is_dir(),
                indexed_db: false,
            },
            window_size,
            referrer: None,
            hostname: self.hostname(),
        })
    }

    fn has_capability(&self, capability: Capability) -> bool {
        match capability {
            Capability::Bluetooth => dir_has_entries(&self.sys_root.join("class/bluetooth")),
            Capability::DeviceOrientation => iio_has_channel(&self.sys_root.join("bus/iio/devices"), &["in_incli", "in_anglvel"]),
            Capability::DeviceMotion => iio_has_channel(&self.sys_root.join("bus/iio/devices"), &["in_accel"]),
            Capability::MediaCapture => self.dev_root.join("video0").exists(),
        }
    }

    fn create_canvas(&self, width: u32, height: u32) -> Option<Box<dyn Canvas2d>> {
        if self.resist_fingerprinting {
            Some(Box::new(BlockedCanvas::new(width, height)))
        } else {
            Some(Box::new(Bitmap::new(width, height)))
        }
    }

    fn navigation_timing(&self) -> Option<NavigationTiming> {
        self.page_load.as_ref().map(|load| load.timing)
    }

    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    async fn storage_estimate(&self) -> Result<Option<StorageEstimate>> {
        let Some(dir) = Self::data_dir().filter(|dir| dir.is_dir()) else {
            return Ok(None);
        };
        let output = tokio::process::Command::new("df").arg("-Pk").arg(&dir).output().await?;
        if !output.status.success() {
            return Err(AppError::io(format!("df exited with {}", output.status)));
        }
        Ok(Some(parse_df_output(&String::from_utf8_lossy(&output.stdout))?))
    }

    async fn extensions(&self) -> Result<Vec<String>> {
        Ok(vec![EXTENSIONS_NOTICE.to_string()])
    }

    async fn ad_bait_blocked(&self) -> Result<bool> {
        let control = resolve(AD_CONTROL_HOST).await?;
        if control.is_empty() {
            return Err(AppError::network("Name resolution unavailable"));
        }
        match resolve(AD_BAIT_HOST).await {
            Ok(addresses) => Ok(is_sinkholed(&addresses)),
            Err(_) => Ok(true),
        }
    }

    async fn content_filtering(&self) -> Result<String> {
        Ok(CONTENT_FILTERING_NOTICE.to_string())
    }

    async fn battery(&self) -> Result<Option<BatteryStatus>> {
        Ok(read_battery(&self.sys_root.join("class/power_supply")).await?)
    }

    async fn gpu_renderer(&self) -> Result<GraphicsAccess> {
        Ok(self.graphics().await)
    }

    async fn webgl_info(&self) -> Result<GraphicsAccess> {
        Ok(self.graphics().await)
    }

    async fn audio_outputs(&self) -> Result<usize> {
        let cards = tokio::fs::read_to_string(self.proc_root.join("asound/cards")).await?;
        Ok(count_sound_cards(&cards))
    }

    async fn open_audio_context(&self) -> Result<()> {
        if self.dev_root.join("snd").is_dir() {
            Ok(())
        } else {
            Err(AppError::unsupported("No sound devices"))
        }
    }

    async fn public_address(&self) -> Result<String> {
        self.identity.public_address().await
    }

    async fn geolocate(&self, ip: &str) -> Result<GeoLocation> {
        self.identity.geolocate(ip).await
    }

    async fn gather_candidates(&self) -> Result<CandidateSession> {
        let socket = tokio::net::UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(CANDIDATE_ROUTE_PROBE).await?;
        let local = socket.local_addr()?;

        let (tx, rx) = mpsc::channel(4);
        let producer = tokio::spawn(async move {
            let _socket = socket;
            let line = format!(
                "candidate:1 1 udp 2122260223 {} {} typ host generation 0",
                local.ip(),
                local.port()
            );
            let _ = tx.send(line).await;
        });
        Ok(CandidateSession::new(rx, producer))
    }

    async fn http_version(&self) -> Result<Option<String>> {
        Ok(self.page_load.as_ref().map(|load| load.http_version.clone()))
    }

    async fn tls_version(&self) -> Result<Option<String>> {
        Ok(None)
    }

    async fn cipher_suite(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

async fn resolve(host: &str) -> Result<Vec<IpAddr>> {
    Ok(tokio::net::lookup_host((host, 443)).await?.map(|addr| addr.ip()).collect())
}

/// Blockers answer with an unroutable address instead of failing the lookup
fn is_sinkholed(addresses: &[IpAddr]) -> bool {
    addresses.is_empty() || addresses.iter().all(|ip| ip.is_unspecified() || ip.is_loopback())
}

/// `en_US.UTF-8` becomes `en-US`
fn language_tag(raw: &str) -> Option<String> {
    let base = raw.split(['.', '@']).next()?.trim();
    if base.is_empty() || base == "C" || base == "POSIX" {
        return None;
    }
    Some(base.replace('_', "-"))
}

fn color_depth(colorterm: Option<&str>, term: Option<&str>) -> Option<u32> {
    match (colorterm, term) {
        (Some("truecolor") | Some("24bit"), _) => Some(24),
        (_, Some(term)) if term.contains("256color") => Some(8),
        (_, Some("dumb")) => None,
        (_, Some(_)) => Some(4),
        _ => None,
    }
}

fn orientation(size: Option<(u32, u32)>) -> String {
    match size {
        Some((w, h)) if w >= h => "landscape-primary".to_string(),
        Some(_) => "portrait-primary".to_string(),
        None => "unknown".to_string(),
    }
}

fn parse_meminfo_gb(contents: &str) -> Option<u64> {
    let kib: u64 = contents
        .lines()
        .find_map(|line| line.strip_prefix("MemTotal:"))?
        .split_whitespace()
        .next()?
        .parse()
        .ok()?;
    Some(((kib as f64) / (1024.0 * 1024.0)).round() as u64)
}

/// Parse POSIX `df -Pk` output for one filesystem
fn parse_df_output(output: &str) -> anyhow::Result<StorageEstimate> {
    let line = output.lines().nth(1).context("df produced no filesystem line")?;
    let columns: Vec<&str> = line.split_whitespace().collect();
    if columns.len() < 4 {
        bail!("Unexpected df line: {}", line);
    }
    let total_kib: u64 = columns[1].parse().with_context(|| format!("df total column in {:?}", line))?;
    let used_kib: u64 = columns[2].parse().with_context(|| format!("df used column in {:?}", line))?;
    Ok(StorageEstimate {
        usage_bytes: used_kib * 1024,
        quota_bytes: total_kib * 1024,
    })
}

fn count_sound_cards(contents: &str) -> usize {
    contents
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            trimmed.split_whitespace().next().is_some_and(|first| first.parse::<u32>().is_ok())
                && trimmed.contains('[')
        })
        .count()
}

fn dir_has_entries(path: &Path) -> bool {
    std::fs::read_dir(path).map(|mut entries| entries.next().is_some()).unwrap_or(false)
}

fn iio_has_channel(devices: &Path, prefixes: &[&str]) -> bool {
    let Ok(entries) = std::fs::read_dir(devices) else {
        return false;
    };
    entries.flatten().any(|device| {
        std::fs::read_dir(device.path())
            .map(|files| {
                files.flatten().any(|file| {
                    let name = file.file_name();
                    let name = name.to_string_lossy();
                    prefixes.iter().any(|prefix| name.starts_with(prefix))
                })
            })
            .unwrap_or(false)
    })
}

async fn read_battery(power_supply: &Path) -> anyhow::Result<Option<BatteryStatus>> {
    let mut entries = match tokio::fs::read_dir(power_supply).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(anyhow::Error::new(e).context(format!("listing {}", power_supply.display()))),
    };

    while let Some(entry) = entries.next_entry().await? {
        let supply = entry.path();
        let kind = tokio::fs::read_to_string(supply.join("type")).await.unwrap_or_default();
        if kind.trim() != "Battery" {
            continue;
        }
        let capacity_path = supply.join("capacity");
        let capacity: f64 = tokio::fs::read_to_string(&capacity_path)
            .await
            .with_context(|| format!("reading {}", capacity_path.display()))?
            .trim()
            .parse()
            .with_context(|| format!("parsing {}", capacity_path.display()))?;
        let status = tokio::fs::read_to_string(supply.join("status")).await.unwrap_or_default();
        return Ok(Some(BatteryStatus {
            level: (capacity / 100.0).clamp(0.0, 1.0),
            charging: status.trim() == "Charging",
        }));
    }
    Ok(None)
}

fn gpu_vendor_name(vendor_id: &str) -> String {
    match vendor_id.trim().to_ascii_lowercase().as_str() {
        "0x10de" => "NVIDIA Corporation".to_string(),
        "0x1002" => "Advanced Micro Devices, Inc.".to_string(),
        "0x8086" => "Intel Corporation".to_string(),
        "0x1af4" => "Red Hat, Inc. (virtio)".to_string(),
        "0x15ad" => "VMware".to_string(),
        other => format!("Vendor {}", other),
    }
}

async fn read_graphics(drm: &Path) -> GraphicsAccess {
    let Ok(mut entries) = tokio::fs::read_dir(drm).await else {
        return GraphicsAccess::Unsupported;
    };

    let mut saw_card = false;
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with("card") || name.contains('-') {
            continue;
        }
        saw_card = true;
        let device = entry.path().join("device");
        let vendor = tokio::fs::read_to_string(device.join("vendor")).await;
        let product = tokio::fs::read_to_string(device.join("device")).await;
        if let (Ok(vendor), Ok(product)) = (vendor, product) {
            let vendor = gpu_vendor_name(&vendor);
            let renderer = format!("{} device {}", vendor, product.trim());
            return GraphicsAccess::Detailed { vendor, renderer };
        }
    }

    if saw_card {
        GraphicsAccess::Restricted
    } else {
        GraphicsAccess::Unsupported
    }
}
