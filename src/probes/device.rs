//! Hardware, capability and protocol probes

use crate::error::Result;
use crate::host::{GraphicsAccess, HostEnvironment};
use crate::types::{sentinel, Capability};

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub async fn cache(host: &dyn HostEnvironment) -> Result<String> {
    Ok(match host.storage_estimate().await? {
        Some(estimate) => format!(
            "{} MB used of {} MB quota",
            (estimate.usage_bytes as f64 / BYTES_PER_MB).round(),
            (estimate.quota_bytes as f64 / BYTES_PER_MB).round()
        ),
        None => sentinel::NOT_AVAILABLE.to_string(),
    })
}

pub async fn extensions(host: &dyn HostEnvironment) -> Result<Vec<String>> {
    host.extensions().await
}

pub async fn ad_blocker(host: &dyn HostEnvironment) -> Result<String> {
    let blocked = host.ad_bait_blocked().await?;
    Ok(if blocked { sentinel::DETECTED } else { sentinel::NOT_DETECTED }.to_string())
}

pub async fn content_filtering(host: &dyn HostEnvironment) -> Result<String> {
    host.content_filtering().await
}

pub async fn battery(host: &dyn HostEnvironment) -> Result<Option<String>> {
    Ok(host.battery().await?.map(|status| {
        let charging = if status.charging { "charging" } else { "not charging" };
        format!("{}% ({})", (status.level * 100.0).round(), charging)
    }))
}

pub async fn gpu(host: &dyn HostEnvironment) -> Result<String> {
    Ok(match host.gpu_renderer().await? {
        GraphicsAccess::Detailed { renderer, .. } => renderer,
        GraphicsAccess::Restricted => "GPU information restricted".to_string(),
        GraphicsAccess::Unsupported => "WebGL not supported".to_string(),
    })
}

pub async fn web_gl(host: &dyn HostEnvironment) -> Result<String> {
    Ok(match host.webgl_info().await? {
        GraphicsAccess::Detailed { vendor, renderer } => format!("Vendor: {}, Renderer: {}", vendor, renderer),
        GraphicsAccess::Restricted => "WebGL supported, but detailed info restricted".to_string(),
        GraphicsAccess::Unsupported => "WebGL not supported".to_string(),
    })
}

pub async fn speakers(host: &dyn HostEnvironment) -> Result<String> {
    let outputs = host.audio_outputs().await?;
    Ok(format!("{} audio output device(s) detected", outputs))
}

pub fn supported(present: bool) -> String {
    let text = if present { sentinel::SUPPORTED } else { sentinel::NOT_SUPPORTED };
    text.to_string()
}

pub fn capability(host: &dyn HostEnvironment, capability: Capability) -> String {
    supported(host.has_capability(capability))
}

/// Constructing an audio context either works or the facility is absent
pub async fn audio_context(host: &dyn HostEnvironment) -> Result<String> {
    Ok(supported(host.open_audio_context().await.is_ok()))
}

fn server_side_only(observed: Option<String>) -> String {
    observed.unwrap_or_else(|| sentinel::SERVER_SIDE_ONLY.to_string())
}

pub async fn http_version(host: &dyn HostEnvironment) -> Result<String> {
    Ok(server_side_only(host.http_version().await?))
}

pub async fn tls_version(host: &dyn HostEnvironment) -> Result<String> {
    Ok(server_side_only(host.tls_version().await?))
}

pub async fn cipher(host: &dyn HostEnvironment) -> Result<String> {
    Ok(server_side_only(host.cipher_suite().await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fake::FakeHost;
    use crate::host::{BatteryStatus, StorageEstimate};

    #[tokio::test]
    async fn test_cache_rounds_megabytes() {
        let host = FakeHost::healthy().with_storage(Some(StorageEstimate {
            usage_bytes: 1_572_864,
            quota_bytes: 104_857_600,
        }));
        assert_eq!(cache(&host).await.unwrap(), "2 MB used of 100 MB quota");

        let host = FakeHost::healthy().with_storage(None);
        assert_eq!(cache(&host).await.unwrap(), "Not available");
    }

    #[tokio::test]
    async fn test_battery_format() {
        let host = FakeHost::healthy().with_battery(Some(BatteryStatus { level: 0.456, charging: false }));
        assert_eq!(battery(&host).await.unwrap().as_deref(), Some("46% (not charging)"));

        let host = FakeHost::healthy().with_battery(None);
        assert_eq!(battery(&host).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_graphics_texts() {
        let host = FakeHost::healthy();
        assert_eq!(gpu(&host).await.unwrap(), "Acme R1");
        assert_eq!(web_gl(&host).await.unwrap(), "Vendor: Acme, Renderer: Acme R1");

        let host = FakeHost::healthy().with_graphics(GraphicsAccess::Restricted);
        assert_eq!(gpu(&host).await.unwrap(), "GPU information restricted");
        assert_eq!(web_gl(&host).await.unwrap(), "WebGL supported, but detailed info restricted");

        let host = FakeHost::healthy().with_graphics(GraphicsAccess::Unsupported);
        assert_eq!(gpu(&host).await.unwrap(), "WebGL not supported");
        assert_eq!(web_gl(&host).await.unwrap(), "WebGL not supported");
    }

    #[tokio::test]
    async fn test_protocol_probes_default_to_server_side_notice() {
        let host = FakeHost::healthy().without_protocol_details();
        assert_eq!(http_version(&host).await.unwrap(), "Detection requires server-side information");
        assert_eq!(tls_version(&host).await.unwrap(), "Detection requires server-side information");
        assert_eq!(cipher(&host).await.unwrap(), "Detection requires server-side information");
    }

    #[tokio::test]
    async fn test_speakers_and_capabilities() {
        let host = FakeHost::healthy();
        assert_eq!(speakers(&host).await.unwrap(), "2 audio output device(s) detected");
        assert_eq!(capability(&host, Capability::Bluetooth), "Supported");
        assert_eq!(ad_blocker(&host).await.unwrap(), "Detected");
        assert_eq!(audio_context(&host).await.unwrap(), "Supported");
    }
}
