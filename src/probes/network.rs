//! Network self-lookup and local address discovery

use crate::error::{AppError, Result};
use crate::host::HostEnvironment;
use crate::models::NetworkInfo;
use crate::types::sentinel;
use regex::Regex;
use std::time::Duration;
use tokio::time::timeout;

pub const VPN_NOTICE: &str = "Detection requires advanced techniques";
pub const TOR_NOTICE: &str = "Detection requires server-side checks";

const DOTTED_QUAD: &str = r"([0-9]{1,3}(\.[0-9]{1,3}){3})";

/// Public address, then geolocation for it; any failure in the chain fails the whole lookup.
///
/// Local discovery runs alongside the chain under its own window, so a silent
/// gathering session only costs the `lan` field.
pub async fn network_info(
    host: &dyn HostEnvironment,
    hostname: Option<String>,
    lookup_timeout: Duration,
    lan_window: Duration,
) -> Result<NetworkInfo> {
    let lookups = async {
        let ip = host.public_address().await?;
        let geo = host.geolocate(&ip).await?;
        Ok::<_, AppError>((ip, geo))
    };
    let (lookups, lan) = tokio::join!(timeout(lookup_timeout, lookups), discover_lan(host, lan_window));
    let (ip, geo) = lookups.map_err(|_| {
        AppError::timeout(format!("Network lookups timed out after {}ms", lookup_timeout.as_millis()))
    })??;

    Ok(NetworkInfo {
        ip: ip.clone(),
        vpn: VPN_NOTICE.to_string(),
        tor: TOR_NOTICE.to_string(),
        proxy: if geo.proxy { sentinel::DETECTED } else { sentinel::NOT_DETECTED }.to_string(),
        isp: geo
            .org
            .filter(|org| !org.trim().is_empty())
            .unwrap_or_else(|| sentinel::NOT_AVAILABLE.to_string()),
        wan: ip,
        lan,
        latitude: geo.latitude,
        longitude: geo.longitude,
        hostname,
    })
}

/// First dotted quad in a candidate line
pub fn extract_address(matcher: &Regex, candidate: &str) -> Option<String> {
    matcher.captures(candidate).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}

pub fn address_matcher() -> Result<Regex> {
    Regex::new(DOTTED_QUAD).map_err(|e| AppError::internal(format!("Invalid address pattern: {}", e)))
}

/// Wait up to `window` for a local candidate carrying an address.
///
/// Setup failure yields "Not available", an empty window "Not detected". The
/// session is closed on every path.
pub async fn discover_lan(host: &dyn HostEnvironment, window: Duration) -> String {
    let Ok(matcher) = address_matcher() else {
        return sentinel::NOT_AVAILABLE.to_string();
    };
    let mut session = match host.gather_candidates().await {
        Ok(session) => session,
        Err(_) => return sentinel::NOT_AVAILABLE.to_string(),
    };

    let found = timeout(window, async {
        while let Some(candidate) = session.next_candidate().await {
            if let Some(address) = extract_address(&matcher, &candidate) {
                return Some(address);
            }
        }
        // Gathering ended early; keep waiting out the window like a silent session
        std::future::pending::<Option<String>>().await
    })
    .await;
    session.close();

    match found {
        Ok(Some(address)) => address,
        _ => sentinel::NOT_DETECTED.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::fake::{CandidateScript, FakeHost};

    #[test]
    fn test_extract_address() {
        let matcher = address_matcher().unwrap();
        assert_eq!(
            extract_address(&matcher, "candidate:842163049 1 udp 1677729535 192.168.1.34 56143 typ srflx").as_deref(),
            Some("192.168.1.34")
        );
        assert_eq!(extract_address(&matcher, "candidate:1 1 udp 2122260223 abcd.local 54321 typ host"), None);
    }

    const LOOKUPS: Duration = Duration::from_millis(300);

    #[tokio::test]
    async fn test_successful_chain() {
        let host = FakeHost::healthy();
        let info = network_info(&host, Some("box".to_string()), LOOKUPS, Duration::from_millis(200))
            .await
            .unwrap();
        assert_eq!(info.ip, "203.0.113.9");
        assert_eq!(info.wan, info.ip);
        assert_eq!(info.vpn, VPN_NOTICE);
        assert_eq!(info.tor, TOR_NOTICE);
        assert_eq!(info.proxy, "Not detected");
        assert_eq!(info.isp, "Example ISP");
        assert_eq!(info.lan, "10.0.0.5");
        assert_eq!(info.latitude, Some(48.85));
        assert_eq!(info.hostname.as_deref(), Some("box"));
    }

    #[tokio::test]
    async fn test_failed_address_lookup_fails_chain() {
        let host = FakeHost::healthy().with_failed_address_lookup();
        assert!(network_info(&host, None, LOOKUPS, Duration::from_millis(200)).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_geolocation_fails_chain() {
        let host = FakeHost::healthy().with_failed_geolocation();
        assert!(network_info(&host, None, LOOKUPS, Duration::from_millis(200)).await.is_err());
    }

    #[tokio::test]
    async fn test_silent_lan_keeps_lookup_results() {
        let host = FakeHost::healthy().with_candidates(CandidateScript::Silent);
        let info = network_info(&host, None, LOOKUPS, LOOKUPS).await.unwrap();
        assert_eq!(info.ip, "203.0.113.9");
        assert_eq!(info.isp, "Example ISP");
        assert_eq!(info.lan, "Not detected");
    }

    #[tokio::test]
    async fn test_lan_silent_session_times_out() {
        let host = FakeHost::healthy().with_candidates(CandidateScript::Silent);
        assert_eq!(discover_lan(&host, Duration::from_millis(50)).await, "Not detected");
    }

    #[tokio::test]
    async fn test_lan_without_addresses_is_not_detected() {
        let host = FakeHost::healthy()
            .with_candidates(CandidateScript::Lines(vec!["candidate:1 1 udp 1 abcd.local 1 typ host".to_string()]));
        assert_eq!(discover_lan(&host, Duration::from_millis(50)).await, "Not detected");
    }

    #[tokio::test]
    async fn test_lan_setup_failure() {
        let host = FakeHost::healthy().with_candidates(CandidateScript::SetupFails);
        assert_eq!(discover_lan(&host, Duration::from_millis(50)).await, "Not available");
    }

    #[tokio::test]
    async fn test_lan_skips_to_first_matching_candidate() {
        let host = FakeHost::healthy().with_candidates(CandidateScript::Lines(vec![
            "candidate:1 1 udp 1 abcd.local 1 typ host".to_string(),
            "candidate:2 1 udp 1 172.16.4.2 1 typ host".to_string(),
            "candidate:3 1 udp 1 10.9.9.9 1 typ host".to_string(),
        ]));
        assert_eq!(discover_lan(&host, Duration::from_millis(200)).await, "172.16.4.2");
    }
}
