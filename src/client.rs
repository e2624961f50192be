//! HTTP clients for network self-lookup and page timing


use crate::{
    error::{AppError, Result},
    host::GeoLocation,
    logging::NetworkLogger,
    models::{Config, NavigationTiming},
};
use reqwest::{Client, Url};
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// User agent sent on every outbound request
pub fn default_user_agent() -> String {
    format!("{}/{}", crate::PKG_NAME, crate::VERSION)
}

/// Build the shared reqwest client
pub fn build_http_client(config: &Config, request_timeout: Duration) -> Result<Client> {
    let user_agent = config.user_agent.clone().unwrap_or_else(default_user_agent);
    Client::builder()
        .timeout(request_timeout)
        .user_agent(user_agent)
        .build()
        .map_err(|e| AppError::network(format!("Failed to create HTTP client: {}", e)))
}

/// Render a response protocol version the way the status line spells it
pub fn format_http_version(version: reqwest::Version) -> String {
    match version {
        reqwest::Version::HTTP_09 => "HTTP/0.9",
        reqwest::Version::HTTP_10 => "HTTP/1.0",
        reqwest::Version::HTTP_11 => "HTTP/1.1",
        reqwest::Version::HTTP_2 => "HTTP/2",
        reqwest::Version::HTTP_3 => "HTTP/3",
        _ => "Unknown",
    }
    .to_string()
}

#[derive(Debug, Deserialize)]
struct AddressResponse {
    ip: String,
}

/// Two-stage lookup of the caller's public address and its geolocation
#[derive(Debug, Clone)]
pub struct NetworkIdentityClient {
    client: Client,
    ip_lookup_url: String,
    geo_lookup_url: String,
    logger: NetworkLogger,
}

impl NetworkIdentityClient {
    pub fn new(config: &Config, logger: NetworkLogger) -> Result<Self> {
        let client = build_http_client(config, config.probe_timeout())?;
        Ok(Self::with_client(client, config, logger))
    }

    pub fn with_client(client: Client, config: &Config, logger: NetworkLogger) -> Self {
        Self {
            client,
            ip_lookup_url: config.ip_lookup_url.clone(),
            geo_lookup_url: config.geo_lookup_url.clone(),
            logger,
        }
    }

    /// Fetch a JSON document, treating transport errors and non-2xx statuses alike as failure
    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let start = Instant::now();
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                self.logger.log_http_request(url, "GET", None, start.elapsed()).await;
                return Err(e.into());
            }
        };

        let status = response.status();
        self.logger.log_http_request(url, "GET", Some(status.as_u16()), start.elapsed()).await;
        if !status.is_success() {
            return Err(AppError::http_request(format!("{} returned status {}", url, status)));
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| AppError::parse(format!("Unexpected response from {}: {}", url, e)))
    }

    /// Resolve the caller's public address
    pub async fn public_address(&self) -> Result<String> {
        let response: AddressResponse = self.get_json(&self.ip_lookup_url).await?;
        let ip = response.ip.trim().to_string();
        if ip.is_empty() {
            return Err(AppError::parse("Address lookup returned an empty address"));
        }
        Ok(ip)
    }

    /// Geolocation and ISP facts for an address; a service-level error payload counts as failure
    pub async fn geolocate(&self, ip: &str) -> Result<GeoLocation> {
        let url = self.geo_lookup_url.replace(crate::models::config::IP_PLACEHOLDER, ip);
        let document: serde_json::Value = self.get_json(&url).await?;

        if document.get("error").and_then(|v| v.as_bool()).unwrap_or(false) {
            let reason = document
                .get("reason")
                .and_then(|v| v.as_str())
                .unwrap_or("unspecified error");
            return Err(AppError::http_request(format!("Geolocation service error: {}", reason)));
        }

        Ok(serde_json::from_value(document)?)
    }
}

/// Milestones and protocol observed while fetching a page
#[derive(Debug, Clone, PartialEq)]
pub struct PageLoad {
    pub timing: NavigationTiming,
    pub http_version: String,
    pub status: u16,
}

fn epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Fetch `page_url` once, recording lookup, connect and transfer milestones
pub async fn measure_page_load(client: &Client, page_url: &str, connect_timeout: Duration) -> Result<PageLoad> {
    let navigation_start = epoch_ms();
    let url = Url::parse(page_url)?;
    let host = url
        .host_str()
        .ok_or_else(|| AppError::validation("Page URL must have a host"))?
        .to_string();
    let port = url
        .port_or_known_default()
        .ok_or_else(|| AppError::validation("Page URL must have a known port"))?;

    let fetch_start = epoch_ms();

    let domain_lookup_start = epoch_ms();
    let address = tokio::net::lookup_host((host.as_str(), port))
        .await?
        .next()
        .ok_or_else(|| AppError::network(format!("No addresses resolved for {}", host)))?;
    let domain_lookup_end = epoch_ms();

    let connect_start = epoch_ms();
    timeout(connect_timeout, TcpStream::connect(address))
        .await
        .map_err(|_| AppError::timeout(format!("Connecting to {} timed out", address)))??;
    let connect_end = epoch_ms();

    let request_start = epoch_ms();
    let response = client.get(url).send().await?;
    let response_start = epoch_ms();
    let status = response.status().as_u16();
    let http_version = format_http_version(response.version());
    response.bytes().await?;
    let response_end = epoch_ms();

    Ok(PageLoad {
        timing: NavigationTiming {
            navigation_start,
            fetch_start,
            domain_lookup_start,
            domain_lookup_end,
            connect_start,
            connect_end,
            request_start,
            response_start,
            response_end,
            dom_loading: response_end,
        },
        http_version,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_version_labels() {
        assert_eq!(format_http_version(reqwest::Version::HTTP_11), "HTTP/1.1");
        assert_eq!(format_http_version(reqwest::Version::HTTP_2), "HTTP/2");
    }

    #[test]
    fn test_default_user_agent() {
        assert!(default_user_agent().starts_with("device-inspector/"));
    }

    #[test]
    fn test_client_honours_user_agent_override() {
        let config = Config {
            user_agent: Some("Mozilla/5.0 Firefox/88.0".to_string()),
            ..Default::default()
        };
        assert!(build_http_client(&config, Duration::from_secs(5)).is_ok());
    }
}
