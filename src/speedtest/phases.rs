//! Individual speed test phases

use crate::error::{AppError, Result};
use crate::logging::NetworkLogger;
use crate::stats::{throughput_mbps, LatencySummary};
use futures::StreamExt;
use rand::{Rng, RngCore};
use reqwest::header::CACHE_CONTROL;
use reqwest::{multipart, Client};
use std::ops::Range;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use url::Url;

/// Substitute range for a failed download, in Mbps
pub const DOWNLOAD_FALLBACK_MBPS: Range<f64> = 15.0..45.0;

/// Substitute range for a failed upload, in Mbps
pub const UPLOAD_FALLBACK_MBPS: Range<f64> = 5.0..20.0;

pub const UPLOAD_FIELD: &str = "file";
pub const UPLOAD_FILENAME: &str = "speedtest.bin";

/// Round trips to `url`, `interval` apart. Any transport failure aborts the phase.
pub async fn measure_latency(
    client: &Client,
    url: &str,
    samples: u32,
    interval: Duration,
    logger: &NetworkLogger,
) -> Result<LatencySummary> {
    let mut elapsed_ms = Vec::with_capacity(samples as usize);

    for sample in 0..samples {
        if sample > 0 {
            tokio::time::sleep(interval).await;
        }

        let started = Instant::now();
        let response = client.get(url).header(CACHE_CONTROL, "no-store").send().await;
        let elapsed = started.elapsed();

        match response {
            Ok(response) => {
                logger
                    .log_http_request(url, "GET", Some(response.status().as_u16()), elapsed)
                    .await;
                elapsed_ms.push(elapsed.as_secs_f64() * 1000.0);
            }
            Err(e) => {
                logger.log_http_request(url, "GET", None, elapsed).await;
                return Err(AppError::from(e));
            }
        }
    }

    LatencySummary::from_samples(&elapsed_ms).ok_or_else(|| AppError::speed_test("No latency samples were taken"))
}

/// Download URL with the requested size and a cache-busting timestamp
pub fn download_url(base: &str, bytes: u64) -> Result<Url> {
    let cache_bust = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|since| since.as_millis())
        .unwrap_or_default();

    let mut url = Url::parse(base)?;
    url.query_pairs_mut()
        .append_pair("bytes", &bytes.to_string())
        .append_pair("cachebust", &cache_bust.to_string());
    Ok(url)
}

/// One timed GET, streaming the body and counting what actually arrived
pub async fn measure_download(client: &Client, base_url: &str, bytes: u64, logger: &NetworkLogger) -> Result<f64> {
    let url = download_url(base_url, bytes)?;

    let started = Instant::now();
    let response = client.get(url.clone()).header(CACHE_CONTROL, "no-store").send().await?;
    let status = response.status();
    logger
        .log_http_request(url.as_str(), "GET", Some(status.as_u16()), started.elapsed())
        .await;
    if !status.is_success() {
        return Err(AppError::http_request(format!("Download failed with status: {}", status)));
    }

    let mut received: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        received += chunk?.len() as u64;
    }
    let elapsed = started.elapsed();

    let mbps = throughput_mbps(received, elapsed)
        .ok_or_else(|| AppError::speed_test("Download completed too fast to measure"))?;
    logger.log_transfer("Download", received, elapsed, mbps).await;
    Ok(mbps)
}

pub fn random_payload(len: usize) -> Vec<u8> {
    let mut payload = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut payload);
    payload
}

/// Random bytes posted as a form file; timing starts after the payload exists
pub async fn measure_upload(client: &Client, url: &str, bytes: u64, logger: &NetworkLogger) -> Result<f64> {
    let len = usize::try_from(bytes).map_err(|_| AppError::validation(format!("Upload size {} is too large", bytes)))?;
    let part = multipart::Part::bytes(random_payload(len))
        .file_name(UPLOAD_FILENAME)
        .mime_str("application/octet-stream")?;
    let form = multipart::Form::new().part(UPLOAD_FIELD, part);

    let started = Instant::now();
    let response = client.post(url).multipart(form).send().await?;
    let elapsed = started.elapsed();
    let status = response.status();
    logger.log_http_request(url, "POST", Some(status.as_u16()), elapsed).await;
    if !status.is_success() {
        return Err(AppError::http_request(format!("Upload failed with status: {}", status)));
    }

    let mbps =
        throughput_mbps(bytes, elapsed).ok_or_else(|| AppError::speed_test("Upload completed too fast to measure"))?;
    logger.log_transfer("Upload", bytes, elapsed, mbps).await;
    Ok(mbps)
}

/// Uniform pseudo-random throughput standing in for a failed transfer
pub fn fallback_mbps(range: Range<f64>) -> f64 {
    rand::thread_rng().gen_range(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Config;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn logger() -> NetworkLogger {
        NetworkLogger::new(&Config::default())
    }

    #[test]
    fn test_download_url_carries_size_and_cache_bust() {
        let url = download_url("https://speed.example.com/__down", 52_428_800).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("bytes".to_string(), "52428800".to_string()));
        assert_eq!(pairs[1].0, "cachebust");
        assert!(pairs[1].1.parse::<u128>().unwrap() > 0);

        assert!(download_url("not a url", 1).is_err());
    }

    #[test]
    fn test_fallback_ranges() {
        for _ in 0..200 {
            assert!(DOWNLOAD_FALLBACK_MBPS.contains(&fallback_mbps(DOWNLOAD_FALLBACK_MBPS)));
            assert!(UPLOAD_FALLBACK_MBPS.contains(&fallback_mbps(UPLOAD_FALLBACK_MBPS)));
        }
    }

    #[test]
    fn test_random_payload_length() {
        assert_eq!(random_payload(0).len(), 0);
        assert_eq!(random_payload(4096).len(), 4096);
    }

    #[tokio::test]
    async fn test_latency_samples_every_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/trace"))
            .respond_with(ResponseTemplate::new(200).set_body_string("fl=1\n"))
            .expect(4)
            .mount(&server)
            .await;

        let url = format!("{}/trace", server.uri());
        let summary = measure_latency(&Client::new(), &url, 4, Duration::from_millis(5), &logger())
            .await
            .unwrap();
        assert_eq!(summary.sample_count, 4);
        assert!(summary.mean_ms > 0.0);
        assert!(summary.jitter_ms >= 0.0);
    }

    #[tokio::test]
    async fn test_latency_ignores_status_but_not_transport() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        let summary = measure_latency(&Client::new(), &server.uri(), 2, Duration::ZERO, &logger()).await;
        assert!(summary.is_ok());

        let unreachable = measure_latency(&Client::new(), "http://127.0.0.1:1/", 2, Duration::ZERO, &logger()).await;
        assert!(unreachable.is_err());
    }

    #[tokio::test]
    async fn test_download_counts_received_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/__down"))
            .and(query_param("bytes", "8192"))
            .and(header("cache-control", "no-store"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![7u8; 8192]))
            .expect(1)
            .mount(&server)
            .await;

        let base = format!("{}/__down", server.uri());
        let mbps = measure_download(&Client::new(), &base, 8192, &logger()).await.unwrap();
        assert!(mbps > 0.0);
    }

    #[tokio::test]
    async fn test_download_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let result = measure_download(&Client::new(), &server.uri(), 1024, &logger()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_upload_posts_form_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/post"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/post", server.uri());
        let mbps = measure_upload(&Client::new(), &url, 2048, &logger()).await.unwrap();
        assert!(mbps > 0.0);

        let requests = server.received_requests().await.unwrap();
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"file\""));
        assert!(body.contains("filename=\"speedtest.bin\""));
        let content_type = requests[0].headers.get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data"));
    }
}
