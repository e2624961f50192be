//! Sequential speed test
//!
//! Latency, then download, then upload, each awaited in turn. Progress is
//! published at 25, 75 and 100 percent. A failed transfer is replaced by a
//! pseudo-random figure flagged as simulated; a failed latency phase aborts
//! the run.

pub mod phases;

use crate::client::build_http_client;
use crate::error::Result;
use crate::logging::{ErrorEventLogger, NetworkLogger};
use crate::models::{Config, SpeedTestResult};
use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

pub use phases::{DOWNLOAD_FALLBACK_MBPS, UPLOAD_FALLBACK_MBPS};

/// The one message shown when a speed test run fails
pub const SPEEDTEST_ERROR_MESSAGE: &str = "An error occurred during the speed test. Please try again.";

pub const LATENCY_PROGRESS: u8 = 25;
pub const DOWNLOAD_PROGRESS: u8 = 75;
pub const UPLOAD_PROGRESS: u8 = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SpeedTestPhase {
    #[default]
    Idle,
    Latency,
    Download,
    Upload,
    Complete,
}

/// Observable state of the sequencer
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpeedTestState {
    pub testing: bool,
    pub phase: SpeedTestPhase,
    pub progress: u8,
    pub download: Option<f64>,
    pub upload: Option<f64>,
    pub ping: Option<f64>,
    pub jitter: Option<f64>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(SpeedTestResult),
    /// A run was already in flight; nothing was started or changed
    AlreadyRunning,
}

/// Clears the in-flight flag however the run ends
struct FlightGuard<'a>(&'a AtomicBool);

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct SpeedTestSequencer {
    client: Client,
    config: Config,
    testing: AtomicBool,
    state: watch::Sender<SpeedTestState>,
    network_logger: NetworkLogger,
    error_logger: ErrorEventLogger,
}

impl SpeedTestSequencer {
    pub fn new(config: &Config) -> Result<Self> {
        let client = build_http_client(config, config.request_timeout())?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &Config) -> Self {
        let (state, _) = watch::channel(SpeedTestState::default());
        Self {
            client,
            config: config.clone(),
            testing: AtomicBool::new(false),
            state,
            network_logger: NetworkLogger::new(config),
            error_logger: ErrorEventLogger::new(config),
        }
    }

    /// Replace the default loggers, e.g. with ones sharing a session ID
    pub fn with_loggers(mut self, network_logger: NetworkLogger, error_logger: ErrorEventLogger) -> Self {
        self.network_logger = network_logger;
        self.error_logger = error_logger;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SpeedTestState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SpeedTestState {
        self.state.borrow().clone()
    }

    pub fn is_testing(&self) -> bool {
        self.testing.load(Ordering::SeqCst)
    }

    /// Run all three phases. A call while a run is in flight returns
    /// [`RunOutcome::AlreadyRunning`] and leaves the state untouched.
    pub async fn run(&self) -> Result<RunOutcome> {
        if self
            .testing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            self.network_logger
                .logger()
                .debug("Speed test already running; ignoring request")
                .log()
                .await;
            return Ok(RunOutcome::AlreadyRunning);
        }
        let _flight = FlightGuard(&self.testing);

        self.state.send_replace(SpeedTestState {
            testing: true,
            phase: SpeedTestPhase::Latency,
            ..SpeedTestState::default()
        });

        let logger = self.network_logger.logger();
        let correlation_id = logger.start_operation("speed test").await;
        let started = std::time::Instant::now();

        match self.sequence().await {
            Ok(result) => {
                self.state.send_modify(|state| {
                    state.testing = false;
                    state.phase = SpeedTestPhase::Complete;
                });
                logger.end_operation(&correlation_id, "speed test", true, started.elapsed()).await;
                Ok(RunOutcome::Completed(result))
            }
            Err(e) => {
                self.error_logger.log_error(&e, Some("speed test"), Some(&correlation_id)).await;
                logger.end_operation(&correlation_id, "speed test", false, started.elapsed()).await;
                self.state.send_replace(SpeedTestState {
                    error: Some(SPEEDTEST_ERROR_MESSAGE.to_string()),
                    ..SpeedTestState::default()
                });
                Err(e)
            }
        }
    }

    /// Manual retry after a failed run
    pub async fn retry(&self) -> Result<RunOutcome> {
        self.run().await
    }

    async fn sequence(&self) -> Result<SpeedTestResult> {
        let latency = phases::measure_latency(
            &self.client,
            &self.config.trace_url,
            self.config.latency_samples,
            self.config.latency_interval(),
            &self.network_logger,
        )
        .await?;
        self.state.send_modify(|state| {
            state.ping = Some(latency.mean_ms);
            state.jitter = Some(latency.jitter_ms);
            state.progress = LATENCY_PROGRESS;
            state.phase = SpeedTestPhase::Download;
        });

        let measured = phases::measure_download(
            &self.client,
            &self.config.download_url,
            self.config.download_bytes,
            &self.network_logger,
        )
        .await;
        let (download, download_simulated) = self.or_fallback("Download", measured, DOWNLOAD_FALLBACK_MBPS).await;
        self.state.send_modify(|state| {
            state.download = Some(download);
            state.progress = DOWNLOAD_PROGRESS;
            state.phase = SpeedTestPhase::Upload;
        });

        let measured = phases::measure_upload(
            &self.client,
            &self.config.upload_url,
            self.config.upload_bytes,
            &self.network_logger,
        )
        .await;
        let (upload, upload_simulated) = self.or_fallback("Upload", measured, UPLOAD_FALLBACK_MBPS).await;
        self.state.send_modify(|state| {
            state.upload = Some(upload);
            state.progress = UPLOAD_PROGRESS;
        });

        Ok(SpeedTestResult {
            download_mbps: Some(download),
            upload_mbps: Some(upload),
            ping_ms: Some(latency.mean_ms),
            jitter_ms: Some(latency.jitter_ms),
            download_simulated,
            upload_simulated,
            completed_at: Utc::now(),
        })
    }

    async fn or_fallback(&self, direction: &str, measured: Result<f64>, range: std::ops::Range<f64>) -> (f64, bool) {
        match measured {
            Ok(mbps) => (mbps, false),
            Err(e) => {
                let substitute = phases::fallback_mbps(range);
                self.network_logger.log_fallback(direction, &e, substitute).await;
                (substitute, true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> Config {
        Config {
            trace_url: format!("{}/trace", server.uri()),
            download_url: format!("{}/__down", server.uri()),
            upload_url: format!("{}/post", server.uri()),
            latency_samples: 3,
            latency_interval_ms: 5,
            download_bytes: 4096,
            upload_bytes: 2048,
            ..Config::default()
        }
    }

    async fn mount_trace(server: &MockServer, delay: Duration) {
        Mock::given(method("GET"))
            .and(path("/trace"))
            .respond_with(ResponseTemplate::new(200).set_delay(delay))
            .mount(server)
            .await;
    }

    async fn mount_transfers(server: &MockServer, status: u16) {
        Mock::given(method("GET"))
            .and(path("/__down"))
            .respond_with(ResponseTemplate::new(status).set_body_bytes(vec![1u8; 4096]))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/post"))
            .respond_with(ResponseTemplate::new(status))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_complete_run_publishes_final_state() {
        let server = MockServer::start().await;
        mount_trace(&server, Duration::ZERO).await;
        mount_transfers(&server, 200).await;

        let sequencer = SpeedTestSequencer::new(&config_for(&server)).unwrap();
        let RunOutcome::Completed(result) = sequencer.run().await.unwrap() else {
            panic!("expected a completed run");
        };

        assert!(!result.has_simulated_values());
        assert!(result.ping_ms.is_some() && result.jitter_ms.is_some());

        let state = sequencer.state();
        assert!(!state.testing);
        assert_eq!(state.progress, 100);
        assert_eq!(state.phase, SpeedTestPhase::Complete);
        assert_eq!(state.download, result.download_mbps);
        assert_eq!(state.upload, result.upload_mbps);
        assert_eq!(state.error, None);
        assert!(!sequencer.is_testing());
    }

    #[tokio::test]
    async fn test_failed_transfers_fall_back_to_simulated_values() {
        let server = MockServer::start().await;
        mount_trace(&server, Duration::ZERO).await;
        mount_transfers(&server, 503).await;

        let sequencer = SpeedTestSequencer::new(&config_for(&server)).unwrap();
        let RunOutcome::Completed(result) = sequencer.run().await.unwrap() else {
            panic!("expected a completed run");
        };

        assert!(result.download_simulated && result.upload_simulated);
        assert!(DOWNLOAD_FALLBACK_MBPS.contains(&result.download_mbps.unwrap()));
        assert!(UPLOAD_FALLBACK_MBPS.contains(&result.upload_mbps.unwrap()));
        assert_eq!(sequencer.state().progress, 100);
    }

    #[tokio::test]
    async fn test_latency_failure_aborts_and_clears_results() {
        let config = Config {
            trace_url: "http://127.0.0.1:1/trace".to_string(),
            latency_samples: 2,
            latency_interval_ms: 1,
            ..Config::default()
        };
        let sequencer = SpeedTestSequencer::new(&config).unwrap();

        assert!(sequencer.run().await.is_err());
        let state = sequencer.state();
        assert_eq!(state.error.as_deref(), Some(SPEEDTEST_ERROR_MESSAGE));
        assert!(!state.testing);
        assert_eq!(state.progress, 0);
        assert_eq!(state.ping, None);
        assert_eq!(state.download, None);
        assert!(!sequencer.is_testing());
    }

    #[tokio::test]
    async fn test_second_run_while_testing_is_ignored() {
        let server = MockServer::start().await;
        mount_trace(&server, Duration::from_millis(150)).await;
        mount_transfers(&server, 200).await;

        let sequencer = Arc::new(SpeedTestSequencer::new(&config_for(&server)).unwrap());
        let first = tokio::spawn({
            let sequencer = Arc::clone(&sequencer);
            async move { sequencer.run().await }
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        let before = sequencer.state();
        assert!(before.testing);

        assert_eq!(sequencer.run().await.unwrap(), RunOutcome::AlreadyRunning);
        assert_eq!(sequencer.state(), before);

        assert!(matches!(first.await.unwrap().unwrap(), RunOutcome::Completed(_)));
        assert!(matches!(sequencer.run().await.unwrap(), RunOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn test_retry_after_failure_starts_clean() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/trace"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_trace(&server, Duration::ZERO).await;
        mount_transfers(&server, 200).await;

        let client = Client::builder().timeout(Duration::from_millis(100)).build().unwrap();
        let sequencer = SpeedTestSequencer::with_client(client, &config_for(&server));

        assert!(sequencer.run().await.is_err());
        assert_eq!(sequencer.state().error.as_deref(), Some(SPEEDTEST_ERROR_MESSAGE));

        assert!(matches!(sequencer.retry().await.unwrap(), RunOutcome::Completed(_)));
        let state = sequencer.state();
        assert_eq!(state.error, None);
        assert_eq!(state.progress, 100);
    }

    #[tokio::test]
    async fn test_progress_checkpoints_in_order() {
        let server = MockServer::start().await;
        mount_trace(&server, Duration::ZERO).await;
        Mock::given(method("GET"))
            .and(path("/__down"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(100)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/post"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(100)))
            .mount(&server)
            .await;

        let sequencer = SpeedTestSequencer::new(&config_for(&server)).unwrap();
        let mut rx = sequencer.subscribe();
        let watcher = tokio::spawn(async move {
            let mut seen: Vec<u8> = Vec::new();
            while rx.changed().await.is_ok() {
                let progress = rx.borrow_and_update().progress;
                if progress > 0 && seen.last() != Some(&progress) {
                    seen.push(progress);
                }
                if progress == 100 {
                    break;
                }
            }
            seen
        });

        sequencer.run().await.unwrap();
        assert_eq!(watcher.await.unwrap(), vec![25, 75, 100]);
    }
}
