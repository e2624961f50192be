//! Main application orchestration and execution

use crate::{
    aggregator::{DeviceProbeAggregator, DEVICE_ERROR_MESSAGE},
    cli::Cli,
    config::{display_config_summary, load_config, validate_config},
    error::{AppError, Result},
    host::{KeyboardMonitor, NativeHost},
    interactive::{RetryChoice, RetryPrompt},
    logging::{ErrorEventLogger, LoggerFactory},
    models::{Config, DeviceRecord, SpeedTestResult},
    output::{JsonReport, OutputCoordinator, OutputFormatterFactory, SpeedTestReport},
    speedtest::{RunOutcome, SpeedTestSequencer, SPEEDTEST_ERROR_MESSAGE},
};
use std::future::Future;
use std::sync::Arc;

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
}

/// Shared pieces for one invocation
struct Session {
    config: Config,
    factory: LoggerFactory,
    error_logger: ErrorEventLogger,
    keyboard: KeyboardMonitor,
    prompt: RetryPrompt,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Result<Self> {
        cli.validate().map_err(AppError::validation)?;
        Ok(Self { cli })
    }

    /// Run the application
    pub async fn run(self) -> Result<()> {
        let config = load_config(self.cli.clone())?;
        let warnings = validate_config(&config)?;

        let factory = LoggerFactory::new(config.clone());
        let app_logger = factory.create_logger("APP").await;
        crate::log_debug!(
            app_logger,
            "{} v{} ({}, {}, built {}) session {}",
            crate::PKG_NAME,
            crate::VERSION,
            crate::GIT_COMMIT.unwrap_or("unknown commit"),
            crate::TARGET_TRIPLE,
            crate::BUILD_TIME,
            factory.session_id()
        );

        if config.debug {
            eprintln!("Configuration Summary:");
            eprintln!("{}", display_config_summary(&config));
            eprintln!();
        }

        if !warnings.is_empty() && !config.json_output {
            eprintln!("Configuration Warnings:");
            for warning in &warnings {
                eprintln!("  {}", warning.format(config.enable_color));
            }
            eprintln!();
        }

        let keyboard = KeyboardMonitor::new();
        // Prompt answers only count as key events while a listener is installed
        let _listener = self.cli.interactive.then(|| keyboard.install());

        let session = Session {
            error_logger: factory.create_error_logger().await,
            prompt: RetryPrompt::new(config.enable_color, keyboard.clone()),
            keyboard,
            factory,
            config,
        };

        let mut failures = Vec::new();

        let device = if self.cli.run_device() {
            match self.run_device_flow(&session).await {
                Ok(record) => Some(record),
                Err(e) => {
                    failures.push((DEVICE_ERROR_MESSAGE, e));
                    None
                }
            }
        } else {
            None
        };

        let speed = if self.cli.speed_test {
            match self.run_speed_flow(&session).await {
                Ok(result) => Some(result),
                Err(e) => {
                    failures.push((SPEEDTEST_ERROR_MESSAGE, e));
                    None
                }
            }
        } else {
            None
        };

        self.render(&session.config, device, speed, &failures)?;

        if failures.is_empty() {
            crate::log_info!(app_logger, "All requested flows completed");
        } else {
            crate::log_warn!(app_logger, "{} flow(s) failed after retries", failures.len());
        }

        match failures.into_iter().next() {
            Some((_, error)) => Err(error),
            None => Ok(()),
        }
    }

    async fn run_device_flow(&self, session: &Session) -> Result<DeviceRecord> {
        let host = NativeHost::initialize(&session.config, session.factory.create_network_logger().await).await?;
        let aggregator = DeviceProbeAggregator::new(Arc::new(host), session.keyboard.clone(), &session.config)?
            .with_loggers(session.factory.create_probe_logger().await, session.error_logger.clone());

        let aggregator = &aggregator;
        self.with_retries(session, "device probe", DEVICE_ERROR_MESSAGE, move |first| async move {
            if first {
                aggregator.run().await
            } else {
                aggregator.retry().await
            }
        })
        .await
    }

    async fn run_speed_flow(&self, session: &Session) -> Result<SpeedTestResult> {
        let sequencer = SpeedTestSequencer::new(&session.config)?.with_loggers(
            session.factory.create_network_logger().await,
            session.error_logger.clone(),
        );

        let watcher = (!session.config.json_output).then(|| {
            let mut progress = sequencer.subscribe();
            let prompt = session.prompt.clone();
            tokio::spawn(async move {
                while progress.changed().await.is_ok() {
                    let state = progress.borrow_and_update().clone();
                    if state.testing {
                        prompt.display_progress(&state);
                    }
                }
            })
        });

        let sequencer = &sequencer;
        let outcome = self
            .with_retries(session, "speed test", SPEEDTEST_ERROR_MESSAGE, move |first| async move {
                if first {
                    sequencer.run().await
                } else {
                    sequencer.retry().await
                }
            })
            .await;

        if let Some(watcher) = watcher {
            watcher.abort();
        }

        match outcome? {
            RunOutcome::Completed(result) => Ok(result),
            RunOutcome::AlreadyRunning => Err(AppError::internal("Speed test was already running")),
        }
    }

    /// Run `attempt` once, then again for each configured automatic retry,
    /// then for as long as the user asks for another try.
    async fn with_retries<T, F, Fut>(&self, session: &Session, flow: &str, message: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut(bool) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.cli.retries + 1;
        let mut attempts = 1;
        let mut result = attempt(true).await;

        loop {
            let error = match result {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if attempts < max_attempts {
                attempts += 1;
                session.error_logger.log_retry(flow, attempts, max_attempts).await;
            } else if self.cli.interactive
                && session.prompt.confirm_retry(flow, message)? == RetryChoice::Retry
            {
                attempts += 1;
                session.error_logger.log_retry(flow, attempts, attempts).await;
            } else {
                return Err(error);
            }

            result = attempt(false).await;
        }
    }

    fn render(
        &self,
        config: &Config,
        device: Option<DeviceRecord>,
        speed: Option<SpeedTestResult>,
        failures: &[(&str, AppError)],
    ) -> Result<()> {
        if config.json_output {
            let mut report = JsonReport::new();
            report.device = device;
            report.speed_test = speed.map(SpeedTestReport::from);
            report.errors = failures.iter().map(|(message, _)| message.to_string()).collect();
            println!("{}", report.render()?);
            return Ok(());
        }

        let coordinator = OutputCoordinator::new(OutputFormatterFactory::from_config(config));

        if let Some(record) = &device {
            println!("{}", coordinator.display_device_record(record)?);
        }

        if let Some(result) = &speed {
            if device.is_some() {
                println!();
            }
            println!("{}", coordinator.display_speed_test(result)?);
        }

        for (message, _) in failures {
            eprintln!("{}", coordinator.display_error(message)?);
        }

        Ok(())
    }
}
