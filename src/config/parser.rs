//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    models::Config,
    error::Result,
    config::env::EnvManager,
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        self.load_env_file()?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config)?;

        config.validate()?;

        Ok(config)
    }

    /// Load .env file if it exists
    fn load_env_file(&self) -> Result<()> {
        EnvManager::load_env_file(self.cli.debug)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) -> Result<()> {
        if self.cli.no_color || self.cli.json {
            config.enable_color = false;
        } else if self.cli.color {
            config.enable_color = true;
        }

        // CLI-only flags
        config.json_output = self.cli.json;
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;

        if self.cli.resist_fingerprinting {
            config.resist_fingerprinting = true;
        }

        if let Some(ref user_agent) = self.cli.user_agent {
            config.user_agent = Some(user_agent.clone());
        }

        if let Some(ref page_url) = self.cli.page_url {
            config.page_url = Some(page_url.clone());
        }

        if let Some(ms) = self.cli.probe_timeout {
            config.probe_timeout_ms = ms;
            // A shorter probe budget also shortens candidate gathering
            config.lan_discovery_window_ms = config.lan_discovery_window_ms.min(ms);
        }

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!(
                "Final config: probe_timeout={}ms, enable_color={}, json={}",
                config.probe_timeout_ms, config.enable_color, config.json_output
            );
        }

        Ok(())
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    let parser = ConfigParser::new(cli);
    parser.parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("IP Lookup: {}", config.ip_lookup_url));
    summary.push(format!("Geo Lookup: {}", config.geo_lookup_url));
    summary.push(format!("Trace: {}", config.trace_url));
    summary.push(format!("Download: {} ({} bytes)", config.download_url, config.download_bytes));
    summary.push(format!("Upload: {} ({} bytes)", config.upload_url, config.upload_bytes));
    summary.push(format!("Page: {}", config.page_url.as_deref().unwrap_or("(none)")));
    summary.push(format!("Probe Timeout: {}ms", config.probe_timeout_ms));
    summary.push(format!("Latency Samples: {}", config.latency_samples));
    summary.push(format!("Resist Fingerprinting: {}", config.resist_fingerprinting));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}


#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::env;
    use std::sync::Mutex;

    // Environment and working directory are process-wide
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 12] = [
        "IP_LOOKUP_URL",
        "GEO_LOOKUP_URL",
        "TRACE_URL",
        "DOWNLOAD_URL",
        "UPLOAD_URL",
        "PAGE_URL",
        "USER_AGENT",
        "PROBE_TIMEOUT_MS",
        "DOWNLOAD_BYTES",
        "UPLOAD_BYTES",
        "LATENCY_SAMPLES",
        "ENABLE_COLOR",
    ];

    /// Run `f` with a clean environment and any .env file moved aside
    fn isolated<T>(backup: &str, f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        for var in VARS {
            env::remove_var(var);
        }

        let env_file_exists = std::path::Path::new(".env").exists();
        if env_file_exists {
            let _ = std::fs::rename(".env", backup);
        }

        let result = f();

        for var in VARS {
            env::remove_var(var);
        }
        if env_file_exists {
            let _ = std::fs::rename(backup, ".env");
        }
        result
    }

    #[test]
    fn test_defaults_without_overrides() {
        let config = isolated(".env.test_backup_defaults", || {
            ConfigParser::new(Cli::parse_from(["dsi"])).parse().unwrap()
        });

        assert_eq!(config.probe_timeout_ms, 5000);
        assert_eq!(config.latency_samples, crate::defaults::DEFAULT_LATENCY_SAMPLES);
        assert!(config.page_url.is_none());
        assert!(!config.json_output);
    }

    #[test]
    fn test_cli_overrides() {
        let config = isolated(".env.test_backup_cli_overrides", || {
            let cli = Cli::parse_from([
                "dsi",
                "--no-color",
                "--verbose",
                "--user-agent",
                "Mozilla/5.0 Edg/120.0",
                "--page-url",
                "https://example.org/",
                "--resist-fingerprinting",
                "--probe-timeout",
                "2500",
            ]);
            ConfigParser::new(cli).parse().unwrap()
        });

        assert!(!config.enable_color);
        assert!(config.verbose);
        assert_eq!(config.user_agent.as_deref(), Some("Mozilla/5.0 Edg/120.0"));
        assert_eq!(config.page_url.as_deref(), Some("https://example.org/"));
        assert!(config.resist_fingerprinting);
        assert_eq!(config.probe_timeout_ms, 2500);
        assert_eq!(config.lan_discovery_window_ms, 1000);
    }

    #[test]
    fn test_short_probe_timeout_shrinks_lan_window() {
        let config = isolated(".env.test_backup_short_timeout", || {
            ConfigParser::new(Cli::parse_from(["dsi", "--probe-timeout", "400"])).parse().unwrap()
        });

        assert_eq!(config.probe_timeout_ms, 400);
        assert_eq!(config.lan_discovery_window_ms, 400);
    }

    #[test]
    fn test_json_disables_color() {
        let config = isolated(".env.test_backup_json", || {
            ConfigParser::new(Cli::parse_from(["dsi", "--json", "--color"])).parse().unwrap()
        });

        assert!(config.json_output);
        assert!(!config.enable_color);
    }

    #[test]
    fn test_env_vars_are_merged() {
        let config = isolated(".env.test_backup_env_merge", || {
            env::set_var("TRACE_URL", "http://127.0.0.1:9/trace");
            env::set_var("LATENCY_SAMPLES", "4");
            env::set_var("ENABLE_COLOR", "false");
            env::set_var("PAGE_URL", "https://example.net/");
            ConfigParser::new(Cli::parse_from(["dsi"])).parse().unwrap()
        });

        assert_eq!(config.trace_url, "http://127.0.0.1:9/trace");
        assert_eq!(config.latency_samples, 4);
        assert!(!config.enable_color);
        assert_eq!(config.page_url.as_deref(), Some("https://example.net/"));
    }

    #[test]
    fn test_cli_overrides_env_vars() {
        let config = isolated(".env.test_backup_cli_over_env", || {
            env::set_var("PROBE_TIMEOUT_MS", "8000");
            env::set_var("USER_AGENT", "from-env");
            let cli = Cli::parse_from(["dsi", "--probe-timeout", "3000", "--user-agent", "from-cli"]);
            ConfigParser::new(cli).parse().unwrap()
        });

        assert_eq!(config.probe_timeout_ms, 3000);
        assert_eq!(config.user_agent.as_deref(), Some("from-cli"));
    }

    #[test]
    fn test_invalid_env_value_is_an_error() {
        let result = isolated(".env.test_backup_invalid_env", || {
            env::set_var("DOWNLOAD_BYTES", "lots");
            ConfigParser::new(Cli::parse_from(["dsi"])).parse()
        });

        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_page_url_from_cli_is_rejected() {
        let result = isolated(".env.test_backup_invalid_page", || {
            ConfigParser::new(Cli::parse_from(["dsi", "--page-url", "ftp://example.com/"])).parse()
        });

        assert!(result.is_err());
    }

    #[test]
    fn test_config_summary() {
        let config = Config::default();
        let summary = display_config_summary(&config);

        assert!(summary.contains("Geo Lookup: https://ipapi.co/{ip}/json/"));
        assert!(summary.contains("Probe Timeout: 5000ms"));
        assert!(summary.contains("Page: (none)"));
    }
}
