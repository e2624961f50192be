//! Command-line interface

use clap::Parser;

/// Device Inspector - report what this host exposes and how fast its network is
#[derive(Parser, Debug, Clone)]
#[command(name = "dsi")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Run the latency, download and upload speed test
    #[arg(short = 's', long)]
    pub speed_test: bool,

    /// Skip device probing (only meaningful with --speed-test)
    #[arg(long, requires = "speed_test")]
    pub no_device: bool,

    /// Emit one JSON document instead of formatted text
    #[arg(long)]
    pub json: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,

    /// Identity string to report instead of the built-in one
    #[arg(long, value_name = "STRING")]
    pub user_agent: Option<String>,

    /// Page to fetch for navigation timing and protocol version
    #[arg(long, value_name = "URL")]
    pub page_url: Option<String>,

    /// Blank every canvas readback, as a fingerprint-resistant host would
    #[arg(long)]
    pub resist_fingerprinting: bool,

    /// Per-probe timeout in milliseconds
    #[arg(long, value_name = "MS", value_parser = parse_probe_timeout)]
    pub probe_timeout: Option<u64>,

    /// Automatically re-run a failed flow this many times
    #[arg(long, default_value_t = crate::defaults::DEFAULT_RETRIES, value_parser = clap::value_parser!(u32).range(0..=10))]
    pub retries: u32,

    /// Offer a manual retry prompt when a flow fails
    #[arg(short, long)]
    pub interactive: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts and requirements
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.json && self.interactive {
            return Err("--interactive cannot be combined with --json".to_string());
        }

        Ok(())
    }

    /// Whether the device probe flow runs
    pub fn run_device(&self) -> bool {
        !self.no_device
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color || self.json {
            false
        } else {
            supports_color()
        }
    }
}

/// Parse a probe timeout in milliseconds
fn parse_probe_timeout(s: &str) -> Result<u64, String> {
    if s.starts_with('+') || s.starts_with("0x") || s.starts_with("0X") {
        return Err(format!("Invalid timeout: {}", s));
    }

    s.parse::<u64>()
        .map_err(|_| format!("Invalid timeout: {}", s))
        .and_then(|ms| {
            if ms == 0 {
                Err("Timeout must be greater than 0".to_string())
            } else if ms > 60_000 {
                Err("Timeout cannot exceed 60000 milliseconds".to_string())
            } else {
                Ok(ms)
            }
        })
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(target_os = "windows")]
    {
        if std::env::var("ANSICON").is_ok() || std::env::var("ConEmuANSI").is_ok() {
            return true;
        }
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_basic() {
        let cli = Cli::parse_from(["dsi"]);
        assert!(!cli.speed_test);
        assert!(cli.run_device());
        assert_eq!(cli.retries, 0);
        assert_eq!(cli.probe_timeout, None);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_cli_parsing_all_options() {
        let cli = Cli::parse_from([
            "dsi",
            "--speed-test",
            "--no-device",
            "--no-color",
            "--verbose",
            "--debug",
            "--user-agent",
            "Mozilla/5.0 Edg/100.0",
            "--page-url",
            "https://example.com/",
            "--resist-fingerprinting",
            "--probe-timeout",
            "2500",
            "--retries",
            "3",
            "--interactive",
        ]);

        assert!(cli.speed_test);
        assert!(!cli.run_device());
        assert!(cli.no_color);
        assert!(cli.verbose && cli.debug);
        assert_eq!(cli.user_agent.as_deref(), Some("Mozilla/5.0 Edg/100.0"));
        assert_eq!(cli.page_url.as_deref(), Some("https://example.com/"));
        assert!(cli.resist_fingerprinting);
        assert_eq!(cli.probe_timeout, Some(2500));
        assert_eq!(cli.retries, 3);
        assert!(cli.interactive);
        assert!(!cli.use_colors());
    }

    #[test]
    fn test_no_device_requires_speed_test() {
        assert!(Cli::try_parse_from(["dsi", "--no-device"]).is_err());
    }

    #[test]
    fn test_conflicting_flags() {
        let cli = Cli::parse_from(["dsi", "--color", "--no-color"]);
        assert!(cli.validate().is_err());

        let cli = Cli::parse_from(["dsi", "--json", "--interactive"]);
        assert!(cli.validate().is_err());
    }

    #[test]
    fn test_json_disables_color() {
        let cli = Cli::parse_from(["dsi", "--json"]);
        assert!(!cli.use_colors());
    }

    #[test]
    fn test_probe_timeout_parsing() {
        assert_eq!(parse_probe_timeout("750"), Ok(750));
        assert!(parse_probe_timeout("0").is_err());
        assert!(parse_probe_timeout("+5").is_err());
        assert!(parse_probe_timeout("60001").is_err());
        assert!(Cli::try_parse_from(["dsi", "--retries", "11"]).is_err());
    }
}
