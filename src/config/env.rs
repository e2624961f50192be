//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::path::Path;

const URL_VARS: [&str; 6] = [
    "IP_LOOKUP_URL",
    "GEO_LOOKUP_URL",
    "TRACE_URL",
    "DOWNLOAD_URL",
    "UPLOAD_URL",
    "PAGE_URL",
];

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        if Path::new(".env").exists() {
            dotenv::from_filename(".env")
                .map_err(|e| AppError::config(format!("Failed to load .env file: {}", e)))?;

            if debug {
                eprintln!("Loaded configuration from .env file");
            }
        } else if debug {
            eprintln!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Device Inspector Configuration
#
# Values here act as defaults and can be overridden by command-line arguments.

# Public address lookup, must answer {"ip": "..."}
# IP_LOOKUP_URL=https://api.ipify.org?format=json

# Geolocation/ISP lookup; {ip} is replaced with the public address
# GEO_LOOKUP_URL=https://ipapi.co/{ip}/json/

# Round-trip endpoint for the latency phase
# TRACE_URL=https://www.cloudflare.com/cdn-cgi/trace

# Download endpoint accepting a bytes= query parameter
# DOWNLOAD_URL=https://speed.cloudflare.com/__down

# Form-data echo endpoint for the upload phase
# UPLOAD_URL=https://httpbin.org/post

# Page fetched for navigation timing and HTTP version
# PAGE_URL=https://example.com/

# Identity string reported by the browser probe
# USER_AGENT=Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0

# Per-probe timeout in milliseconds
# PROBE_TIMEOUT_MS=5000

# Number of round trips in the latency phase
# LATENCY_SAMPLES=10

# Transfer sizes in bytes
# DOWNLOAD_BYTES=52428800
# UPLOAD_BYTES=20971520

# Enable colored output (true/false)
# ENABLE_COLOR=true
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            k if URL_VARS.contains(&k) => {
                let value = value.trim();
                if !value.is_empty() {
                    url::Url::parse(&value.replace(crate::models::config::IP_PLACEHOLDER, "0.0.0.0"))
                        .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                }
            }
            "PROBE_TIMEOUT_MS" => {
                let ms: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid PROBE_TIMEOUT_MS value '{}': {}", value, e)))?;
                if !(100..=120_000).contains(&ms) {
                    return Err(AppError::config(format!(
                        "PROBE_TIMEOUT_MS must be between 100 and 120000, got: {}",
                        ms
                    )));
                }
            }
            "LATENCY_SAMPLES" => {
                let count: u32 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid LATENCY_SAMPLES value '{}': {}", value, e)))?;
                if count == 0 || count > 100 {
                    return Err(AppError::config(format!(
                        "LATENCY_SAMPLES must be between 1 and 100, got: {}",
                        count
                    )));
                }
            }
            "DOWNLOAD_BYTES" | "UPLOAD_BYTES" => {
                let bytes: u64 = value
                    .parse()
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if bytes == 0 || bytes > crate::models::config::MAX_TRANSFER_BYTES {
                    return Err(AppError::config(format!("{} is out of range: {}", key, bytes)));
                }
            }
            "USER_AGENT" => {
                if value.trim().is_empty() {
                    return Err(AppError::config("USER_AGENT cannot be blank"));
                }
            }
            "ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("IP_LOOKUP_URL", "Public address lookup service", "https://api.ipify.org?format=json"),
            ("GEO_LOOKUP_URL", "Geolocation lookup, {ip} is substituted", "https://ipapi.co/{ip}/json/"),
            ("TRACE_URL", "Latency round-trip endpoint", "https://www.cloudflare.com/cdn-cgi/trace"),
            ("DOWNLOAD_URL", "Download endpoint", "https://speed.cloudflare.com/__down"),
            ("UPLOAD_URL", "Upload echo endpoint", "https://httpbin.org/post"),
            ("PAGE_URL", "Page used for navigation timing", "https://example.com/"),
            ("USER_AGENT", "Identity string override", "Mozilla/5.0 ... Firefox/128.0"),
            ("PROBE_TIMEOUT_MS", "Per-probe timeout (100-120000)", "5000"),
            ("LATENCY_SAMPLES", "Latency round trips (1-100)", "10"),
            ("DOWNLOAD_BYTES", "Download size in bytes", "52428800"),
            ("UPLOAD_BYTES", "Upload size in bytes", "20971520"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<18} {}\n", var, description));
            help.push_str(&format!("  {:<18} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(var_name, _, _)| {
                let value = std::env::var(var_name).ok()?;
                Self::validate_env_var(var_name, &value).err().map(|e| format!("Warning: {}", e))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_example_content_lists_every_variable() {
        let content = EnvManager::create_example_env_content();
        for (name, _, _) in EnvManager::get_supported_env_vars() {
            assert!(content.contains(&format!("{}=", name)), "missing {}", name);
        }
    }

    #[test]
    fn test_save_example_file() {
        let temp_file = NamedTempFile::new().unwrap();
        EnvManager::save_example_env_file(temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("Device Inspector Configuration"));
    }

    #[test]
    fn test_validate_env_var() {
        assert!(EnvManager::validate_env_var("IP_LOOKUP_URL", "https://api.ipify.org?format=json").is_ok());
        assert!(EnvManager::validate_env_var("GEO_LOOKUP_URL", "https://ipapi.co/{ip}/json/").is_ok());
        assert!(EnvManager::validate_env_var("PROBE_TIMEOUT_MS", "5000").is_ok());
        assert!(EnvManager::validate_env_var("LATENCY_SAMPLES", "10").is_ok());
        assert!(EnvManager::validate_env_var("DOWNLOAD_BYTES", "52428800").is_ok());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "false").is_ok());
        assert!(EnvManager::validate_env_var("SOMETHING_ELSE", "whatever").is_ok());

        assert!(EnvManager::validate_env_var("TRACE_URL", "not a url").is_err());
        assert!(EnvManager::validate_env_var("PROBE_TIMEOUT_MS", "50").is_err());
        assert!(EnvManager::validate_env_var("LATENCY_SAMPLES", "0").is_err());
        assert!(EnvManager::validate_env_var("LATENCY_SAMPLES", "101").is_err());
        assert!(EnvManager::validate_env_var("UPLOAD_BYTES", "0").is_err());
        assert!(EnvManager::validate_env_var("USER_AGENT", "  ").is_err());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "maybe").is_err());
    }

    #[test]
    fn test_display_env_help() {
        let help = EnvManager::display_env_help();
        assert!(help.contains("Supported Environment Variables:"));
        assert!(help.contains("GEO_LOOKUP_URL"));
        assert!(help.contains("Configuration Priority"));
    }
}
