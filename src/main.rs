//! Device Inspector - Main CLI Application
//!
//! Reports what the host exposes (identity, hardware, network, storage and
//! timing) and optionally measures latency, download and upload speed.

use clap::Parser;
use device_inspector::{
    app::App,
    cli::Cli,
    error::{AppError, ErrorReporter},
};
use std::{error::Error, process};

#[tokio::main]
async fn main() {
    // Parse command line arguments
    let cli = Cli::parse();
    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose || cli.debug);

    let result = match App::new(cli) {
        Ok(app) => app.run().await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        reporter.report_error(&e);

        if let Some(source) = e.source() {
            eprintln!("Caused by: {}", source);
        }

        // Print suggestions for common errors
        print_error_suggestions(&e);

        process::exit(e.exit_code());
    }
}

/// Print helpful suggestions for common errors
fn print_error_suggestions(error: &AppError) {
    match error {
        AppError::Config(_) => {
            eprintln!();
            eprintln!("Configuration help:");
            eprintln!("  - Check your .env file format");
            eprintln!("  - Verify URL formats (must start with http:// or https://)");
            eprintln!("  - The geolocation URL must contain the {{ip}} placeholder");
        }
        AppError::Network(_) | AppError::HttpRequest(_) => {
            eprintln!();
            eprintln!("Network troubleshooting:");
            eprintln!("  - Check your internet connection");
            eprintln!("  - Verify firewall settings");
            eprintln!("  - Point TRACE_URL, DOWNLOAD_URL or UPLOAD_URL at a reachable server");
        }
        AppError::Timeout(_) => {
            eprintln!();
            eprintln!("Timeout troubleshooting:");
            eprintln!("  - Increase the per-probe timeout with --probe-timeout");
            eprintln!("  - Use smaller DOWNLOAD_BYTES or UPLOAD_BYTES on slow links");
        }
        AppError::Aggregation(_) | AppError::SpeedTest(_) => {
            eprintln!();
            eprintln!("Retry options:");
            eprintln!("  - Re-run automatically with --retries <N>");
            eprintln!("  - Use --interactive to be asked before each retry");
        }
        _ => {}
    }
}
