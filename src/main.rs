// src/main.rs

//! The entry point for the isolation harness: runs the two-session scenario
//! against a server and reports whether the isolation contract held.

use anyhow::{Result, anyhow};
use oshinodb_client::config::Config;
use oshinodb_client::harness;
use std::env;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{filter::EnvFilter, prelude::*};

const EXIT_VIOLATION: u8 = 1;
const EXIT_ERROR: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    match run_app().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn run_app() -> Result<ExitCode> {
    const VERSION: &str = env!("CARGO_PKG_VERSION");

    let args: Vec<String> = env::args().collect();

    if args.contains(&"--version".to_string()) {
        println!("oshinodb-isolation version {VERSION}");
        return Ok(ExitCode::SUCCESS);
    }

    // Without --config the built-in defaults apply.
    let mut config = match flag_value(&args, "--config")? {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if let Some(host) = flag_value(&args, "--host")? {
        config.host = host.to_string();
    }
    if let Some(port_str) = flag_value(&args, "--port")? {
        config.port = port_str
            .parse::<u16>()
            .map_err(|_| anyhow!("Invalid port number: {port_str}"))?;
    }

    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::registry()
        .with(EnvFilter::new(log_level))
        .with(
            tracing_subscriber::fmt::layer()
                .compact() // Use the compact, single-line format.
                .with_ansi(true),
        )
        .init();

    // After logging is up, so validation warnings are visible.
    config.validate()?;

    info!("Running isolation scenario against {}", config.addr());

    match harness::run_against(&config).await {
        Ok(report) => {
            println!("{report}");
            if report.passed() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(EXIT_VIOLATION))
            }
        }
        Err(e) => {
            error!("Scenario aborted: {}", e);
            Err(e.into())
        }
    }
}

/// Returns the value following `flag`, if the flag is present.
fn flag_value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>> {
    match args.iter().position(|arg| arg == flag) {
        Some(i) => args
            .get(i + 1)
            .map(|s| Some(s.as_str()))
            .ok_or_else(|| anyhow!("{flag} flag requires a value")),
        None => Ok(None),
    }
}
