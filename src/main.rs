//! proxy-check - Entry Point
//!
//! Validates the proxies given as arguments (or one per line on stdin) and prints one JSON
//! report per proxy.

use std::io::{self, BufRead};
use std::process::ExitCode;
use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proxy_check::config::LogConfig;
use proxy_check::{Config, ProxyDescriptor, ProxyValidator, TunnelValidator, Validation};

/// Per-proxy line written to stdout
#[derive(Debug, Serialize)]
struct Report {
    proxy: String,
    available: bool,
    status: Option<u16>,
    reason: Option<String>,
}

impl Report {
    fn new(proxy: String, validation: &Validation) -> Self {
        Report {
            proxy,
            available: validation.is_available(),
            status: validation.status().map(|s| s.as_u16()),
            reason: validation.reason(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = Config::from_env()?;
    init_tracing(&config.log);

    // Fail before touching the network if the target is unusable
    let validator: Arc<dyn ProxyValidator> =
        Arc::new(TunnelValidator::with_config(&config.validator)?);

    let entries = read_entries()?;
    if entries.is_empty() {
        warn!("No proxies given; pass them as arguments or one per line on stdin");
        return Ok(ExitCode::FAILURE);
    }

    let workers = config.runner.workers;
    info!(
        "Validating {} proxies against {} with {} workers",
        entries.len(),
        config.validator.target_url,
        workers
    );

    let reports = futures::stream::iter(entries.into_iter().enumerate())
        .map(|(index, entry)| {
            let validator = validator.clone();
            async move { check_entry(validator.as_ref(), index + 1, &entry).await }
        })
        .buffer_unordered(workers)
        .collect::<Vec<Report>>()
        .await;

    let available = reports.iter().filter(|r| r.available).count();
    for report in &reports {
        println!("{}", serde_json::to_string(report)?);
    }

    info!(
        "Validation complete: {} available, {} unavailable",
        available,
        reports.len().saturating_sub(available)
    );

    Ok(if available > 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn check_entry(validator: &dyn ProxyValidator, index: usize, entry: &str) -> Report {
    match entry.parse::<ProxyDescriptor>() {
        Ok(proxy) => {
            let validation = validator.validate(&proxy).await;
            Report::new(proxy.to_string(), &validation)
        }
        Err(e) => {
            error!("Skipping proxy entry #{}: {}", index, e);
            Report {
                proxy: entry.to_string(),
                available: false,
                status: None,
                reason: Some(e.to_string()),
            }
        }
    }
}

/// Proxies from the command line, or from stdin when none are given
fn read_entries() -> proxy_check::Result<Vec<String>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let lines = if args.is_empty() {
        io::stdin().lock().lines().collect::<io::Result<Vec<_>>>()?
    } else {
        args
    };

    Ok(lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .collect())
}

fn init_tracing(log: &LogConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("proxy_check={}", log.level).into());
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries the reports
    if log.format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .init();
    }
}
