#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod error_fmt;
mod motion;

use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use eyre::{Result, WrapErr};
use scanner_core::{MoveOutcome, Position};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{
    EXIT_OK, exit_code_for_error, exit_code_for_outcome, format_error_json, humanize,
};

fn main() {
    let cli = Cli::parse();
    let json = cli.json;
    let _ = JSON_MODE.set(json);
    if !json {
        let _ = color_eyre::install();
    }

    let code = match run(cli) {
        Ok(Some(outcome)) => exit_code_for_outcome(outcome),
        Ok(None) => EXIT_OK,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "command failed");
            if JSON_MODE.get().copied().unwrap_or(false) {
                println!("{}", format_error_json(&err));
            } else {
                eprintln!("{}", humanize(&err));
            }
            exit_code_for_error(&err)
        }
    };
    std::process::exit(code);
}

fn load_config(path: &std::path::Path) -> Result<scanner_config::Config> {
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("read config file {}", path.display()))?;
    let cfg: scanner_config::Config =
        toml::from_str(&text).wrap_err_with(|| format!("parse config {}", path.display()))?;
    cfg.validate().wrap_err("invalid configuration")?;
    Ok(cfg)
}

/// Console layer on stderr (pretty or JSON) plus an optional JSON-lines file
/// sink. `RUST_LOG` overrides `--log-level`.
fn init_tracing(json: bool, level: &str, logging: &scanner_config::Logging) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console = if json {
        fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let file_layer = logging.file.as_deref().map(|file| {
        let path = std::path::Path::new(file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| std::path::Path::new("."));
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scanner.log".to_string());
        let appender = match logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, &name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, &name),
            _ => tracing_appender::rolling::never(dir, &name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        let file_filter = logging
            .level
            .as_deref()
            .and_then(|l| EnvFilter::try_new(l).ok())
            .unwrap_or_else(|| EnvFilter::new("info"));
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(file_filter)
    });

    let _ = tracing_subscriber::registry()
        .with(console.with_filter(filter))
        .with(file_layer)
        .try_init();
}

fn run(cli: Cli) -> Result<Option<MoveOutcome>> {
    let cfg = load_config(&cli.config)?;
    init_tracing(cli.json, &cli.log_level, &cfg.logging);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed)) {
            tracing::warn!(error = %e, "failed to install Ctrl-C handler");
        }
    }

    let mut scanner = motion::build_scanner(&cfg, shutdown)?;

    match cli.cmd {
        Commands::Move {
            x,
            y,
            pol,
            timeout_s,
            trigger,
        } => {
            let report =
                motion::run_move(&mut scanner, "move", Position::new(x, y, pol), trigger, timeout_s)?;
            report.print(cli.json);
            Ok(Some(report.outcome))
        }
        Commands::Home { axis, timeout_s } => {
            let report = motion::run_home(&mut scanner, &axis, timeout_s)?;
            report.print(cli.json);
            Ok(Some(report.outcome))
        }
        Commands::Zero { axis } => {
            motion::run_zero(&mut scanner, &axis, cli.json)?;
            Ok(None)
        }
        Commands::Status => {
            motion::print_status(&mut scanner, cli.json)?;
            Ok(None)
        }
        Commands::Scan { waypoints, trigger } => {
            let reports = motion::run_scan(&mut scanner, &waypoints, trigger, cli.json)?;
            let outcome = reports
                .last()
                .map_or(MoveOutcome::Success, |r| r.outcome);
            if !cli.json {
                let done = reports
                    .iter()
                    .filter(|r| r.outcome == MoveOutcome::Success)
                    .count();
                println!("scan finished: {done}/{} moves succeeded", reports.len());
            }
            Ok(Some(outcome))
        }
        Commands::SelfCheck => {
            if !scanner.is_connected() {
                eyre::bail!("self-check failed: controller not connected");
            }
            let motor = scanner.get_motor_status()?;
            let pose = scanner.get_position(false, scanner.wait_cfg().read_retries);
            if motor.power_fail() {
                tracing::warn!("motor power is off");
            }
            println!("OK: controller connected, pose {pose}");
            Ok(None)
        }
        Commands::Health => {
            println!("{}", motion::health_json(&cfg, &mut scanner));
            Ok(None)
        }
    }
}
