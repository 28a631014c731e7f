//! DataMon headless demo
//!
//! Wires a few synthetic sources into a monitor, records on the worker
//! thread for a while and saves the recording as CSV.
//!
//! # Usage
//!
//! ```bash
//! datamon --seconds 5 --out runs/demo.csv
//! datamon --config datamon.toml --log-dir logs
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use datamon_rs::config::{default_config_path, MonitorConfig};
use datamon_rs::session::{
    now_seconds, Monitor, MonitorWorker, Pattern, PatternSource, RefreshView, WorkerMessage,
};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "datamon")]
#[command(about = "Record synthetic signals and export them to CSV", long_about = None)]
struct Cli {
    /// Config file (TOML, or JSON for .json paths)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Recording length in seconds
    #[arg(long, default_value_t = 3.0)]
    seconds: f64,

    /// Output CSV path; defaults to a timestamped name
    #[arg(long)]
    out: Option<PathBuf>,

    /// Also write logs to daily files in this folder
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let (file_layer, _guard) = match &cli.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "datamon.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,datamon_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    tracing::info!("Starting DataMon");

    let config = match cli.config.clone().or_else(default_config_path) {
        Some(path) if path.exists() => {
            tracing::info!("Loading config from {:?}", path);
            MonitorConfig::load(&path).with_context(|| format!("loading {}", path.display()))?
        }
        _ => MonitorConfig::default(),
    };

    let monitor = build_monitor(config)?;
    let out = cli.out.clone().unwrap_or_else(|| monitor.suggested_filename());
    let mut view = RefreshView::from_monitor(&monitor);
    let refresh_interval = monitor.config().refresh_interval();

    let worker = MonitorWorker::spawn(monitor)?;
    worker.set_sidecar(Some(format!(
        "datamon demo\nrecorded: {}\nseconds: {}\n",
        chrono::Local::now().to_rfc3339(),
        cli.seconds
    )))?;
    worker.start_recording()?;

    let deadline = Instant::now() + Duration::from_secs_f64(cli.seconds.max(0.0));
    while Instant::now() < deadline {
        for msg in worker.drain() {
            match msg {
                WorkerMessage::Views { live, record } => view.rebind(live, record),
                WorkerMessage::Stats(stats) => tracing::debug!("Stats: {:?}", stats),
                WorkerMessage::Error(e) => tracing::warn!("Worker error: {}", e),
                _ => {}
            }
        }
        let traces = view.refresh();
        if let Some(trace) = traces.first() {
            tracing::trace!("{}: {} point(s)", trace.name, trace.len());
        }
        std::thread::sleep(refresh_interval);
    }

    worker.save(&out)?;
    let saved = loop {
        match worker.recv_timeout(Duration::from_secs(5)) {
            Some(WorkerMessage::Saved(summary)) => break Ok(summary),
            Some(WorkerMessage::Error(e)) => break Err(anyhow::anyhow!(e)),
            Some(_) => continue,
            None => break Err(anyhow::anyhow!("timed out waiting for save")),
        }
    }?;
    tracing::info!(
        "Saved {} rows x {} columns to {:?}",
        saved.rows,
        saved.columns,
        saved.path
    );

    if let Some(monitor) = worker.shutdown() {
        tracing::info!("Final stats: {:?}", monitor.stats());
    }
    Ok(())
}

fn build_monitor(config: MonitorConfig) -> Result<Monitor> {
    let period = config.sample_period_s;
    let start = now_seconds();
    let mut monitor = Monitor::with_origin(config, start)?;

    let position = monitor.add_variable(
        "position",
        PatternSource::new(
            Pattern::Sine {
                frequency: 0.5,
                amplitude: 10.0,
                offset: 0.0,
            },
            start,
            period,
        ),
    );
    monitor.add_derivative(position, "velocity")?;
    monitor.add_variable(
        "setpoint",
        PatternSource::new(
            Pattern::Square {
                period: 2.0,
                amplitude: 5.0,
            },
            start,
            period,
        ),
    );
    monitor.add_variable(
        "counter",
        PatternSource::new(
            Pattern::Counter {
                step: 1.0,
                min: 0.0,
                max: 100.0,
            },
            start,
            period,
        )
        .with_dropout(10),
    );
    Ok(monitor)
}
