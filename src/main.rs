// src/main.rs - Raster-scan host entry point
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::task::JoinHandle;

use stage_scan::config::{self, AppConfig, ServerConfig};
use stage_scan::communication::{link, DeviceLink, EchoServer};
use stage_scan::hardware::{serial, simulated, CommandSink, DeviceWorker, HardwareError, ReplySource};
use stage_scan::scan::{RasterScanPlanner, RunOptions, ScanRunner};

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Raster-scan host for a 2-axis positioning stage.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Configuration file; missing file means built-in defaults
    #[arg(long, default_value = "stage.toml")]
    config: PathBuf,
    /// Stage controller serial device
    #[arg(long)]
    device: Option<String>,
    /// Serial baud rate
    #[arg(long)]
    baud: Option<u32>,
    /// Echo server host
    #[arg(long)]
    host: Option<String>,
    /// Echo server port; enables the echo server
    #[arg(long)]
    port: Option<u16>,
    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log: Option<String>,
    /// Use a simulated controller instead of the serial port
    #[arg(long)]
    simulate: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(device) = &self.device {
            config.device.serial = device.clone();
        }
        if let Some(baud) = self.baud {
            config.device.baud = baud;
        }
        if self.simulate {
            config.device.simulate = true;
        }
        if let Some(level) = &self.log {
            config.log.level = level.clone();
        }
        if let Some(port) = self.port {
            let host = self
                .host
                .clone()
                .or_else(|| config.server.as_ref().map(|s| s.host.clone()))
                .unwrap_or_else(|| "127.0.0.1".to_string());
            config.server = Some(ServerConfig { host, port });
        } else if let (Some(host), Some(server)) = (&self.host, config.server.as_mut()) {
            server.host = host.clone();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let cli = Cli::parse();

    let loaded = if cli.config.exists() {
        config::load_config(&cli.config).map(Some)
    } else {
        Ok(None)
    };
    let level = cli
        .log
        .clone()
        .or_else(|| loaded.as_ref().ok().and_then(|c| c.as_ref()).map(|c| c.log.level.clone()));
    init_logging(level.as_deref().unwrap_or("info"));

    tracing::info!("Starting stage-scan {}", env!("CARGO_PKG_VERSION"));
    let mut config = match loaded {
        Ok(Some(config)) => {
            tracing::info!("Loaded configuration from: {}", cli.config.display());
            config
        }
        Ok(None) => {
            tracing::info!("No configuration at {}, using defaults", cli.config.display());
            AppConfig::default()
        }
        Err(e) => {
            tracing::error!("Failed to load config from '{}': {}", cli.config.display(), e);
            return Err(e.into());
        }
    };
    cli.apply(&mut config);

    // Reject a bad scan before anything is opened or spawned.
    let planner = RasterScanPlanner::configure(config.scan.clone()).map_err(|e| {
        tracing::error!("Invalid scan configuration: {}", e);
        Box::new(e) as BoxError
    })?;

    if let Some(server) = &config.server {
        let echo = EchoServer::bind((server.host.as_str(), server.port)).await?;
        tokio::spawn(async move {
            if let Err(e) = echo.serve().await {
                tracing::error!("Echo server stopped: {}", e);
            }
        });
    }

    let (planner_link, device_link) = link();
    let device_task = if config.device.simulate {
        tracing::info!("Simulating the stage controller");
        let (sink, source) = simulated::simulated_device();
        spawn_device(DeviceWorker::new(sink, source), device_link, &config)
    } else {
        let (sink, source) = serial::open(&config.device.serial, config.device.baud).map_err(|e| {
            tracing::error!("ERROR opening serial: {}", e);
            Box::new(e) as BoxError
        })?;
        spawn_device(DeviceWorker::new(sink, source), device_link, &config)
    };

    tokio::time::sleep(config.device.startup_delay()).await;

    let mut runner = ScanRunner::new(
        planner,
        planner_link,
        RunOptions { ack_timeout: config.device.ack_timeout() },
    );
    let cancel = runner.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling scan");
            cancel.cancel();
        }
    });

    let outcome = runner.run().await;
    drop(runner);
    match device_task.await {
        Ok(Err(e)) => tracing::error!("Device worker failed: {}", e),
        Err(e) => tracing::error!("Device worker panicked: {}", e),
        Ok(Ok(())) => {}
    }
    let report = outcome?;
    tracing::info!("Scan ended {:?} after {} samples", report.phase, report.samples);

    if config.server.is_some() {
        tracing::info!("Echo server still running, press Ctrl-C to exit");
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}

fn init_logging(level: &str) {
    let parsed = tracing::Level::from_str(level).ok();
    let max_level = parsed.unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(max_level)
        .with_thread_names(true)
        .init();
    if parsed.is_none() {
        tracing::warn!("Unknown log level '{}', using {}", level, max_level);
    }
}

fn spawn_device<W, R>(
    mut worker: DeviceWorker<W, R>,
    link: DeviceLink,
    config: &AppConfig,
) -> JoinHandle<Result<(), HardwareError>>
where
    W: CommandSink + 'static,
    R: ReplySource + 'static,
{
    let unlock_timeout = config.device.unlock_timeout();
    tokio::spawn(async move {
        if let Err(e) = worker.unlock(unlock_timeout).await {
            tracing::warn!("Controller unlock failed: {}", e);
        }
        worker.run(link).await
    })
}
