//! Unlock Wallpaper CLI
//!
//! Host-side simulator for the unlock wallpaper selector: drives
//! lock/unlock cycles against the embedded assets, audits the local
//! random source and probes the remote one.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};
use tracing::{error, info, warn};
use unlock_wallpaper::{
    analysis::UniformityTest,
    assets::EmbeddedPreloader,
    config::FileConfig,
    entropy::{LocalRandomSource, QrngClient, RemoteSource},
    metrics::MetricsRegistry,
    platform::{PngFileSink, SharedConnectivity},
    selection::{CycleReport, LifecycleDriver, SelectionController},
};

#[derive(Debug, Parser)]
#[command(name = "unlock-wallpaper", version, about)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run simulated lock/unlock cycles.
    Simulate {
        /// Number of cycles (overrides the config file).
        #[arg(short = 'n', long)]
        cycles: Option<u32>,
        /// Run until interrupted.
        #[arg(long)]
        continuous: bool,
        /// Report the device as offline.
        #[arg(long)]
        offline: bool,
        /// Where to write the selected wallpaper.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check the local random source for bias.
    Audit {
        /// Number of bits to draw.
        #[arg(short, long, default_value_t = 10_000)]
        samples: usize,
    },
    /// Fetch a single bit from the remote source.
    Fetch,
}

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match FileConfig::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => FileConfig::default(),
    };

    info!("Unlock Wallpaper v{}", unlock_wallpaper::VERSION);

    let code = match cli.command {
        Command::Simulate {
            cycles,
            continuous,
            offline,
            output,
        } => {
            let mut config = config;
            if let Some(cycles) = cycles {
                config.output.cycles = cycles;
            }
            config.output.continuous |= continuous;
            if let Some(output) = output {
                config.output.wallpaper_path = output;
            }
            simulate(config, !offline).await
        }
        Command::Audit { samples } => audit(samples),
        Command::Fetch => fetch(&config).await,
    };

    std::process::exit(code);
}

async fn simulate(config: FileConfig, online: bool) -> i32 {
    let controller_config = match config.controller_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return 1;
        }
    };
    let remote = match QrngClient::new(config.remote.endpoint.clone()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to create remote client: {}", e);
            return 1;
        }
    };
    let metrics = match MetricsRegistry::new() {
        Ok(registry) => Arc::new(registry),
        Err(e) => {
            eprintln!("Failed to create metrics registry: {}", e);
            return 1;
        }
    };

    let connectivity = SharedConnectivity::new(online);
    let controller = SelectionController::new(
        controller_config,
        EmbeddedPreloader::new(),
        connectivity,
        Arc::new(remote),
        LocalRandomSource::from_os_entropy(),
        PngFileSink::new(&config.output.wallpaper_path),
    );

    let (report_tx, mut report_rx) = mpsc::unbounded_channel();
    let (driver, handle) = LifecycleDriver::new(controller);
    let driver = driver
        .with_reports(report_tx)
        .with_metrics(Arc::clone(&metrics));
    let driver_task = tokio::spawn(driver.run());

    let reporter = tokio::spawn(async move {
        while let Some(report) = report_rx.recv().await {
            match report {
                CycleReport::Locked(epoch) => info!(%epoch, "Locked"),
                CycleReport::Applied(selection) => info!(
                    epoch = %selection.epoch,
                    roll = %selection.roll,
                    source = ?selection.source,
                    "Unlocked: {} wallpaper",
                    selection.result
                ),
                CycleReport::Discarded(epoch) => warn!(%epoch, "Unlock superseded"),
                CycleReport::Cancelled => warn!("Unlock cancelled"),
                CycleReport::Failed(reason) => error!("Cycle failed: {}", reason),
            }
        }
    });

    let metrics_shutdown = spawn_metrics_server(config.output.metrics_port, Arc::clone(&metrics));

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        if let Err(e) = ctrlc::set_handler(move || running.store(false, Ordering::SeqCst)) {
            warn!("Failed to install Ctrl-C handler: {}", e);
        }
    }

    let interval = Duration::from_millis(config.output.interval_ms);
    let mut completed = 0u32;

    info!(
        online,
        output = %config.output.wallpaper_path.display(),
        "Simulating lock/unlock cycles..."
    );

    while running.load(Ordering::SeqCst)
        && (config.output.continuous || completed < config.output.cycles)
    {
        if handle.lock().await.is_err() {
            break;
        }
        tokio::time::sleep(interval).await;
        if handle.unlock().await.is_err() {
            break;
        }
        tokio::time::sleep(interval).await;
        completed += 1;
    }

    drop(handle);
    let stats = match driver_task.await {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("Lifecycle driver panicked: {}", e);
            return 1;
        }
    };
    // The reporter ends once the driver drops its sender.
    let _ = reporter.await;

    if let Some(shutdown) = metrics_shutdown {
        shutdown.notify_one();
    }

    info!(
        "Completed {} cycles: {} lively, {} sleepy, {} remote attempts ({} failed)",
        completed,
        stats.lively_applied,
        stats.sleepy_applied,
        stats.remote_attempts,
        stats.remote_failures
    );

    if stats.apply_failures > 0 {
        1
    } else {
        0
    }
}

#[cfg(feature = "metrics")]
fn spawn_metrics_server(port: u16, registry: Arc<MetricsRegistry>) -> Option<Arc<Notify>> {
    use unlock_wallpaper::metrics::{MetricsServer, MetricsServerConfig};

    if port == 0 {
        return None;
    }

    let shutdown = Arc::new(Notify::new());
    let server = MetricsServer::new(MetricsServerConfig::with_port(port), registry);
    let signal = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if let Err(e) = server.run_until(async move { signal.notified().await }).await {
            warn!("Metrics server stopped: {}", e);
        }
    });

    Some(shutdown)
}

#[cfg(not(feature = "metrics"))]
fn spawn_metrics_server(port: u16, _registry: Arc<MetricsRegistry>) -> Option<Arc<Notify>> {
    if port != 0 {
        warn!(port, "Built without the `metrics` feature, not serving metrics");
    }
    None
}

fn audit(samples: usize) -> i32 {
    let mut source = LocalRandomSource::from_os_entropy();
    let bits = source.sample_bits(samples);
    let result = UniformityTest::default().run(&bits);

    println!(
        "samples={} zeros={} ones={} bias={:+.4} chi_square={:.3} passed={}",
        result.sample_size(),
        result.zeros,
        result.ones,
        result.bit_bias,
        result.chi_square,
        result.passed
    );

    if result.passed {
        0
    } else {
        warn!("Local source failed the uniformity check");
        1
    }
}

async fn fetch(config: &FileConfig) -> i32 {
    let client = match QrngClient::new(config.remote.endpoint.clone()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Failed to create remote client: {}", e);
            return 1;
        }
    };

    match client.fetch(config.remote.timeout()).await {
        Ok(bit) => {
            println!("bit={}", bit);
            0
        }
        Err(e) => {
            eprintln!("Remote fetch failed: {}", e);
            1
        }
    }
}
