//! Feather drone - entry point.
//!
//! ```text
//! feather-drone                  Run the worker in the foreground
//! feather-drone --config <path>  Load a custom config TOML
//! feather-drone --gen-config     Write default config to stdout
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use feather_drone::config::DroneConfig;
use feather_drone::service::DroneService;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "feather-drone", about = "Feather drone command worker")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "feather-drone.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&DroneConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let config = DroneConfig::load(&cli.config);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let link = config.link_config();
    info!("feather-drone v{}", env!("CARGO_PKG_VERSION"));
    info!("station bridge: {}", config.network.station_addr);
    info!(
        "link: {} bytes/frame, logging={}, timestamp={}, chunking={}",
        link.max_packet_size, link.logging_enabled, link.timestamp_enabled, link.chunking_enabled
    );
    info!(
        "image: {}x{} at {}bpp",
        config.image.width, config.image.height, config.image.bit_depth
    );

    let service = DroneService::new(config);
    let stop = service.stop_handle();

    let stop_clone = stop.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Ctrl-C received, shutting down");
        stop_clone.store(false, std::sync::atomic::Ordering::SeqCst);
    });

    service.run().await?;

    Ok(())
}
