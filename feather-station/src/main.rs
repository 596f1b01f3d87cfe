//! Feather station - entry point.
//!
//! ```text
//! feather-station listen                 Wait for the drone, open the console
//! feather-station script <file>          Wait for the drone, run a script
//! feather-station reconstruct [--log p]  Rebuild an image offline
//! feather-station --gen-config           Write default config to stdout
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use feather_core::transcript::reconstruct;
use feather_core::TcpRadio;
use feather_station::config::StationConfig;
use feather_station::console;
use feather_station::station::Station;

// ── CLI ──────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "feather-station", version, about = "Feather base station")]
struct Cli {
    /// Path to configuration TOML file.
    #[arg(short, long, default_value = "feather-station.toml")]
    config: PathBuf,

    /// Print the default configuration to stdout and exit.
    #[arg(long)]
    gen_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Wait for the drone and open the interactive console (default).
    Listen,
    /// Wait for the drone and send every command in a script file.
    Script {
        /// One command per line; blank and `#` lines are skipped.
        file: PathBuf,
    },
    /// Rebuild an image from a transcript without a drone.
    Reconstruct {
        /// Transcript to read instead of the configured one.
        #[arg(short, long, value_name = "PATH")]
        log: Option<PathBuf>,
    },
}

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.gen_config {
        let text = toml::to_string_pretty(&StationConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    let config = StationConfig::load(&cli.config);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("feather-station v{}", env!("CARGO_PKG_VERSION"));

    match cli.command.unwrap_or(Commands::Listen) {
        Commands::Reconstruct { log } => {
            let log = log.unwrap_or_else(|| config.transcript.path.clone());
            let result = reconstruct(&log, &config.reconstruct_options()).await?;
            println!("Reconstructed {}", result.path().display());
        }
        Commands::Listen => {
            let station = accept_drone(&config).await?;
            let stdin = BufReader::new(tokio::io::stdin());
            tokio::select! {
                result = console::run(&station, stdin, tokio::io::stdout()) => result?,
                _ = tokio::signal::ctrl_c() => info!("Ctrl-C received, shutting down"),
            }
        }
        Commands::Script { file } => {
            let station = accept_drone(&config).await?;
            let sent = station.run_script(&file).await?;
            info!("script {} sent {sent} commands", file.display());
        }
    }

    Ok(())
}

/// Listen for the drone's bridge connection and start a session on it.
async fn accept_drone(config: &StationConfig) -> Result<Station, Box<dyn std::error::Error>> {
    let listener = TcpListener::bind(config.network.listen_addr.as_str()).await?;
    info!("waiting for drone on {}", config.network.listen_addr);
    let (stream, peer) = listener.accept().await?;
    if let Err(e) = stream.set_nodelay(true) {
        warn!("set_nodelay failed: {e}");
    }
    info!("drone connected from {peer}");

    let radio = TcpRadio::new(stream, config.ack_timeout());
    Ok(Station::start(Arc::new(radio), config).await?)
}
