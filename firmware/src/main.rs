//! PrintBridge — host simulation entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  stdin ──▶ companion RX      StdoutUart ◀── companion TX     │
//! │  FsStore (SD card)   SimPrinter (printer link)  FixedWeight  │
//! │  LogStatusSink (display)     JsonConfigFile   env_logger     │
//! │                                                              │
//! │  ─────────────── Port Trait Boundary ────────────────        │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │ Bridge: Dispatcher · TransferEngine · PrintStreamer    │  │
//! │  │         TelemetryPoller · LinkState                    │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Usage: `printbridge [config.json] [store-dir]`. Each stdin line is
//! delivered to the companion link as one idle-line burst.
#![deny(unused_must_use)]

use std::io::BufRead;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};

use printbridge::adapters::config_file::JsonConfigFile;
use printbridge::adapters::fs_store::FsStore;
use printbridge::adapters::log_sink::LogStatusSink;
use printbridge::adapters::sim_printer::SimPrinter;
use printbridge::adapters::sim_uart::StdoutUart;
use printbridge::adapters::weight::FixedWeight;
use printbridge::app::ports::{ConfigError, ConfigPort};
use printbridge::bridge::{Bridge, BridgePorts};
use printbridge::config::SystemConfig;

const DEFAULT_CONFIG: &str = "printbridge.json";
const DEFAULT_STORE: &str = "sdcard";
/// Load-cell reading reported by the simulated sensor.
const SIM_SPOOL_GRAMS: i32 = 850;

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let config_path = args.next().unwrap_or_else(|| DEFAULT_CONFIG.into());
    let store_dir = args.next().unwrap_or_else(|| DEFAULT_STORE.into());

    // ── 1. Config (or defaults) ───────────────────────────────
    let config_file = JsonConfigFile::new(&config_path);
    let (config, load_err) = match config_file.load() {
        Ok(cfg) => (cfg, None),
        Err(e) => (SystemConfig::default(), Some(e)),
    };

    // ── 2. Logging ────────────────────────────────────────────
    // RUST_LOG, when set, overrides the configured level.
    env_logger::Builder::new()
        .filter_level(config.log_level.to_filter())
        .parse_default_env()
        .format_timestamp_millis()
        .try_init()
        .context("logger already installed")?;
    info!("╔══════════════════════════════════════╗");
    info!("║  PrintBridge v{}                  ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");
    match load_err {
        None => info!("Config loaded from {}", config_path),
        Some(ConfigError::NotFound) => info!("No config at {}, using defaults", config_path),
        Some(e) => warn!("Config load failed ({}), using defaults", e),
    }

    // ── 3. Ports ──────────────────────────────────────────────
    let store = FsStore::open(&store_dir)
        .map_err(|e| anyhow::anyhow!("file store at {}: {}", store_dir, e))?;

    let bridge = Bridge::new(
        &config,
        BridgePorts {
            store: Arc::new(store),
            weight: Arc::new(FixedWeight::new(SIM_SPOOL_GRAMS)),
            status: Arc::new(LogStatusSink::new()),
            companion_uart: Box::new(StdoutUart),
        },
        |rx| Box::new(SimPrinter::new(rx)),
    );

    // ── 4. Tasks ──────────────────────────────────────────────
    let tasks = bridge.spawn()?;
    info!("Ready: type companion frames, e.g. WIFI_STATUS[1192.168.1.20]");

    // ── 5. Companion link from stdin ──────────────────────────
    for line in std::io::stdin().lock().lines() {
        let mut line = line.context("stdin")?;
        line.push('\n');
        bridge.companion_rx().on_idle_line(line.as_bytes());
    }

    info!("stdin closed, shutting down");
    tasks.stop();
    Ok(())
}
