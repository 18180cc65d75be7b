//! Host bench runner.
//!
//! Wires a [`DimLed`] to a simulated board and a sweeping distance
//! sensor, applies an attribute file (or built-in defaults), runs an
//! optional command script and lets the loop run for a while.
//!
//! ```text
//! RUST_LOG=debug dimled --duration-secs 5 --fail-every 7 --command test
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use embassy_time::{Duration, Timer};
use futures_lite::future;
use log::info;
use serde_json::{Map, Value, json};

use dimled::adapters::log_sink::LogEventSink;
use dimled::adapters::sim::{SimBoard, SimSensor};
use dimled::{Dependencies, DimLed};

const SIM_BOARD: &str = "sim-board";
const SIM_SENSOR: &str = "sim-sensor";
const SIM_PIN: &str = "led";

#[derive(Debug, Parser)]
#[command(name = "dimled", version, about = "Distance-dimmed LED bench runner")]
struct Cli {
    /// JSON attribute file (board, sensor, led_pin, auto_start, max_distance, blinking_distance)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// How long to let the loop run before closing
    #[arg(short, long, default_value_t = 10)]
    duration_secs: u64,

    /// Make every N-th sensor read fail
    #[arg(long)]
    fail_every: Option<u32>,

    /// Full period of the simulated near/far sweep
    #[arg(long, default_value_t = 6000)]
    sweep_ms: u64,

    /// Commands to send after configuration (start, stop, test)
    #[arg(long = "command", value_name = "NAME")]
    commands: Vec<String>,
}

fn load_attributes(path: Option<&PathBuf>) -> Result<Map<String, Value>> {
    let value = match path {
        Some(p) => {
            let text = std::fs::read_to_string(p)
                .with_context(|| format!("Failed to read {}", p.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse {}", p.display()))?
        }
        None => json!({ "board": SIM_BOARD, "sensor": SIM_SENSOR, "led_pin": SIM_PIN }),
    };
    match value {
        Value::Object(map) => Ok(map),
        other => bail!("attributes must be a JSON object, got {other}"),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let attrs = load_attributes(cli.config.as_ref())?;
    DimLed::<SimBoard, SimSensor>::validate_config(&attrs).context("Invalid attributes")?;

    let board = Arc::new(SimBoard::new([SIM_PIN]));
    let sensor = Arc::new(
        SimSensor::sweep(0.05, 1.2, Duration::from_millis(cli.sweep_ms))
            .with_failure_every(cli.fail_every),
    );
    let deps = Dependencies::new()
        .with_board(SIM_BOARD, Arc::clone(&board))
        .with_sensor(SIM_SENSOR, sensor);

    future::block_on(async {
        let led = DimLed::from_attributes(&attrs, &deps, Arc::new(LogEventSink::new()))
            .await
            .context("Failed to apply configuration")?;

        if !cli.commands.is_empty() {
            let script: Map<String, Value> = cli
                .commands
                .iter()
                .map(|c| (c.clone(), Value::Object(Map::new())))
                .collect();
            let results = led.do_command(&script).await;
            info!("Command results: {}", Value::Object(results));
        }

        Timer::after(Duration::from_secs(cli.duration_secs)).await;
        led.close();
        anyhow::Ok(())
    })?;

    if let Some(rec) = board.record(SIM_PIN) {
        info!(
            "Final LED state: duty={:.3} @ {} Hz after {} writes",
            rec.duty, rec.frequency_hz, rec.writes
        );
    }
    Ok(())
}
