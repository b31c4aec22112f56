//! DSN document parser CLI.
//!
//! Parses a topology document and a snapshot document and prints a JSON summary of the
//! reconciled snapshot to stdout.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `DSN_MAX_DOCUMENT_SIZE`: snapshot size cap in bytes (default: 15360)
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin dsn_parse -- config.xml dsn.xml
//! ```

use std::fs::File;

use serde_json::{json, Value};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dsn_state_kernel::{
    parse_snapshot, parse_topology, read_bounded, DishEntry, Fingerprint, IngestConfig,
    Snapshot, Topology,
};

/// Initialize the tracing subscriber with JSON or pretty format.
///
/// Logs go to stderr so stdout carries only the summary.
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "dsn_parse=info,dsn_state_kernel=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn summarize(snapshot: &Snapshot, topology: &Topology, fingerprint: Fingerprint) -> Value {
    let stations: Vec<Value> = snapshot
        .station_states()
        .values()
        .map(|station| {
            let dishes: Vec<Value> = snapshot
                .dishes_of(&station.name)
                .map(|(name, entry)| match entry {
                    DishEntry::Reporting(dish) => json!({
                        "name": name,
                        "status": "reporting",
                        "azimuth_angle": dish.azimuth_angle,
                        "elevation_angle": dish.elevation_angle,
                        "down_signals": dish.down_signals.len(),
                        "up_signals": dish.up_signals.len(),
                        "targets": dish
                            .targets
                            .iter()
                            .map(|t| topology.friendly_name(&t.name))
                            .collect::<Vec<_>>(),
                    }),
                    DishEntry::NotReporting => json!({
                        "name": name,
                        "status": "not_reporting",
                    }),
                })
                .collect();
            json!({
                "name": station.name,
                "friendly_name": station.friendly_name,
                "local_time": station
                    .local_time(snapshot.timestamp())
                    .map(|t| t.to_rfc3339()),
                "dishes": dishes,
            })
        })
        .collect();

    json!({
        "timestamp": snapshot.timestamp(),
        "observed_at": snapshot.observed_at().map(|t| t.to_rfc3339()),
        "fingerprint": fingerprint.to_hex(),
        "stations": stations,
        "tracked_spacecraft": snapshot.tracked_spacecraft(),
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let mut args = std::env::args().skip(1);
    let (Some(topology_path), Some(snapshot_path)) = (args.next(), args.next()) else {
        return Err("usage: dsn_parse <topology.xml> <snapshot.xml>".into());
    };
    let config = IngestConfig::from_env();

    let topology = parse_topology(&std::fs::read(&topology_path)?)?;
    info!(
        path = %topology_path,
        stations = topology.stations().len(),
        dishes = topology.dishes().len(),
        "Loaded topology"
    );

    let bytes = read_bounded(File::open(&snapshot_path)?, config.max_document_size)?;
    let snapshot = parse_snapshot(&bytes, &topology)?;
    let fingerprint = Fingerprint::of(&snapshot)?;
    info!(
        path = %snapshot_path,
        timestamp = snapshot.timestamp(),
        fingerprint = %fingerprint,
        "Parsed snapshot"
    );

    let summary = summarize(&snapshot, &topology, fingerprint);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
