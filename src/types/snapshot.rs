//! Live network state at one observation instant.
//!
//! All numeric fields are fixed-point integers; see [`crate::fixed_point::Field`] for
//! the scale and absent sentinel of each one.

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Direction of a signal relative to the ground station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SignalDirection {
    /// Spacecraft to ground (`downSignal`).
    Down,
    /// Ground to spacecraft (`upSignal`).
    Up,
}

impl SignalDirection {
    /// Element tag used for this direction in the snapshot document.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Down => "downSignal",
            Self::Up => "upSignal",
        }
    }

    /// Direction for an element tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "downSignal" => Some(Self::Down),
            "upSignal" => Some(Self::Up),
            _ => None,
        }
    }
}

impl fmt::Display for SignalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Down => write!(f, "down"),
            Self::Up => write!(f, "up"),
        }
    }
}

/// One carrier between a dish and a spacecraft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    /// Which list of the dish this signal came from.
    pub direction: SignalDirection,
    /// Signal type, e.g. `data` or `carrier`.
    pub signal_type: String,
    /// Raw debug type string.
    pub signal_type_debug: String,
    /// Data rate, scaled by 1e6; `-1` when absent.
    pub data_rate: i64,
    /// Frequency, scaled by 1e6 (down) or 1e12 (up); `-1` when absent.
    pub frequency: i64,
    /// Power, scaled by 1e6; `0` when absent.
    pub power: i32,
    /// Spacecraft the signal is exchanged with.
    pub spacecraft: String,
}

/// A spacecraft a dish is pointed at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// Spacecraft name as reported.
    pub name: String,
    /// Up-link range, scaled by 1e3; `-1` when absent.
    pub upleg_range: i64,
    /// Down-link range, scaled by 1e3; `-1` when absent.
    pub downleg_range: i64,
    /// Round-trip light time, scaled by 1e6; `-1` when absent.
    pub rtlt: i64,
}

/// Instantaneous state of a reporting dish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DishState {
    /// Dish name.
    pub name: String,
    /// Azimuth in centidegrees; `-1` when absent.
    pub azimuth_angle: i32,
    /// Elevation in centidegrees; `-1` when absent.
    pub elevation_angle: i32,
    /// Wind speed in hundredths; `-1` when absent.
    pub wind_speed: i32,
    /// Multiple Spacecraft Per Aperture.
    pub is_mspa: bool,
    /// Dish is arrayed with others.
    pub is_array: bool,
    /// Delta-Differential One-way Ranging in progress.
    pub is_ddor: bool,
    /// Down-link signals, in document order.
    pub down_signals: Vec<Signal>,
    /// Up-link signals, in document order.
    pub up_signals: Vec<Signal>,
    /// Targets, in document order.
    pub targets: Vec<Target>,
}

impl DishState {
    /// Down and up signals, down first.
    pub fn signals(&self) -> impl Iterator<Item = &Signal> {
        self.down_signals.iter().chain(&self.up_signals)
    }
}

/// Entry for a dish in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "state", rename_all = "snake_case")]
pub enum DishEntry {
    /// The dish reported data.
    Reporting(DishState),
    /// The dish belongs to a reporting station but sent nothing.
    NotReporting,
}

impl DishEntry {
    /// The reported state, if any.
    pub fn state(&self) -> Option<&DishState> {
        match self {
            Self::Reporting(state) => Some(state),
            Self::NotReporting => None,
        }
    }

    /// Whether this dish reported data.
    pub fn is_reporting(&self) -> bool {
        matches!(self, Self::Reporting(_))
    }
}

/// A station as seen in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationState {
    /// Station identifier.
    pub name: String,
    /// Display name, e.g. `Goldstone`.
    pub friendly_name: String,
    /// Offset from UTC in milliseconds.
    pub time_zone_offset: i32,
    /// Dish names, sorted.
    pub dishes: BTreeSet<String>,
}

impl StationState {
    /// Convert a snapshot timestamp to the station's local time.
    ///
    /// `None` when the timestamp or the offset is out of chrono's range.
    pub fn local_time(&self, timestamp_millis: i64) -> Option<DateTime<FixedOffset>> {
        let offset = FixedOffset::east_opt(self.time_zone_offset / 1000)?;
        let utc = Utc.timestamp_millis_opt(timestamp_millis).single()?;
        Some(utc.with_timezone(&offset))
    }
}

/// The parsed and reconciled snapshot document.
///
/// Station states keep document order. Every dish of a station that is present in both
/// the snapshot and the topology has an entry in the dish map.
///
/// That holds for snapshots built by [`parse_snapshot`](crate::parse_snapshot). A snapshot
/// deserialized from JSON is taken as-is and is not reconciled again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub(crate) timestamp: i64,
    pub(crate) station_states: IndexMap<String, StationState>,
    pub(crate) dish_states: BTreeMap<String, DishEntry>,
}

impl Snapshot {
    /// Milliseconds since the Unix epoch.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Observation time as a UTC date.
    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.timestamp).single()
    }

    /// Station states in document order.
    pub fn station_states(&self) -> &IndexMap<String, StationState> {
        &self.station_states
    }

    /// All dish entries, by name.
    pub fn dish_states(&self) -> &BTreeMap<String, DishEntry> {
        &self.dish_states
    }

    /// Look up a station state.
    pub fn station(&self, name: &str) -> Option<&StationState> {
        self.station_states.get(name)
    }

    /// Look up a dish entry.
    pub fn dish(&self, name: &str) -> Option<&DishEntry> {
        self.dish_states.get(name)
    }

    /// Dishes that reported data, by name.
    pub fn reporting_dishes(&self) -> impl Iterator<Item = &DishState> {
        self.dish_states.values().filter_map(DishEntry::state)
    }

    /// A station's dish entries in name order.
    pub fn dishes_of<'a>(
        &'a self,
        station: &str,
    ) -> impl Iterator<Item = (&'a str, &'a DishEntry)> + 'a {
        self.station_states
            .get(station)
            .into_iter()
            .flat_map(|state| &state.dishes)
            .filter_map(|name| {
                self.dish_states
                    .get(name)
                    .map(|entry| (name.as_str(), entry))
            })
    }

    /// Upper-cased names of every spacecraft named by a signal or target.
    pub fn tracked_spacecraft(&self) -> BTreeSet<String> {
        self.reporting_dishes()
            .flat_map(|dish| {
                dish.signals()
                    .map(|s| s.spacecraft.as_str())
                    .chain(dish.targets.iter().map(|t| t.name.as_str()))
            })
            .filter(|name| !name.is_empty())
            .map(str::to_uppercase)
            .collect()
    }
}

// Station order is part of a snapshot's identity; IndexMap equality ignores it.
impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
            && self.station_states.iter().eq(other.station_states.iter())
            && self.dish_states == other.dish_states
    }
}

impl Eq for Snapshot {}
