//! Snapshot document parser and reconciliation.
//!
//! ```text
//! <dsn>
//!   <station name="gdscc" friendlyName="Goldstone" timeUTC="..." timeZoneOffset="-25200000"/>
//!   <dish name="DSS14" azimuthAngle="123.45" elevationAngle="45.67" windSpeed=""
//!         isMSPA="false" isArray="false" isDDOR="false">
//!     <downSignal signalType="data" signalTypeDebug="IN LOCK" dataRate="160"
//!                 frequency="8415000000" power="-120.5" spacecraft="NHPC"/>
//!     <upSignal .../>
//!     <target name="NHPC" uplegRange="5.1e9" downlegRange="5.1e9" rtlt="34000.5"/>
//!   </dish>
//!   ...
//!   <timestamp>1467330727000</timestamp>
//! </dsn>
//! ```
//!
//! A station's dishes may follow its `station` element as siblings (as above) or be
//! nested inside it. Either way they belong to the most recent station.
//!
//! ## Reconciliation
//!
//! The document only lists dishes that are in use. After the walk, every dish the
//! topology assigns to a station that did report is added to that station's dish set
//! and stored as [`DishEntry::NotReporting`]. Stations missing from the document are
//! left out entirely.

use indexmap::IndexMap;
use std::collections::BTreeMap;
use tracing::{debug, trace};

use super::events::{materialize, Cursor, Element};
use super::ParseError;
use crate::fixed_point::Field;
use crate::types::{
    DishEntry, DishState, Signal, SignalDirection, Snapshot, StationState, Target, Topology,
};

const STATION: &str = "station";
const DISH: &str = "dish";
const TARGET: &str = "target";
const TIMESTAMP: &str = "timestamp";
/// Every signal element tag ends with this.
const SIGNAL_SUFFIX: &str = "Signal";

const NAME: &str = "name";
const FRIENDLY_NAME: &str = "friendlyName";
const TIME_ZONE_OFFSET: &str = "timeZoneOffset";

const AZIMUTH_ANGLE: &str = "azimuthAngle";
const ELEVATION_ANGLE: &str = "elevationAngle";
const WIND_SPEED: &str = "windSpeed";
const IS_MSPA: &str = "isMSPA";
const IS_ARRAY: &str = "isArray";
const IS_DDOR: &str = "isDDOR";

const SIGNAL_TYPE: &str = "signalType";
const SIGNAL_TYPE_DEBUG: &str = "signalTypeDebug";
const DATA_RATE: &str = "dataRate";
const FREQUENCY: &str = "frequency";
const POWER: &str = "power";
const SPACECRAFT: &str = "spacecraft";

const UPLEG_RANGE: &str = "uplegRange";
const DOWNLEG_RANGE: &str = "downlegRange";
const RTLT: &str = "rtlt";

/// Parse a snapshot document and reconcile it against `topology`.
pub fn parse_snapshot(bytes: &[u8], topology: &Topology) -> Result<Snapshot, ParseError> {
    let events = materialize(bytes)?;
    let mut cursor = Cursor::new(&events);
    let mut snapshot = document(&mut cursor)?;
    cursor.finish()?;

    let reported = snapshot.dish_states.len();
    let reconciled = reconcile(&mut snapshot, topology);

    debug!(
        timestamp = snapshot.timestamp,
        stations = snapshot.station_states.len(),
        reported_dishes = reported,
        reconciled_dishes = reconciled,
        "Parsed snapshot"
    );
    Ok(snapshot)
}

/// Stations and dishes collected before the timestamp is known.
#[derive(Default)]
struct Partial {
    stations: IndexMap<String, StationState>,
    dishes: BTreeMap<String, DishEntry>,
}

fn document(cursor: &mut Cursor<'_>) -> Result<Snapshot, ParseError> {
    let root = cursor.open_any("snapshot root element")?;
    let mut partial = Partial::default();
    let mut current: Option<&str> = None;

    loop {
        match cursor.peek_start() {
            Some(element) if element.name() == STATION => {
                current = Some(station(cursor, &mut partial)?);
            }
            Some(element) if element.name() == DISH => {
                let owner = current.ok_or_else(|| {
                    ParseError::OrphanDish(element.attribute(NAME).unwrap_or_default().to_string())
                })?;
                dish(cursor, owner, &mut partial)?;
            }
            Some(element) if element.name() == TIMESTAMP => break,
            _ => return Err(cursor.unexpected("<station>, <dish> or <timestamp>")),
        }
    }

    let timestamp = timestamp(cursor)?;
    cursor.close(root.name())?;

    Ok(Snapshot {
        timestamp,
        station_states: partial.stations,
        dish_states: partial.dishes,
    })
}

/// Consume a `station` element (and any dishes nested in it); returns the station name.
fn station<'a>(cursor: &mut Cursor<'a>, partial: &mut Partial) -> Result<&'a str, ParseError> {
    let element = cursor.open(STATION)?;
    let name = element.require(NAME)?;
    let state = StationState {
        name: name.to_string(),
        friendly_name: element.require(FRIENDLY_NAME)?.to_string(),
        time_zone_offset: element.fixed_i32(TIME_ZONE_OFFSET, Field::TimeZoneOffset)?,
        dishes: Default::default(),
    };
    // A repeated station replaces the earlier state but keeps its position.
    partial.stations.insert(name.to_string(), state);

    while cursor.at_start(DISH) {
        dish(cursor, name, partial)?;
    }
    cursor.close(STATION)?;
    Ok(name)
}

fn dish(cursor: &mut Cursor<'_>, owner: &str, partial: &mut Partial) -> Result<(), ParseError> {
    let element = cursor.open(DISH)?;
    let mut state = dish_attributes(element)?;

    while let Some(child) = cursor
        .peek_start()
        .filter(|e| e.name().ends_with(SIGNAL_SUFFIX))
    {
        let direction = SignalDirection::from_tag(child.name())
            .ok_or_else(|| ParseError::UnknownSignal(child.name().to_string()))?;
        let signal = signal(cursor, direction)?;
        match direction {
            SignalDirection::Down => state.down_signals.push(signal),
            SignalDirection::Up => state.up_signals.push(signal),
        }
    }
    while cursor.at_start(TARGET) {
        state.targets.push(target(cursor)?);
    }
    cursor.close(DISH)?;

    match partial.stations.get_mut(owner) {
        Some(station) => {
            station.dishes.insert(state.name.clone());
        }
        None => return Err(ParseError::OrphanDish(state.name)),
    }
    trace!(
        dish = %state.name,
        station = owner,
        down_signals = state.down_signals.len(),
        up_signals = state.up_signals.len(),
        targets = state.targets.len(),
        "Parsed dish"
    );
    // Last declaration wins.
    partial
        .dishes
        .insert(state.name.clone(), DishEntry::Reporting(state));
    Ok(())
}

fn dish_attributes(element: &Element) -> Result<DishState, ParseError> {
    Ok(DishState {
        name: element.require(NAME)?.to_string(),
        azimuth_angle: element.fixed_i32(AZIMUTH_ANGLE, Field::Azimuth)?,
        elevation_angle: element.fixed_i32(ELEVATION_ANGLE, Field::Elevation)?,
        wind_speed: element.fixed_i32(WIND_SPEED, Field::WindSpeed)?,
        is_mspa: element.flag(IS_MSPA)?,
        is_array: element.flag(IS_ARRAY)?,
        is_ddor: element.flag(IS_DDOR)?,
        down_signals: Vec::new(),
        up_signals: Vec::new(),
        targets: Vec::new(),
    })
}

fn signal(cursor: &mut Cursor<'_>, direction: SignalDirection) -> Result<Signal, ParseError> {
    let element = cursor.open(direction.tag())?;
    let signal = Signal {
        direction,
        signal_type: element.require(SIGNAL_TYPE)?.to_string(),
        signal_type_debug: element.require(SIGNAL_TYPE_DEBUG)?.to_string(),
        data_rate: element.fixed(DATA_RATE, Field::DataRate)?,
        frequency: element.fixed(FREQUENCY, Field::Frequency(direction))?,
        power: element.fixed_i32(POWER, Field::Power)?,
        spacecraft: element.require(SPACECRAFT)?.to_string(),
    };
    cursor.close(direction.tag())?;
    Ok(signal)
}

fn target(cursor: &mut Cursor<'_>) -> Result<Target, ParseError> {
    let element = cursor.open(TARGET)?;
    let target = Target {
        name: element.require(NAME)?.to_string(),
        upleg_range: element.fixed(UPLEG_RANGE, Field::UplegRange)?,
        downleg_range: element.fixed(DOWNLEG_RANGE, Field::DownlegRange)?,
        rtlt: element.fixed(RTLT, Field::RoundTripLightTime)?,
    };
    cursor.close(TARGET)?;
    Ok(target)
}

fn timestamp(cursor: &mut Cursor<'_>) -> Result<i64, ParseError> {
    cursor.open(TIMESTAMP)?;
    let text = cursor.text("timestamp value")?;
    let timestamp = Field::Timestamp
        .decode(text)
        .map_err(|source| ParseError::Numeric {
            element: TIMESTAMP.to_string(),
            attribute: "#text".to_string(),
            source,
        })?;
    cursor.close(TIMESTAMP)?;
    Ok(timestamp)
}

/// Fill in the dishes a reporting station owns but did not report.
///
/// Returns the number of dishes added to station dish sets. A dish the topology
/// assigns to the station but that reported under another station is reset to
/// [`DishEntry::NotReporting`].
pub(crate) fn reconcile(snapshot: &mut Snapshot, topology: &Topology) -> usize {
    let mut added = 0;
    for (name, station) in topology.stations() {
        let Some(state) = snapshot.station_states.get_mut(name) else {
            continue;
        };
        for dish in &station.dishes {
            if state.dishes.insert(dish.clone()) {
                snapshot
                    .dish_states
                    .insert(dish.clone(), DishEntry::NotReporting);
                added += 1;
            }
        }
    }
    added
}
