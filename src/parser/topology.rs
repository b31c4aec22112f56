//! Topology document parser.
//!
//! ```text
//! <config>
//!   <sites>
//!     <site name="gdscc" longitude="-116.8" latitude="35.4">
//!       <dish name="DSS14" type="70M"/>
//!     </site>
//!   </sites>
//!   <spacecraftMap>
//!     <spacecraft name="nhpc" friendlyName="New Horizons"/>
//!   </spacecraftMap>
//! </config>
//! ```
//!
//! The root and the two section wrappers are not checked by name; `site`, `dish` and
//! `spacecraft` are.

use std::collections::BTreeMap;
use tracing::debug;

use super::events::{materialize, Cursor};
use super::ParseError;
use crate::fixed_point::Field;
use crate::types::{Dish, Spacecraft, Station, Topology};

const SITE: &str = "site";
const DISH: &str = "dish";
const SPACECRAFT: &str = "spacecraft";

const NAME: &str = "name";
const LONGITUDE: &str = "longitude";
const LATITUDE: &str = "latitude";
const TYPE: &str = "type";
const FRIENDLY_NAME: &str = "friendlyName";

/// Parse a topology document.
pub fn parse_topology(bytes: &[u8]) -> Result<Topology, ParseError> {
    let events = materialize(bytes)?;
    let mut cursor = Cursor::new(&events);
    let topology = document(&mut cursor)?;
    cursor.finish()?;

    debug!(
        stations = topology.stations().len(),
        dishes = topology.dishes().len(),
        spacecraft = topology.spacecraft_catalog().len(),
        "Parsed topology"
    );
    Ok(topology)
}

#[derive(Default)]
struct Catalog {
    stations: BTreeMap<String, Station>,
    dishes: BTreeMap<String, Dish>,
    spacecraft: BTreeMap<String, Spacecraft>,
}

fn document(cursor: &mut Cursor<'_>) -> Result<Topology, ParseError> {
    let root = cursor.open_any("topology root element")?;
    let mut catalog = Catalog::default();

    let sites = cursor.open_any("sites section")?;
    while cursor.at_start(SITE) {
        site(cursor, &mut catalog)?;
    }
    cursor.close(sites.name())?;

    let spacecraft_map = cursor.open_any("spacecraft section")?;
    while cursor.at_start(SPACECRAFT) {
        let craft = spacecraft(cursor)?;
        catalog.spacecraft.insert(craft.name.clone(), craft);
    }
    cursor.close(spacecraft_map.name())?;

    cursor.close(root.name())?;
    Ok(Topology::from_parts(
        catalog.stations,
        catalog.dishes,
        catalog.spacecraft,
    ))
}

fn site(cursor: &mut Cursor<'_>, catalog: &mut Catalog) -> Result<(), ParseError> {
    let element = cursor.open(SITE)?;
    let name = element.require(NAME)?;
    let longitude = element.fixed(LONGITUDE, Field::Coordinate)?;
    let latitude = element.fixed(LATITUDE, Field::Coordinate)?;

    let mut station = Station::new(name, latitude, longitude);
    while cursor.at_start(DISH) {
        let dish = dish(cursor)?;
        station.dishes.insert(dish.name.clone());
        catalog.dishes.insert(dish.name.clone(), dish);
    }
    cursor.close(SITE)?;

    // Repeated names overwrite earlier declarations.
    catalog.stations.insert(name.to_string(), station);
    Ok(())
}

fn dish(cursor: &mut Cursor<'_>) -> Result<Dish, ParseError> {
    let element = cursor.open(DISH)?;
    let dish = Dish {
        name: element.require(NAME)?.to_string(),
        dish_type: element.require(TYPE)?.to_string(),
    };
    cursor.close(DISH)?;
    Ok(dish)
}

fn spacecraft(cursor: &mut Cursor<'_>) -> Result<Spacecraft, ParseError> {
    let element = cursor.open(SPACECRAFT)?;
    let spacecraft = Spacecraft {
        name: element.require(NAME)?.to_uppercase(),
        friendly_name: element.require(FRIENDLY_NAME)?.to_string(),
    };
    cursor.close(SPACECRAFT)?;
    Ok(spacecraft)
}
