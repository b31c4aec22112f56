//! Static network topology: stations, their dishes and the spacecraft catalog.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A ground station (a "site" in the topology document).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Station {
    /// Station identifier, e.g. `gdscc`.
    pub name: String,
    /// Latitude in 1e-7 degrees.
    pub latitude: i64,
    /// Longitude in 1e-7 degrees.
    pub longitude: i64,
    /// Names of the dishes this station owns.
    pub dishes: BTreeSet<String>,
}

impl Station {
    /// Create a station that owns no dishes yet.
    pub fn new(name: impl Into<String>, latitude: i64, longitude: i64) -> Self {
        Self {
            name: name.into(),
            latitude,
            longitude,
            dishes: BTreeSet::new(),
        }
    }

    /// Whether this station owns the named dish.
    pub fn owns(&self, dish: &str) -> bool {
        self.dishes.contains(dish)
    }
}

/// A dish antenna.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dish {
    /// Dish identifier, e.g. `DSS14`.
    pub name: String,
    /// Antenna type label, e.g. `70M`.
    pub dish_type: String,
}

/// A spacecraft known to the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spacecraft {
    /// Upper-cased identifier, e.g. `NHPC`.
    pub name: String,
    /// Human-readable name, e.g. `New Horizons`.
    pub friendly_name: String,
}

/// The parsed topology document.
///
/// Built once and shared read-only for the life of the process. Every dish name owned by a
/// station has an entry in the dish catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    stations: BTreeMap<String, Station>,
    dishes: BTreeMap<String, Dish>,
    spacecraft: BTreeMap<String, Spacecraft>,
}

impl Topology {
    pub(crate) fn from_parts(
        stations: BTreeMap<String, Station>,
        dishes: BTreeMap<String, Dish>,
        spacecraft: BTreeMap<String, Spacecraft>,
    ) -> Self {
        debug_assert!(stations
            .values()
            .flat_map(|s| &s.dishes)
            .all(|d| dishes.contains_key(d)));
        Self {
            stations,
            dishes,
            spacecraft,
        }
    }

    /// All stations, by name.
    pub fn stations(&self) -> &BTreeMap<String, Station> {
        &self.stations
    }

    /// The dish catalog, by name.
    pub fn dishes(&self) -> &BTreeMap<String, Dish> {
        &self.dishes
    }

    /// The spacecraft catalog, keyed by upper-cased name.
    pub fn spacecraft_catalog(&self) -> &BTreeMap<String, Spacecraft> {
        &self.spacecraft
    }

    /// Look up a station by name.
    pub fn station(&self, name: &str) -> Option<&Station> {
        self.stations.get(name)
    }

    /// Look up a dish by name.
    pub fn dish(&self, name: &str) -> Option<&Dish> {
        self.dishes.get(name)
    }

    /// Look up a spacecraft; the query is upper-cased first.
    pub fn spacecraft(&self, name: &str) -> Option<&Spacecraft> {
        self.spacecraft.get(&name.to_uppercase())
    }

    /// The station that owns the named dish.
    pub fn station_of_dish(&self, dish: &str) -> Option<&Station> {
        self.stations.values().find(|station| station.owns(dish))
    }

    /// Friendly name of a spacecraft, falling back to the name given.
    pub fn friendly_name<'a>(&'a self, spacecraft: &'a str) -> &'a str {
        self.spacecraft(spacecraft)
            .map(|s| s.friendly_name.as_str())
            .unwrap_or(spacecraft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology() -> Topology {
        let mut station = Station::new("cdscc", -353_983_000, 1_489_812_519);
        station.dishes.insert("DSS34".to_string());
        station.dishes.insert("DSS35".to_string());

        let dishes = ["DSS34", "DSS35"]
            .into_iter()
            .map(|name| {
                (
                    name.to_string(),
                    Dish {
                        name: name.to_string(),
                        dish_type: "34M".to_string(),
                    },
                )
            })
            .collect();

        let spacecraft = BTreeMap::from([(
            "VGR2".to_string(),
            Spacecraft {
                name: "VGR2".to_string(),
                friendly_name: "Voyager 2".to_string(),
            },
        )]);

        Topology::from_parts(
            BTreeMap::from([("cdscc".to_string(), station)]),
            dishes,
            spacecraft,
        )
    }

    #[test]
    fn test_spacecraft_lookup_is_case_insensitive() {
        let topology = topology();
        assert_eq!(
            topology.spacecraft("vgr2").map(|s| s.friendly_name.as_str()),
            Some("Voyager 2")
        );
        assert!(topology.spacecraft("VGR1").is_none());
        assert_eq!(topology.friendly_name("Vgr2"), "Voyager 2");
        assert_eq!(topology.friendly_name("DSN"), "DSN");
    }

    #[test]
    fn test_station_of_dish() {
        let topology = topology();
        assert_eq!(topology.station_of_dish("DSS35").map(|s| s.name.as_str()), Some("cdscc"));
        assert!(topology.station_of_dish("DSS14").is_none());
    }
}
