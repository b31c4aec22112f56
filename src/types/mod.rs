//! Core model types for the DSN state kernel.

pub mod snapshot;
pub mod topology;

pub use snapshot::{
    DishEntry, DishState, Signal, SignalDirection, Snapshot, StationState, Target,
};
pub use topology::{Dish, Spacecraft, Station, Topology};
