//! Built-in campus catalog.
//!
//! Academic buildings and serveries with approximate coordinates, used when
//! no waypoint source is configured. Several serveries share a placeholder
//! coordinate until surveyed positions are available.

use crate::{Coordinate, Waypoint};

/// (name, longitude, latitude)
const BUILDINGS: &[(&str, f64, f64)] = &[
    ("Duncan Hall (CS)", -95.40134, 29.72069),
    ("Herzstein Hall", -95.39938, 29.71897),
    ("Brockman Hall for Physics", -95.39986, 29.71993),
    ("Rayzor Hall", -95.40414, 29.71877),
    ("Fondren Library", -95.40189, 29.71857),
    ("Gibbs Recreation Center", -95.40604, 29.71488),
    ("BioScience Research Collaborative (BRC)", -95.39819, 29.71309),
    ("Rice Memorial Center", -95.40150, 29.71700),
    ("Oshman Engineering Design Kitchen", -95.40200, 29.72100),
    ("Anderson Biological Labs", -95.39900, 29.71950),
];

const SERVERIES: &[(&str, f64, f64)] = &[
    ("North Servery", -95.40324, 29.72041),
    ("Seibel Servery", -95.40174, 29.71667),
    ("West Servery", -95.40500, 29.71900),
    ("South Servery", -95.40500, 29.71900),
    ("Baker Servery", -95.40500, 29.71900),
];

fn to_waypoints(rows: &'static [(&'static str, f64, f64)]) -> impl Iterator<Item = Waypoint> {
    rows.iter()
        .map(|&(name, lon, lat)| Waypoint::new(name, Coordinate::new(lon, lat)))
}

/// Academic buildings only.
pub fn buildings() -> Vec<Waypoint> {
    to_waypoints(BUILDINGS).collect()
}

/// Dining halls only.
pub fn serveries() -> Vec<Waypoint> {
    to_waypoints(SERVERIES).collect()
}

/// Buildings followed by serveries.
pub fn default_waypoints() -> Vec<Waypoint> {
    to_waypoints(BUILDINGS).chain(to_waypoints(SERVERIES)).collect()
}
