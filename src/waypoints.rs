//! Decoding of waypoint source payloads.
//!
//! Accepted shapes:
//!
//! | Shape | Example |
//! |-------|---------|
//! | array of tuples | `[["Fondren Library", 29.71857, -95.40189]]` |
//! | array of records | `[{"name": "Fondren Library", "latitude": 29.71857, "lng": -95.40189}]` |
//! | name mapping | `{"Fondren Library": [29.71857, -95.40189]}` or `{"Fondren Library": {"lat": .., "lon": ..}}` |
//!
//! Coordinates in payloads are latitude first. Entries that do not match
//! their shape, or carry non-finite coordinates, are dropped. A payload that
//! leaves no usable entry is [`Error::MalformedWaypointPayload`].

use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::{Coordinate, Error, Waypoint};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Payload {
    List(Vec<Value>),
    Mapping(Map<String, Value>),
}

/// One element of an array-shaped payload.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListEntry {
    Tuple(String, f64, f64),
    Record {
        name: String,
        #[serde(alias = "latitude")]
        lat: f64,
        #[serde(alias = "lng", alias = "longitude")]
        lon: f64,
    },
}

/// The value side of a mapping-shaped payload.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MappedCoord {
    Pair(f64, f64),
    Record {
        #[serde(alias = "latitude")]
        lat: f64,
        #[serde(alias = "lng", alias = "longitude")]
        lon: f64,
    },
}

impl ListEntry {
    fn into_waypoint(self) -> Waypoint {
        match self {
            ListEntry::Tuple(name, lat, lon) | ListEntry::Record { name, lat, lon } => {
                Waypoint::new(name, Coordinate::new(lon, lat))
            }
        }
    }
}

impl MappedCoord {
    fn into_coordinate(self) -> Coordinate {
        match self {
            MappedCoord::Pair(lat, lon) | MappedCoord::Record { lat, lon } => Coordinate::new(lon, lat),
        }
    }
}

/// Decode a waypoint payload from raw JSON bytes.
///
/// # Example
///
/// ```rust
/// use campus_nav::decode_waypoints;
///
/// let payload = br#"{"Fondren Library": [29.71857, -95.40189]}"#;
/// let waypoints = decode_waypoints(payload).unwrap();
/// assert_eq!(waypoints[0].coordinate.longitude, -95.40189);
/// ```
pub fn decode_waypoints(bytes: &[u8]) -> Result<Vec<Waypoint>, Error> {
    let value: Value = serde_json::from_slice(bytes)
        .map_err(|e| Error::MalformedWaypointPayload(format!("invalid JSON: {}", e)))?;
    decode_waypoint_value(value)
}

/// Decode an already-parsed waypoint payload.
pub fn decode_waypoint_value(value: Value) -> Result<Vec<Waypoint>, Error> {
    let payload: Payload = serde_json::from_value(value).map_err(|_| {
        Error::MalformedWaypointPayload("expected an array or an object".to_string())
    })?;

    let total;
    let waypoints: Vec<Waypoint> = match payload {
        Payload::List(items) => {
            total = items.len();
            items
                .into_iter()
                .filter_map(|item| match serde_json::from_value::<ListEntry>(item) {
                    Ok(entry) => Some(entry.into_waypoint()),
                    Err(e) => {
                        debug!("[Waypoints] Dropping list entry: {}", e);
                        None
                    }
                })
                .filter(keep_finite)
                .collect()
        }
        Payload::Mapping(map) => {
            total = map.len();
            map.into_iter()
                .filter_map(|(name, coord)| match serde_json::from_value::<MappedCoord>(coord) {
                    Ok(coord) => Some(Waypoint::new(name, coord.into_coordinate())),
                    Err(e) => {
                        debug!("[Waypoints] Dropping entry {:?}: {}", name, e);
                        None
                    }
                })
                .filter(keep_finite)
                .collect()
        }
    };

    if waypoints.is_empty() {
        return Err(Error::MalformedWaypointPayload(format!(
            "no usable entries out of {}",
            total
        )));
    }

    debug!("[Waypoints] Decoded {}/{} entries", waypoints.len(), total);
    Ok(waypoints)
}

fn keep_finite(waypoint: &Waypoint) -> bool {
    let valid = waypoint.coordinate.is_valid();
    if !valid {
        debug!("[Waypoints] Dropping {:?}: non-finite coordinate", waypoint.name);
    }
    valid
}
