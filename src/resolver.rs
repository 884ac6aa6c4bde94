//! Loose waypoint-name resolution.
//!
//! A [`NameIndex`] maps two keys per waypoint to its coordinate: the
//! lower-cased name, and the normalized name (lower-cased, with every
//! non-alphanumeric character removed). Lookups try the lower-cased form
//! first, then the normalized one, so `"Duncan Hall (CS)"`,
//! `"duncan hall (cs)"` and `"duncanhallcs"` all resolve to the same place.
//!
//! When two waypoints share a key, the one registered later wins.
//!
//! [`NameResolver`] owns the current index. Every rebuild constructs a new
//! index off to the side and swaps it in under a write lock, so readers see
//! either the old index or the new one in full.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use log::{debug, info};

use crate::{geo_utils, Bounds, Coordinate, Error, Waypoint};

/// Lower-case `name` and strip every non-alphanumeric character.
///
/// ```
/// use campus_nav::normalize_name;
/// assert_eq!(normalize_name("Duncan Hall (CS)"), "duncanhallcs");
/// ```
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Immutable name → coordinate index.
#[derive(Debug, Default)]
pub struct NameIndex {
    by_lower: HashMap<String, Coordinate>,
    by_normalized: HashMap<String, Coordinate>,
    waypoints: Vec<Waypoint>,
}

impl NameIndex {
    /// Build an index from waypoints in iteration order.
    ///
    /// Waypoints with non-finite coordinates are skipped.
    pub fn build(waypoints: impl IntoIterator<Item = Waypoint>) -> Self {
        let mut index = NameIndex::default();

        for waypoint in waypoints {
            if !waypoint.coordinate.is_valid() {
                debug!("[NameIndex] Skipping {:?}: non-finite coordinate", waypoint.name);
                continue;
            }

            let coord = waypoint.coordinate;
            let lower = waypoint.name.to_lowercase();
            let normalized = normalize_name(&waypoint.name);

            if let Some(prev) = index.by_lower.insert(lower, coord) {
                if prev != coord {
                    debug!("[NameIndex] {:?} overrides an earlier waypoint", waypoint.name);
                }
            }
            if !normalized.is_empty() {
                if let Some(prev) = index.by_normalized.insert(normalized, coord) {
                    if prev != coord {
                        debug!(
                            "[NameIndex] {:?} overrides an earlier waypoint with the same normalized name",
                            waypoint.name
                        );
                    }
                }
            }
            index.waypoints.push(waypoint);
        }

        index
    }

    /// Resolve a name: lower-cased match first, then normalized match.
    pub fn lookup(&self, name: &str) -> Option<Coordinate> {
        self.by_lower
            .get(&name.to_lowercase())
            .or_else(|| self.by_normalized.get(&normalize_name(name)))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Waypoints in registration order.
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.waypoints.iter().map(|w| w.name.as_str())
    }

    fn coordinates(&self) -> Vec<Coordinate> {
        self.waypoints.iter().map(|w| w.coordinate).collect()
    }

    /// Bounding box of all waypoints.
    pub fn bounds(&self) -> Option<Bounds> {
        geo_utils::compute_bounds(&self.coordinates())
    }

    /// Centroid of all waypoints.
    pub fn center(&self) -> Option<Coordinate> {
        geo_utils::compute_center(&self.coordinates())
    }
}

/// Holder of the current [`NameIndex`].
///
/// Starts empty; route acquisition stays unavailable until the first
/// successful [`build`](NameResolver::build) or
/// [`load_payload`](NameResolver::load_payload).
#[derive(Debug, Default)]
pub struct NameResolver {
    current: RwLock<Arc<NameIndex>>,
}

impl NameResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the index with one built from `waypoints`.
    ///
    /// Returns the number of indexed waypoints. If nothing usable remains,
    /// the previous index is kept and
    /// [`Error::MalformedWaypointPayload`] is returned.
    pub fn build(&self, waypoints: impl IntoIterator<Item = Waypoint>) -> Result<usize, Error> {
        let index = NameIndex::build(waypoints);
        if index.is_empty() {
            return Err(Error::MalformedWaypointPayload(
                "no waypoints with finite coordinates".to_string(),
            ));
        }

        let count = index.len();
        let index = Arc::new(index);
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = index;

        info!("[NameResolver] Index rebuilt with {} waypoints", count);
        Ok(count)
    }

    /// Decode a raw waypoint source payload and rebuild from it.
    pub fn load_payload(&self, bytes: &[u8]) -> Result<usize, Error> {
        let waypoints = crate::decode_waypoints(bytes)?;
        self.build(waypoints)
    }

    /// The current index. Hold on to it for a batch of consistent lookups.
    pub fn snapshot(&self) -> Arc<NameIndex> {
        self.current.read().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn lookup(&self, name: &str) -> Option<Coordinate> {
        self.snapshot().lookup(name)
    }

    pub fn is_loaded(&self) -> bool {
        !self.snapshot().is_empty()
    }
}
