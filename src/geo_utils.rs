//! # Geographic Utilities
//!
//! Distance and walking-time computations shared by route acquisition and
//! schedule aggregation.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`distance_meters`] | Great-circle distance between two coordinates |
//! | [`path_length_meters`] | Sum of consecutive distances along an ordered path |
//! | [`walk_minutes`] | Walking time for a distance at a given speed |
//! | [`compute_bounds`] | Bounding box of a set of coordinates |
//! | [`compute_center`] | Centroid of a set of coordinates |
//!
//! ## Example
//!
//! ```rust
//! use campus_nav::{Coordinate, geo_utils};
//!
//! let fondren = Coordinate::new(-95.40189, 29.71857);
//! let gibbs = Coordinate::new(-95.40604, 29.71488);
//!
//! let meters = geo_utils::distance_meters(&fondren, &gibbs);
//! let minutes = geo_utils::walk_minutes(meters, geo_utils::WALK_SPEED_MPS);
//! println!("{:.0} m, {:.1} min", meters, minutes);
//! ```
//!
//! ## Algorithm Notes
//!
//! Distances use the haversine formula on a sphere of radius
//! [`EARTH_RADIUS_M`]. Campus-scale distances are a few hundred meters, where
//! the spherical error is far below the walking-path error of a straight line.
//!
//! All inputs are expected to be finite; waypoint decoding drops anything
//! else before it reaches these functions.

use geo::{BoundingRect, Centroid, MultiPoint, Point};
use crate::{Bounds, Coordinate};

/// Mean Earth radius used for all distances, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Default walking speed, in meters per second (about 5 km/h).
pub const WALK_SPEED_MPS: f64 = 1.4;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance between two coordinates, in meters.
///
/// Symmetric in its arguments and exactly zero for identical coordinates.
///
/// # Example
///
/// ```rust
/// use campus_nav::{Coordinate, geo_utils};
///
/// let a = Coordinate::new(-95.401, 29.721);
/// let b = Coordinate::new(-95.402, 29.717);
///
/// let d = geo_utils::distance_meters(&a, &b);
/// assert_eq!(d, geo_utils::distance_meters(&b, &a));
/// assert!(d > 400.0 && d < 500.0);
/// ```
pub fn distance_meters(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let delta_lat = (b.latitude - a.latitude).to_radians();
    let delta_lon = (b.longitude - a.longitude).to_radians();

    let h = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    // Rounding can push h just past 1 for antipodal points
    let h = h.min(1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Total length of an ordered path, in meters.
///
/// Sums [`distance_meters`] over consecutive pairs. Empty and single-point
/// paths have length 0.
pub fn path_length_meters(points: &[Coordinate]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| distance_meters(&w[0], &w[1]))
        .sum()
}

/// Minutes needed to walk `meters` at `speed_mps` meters per second.
///
/// Use [`WALK_SPEED_MPS`] for the default pace.
#[inline]
pub fn walk_minutes(meters: f64, speed_mps: f64) -> f64 {
    meters / speed_mps / 60.0
}

// =============================================================================
// Extent Functions
// =============================================================================

fn to_multi_point(points: &[Coordinate]) -> MultiPoint<f64> {
    points
        .iter()
        .map(|c| Point::from(*c))
        .collect::<Vec<_>>()
        .into()
}

/// Bounding box enclosing all coordinates, or `None` for an empty slice.
pub fn compute_bounds(points: &[Coordinate]) -> Option<Bounds> {
    let rect = to_multi_point(points).bounding_rect()?;
    Some(Bounds {
        min_lat: rect.min().y,
        max_lat: rect.max().y,
        min_lng: rect.min().x,
        max_lng: rect.max().x,
    })
}

/// Arithmetic centroid of the coordinates, or `None` for an empty slice.
///
/// Fine for a campus; not meant for sets spanning the antimeridian.
pub fn compute_center(points: &[Coordinate]) -> Option<Coordinate> {
    to_multi_point(points).centroid().map(Coordinate::from)
}

// =============================================================================
// Unit Tests
// =============================================================================
