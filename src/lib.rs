//! # Campus Nav
//!
//! Walking navigation between named campus waypoints.
//!
//! This library provides:
//! - Loose name resolution of waypoints (case and punctuation insensitive)
//! - Route acquisition from an external path-finding service, with a
//!   deterministic straight-line fallback when the service fails
//! - Haversine distance and walking-time estimates
//! - Per-weekday walking totals for a schedule of events
//!
//! ## Features
//!
//! - **`http`** (default) - HTTP path service, waypoint source and course lookup
//!
//! ## Quick Start
//!
//! ```rust
//! use campus_nav::{campus, schedule::{Schedule, Weekday}, NameResolver};
//!
//! let resolver = NameResolver::new();
//! resolver.build(campus::default_waypoints()).unwrap();
//!
//! let duncan = resolver.lookup("duncanhallcs").unwrap();
//! assert_eq!((duncan.longitude, duncan.latitude), (-95.40134, 29.72069));
//!
//! let mut schedule = Schedule::new();
//! schedule.add("COMP 182", "Duncan Hall (CS)", Weekday::Mon, "10:00", "10:50");
//! schedule.add("MATH 212", "Herzstein Hall", Weekday::Mon, "11:00 AM", "11:50 AM");
//!
//! let week = schedule.summarize(&resolver.snapshot());
//! println!("Monday: {:.1} min walking", week[&Weekday::Mon].total_minutes);
//! ```

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::Error;

pub mod geo_utils;

pub mod waypoints;
pub use waypoints::decode_waypoints;

pub mod campus;

pub mod resolver;
pub use resolver::{normalize_name, NameIndex, NameResolver};

pub mod routing;
pub use routing::{PathResponse, PathService, RouteOutcome, RouteResolver, RouteSession, SelectedRoute};

pub mod schedule;
pub use schedule::{DailyWalkSummary, Schedule, ScheduledEvent, TimeOfDay, Weekday};

// HTTP collaborators
#[cfg(feature = "http")]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpPathService;

pub use futures::future::{AbortHandle, AbortRegistration};

// ============================================================================
// Core Types
// ============================================================================

/// A WGS84 coordinate, longitude first.
///
/// # Example
/// ```
/// use campus_nav::Coordinate;
/// let fondren = Coordinate::new(-95.40189, 29.71857);
/// assert!(fondren.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinate {
    /// Create a new coordinate.
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }

    /// Both components are finite.
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite() && self.latitude.is_finite()
    }
}

impl From<Coordinate> for geo::Point<f64> {
    fn from(c: Coordinate) -> Self {
        geo::Point::new(c.longitude, c.latitude)
    }
}

impl From<geo::Point<f64>> for Coordinate {
    fn from(p: geo::Point<f64>) -> Self {
        Coordinate::new(p.x(), p.y())
    }
}

/// A named point of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub name: String,
    pub coordinate: Coordinate,
}

impl Waypoint {
    pub fn new(name: impl Into<String>, coordinate: Coordinate) -> Self {
        Self { name: name.into(), coordinate }
    }
}

/// Bounding box of a set of waypoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

/// Where a [`Route`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    /// Returned by the path-finding service
    Service,
    /// Synthesized as a straight line after the service failed
    Fallback,
}

/// An ordered walking route between two named waypoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Waypoint names from origin to destination (at least two)
    pub ordered_names: Vec<String>,
    /// Total length in meters, when known
    pub total_meters: Option<f64>,
    pub source: RouteSource,
}

impl Route {
    pub fn origin(&self) -> &str {
        self.ordered_names.first().map_or("", String::as_str)
    }

    pub fn destination(&self) -> &str {
        self.ordered_names.last().map_or("", String::as_str)
    }

    /// Walking time in minutes at `speed_mps`, when the length is known.
    pub fn walk_minutes(&self, speed_mps: f64) -> Option<f64> {
        self.total_meters
            .map(|meters| geo_utils::walk_minutes(meters, speed_mps))
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Settings for the external collaborators and walking estimates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigatorConfig {
    /// Base URL of the backend hosting the path service.
    /// Default: "http://localhost:8000"
    pub base_url: String,

    /// Path-finding endpoint, relative to `base_url`.
    /// Default: "/navigate"
    pub path_endpoint: String,

    /// Query parameter carrying the origin name.
    /// Default: "start_str"
    pub origin_param: String,

    /// Query parameter carrying the destination name.
    /// Default: "end_str"
    pub destination_param: String,

    /// Waypoint source endpoint, relative to `base_url`.
    /// Default: "/nodes"
    pub waypoints_endpoint: String,

    /// Course-location endpoint prefix; the course id is appended as a path segment.
    /// Default: "/courses"
    pub course_location_endpoint: String,

    /// Transport timeout for a single HTTP request, in seconds.
    /// A timeout is handled like any other service failure. Default: 10
    pub request_timeout_secs: u64,

    /// Walking speed used for time estimates, in meters per second.
    /// Default: 1.4
    pub walk_speed_mps: f64,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            path_endpoint: "/navigate".to_string(),
            origin_param: "start_str".to_string(),
            destination_param: "end_str".to_string(),
            waypoints_endpoint: "/nodes".to_string(),
            course_location_endpoint: "/courses".to_string(),
            request_timeout_secs: 10,
            walk_speed_mps: geo_utils::WALK_SPEED_MPS,
        }
    }
}

impl NavigatorConfig {
    /// Parse a JSON config; missing fields take their defaults.
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub(crate) fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), endpoint)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_validation() {
        assert!(Coordinate::new(-95.40134, 29.72069).is_valid());
        assert!(!Coordinate::new(f64::NAN, 29.7).is_valid());
        assert!(!Coordinate::new(-95.4, f64::INFINITY).is_valid());
    }

    #[test]
    fn test_coordinate_point_conversion() {
        let c = Coordinate::new(-95.40134, 29.72069);
        let p: geo::Point<f64> = c.into();
        assert_eq!(p.x(), -95.40134);
        assert_eq!(p.y(), 29.72069);
        assert_eq!(Coordinate::from(p), c);
    }

    #[test]
    fn test_route_endpoints_and_minutes() {
        let route = Route {
            ordered_names: vec!["Fondren Library".into(), "Gibbs Recreation Center".into()],
            total_meters: Some(840.0),
            source: RouteSource::Fallback,
        };
        assert_eq!(route.origin(), "Fondren Library");
        assert_eq!(route.destination(), "Gibbs Recreation Center");
        assert!((route.walk_minutes(1.4).unwrap() - 10.0).abs() < 1e-9);

        let unknown = Route { total_meters: None, ..route };
        assert_eq!(unknown.walk_minutes(1.4), None);
    }

    #[test]
    fn test_config_defaults_and_partial_json() {
        let config = NavigatorConfig::from_json(br#"{"base_url": "http://nav.test/"}"#).unwrap();
        assert_eq!(config.base_url, "http://nav.test/");
        assert_eq!(config.path_endpoint, "/navigate");
        assert_eq!(config.walk_speed_mps, 1.4);
        assert_eq!(config.url(&config.path_endpoint), "http://nav.test/navigate");
    }
}
