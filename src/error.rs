use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Malformed waypoint payload: {0}")]
    MalformedWaypointPayload(String),
    #[error("No waypoints loaded")]
    WaypointsUnavailable,
    #[error("Path service failure: {0}")]
    Service(String),
    #[error("Request superseded by a newer selection")]
    Superseded,
    #[error("Unrecognized time of day: {0:?}")]
    TimeParse(String),
    #[error("Unrecognized weekday: {0:?}")]
    UnknownWeekday(String),
    #[error("HTTP client error: {0}")]
    Http(String),
}
