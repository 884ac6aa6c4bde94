//! Route acquisition with straight-line fallback.
//!
//! A route between two named waypoints is first requested from an external
//! [`PathService`]. When the service fails (bad status, malformed body,
//! transport error) the [`RouteResolver`] synthesizes a direct two-point
//! route from the [`NameIndex`] instead. There are no retries: one failed
//! attempt goes straight to the fallback.
//!
//! Each request carries an [`AbortRegistration`]. [`RouteSession`] ties these
//! to the user's current origin/destination selection: a new selection
//! aborts the request still in flight, and only the newest selection's
//! outcome is ever applied, whatever order the network answers in.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use futures::future::{AbortHandle, AbortRegistration, Abortable};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{geo_utils, Error, NameIndex, NameResolver, Route, RouteSource};

// ============================================================================
// Path service
// ============================================================================

/// External path-finding service.
pub trait PathService: Send + Sync {
    /// Request an ordered path between two waypoint names.
    ///
    /// Any `Err` is treated as a service failure and triggers the fallback.
    fn find_path(
        &self,
        origin: &str,
        destination: &str,
    ) -> impl Future<Output = Result<PathResponse, Error>> + Send;
}

/// A validated path-service answer: at least two names, plus an optional
/// total distance in meters.
#[derive(Debug, Clone, PartialEq)]
pub struct PathResponse {
    names: Vec<String>,
    distance_meters: Option<f64>,
}

/// Wire shapes accepted from the service.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPath {
    Names(Vec<String>),
    Detailed {
        path: Vec<String>,
        #[serde(default)]
        distance: Option<Value>,
    },
}

impl PathResponse {
    /// Validate a path. Fewer than two names is a service failure. A
    /// negative or non-finite distance is discarded.
    pub fn new(names: Vec<String>, distance_meters: Option<f64>) -> Result<Self, Error> {
        if names.len() < 2 {
            return Err(Error::Service(format!(
                "path has {} name(s), need at least 2",
                names.len()
            )));
        }
        let distance_meters = distance_meters.filter(|d| d.is_finite() && *d >= 0.0);
        Ok(Self { names, distance_meters })
    }

    /// Decode a response body: either a bare array of names, or an object
    /// with a `path` array and an optional numeric `distance`.
    ///
    /// ```
    /// use campus_nav::PathResponse;
    ///
    /// let r = PathResponse::from_json(br#"{"path": ["Fondren Library", "Rayzor Hall"], "distance": 190}"#).unwrap();
    /// assert_eq!(r.names().len(), 2);
    /// assert_eq!(r.distance_meters(), Some(190.0));
    ///
    /// assert!(PathResponse::from_json(br#"{"path": null, "distance": null}"#).is_err());
    /// ```
    pub fn from_json(bytes: &[u8]) -> Result<Self, Error> {
        let raw: RawPath = serde_json::from_slice(bytes)
            .map_err(|e| Error::Service(format!("unexpected response body: {}", e)))?;

        match raw {
            RawPath::Names(names) => Self::new(names, None),
            RawPath::Detailed { path, distance } => {
                Self::new(path, distance.as_ref().and_then(Value::as_f64))
            }
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn distance_meters(&self) -> Option<f64> {
        self.distance_meters
    }
}

// ============================================================================
// Outcomes
// ============================================================================

/// Result of a route resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RouteOutcome {
    Found(Route),
    /// The service failed and at least one name could not be resolved.
    NoRoute { unresolved: Vec<String> },
}

impl RouteOutcome {
    pub fn route(&self) -> Option<&Route> {
        match self {
            RouteOutcome::Found(route) => Some(route),
            RouteOutcome::NoRoute { .. } => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, RouteOutcome::Found(_))
    }
}

fn service_route(response: PathResponse, index: &NameIndex) -> Route {
    let total_meters = response.distance_meters.or_else(|| {
        let coords: Option<Vec<_>> = response.names.iter().map(|n| index.lookup(n)).collect();
        coords.map(|c| geo_utils::path_length_meters(&c))
    });

    Route {
        ordered_names: response.names,
        total_meters,
        source: RouteSource::Service,
    }
}

/// Direct two-point route, or the names that failed to resolve.
pub fn fallback_route(index: &NameIndex, origin: &str, destination: &str) -> RouteOutcome {
    match (index.lookup(origin), index.lookup(destination)) {
        (Some(a), Some(b)) => RouteOutcome::Found(Route {
            ordered_names: vec![origin.to_string(), destination.to_string()],
            total_meters: Some(geo_utils::distance_meters(&a, &b)),
            source: RouteSource::Fallback,
        }),
        (a, b) => {
            let unresolved = [(origin, a), (destination, b)]
                .into_iter()
                .filter(|(_, coord)| coord.is_none())
                .map(|(name, _)| name.to_string())
                .collect();
            RouteOutcome::NoRoute { unresolved }
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Route acquisition over a path service and a shared name index.
pub struct RouteResolver<S> {
    service: S,
    names: Arc<NameResolver>,
}

impl<S: PathService> RouteResolver<S> {
    pub fn new(service: S, names: Arc<NameResolver>) -> Self {
        Self { service, names }
    }

    pub fn names(&self) -> &Arc<NameResolver> {
        &self.names
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    /// Resolve a route between two names.
    ///
    /// Returns [`Error::WaypointsUnavailable`] until a waypoint set has been
    /// loaded, and [`Error::Superseded`] if `cancel` fires before the service
    /// answers. Service failures never surface; they produce the fallback.
    pub async fn resolve_route(
        &self,
        origin: &str,
        destination: &str,
        cancel: AbortRegistration,
    ) -> Result<RouteOutcome, Error> {
        let index = self.names.snapshot();
        if index.is_empty() {
            return Err(Error::WaypointsUnavailable);
        }

        let start = Instant::now();
        let primary = Abortable::new(self.service.find_path(origin, destination), cancel).await;

        let outcome = match primary {
            Err(_aborted) => {
                debug!(
                    "[RouteResolver] {} -> {} aborted after {:?}",
                    origin, destination, start.elapsed()
                );
                return Err(Error::Superseded);
            }
            Ok(Ok(response)) => RouteOutcome::Found(service_route(response, &index)),
            Ok(Err(e)) => {
                warn!(
                    "[RouteResolver] {} -> {}: {}; using straight-line fallback",
                    origin, destination, e
                );
                fallback_route(&index, origin, destination)
            }
        };

        match &outcome {
            RouteOutcome::Found(route) => info!(
                "[RouteResolver] {} -> {}: {} stops, {:?} m ({:?}) in {:?}",
                origin,
                destination,
                route.ordered_names.len(),
                route.total_meters.map(|m| m.round()),
                route.source,
                start.elapsed()
            ),
            RouteOutcome::NoRoute { unresolved } => info!(
                "[RouteResolver] {} -> {}: no route, unresolved {:?}",
                origin, destination, unresolved
            ),
        }

        Ok(outcome)
    }
}

// ============================================================================
// Session
// ============================================================================

/// The outcome applied for a selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedRoute {
    pub origin: String,
    pub destination: String,
    pub outcome: RouteOutcome,
}

#[derive(Default)]
struct SessionState {
    generation: u64,
    in_flight: Option<AbortHandle>,
    applied: Option<SelectedRoute>,
}

/// Selection-scoped routing context.
///
/// Owns the resolver and the handle of the single meaningful in-flight
/// request. Dropping the session aborts that request.
pub struct RouteSession<S> {
    resolver: RouteResolver<S>,
    state: Mutex<SessionState>,
}

impl<S: PathService> RouteSession<S> {
    pub fn new(resolver: RouteResolver<S>) -> Self {
        Self {
            resolver,
            state: Mutex::new(SessionState::default()),
        }
    }

    pub fn resolver(&self) -> &RouteResolver<S> {
        &self.resolver
    }

    /// Select a new origin/destination pair and resolve it.
    ///
    /// Returns `Ok(None)` when a newer selection (or [`cancel`](Self::cancel))
    /// superseded this one; its outcome is discarded and never applied.
    pub async fn select(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<Option<RouteOutcome>, Error> {
        let (generation, registration) = {
            let mut state = self.lock();
            if let Some(previous) = state.in_flight.take() {
                debug!("[RouteSession] Aborting request #{}", state.generation);
                previous.abort();
            }
            state.generation += 1;
            let (handle, registration) = AbortHandle::new_pair();
            state.in_flight = Some(handle);
            (state.generation, registration)
        };

        let result = self
            .resolver
            .resolve_route(origin, destination, registration)
            .await;

        let mut state = self.lock();
        if state.generation != generation {
            debug!(
                "[RouteSession] Discarding result of request #{} ({} -> {}), current is #{}",
                generation, origin, destination, state.generation
            );
            return Ok(None);
        }
        state.in_flight = None;

        match result {
            Ok(outcome) => {
                state.applied = Some(SelectedRoute {
                    origin: origin.to_string(),
                    destination: destination.to_string(),
                    outcome: outcome.clone(),
                });
                Ok(Some(outcome))
            }
            Err(Error::Superseded) => Ok(None),
            Err(e) => {
                state.applied = None;
                Err(e)
            }
        }
    }

    /// Abort any in-flight request without starting a new one.
    pub fn cancel(&self) {
        let mut state = self.lock();
        state.generation += 1;
        if let Some(handle) = state.in_flight.take() {
            handle.abort();
        }
    }

    /// The most recently applied selection, if any.
    pub fn current(&self) -> Option<SelectedRoute> {
        self.lock().applied.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<S> Drop for RouteSession<S> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = state.in_flight.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{campus, Coordinate};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    type Scripted = (u64, Result<PathResponse, Error>);

    /// Answers from a fixed table after a per-route delay; anything else fails.
    #[derive(Default)]
    struct ScriptedService {
        routes: HashMap<(String, String), Scripted>,
        calls: AtomicUsize,
    }

    impl ScriptedService {
        fn with(mut self, origin: &str, destination: &str, delay_ms: u64, result: Result<PathResponse, Error>) -> Self {
            self.routes
                .insert((origin.to_string(), destination.to_string()), (delay_ms, result));
            self
        }
    }

    impl PathService for ScriptedService {
        fn find_path(
            &self,
            origin: &str,
            destination: &str,
        ) -> impl Future<Output = Result<PathResponse, Error>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let entry = self
                .routes
                .get(&(origin.to_string(), destination.to_string()))
                .cloned();
            async move {
                match entry {
                    Some((delay_ms, result)) => {
                        if delay_ms > 0 {
                            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        }
                        result
                    }
                    None => Err(Error::Service("connection refused".to_string())),
                }
            }
        }
    }

    fn campus_names() -> Arc<NameResolver> {
        let names = Arc::new(NameResolver::new());
        names.build(campus::default_waypoints()).unwrap();
        names
    }

    fn path(names: &[&str], distance: Option<f64>) -> Result<PathResponse, Error> {
        PathResponse::new(names.iter().map(|s| s.to_string()).collect(), distance)
    }

    fn registration() -> AbortRegistration {
        AbortHandle::new_pair().1
    }

    fn coord(names: &NameResolver, name: &str) -> Coordinate {
        names.lookup(name).unwrap()
    }

    #[test]
    fn test_path_response_shapes() {
        let bare = PathResponse::from_json(br#"["A", "B", "C"]"#).unwrap();
        assert_eq!(bare.names(), ["A", "B", "C"]);
        assert_eq!(bare.distance_meters(), None);

        let detailed = PathResponse::from_json(br#"{"path": ["A", "B"], "distance": 1364}"#).unwrap();
        assert_eq!(detailed.distance_meters(), Some(1364.0));

        let no_distance = PathResponse::from_json(br#"{"path": ["A", "B"]}"#).unwrap();
        assert_eq!(no_distance.distance_meters(), None);

        let text_distance = PathResponse::from_json(br#"{"path": ["A", "B"], "distance": "far"}"#).unwrap();
        assert_eq!(text_distance.distance_meters(), None);
    }

    #[test]
    fn test_path_response_rejects_bad_shapes() {
        let bodies: [&[u8]; 7] = [
            br#"["A"]"#,
            br#"[]"#,
            br#"{"path": ["A"], "distance": 3}"#,
            br#"{"path": null, "distance": null}"#,
            br#"{"route": ["A", "B"]}"#,
            br#"[1, 2]"#,
            br#"<html>502</html>"#,
        ];
        for body in bodies {
            assert!(
                matches!(PathResponse::from_json(body), Err(Error::Service(_))),
                "accepted {:?}",
                String::from_utf8_lossy(body)
            );
        }
    }

    #[test]
    fn test_negative_distance_discarded() {
        let r = PathResponse::new(vec!["A".into(), "B".into()], Some(-5.0)).unwrap();
        assert_eq!(r.distance_meters(), None);
    }

    #[tokio::test]
    async fn test_service_route_with_distance() {
        let service = ScriptedService::default().with(
            "Fondren Library",
            "Gibbs Recreation Center",
            0,
            path(&["Fondren Library", "Rice Memorial Center", "Gibbs Recreation Center"], Some(1364.0)),
        );
        let resolver = RouteResolver::new(service, campus_names());

        let outcome = resolver
            .resolve_route("Fondren Library", "Gibbs Recreation Center", registration())
            .await
            .unwrap();
        let route = outcome.route().unwrap();
        assert_eq!(route.ordered_names.len(), 3);
        assert_eq!(route.total_meters, Some(1364.0));
        assert_eq!(route.source, RouteSource::Service);
    }

    #[tokio::test]
    async fn test_service_route_without_distance_is_measured() {
        let names = campus_names();
        let stops = ["Duncan Hall (CS)", "Fondren Library", "Rayzor Hall"];
        let service = ScriptedService::default().with("Duncan Hall (CS)", "Rayzor Hall", 0, path(&stops, None));
        let resolver = RouteResolver::new(service, Arc::clone(&names));

        let outcome = resolver
            .resolve_route("Duncan Hall (CS)", "Rayzor Hall", registration())
            .await
            .unwrap();

        let coords: Vec<Coordinate> = stops.iter().map(|s| coord(&names, s)).collect();
        let expected = geo_utils::path_length_meters(&coords);
        assert_eq!(outcome.route().unwrap().total_meters, Some(expected));
    }

    #[tokio::test]
    async fn test_service_route_with_unknown_stop_has_no_length() {
        let service = ScriptedService::default().with(
            "Fondren Library",
            "Rayzor Hall",
            0,
            path(&["Fondren Library", "Secret Tunnel", "Rayzor Hall"], None),
        );
        let resolver = RouteResolver::new(service, campus_names());
        let outcome = resolver
            .resolve_route("Fondren Library", "Rayzor Hall", registration())
            .await
            .unwrap();
        assert_eq!(outcome.route().unwrap().total_meters, None);
    }

    #[tokio::test]
    async fn test_fallback_when_service_unreachable() {
        let names = campus_names();
        let service = ScriptedService::default();
        let resolver = RouteResolver::new(service, Arc::clone(&names));

        let outcome = resolver
            .resolve_route("Fondren Library", "Gibbs Recreation Center", registration())
            .await
            .unwrap();

        let route = outcome.route().unwrap();
        assert_eq!(route.ordered_names, vec!["Fondren Library", "Gibbs Recreation Center"]);
        assert_eq!(route.source, RouteSource::Fallback);

        let expected = geo_utils::distance_meters(
            &coord(&names, "Fondren Library"),
            &coord(&names, "Gibbs Recreation Center"),
        );
        let got = route.total_meters.unwrap();
        assert!(((got - expected) / expected).abs() < 1e-6);
        assert_eq!(resolver.service().calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_on_service_error_result() {
        let service = ScriptedService::default().with(
            "Rayzor Hall",
            "fondren library",
            0,
            Err(Error::Service("HTTP 500".to_string())),
        );
        let resolver = RouteResolver::new(service, campus_names());
        let outcome = resolver
            .resolve_route("Rayzor Hall", "fondren library", registration())
            .await
            .unwrap();
        let route = outcome.route().unwrap();
        // Names pass through as the caller typed them
        assert_eq!(route.ordered_names, vec!["Rayzor Hall", "fondren library"]);
        assert_eq!(route.source, RouteSource::Fallback);
    }

    #[tokio::test]
    async fn test_fallback_with_unresolvable_name() {
        let resolver = RouteResolver::new(ScriptedService::default(), campus_names());
        let outcome = resolver
            .resolve_route("Fondren Library", "Atlantis", registration())
            .await
            .unwrap();
        assert_eq!(
            outcome,
            RouteOutcome::NoRoute { unresolved: vec!["Atlantis".to_string()] }
        );
        assert!(!outcome.is_found());
    }

    #[tokio::test]
    async fn test_unavailable_before_waypoints_load() {
        let resolver = RouteResolver::new(ScriptedService::default(), Arc::new(NameResolver::new()));
        let err = resolver.resolve_route("A", "B", registration()).await.unwrap_err();
        assert_eq!(err, Error::WaypointsUnavailable);
        assert_eq!(resolver.service().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_aborted_request_is_superseded() {
        let resolver = RouteResolver::new(ScriptedService::default(), campus_names());
        let (handle, registration) = AbortHandle::new_pair();
        handle.abort();

        let err = resolver
            .resolve_route("Fondren Library", "Rayzor Hall", registration)
            .await
            .unwrap_err();
        assert_eq!(err, Error::Superseded);
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let resolver = RouteResolver::new(ScriptedService::default(), campus_names());
        let first = resolver
            .resolve_route("Herzstein Hall", "Rayzor Hall", registration())
            .await
            .unwrap();
        let second = resolver
            .resolve_route("Herzstein Hall", "Rayzor Hall", registration())
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    fn session(service: ScriptedService) -> RouteSession<ScriptedService> {
        RouteSession::new(RouteResolver::new(service, campus_names()))
    }

    #[tokio::test]
    async fn test_newer_selection_wins_when_older_answers_first() {
        let session = session(
            ScriptedService::default()
                .with("Fondren Library", "Rayzor Hall", 5, path(&["Fondren Library", "Rayzor Hall"], Some(1.0)))
                .with("Fondren Library", "Herzstein Hall", 40, path(&["Fondren Library", "Herzstein Hall"], Some(2.0))),
        );

        let (older, newer) = tokio::join!(
            session.select("Fondren Library", "Rayzor Hall"),
            session.select("Fondren Library", "Herzstein Hall"),
        );

        assert_eq!(older.unwrap(), None);
        let newer = newer.unwrap().unwrap();
        assert_eq!(newer.route().unwrap().total_meters, Some(2.0));

        let current = session.current().unwrap();
        assert_eq!(current.destination, "Herzstein Hall");
        assert_eq!(current.outcome, newer);
    }

    #[tokio::test]
    async fn test_newer_selection_wins_when_older_answers_last() {
        let session = session(
            ScriptedService::default()
                .with("Fondren Library", "Rayzor Hall", 40, path(&["Fondren Library", "Rayzor Hall"], Some(1.0)))
                .with("Fondren Library", "Herzstein Hall", 5, path(&["Fondren Library", "Herzstein Hall"], Some(2.0))),
        );

        let (older, newer) = tokio::join!(
            session.select("Fondren Library", "Rayzor Hall"),
            session.select("Fondren Library", "Herzstein Hall"),
        );

        assert_eq!(older.unwrap(), None);
        assert!(newer.unwrap().is_some());
        assert_eq!(session.current().unwrap().destination, "Herzstein Hall");
    }

    #[tokio::test]
    async fn test_sequential_selections_each_apply() {
        let session = session(ScriptedService::default());

        let first = session.select("Fondren Library", "Rayzor Hall").await.unwrap();
        assert!(first.is_some());
        assert_eq!(session.current().unwrap().destination, "Rayzor Hall");

        let second = session.select("Fondren Library", "Gibbs Recreation Center").await.unwrap();
        assert!(second.is_some());
        assert_eq!(session.current().unwrap().destination, "Gibbs Recreation Center");
    }

    #[tokio::test]
    async fn test_cancel_discards_in_flight() {
        let session = session(ScriptedService::default().with(
            "Fondren Library",
            "Rayzor Hall",
            40,
            path(&["Fondren Library", "Rayzor Hall"], None),
        ));

        let (result, ()) = tokio::join!(session.select("Fondren Library", "Rayzor Hall"), async {
            session.cancel();
        });

        assert_eq!(result.unwrap(), None);
        assert_eq!(session.current(), None);
    }

    #[tokio::test]
    async fn test_session_surfaces_unloaded_waypoints() {
        let session = RouteSession::new(RouteResolver::new(
            ScriptedService::default(),
            Arc::new(NameResolver::new()),
        ));
        assert_eq!(
            session.select("A", "B").await.unwrap_err(),
            Error::WaypointsUnavailable
        );
        assert_eq!(session.current(), None);
    }
}
