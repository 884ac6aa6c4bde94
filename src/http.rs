//! HTTP collaborators for the campus backend.
//!
//! - [`HttpPathService`] - the path-finding service, as a [`PathService`]
//! - [`HttpPathService::fetch_waypoints`] - the waypoint source
//! - [`HttpPathService::course_location`] - course id to building name
//! - [`load_waypoints_sync`] - blocking waypoint refresh for callers without a runtime
//!
//! All requests share one pooled client with the configured timeout. A
//! timeout surfaces as an ordinary [`Error::Service`].

use std::time::{Duration, Instant};

use log::{debug, info, warn};
use reqwest::{Client, Request, RequestBuilder, Url};
use serde::Deserialize;

use crate::routing::{PathResponse, PathService};
use crate::{decode_waypoints, Error, NameResolver, NavigatorConfig, Waypoint};

/// Body of a course-location response.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CourseLocation {
    Bare(String),
    Record {
        #[serde(alias = "building")]
        location: String,
    },
}

/// Client for the path service, waypoint source and course lookup.
#[derive(Debug, Clone)]
pub struct HttpPathService {
    client: Client,
    config: NavigatorConfig,
}

impl HttpPathService {
    pub fn new(config: &NavigatorConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(60))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config: config.clone() })
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    fn build(request: RequestBuilder, what: &str) -> Result<Request, Error> {
        request
            .build()
            .map_err(|e| Error::Service(format!("{} request invalid: {}", what, e)))
    }

    /// GET for the path service, names passed as query parameters.
    fn path_request(&self, origin: &str, destination: &str) -> Result<Request, Error> {
        let url = self.config.url(&self.config.path_endpoint);
        let request = self.client.get(&url).query(&[
            (self.config.origin_param.as_str(), origin),
            (self.config.destination_param.as_str(), destination),
        ]);
        Self::build(request, "path")
    }

    /// Execute `request` and return the body of a 2xx response.
    async fn get_bytes(&self, request: Request, what: &str) -> Result<Vec<u8>, Error> {
        let start = Instant::now();
        let resp = self
            .client
            .execute(request)
            .await
            .map_err(|e| Error::Service(format!("{} request failed: {}", what, e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Service(format!("{} returned HTTP {}", what, status)));
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| Error::Service(format!("{} body read failed: {}", what, e)))?;

        debug!(
            "[HttpPathService] {} -> {} bytes in {:.0}ms",
            what,
            bytes.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(bytes.to_vec())
    }

    /// Download and decode the waypoint source.
    pub async fn fetch_waypoints(&self) -> Result<Vec<Waypoint>, Error> {
        let url = self.config.url(&self.config.waypoints_endpoint);
        let request = Self::build(self.client.get(&url), "waypoints")?;
        let bytes = self.get_bytes(request, "waypoints").await?;
        let waypoints = decode_waypoints(&bytes)?;
        info!("[HttpPathService] Fetched {} waypoints from {}", waypoints.len(), url);
        Ok(waypoints)
    }

    /// Fetch waypoints and rebuild `resolver` from them.
    ///
    /// On any failure the resolver keeps its previous index.
    pub async fn refresh(&self, resolver: &NameResolver) -> Result<usize, Error> {
        let waypoints = self.fetch_waypoints().await?;
        resolver.build(waypoints)
    }

    async fn fetch_course(&self, course_id: &str) -> Result<Vec<u8>, Error> {
        let url = course_url(&self.config, course_id)?;
        let request = Self::build(self.client.get(url), "course location")?;
        self.get_bytes(request, "course location").await
    }

    /// Look up the building a course meets in.
    ///
    /// Failures are logged and reported as `None`.
    pub async fn course_location(&self, course_id: &str) -> Option<String> {
        let bytes = match self.fetch_course(course_id).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("[HttpPathService] Course {:?}: {}", course_id, e);
                return None;
            }
        };

        let location = parse_course_location(&bytes);
        if location.is_none() {
            warn!("[HttpPathService] Course {:?}: unrecognized response body", course_id);
        }
        location
    }
}

impl PathService for HttpPathService {
    async fn find_path(&self, origin: &str, destination: &str) -> Result<PathResponse, Error> {
        let request = self.path_request(origin, destination)?;
        let bytes = self.get_bytes(request, "path").await?;
        PathResponse::from_json(&bytes)
    }
}

fn course_url(config: &NavigatorConfig, course_id: &str) -> Result<Url, Error> {
    let mut url = Url::parse(&config.url(&config.course_location_endpoint))
        .map_err(|e| Error::Http(format!("Invalid course endpoint: {}", e)))?;
    url.path_segments_mut()
        .map_err(|_| Error::Http("Course endpoint cannot take path segments".to_string()))?
        .pop_if_empty()
        .push(course_id);
    Ok(url)
}

/// JSON string, `{"location": ..}`/`{"building": ..}`, or plain text.
fn parse_course_location(bytes: &[u8]) -> Option<String> {
    let text = match serde_json::from_slice::<CourseLocation>(bytes) {
        Ok(CourseLocation::Bare(s)) | Ok(CourseLocation::Record { location: s }) => s,
        Err(_) => {
            let raw = std::str::from_utf8(bytes).ok()?;
            // Reject JSON we did not understand rather than echo it back
            if raw.trim_start().starts_with(['{', '[']) {
                return None;
            }
            raw.to_string()
        }
    };

    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Blocking waypoint refresh on a private runtime.
pub fn load_waypoints_sync(config: &NavigatorConfig, resolver: &NameResolver) -> Result<usize, Error> {
    use tokio::runtime::Builder;

    let rt = Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .map_err(|e| Error::Http(format!("Failed to create tokio runtime: {}", e)))?;

    let service = HttpPathService::new(config)?;
    rt.block_on(service.refresh(resolver))
}
