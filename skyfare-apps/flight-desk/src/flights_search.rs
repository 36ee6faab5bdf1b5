//!  Skyfare Flight Desk
//!
//!  Copyright (C) 2026  Mamy Ratsimbazafy
//!
//!  This program is free software: you can redistribute it and/or modify
//!  it under the terms of the GNU Affero General Public License as published by
//!  the Free Software Foundation, either version 3 of the License, or
//!  (at your option) any later version.
//!
//!  This program is distributed in the hope that it will be useful,
//!  but WITHOUT ANY WARRANTY; without even the implied warranty of
//!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//!  GNU Affero General Public License for more details.
//!
//!  You should have received a copy of the GNU Affero General Public License
//!  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! # Flight Search Client
//!
//! Effectful (time, network) operations against the flight search service.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use skyfare_search_queue::{SearchQueue, SearchQueueError, SearchSequencer, SearchTicket};

use crate::config::DeskConfig;
use crate::error::DeskError;
use crate::flight_model::{AirlineInfo, Flight};
use crate::flight_records::parse_flight_records;
use crate::flights_catalog::FlightCatalog;
use crate::flights_query_builder::{Priority, SearchCriteria};

/// Anything that can answer a flight search: the remote service or a local
/// catalog.
pub trait FlightSource {
    fn search(
        &self,
        criteria: &SearchCriteria,
    ) -> impl Future<Output = Result<Vec<Flight>, DeskError>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AirportMatch {
    pub code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteCompetition {
    pub route: String,
    #[serde(default)]
    pub airlines: Vec<AirlineInfo>,
    pub competition_level: String,
    pub airline_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Method {
    Get,
    Post,
    Put,
    Delete,
}

/// Preview of an error body for logs and messages.
pub(crate) fn body_preview(body: &str) -> String {
    body.chars().take(300).collect()
}

/// Map a non-success HTTP status to the error taxonomy.
pub(crate) fn status_error(status: u16, body: &str, what: &str) -> DeskError {
    match status {
        401 => DeskError::AuthRequired,
        404 => DeskError::NotFound(what.to_string()),
        _ => DeskError::Transport(format!("HTTP {} for {}: {}", status, what, body_preview(body))),
    }
}

type ResponseFuture = Pin<Box<dyn Future<Output = anyhow::Result<(u16, String)>> + Send>>;

/// Build the retryable unit of work handed to the queue: one HTTP exchange
/// returning status and body. Server errors (5xx) fail the attempt so the
/// queue can retry them; other statuses are mapped after the queue.
pub(crate) fn http_exchange(
    client: Arc<wreq::Client>,
    method: Method,
    url: String,
    bearer: Option<String>,
    body: Option<serde_json::Value>,
) -> impl FnMut() -> ResponseFuture + Send {
    move || {
        let url = url.clone();
        let bearer = bearer.clone();
        let body = body.clone();
        let http_client = client.clone();
        Box::pin(async move {
            let http_start = Instant::now();
            tracing::trace!("[fetch_raw] {:?} {}", method, url);
            let request = match method {
                Method::Get => http_client.get(&url),
                Method::Post => http_client.post(&url),
                Method::Put => http_client.put(&url),
                Method::Delete => http_client.delete(&url),
            };
            let mut request = request.header("Accept", "application/json");
            if let Some(token) = &bearer {
                request = request.header("Authorization", format!("Bearer {}", token));
            }
            if let Some(json) = &body {
                request = request.json(json);
            }
            let response = request.send().await?;
            let status = response.status().as_u16();
            let text = response.text().await?;
            tracing::trace!(
                "[fetch_raw] HTTP {} in {:?}, {} bytes",
                status,
                http_start.elapsed(),
                text.len()
            );
            if status >= 500 {
                return Err(anyhow::Error::new(status_error(status, &text, &url)));
            }
            Ok((status, text))
        })
    }
}

#[derive(Clone)]
pub struct FlightsApiClient {
    client: Arc<wreq::Client>,
    query_queue: SearchQueue,
    base_url: String,
}

impl FlightsApiClient {
    pub fn new(config: &DeskConfig) -> Result<Self, DeskError> {
        let client = wreq::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DeskError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client: Arc::new(client),
            query_queue: config.search_queue(),
            base_url: config.search_api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Replace the request queue, e.g. to enable retries.
    pub fn with_queue(mut self, queue: SearchQueue) -> Self {
        self.query_queue = queue;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run one request through the queue and return the body of a 2xx
    /// response.
    async fn fetch_raw(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<String, DeskError> {
        let queue_start = Instant::now();
        let (status, text) = self
            .query_queue
            .run(http_exchange(
                Arc::clone(&self.client),
                method,
                format!("{}{}", self.base_url, path),
                None,
                body,
            ))
            .await?;
        tracing::debug!(
            "[fetch_raw] {} → HTTP {} (queue + request {:?})",
            path,
            status,
            queue_start.elapsed()
        );

        if !(200..300).contains(&status) {
            return Err(status_error(status, &text, path));
        }
        Ok(text)
    }

    async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DeskError> {
        let body = self.fetch_raw(Method::Get, path, None).await?;
        serde_json::from_str(&body)
            .map_err(|e| DeskError::Transport(format!("Invalid JSON from {}: {}", path, e)))
    }

    async fn fetch_flights(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Vec<Flight>, DeskError> {
        let text = self.fetch_raw(method, path, body).await?;
        let flights = parse_flight_records(&text)
            .map_err(|e| DeskError::Transport(format!("Invalid flight list from {}: {}", path, e)))?;
        tracing::debug!("{} returned {} flights", path, flights.len());
        Ok(flights)
    }

    pub async fn search_flights(&self, criteria: &SearchCriteria) -> Result<Vec<Flight>, DeskError> {
        tracing::info!("Searching flights: {}", criteria);
        let body = serde_json::to_value(criteria.to_request())
            .map_err(|e| DeskError::Transport(format!("Failed to encode search request: {}", e)))?;
        self.fetch_flights(Method::Post, "/api/flights/search", Some(body))
            .await
    }

    /// Search on behalf of `ticket`. `Ok(None)` when a newer search was
    /// issued on `sequencer` before this one completed; the stale response
    /// (or failure) is dropped unparsed.
    pub async fn search_latest(
        &self,
        criteria: &SearchCriteria,
        sequencer: &SearchSequencer,
        ticket: SearchTicket,
    ) -> Result<Option<Vec<Flight>>, DeskError> {
        if !sequencer.is_current(ticket) {
            tracing::debug!("Search #{} already superseded, not sent", ticket.sequence());
            return Ok(None);
        }
        let body = serde_json::to_value(criteria.to_request())
            .map_err(|e| DeskError::Transport(format!("Failed to encode search request: {}", e)))?;
        let outcome = self
            .query_queue
            .run_sequenced(
                sequencer,
                ticket,
                http_exchange(
                    Arc::clone(&self.client),
                    Method::Post,
                    format!("{}/api/flights/search", self.base_url),
                    None,
                    Some(body),
                ),
            )
            .await;

        let (status, text) = match outcome {
            Ok(response) => response,
            Err(SearchQueueError::Superseded { ticket, latest }) => {
                tracing::warn!("Dropping response of search #{} (latest is #{})", ticket, latest);
                return Ok(None);
            }
            Err(e) if !sequencer.is_current(ticket) => {
                tracing::warn!("Dropping failure of superseded search #{}: {}", ticket.sequence(), e);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        if !(200..300).contains(&status) {
            return Err(status_error(status, &text, "/api/flights/search"));
        }
        let flights = parse_flight_records(&text)
            .map_err(|e| DeskError::Transport(format!("Invalid flight list: {}", e)))?;
        Ok(Some(flights))
    }

    pub async fn all_flights(&self, priority: Priority) -> Result<Vec<Flight>, DeskError> {
        let path = format!("/api/flights/all?priority={}", priority);
        self.fetch_flights(Method::Get, &path, None).await
    }

    pub async fn flights_from(&self, source: &str) -> Result<Vec<Flight>, DeskError> {
        let path = format!("/api/flights/source/{}", urlencoding::encode(source));
        self.fetch_flights(Method::Get, &path, None).await
    }

    pub async fn flights_to(&self, destination: &str) -> Result<Vec<Flight>, DeskError> {
        let path = format!("/api/flights/destination/{}", urlencoding::encode(destination));
        self.fetch_flights(Method::Get, &path, None).await
    }

    pub async fn flights_by_route(
        &self,
        source: &str,
        destination: &str,
        priority: Priority,
    ) -> Result<Vec<Flight>, DeskError> {
        let path = format!(
            "/api/flights/route/{}/{}?priority={}",
            urlencoding::encode(source),
            urlencoding::encode(destination),
            priority
        );
        self.fetch_flights(Method::Get, &path, None).await
    }

    pub async fn airlines(&self) -> Result<Vec<AirlineInfo>, DeskError> {
        self.fetch_json("/api/airlines").await
    }

    pub async fn airline(&self, code: &str) -> Result<AirlineInfo, DeskError> {
        let path = format!("/api/airlines/{}", urlencoding::encode(code));
        self.fetch_json(&path).await
    }

    pub async fn route_competition(
        &self,
        source: &str,
        destination: &str,
    ) -> Result<RouteCompetition, DeskError> {
        let path = format!(
            "/api/routes/{}/{}/competition",
            urlencoding::encode(source),
            urlencoding::encode(destination)
        );
        self.fetch_json(&path).await
    }

    pub async fn search_airports(&self, query: &str, limit: usize) -> Result<Vec<AirportMatch>, DeskError> {
        let path = format!(
            "/api/airports/search?query={}&limit={}",
            urlencoding::encode(query),
            limit
        );
        self.fetch_json(&path).await
    }

    pub async fn health_check(&self) -> Result<HealthStatus, DeskError> {
        self.fetch_json("/health").await
    }
}

impl FlightSource for FlightsApiClient {
    fn search(
        &self,
        criteria: &SearchCriteria,
    ) -> impl Future<Output = Result<Vec<Flight>, DeskError>> + Send {
        self.search_flights(criteria)
    }
}

/// Where searches are answered: the remote service, or a catalog loaded
/// from a dataset file.
#[derive(Clone)]
pub enum FlightBackend {
    Remote(FlightsApiClient),
    Catalog(Arc<FlightCatalog>),
}

impl FlightSource for FlightBackend {
    fn search(
        &self,
        criteria: &SearchCriteria,
    ) -> impl Future<Output = Result<Vec<Flight>, DeskError>> + Send {
        async move {
            match self {
                FlightBackend::Remote(client) => client.search_flights(criteria).await,
                FlightBackend::Catalog(catalog) => Ok(catalog.smart_search(criteria)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    /// Read one HTTP request, headers and body.
    async fn read_request(socket: &mut TcpStream) -> Vec<u8> {
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap_or(0);
            if n == 0 {
                return request;
            }
            request.extend_from_slice(&buf[..n]);
            let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let headers = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
            let body_len = headers
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= end + 4 + body_len {
                return request;
            }
        }
    }

    /// Answer every request with the same status and body after `delay`.
    /// Returns the base URL and the count of requests served.
    async fn canned_server(
        status: &'static str,
        body: &'static str,
        delay: Duration,
    ) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let counter = Arc::clone(&counter);
                tokio::spawn(async move {
                    read_request(&mut socket).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(delay).await;
                    let response = format!(
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });
        (format!("http://{}", addr), hits)
    }

    fn client_for(url: &str) -> FlightsApiClient {
        let config = DeskConfig::default().with_search_api_url(url);
        FlightsApiClient::new(&config).unwrap()
    }

    fn sfo_jfk() -> SearchCriteria {
        SearchCriteria::builder().route("SFO", "JFK").build().unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert!(status_error(401, "", "/api/bookings").requires_login());
        assert!(matches!(status_error(404, "", "/x"), DeskError::NotFound(_)));

        let err = status_error(503, &"x".repeat(1000), "/api/flights/search");
        assert!(err.is_retryable());
        assert!(err.to_string().len() < 400);
    }

    #[tokio::test]
    async fn test_client_trims_base_url() {
        let config = DeskConfig::default().with_search_api_url("http://127.0.0.1:9/");
        let client = FlightsApiClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:9");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transport_error() {
        let mut config = DeskConfig::default().with_search_api_url("http://127.0.0.1:9");
        config.timeout_secs = 2;
        let client = FlightsApiClient::new(&config).unwrap();
        let err = client.health_check().await.unwrap_err();
        assert!(err.is_retryable(), "{:?}", err);
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let (url, hits) = canned_server("503 Service Unavailable", "down", Duration::ZERO).await;
        let queue = SearchQueue::with_concurrency_limit(1)
            .with_max_retries(2)
            .with_initial_delay(Duration::from_millis(10))
            .without_jitter();
        let client = client_for(&url).with_queue(queue);

        let err = client.health_check().await.unwrap_err();
        assert!(matches!(&err, DeskError::Transport(msg) if msg.contains("HTTP 503")), "{:?}", err);
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let (url, hits) = canned_server("404 Not Found", "{}", Duration::ZERO).await;
        let queue = SearchQueue::with_concurrency_limit(1)
            .with_max_retries(2)
            .with_initial_delay(Duration::from_millis(10))
            .without_jitter();
        let client = client_for(&url).with_queue(queue);

        let err = client.airline("ZZ").await.unwrap_err();
        assert!(matches!(err, DeskError::NotFound(_)), "{:?}", err);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_search_latest_returns_current_results() {
        let (url, _) = canned_server("200 OK", "[]", Duration::ZERO).await;
        let client = client_for(&url);
        let sequencer = SearchSequencer::new();
        let ticket = sequencer.issue();

        let flights = client.search_latest(&sfo_jfk(), &sequencer, ticket).await.unwrap();
        assert_eq!(flights, Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_search_latest_skips_superseded_ticket() {
        let (url, hits) = canned_server("200 OK", "[]", Duration::ZERO).await;
        let client = client_for(&url);
        let sequencer = SearchSequencer::new();
        let stale = sequencer.issue();
        let _current = sequencer.issue();

        let outcome = client.search_latest(&sfo_jfk(), &sequencer, stale).await.unwrap();
        assert!(outcome.is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_search_latest_drops_response_superseded_in_flight() {
        let (url, hits) = canned_server("200 OK", "not json", Duration::from_millis(300)).await;
        let client = client_for(&url);
        let sequencer = SearchSequencer::new();
        let ticket = sequencer.issue();

        let (outcome, _) = tokio::join!(client.search_latest(&sfo_jfk(), &sequencer, ticket), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            sequencer.issue()
        });
        // The body is never parsed, so the invalid JSON does not surface.
        assert!(outcome.unwrap().is_none());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_search_latest_drops_failure_superseded_in_flight() {
        let (url, _) = canned_server("503 Service Unavailable", "down", Duration::from_millis(300)).await;
        let client = client_for(&url);
        let sequencer = SearchSequencer::new();
        let ticket = sequencer.issue();

        let (outcome, _) = tokio::join!(client.search_latest(&sfo_jfk(), &sequencer, ticket), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            sequencer.issue()
        });
        assert!(outcome.unwrap().is_none());
    }
}
