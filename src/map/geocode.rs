// src/map/geocode.rs

use crate::catalog::normalize::number;
use crate::config::GeocodeConfig;
use crate::domain::LatLng;
use crate::map::library::LazyResource;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    #[error("Geocoding request failed: {0}")]
    Network(String),
    #[error("Geocoding service returned HTTP {0}")]
    Status(u16),
    #[error("Unreadable geocoding response: {0}")]
    Parse(String),
    #[error("Invalid geocoding URL: {0}")]
    InvalidUrl(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceCandidate {
    pub lat: f64,
    pub lng: f64,
    pub label: String,
}

impl PlaceCandidate {
    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }
}

/// Free-text place search.
#[async_trait]
pub trait PlaceLookup: Send + Sync {
    async fn lookup(&self, query: &str) -> Result<Vec<PlaceCandidate>, GeocodeError>;
}

/// Nominatim-compatible `/search?format=json` client. The HTTP client is
/// built on the first search, not at startup.
pub struct NominatimLookup {
    client: LazyResource<Client>,
    search_url: Url,
    user_agent: String,
    limit: usize,
    timeout: Duration,
}

impl NominatimLookup {
    pub fn new(config: &GeocodeConfig) -> Result<Self, GeocodeError> {
        let base =
            Url::parse(&config.base_url).map_err(|e| GeocodeError::InvalidUrl(e.to_string()))?;
        let search_url = base
            .join("search")
            .map_err(|e| GeocodeError::InvalidUrl(e.to_string()))?;

        Ok(Self {
            client: LazyResource::new(),
            search_url,
            user_agent: config.user_agent.clone(),
            limit: config.limit,
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    pub fn request_url(&self, query: &str) -> Url {
        let mut url = self.search_url.clone();
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("q", query)
            .append_pair("limit", &self.limit.to_string());
        url
    }

    async fn client(&self) -> Result<Arc<Client>, GeocodeError> {
        let user_agent = self.user_agent.clone();
        let timeout = self.timeout;
        self.client
            .get_or_load(|| async move {
                Client::builder()
                    .user_agent(user_agent)
                    .timeout(timeout)
                    .build()
                    .map_err(|e| GeocodeError::Network(e.to_string()))
            })
            .await
    }
}

#[async_trait]
impl PlaceLookup for NominatimLookup {
    async fn lookup(&self, query: &str) -> Result<Vec<PlaceCandidate>, GeocodeError> {
        let client = self.client().await?;

        let resp = client
            .get(self.request_url(query))
            .send()
            .await
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| GeocodeError::Network(e.to_string()))?;
        parse_candidates(&body)
    }
}

/// `[{display_name, lat, lon}]`, with lat/lon as strings or numbers.
/// Entries without a usable position are dropped.
pub fn parse_candidates(body: &[u8]) -> Result<Vec<PlaceCandidate>, GeocodeError> {
    let data: Value =
        serde_json::from_slice(body).map_err(|e| GeocodeError::Parse(e.to_string()))?;
    let entries = data
        .as_array()
        .ok_or_else(|| GeocodeError::Parse("expected an array".into()))?;

    Ok(entries
        .iter()
        .filter_map(|entry| {
            let lat = entry.get("lat").and_then(number)?;
            let lng = entry.get("lon").and_then(number)?;
            let position = LatLng::new(lat, lng);
            if !position.is_mappable() {
                return None;
            }
            let label = entry
                .get("display_name")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or("Unnamed place")
                .to_string();
            Some(PlaceCandidate { lat, lng, label })
        })
        .collect())
}

/// Candidates for the most recently settled query.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlaceResults {
    pub query: String,
    pub candidates: Vec<PlaceCandidate>,
}

/// Collapses bursts of keystrokes into one lookup: a query is looked up only
/// once no newer query has arrived for `idle`. Lookup failures and blank
/// queries settle as empty results.
pub struct DebouncedSearch {
    tx: mpsc::UnboundedSender<String>,
    results: watch::Receiver<PlaceResults>,
}

impl DebouncedSearch {
    pub fn spawn<L>(lookup: Arc<L>, idle: Duration) -> Self
    where
        L: PlaceLookup + ?Sized + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let (results_tx, results) = watch::channel(PlaceResults::default());

        tokio::spawn(async move {
            while let Some(mut query) = rx.recv().await {
                loop {
                    match tokio::time::timeout(idle, rx.recv()).await {
                        Ok(Some(newer)) => query = newer,
                        Ok(None) => return,
                        Err(_) => break,
                    }
                }

                let query = query.trim().to_string();
                let candidates = if query.is_empty() {
                    Vec::new()
                } else {
                    match lookup.lookup(&query).await {
                        Ok(candidates) => {
                            debug!(%query, found = candidates.len(), "Place search settled");
                            candidates
                        }
                        Err(e) => {
                            warn!(%query, error = %e, "Place search failed");
                            Vec::new()
                        }
                    }
                };

                if results_tx.send(PlaceResults { query, candidates }).is_err() {
                    return;
                }
            }
        });

        Self { tx, results }
    }

    /// Queue a keystroke's worth of query text.
    pub fn submit(&self, query: &str) {
        let _ = self.tx.send(query.to_string());
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaceResults> {
        self.results.clone()
    }

    /// Submits `query` and waits up to `wait` for it to settle. A query that
    /// is superseded or times out yields no candidates.
    pub async fn search(&self, query: &str, wait: Duration) -> PlaceResults {
        let wanted = query.trim().to_string();
        let mut rx = self.subscribe();
        rx.borrow_and_update();
        self.submit(query);

        let settled = tokio::time::timeout(wait, async {
            loop {
                if rx.changed().await.is_err() {
                    return None;
                }
                let current = rx.borrow_and_update();
                if current.query == wanted {
                    return Some(current.clone());
                }
            }
        })
        .await;

        settled.ok().flatten().unwrap_or(PlaceResults {
            query: wanted,
            candidates: Vec::new(),
        })
    }
}
