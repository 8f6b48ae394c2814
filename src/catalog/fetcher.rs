// fetcher.rs
use crate::catalog::normalize::normalize_batch;
use crate::catalog::FetchError;
use crate::config::CatalogConfig;
use crate::domain::Property;
use crate::taxonomy::Selection;
use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

const USER_AGENT: &str = concat!("listing_filter/", env!("CARGO_PKG_VERSION"));

/// Result of one fetch. A failure is an empty set plus an error, which the
/// view distinguishes from "zero results, no error".
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub properties: Vec<Property>,
    pub error: Option<FetchError>,
}

impl FetchOutcome {
    pub fn loaded(properties: Vec<Property>) -> Self {
        Self {
            properties,
            error: None,
        }
    }

    pub fn failed(error: FetchError) -> Self {
        Self {
            properties: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Anything that can resolve a selection to listings. Implementations must
/// turn every failure into a [`FetchOutcome`] rather than panic.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn fetch(&self, selection: Selection) -> FetchOutcome;
}

/// HTTP catalog client for `GET /properties/type/{category}/{subType}`.
pub struct CatalogFetcher {
    client: Client,
    base_url: Url,
    bearer_token: Option<String>,
    max_attempts: u32,
}

impl CatalogFetcher {
    pub fn new(config: &CatalogConfig) -> Result<Self, FetchError> {
        let base_url =
            Url::parse(&config.base_url).map_err(|e| FetchError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(FetchError::InvalidUrl(config.base_url.clone()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url,
            bearer_token: config.bearer_token.clone().filter(|t| !t.is_empty()),
            max_attempts: config.max_attempts.max(1),
        })
    }

    /// One selection maps to exactly one URL.
    pub fn endpoint(&self, selection: Selection) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend([
                "properties",
                "type",
                selection.category.as_str(),
                selection.sub_type.as_str(),
            ]);
        Ok(url)
    }

    /// Raw JSON records for a selection, retrying transport failures with
    /// jittered backoff. HTTP and parse failures are returned immediately.
    pub async fn fetch_records(&self, selection: Selection) -> Result<Vec<Value>, FetchError> {
        let url = self.endpoint(selection)?;
        let mut last_err = None;

        for attempt in 1..=self.max_attempts {
            let start = Instant::now();

            match self.try_fetch_records(&url).await {
                Ok(records) => {
                    debug!(
                        %url,
                        attempt,
                        records = records.len(),
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Catalog fetch succeeded"
                    );
                    return Ok(records);
                }
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    warn!(%url, attempt, error = %e, "Catalog fetch attempt failed, retrying");
                    last_err = Some(e);
                    tokio::time::sleep(backoff(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| FetchError::Network("retry loop exhausted".into())))
    }

    async fn try_fetch_records(&self, url: &Url) -> Result<Vec<Value>, FetchError> {
        let mut request = self.client.get(url.clone());
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let bytes = resp.bytes().await?;
        parse_records(&bytes)
    }
}

#[async_trait]
impl CatalogSource for CatalogFetcher {
    async fn fetch(&self, selection: Selection) -> FetchOutcome {
        match self.fetch_records(selection).await {
            Ok(records) => {
                let properties = normalize_batch(&records, selection);
                info!(
                    category = selection.category.as_str(),
                    sub_type = selection.sub_type.as_str(),
                    received = records.len(),
                    kept = properties.len(),
                    "Catalog fetched"
                );
                FetchOutcome::loaded(properties)
            }
            Err(e) => {
                warn!(
                    category = selection.category.as_str(),
                    sub_type = selection.sub_type.as_str(),
                    error = %e,
                    "Catalog fetch failed"
                );
                FetchOutcome::failed(e)
            }
        }
    }
}

/// Body must be a JSON array.
pub fn parse_records(body: &[u8]) -> Result<Vec<Value>, FetchError> {
    let data: Value =
        serde_json::from_slice(body).map_err(|e| FetchError::JsonParse(e.to_string()))?;

    match data {
        Value::Array(records) => Ok(records),
        other => Err(FetchError::UnexpectedShape(format!(
            "expected an array, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn backoff(attempt: u32) -> Duration {
    const BASE_MS: u64 = 250;
    const MAX_BACKOFF_MS: u64 = 2_000;
    const JITTER_MAX_MS: u64 = 250;

    let base = std::cmp::min(BASE_MS * u64::from(attempt), MAX_BACKOFF_MS);
    let jitter = rand::thread_rng().gen_range(0..=JITTER_MAX_MS);
    Duration::from_millis(base + jitter)
}
