use thiserror::Error;

/// Why a catalog fetch produced no listings. Carried as data next to the
/// (empty) result set, never raised past the fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Request timed out")]
    Timeout,
    #[error("Catalog returned HTTP {0}")]
    Status(u16),
    #[error("JSON parse error: {0}")]
    JsonParse(String),
    #[error("Unexpected data shape: {0}")]
    UnexpectedShape(String),
    #[error("Invalid catalog URL: {0}")]
    InvalidUrl(String),
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl FetchError {
    /// Message shown in the error panel.
    pub fn user_message(&self) -> &'static str {
        match self {
            FetchError::Network(_) | FetchError::Timeout => {
                "We couldn't reach the listings service. Check your connection and try again."
            }
            FetchError::Status(_) => "The listings service is having trouble right now.",
            FetchError::JsonParse(_) | FetchError::UnexpectedShape(_) => {
                "The listings service sent a response we couldn't read."
            }
            FetchError::InvalidUrl(_) | FetchError::Client(_) => {
                "Listings are unavailable due to a configuration problem."
            }
        }
    }

    /// Only transport failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Network(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else if e.is_builder() {
            FetchError::Client(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}
