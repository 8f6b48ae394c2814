// errors.rs
use crate::catalog::FetchError;
use crate::config::ConfigError;
use crate::filter::session::SessionError;
use crate::filter::FilterError;
use crate::map::geocode::GeocodeError;
use crate::map::MapError;
use crate::taxonomy::TaxonomyError;
use thiserror::Error;

/// Errors surfaced by route handlers. Each maps to one HTTP status.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Not Found")]
    NotFound,
    #[error("Bad Request: {0}")]
    BadRequest(String),
    #[error("Service Unavailable: {0}")]
    Unavailable(String),
    #[error("Internal Server Error")]
    InternalError,
}

impl ServerError {
    pub fn status(&self) -> u16 {
        match self {
            ServerError::NotFound => 404,
            ServerError::BadRequest(_) => 400,
            ServerError::Unavailable(_) => 503,
            ServerError::InternalError => 500,
        }
    }
}

impl From<SessionError> for ServerError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Filter(f @ FilterError::SubtypeOutsideCategory { .. }) => {
                ServerError::BadRequest(f.to_string())
            }
            SessionError::Filter(FilterError::UnknownCategory(_)) => ServerError::NotFound,
            SessionError::Closed => ServerError::Unavailable(e.to_string()),
        }
    }
}

/// Anything that stops the service from starting.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Malformed taxonomy: {0}")]
    Taxonomy(#[from] TaxonomyError),
    #[error("Catalog client: {0}")]
    Catalog(#[from] FetchError),
    #[error("Geocoder: {0}")]
    Geocode(#[from] GeocodeError),
    #[error("Map: {0}")]
    Map(#[from] MapError),
    #[error("Filter: {0}")]
    Filter(#[from] FilterError),
    #[error("Runtime: {0}")]
    Runtime(#[from] std::io::Error),
}
