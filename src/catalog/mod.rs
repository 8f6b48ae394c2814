mod catalog_error;
mod fetcher;
pub mod ids;
mod models;
pub mod normalize;

pub use catalog_error::FetchError;
pub use fetcher::{CatalogFetcher, CatalogSource, FetchOutcome};
