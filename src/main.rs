use crate::catalog::{CatalogFetcher, CatalogSource};
use crate::config::AppConfig;
use crate::errors::StartupError;
use crate::filter::{FilterSession, FilterState};
use crate::map::{DebouncedSearch, MapLibrary, NominatimLookup};
use crate::router::{handle, AppState};
use crate::taxonomy::Taxonomy;
use astra::Server;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{error, info, warn};
use url::Url;

mod catalog;
mod config;
mod domain;
mod errors;
mod filter;
mod map;
mod responses;
mod router;
mod taxonomy;
mod telemetry;
mod templates;

#[cfg(test)]
mod tests;

fn main() {
    telemetry::init("info");

    // 1️⃣ Configuration: fatal if malformed
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!("❌ {e}");
            std::process::exit(1);
        }
    };

    // 2️⃣ Taxonomy, runtime, seed fetch and session
    let (runtime, app) = match start(&config) {
        Ok(started) => started,
        Err(e) => {
            error!("❌ Startup failed: {e}");
            std::process::exit(1);
        }
    };
    let app = Arc::new(app);

    // 3️⃣ Serve the filter view
    info!(addr = %config.server.bind, "Starting server");
    let server = Server::bind(&config.server.bind).max_workers(config.server.workers);

    let handler_app = app.clone();
    let result = server.serve(move |req, _info| match handle(req, &handler_app) {
        Ok(resp) => resp,
        Err(err) => responses::html_error_response(err),
    });

    if let Err(e) = result {
        error!("Server ended with error: {e}");
    }

    // 4️⃣ Tear the view down: disposes the map exactly once
    runtime.block_on(app.session.unmount());
    info!("Server shut down cleanly.");
}

fn start(config: &AppConfig) -> Result<(Runtime, AppState), StartupError> {
    let taxonomy = Arc::new(Taxonomy::builtin()?);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let app = runtime.block_on(bootstrap(config, taxonomy))?;
    Ok((runtime, app))
}

/// Seeds the view with one fetch of the initial selection (the
/// server-rendered data), then mounts the session on it.
async fn bootstrap(config: &AppConfig, taxonomy: Arc<Taxonomy>) -> Result<AppState, StartupError> {
    let fetcher = Arc::new(CatalogFetcher::new(&config.catalog)?);
    let initial = config.initial_selection(&taxonomy)?;

    let seed = fetcher.fetch(initial).await;
    if let Some(e) = &seed.error {
        warn!(error = %e, "Initial listings unavailable");
    }
    let state = FilterState::seeded(taxonomy, initial, seed)?;

    let session =
        FilterSession::start(state, fetcher, MapLibrary::shared(), &config.map).await?;

    let lookup = Arc::new(NominatimLookup::new(&config.geocode)?);
    let places = DebouncedSearch::spawn(lookup, Duration::from_millis(config.geocode.debounce_ms));

    let media_base_url = Url::parse(&config.server.media_base_url)
        .map_err(|e| StartupError::Config(config::ConfigError::Invalid(e.to_string())))?;

    Ok(AppState {
        session,
        places,
        runtime: tokio::runtime::Handle::current(),
        media_base_url,
        place_search_wait: Duration::from_millis(config.server.place_search_wait_ms),
    })
}
