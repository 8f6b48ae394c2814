//! Configuration loader.
//!
//! Uses Figment to merge built-in defaults + `config.toml` +
//! `config.<env>.toml` + `APP_*` env vars (nested keys split on `__`, e.g.
//! `APP_CATALOG__BASE_URL`).

use crate::taxonomy::{Category, Selection, SubType, Taxonomy};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] Box<figment::Error>),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub catalog: CatalogConfig,
    pub geocode: GeocodeConfig,
    pub map: MapConfig,
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub workers: usize,
    /// Storage service that resolves image file ids, e.g. `{media_base_url}/{file_id}`.
    pub media_base_url: String,
    /// How long `/api/places` waits for a debounced search to settle.
    pub place_search_wait_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub base_url: String,
    /// Opaque credential from the auth service, sent as a bearer token.
    pub bearer_token: Option<String>,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeConfig {
    pub base_url: String,
    pub user_agent: String,
    pub debounce_ms: u64,
    pub limit: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// (lat, lng) shown before any listing has been plotted.
    pub default_center: (f64, f64),
    pub default_zoom: u8,
    /// Zoom used when recentering on a listing.
    pub focus_zoom: u8,
    pub tile_url: String,
    pub attribution: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub initial_category: Category,
    pub initial_subtype: Option<SubType>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
                workers: 8,
                media_base_url: "http://127.0.0.1:8080/media/".to_string(),
                place_search_wait_ms: 3_000,
            },
            catalog: CatalogConfig::default(),
            geocode: GeocodeConfig::default(),
            map: MapConfig::default(),
            filter: FilterConfig {
                initial_category: Category::Residential,
                initial_subtype: None,
            },
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080/api/".to_string(),
            bearer_token: None,
            timeout_secs: 10,
            max_attempts: 2,
        }
    }
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org/".to_string(),
            user_agent: concat!("listing_filter/", env!("CARGO_PKG_VERSION")).to_string(),
            debounce_ms: 350,
            limit: 5,
            timeout_secs: 8,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            default_center: (-17.8252, 31.0335),
            default_zoom: 7,
            focus_zoom: 13,
            tile_url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
            attribution: "&copy; OpenStreetMap contributors".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then `config.toml`, then the `RUST_ENV` overlay, then `APP_*`.
    pub fn load() -> Result<Self, ConfigError> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: AppConfig = figment.extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));

        if self.server.workers == 0 {
            return invalid("server.workers must be at least 1");
        }
        if self.catalog.timeout_secs == 0 || self.geocode.timeout_secs == 0 {
            return invalid("timeouts must be positive");
        }
        if self.catalog.max_attempts == 0 {
            return invalid("catalog.max_attempts must be at least 1");
        }
        if self.server.place_search_wait_ms <= self.geocode.debounce_ms {
            return invalid("server.place_search_wait_ms must exceed geocode.debounce_ms");
        }
        if self.geocode.limit == 0 {
            return invalid("geocode.limit must be at least 1");
        }
        if self.map.default_zoom > 22 || self.map.focus_zoom > 22 {
            return invalid("map zoom levels must be within 0..=22");
        }
        let (lat, lng) = self.map.default_center;
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return invalid("map.default_center is not a valid (lat, lng)");
        }
        if let Some(sub_type) = self.filter.initial_subtype {
            if sub_type.category() != self.filter.initial_category {
                return Err(ConfigError::Invalid(format!(
                    "filter.initial_subtype {sub_type} does not belong to {}",
                    self.filter.initial_category
                )));
            }
        }
        Ok(())
    }

    /// Selection the view opens with.
    pub fn initial_selection(&self, taxonomy: &Taxonomy) -> Result<Selection, ConfigError> {
        let category = self.filter.initial_category;
        match self.filter.initial_subtype {
            Some(sub_type) if taxonomy.contains(category, sub_type) => Ok(Selection {
                category,
                sub_type,
            }),
            Some(sub_type) => Err(ConfigError::Invalid(format!(
                "filter.initial_subtype {sub_type} is not offered under {category}"
            ))),
            None => taxonomy.default_selection(category).ok_or_else(|| {
                ConfigError::Invalid(format!("category {category} is not registered"))
            }),
        }
    }
}
