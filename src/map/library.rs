// src/map/library.rs

use crate::config::MapConfig;
use crate::domain::LatLng;
use crate::map::scene::SceneSurface;
use crate::map::surface::{TileLayer, Viewport};
use crate::map::sync::MapError;
use std::future::Future;
use std::sync::{Arc, OnceLock};
use tokio::sync::OnceCell;
use tracing::info;

/// A heavyweight resource acquired on first use. Concurrent first callers
/// wait on the same initialization; the factory runs at most once unless it
/// fails, in which case the next caller retries.
pub struct LazyResource<T> {
    cell: OnceCell<Arc<T>>,
}

impl<T> Default for LazyResource<T> {
    fn default() -> Self {
        Self {
            cell: OnceCell::new(),
        }
    }
}

impl<T> LazyResource<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_load<F, Fut, E>(&self, load: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.cell
            .get_or_try_init(|| async move { load().await.map(Arc::new) })
            .await
            .cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.initialized()
    }
}

/// The map toolkit: tile source and viewport defaults, plus the factory for
/// surfaces. Loaded lazily the first time a view mounts.
#[derive(Debug, Clone, PartialEq)]
pub struct MapLibrary {
    pub tile_layer: TileLayer,
    pub default_view: Viewport,
    pub focus_zoom: u8,
}

impl MapLibrary {
    /// Process-wide handle; the library is loaded by the first view that mounts.
    pub fn shared() -> &'static LazyResource<MapLibrary> {
        static LIBRARY: OnceLock<LazyResource<MapLibrary>> = OnceLock::new();
        LIBRARY.get_or_init(LazyResource::new)
    }

    pub async fn load(config: &MapConfig) -> Result<Self, MapError> {
        if !config.tile_url.contains("{z}")
            || !config.tile_url.contains("{x}")
            || !config.tile_url.contains("{y}")
        {
            return Err(MapError::LibraryLoad(format!(
                "tile url {:?} lacks {{z}}/{{x}}/{{y}} placeholders",
                config.tile_url
            )));
        }

        let (lat, lng) = config.default_center;
        info!(tile_url = %config.tile_url, "Map library loaded");
        Ok(Self {
            tile_layer: TileLayer {
                url_template: config.tile_url.clone(),
                attribution: config.attribution.clone(),
            },
            default_view: Viewport {
                center: LatLng::new(lat, lng),
                zoom: config.default_zoom,
            },
            focus_zoom: config.focus_zoom,
        })
    }

    pub fn create_surface(&self) -> SceneSurface {
        SceneSurface::new(self.default_view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn concurrent_first_use_initializes_once() {
        let lazy: Arc<LazyResource<u32>> = Arc::new(LazyResource::new());
        let loads = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let lazy = lazy.clone();
            let loads = loads.clone();
            tasks.push(tokio::spawn(async move {
                lazy.get_or_load(|| async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok::<_, MapError>(7)
                })
                .await
            }));
        }

        for task in tasks {
            assert_eq!(*task.await.unwrap().unwrap(), 7);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(lazy.is_loaded());
    }

    #[tokio::test]
    async fn failed_load_is_retried() {
        let lazy: LazyResource<u32> = LazyResource::new();

        let err = lazy
            .get_or_load(|| async { Err::<u32, _>(MapError::LibraryLoad("offline".into())) })
            .await;
        assert!(err.is_err());
        assert!(!lazy.is_loaded());

        let ok = lazy.get_or_load(|| async { Ok::<_, MapError>(3) }).await;
        assert_eq!(*ok.unwrap(), 3);
    }

    #[tokio::test]
    async fn library_rejects_tile_url_without_placeholders() {
        let config = MapConfig {
            tile_url: "https://tiles.example/static.png".into(),
            ..MapConfig::default()
        };
        assert!(matches!(
            MapLibrary::load(&config).await,
            Err(MapError::LibraryLoad(_))
        ));

        let library = MapLibrary::load(&MapConfig::default()).await.unwrap();
        let surface = library.create_surface();
        assert_eq!(surface.view(), library.default_view);
        assert_eq!(surface.base_layer_count(), 0);
    }

    #[tokio::test]
    async fn shared_library_outlives_its_first_user() {
        let first = MapLibrary::shared();
        let config = MapConfig::default();
        first
            .get_or_load(|| MapLibrary::load(&config))
            .await
            .unwrap();

        let second = MapLibrary::shared();
        assert!(std::ptr::eq(first, second));
        assert!(second.is_loaded());
    }
}
