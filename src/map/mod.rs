pub mod geocode;
pub mod library;
pub mod scene;
pub mod surface;
pub mod sync;

pub use geocode::{DebouncedSearch, NominatimLookup, PlaceCandidate, PlaceLookup, PlaceResults};
pub use library::{LazyResource, MapLibrary};
pub use scene::{SceneSnapshot, SceneSurface};
pub use surface::{MapSurface, Popup, TileLayer, Viewport};
pub use sync::{Lifecycle, MapError, MapSynchronizer, Reconciled};
