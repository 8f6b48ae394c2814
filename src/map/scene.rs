// src/map/scene.rs

use crate::domain::LatLng;
use crate::map::surface::{MapSurface, Popup, TileLayer, Viewport};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SURFACE: AtomicU64 = AtomicU64::new(1);

/// Handle to a marker on a [`SceneSurface`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SceneMarker(u64);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerView {
    pub property_id: String,
    pub position: LatLng,
    pub popup: Popup,
}

/// Immutable copy of a scene, handed to readers (and serialized to the
/// browser, which mirrors it onto Leaflet).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneSnapshot {
    /// Identity of the surface; stays the same for the life of a mount.
    pub surface: u64,
    /// Mutation count. The browser skips snapshots it has already applied.
    pub revision: u64,
    pub view: Viewport,
    pub base_layer: Option<TileLayer>,
    pub base_layers: usize,
    pub markers: Vec<MarkerView>,
}

/// Server-side map model. Counts every mutation so callers can verify that
/// the surface is updated in place.
#[derive(Debug)]
pub struct SceneSurface {
    id: u64,
    view: Viewport,
    base_layers: Vec<TileLayer>,
    markers: BTreeMap<u64, MarkerView>,
    next_marker: u64,
    released: bool,
    mutations: u64,
}

impl SceneSurface {
    pub fn new(view: Viewport) -> Self {
        Self {
            id: NEXT_SURFACE.fetch_add(1, Ordering::Relaxed),
            view,
            base_layers: Vec::new(),
            markers: BTreeMap::new(),
            next_marker: 1,
            released: false,
            mutations: 0,
        }
    }

    pub fn view(&self) -> Viewport {
        self.view
    }

    pub fn base_layer_count(&self) -> usize {
        self.base_layers.len()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn mutations(&self) -> u64 {
        self.mutations
    }

    pub fn snapshot(&self) -> SceneSnapshot {
        let mut markers: Vec<MarkerView> = self.markers.values().cloned().collect();
        markers.sort_by(|a, b| a.property_id.cmp(&b.property_id));
        SceneSnapshot {
            surface: self.id,
            revision: self.mutations(),
            view: self.view,
            base_layer: self.base_layers.first().cloned(),
            base_layers: self.base_layer_count(),
            markers,
        }
    }

    fn touch(&mut self) {
        debug_assert!(!self.released, "scene used after release");
        self.mutations += 1;
    }
}

impl MapSurface for SceneSurface {
    type Marker = SceneMarker;

    fn attach_base_layer(&mut self, layer: &TileLayer) {
        self.touch();
        self.base_layers.push(layer.clone());
    }

    fn add_marker(&mut self, key: &str, at: LatLng, popup: &Popup) -> SceneMarker {
        self.touch();
        let id = self.next_marker;
        self.next_marker += 1;
        self.markers.insert(
            id,
            MarkerView {
                property_id: key.to_string(),
                position: at,
                popup: popup.clone(),
            },
        );
        SceneMarker(id)
    }

    fn move_marker(&mut self, marker: &SceneMarker, at: LatLng) {
        self.touch();
        if let Some(m) = self.markers.get_mut(&marker.0) {
            m.position = at;
        }
    }

    fn bind_popup(&mut self, marker: &SceneMarker, popup: &Popup) {
        self.touch();
        if let Some(m) = self.markers.get_mut(&marker.0) {
            m.popup = popup.clone();
        }
    }

    fn remove_marker(&mut self, marker: SceneMarker) {
        self.touch();
        self.markers.remove(&marker.0);
    }

    fn set_view(&mut self, view: Viewport) {
        self.touch();
        self.view = view;
    }

    fn release(&mut self) {
        self.markers.clear();
        self.base_layers.clear();
        self.released = true;
    }
}
