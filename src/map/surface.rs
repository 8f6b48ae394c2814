use crate::domain::{LatLng, Property};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    pub center: LatLng,
    pub zoom: u8,
}

/// Base raster layer, attached once per surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TileLayer {
    pub url_template: String,
    pub attribution: String,
}

/// Popup content, bound when a marker is created and rebound whenever it
/// moves or the listing's title/price change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Popup {
    pub title: String,
    pub price_label: String,
}

impl Popup {
    pub fn for_property(property: &Property) -> Self {
        Self {
            title: property.title.clone(),
            price_label: property.price_label(),
        }
    }
}

/// A stateful map object: created once, mutated in place, released once.
///
/// Only the [`MapSynchronizer`](super::MapSynchronizer) calls these.
pub trait MapSurface {
    type Marker;

    fn attach_base_layer(&mut self, layer: &TileLayer);

    /// `key` is the listing id, for surfaces that want to expose it.
    fn add_marker(&mut self, key: &str, at: LatLng, popup: &Popup) -> Self::Marker;

    fn move_marker(&mut self, marker: &Self::Marker, at: LatLng);

    fn bind_popup(&mut self, marker: &Self::Marker, popup: &Popup);

    fn remove_marker(&mut self, marker: Self::Marker);

    fn set_view(&mut self, view: Viewport);

    /// Frees the underlying map. No calls follow.
    fn release(&mut self);
}
