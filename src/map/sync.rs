// src/map/sync.rs

use crate::domain::{LatLng, Property};
use crate::map::surface::{MapSurface, Popup, TileLayer, Viewport};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    #[error("map surface already exists for this view")]
    AlreadyMounted,
    #[error("map surface has been disposed")]
    Disposed,
    #[error("map library failed to load: {0}")]
    LibraryLoad(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Uninitialized,
    Ready,
    Disposed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotMounted,
    Disposed,
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub added: usize,
    pub moved: usize,
    /// Popups rebound without a move (title or price changed).
    pub refreshed: usize,
    pub removed: usize,
    pub unchanged: usize,
    pub recentered: Option<LatLng>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reconciled {
    Done(ReconcileReport),
    Skipped(SkipReason),
}

struct MarkerEntry<M> {
    handle: M,
    position: LatLng,
    popup: Popup,
}

enum SyncState<S: MapSurface> {
    Uninitialized,
    Ready {
        surface: S,
        markers: HashMap<String, MarkerEntry<S::Marker>>,
    },
    Disposed,
}

/// Keeps one map surface's markers in lockstep with the current result set.
///
/// Owns the surface exclusively: `Uninitialized -> Ready -> Disposed`, with
/// no way back. Reconciling after disposal is a silent no-op, so a late
/// fetch response cannot resurrect markers.
pub struct MapSynchronizer<S: MapSurface> {
    state: SyncState<S>,
    focus_zoom: u8,
}

impl<S: MapSurface> MapSynchronizer<S> {
    pub fn new(focus_zoom: u8) -> Self {
        Self {
            state: SyncState::Uninitialized,
            focus_zoom,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match self.state {
            SyncState::Uninitialized => Lifecycle::Uninitialized,
            SyncState::Ready { .. } => Lifecycle::Ready,
            SyncState::Disposed => Lifecycle::Disposed,
        }
    }

    /// Takes ownership of a freshly created surface, attaches the base layer
    /// and sets the default view. Allowed exactly once.
    pub fn mount(&mut self, mut surface: S, layer: &TileLayer, view: Viewport) -> Result<(), MapError> {
        match self.state {
            SyncState::Uninitialized => {}
            SyncState::Ready { .. } => return Err(MapError::AlreadyMounted),
            SyncState::Disposed => return Err(MapError::Disposed),
        }

        surface.attach_base_layer(layer);
        surface.set_view(view);
        self.state = SyncState::Ready {
            surface,
            markers: HashMap::new(),
        };
        info!(zoom = view.zoom, "Map surface mounted");
        Ok(())
    }

    pub fn surface(&self) -> Option<&S> {
        match &self.state {
            SyncState::Ready { surface, .. } => Some(surface),
            _ => None,
        }
    }

    /// Ids that currently have a marker.
    pub fn marker_ids(&self) -> HashSet<&str> {
        match &self.state {
            SyncState::Ready { markers, .. } => markers.keys().map(String::as_str).collect(),
            _ => HashSet::new(),
        }
    }

    /// Brings markers and viewport in line with `results`.
    ///
    /// Afterwards the marker ids equal the ids of mappable listings in
    /// `results`. Listings at the (0, 0) sentinel get no marker and never
    /// drive the viewport; when none are mappable the view is left alone.
    pub fn reconcile(&mut self, results: &[Property]) -> Reconciled {
        let focus_zoom = self.focus_zoom;
        let (surface, markers) = match &mut self.state {
            SyncState::Ready { surface, markers } => (surface, markers),
            SyncState::Uninitialized => {
                debug!("Reconcile skipped: map not mounted");
                return Reconciled::Skipped(SkipReason::NotMounted);
            }
            SyncState::Disposed => {
                debug!("Reconcile skipped: map disposed");
                return Reconciled::Skipped(SkipReason::Disposed);
            }
        };

        let mut report = ReconcileReport::default();
        let mappable: Vec<&Property> = results.iter().filter(|p| p.is_mappable()).collect();
        let wanted: HashSet<&str> = mappable.iter().map(|p| p.id.as_str()).collect();

        // 1. Drop markers whose listing is gone or became unmappable.
        let stale: Vec<String> = markers
            .keys()
            .filter(|id| !wanted.contains(id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            if let Some(entry) = markers.remove(&id) {
                surface.remove_marker(entry.handle);
                report.removed += 1;
            }
        }

        // 2. Create or reposition.
        for property in &mappable {
            let popup = Popup::for_property(property);
            match markers.get_mut(&property.id) {
                Some(entry) => {
                    let moved = entry.position != property.coordinates;
                    if moved {
                        surface.move_marker(&entry.handle, property.coordinates);
                        entry.position = property.coordinates;
                        report.moved += 1;
                    }
                    if moved || entry.popup != popup {
                        surface.bind_popup(&entry.handle, &popup);
                        entry.popup = popup;
                        if !moved {
                            report.refreshed += 1;
                        }
                    } else {
                        report.unchanged += 1;
                    }
                }
                None => {
                    let handle = surface.add_marker(&property.id, property.coordinates, &popup);
                    markers.insert(
                        property.id.clone(),
                        MarkerEntry {
                            handle,
                            position: property.coordinates,
                            popup,
                        },
                    );
                    report.added += 1;
                }
            }
        }

        // 3. Recenter on the first mappable listing.
        if let Some(first) = mappable.first() {
            surface.set_view(Viewport {
                center: first.coordinates,
                zoom: focus_zoom,
            });
            report.recentered = Some(first.coordinates);
        }

        debug!(
            added = report.added,
            moved = report.moved,
            refreshed = report.refreshed,
            removed = report.removed,
            unchanged = report.unchanged,
            "Markers reconciled"
        );
        Reconciled::Done(report)
    }

    /// Removes every marker and releases the surface. Returns the released
    /// surface the first time, `None` on repeat calls or if never mounted.
    pub fn dispose(&mut self) -> Option<S> {
        match std::mem::replace(&mut self.state, SyncState::Disposed) {
            SyncState::Ready {
                mut surface,
                mut markers,
            } => {
                let count = markers.len();
                for (_, entry) in markers.drain() {
                    surface.remove_marker(entry.handle);
                }
                surface.release();
                info!(markers = count, "Map surface disposed");
                Some(surface)
            }
            _ => None,
        }
    }
}

impl<S: MapSurface> Drop for MapSynchronizer<S> {
    fn drop(&mut self) {
        let _ = self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PropertyImages;
    use crate::map::scene::SceneSurface;
    use crate::taxonomy::SubType;

    fn layer() -> TileLayer {
        TileLayer {
            url_template: "https://tiles.example/{z}/{x}/{y}.png".into(),
            attribution: "test".into(),
        }
    }

    fn home() -> Viewport {
        Viewport {
            center: LatLng::new(-17.8252, 31.0335),
            zoom: 7,
        }
    }

    fn listing(id: &str, title: &str, lat: f64, lng: f64) -> Property {
        Property {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            price: Some(100.0),
            location: String::new(),
            rooms: None,
            coordinates: LatLng::new(lat, lng),
            category: SubType::OneRoom.category(),
            sub_type: SubType::OneRoom,
            status: "unknown".into(),
            images: PropertyImages::default(),
        }
    }

    fn mounted() -> MapSynchronizer<SceneSurface> {
        let mut sync = MapSynchronizer::new(13);
        sync.mount(SceneSurface::new(home()), &layer(), home()).unwrap();
        sync
    }

    fn ids(sync: &MapSynchronizer<SceneSurface>) -> Vec<String> {
        let mut ids: Vec<String> = sync.marker_ids().into_iter().map(String::from).collect();
        ids.sort();
        ids
    }

    #[test]
    fn sentinel_listing_gets_no_marker_and_no_recenter() {
        let mut sync = mounted();
        let results = vec![
            listing("b", "Room B", 0.0, 0.0),
            listing("a", "Room A", -17.8, 31.0),
        ];

        let Reconciled::Done(report) = sync.reconcile(&results) else {
            panic!("expected reconciliation");
        };
        assert_eq!(ids(&sync), vec!["a"]);
        assert_eq!(report.recentered, Some(LatLng::new(-17.8, 31.0)));
        assert_eq!(sync.surface().unwrap().view().center, LatLng::new(-17.8, 31.0));
        assert_eq!(sync.surface().unwrap().view().zoom, 13);
    }

    #[test]
    fn viewport_unchanged_when_nothing_is_mappable() {
        let mut sync = mounted();
        sync.reconcile(&[listing("a", "A", 10.0, 10.0)]);
        let before = sync.surface().unwrap().view();

        sync.reconcile(&[listing("b", "B", 0.0, 0.0)]);
        assert_eq!(sync.surface().unwrap().view(), before);
        assert!(sync.marker_ids().is_empty());
    }

    #[test]
    fn markers_track_results_without_recreating_survivors() {
        let mut sync = mounted();
        sync.reconcile(&[
            listing("a", "A", 1.0, 1.0),
            listing("b", "B", 2.0, 2.0),
            listing("c", "C", 3.0, 3.0),
        ]);

        let Reconciled::Done(report) = sync.reconcile(&[
            listing("a", "A", 1.0, 1.0),
            listing("c", "C", 3.5, 3.0),
            listing("d", "D", 4.0, 4.0),
        ]) else {
            panic!("expected reconciliation");
        };

        assert_eq!(ids(&sync), vec!["a", "c", "d"]);
        assert_eq!(report.added, 1);
        assert_eq!(report.removed, 1);
        assert_eq!(report.moved, 1);
        assert_eq!(report.unchanged, 1);
        assert_eq!(sync.surface().unwrap().marker_count(), 3);
    }

    #[test]
    fn moved_or_retitled_markers_get_fresh_popups() {
        let mut sync = mounted();
        sync.reconcile(&[listing("a", "Old title", 1.0, 1.0)]);

        let Reconciled::Done(report) = sync.reconcile(&[listing("a", "New title", 1.0, 1.0)]) else {
            panic!("expected reconciliation");
        };
        assert_eq!(report.refreshed, 1);

        sync.reconcile(&[listing("a", "Moved", 2.0, 2.0)]);
        let snapshot = sync.surface().unwrap().snapshot();
        assert_eq!(snapshot.markers[0].popup.title, "Moved");
        assert_eq!(snapshot.markers[0].position, LatLng::new(2.0, 2.0));
    }

    #[test]
    fn listing_that_loses_its_coordinates_loses_its_marker() {
        let mut sync = mounted();
        sync.reconcile(&[listing("a", "A", 1.0, 1.0)]);
        sync.reconcile(&[listing("a", "A", 0.0, 0.0)]);
        assert!(sync.marker_ids().is_empty());
    }

    #[test]
    fn mount_is_exclusive() {
        let mut sync = mounted();
        assert_eq!(
            sync.mount(SceneSurface::new(home()), &layer(), home()),
            Err(MapError::AlreadyMounted)
        );
        assert_eq!(sync.surface().unwrap().base_layer_count(), 1);

        sync.dispose();
        assert_eq!(
            sync.mount(SceneSurface::new(home()), &layer(), home()),
            Err(MapError::Disposed)
        );
    }

    #[test]
    fn reconcile_before_mount_is_skipped() {
        let mut sync: MapSynchronizer<SceneSurface> = MapSynchronizer::new(13);
        assert_eq!(
            sync.reconcile(&[listing("a", "A", 1.0, 1.0)]),
            Reconciled::Skipped(SkipReason::NotMounted)
        );
    }

    #[test]
    fn disposal_releases_everything_and_blocks_later_reconciles() {
        let mut sync = mounted();
        sync.reconcile(&[listing("a", "A", 1.0, 1.0), listing("b", "B", 2.0, 2.0)]);

        let surface = sync.dispose().unwrap();
        assert!(surface.is_released());
        assert_eq!(surface.marker_count(), 0);
        assert_eq!(sync.lifecycle(), Lifecycle::Disposed);

        assert_eq!(
            sync.reconcile(&[listing("c", "C", 3.0, 3.0)]),
            Reconciled::Skipped(SkipReason::Disposed)
        );
        assert!(sync.marker_ids().is_empty());
        assert!(sync.dispose().is_none());
    }
}
