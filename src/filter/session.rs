// src/filter/session.rs

use crate::catalog::{CatalogSource, FetchOutcome};
use crate::config::MapConfig;
use crate::domain::Property;
use crate::filter::state::{Applied, FetchTicket, FilterError, FilterState, LoadStatus, Phase};
use crate::map::{
    Lifecycle, LazyResource, MapError, MapLibrary, MapSynchronizer, Reconciled, SceneSnapshot,
    SceneSurface,
};
use crate::taxonomy::{Category, Selection, SubType, Taxonomy};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info};

const COMMAND_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error("filter view has been unmounted")]
    Closed,
}

/// What readers see: one consistent copy of selection, results and map.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub selection: Selection,
    pub phase: Phase,
    pub generation: u64,
    pub status: LoadStatus,
    pub error: Option<String>,
    pub results: Arc<Vec<Property>>,
    pub map: Option<SceneSnapshot>,
    pub mounted: bool,
}

impl ViewSnapshot {
    fn capture(state: &FilterState, map: &MapSynchronizer<SceneSurface>) -> Self {
        Self {
            selection: state.selected(),
            phase: state.phase(),
            generation: state.generation(),
            status: state.status().clone(),
            error: state.last_error().map(|e| e.to_string()),
            results: state.results().clone(),
            map: map.surface().map(SceneSurface::snapshot),
            mounted: map.lifecycle() == Lifecycle::Ready,
        }
    }

    pub fn marker_ids(&self) -> Vec<&str> {
        self.map
            .as_ref()
            .map(|m| m.markers.iter().map(|mk| mk.property_id.as_str()).collect())
            .unwrap_or_default()
    }
}

enum Command {
    SelectCategory(Category, oneshot::Sender<Result<(), FilterError>>),
    SelectSubtype(SubType, oneshot::Sender<Result<(), FilterError>>),
    Unmount(oneshot::Sender<()>),
}

/// The filter view's event loop. Sole writer of the filter state and sole
/// owner of the map; everything else talks to it through a [`SessionHandle`].
pub struct FilterSession<C: CatalogSource + 'static> {
    state: FilterState,
    map: MapSynchronizer<SceneSurface>,
    source: Arc<C>,
    fetched_tx: mpsc::UnboundedSender<(FetchTicket, FetchOutcome)>,
    fetched_rx: mpsc::UnboundedReceiver<(FetchTicket, FetchOutcome)>,
    snapshot_tx: watch::Sender<ViewSnapshot>,
}

impl<C: CatalogSource + 'static> FilterSession<C> {
    /// Mounts the map (loading the map library on first use), plots the
    /// seeded results and starts the loop. The seeded selection is not fetched.
    pub async fn start(
        state: FilterState,
        source: Arc<C>,
        library: &LazyResource<MapLibrary>,
        map_config: &MapConfig,
    ) -> Result<SessionHandle, MapError> {
        let library = library.get_or_load(|| MapLibrary::load(map_config)).await?;

        let mut map = MapSynchronizer::new(library.focus_zoom);
        map.mount(
            library.create_surface(),
            &library.tile_layer,
            library.default_view,
        )?;
        map.reconcile(state.results());

        let taxonomy = Arc::new(state.taxonomy().clone());
        let (snapshot_tx, snapshot_rx) = watch::channel(ViewSnapshot::capture(&state, &map));
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (fetched_tx, fetched_rx) = mpsc::unbounded_channel();

        info!(
            category = state.selected().category.as_str(),
            sub_type = state.selected().sub_type.as_str(),
            seeded = state.results().len(),
            "Filter view mounted"
        );

        let session = FilterSession {
            state,
            map,
            source,
            fetched_tx,
            fetched_rx,
            snapshot_tx,
        };
        tokio::spawn(session.run(command_rx));

        Ok(SessionHandle {
            commands: command_tx,
            snapshot: snapshot_rx,
            taxonomy,
        })
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::SelectCategory(category, reply)) => {
                        let result = self.state.select_category(category).map(|t| self.dispatch(t));
                        let _ = reply.send(result);
                    }
                    Some(Command::SelectSubtype(sub_type, reply)) => {
                        let result = self.state.select_subtype(sub_type).map(|t| self.dispatch(t));
                        let _ = reply.send(result);
                    }
                    Some(Command::Unmount(reply)) => {
                        self.unmount();
                        let _ = reply.send(());
                        return;
                    }
                    None => {
                        self.unmount();
                        return;
                    }
                },
                Some((ticket, outcome)) = self.fetched_rx.recv() => {
                    self.on_fetched(ticket, outcome);
                }
            }
        }
    }

    /// Issues the fetch for an accepted change. `None` means the selection
    /// did not change and nothing is fetched.
    fn dispatch(&mut self, ticket: Option<FetchTicket>) {
        if let Some(ticket) = ticket {
            debug!(
                category = ticket.selection.category.as_str(),
                sub_type = ticket.selection.sub_type.as_str(),
                generation = ticket.generation,
                "Fetch issued"
            );

            let source = self.source.clone();
            let done = self.fetched_tx.clone();
            tokio::spawn(async move {
                let outcome = source.fetch(ticket.selection).await;
                // The session may be gone; a dropped result is fine.
                let _ = done.send((ticket, outcome));
            });
        }
        self.publish();
    }

    fn on_fetched(&mut self, ticket: FetchTicket, outcome: FetchOutcome) {
        match self.state.apply(ticket, outcome) {
            Applied::Applied => {
                if let Reconciled::Skipped(reason) = self.map.reconcile(self.state.results()) {
                    debug!(?reason, "Results applied without a map");
                }
                self.publish();
            }
            Applied::Stale => {
                debug!(
                    generation = ticket.generation,
                    current = self.state.generation(),
                    "Discarding stale fetch result"
                );
            }
        }
    }

    fn unmount(&mut self) {
        self.map.dispose();
        self.publish();
        info!("Filter view unmounted");
    }

    fn publish(&self) {
        self.snapshot_tx
            .send_replace(ViewSnapshot::capture(&self.state, &self.map));
    }
}

/// Cheap, cloneable access to a running [`FilterSession`]. The async
/// methods are for tasks; the `_blocking` ones for server worker threads.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    snapshot: watch::Receiver<ViewSnapshot>,
    taxonomy: Arc<Taxonomy>,
}

impl SessionHandle {
    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn snapshot(&self) -> ViewSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewSnapshot> {
        self.snapshot.clone()
    }

    pub async fn select_category(&self, category: Category) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SelectCategory(category, reply)).await?;
        Ok(rx.await.map_err(|_| SessionError::Closed)??)
    }

    pub async fn select_subtype(&self, sub_type: SubType) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::SelectSubtype(sub_type, reply)).await?;
        Ok(rx.await.map_err(|_| SessionError::Closed)??)
    }

    pub async fn unmount(&self) {
        let (reply, rx) = oneshot::channel();
        if self.send(Command::Unmount(reply)).await.is_ok() {
            let _ = rx.await;
        }
    }

    pub fn select_category_blocking(&self, category: Category) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .blocking_send(Command::SelectCategory(category, reply))
            .map_err(|_| SessionError::Closed)?;
        Ok(rx.blocking_recv().map_err(|_| SessionError::Closed)??)
    }

    pub fn select_subtype_blocking(&self, sub_type: SubType) -> Result<(), SessionError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .blocking_send(Command::SelectSubtype(sub_type, reply))
            .map_err(|_| SessionError::Closed)?;
        Ok(rx.blocking_recv().map_err(|_| SessionError::Closed)??)
    }

    async fn send(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Closed)
    }
}
