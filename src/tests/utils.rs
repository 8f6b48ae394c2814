use crate::catalog::normalize::normalize_batch;
use crate::catalog::{CatalogSource, FetchError, FetchOutcome};
use crate::config::MapConfig;
use crate::domain::Property;
use crate::filter::{FilterSession, FilterState, SessionHandle, ViewSnapshot};
use crate::map::LazyResource;
use crate::taxonomy::{Selection, SubType, Taxonomy};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

/// Catalog stand-in: each subtype answers after its own delay.
#[derive(Default)]
pub struct ScriptedSource {
    replies: Mutex<HashMap<SubType, (Duration, Result<Vec<Value>, FetchError>)>>,
    pub calls: Mutex<Vec<Selection>>,
}

impl ScriptedSource {
    pub fn reply(self, sub_type: SubType, delay_ms: u64, records: Vec<Value>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(sub_type, (Duration::from_millis(delay_ms), Ok(records)));
        self
    }

    pub fn fail(self, sub_type: SubType, delay_ms: u64, error: FetchError) -> Self {
        self.replies
            .lock()
            .unwrap()
            .insert(sub_type, (Duration::from_millis(delay_ms), Err(error)));
        self
    }

    pub fn calls(&self) -> Vec<Selection> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogSource for ScriptedSource {
    async fn fetch(&self, selection: Selection) -> FetchOutcome {
        self.calls.lock().unwrap().push(selection);
        let reply = self.replies.lock().unwrap().get(&selection.sub_type).cloned();

        match reply {
            Some((delay, Ok(records))) => {
                tokio::time::sleep(delay).await;
                FetchOutcome::loaded(normalize_batch(&records, selection))
            }
            Some((delay, Err(e))) => {
                tokio::time::sleep(delay).await;
                FetchOutcome::failed(e)
            }
            None => FetchOutcome::loaded(Vec::new()),
        }
    }
}

pub fn taxonomy() -> Arc<Taxonomy> {
    Arc::new(Taxonomy::builtin().unwrap())
}

/// Raw catalog record with a server id.
pub fn record(id: &str, title: &str, lat: f64, lng: f64) -> Value {
    serde_json::json!({
        "_id": id,
        "title": title,
        "price": 450,
        "location": "Harare",
        "lat": lat,
        "lng": lng,
        "status": "Available",
    })
}

pub fn listings(selection: Selection, records: &[Value]) -> Vec<Property> {
    normalize_batch(records, selection)
}

pub async fn start_session(
    source: Arc<ScriptedSource>,
    seed: Selection,
    seeded: Vec<Property>,
) -> SessionHandle {
    start_seeded(source, seed, FetchOutcome::loaded(seeded)).await
}

/// Like [`start_session`], but with whatever the initial fetch produced.
pub async fn start_seeded(
    source: Arc<ScriptedSource>,
    seed: Selection,
    outcome: FetchOutcome,
) -> SessionHandle {
    let state = FilterState::seeded(taxonomy(), seed, outcome).unwrap();
    FilterSession::start(state, source, &LazyResource::new(), &MapConfig::default())
        .await
        .unwrap()
}

/// Waits (in virtual time) until the view satisfies `done`.
pub async fn settle(
    rx: &mut watch::Receiver<ViewSnapshot>,
    done: impl FnMut(&ViewSnapshot) -> bool,
) -> ViewSnapshot {
    tokio::time::timeout(Duration::from_secs(30), rx.wait_for(done))
        .await
        .expect("view never settled")
        .expect("session closed")
        .clone()
}

pub fn ids(results: &[Property]) -> Vec<&str> {
    results.iter().map(|p| p.id.as_str()).collect()
}
