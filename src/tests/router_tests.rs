// src/tests/router_tests.rs

use crate::map::geocode::GeocodeError;
use crate::map::{DebouncedSearch, PlaceCandidate, PlaceLookup};
use crate::router::{handle, AppState};
use crate::taxonomy::{Selection, SubType};
use crate::tests::utils::*;
use astra::{Body, Request, Response};
use async_trait::async_trait;
use serde_json::Value;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

struct FixedPlaces;

#[async_trait]
impl PlaceLookup for FixedPlaces {
    async fn lookup(&self, query: &str) -> Result<Vec<PlaceCandidate>, GeocodeError> {
        Ok(vec![PlaceCandidate {
            lat: -17.83,
            lng: 31.05,
            label: format!("{query}, Zimbabwe"),
        }])
    }
}

async fn make_app(source: ScriptedSource) -> Arc<AppState> {
    let seed = Selection::of(SubType::StudentHousing);
    let seeded = listings(seed, &[record("s1", "Hostel", -17.78, 31.05)]);
    let session = start_session(Arc::new(source), seed, seeded).await;

    Arc::new(AppState {
        session,
        places: DebouncedSearch::spawn(Arc::new(FixedPlaces), Duration::from_millis(20)),
        runtime: tokio::runtime::Handle::current(),
        media_base_url: Url::parse("https://files.example.com/media/").unwrap(),
        place_search_wait: Duration::from_secs(2),
    })
}

/// Handlers block on the runtime, so they run where worker threads would.
async fn get(app: &Arc<AppState>, uri: &str) -> Response {
    let app = app.clone();
    let uri = uri.to_string();
    tokio::task::spawn_blocking(move || {
        let mut req = Request::new(Body::empty());
        *req.uri_mut() = uri.parse().unwrap();
        match handle(req, &app) {
            Ok(resp) => resp,
            Err(err) => crate::responses::html_error_response(err),
        }
    })
    .await
    .unwrap()
}

fn body_text(resp: Response) -> String {
    let mut body = String::new();
    resp.into_body().reader().read_to_string(&mut body).unwrap();
    body
}

fn location(resp: &Response) -> &str {
    resp.headers().get("Location").unwrap().to_str().unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn index_renders_seeded_listings() {
    let app = make_app(ScriptedSource::default()).await;

    let resp = get(&app, "/").await;
    assert_eq!(resp.status(), 200);
    let body = body_text(resp);
    assert!(body.contains("Hostel"));
    assert!(body.contains("Student Housing"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn category_change_redirects_and_fetches() {
    let source = ScriptedSource::default().reply(
        SubType::RetailShop,
        0,
        vec![record("shop", "Corner shop", -17.83, 31.04)],
    );
    let app = make_app(source).await;
    let mut rx = app.session.subscribe();

    let resp = get(&app, "/filter/category/commercial").await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "/");

    let view = settle(&mut rx, |v| {
        v.selection == Selection::of(SubType::RetailShop) && !v.results.is_empty()
    })
    .await;
    assert_eq!(ids(&view.results), vec!["shop"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unknown_slug_is_not_found() {
    let app = make_app(ScriptedSource::default()).await;

    assert_eq!(get(&app, "/filter/category/castles").await.status(), 404);
    assert_eq!(get(&app, "/filter/subtype/igloo").await.status(), 404);
    assert_eq!(get(&app, "/nowhere").await.status(), 404);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn subtype_outside_category_is_bad_request() {
    let app = make_app(ScriptedSource::default()).await;

    let resp = get(&app, "/filter/subtype/warehouse").await;
    assert_eq!(resp.status(), 400);
    assert_eq!(
        app.session.snapshot().selection,
        Selection::of(SubType::StudentHousing)
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn view_endpoint_reports_selection_and_markers() {
    let app = make_app(ScriptedSource::default()).await;

    let resp = get(&app, "/api/view").await;
    assert_eq!(resp.status(), 200);
    let view: Value = serde_json::from_str(&body_text(resp)).unwrap();

    assert_eq!(view["selection"]["category"], "residential");
    assert_eq!(view["selection"]["subType"], "student-housing");
    assert_eq!(view["phase"], "seeded");
    assert_eq!(view["mounted"], true);
    assert_eq!(view["results"].as_array().unwrap().len(), 1);
    assert_eq!(view["map"]["markers"][0]["propertyId"], "s1");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn place_search_returns_candidates() {
    let app = make_app(ScriptedSource::default()).await;

    let resp = get(&app, "/api/places?q=Borrowdale").await;
    assert_eq!(resp.status(), 200);
    let results: Value = serde_json::from_str(&body_text(resp)).unwrap();
    assert_eq!(results["query"], "Borrowdale");
    assert_eq!(results["candidates"][0]["label"], "Borrowdale, Zimbabwe");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn media_redirects_only_plain_file_ids() {
    let app = make_app(ScriptedSource::default()).await;

    let resp = get(&app, "/media/64f1c2ab.jpg").await;
    assert_eq!(resp.status(), 303);
    assert_eq!(location(&resp), "https://files.example.com/media/64f1c2ab.jpg");

    assert_eq!(get(&app, "/media/..").await.status(), 400);
    assert_eq!(get(&app, "/media/https:%2F%2Fevil.example").await.status(), 400);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unmounted_view_is_unavailable() {
    let app = make_app(ScriptedSource::default()).await;
    app.session.unmount().await;

    assert_eq!(get(&app, "/filter/category/land").await.status(), 503);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stylesheet_is_served() {
    let app = make_app(ScriptedSource::default()).await;

    let resp = get(&app, "/static/main.css").await;
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("Content-Type").unwrap(),
        "text/css; charset=utf-8"
    );
}
