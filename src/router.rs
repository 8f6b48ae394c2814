use crate::errors::ServerError;
use crate::filter::SessionHandle;
use crate::map::DebouncedSearch;
use crate::responses::{css_response, html_response, json_response, see_other, ResultResp};
use crate::taxonomy::{Category, SubType};
use crate::templates;
use astra::Request;
use std::collections::HashMap;
use std::time::Duration;
use tokio::runtime::Handle;
use url::Url;

const MAIN_CSS: &str = include_str!("../static/main.css");

/// Shared by every worker thread.
pub struct AppState {
    pub session: SessionHandle,
    pub places: DebouncedSearch,
    pub runtime: Handle,
    pub media_base_url: Url,
    pub place_search_wait: Duration,
}

pub fn handle(req: Request, app: &AppState) -> ResultResp {
    let method = req.method().as_str();
    let path = req.uri().path();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, segments.as_slice()) {
        ("GET", []) => {
            let view = app.session.snapshot();
            html_response(templates::pages::filter_page(&view, app.session.taxonomy()))
        }

        ("GET", ["filter", "category", slug]) => {
            let category: Category = slug.parse().map_err(|_| ServerError::NotFound)?;
            app.session.select_category_blocking(category)?;
            see_other("/")
        }

        ("GET", ["filter", "subtype", slug]) => {
            let sub_type: SubType = slug.parse().map_err(|_| ServerError::NotFound)?;
            app.session.select_subtype_blocking(sub_type)?;
            see_other("/")
        }

        ("GET", ["api", "view"]) => json_response(&app.session.snapshot()),

        ("GET", ["api", "places"]) => {
            let params = parse_query(&req);
            let query = params.get("q").map(String::as_str).unwrap_or("");
            let results = app
                .runtime
                .block_on(app.places.search(query, app.place_search_wait));
            json_response(&results)
        }

        // Image references are resolved by the storage service.
        ("GET", ["media", file_id]) => {
            if !is_file_id(file_id) {
                return Err(ServerError::BadRequest("invalid media reference".into()));
            }
            let target = app
                .media_base_url
                .join(file_id)
                .map_err(|_| ServerError::BadRequest("invalid media reference".into()))?;
            see_other(target.as_str())
        }

        ("GET", ["static", "main.css"]) => css_response(MAIN_CSS),

        _ => Err(ServerError::NotFound),
    }
}

/// Storage ids are opaque tokens; anything URL-like would escape the media host.
fn is_file_id(s: &str) -> bool {
    !s.starts_with('.')
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

fn parse_query(req: &Request) -> HashMap<String, String> {
    req.uri()
        .query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}
