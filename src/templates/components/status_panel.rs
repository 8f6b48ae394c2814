use crate::filter::{LoadStatus, ViewSnapshot};
use maud::{html, Markup};

const SKELETON_CARDS: usize = 3;

/// Loading skeleton, error panel, or the empty-result notice. Renders
/// nothing when there are listings to show.
pub fn status_panel(view: &ViewSnapshot) -> Markup {
    html! {
        @match &view.status {
            LoadStatus::Loading { selection } => {
                div class="status loading" aria-busy="true" {
                    p { "Loading " (selection.sub_type.label()) " listings…" }
                    @for _ in 0..SKELETON_CARDS {
                        div class="card skeleton" {}
                    }
                }
            }
            LoadStatus::Failed { message } => {
                div class="status error" role="alert" {
                    h3 { "No listings loaded" }
                    p { (message) }
                }
            }
            LoadStatus::Idle | LoadStatus::Loaded { .. } => {
                @if view.results.is_empty() {
                    div class="status empty" {
                        p { "No listings found for " (view.selection) "." }
                    }
                }
            }
        }
    }
}
