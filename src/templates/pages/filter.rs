// templates/pages/filter.rs

use crate::filter::ViewSnapshot;
use crate::taxonomy::Taxonomy;
use crate::templates::{
    components::{filter_nav, listing_card, map_panel, status_panel},
    desktop_layout,
};
use maud::{html, Markup};

pub fn filter_page(view: &ViewSnapshot, taxonomy: &Taxonomy) -> Markup {
    desktop_layout(
        &format!("{} listings", view.selection.sub_type.label()),
        html! {
            main class="container filter-view" {
                (filter_nav(taxonomy, view.selection))

                div class="filter-body" {
                    section class="results" {
                        (status_panel(view))

                        @if !view.results.is_empty() {
                            p class="result-count" {
                                strong { (view.results.len()) } " listings"
                            }
                            @for property in view.results.iter() {
                                (listing_card(property))
                            }
                        }
                    }

                    (map_panel())
                }
            }
        },
    )
}
