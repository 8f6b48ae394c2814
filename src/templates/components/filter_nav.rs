use crate::taxonomy::{Selection, Taxonomy};
use maud::{html, Markup};

/// Category tabs plus the subtype choices of the selected category.
pub fn filter_nav(taxonomy: &Taxonomy, selected: Selection) -> Markup {
    html! {
        nav class="filter-nav" aria-label="Property type" {
            ul class="categories" {
                @for category in taxonomy.categories() {
                    li {
                        a href={ "/filter/category/" (category.as_str()) }
                            class=[(category == selected.category).then_some("active")]
                        { (category.label()) }
                    }
                }
            }
            ul class="subtypes" {
                @for sub_type in taxonomy.subtypes_of(selected.category) {
                    li {
                        a href={ "/filter/subtype/" (sub_type.as_str()) }
                            class=[(*sub_type == selected.sub_type).then_some("active")]
                        { (sub_type.label()) }
                    }
                }
            }
        }
    }
}
