use crate::domain::Property;
use maud::{html, Markup};

pub fn listing_card(property: &Property) -> Markup {
    html! {
        article class="card listing" data-property-id=(property.id) {
            @if let Some(cover) = property.images.cover() {
                img class="listing-cover" src={ "/media/" (cover.0) } alt=(property.title) loading="lazy";
            }
            div class="card-body" {
                h2 { (property.title) }
                p class="listing-price" { (property.price_label()) }
                p class="listing-location" { (property.location) }
                @if let Some(rooms) = property.rooms {
                    p class="listing-rooms" { (rooms) " rooms" }
                }
                p class="listing-description" { (property.description) }
                span class="badge" { (property.sub_type.label()) }
                span class="badge status" { (property.status) }
                @if !property.is_mappable() {
                    span class="badge muted" { "Location not on map" }
                }
            }
        }
    }
}
