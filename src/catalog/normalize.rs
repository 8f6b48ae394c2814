// src/catalog/normalize.rs

use crate::catalog::ids::local_id;
use crate::catalog::models::{
    RawRecord, EAST_VIEW, FLOOR_PLAN, FRONT_ELEVATION, SOUTH_VIEW, WEST_VIEW,
};
use crate::domain::property::{
    ImageRef, LatLng, Property, PropertyImages, NO_DESCRIPTION, UNKNOWN_LOCATION, UNKNOWN_STATUS,
    UNTITLED,
};
use crate::taxonomy::{Selection, SubType};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Turns one raw record into a canonical [`Property`].
///
/// This is the boundary that isolates the rest of the system from producer
/// quirks: it never fails on a bad field, it substitutes. Only non-object
/// records are rejected. Pure: the same record always yields the same value.
pub fn normalize_record(raw: &Value, query: Selection) -> Option<Property> {
    let record = RawRecord::new(raw)?;

    let id = record
        .id()
        .and_then(identity)
        .unwrap_or_else(|| local_id(raw));

    // The query decides the category; a producer's own subtype label is kept
    // only when it names a subtype of that category.
    let sub_type = record
        .sub_type()
        .and_then(text)
        .and_then(|s| s.parse::<SubType>().ok())
        .filter(|s| s.category() == query.category)
        .unwrap_or(query.sub_type);

    Some(Property {
        id,
        title: record.title().and_then(text).unwrap_or_else(|| UNTITLED.into()),
        description: record
            .description()
            .and_then(text)
            .unwrap_or_else(|| NO_DESCRIPTION.into()),
        price: record.price().and_then(number).filter(|p| *p >= 0.0),
        location: record
            .location()
            .and_then(location_text)
            .unwrap_or_else(|| UNKNOWN_LOCATION.into()),
        rooms: record.rooms().and_then(count),
        coordinates: coordinates(record.lat(), record.lng()),
        category: query.category,
        sub_type,
        status: record
            .status()
            .and_then(text)
            .map(|s| s.to_lowercase())
            .unwrap_or_else(|| UNKNOWN_STATUS.into()),
        images: PropertyImages {
            front_elevation: record.image(FRONT_ELEVATION).and_then(image_ref),
            south_view: record.image(SOUTH_VIEW).and_then(image_ref),
            west_view: record.image(WEST_VIEW).and_then(image_ref),
            east_view: record.image(EAST_VIEW).and_then(image_ref),
            floor_plan: record.image(FLOOR_PLAN).and_then(image_ref),
        },
    })
}

/// Normalizes a whole response body, enforcing unique ids within the set.
///
/// Records with a repeated server id keep the first occurrence. Identical
/// records without a server id share a content hash, so the later copies get
/// an ordinal suffix (`-2`, `-3`, ...) in array order.
pub fn normalize_batch(raw: &[Value], query: Selection) -> Vec<Property> {
    let mut out = Vec::with_capacity(raw.len());
    let mut seen: HashSet<String> = HashSet::with_capacity(raw.len());
    let mut local_copies: HashMap<String, usize> = HashMap::new();

    for (index, value) in raw.iter().enumerate() {
        let Some(mut property) = normalize_record(value, query) else {
            warn!(index, "Skipping catalog record that is not an object");
            continue;
        };

        if crate::catalog::ids::is_local(&property.id) {
            let copies = local_copies.entry(property.id.clone()).or_insert(0);
            *copies += 1;
            if *copies > 1 {
                property.id = format!("{}-{}", property.id, copies);
            }
        }

        if !seen.insert(property.id.clone()) {
            debug!(id = %property.id, "Dropping record with duplicate id");
            continue;
        }

        out.push(property);
    }

    out
}

/// Trimmed, non-empty string. Numbers and booleans are accepted as their
/// display form; anything else counts as absent.
fn text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

/// Server identity: a non-empty string, a number, or a `{ "$oid": ".." }` wrapper.
fn identity(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map.get("$oid").and_then(text),
        other => text(other),
    }
}

/// Either a free-text location or an address object.
fn location_text(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => {
            let parts: Vec<String> = ["line", "street", "suburb", "city", "country"]
                .iter()
                .filter_map(|key| map.get(*key).and_then(text))
                .collect();
            (!parts.is_empty()).then(|| parts.join(", "))
        }
        other => text(other),
    }
}

/// Finite number from a JSON number or a numeric string. Thousands
/// separators and a leading currency sign are tolerated.
pub fn number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .trim_start_matches('$')
                .chars()
                .filter(|c| *c != ',' && *c != '_' && !c.is_whitespace())
                .collect();
            cleaned.parse::<f64>().ok()?
        }
        _ => return None,
    };
    n.is_finite().then_some(n)
}

/// Non-negative whole count.
fn count(value: &Value) -> Option<u32> {
    let n = number(value)?;
    (n >= 0.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX)).then_some(n as u32)
}

/// Falls back to the (0, 0) sentinel when either half is missing, unparseable
/// or outside the valid range.
fn coordinates(lat: Option<&Value>, lng: Option<&Value>) -> LatLng {
    let lat = lat.and_then(number).filter(|v| (-90.0..=90.0).contains(v));
    let lng = lng.and_then(number).filter(|v| (-180.0..=180.0).contains(v));
    match (lat, lng) {
        (Some(lat), Some(lng)) => LatLng::new(lat, lng),
        _ => LatLng::UNSET,
    }
}

/// A stored-media reference. Inline payloads are dropped.
fn image_ref(value: &Value) -> Option<ImageRef> {
    let id = match value {
        Value::Object(map) => ["fileId", "file_id", "id", "$id"]
            .iter()
            .find_map(|key| map.get(*key).and_then(text)),
        other => text(other),
    }?;

    if id.starts_with("data:") {
        return None;
    }
    Some(ImageRef(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::property::CONTACT_FOR_PRICE;
    use crate::taxonomy::Category;
    use serde_json::json;

    fn one_room() -> Selection {
        Selection::of(SubType::OneRoom)
    }

    #[test]
    fn full_record_normalizes() {
        let raw = json!({
            "_id": "65f0c",
            "title": "  Garden cottage  ",
            "description": "Quiet, close to campus",
            "price": "1,250",
            "location": "Avondale, Harare",
            "rooms": "3",
            "lat": "-17.8",
            "lng": 31.05,
            "subType": "oneRoom",
            "status": "Available",
            "images": {
                "frontElevation": "file-1",
                "floorPlan": { "fileId": "file-2" }
            }
        });

        let p = normalize_record(&raw, one_room()).unwrap();
        assert_eq!(p.id, "65f0c");
        assert_eq!(p.title, "Garden cottage");
        assert_eq!(p.price, Some(1250.0));
        assert_eq!(p.rooms, Some(3));
        assert_eq!(p.coordinates, LatLng::new(-17.8, 31.05));
        assert_eq!(p.category, Category::Residential);
        assert_eq!(p.sub_type, SubType::OneRoom);
        assert_eq!(p.status, "available");
        assert_eq!(p.images.front_elevation, Some(ImageRef("file-1".into())));
        assert_eq!(p.images.floor_plan, Some(ImageRef("file-2".into())));
        assert_eq!(p.images.south_view, None);
    }

    #[test]
    fn missing_and_blank_fields_fall_back_to_placeholders() {
        let raw = json!({ "id": "x", "title": "   ", "price": "call us", "rooms": -2 });

        let p = normalize_record(&raw, one_room()).unwrap();
        assert_eq!(p.title, UNTITLED);
        assert_eq!(p.description, NO_DESCRIPTION);
        assert_eq!(p.location, UNKNOWN_LOCATION);
        assert_eq!(p.status, UNKNOWN_STATUS);
        assert_eq!(p.price, None);
        assert_eq!(p.price_label(), CONTACT_FOR_PRICE);
        assert_eq!(p.rooms, None);
        assert_eq!(p.coordinates, LatLng::UNSET);
        assert_eq!(p.sub_type, SubType::OneRoom);
    }

    #[test]
    fn aliases_and_nested_coordinates() {
        let raw = json!({
            "propertyId": 42,
            "name": "Shop 4",
            "amount": 900,
            "address": { "street": "4 Samora Machel Ave", "city": "Harare" },
            "bedrooms": 0,
            "coordinates": { "latitude": -17.83, "lon": "31.04" },
            "propertyType": "Retail Shop"
        });

        let p = normalize_record(&raw, Selection::of(SubType::MixedUse)).unwrap();
        assert_eq!(p.id, "42");
        assert_eq!(p.title, "Shop 4");
        assert_eq!(p.price, Some(900.0));
        assert_eq!(p.location, "4 Samora Machel Ave, Harare");
        assert_eq!(p.rooms, Some(0));
        assert_eq!(p.coordinates, LatLng::new(-17.83, 31.04));
        assert_eq!(p.sub_type, SubType::RetailShop);
    }

    #[test]
    fn subtype_from_another_category_is_replaced_by_query() {
        let raw = json!({ "id": "1", "subType": "hotel" });
        let p = normalize_record(&raw, one_room()).unwrap();
        assert_eq!(p.sub_type, SubType::OneRoom);
    }

    #[test]
    fn out_of_range_or_half_coordinates_become_sentinel() {
        let half = json!({ "id": "1", "lat": -17.8 });
        assert!(!normalize_record(&half, one_room()).unwrap().is_mappable());

        let bad = json!({ "id": "1", "lat": 123.0, "lng": 31.0 });
        assert!(!normalize_record(&bad, one_room()).unwrap().is_mappable());
    }

    #[test]
    fn inline_image_payloads_are_dropped() {
        let raw = json!({ "id": "1", "images": { "southView": "data:image/png;base64,AAAA" } });
        let p = normalize_record(&raw, one_room()).unwrap();
        assert_eq!(p.images.south_view, None);
    }

    #[test]
    fn normalization_is_idempotent_including_local_ids() {
        let raw = json!({ "title": "No id here", "lat": -17.8, "lng": 31.0 });

        let first = normalize_record(&raw, one_room()).unwrap();
        let second = normalize_record(&raw, one_room()).unwrap();
        assert_eq!(first, second);
        assert!(crate::catalog::ids::is_local(&first.id));
    }

    #[test]
    fn batch_keeps_ids_unique() {
        let raw = vec![
            json!({ "id": "a", "title": "First" }),
            json!({ "id": "a", "title": "Second" }),
            json!({ "title": "Twin" }),
            json!({ "title": "Twin" }),
            json!("not a record"),
        ];

        let props = normalize_batch(&raw, one_room());
        let ids: Vec<&str> = props.iter().map(|p| p.id.as_str()).collect();

        assert_eq!(props.len(), 3);
        assert_eq!(ids[0], "a");
        assert_eq!(props[0].title, "First");
        assert_eq!(ids[2], format!("{}-2", ids[1]));

        // Same input, same ids.
        let again = normalize_batch(&raw, one_room());
        assert_eq!(props, again);
    }
}
