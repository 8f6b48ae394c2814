use serde_json::{Map, Value};

// record (loosely structured, one producer per listing form)
//  ├── _id | id | propertyId
//  ├── title | name
//  ├── description | desc
//  ├── price | amount | rent
//  ├── location | address | city
//  ├── rooms | bedrooms | beds
//  ├── lat | latitude        ┐ or coordinates { lat, lng }
//  ├── lng | lon | longitude ┘
//  ├── category
//  ├── subType | sub_type | propertyType
//  ├── status
//  └── images
//       ├── frontElevation
//       ├── southView
//       ├── westView
//       ├── eastView
//       └── floorPlan
//
// Producers disagree on field names and on whether numbers are sent as
// numbers or strings, so fields are read through alias lists instead of a
// derived struct. A record carrying both `id` and `_id` must not fail.

const ID: &[&str] = &["_id", "id", "propertyId", "property_id"];
const TITLE: &[&str] = &["title", "name", "propertyName"];
const DESCRIPTION: &[&str] = &["description", "desc", "details"];
const PRICE: &[&str] = &["price", "amount", "rent"];
const LOCATION: &[&str] = &["location", "address", "city"];
const ROOMS: &[&str] = &["rooms", "bedrooms", "beds", "numberOfRooms"];
const LAT: &[&str] = &["lat", "latitude"];
const LNG: &[&str] = &["lng", "lon", "longitude"];
const COORDINATES: &[&str] = &["coordinates", "coords", "geo"];
const SUB_TYPE: &[&str] = &["subType", "sub_type", "subtype", "propertyType"];
const STATUS: &[&str] = &["status", "state"];
const IMAGES: &[&str] = &["images", "photos"];

pub const FRONT_ELEVATION: &[&str] = &["frontElevation", "front_elevation"];
pub const SOUTH_VIEW: &[&str] = &["southView", "south_view"];
pub const WEST_VIEW: &[&str] = &["westView", "west_view"];
pub const EAST_VIEW: &[&str] = &["eastView", "east_view"];
pub const FLOOR_PLAN: &[&str] = &["floorPlan", "floor_plan"];

/// Borrowed view over one raw catalog record.
#[derive(Debug, Clone, Copy)]
pub struct RawRecord<'a> {
    fields: &'a Map<String, Value>,
}

impl<'a> RawRecord<'a> {
    /// `None` for anything that isn't a JSON object.
    pub fn new(value: &'a Value) -> Option<Self> {
        value.as_object().map(|fields| Self { fields })
    }

    pub fn id(&self) -> Option<&'a Value> {
        first_present(self.fields, ID)
    }

    pub fn title(&self) -> Option<&'a Value> {
        first_present(self.fields, TITLE)
    }

    pub fn description(&self) -> Option<&'a Value> {
        first_present(self.fields, DESCRIPTION)
    }

    pub fn price(&self) -> Option<&'a Value> {
        first_present(self.fields, PRICE)
    }

    pub fn location(&self) -> Option<&'a Value> {
        first_present(self.fields, LOCATION)
    }

    pub fn rooms(&self) -> Option<&'a Value> {
        first_present(self.fields, ROOMS)
    }

    /// Top-level lat/lng first, then a nested coordinates object.
    pub fn lat(&self) -> Option<&'a Value> {
        first_present(self.fields, LAT).or_else(|| self.nested_coordinate(LAT))
    }

    pub fn lng(&self) -> Option<&'a Value> {
        first_present(self.fields, LNG).or_else(|| self.nested_coordinate(LNG))
    }

    pub fn sub_type(&self) -> Option<&'a Value> {
        first_present(self.fields, SUB_TYPE)
    }

    pub fn status(&self) -> Option<&'a Value> {
        first_present(self.fields, STATUS)
    }

    /// Image slot from the `images` object, falling back to a top-level field.
    pub fn image(&self, slot: &[&str]) -> Option<&'a Value> {
        first_present(self.fields, IMAGES)
            .and_then(Value::as_object)
            .and_then(|images| first_present(images, slot))
            .or_else(|| first_present(self.fields, slot))
    }

    fn nested_coordinate(&self, keys: &[&str]) -> Option<&'a Value> {
        first_present(self.fields, COORDINATES)
            .and_then(Value::as_object)
            .and_then(|coords| first_present(coords, keys))
    }
}

/// First alias holding a non-null value.
fn first_present<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !value.is_null())
}
