// src/domain/property.rs

use crate::taxonomy::{Category, SubType};
use serde::Serialize;

pub const UNTITLED: &str = "Untitled property";
pub const NO_DESCRIPTION: &str = "No description provided";
pub const UNKNOWN_LOCATION: &str = "Unknown";
pub const CONTACT_FOR_PRICE: &str = "Contact for price";
pub const UNKNOWN_STATUS: &str = "unknown";

/// A (lat, lng) pair. Exactly (0, 0) is the "unmappable" sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const UNSET: LatLng = LatLng { lat: 0.0, lng: 0.0 };

    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// False for the (0, 0) sentinel, which is open ocean and never plotted.
    pub fn is_mappable(&self) -> bool {
        !(self.lat == 0.0 && self.lng == 0.0)
    }
}

/// Reference to stored media (a storage file id). Never raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImageRef(pub String);

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyImages {
    pub front_elevation: Option<ImageRef>,
    pub south_view: Option<ImageRef>,
    pub west_view: Option<ImageRef>,
    pub east_view: Option<ImageRef>,
    pub floor_plan: Option<ImageRef>,
}

impl PropertyImages {
    /// Image used on listing cards: the front elevation, else any other slot.
    pub fn cover(&self) -> Option<&ImageRef> {
        self.front_elevation
            .as_ref()
            .or(self.south_view.as_ref())
            .or(self.west_view.as_ref())
            .or(self.east_view.as_ref())
            .or(self.floor_plan.as_ref())
    }
}

/// A listing after normalization. Built fresh for every fetch response and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: Option<f64>,
    pub location: String,
    pub rooms: Option<u32>,
    pub coordinates: LatLng,
    pub category: Category,
    pub sub_type: SubType,
    pub status: String,
    pub images: PropertyImages,
}

impl Property {
    pub fn is_mappable(&self) -> bool {
        self.coordinates.is_mappable()
    }

    /// Display price, e.g. "$1,250" or "Contact for price".
    pub fn price_label(&self) -> String {
        match self.price {
            Some(price) => format!("${}", group_thousands(price)),
            None => CONTACT_FOR_PRICE.to_string(),
        }
    }
}

fn group_thousands(value: f64) -> String {
    // Round once, in cents, so .999 carries into the whole part.
    let total = (value.abs() * 100.0).round() as u64;
    let (whole, cents) = (total / 100, total % 100);

    let digits = whole.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if cents > 0 {
        out.push_str(&format!(".{cents:02}"));
    }
    if value < 0.0 && total > 0 {
        out.insert(0, '-');
    }
    out
}
