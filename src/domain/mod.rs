pub mod property;

pub use property::{ImageRef, LatLng, Property, PropertyImages};
