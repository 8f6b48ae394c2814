// src/taxonomy.rs

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Top-level property classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Residential,
    Commercial,
    Hospitality,
    Institutional,
    Recreational,
    Agricultural,
    Land,
    SpecialPurpose,
}

/// Classification nested under exactly one [`Category`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubType {
    // Residential
    StudentHousing,
    FullHouse,
    OneRoom,
    Apartment,
    Cottage,
    Townhouse,
    // Commercial
    RetailShop,
    OfficeSpace,
    MixedUse,
    Warehouse,
    // Hospitality
    Hotel,
    Lodge,
    GuestHouse,
    BedAndBreakfast,
    // Institutional
    School,
    Clinic,
    ChurchHall,
    // Recreational
    SportsGround,
    EventVenue,
    Resort,
    // Agricultural
    Farm,
    Smallholding,
    Plot,
    // Land
    ResidentialStand,
    CommercialStand,
    IndustrialStand,
    // SpecialPurpose
    Garage,
    StorageUnit,
    ParkingLot,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Residential,
        Category::Commercial,
        Category::Hospitality,
        Category::Institutional,
        Category::Recreational,
        Category::Agricultural,
        Category::Land,
        Category::SpecialPurpose,
    ];

    /// URL slug, also the wire form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Residential => "residential",
            Category::Commercial => "commercial",
            Category::Hospitality => "hospitality",
            Category::Institutional => "institutional",
            Category::Recreational => "recreational",
            Category::Agricultural => "agricultural",
            Category::Land => "land",
            Category::SpecialPurpose => "special-purpose",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Residential => "Residential",
            Category::Commercial => "Commercial",
            Category::Hospitality => "Hospitality",
            Category::Institutional => "Institutional",
            Category::Recreational => "Recreational",
            Category::Agricultural => "Agricultural",
            Category::Land => "Land",
            Category::SpecialPurpose => "Special Purpose",
        }
    }
}

impl SubType {
    pub const ALL: [SubType; 29] = [
        SubType::StudentHousing,
        SubType::FullHouse,
        SubType::OneRoom,
        SubType::Apartment,
        SubType::Cottage,
        SubType::Townhouse,
        SubType::RetailShop,
        SubType::OfficeSpace,
        SubType::MixedUse,
        SubType::Warehouse,
        SubType::Hotel,
        SubType::Lodge,
        SubType::GuestHouse,
        SubType::BedAndBreakfast,
        SubType::School,
        SubType::Clinic,
        SubType::ChurchHall,
        SubType::SportsGround,
        SubType::EventVenue,
        SubType::Resort,
        SubType::Farm,
        SubType::Smallholding,
        SubType::Plot,
        SubType::ResidentialStand,
        SubType::CommercialStand,
        SubType::IndustrialStand,
        SubType::Garage,
        SubType::StorageUnit,
        SubType::ParkingLot,
    ];

    /// The single category this subtype belongs to.
    pub fn category(&self) -> Category {
        use SubType::*;
        match self {
            StudentHousing | FullHouse | OneRoom | Apartment | Cottage | Townhouse => {
                Category::Residential
            }
            RetailShop | OfficeSpace | MixedUse | Warehouse => Category::Commercial,
            Hotel | Lodge | GuestHouse | BedAndBreakfast => Category::Hospitality,
            School | Clinic | ChurchHall => Category::Institutional,
            SportsGround | EventVenue | Resort => Category::Recreational,
            Farm | Smallholding | Plot => Category::Agricultural,
            ResidentialStand | CommercialStand | IndustrialStand => Category::Land,
            Garage | StorageUnit | ParkingLot => Category::SpecialPurpose,
        }
    }

    pub fn as_str(&self) -> &'static str {
        use SubType::*;
        match self {
            StudentHousing => "student-housing",
            FullHouse => "full-house",
            OneRoom => "one-room",
            Apartment => "apartment",
            Cottage => "cottage",
            Townhouse => "townhouse",
            RetailShop => "retail-shop",
            OfficeSpace => "office-space",
            MixedUse => "mixed-use",
            Warehouse => "warehouse",
            Hotel => "hotel",
            Lodge => "lodge",
            GuestHouse => "guest-house",
            BedAndBreakfast => "bed-and-breakfast",
            School => "school",
            Clinic => "clinic",
            ChurchHall => "church-hall",
            SportsGround => "sports-ground",
            EventVenue => "event-venue",
            Resort => "resort",
            Farm => "farm",
            Smallholding => "smallholding",
            Plot => "plot",
            ResidentialStand => "residential-stand",
            CommercialStand => "commercial-stand",
            IndustrialStand => "industrial-stand",
            Garage => "garage",
            StorageUnit => "storage-unit",
            ParkingLot => "parking-lot",
        }
    }

    pub fn label(&self) -> &'static str {
        use SubType::*;
        match self {
            StudentHousing => "Student Housing",
            FullHouse => "Full House",
            OneRoom => "One Room",
            Apartment => "Apartment",
            Cottage => "Cottage",
            Townhouse => "Townhouse",
            RetailShop => "Retail Shop",
            OfficeSpace => "Office Space",
            MixedUse => "Mixed Use",
            Warehouse => "Warehouse",
            Hotel => "Hotel",
            Lodge => "Lodge",
            GuestHouse => "Guest House",
            BedAndBreakfast => "Bed & Breakfast",
            School => "School",
            Clinic => "Clinic",
            ChurchHall => "Church Hall",
            SportsGround => "Sports Ground",
            EventVenue => "Event Venue",
            Resort => "Resort",
            Farm => "Farm",
            Smallholding => "Smallholding",
            Plot => "Plot",
            ResidentialStand => "Residential Stand",
            CommercialStand => "Commercial Stand",
            IndustrialStand => "Industrial Stand",
            Garage => "Garage",
            StorageUnit => "Storage Unit",
            ParkingLot => "Parking Lot",
        }
    }
}

/// Lowercase and drop separators so "one-room", "oneRoom", "One Room" and
/// "one_room" all compare equal.
fn fold(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value:?}")]
pub struct ParseTaxonomyError {
    kind: &'static str,
    value: String,
}

impl FromStr for Category {
    type Err = ParseTaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = fold(s);
        Category::ALL
            .into_iter()
            .find(|c| fold(c.as_str()) == folded)
            .ok_or_else(|| ParseTaxonomyError {
                kind: "category",
                value: s.to_string(),
            })
    }
}

impl FromStr for SubType {
    type Err = ParseTaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = fold(s);
        // "Bed & Breakfast" folds to "bedbreakfast", so match labels too.
        SubType::ALL
            .into_iter()
            .find(|t| fold(t.as_str()) == folded || fold(t.label()) == folded)
            .ok_or_else(|| ParseTaxonomyError {
                kind: "subtype",
                value: s.to_string(),
            })
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl fmt::Display for SubType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

macro_rules! slug_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

slug_serde!(Category);
slug_serde!(SubType);

/// Built-in category -> ordered subtypes table. The first entry of each list
/// is the default subtype the filter falls back to.
const BUILTIN: &[(Category, &[SubType])] = &[
    (
        Category::Residential,
        &[
            SubType::StudentHousing,
            SubType::FullHouse,
            SubType::OneRoom,
            SubType::Apartment,
            SubType::Cottage,
            SubType::Townhouse,
        ],
    ),
    (
        Category::Commercial,
        &[
            SubType::RetailShop,
            SubType::OfficeSpace,
            SubType::MixedUse,
            SubType::Warehouse,
        ],
    ),
    (
        Category::Hospitality,
        &[
            SubType::Hotel,
            SubType::Lodge,
            SubType::GuestHouse,
            SubType::BedAndBreakfast,
        ],
    ),
    (
        Category::Institutional,
        &[SubType::School, SubType::Clinic, SubType::ChurchHall],
    ),
    (
        Category::Recreational,
        &[SubType::SportsGround, SubType::EventVenue, SubType::Resort],
    ),
    (
        Category::Agricultural,
        &[SubType::Farm, SubType::Smallholding, SubType::Plot],
    ),
    (
        Category::Land,
        &[
            SubType::ResidentialStand,
            SubType::CommercialStand,
            SubType::IndustrialStand,
        ],
    ),
    (
        Category::SpecialPurpose,
        &[SubType::Garage, SubType::StorageUnit, SubType::ParkingLot],
    ),
];

/// The filter key: one category and one of its subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    pub category: Category,
    pub sub_type: SubType,
}

impl Selection {
    /// Selection for a subtype; its category is implied.
    pub fn of(sub_type: SubType) -> Self {
        Self {
            category: sub_type.category(),
            sub_type,
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.category, self.sub_type)
    }
}

/// A malformed registry. Always fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaxonomyError {
    #[error("category {0} has no subtypes")]
    EmptyCategory(Category),
    #[error("subtype {sub_type} is listed under {listed} but belongs to {owner}")]
    MisplacedSubtype {
        sub_type: SubType,
        listed: Category,
        owner: Category,
    },
    #[error("subtype {0} is listed more than once")]
    DuplicateSubtype(SubType),
    #[error("category {0} is listed more than once")]
    DuplicateCategory(Category),
}

/// Validated category -> subtype registry.
#[derive(Debug, Clone)]
pub struct Taxonomy {
    entries: Vec<(Category, Vec<SubType>)>,
}

impl Taxonomy {
    pub fn builtin() -> Result<Self, TaxonomyError> {
        Self::from_entries(
            BUILTIN
                .iter()
                .map(|(category, subtypes)| (*category, subtypes.to_vec()))
                .collect(),
        )
    }

    pub fn from_entries(entries: Vec<(Category, Vec<SubType>)>) -> Result<Self, TaxonomyError> {
        let mut seen_categories = HashSet::new();
        let mut seen_subtypes = HashSet::new();

        for (category, subtypes) in &entries {
            if !seen_categories.insert(*category) {
                return Err(TaxonomyError::DuplicateCategory(*category));
            }
            if subtypes.is_empty() {
                return Err(TaxonomyError::EmptyCategory(*category));
            }
            for sub_type in subtypes {
                if sub_type.category() != *category {
                    return Err(TaxonomyError::MisplacedSubtype {
                        sub_type: *sub_type,
                        listed: *category,
                        owner: sub_type.category(),
                    });
                }
                if !seen_subtypes.insert(*sub_type) {
                    return Err(TaxonomyError::DuplicateSubtype(*sub_type));
                }
            }
        }

        Ok(Self { entries })
    }

    pub fn categories(&self) -> Vec<Category> {
        self.entries.iter().map(|(c, _)| *c).collect()
    }

    /// Ordered subtypes of `category`; empty when the category is not registered.
    pub fn subtypes_of(&self, category: Category) -> &[SubType] {
        self.entries
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, subtypes)| subtypes.as_slice())
            .unwrap_or(&[])
    }

    /// First subtype of `category`. `None` only for an unregistered category.
    pub fn default_subtype(&self, category: Category) -> Option<SubType> {
        self.subtypes_of(category).first().copied()
    }

    pub fn contains(&self, category: Category, sub_type: SubType) -> bool {
        self.subtypes_of(category).contains(&sub_type)
    }

    /// `category` paired with its default subtype.
    pub fn default_selection(&self, category: Category) -> Option<Selection> {
        self.default_subtype(category).map(|sub_type| Selection {
            category,
            sub_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_is_valid_and_complete() {
        let taxonomy = Taxonomy::builtin().unwrap();
        assert_eq!(taxonomy.categories(), Category::ALL.to_vec());

        let listed: usize = Category::ALL
            .iter()
            .map(|c| taxonomy.subtypes_of(*c).len())
            .sum();
        assert_eq!(listed, SubType::ALL.len());
    }

    #[test]
    fn every_subtype_reports_its_listing_category() {
        let taxonomy = Taxonomy::builtin().unwrap();
        for category in taxonomy.categories() {
            let subtypes = taxonomy.subtypes_of(category);
            assert!(!subtypes.is_empty(), "{category} has no subtypes");
            for sub_type in subtypes {
                assert_eq!(sub_type.category(), category);
            }
            assert_eq!(taxonomy.default_subtype(category), Some(subtypes[0]));
        }
    }

    #[test]
    fn empty_category_fails_fast() {
        let err = Taxonomy::from_entries(vec![
            (Category::Residential, vec![SubType::OneRoom]),
            (Category::Land, vec![]),
        ])
        .unwrap_err();
        assert_eq!(err, TaxonomyError::EmptyCategory(Category::Land));
    }

    #[test]
    fn misplaced_and_duplicate_subtypes_are_rejected() {
        let err =
            Taxonomy::from_entries(vec![(Category::Commercial, vec![SubType::OneRoom])]).unwrap_err();
        assert!(matches!(err, TaxonomyError::MisplacedSubtype { .. }));

        let err = Taxonomy::from_entries(vec![(
            Category::Commercial,
            vec![SubType::MixedUse, SubType::MixedUse],
        )])
        .unwrap_err();
        assert_eq!(err, TaxonomyError::DuplicateSubtype(SubType::MixedUse));
    }

    #[test]
    fn slugs_parse_in_every_spelling() {
        for sub_type in SubType::ALL {
            assert_eq!(sub_type.as_str().parse::<SubType>().unwrap(), sub_type);
            assert_eq!(sub_type.label().parse::<SubType>().unwrap(), sub_type);
        }
        assert_eq!("oneRoom".parse::<SubType>().unwrap(), SubType::OneRoom);
        assert_eq!("RETAIL_SHOP".parse::<SubType>().unwrap(), SubType::RetailShop);
        assert_eq!(
            "specialPurpose".parse::<Category>().unwrap(),
            Category::SpecialPurpose
        );
        assert!("castle".parse::<SubType>().is_err());
    }

    #[test]
    fn serializes_as_slug() {
        let json = serde_json::to_string(&SubType::BedAndBreakfast).unwrap();
        assert_eq!(json, "\"bed-and-breakfast\"");
        let back: SubType = serde_json::from_str(&json).unwrap();
        assert_eq!(back, SubType::BedAndBreakfast);
    }
}
