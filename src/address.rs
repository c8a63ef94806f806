// Address/Geo Normalizer
// Turns each source's geography representation into the canonical address + coordinates

use serde::{Deserialize, Serialize};

use crate::business::{Address, Coordinates, COUNTRY};

/// Canadian province/territory codes
pub const PROVINCE_CODES: [&str; 13] = [
    "AB", "BC", "MB", "NB", "NL", "NS", "NT", "NU", "ON", "PE", "QC", "SK", "YT",
];

const PROVINCE_NAMES: [(&str, &str); 13] = [
    ("Alberta", "AB"),
    ("British Columbia", "BC"),
    ("Manitoba", "MB"),
    ("New Brunswick", "NB"),
    ("Newfoundland and Labrador", "NL"),
    ("Nova Scotia", "NS"),
    ("Northwest Territories", "NT"),
    ("Nunavut", "NU"),
    ("Ontario", "ON"),
    ("Prince Edward Island", "PE"),
    ("Quebec", "QC"),
    ("Saskatchewan", "SK"),
    ("Yukon", "YT"),
];

/// Long province name → two-letter code
pub fn province_code(long_name: &str) -> Option<&'static str> {
    PROVINCE_NAMES
        .iter()
        .find(|(name, _)| *name == long_name)
        .map(|(_, code)| *code)
}

// ============================================================================
// SOURCE SHAPES
// ============================================================================

/// One typed entry of a components-style address (places API)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressComponent {
    #[serde(default)]
    pub long_name: String,
    #[serde(default)]
    pub short_name: String,
    #[serde(default)]
    pub types: Vec<String>,
}

impl AddressComponent {
    pub fn has_type(&self, kind: &str) -> bool {
        self.types.iter().any(|t| t == kind)
    }
}

/// Already-flat address object (directory API `location`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlatAddress {
    #[serde(default)]
    pub address1: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Structured address fields pulled out of one source payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedAddress {
    pub street: String,
    pub city: String,
    /// Absent when the source carries no province at all
    pub province: Option<String>,
    pub postal_code: String,
}

impl NormalizedAddress {
    pub fn into_address(self) -> Address {
        Address {
            street: self.street,
            city: self.city,
            province: self.province.unwrap_or_default(),
            postal_code: self.postal_code,
            country: COUNTRY.to_string(),
        }
    }
}

/// Single pass over typed components. Street is "<number> <route>".
pub fn normalize_components(components: &[AddressComponent]) -> NormalizedAddress {
    let mut street_number = "";
    let mut route = "";
    let mut city = "";
    let mut postal_code = "";

    for component in components {
        if component.has_type("street_number") {
            street_number = component.long_name.as_str();
        } else if component.has_type("route") {
            route = component.long_name.as_str();
        } else if component.has_type("locality") {
            city = component.long_name.as_str();
        } else if component.has_type("postal_code") {
            postal_code = component.long_name.as_str();
        }
    }

    let street = format!("{} {}", street_number, route).trim().to_string();

    NormalizedAddress {
        street,
        city: city.to_string(),
        province: normalize_province(components),
        postal_code: postal_code.to_string(),
    }
}

/// Province from the first administrative_area_level_1 component.
///
/// Known long names map through the province table; anything else keeps the
/// short code the source supplied.
pub fn normalize_province(components: &[AddressComponent]) -> Option<String> {
    let admin = components
        .iter()
        .find(|c| c.has_type("administrative_area_level_1"))?;

    match province_code(&admin.long_name) {
        Some(code) => Some(code.to_string()),
        None => Some(admin.short_name.clone()),
    }
}

/// Flat payloads pass straight through with key renaming
pub fn normalize_flat(address: &FlatAddress) -> NormalizedAddress {
    NormalizedAddress {
        street: address.address1.clone().unwrap_or_default(),
        city: address.city.clone().unwrap_or_default(),
        province: address.state.clone(),
        postal_code: address.zip_code.clone().unwrap_or_default(),
    }
}

/// Missing longitude and latitude each default to 0.0 independently
pub fn coordinates(longitude: Option<f64>, latitude: Option<f64>) -> Coordinates {
    Coordinates {
        longitude: longitude.unwrap_or(0.0),
        latitude: latitude.unwrap_or(0.0),
    }
}

// ============================================================================
// TESTS
// ============================================================================
