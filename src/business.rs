// Business Record - the canonical listing every source maps into
// One schema regardless of source; stored once, never updated by the scraper

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::category::Category;

/// Every scraped listing is Canadian
pub const COUNTRY: &str = "Canada";

/// Reviews kept per record, in source order
pub const MAX_REVIEWS: usize = 5;

// ============================================================================
// STATUS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    /// Freshly scraped, waiting for moderation
    Pending,
    Approved,
    Rejected,
    Active,
    Suspended,
    Closed,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Pending => "pending",
            ListingStatus::Approved => "approved",
            ListingStatus::Rejected => "rejected",
            ListingStatus::Active => "active",
            ListingStatus::Suspended => "suspended",
            ListingStatus::Closed => "closed",
        }
    }
}

// ============================================================================
// LOCATION
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    /// Two-letter province code, empty when the source had none
    pub province: String,
    pub postal_code: String,
    pub country: String,
}

/// Longitude/latitude pair. `(0, 0)` stands in for "source gave no geometry".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinates {
    pub fn is_unknown(&self) -> bool {
        self.longitude == 0.0 && self.latitude == 0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub address: Address,
    pub coordinates: Coordinates,
}

// ============================================================================
// CONTACT, HOURS, REVIEWS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub phone: String,
    pub website: String,
}

/// Day of week, indexed the way opening periods number them (0 = Sunday)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    Sunday,
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Sunday,
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
    ];

    pub fn from_index(index: u8) -> Option<Weekday> {
        Self::ALL.get(index as usize).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayHours {
    /// "HH:MM"
    pub open: String,
    /// "HH:MM"
    pub close: String,
    pub closed: bool,
}

pub type BusinessHours = BTreeMap<Weekday, DayHours>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewSource {
    Google,
    Yelp,
    Forum,
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub source: ReviewSource,
    pub rating: f64,
    pub text: String,
    pub author: String,
    pub date: DateTime<Utc>,
    pub verified: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateRating {
    pub average: f64,
    pub count: u32,
}

/// Provenance only. A record carries the id of the one source that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalIds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_place_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yelp_id: Option<String>,
}

impl ExternalIds {
    pub fn google(place_id: Option<String>) -> Self {
        ExternalIds {
            google_place_id: place_id,
            ..Default::default()
        }
    }

    pub fn yelp(id: Option<String>) -> Self {
        ExternalIds {
            yelp_id: id,
            ..Default::default()
        }
    }
}

// ============================================================================
// BUSINESS RECORD
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRecord {
    /// Stable identity for the stored document (UUID v4)
    pub id: String,
    pub name: String,
    pub slug: String,
    pub category: Category,
    pub description: String,
    pub location: Location,
    pub contact: Contact,
    #[serde(default)]
    pub hours: BusinessHours,
    pub price_range: String,
    #[serde(default)]
    pub reviews: Vec<Review>,
    pub aggregate_rating: AggregateRating,
    pub external_ids: ExternalIds,
    pub status: ListingStatus,
    pub last_scraped: DateTime<Utc>,
}

impl BusinessRecord {
    /// Create a record stamped as freshly scraped.
    ///
    /// Everything optional starts empty; mappers fill in what their source has.
    pub fn new(name: String, category: Category, location: Location) -> Self {
        let slug = slugify(&name, &location.address.city);

        BusinessRecord {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            slug,
            category,
            description: String::new(),
            location,
            contact: Contact::default(),
            hours: BusinessHours::new(),
            price_range: "$$".to_string(),
            reviews: Vec::new(),
            aggregate_rating: AggregateRating::default(),
            external_ids: ExternalIds::default(),
            status: ListingStatus::Pending,
            last_scraped: Utc::now(),
        }
    }

    pub fn city(&self) -> &str {
        &self.location.address.city
    }

    /// Name and city must both be non-empty before a record may be stored
    pub fn has_required_fields(&self) -> bool {
        !self.name.is_empty() && !self.city().is_empty()
    }

    /// "street, city, province postalCode"
    pub fn full_address(&self) -> String {
        let addr = &self.location.address;
        format!(
            "{}, {}, {} {}",
            addr.street, addr.city, addr.province, addr.postal_code
        )
        .trim()
        .to_string()
    }

    /// Hash of the dedup key `(name, city)`
    pub fn identity_hash(&self) -> String {
        identity_hash(&self.name, self.city())
    }
}

/// Hash the exact `(name, city)` pair.
/// The unit separator keeps ("ab", "c") and ("a", "bc") apart.
pub fn identity_hash(name: &str, city: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0x1f]);
    hasher.update(city.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// URL slug: lower-cased name with non-alphanumeric runs collapsed to '-',
/// followed by the lower-cased city.
pub fn slugify(name: &str, city: &str) -> String {
    let mut slug = String::with_capacity(name.len() + city.len() + 1);
    let mut pending_dash = false;

    for c in name.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    slug.push('-');
    slug.push_str(&city.to_lowercase());
    slug
}

// ============================================================================
// TESTS
// ============================================================================
