// 🏗️ Record Mappers - one per upstream source
// Raw source payloads → canonical BusinessRecord

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::address::{self, AddressComponent, FlatAddress};
use crate::business::{
    AggregateRating, BusinessHours, BusinessRecord, Contact, DayHours, ExternalIds, Location,
    Review, ReviewSource, Weekday, MAX_REVIEWS,
};
use crate::category::CategoryClassifier;

// ============================================================================
// CORE TYPES
// ============================================================================

/// SourceType - which upstream API a record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    GooglePlaces,
    Yelp,
}

impl SourceType {
    /// Short code for logs
    pub fn code(&self) -> &str {
        match self {
            SourceType::GooglePlaces => "google",
            SourceType::Yelp => "yelp",
        }
    }
}

/// ListingMapper - turns one source's raw payload into a canonical record.
///
/// Mappers are pure apart from the creation stamp (`id`, `lastScraped`).
/// Absent optional data maps to empty containers or zero values, never an error.
pub trait ListingMapper {
    /// Raw payload shape for this source
    type Raw;

    fn map(&self, raw: Self::Raw) -> BusinessRecord;

    fn source_type(&self) -> SourceType;
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// "0900" → "09:00". Anything other than four ASCII digits is rejected.
pub fn format_hhmm(raw: &str) -> Option<String> {
    if raw.len() != 4 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}:{}", &raw[..2], &raw[2..]))
}

/// `$` repeated `level` times, `$$` when the source gives no level
pub fn price_range_from_level(level: Option<u8>) -> String {
    "$".repeat(level.unwrap_or(2) as usize)
}

/// Epoch seconds → UTC timestamp; out-of-range values collapse to the epoch
pub fn timestamp_from_epoch(seconds: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(seconds, 0).unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

// ============================================================================
// GOOGLE PLACES
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    #[serde(default)]
    pub location: Option<LatLng>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeriodPoint {
    #[serde(default)]
    pub day: Option<u8>,
    #[serde(default)]
    pub time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpeningPeriod {
    #[serde(default)]
    pub open: Option<PeriodPoint>,
    #[serde(default)]
    pub close: Option<PeriodPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpeningHours {
    #[serde(default)]
    pub periods: Option<Vec<OpeningPeriod>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GoogleReview {
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub text: Option<String>,
    /// Epoch seconds
    #[serde(default)]
    pub time: Option<i64>,
}

/// A place as returned by text search or details. Every field is optional so
/// a details payload can be laid over a search stub.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GooglePlace {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub types: Option<Vec<String>>,
    #[serde(default)]
    pub formatted_address: Option<String>,
    #[serde(default)]
    pub address_components: Option<Vec<AddressComponent>>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub formatted_phone_number: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub user_ratings_total: Option<u32>,
    #[serde(default)]
    pub opening_hours: Option<OpeningHours>,
    #[serde(default)]
    pub price_level: Option<u8>,
    #[serde(default)]
    pub reviews: Option<Vec<GoogleReview>>,
}

impl GooglePlace {
    /// Overlay `details` on top of this search stub. Any field the details
    /// payload carries wins; the rest is kept from the stub.
    pub fn merge(self, details: GooglePlace) -> GooglePlace {
        GooglePlace {
            place_id: details.place_id.or(self.place_id),
            name: details.name.or(self.name),
            types: details.types.or(self.types),
            formatted_address: details.formatted_address.or(self.formatted_address),
            address_components: details.address_components.or(self.address_components),
            geometry: details.geometry.or(self.geometry),
            formatted_phone_number: details
                .formatted_phone_number
                .or(self.formatted_phone_number),
            website: details.website.or(self.website),
            rating: details.rating.or(self.rating),
            user_ratings_total: details.user_ratings_total.or(self.user_ratings_total),
            opening_hours: details.opening_hours.or(self.opening_hours),
            price_level: details.price_level.or(self.price_level),
            reviews: details.reviews.or(self.reviews),
        }
    }
}

/// Search stub plus the optional details lookup for it
#[derive(Debug, Clone, Default)]
pub struct PlaceListing {
    pub place: GooglePlace,
    pub details: Option<GooglePlace>,
}

impl PlaceListing {
    pub fn new(place: GooglePlace, details: Option<GooglePlace>) -> Self {
        PlaceListing { place, details }
    }
}

pub struct GooglePlacesMapper {
    classifier: CategoryClassifier,
}

impl GooglePlacesMapper {
    pub fn new() -> Self {
        GooglePlacesMapper {
            classifier: CategoryClassifier::new(),
        }
    }

    /// Opening periods → weekday hours. Periods missing either end are skipped.
    pub fn parse_hours(opening_hours: Option<&OpeningHours>) -> BusinessHours {
        let mut hours = BusinessHours::new();

        let periods = match opening_hours.and_then(|h| h.periods.as_ref()) {
            Some(periods) => periods,
            None => return hours,
        };

        for period in periods {
            let open = period.open.as_ref();
            let day = open.and_then(|p| p.day).unwrap_or(0);
            let open_time = open.and_then(|p| p.time.as_deref()).and_then(format_hhmm);
            let close_time = period
                .close
                .as_ref()
                .and_then(|p| p.time.as_deref())
                .and_then(format_hhmm);

            if let (Some(weekday), Some(open), Some(close)) =
                (Weekday::from_index(day), open_time, close_time)
            {
                hours.insert(
                    weekday,
                    DayHours {
                        open,
                        close,
                        closed: false,
                    },
                );
            }
        }

        hours
    }

    /// First five reviews in source order
    pub fn parse_reviews(reviews: Option<&Vec<GoogleReview>>) -> Vec<Review> {
        reviews
            .map(|reviews| {
                reviews
                    .iter()
                    .take(MAX_REVIEWS)
                    .map(|r| Review {
                        source: ReviewSource::Google,
                        rating: r.rating.unwrap_or(0.0),
                        text: r.text.clone().unwrap_or_default(),
                        author: r
                            .author_name
                            .clone()
                            .unwrap_or_else(|| "Anonymous".to_string()),
                        date: timestamp_from_epoch(r.time.unwrap_or(0)),
                        verified: true,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl ListingMapper for GooglePlacesMapper {
    type Raw = PlaceListing;

    fn map(&self, raw: PlaceListing) -> BusinessRecord {
        let place = match raw.details {
            Some(details) => raw.place.merge(details),
            None => raw.place,
        };

        let components = place.address_components.as_deref().unwrap_or(&[]);
        let lat_lng = place
            .geometry
            .as_ref()
            .and_then(|g| g.location.clone())
            .unwrap_or_default();

        let location = Location {
            address: address::normalize_components(components).into_address(),
            coordinates: address::coordinates(lat_lng.lng, lat_lng.lat),
        };

        let types = place.types.as_deref().unwrap_or(&[]);
        let category = self.classifier.classify(types);

        let mut record = BusinessRecord::new(place.name.clone().unwrap_or_default(), category, location);
        record.contact = Contact {
            phone: place.formatted_phone_number.clone().unwrap_or_default(),
            website: place.website.clone().unwrap_or_default(),
        };
        record.hours = Self::parse_hours(place.opening_hours.as_ref());
        record.price_range = price_range_from_level(place.price_level);
        record.reviews = Self::parse_reviews(place.reviews.as_ref());
        record.aggregate_rating = AggregateRating {
            average: place.rating.unwrap_or(0.0),
            count: place.user_ratings_total.unwrap_or(0),
        };
        record.external_ids = ExternalIds::google(place.place_id);

        record
    }

    fn source_type(&self) -> SourceType {
        SourceType::GooglePlaces
    }
}

impl Default for GooglePlacesMapper {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// YELP
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YelpCategory {
    #[serde(default)]
    pub alias: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YelpCoordinates {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// One business from the directory search; there is no separate details call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct YelpBusiness {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub categories: Vec<YelpCategory>,
    #[serde(default)]
    pub location: Option<FlatAddress>,
    #[serde(default)]
    pub coordinates: Option<YelpCoordinates>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub price: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<u32>,
}

pub struct YelpMapper {
    classifier: CategoryClassifier,
}

impl YelpMapper {
    pub fn new() -> Self {
        YelpMapper {
            classifier: CategoryClassifier::new(),
        }
    }
}

impl ListingMapper for YelpMapper {
    type Raw = YelpBusiness;

    fn map(&self, raw: YelpBusiness) -> BusinessRecord {
        let address = raw
            .location
            .as_ref()
            .map(address::normalize_flat)
            .unwrap_or_default()
            .into_address();
        let coords = raw.coordinates.clone().unwrap_or_default();

        let location = Location {
            address,
            coordinates: address::coordinates(coords.longitude, coords.latitude),
        };

        let aliases: Vec<&str> = raw.categories.iter().map(|c| c.alias.as_str()).collect();
        let category = self.classifier.classify(&aliases[..]);

        let mut record = BusinessRecord::new(raw.name.clone().unwrap_or_default(), category, location);
        record.contact = Contact {
            phone: raw.phone.clone().unwrap_or_default(),
            website: raw.url.clone().unwrap_or_default(),
        };
        record.price_range = raw.price.clone().unwrap_or_else(|| "$$".to_string());
        record.aggregate_rating = AggregateRating {
            average: raw.rating.unwrap_or(0.0),
            count: raw.review_count.unwrap_or(0),
        };
        record.external_ids = ExternalIds::yelp(raw.id);

        record
    }

    fn source_type(&self) -> SourceType {
        SourceType::Yelp
    }
}

impl Default for YelpMapper {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::business::ListingStatus;
    use crate::category::Category;
    use serde_json::json;

    fn joes_garage() -> GooglePlace {
        serde_json::from_value(json!({
            "place_id": "ChIJ-joes",
            "name": "Joe's Garage",
            "types": ["car_repair", "point_of_interest", "establishment"],
            "address_components": [
                {"long_name": "123", "short_name": "123", "types": ["street_number"]},
                {"long_name": "Main St", "short_name": "Main St", "types": ["route"]},
                {"long_name": "Toronto", "short_name": "Toronto", "types": ["locality", "political"]},
                {"long_name": "Ontario", "short_name": "ON", "types": ["administrative_area_level_1", "political"]},
                {"long_name": "M4C 1B5", "short_name": "M4C 1B5", "types": ["postal_code"]}
            ],
            "geometry": {"location": {"lat": 43.68, "lng": -79.31}},
            "rating": 4.6,
            "user_ratings_total": 87
        }))
        .unwrap()
    }

    fn review(n: i64) -> serde_json::Value {
        json!({
            "author_name": format!("Reviewer {}", n),
            "rating": 5,
            "text": format!("Review number {}", n),
            "time": 1_700_000_000 + n
        })
    }

    #[test]
    fn test_source_type_codes() {
        assert_eq!(SourceType::GooglePlaces.code(), "google");
        assert_eq!(SourceType::Yelp.code(), "yelp");
        assert_eq!(GooglePlacesMapper::new().source_type(), SourceType::GooglePlaces);
        assert_eq!(YelpMapper::new().source_type(), SourceType::Yelp);
    }

    #[test]
    fn test_format_hhmm() {
        assert_eq!(format_hhmm("0900"), Some("09:00".to_string()));
        assert_eq!(format_hhmm("1730"), Some("17:30".to_string()));
        assert_eq!(format_hhmm("930"), None);
        assert_eq!(format_hhmm("ab12"), None);
    }

    #[test]
    fn test_price_range_from_level() {
        assert_eq!(price_range_from_level(Some(3)), "$$$");
        assert_eq!(price_range_from_level(Some(1)), "$");
        assert_eq!(price_range_from_level(None), "$$");
    }

    #[test]
    fn test_timestamp_from_epoch() {
        assert_eq!(timestamp_from_epoch(0), DateTime::<Utc>::UNIX_EPOCH);
        assert_eq!(
            timestamp_from_epoch(1_700_000_000).to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );
    }

    #[test]
    fn test_google_search_result_only() {
        let mapper = GooglePlacesMapper::new();
        let record = mapper.map(PlaceListing::new(joes_garage(), None));

        assert_eq!(record.name, "Joe's Garage");
        assert_eq!(record.category, Category::Mechanics);
        assert_eq!(record.status, ListingStatus::Pending);
        assert_eq!(record.location.address.street, "123 Main St");
        assert_eq!(record.location.address.city, "Toronto");
        assert_eq!(record.location.address.province, "ON");
        assert_eq!(record.location.address.postal_code, "M4C 1B5");
        assert_eq!(record.location.address.country, "Canada");
        assert_eq!(record.location.coordinates.longitude, -79.31);
        assert_eq!(record.location.coordinates.latitude, 43.68);
        assert_eq!(record.price_range, "$$");
        assert_eq!(record.aggregate_rating.average, 4.6);
        assert_eq!(record.aggregate_rating.count, 87);
        assert_eq!(record.external_ids.google_place_id, Some("ChIJ-joes".to_string()));
        assert_eq!(record.external_ids.yelp_id, None);
        assert_eq!(record.slug, "joe-s-garage-toronto");
        assert!(record.hours.is_empty());
        assert!(record.reviews.is_empty());
    }

    #[test]
    fn test_google_details_override_search() {
        let details: GooglePlace = serde_json::from_value(json!({
            "name": "Joe's Garage & Tire",
            "formatted_phone_number": "(416) 555-0100",
            "website": "https://joesgarage.example",
            "price_level": 3,
            "rating": 4.8,
            "opening_hours": {
                "periods": [
                    {"open": {"day": 1, "time": "0900"}, "close": {"day": 1, "time": "1730"}},
                    {"open": {"day": 6, "time": "1000"}, "close": {"day": 6, "time": "1400"}},
                    {"open": {"day": 0, "time": "0000"}}
                ]
            }
        }))
        .unwrap();

        let mapper = GooglePlacesMapper::new();
        let record = mapper.map(PlaceListing::new(joes_garage(), Some(details)));

        assert_eq!(record.name, "Joe's Garage & Tire");
        // search fields survive where details are silent
        assert_eq!(record.location.address.city, "Toronto");
        assert_eq!(record.aggregate_rating.count, 87);
        assert_eq!(record.aggregate_rating.average, 4.8);
        assert_eq!(record.contact.phone, "(416) 555-0100");
        assert_eq!(record.contact.website, "https://joesgarage.example");
        assert_eq!(record.price_range, "$$$");

        assert_eq!(record.hours.len(), 2);
        let monday = &record.hours[&Weekday::Monday];
        assert_eq!(monday.open, "09:00");
        assert_eq!(monday.close, "17:30");
        assert!(!monday.closed);
        assert_eq!(record.hours[&Weekday::Saturday].open, "10:00");
        assert!(!record.hours.contains_key(&Weekday::Sunday));
    }

    #[test]
    fn test_google_reviews_truncated_in_order() {
        let details: GooglePlace = serde_json::from_value(json!({
            "reviews": (1..=8).map(review).collect::<Vec<_>>()
        }))
        .unwrap();

        let mapper = GooglePlacesMapper::new();
        let record = mapper.map(PlaceListing::new(joes_garage(), Some(details)));

        assert_eq!(record.reviews.len(), 5);
        for (i, r) in record.reviews.iter().enumerate() {
            assert_eq!(r.author, format!("Reviewer {}", i + 1));
            assert_eq!(r.source, ReviewSource::Google);
            assert!(r.verified);
            assert_eq!(r.date, timestamp_from_epoch(1_700_000_001 + i as i64));
        }
    }

    #[test]
    fn test_google_review_defaults() {
        let reviews = vec![GoogleReview::default()];
        let parsed = GooglePlacesMapper::parse_reviews(Some(&reviews));

        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].author, "Anonymous");
        assert_eq!(parsed[0].rating, 0.0);
        assert_eq!(parsed[0].text, "");
        assert_eq!(parsed[0].date, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_google_empty_payload_never_fails() {
        let mapper = GooglePlacesMapper::new();
        let record = mapper.map(PlaceListing::new(GooglePlace::default(), Some(GooglePlace::default())));

        assert_eq!(record.name, "");
        assert_eq!(record.category, Category::Mechanics);
        assert_eq!(record.location.address.city, "");
        assert_eq!(record.location.address.province, "");
        assert!(record.location.coordinates.is_unknown());
        assert_eq!(record.price_range, "$$");
        assert_eq!(record.aggregate_rating, AggregateRating::default());
        assert!(!record.has_required_fields());
    }

    #[test]
    fn test_google_merge_prefers_details() {
        let stub = GooglePlace {
            place_id: Some("a".to_string()),
            name: Some("Stub".to_string()),
            rating: Some(3.0),
            ..Default::default()
        };
        let details = GooglePlace {
            name: Some("Detailed".to_string()),
            ..Default::default()
        };

        let merged = stub.merge(details);
        assert_eq!(merged.place_id, Some("a".to_string()));
        assert_eq!(merged.name, Some("Detailed".to_string()));
        assert_eq!(merged.rating, Some(3.0));
    }

    #[test]
    fn test_yelp_mapping() {
        let business: YelpBusiness = serde_json::from_value(json!({
            "id": "yelp-123",
            "name": "Northern Tire Co",
            "categories": [{"alias": "tires", "title": "Tires"}],
            "location": {
                "address1": "42 Granville St",
                "city": "Vancouver",
                "state": "BC",
                "zip_code": "V6C 1T2"
            },
            "coordinates": {"latitude": 49.28, "longitude": -123.11},
            "phone": "+16045550199",
            "url": "https://www.yelp.ca/biz/northern-tire",
            "price": "$$$",
            "rating": 4.5,
            "review_count": 31
        }))
        .unwrap();

        let record = YelpMapper::new().map(business);

        assert_eq!(record.name, "Northern Tire Co");
        assert_eq!(record.category, Category::TireCenters);
        assert_eq!(record.location.address.street, "42 Granville St");
        assert_eq!(record.location.address.province, "BC");
        assert_eq!(record.location.coordinates.latitude, 49.28);
        assert_eq!(record.contact.website, "https://www.yelp.ca/biz/northern-tire");
        assert_eq!(record.price_range, "$$$");
        assert_eq!(record.aggregate_rating.count, 31);
        assert_eq!(record.external_ids.yelp_id, Some("yelp-123".to_string()));
        assert_eq!(record.external_ids.google_place_id, None);
        assert!(record.reviews.is_empty());
        assert!(record.hours.is_empty());
        assert_eq!(record.status, ListingStatus::Pending);
    }

    #[test]
    fn test_yelp_missing_everything() {
        let business: YelpBusiness =
            serde_json::from_value(json!({"name": "Mystery Auto", "coordinates": {"latitude": null, "longitude": null}}))
                .unwrap();

        let record = YelpMapper::new().map(business);

        assert_eq!(record.category, Category::Mechanics);
        assert_eq!(record.price_range, "$$");
        assert!(record.location.coordinates.is_unknown());
        assert_eq!(record.location.address.city, "");
        assert_eq!(record.external_ids.yelp_id, None);
    }
}
