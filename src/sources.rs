// 📡 Source Clients - Google Places text search + details, Yelp business search
// Every failure mode collapses to "no results" with a warning

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

use crate::business::COUNTRY;
use crate::http::{HttpRequest, ResilientCaller};
use crate::parser::{GooglePlace, YelpBusiness};

pub const GOOGLE_TEXT_SEARCH_URL: &str = "https://maps.googleapis.com/maps/api/place/textsearch/json";
pub const GOOGLE_DETAILS_URL: &str = "https://maps.googleapis.com/maps/api/place/details/json";
pub const YELP_SEARCH_URL: &str = "https://api.yelp.com/v3/businesses/search";

/// Fields requested from the details endpoint
pub const GOOGLE_DETAILS_FIELDS: &str = "name,formatted_address,formatted_phone_number,website,rating,user_ratings_total,opening_hours,price_level,photos,reviews,geometry";

/// Yelp page size (the API maximum)
const YELP_LIMIT: &str = "50";

/// Decode each array entry on its own; malformed entries are dropped
fn decode_entries<T: DeserializeOwned>(source: &str, entries: Option<&Vec<Value>>) -> Vec<T> {
    entries
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| match serde_json::from_value::<T>(entry.clone()) {
                    Ok(item) => Some(item),
                    Err(e) => {
                        warn!(source, error = %e, "Skipping malformed result");
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Key guard shared by both clients: warns once per client when unset
struct ApiKey {
    value: Option<String>,
    warned: AtomicBool,
}

impl ApiKey {
    fn new(value: Option<String>) -> Self {
        ApiKey {
            value: value.filter(|v| !v.is_empty()),
            warned: AtomicBool::new(false),
        }
    }

    fn get(&self, env_var: &str) -> Option<&str> {
        if self.value.is_none() && !self.warned.swap(true, Ordering::Relaxed) {
            warn!("{} not set, source disabled", env_var);
        }
        self.value.as_deref()
    }
}

// ============================================================================
// GOOGLE PLACES
// ============================================================================

pub struct GooglePlacesClient {
    key: ApiKey,
    caller: ResilientCaller,
}

impl GooglePlacesClient {
    pub fn new(api_key: Option<String>, caller: ResilientCaller) -> Self {
        GooglePlacesClient {
            key: ApiKey::new(api_key),
            caller,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.key.value.is_some()
    }

    /// `"<term> in <city> Canada"`, results only when the API says OK
    pub fn text_search(&self, term: &str, city: &str) -> Vec<GooglePlace> {
        let Some(key) = self.key.get("GOOGLE_PLACES_API_KEY") else {
            return Vec::new();
        };

        let query = format!("{} in {} {}", term, city, COUNTRY);
        let request = HttpRequest::get(GOOGLE_TEXT_SEARCH_URL)
            .query("query", &query)
            .query("key", key)
            .query("region", "ca");

        let Some(body) = self.caller.call(&request) else {
            return Vec::new();
        };
        if !Self::status_ok(&body, &query) {
            return Vec::new();
        }

        let places: Vec<GooglePlace> = decode_entries("google", body["results"].as_array());
        debug!(%query, count = places.len(), "Text search");
        places
    }

    /// Full details for one place; `None` on any failure
    pub fn place_details(&self, place_id: &str) -> Option<GooglePlace> {
        let key = self.key.get("GOOGLE_PLACES_API_KEY")?;

        let request = HttpRequest::get(GOOGLE_DETAILS_URL)
            .query("place_id", place_id)
            .query("key", key)
            .query("fields", GOOGLE_DETAILS_FIELDS);

        let body = self.caller.call(&request)?;
        if !Self::status_ok(&body, place_id) {
            return None;
        }

        match serde_json::from_value(body["result"].clone()) {
            Ok(place) => Some(place),
            Err(e) => {
                warn!(place_id, error = %e, "Malformed place details");
                None
            }
        }
    }

    fn status_ok(body: &Value, context: &str) -> bool {
        match body["status"].as_str() {
            Some("OK") => true,
            Some("ZERO_RESULTS") => {
                debug!(context, "No results");
                false
            }
            status => {
                warn!(
                    context,
                    status = status.unwrap_or("<missing>"),
                    message = body["error_message"].as_str().unwrap_or(""),
                    "Google Places returned non-OK status"
                );
                false
            }
        }
    }
}

// ============================================================================
// YELP
// ============================================================================

pub struct YelpClient {
    key: ApiKey,
    caller: ResilientCaller,
}

impl YelpClient {
    pub fn new(api_key: Option<String>, caller: ResilientCaller) -> Self {
        YelpClient {
            key: ApiKey::new(api_key),
            caller,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.key.value.is_some()
    }

    /// Automotive businesses matching `term` around `"<city>, Canada"`
    pub fn search(&self, term: &str, city: &str) -> Vec<YelpBusiness> {
        let Some(key) = self.key.get("YELP_API_KEY") else {
            return Vec::new();
        };

        let location = format!("{}, {}", city, COUNTRY);
        let request = HttpRequest::get(YELP_SEARCH_URL)
            .query("term", term)
            .query("location", &location)
            .query("limit", YELP_LIMIT)
            .query("categories", "automotive")
            .header("Authorization", &format!("Bearer {}", key));

        let Some(body) = self.caller.call(&request) else {
            return Vec::new();
        };

        let businesses: Vec<YelpBusiness> = decode_entries("yelp", body["businesses"].as_array());
        debug!(term, %location, count = businesses.len(), "Business search");
        businesses
    }
}

// ============================================================================
// TESTS
// ============================================================================
