// End-to-end: canned source responses → orchestrator → SQLite store

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use autoilty_scraper::sources::{GOOGLE_DETAILS_URL, GOOGLE_TEXT_SEARCH_URL, YELP_SEARCH_URL};
use autoilty_scraper::testing::{FakeClock, MockTransport};
use autoilty_scraper::{
    BusinessStore, Category, ListingStatus, Orchestrator, ScraperConfig, Weekday,
};

fn config() -> ScraperConfig {
    ScraperConfig {
        google_api_key: Some("g-key".to_string()),
        yelp_api_key: Some("y-key".to_string()),
        request_delay: Duration::from_millis(250),
        ..Default::default()
    }
}

fn transport() -> MockTransport {
    MockTransport::new()
        .with_param_route(
            GOOGLE_TEXT_SEARCH_URL,
            "query",
            "auto repair in Toronto",
            json!({
                "status": "OK",
                "results": [{
                    "place_id": "p-joes",
                    "name": "Joe's Garage",
                    "types": ["car_repair", "point_of_interest"],
                    "address_components": [
                        {"long_name": "123", "short_name": "123", "types": ["street_number"]},
                        {"long_name": "Main St", "short_name": "Main St", "types": ["route"]},
                        {"long_name": "Toronto", "short_name": "Toronto", "types": ["locality"]},
                        {"long_name": "Ontario", "short_name": "ON", "types": ["administrative_area_level_1"]}
                    ],
                    "geometry": {"location": {"lat": 43.65, "lng": -79.38}}
                }]
            }),
        )
        .with_route(GOOGLE_TEXT_SEARCH_URL, json!({"status": "ZERO_RESULTS", "results": []}))
        .with_route(
            GOOGLE_DETAILS_URL,
            json!({
                "status": "OK",
                "result": {
                    "formatted_phone_number": "(416) 555-0100",
                    "price_level": 1,
                    "opening_hours": {"periods": [
                        {"open": {"day": 1, "time": "0800"}, "close": {"day": 1, "time": "1800"}}
                    ]},
                    "reviews": [{"author_name": "Sam", "rating": 5, "text": "Honest shop", "time": 1700000000}]
                }
            }),
        )
        .with_param_route(
            YELP_SEARCH_URL,
            "term",
            "tire shop",
            json!({"businesses": [{
                "id": "y-tire",
                "name": "Northern Tire Co",
                "categories": [{"alias": "tires", "title": "Tires"}],
                "location": {"address1": "9 Front St", "city": "Toronto", "state": "ON", "zip_code": "M5J 1A1"},
                "coordinates": {"latitude": 43.64, "longitude": -79.37},
                "price": "$"
            }]}),
        )
        .with_route(YELP_SEARCH_URL, json!({"businesses": []}))
}

#[test]
fn test_end_to_end_single_city() {
    let store = BusinessStore::open_in_memory().unwrap();
    let config = config();
    let orchestrator =
        Orchestrator::new(&config, &store, Arc::new(transport()), Arc::new(FakeClock::new()));

    let summary = orchestrator.scrape_all(&["Toronto".to_string()]);

    assert_eq!(summary.total_saved, 2);
    assert_eq!(summary.cities.len(), 1);
    assert_eq!(summary.cities[0].saved, 2);
    assert_eq!(store.count().unwrap(), 2);

    let records = store.get_all().unwrap();

    let joes = records.iter().find(|r| r.name == "Joe's Garage").unwrap();
    assert_eq!(joes.category, Category::Mechanics);
    assert_eq!(joes.status, ListingStatus::Pending);
    assert_eq!(joes.location.address.street, "123 Main St");
    assert_eq!(joes.location.address.province, "ON");
    assert_eq!(joes.location.coordinates.latitude, 43.65);
    assert_eq!(joes.contact.phone, "(416) 555-0100");
    assert_eq!(joes.price_range, "$");
    assert_eq!(joes.hours[&Weekday::Monday].open, "08:00");
    assert_eq!(joes.reviews.len(), 1);
    assert_eq!(joes.reviews[0].author, "Sam");
    assert_eq!(joes.external_ids.google_place_id.as_deref(), Some("p-joes"));
    assert_eq!(joes.slug, "joe-s-garage-toronto");

    let tire = records.iter().find(|r| r.name == "Northern Tire Co").unwrap();
    assert_eq!(tire.category, Category::TireCenters);
    assert_eq!(tire.location.address.postal_code, "M5J 1A1");
    assert_eq!(tire.price_range, "$");
    assert_eq!(tire.external_ids.yelp_id.as_deref(), Some("y-tire"));
}

#[test]
fn test_second_run_is_idempotent() {
    let store = BusinessStore::open_in_memory().unwrap();
    let config = config();
    let orchestrator =
        Orchestrator::new(&config, &store, Arc::new(transport()), Arc::new(FakeClock::new()));
    let cities = vec!["Toronto".to_string()];

    assert_eq!(orchestrator.scrape_all(&cities).total_saved, 2);
    assert_eq!(orchestrator.scrape_all(&cities).total_saved, 0);
    assert_eq!(store.count().unwrap(), 2);
}

#[test]
fn test_other_city_gets_nothing_from_toronto_routes() {
    let store = BusinessStore::open_in_memory().unwrap();
    let config = config();
    let transport = Arc::new(transport());
    let clock = Arc::new(FakeClock::new());
    let orchestrator = Orchestrator::new(&config, &store, transport.clone(), clock.clone());

    let summary = orchestrator.scrape_all(&["Regina".to_string()]);

    // Yelp routes on term only, so the tire shop still lands with its own city
    assert_eq!(summary.total_saved, 1);
    assert!(!store.exists("Joe's Garage", "Toronto").unwrap());
    assert!(store.exists("Northern Tire Co", "Toronto").unwrap());

    // Every search term hit both sources, each followed by the request delay
    let searches = transport.calls_to(GOOGLE_TEXT_SEARCH_URL).len();
    assert_eq!(searches, transport.calls_to(YELP_SEARCH_URL).len());
    assert_eq!(clock.sleeps().len(), searches * 2);
    assert!(clock
        .sleeps()
        .iter()
        .all(|d| *d == Duration::from_millis(250)));
}

#[test]
fn test_file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("autoilty.db");
    let config = ScraperConfig {
        database_path: path.clone(),
        ..config()
    };

    {
        let store = BusinessStore::open(&config.database_path).unwrap();
        let orchestrator =
            Orchestrator::new(&config, &store, Arc::new(transport()), Arc::new(FakeClock::new()));
        orchestrator.scrape_all(&["Toronto".to_string()]);
        drop(orchestrator);
        store.close().unwrap();
    }

    let store = BusinessStore::open(&path).unwrap();
    assert_eq!(store.count().unwrap(), 2);
    let counts = store.count_by_category().unwrap();
    assert_eq!(counts.get(&Category::Mechanics), Some(&1));
    assert_eq!(counts.get(&Category::TireCenters), Some(&1));
}

#[test]
fn test_failing_city_does_not_stop_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("autoilty.db");
    let store = BusinessStore::open(&path).unwrap();

    // Break the store behind the scraper's back
    rusqlite::Connection::open(&path)
        .unwrap()
        .execute("DROP TABLE businesses", [])
        .unwrap();

    let config = config();
    let transport = Arc::new(transport());
    let orchestrator =
        Orchestrator::new(&config, &store, transport.clone(), Arc::new(FakeClock::new()));

    let summary = orchestrator.scrape_all(&["Toronto".to_string(), "Calgary".to_string()]);

    assert_eq!(summary.cities.len(), 2);
    assert_eq!(summary.cities[0].city, "Toronto");
    assert_eq!(summary.cities[1].city, "Calgary");
    assert_eq!(summary.failed_cities().count(), 2);
    assert!(summary.cities[0]
        .error
        .as_deref()
        .unwrap()
        .contains("no such table"));
    assert_eq!(summary.total_saved, 0);

    // Calgary was still scraped after Toronto failed
    assert!(transport
        .calls_to(GOOGLE_TEXT_SEARCH_URL)
        .iter()
        .any(|r| r.param("query") == Some("auto repair in Calgary Canada")));
}
