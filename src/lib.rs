// Autoilty Scraper - Core Library
// Canadian automotive listings: fetch, normalize, classify, dedupe, store

pub mod business;
pub mod category;
pub mod address;
pub mod parser;
pub mod db;
pub mod deduplication;
pub mod error;
pub mod http;
pub mod sources;
pub mod config;
pub mod orchestrator;
pub mod testing;

// Re-export commonly used types
pub use business::{
    Address, AggregateRating, BusinessHours, BusinessRecord, Contact, Coordinates, DayHours,
    ExternalIds, ListingStatus, Location, Review, ReviewSource, Weekday,
    identity_hash, slugify,
};
pub use category::{Category, CategoryClassifier, CategoryRule, DEFAULT_CATEGORY};
pub use address::{
    AddressComponent, FlatAddress, NormalizedAddress,
    normalize_components, normalize_flat, normalize_province, province_code,
};
pub use parser::{
    GooglePlace, GooglePlacesMapper, ListingMapper, PlaceListing, SourceType,
    YelpBusiness, YelpMapper, format_hhmm, price_range_from_level,
};
pub use db::{BusinessStore, Event, setup_database};
pub use deduplication::{DeduplicationGate, SaveOutcome};
pub use error::{FetchError, FetchResult};
pub use http::{
    Clock, HttpRequest, RateLimit, RateLimiter, ResilientCaller, RetryPolicy,
    SystemClock, Transport, UreqTransport,
};
pub use sources::{GooglePlacesClient, YelpClient};
pub use config::{ScraperConfig, DEFAULT_TEST_CITIES, MAJOR_CITIES};
pub use orchestrator::{CitySummary, Orchestrator, RunSummary};
