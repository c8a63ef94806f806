use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Cities scraped when nothing else is configured
pub const DEFAULT_TEST_CITIES: [&str; 4] = ["Toronto", "Vancouver", "Montreal", "Calgary"];

/// Full national sweep (`--all`)
pub const MAJOR_CITIES: [&str; 24] = [
    "Toronto",
    "Montreal",
    "Vancouver",
    "Calgary",
    "Edmonton",
    "Ottawa",
    "Winnipeg",
    "Quebec City",
    "Hamilton",
    "Kitchener",
    "London",
    "Victoria",
    "Halifax",
    "Oshawa",
    "Windsor",
    "Saskatoon",
    "Regina",
    "Sherbrooke",
    "Barrie",
    "St. John's",
    "Kelowna",
    "Abbotsford",
    "Kingston",
    "Trois-Rivières",
];

const DEFAULT_DATABASE_PATH: &str = "autoilty.db";
const DEFAULT_DELAY_MS: u64 = 2000;
const DEFAULT_MAX_PER_CATEGORY: usize = 20;

/// Pause between cities, as a multiple of the per-request delay
const CITY_DELAY_FACTOR: u32 = 5;

/// Scraper configuration, built once at startup and passed by reference.
/// A missing source key disables that source.
#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub google_api_key: Option<String>,
    pub yelp_api_key: Option<String>,
    pub database_path: PathBuf,
    /// Pause after each source query
    pub request_delay: Duration,
    /// Only the first N results of each query are processed
    pub max_per_category: usize,
    pub cities: Vec<String>,
}

impl ScraperConfig {
    /// Load `.env` (if present) and read the process environment
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_lookup(|key| std::env::var(key).ok())?;
        config.log_keys();
        Ok(config)
    }

    /// Build from any key → value lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let request_delay = match non_empty("SCRAPE_DELAY_MS") {
            Some(raw) => raw
                .parse::<u64>()
                .with_context(|| format!("SCRAPE_DELAY_MS must be milliseconds, got {:?}", raw))?,
            None => DEFAULT_DELAY_MS,
        };

        let max_per_category = match non_empty("MAX_PER_CATEGORY") {
            Some(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("MAX_PER_CATEGORY must be a count, got {:?}", raw))?,
            None => DEFAULT_MAX_PER_CATEGORY,
        };

        let cities: Vec<String> = non_empty("SCRAPE_CITIES")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect();

        Ok(ScraperConfig {
            google_api_key: non_empty("GOOGLE_PLACES_API_KEY"),
            yelp_api_key: non_empty("YELP_API_KEY"),
            database_path: non_empty("DATABASE_PATH")
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string())
                .into(),
            request_delay: Duration::from_millis(request_delay),
            max_per_category,
            cities: if cities.is_empty() {
                DEFAULT_TEST_CITIES.iter().map(|c| c.to_string()).collect()
            } else {
                cities
            },
        })
    }

    /// Pause between two cities
    pub fn city_delay(&self) -> Duration {
        self.request_delay * CITY_DELAY_FACTOR
    }

    pub fn major_cities() -> Vec<String> {
        MAJOR_CITIES.iter().map(|c| c.to_string()).collect()
    }

    fn log_keys(&self) {
        fn redact(val: &Option<String>) -> String {
            match val {
                Some(v) => format!("<set> ({} chars)", v.len()),
                None => "<not set>".to_string(),
            }
        }

        tracing::info!("Config loaded:");
        tracing::info!("  GOOGLE_PLACES_API_KEY: {}", redact(&self.google_api_key));
        tracing::info!("  YELP_API_KEY: {}", redact(&self.yelp_api_key));
        tracing::info!("  DATABASE_PATH: {}", self.database_path.display());
        tracing::info!("  SCRAPE_DELAY_MS: {}", self.request_delay.as_millis());
        tracing::info!("  MAX_PER_CATEGORY: {}", self.max_per_category);
        tracing::info!("  SCRAPE_CITIES: {}", self.cities.join(", "));
    }
}

impl Default for ScraperConfig {
    fn default() -> Self {
        ScraperConfig {
            google_api_key: None,
            yelp_api_key: None,
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            request_delay: Duration::from_millis(DEFAULT_DELAY_MS),
            max_per_category: DEFAULT_MAX_PER_CATEGORY,
            cities: DEFAULT_TEST_CITIES.iter().map(|c| c.to_string()).collect(),
        }
    }
}
