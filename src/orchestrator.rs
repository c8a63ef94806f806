// 🚗 Orchestrator - cities × categories × search terms, both sources, one gate
// Sequential by design: one outbound request in flight, pacing via the clock

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::category::Category;
use crate::config::ScraperConfig;
use crate::db::BusinessStore;
use crate::deduplication::{DeduplicationGate, SaveOutcome};
use crate::http::{Clock, RateLimit, ResilientCaller, RetryPolicy, SystemClock, Transport, UreqTransport};
use crate::parser::{GooglePlacesMapper, ListingMapper, PlaceListing, YelpMapper};
use crate::sources::{GooglePlacesClient, YelpClient};

// ============================================================================
// RUN SUMMARY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CitySummary {
    pub city: String,
    /// Newly stored listings
    pub saved: usize,
    /// Set when the city was aborted
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub cities: Vec<CitySummary>,
    pub total_saved: usize,
    pub elapsed: Duration,
    /// Stopped early by an interrupt
    pub interrupted: bool,
}

impl RunSummary {
    pub fn failed_cities(&self) -> impl Iterator<Item = &CitySummary> {
        self.cities.iter().filter(|c| c.error.is_some())
    }
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

pub struct Orchestrator<'a> {
    config: &'a ScraperConfig,
    gate: DeduplicationGate<'a>,
    google: GooglePlacesClient,
    yelp: YelpClient,
    google_mapper: GooglePlacesMapper,
    yelp_mapper: YelpMapper,
    clock: Arc<dyn Clock>,
    interrupt: Arc<AtomicBool>,
}

impl<'a> Orchestrator<'a> {
    /// Wire both sources over the given transport and clock
    pub fn new(
        config: &'a ScraperConfig,
        store: &'a BusinessStore,
        transport: Arc<dyn Transport>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let google_caller = ResilientCaller::new(
            "google",
            transport.clone(),
            clock.clone(),
            RetryPolicy::default(),
            RateLimit::google_places(),
        );
        let yelp_caller = ResilientCaller::new(
            "yelp",
            transport,
            clock.clone(),
            RetryPolicy::default(),
            RateLimit::yelp(),
        );

        Orchestrator {
            config,
            gate: DeduplicationGate::new(store),
            google: GooglePlacesClient::new(config.google_api_key.clone(), google_caller),
            yelp: YelpClient::new(config.yelp_api_key.clone(), yelp_caller),
            google_mapper: GooglePlacesMapper::new(),
            yelp_mapper: YelpMapper::new(),
            clock,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Real network and wall-clock time
    pub fn live(config: &'a ScraperConfig, store: &'a BusinessStore) -> Self {
        Self::new(config, store, Arc::new(UreqTransport::new()), Arc::new(SystemClock))
    }

    /// Share an interrupt flag (set from a signal handler)
    pub fn with_interrupt(mut self, interrupt: Arc<AtomicBool>) -> Self {
        self.interrupt = interrupt;
        self
    }

    fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    /// Scrape every city in order. A failing city is logged and skipped.
    pub fn scrape_all(&self, cities: &[String]) -> RunSummary {
        let started = self.clock.now();
        let mut summary = RunSummary::default();

        if !self.google.is_enabled() && !self.yelp.is_enabled() {
            warn!("No source API keys configured, nothing will be scraped");
        }

        info!(cities = cities.len(), "Starting scrape");

        for (i, city) in cities.iter().enumerate() {
            if self.interrupted() {
                warn!(remaining = cities.len() - i, "Interrupted, stopping before next city");
                summary.interrupted = true;
                break;
            }

            if i > 0 {
                self.clock.sleep(self.config.city_delay());
            }

            info!(%city, "Scraping city");
            let city_summary = match self.scrape_city(city) {
                Ok(saved) => {
                    info!(%city, saved, "City complete");
                    CitySummary {
                        city: city.clone(),
                        saved,
                        error: None,
                    }
                }
                Err(e) => {
                    error!(%city, error = %e, "City failed, moving on");
                    CitySummary {
                        city: city.clone(),
                        saved: 0,
                        error: Some(format!("{:#}", e)),
                    }
                }
            };

            summary.total_saved += city_summary.saved;
            summary.cities.push(city_summary);
        }

        summary.elapsed = self.clock.now().saturating_duration_since(started);

        for city in &summary.cities {
            info!(city = %city.city, saved = city.saved, "Summary");
        }
        info!(
            total_saved = summary.total_saved,
            elapsed_minutes = summary.elapsed.as_secs_f64() / 60.0,
            interrupted = summary.interrupted,
            "Scrape finished"
        );

        summary
    }

    /// Every category and term for one city; returns newly stored count.
    /// Store failures abort the city.
    pub fn scrape_city(&self, city: &str) -> Result<usize> {
        let mut saved = 0;

        for category in Category::searchable() {
            for term in category.search_terms() {
                if self.interrupted() {
                    return Ok(saved);
                }

                saved += self.scrape_google(term, city)?;
                saved += self.scrape_yelp(term, city)?;
            }
        }

        Ok(saved)
    }

    fn scrape_google(&self, term: &str, city: &str) -> Result<usize> {
        if !self.google.is_enabled() {
            return Ok(0);
        }

        let mut saved = 0;
        for place in self.google.text_search(term, city).into_iter().take(self.config.max_per_category) {
            let details = match place.place_id.as_deref() {
                Some(id) => {
                    let details = self.google.place_details(id);
                    self.clock.sleep(self.config.request_delay);
                    details
                }
                None => None,
            };

            if self.save_mapped(&self.google_mapper, PlaceListing::new(place, details))? {
                saved += 1;
            }
        }

        self.clock.sleep(self.config.request_delay);
        Ok(saved)
    }

    fn scrape_yelp(&self, term: &str, city: &str) -> Result<usize> {
        if !self.yelp.is_enabled() {
            return Ok(0);
        }

        let mut saved = 0;
        for business in self.yelp.search(term, city).into_iter().take(self.config.max_per_category) {
            if self.save_mapped(&self.yelp_mapper, business)? {
                saved += 1;
            }
        }

        self.clock.sleep(self.config.request_delay);
        Ok(saved)
    }

    /// Map one raw listing and pass it through the gate; true when newly stored
    fn save_mapped<M: ListingMapper>(&self, mapper: &M, raw: M::Raw) -> Result<bool> {
        let record = mapper.map(raw);
        let outcome = self.gate.try_save(&record)?;

        debug!(
            source = mapper.source_type().code(),
            name = %record.name,
            city = %record.city(),
            ?outcome,
            "Listing processed"
        );

        Ok(outcome == SaveOutcome::Saved)
    }
}

// ============================================================================
// TESTS
// ============================================================================
