// 🔍 Deduplication Gate - the single write path into the store
// A listing is the same listing when its exact (name, city) pair is already stored

use anyhow::Result;
use tracing::{debug, error, warn};

use crate::business::BusinessRecord;
use crate::db::BusinessStore;

// ============================================================================
// SAVE OUTCOME
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// New listing written to the store
    Saved,

    /// `(name, city)` already stored; nothing written
    Duplicate,

    /// Empty name or city; nothing written
    MissingRequiredFields,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved)
    }
}

// ============================================================================
// DEDUPLICATION GATE
// ============================================================================

/// Check-then-insert gate. There is no lock between the check and the
/// insert; the store's unique identity index is the backstop for a
/// concurrent writer.
pub struct DeduplicationGate<'a> {
    store: &'a BusinessStore,
}

impl<'a> DeduplicationGate<'a> {
    pub fn new(store: &'a BusinessStore) -> Self {
        DeduplicationGate { store }
    }

    /// Exact, case-sensitive lookup
    pub fn exists(&self, name: &str, city: &str) -> Result<bool> {
        self.store.exists(name, city)
    }

    /// Validate, check, insert. Store errors propagate.
    pub fn try_save(&self, record: &BusinessRecord) -> Result<SaveOutcome> {
        if !record.has_required_fields() {
            warn!(
                name = %record.name,
                city = %record.city(),
                "Skipping listing with missing name or city"
            );
            return Ok(SaveOutcome::MissingRequiredFields);
        }

        if self.exists(&record.name, record.city())? {
            debug!(name = %record.name, city = %record.city(), "Already stored");
            return Ok(SaveOutcome::Duplicate);
        }

        if self.store.insert(record)? {
            debug!(name = %record.name, city = %record.city(), category = %record.category, "Saved");
            Ok(SaveOutcome::Saved)
        } else {
            // Lost the race to another writer between check and insert
            Ok(SaveOutcome::Duplicate)
        }
    }

    /// True only when a new record was written. Never fails: store errors
    /// are logged and reported as false.
    pub fn save(&self, record: &BusinessRecord) -> bool {
        match self.try_save(record) {
            Ok(outcome) => outcome.is_saved(),
            Err(e) => {
                error!(name = %record.name, city = %record.city(), error = %e, "Failed to save listing");
                false
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
