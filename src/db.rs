use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::business::BusinessRecord;
use crate::category::Category;

/// Event for the audit trail. Every stored listing leaves one behind.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

/// Persistent collection of canonical listings (SQLite)
pub struct BusinessStore {
    conn: Connection,
}

impl BusinessStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;
        setup_database(&conn)?;
        Ok(BusinessStore { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        setup_database(&conn)?;
        Ok(BusinessStore { conn })
    }

    /// Point lookup on the exact `(name, city)` pair
    pub fn exists(&self, name: &str, city: &str) -> Result<bool> {
        let hash = crate::business::identity_hash(name, city);
        let found: i64 = self
            .conn
            .query_row(
                "SELECT EXISTS(
                    SELECT 1 FROM businesses
                    WHERE identity_hash = ?1 AND name = ?2 AND city = ?3
                 )",
                params![hash, name, city],
                |row| row.get(0),
            )
            .context("Failed to look up business")?;

        Ok(found != 0)
    }

    /// Insert one record. Returns false when the `(name, city)` pair is
    /// already present (the unique index catches a racing writer).
    pub fn insert(&self, record: &BusinessRecord) -> Result<bool> {
        let document = serde_json::to_string(record)?;

        let result = self.conn.execute(
            "INSERT INTO businesses (
                record_id, identity_hash, name, city, slug, category, province,
                status, last_scraped, document
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                record.id,
                record.identity_hash(),
                record.name,
                record.city(),
                record.slug,
                record.category.as_str(),
                record.location.address.province,
                record.status.as_str(),
                record.last_scraped.to_rfc3339(),
                document,
            ],
        );

        match result {
            Ok(_) => {
                let event = Event::new(
                    "business_added",
                    "business",
                    &record.id,
                    serde_json::json!({
                        "name": record.name,
                        "city": record.city(),
                        "category": record.category.as_str(),
                        "external_ids": record.external_ids,
                    }),
                    "scraper",
                );
                if let Err(e) = self.insert_event(&event) {
                    tracing::warn!(record_id = %record.id, error = %e, "Failed to append audit event");
                }
                Ok(true)
            }
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Ok(false)
            }
            Err(e) => Err(e).context("Failed to insert business"),
        }
    }

    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM businesses", [], |row| row.get(0))?;

        Ok(count)
    }

    /// All stored records, oldest first
    pub fn get_all(&self) -> Result<Vec<BusinessRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT document FROM businesses ORDER BY id ASC")?;

        let documents = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        documents
            .iter()
            .map(|doc| serde_json::from_str(doc).context("Corrupt business document"))
            .collect()
    }

    /// Stored-record counts per category. Unknown category strings are skipped.
    pub fn count_by_category(&self) -> Result<BTreeMap<Category, i64>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, COUNT(*) FROM businesses
             GROUP BY category
             ORDER BY category",
        )?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = BTreeMap::new();
        for (category, count) in rows {
            match category.parse::<Category>() {
                Ok(category) => {
                    counts.insert(category, count);
                }
                Err(_) => tracing::warn!(%category, "Skipping unknown category in store"),
            }
        }

        Ok(counts)
    }

    /// Insert event into audit trail
    pub fn insert_event(&self, event: &Event) -> Result<()> {
        let data_json = serde_json::to_string(&event.data)?;

        self.conn.execute(
            "INSERT INTO events (
                event_id, timestamp, event_type, entity_type, entity_id, data, actor
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.event_id,
                event.timestamp.to_rfc3339(),
                event.event_type,
                event.entity_type,
                event.entity_id,
                data_json,
                event.actor,
            ],
        )?;

        Ok(())
    }

    /// Events for one entity, newest first
    pub fn events_for_entity(&self, entity_type: &str, entity_id: &str) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
             FROM events
             WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY timestamp DESC",
        )?;

        let events = stmt
            .query_map(params![entity_type, entity_id], |row| {
                let timestamp_str: String = row.get(1)?;
                let data_json: String = row.get(5)?;

                Ok(Event {
                    event_id: row.get(0)?,
                    timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                        .map_err(|_| rusqlite::Error::InvalidQuery)?
                        .with_timezone(&Utc),
                    event_type: row.get(2)?,
                    entity_type: row.get(3)?,
                    entity_id: row.get(4)?,
                    data: serde_json::from_str(&data_json)
                        .map_err(|_| rusqlite::Error::InvalidQuery)?,
                    actor: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(events)
    }

    /// Flush and release the connection
    pub fn close(self) -> Result<()> {
        self.conn
            .close()
            .map_err(|(_, e)| e)
            .context("Failed to close database")
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery; in-memory databases answer "memory"
    let _mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;

    // ==========================================================================
    // Businesses Table (full record kept as a JSON document)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS businesses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            record_id TEXT UNIQUE NOT NULL,
            identity_hash TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            city TEXT NOT NULL,
            slug TEXT NOT NULL,
            category TEXT NOT NULL,
            province TEXT,
            status TEXT NOT NULL,
            last_scraped TEXT NOT NULL,
            document TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Events Table (audit trail)
    // ==========================================================================
    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_name_city ON businesses(name, city)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_category ON businesses(category)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}
