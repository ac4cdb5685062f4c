//! Storage collaborator contracts and the Postgres adapter.
//!
//! The orchestrator only ever talks to these traits. Every write they expose
//! is required to be an idempotent upsert or per-date replacement, which is
//! what lets the pipeline retry a whole file after a late-stage failure
//! without compensation logic.

use async_trait::async_trait;
use chrono::NaiveDate;
use relay_metrics_database::queries;
use relay_metrics_relay_models::{CountryHistogram, RelayRecord};
use switchy_database::Database;

/// Error type surfaced by store collaborators.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// The date ledger: the authoritative record of which dates have completed
/// ingestion.
#[async_trait]
pub trait DateLedgerStore: Send + Sync {
    /// Returns whether `date` already has a ledger entry.
    async fn exists(&self, date: NaiveDate) -> Result<bool, StoreError>;

    /// Records `date` as fully ingested. Idempotent: repeating the call for
    /// the same date must not be an error.
    async fn mark_done(&self, date: NaiveDate) -> Result<(), StoreError>;
}

/// Persistent storage for relay records and their derived per-date
/// aggregates.
#[async_trait]
pub trait RelayStore: Send + Sync {
    /// Writes the records, overwriting any existing row per
    /// (fingerprint, date). Returns the number of rows written.
    async fn upsert_relays(&self, records: &[RelayRecord]) -> Result<u64, StoreError>;

    /// Recomputes the derived aggregate view for `date`. Idempotent.
    async fn refresh_aggregates(&self, date: NaiveDate) -> Result<(), StoreError>;
}

/// Persistent storage for per-date country histograms.
#[async_trait]
pub trait CountryStore: Send + Sync {
    /// Replaces the stored histogram for `date`. Idempotent on retry.
    async fn replace_histogram(
        &self,
        date: NaiveDate,
        histogram: &CountryHistogram,
    ) -> Result<(), StoreError>;
}

/// Postgres-backed implementation of all three store contracts.
pub struct PgStore {
    db: Box<dyn Database>,
}

impl PgStore {
    /// Wraps an open database connection.
    #[must_use]
    pub fn new(db: Box<dyn Database>) -> Self {
        Self { db }
    }

    /// The underlying connection.
    #[must_use]
    pub fn db(&self) -> &dyn Database {
        self.db.as_ref()
    }
}

#[async_trait]
impl DateLedgerStore for PgStore {
    async fn exists(&self, date: NaiveDate) -> Result<bool, StoreError> {
        Ok(queries::date_exists(self.db(), date).await?)
    }

    async fn mark_done(&self, date: NaiveDate) -> Result<(), StoreError> {
        Ok(queries::mark_date_done(self.db(), date).await?)
    }
}

#[async_trait]
impl RelayStore for PgStore {
    async fn upsert_relays(&self, records: &[RelayRecord]) -> Result<u64, StoreError> {
        Ok(queries::upsert_relays(self.db(), records).await?)
    }

    async fn refresh_aggregates(&self, date: NaiveDate) -> Result<(), StoreError> {
        Ok(queries::refresh_relay_aggregates(self.db(), date).await?)
    }
}

#[async_trait]
impl CountryStore for PgStore {
    async fn replace_histogram(
        &self,
        date: NaiveDate,
        histogram: &CountryHistogram,
    ) -> Result<(), StoreError> {
        Ok(queries::replace_country_histogram(self.db(), date, histogram).await?)
    }
}
