#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Library for ingesting daily relay snapshot files into persistent storage.
//!
//! Each snapshot file is ingested exactly once per calendar date. The
//! pipeline runs six strictly sequential stages (see
//! [`relay_metrics_ingest_models::IngestStage`]); the date-ledger write is
//! strictly last, so a failure at any earlier stage leaves the date unmarked
//! and a retry of the same file simply redoes the idempotent store writes.

pub mod histogram;
pub mod store;

use std::path::{Path, PathBuf};
use std::time::Instant;

use relay_metrics_ingest_models::{IngestOutcome, IngestStage};
use relay_metrics_snapshot::{date_key, extract};

use crate::store::{CountryStore, DateLedgerStore, RelayStore, StoreError};

/// A failed ingest, tagged with the stage that produced it.
#[derive(Debug, thiserror::Error)]
#[error("ingest stage {stage} failed: {source}")]
pub struct IngestError {
    /// The stage that failed; no later stage was attempted.
    pub stage: IngestStage,
    /// The underlying cause.
    #[source]
    pub source: StoreError,
}

impl IngestError {
    /// Builds a `map_err` closure tagging an error with `stage`.
    fn at<E>(stage: IngestStage) -> impl FnOnce(E) -> Self
    where
        E: Into<StoreError>,
    {
        move |source| Self {
            stage,
            source: source.into(),
        }
    }
}

/// Ingests one snapshot file through the staged commit sequence.
///
/// Stage order: idempotency check, extract, commit relays, commit countries,
/// commit aggregates, mark date done. Each stage gates the next; the first
/// failure aborts the rest. No stage is retried and nothing is rolled back;
/// earlier stages' writes stay in place, which is safe because every store
/// write is an idempotent upsert and the date is only marked done at the
/// very end.
///
/// A date that already has a ledger entry short-circuits to
/// [`IngestOutcome::AlreadyIngested`] without touching any other store.
///
/// # Errors
///
/// Returns [`IngestError`] naming the failed stage and the underlying cause.
pub async fn ingest_snapshot(
    dates: &dyn DateLedgerStore,
    relays: &dyn RelayStore,
    countries: &dyn CountryStore,
    path: &Path,
) -> Result<IngestOutcome, IngestError> {
    let start = Instant::now();

    let date = date_key::derive_date(path).map_err(IngestError::at(IngestStage::IdempotencyCheck))?;

    if dates
        .exists(date)
        .await
        .map_err(IngestError::at(IngestStage::IdempotencyCheck))?
    {
        log::info!("{date}: already ingested, skipping {}", path.display());
        return Ok(IngestOutcome::AlreadyIngested { date });
    }

    let extraction = extract(path)
        .await
        .map_err(IngestError::at(IngestStage::Extract))?;

    let written = relays
        .upsert_relays(&extraction.records)
        .await
        .map_err(IngestError::at(IngestStage::CommitRelays))?;
    log::info!("{date}: committed {written} relay rows");

    let histogram = histogram::build_histogram(&extraction.guard_clients);
    countries
        .replace_histogram(date, &histogram)
        .await
        .map_err(IngestError::at(IngestStage::CommitCountries))?;
    log::info!("{date}: committed {} country entries", histogram.len());

    relays
        .refresh_aggregates(date)
        .await
        .map_err(IngestError::at(IngestStage::CommitAggregates))?;

    dates
        .mark_done(date)
        .await
        .map_err(IngestError::at(IngestStage::MarkDateDone))?;

    let num_imported = extraction.records.len() as u64;
    let num_skipped = extraction.num_skipped;
    log::info!(
        "{date}: ingest complete, {num_imported} imported, {num_skipped} skipped, took {:.1}s",
        start.elapsed().as_secs_f64()
    );

    Ok(IngestOutcome::Completed {
        date,
        num_imported,
        num_skipped,
    })
}

/// Collects the snapshot files in `dir`, sorted for deterministic order.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn collect_snapshots(dir: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "csv"))
        .collect();

    paths.sort();
    Ok(paths)
}

/// Ingests every snapshot file in `dir`, one at a time, in sorted order.
///
/// An individual file's failure is logged and the scan continues with the
/// next file; only a failure to read the directory itself aborts.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub async fn ingest_directory(
    dates: &dyn DateLedgerStore,
    relays: &dyn RelayStore,
    countries: &dyn CountryStore,
    dir: &Path,
) -> Result<Vec<IngestOutcome>, Box<dyn std::error::Error>> {
    let paths = collect_snapshots(dir)?;
    log::info!("Found {} snapshot file(s) in {}", paths.len(), dir.display());

    let mut outcomes = Vec::with_capacity(paths.len());

    for path in &paths {
        match ingest_snapshot(dates, relays, countries, path).await {
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => log::error!("Failed to ingest {}: {e}", path.display()),
        }
    }

    Ok(outcomes)
}
