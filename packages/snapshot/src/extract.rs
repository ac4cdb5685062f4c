//! Streaming snapshot extraction.
//!
//! Reads a snapshot file line by line, verifying the header and folding the
//! data lines into relay records and per-relay guard-client maps. Malformed
//! lines are counted and skipped; only whole-file conditions (bad filename,
//! bad header, I/O) abort the extraction.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use relay_metrics_relay_models::{GuardClientMap, RelayRecord};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt as _, BufReader};

use crate::parsing::{parse_guard_clients, parse_relay_line, verify_header};
use crate::{SnapshotError, date_key};

/// Everything a snapshot file folds down to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// Valid relay records, in file order.
    pub records: Vec<RelayRecord>,
    /// Number of malformed data lines that were skipped.
    pub num_skipped: u64,
    /// Guard-client map per relay fingerprint. A later line for the same
    /// fingerprint overwrites the earlier one.
    pub guard_clients: BTreeMap<String, GuardClientMap>,
    /// Date key derived from the file name.
    pub date: NaiveDate,
}

/// Streams `path` line by line and accumulates an [`Extraction`].
///
/// The date key is derived from the file name before the file is opened, so
/// a misnamed file fails before any I/O. The first line is consumed solely
/// for header verification. Each subsequent non-blank line is parsed into its
/// two derived views, the relay record and the guard-client map; if either
/// view is malformed the line is skipped, the skip counter increments, and
/// nothing is recorded for that line.
///
/// # Errors
///
/// Returns [`SnapshotError`] on an underivable filename, an empty file, a
/// header mismatch, or any I/O failure while reading.
pub async fn extract(path: &Path) -> Result<Extraction, SnapshotError> {
    let date = date_key::derive_date(path)?;

    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let header = lines
        .next_line()
        .await?
        .ok_or_else(|| SnapshotError::Empty {
            path: path.display().to_string(),
        })?;
    verify_header(&header)?;

    let mut records = Vec::new();
    let mut num_skipped: u64 = 0;
    let mut guard_clients: BTreeMap<String, GuardClientMap> = BTreeMap::new();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let record = parse_relay_line(&line, date);
        let clients = parse_guard_clients(&line, date);

        match (record, clients) {
            (Some(record), Some(clients)) => {
                guard_clients.insert(record.fingerprint.clone(), clients);
                records.push(record);
            }
            _ => {
                num_skipped += 1;
                log::debug!("Skipping malformed line in {}", path.display());
            }
        }
    }

    log::info!(
        "Extracted {} from {}: {} records, {num_skipped} skipped",
        date,
        path.display(),
        records.len()
    );

    Ok(Extraction {
        records,
        num_skipped,
        guard_clients,
        date,
    })
}
