#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion stage and result types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The six sequential stages of a snapshot ingest, in commit order.
///
/// Each stage gates the next; a failure aborts the remaining stages and is
/// reported tagged with the stage that produced it. [`Self::MarkDateDone`] is
/// strictly last: its success is the only signal that makes a retry of the
/// same file a no-op.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum IngestStage {
    /// Query the date ledger for an existing entry.
    IdempotencyCheck,
    /// Stream and parse the snapshot file.
    Extract,
    /// Upsert the parsed relay records.
    CommitRelays,
    /// Replace the per-date country histogram.
    CommitCountries,
    /// Refresh the derived per-date aggregate view.
    CommitAggregates,
    /// Write the date-ledger entry.
    MarkDateDone,
}

/// Terminal result of a snapshot ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IngestOutcome {
    /// The file was fully ingested and the date marked done.
    Completed {
        /// Date key derived from the file name.
        date: NaiveDate,
        /// Number of relay records imported.
        num_imported: u64,
        /// Number of malformed lines skipped.
        num_skipped: u64,
    },
    /// The date ledger already contained this date; nothing was written.
    AlreadyIngested {
        /// Date key derived from the file name.
        date: NaiveDate,
    },
}

impl IngestOutcome {
    /// The date key this outcome refers to.
    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        match self {
            Self::Completed { date, .. } | Self::AlreadyIngested { date } => *date,
        }
    }

    /// Returns whether this outcome was an idempotency short-circuit.
    #[must_use]
    pub const fn is_no_op(&self) -> bool {
        matches!(self, Self::AlreadyIngested { .. })
    }
}
