#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Snapshot file grammar and the streaming line extractor.
//!
//! A snapshot file carries one day's relay observations: a fixed header line
//! followed by one comma-separated record per relay. Files are named
//! `<prefix>-YYYY-MM-DD.csv`; the date in the name is the date stamped on
//! every record parsed out of the file.

pub mod date_key;
pub mod extract;
pub mod parsing;

pub use extract::{Extraction, extract};

/// Errors that abort processing of a snapshot file.
///
/// Note that a malformed *data line* is not an error; the extractor skips
/// it and keeps going. These variants are the fatal, whole-file conditions.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Reading the file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file name does not follow the `<prefix>-YYYY-MM-DD.<ext>`
    /// convention, so no date key can be derived.
    #[error("cannot derive a date from snapshot filename: {path}")]
    Filename {
        /// The offending path.
        path: String,
    },

    /// The first line of the file is not the expected header.
    #[error("unexpected snapshot header: expected {expected:?}, found {found:?}")]
    Header {
        /// The header the grammar requires.
        expected: &'static str,
        /// The first line actually read.
        found: String,
    },

    /// The file contained no lines at all.
    #[error("snapshot file is empty: {path}")]
    Empty {
        /// The offending path.
        path: String,
    },
}
