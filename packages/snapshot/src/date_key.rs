//! Filename-to-date derivation.
//!
//! Snapshot files follow the `<prefix>-YYYY-MM-DD.<ext>` naming convention.
//! The derived date doubles as the idempotency key for the whole ingest run,
//! so a name that does not match the convention is rejected loudly instead of
//! silently yielding a garbage key.

use std::path::Path;

use chrono::NaiveDate;

use crate::SnapshotError;

/// Number of characters in the `YYYY-MM-DD` suffix of a file stem.
const DATE_LEN: usize = 10;

/// Derives the canonical date key from a snapshot file path.
///
/// The date is the trailing `YYYY-MM-DD` of the file stem, separated from the
/// prefix by a `-`. Examples: `relays-2024-03-01.csv` → `2024-03-01`,
/// `guard-clients-2024-03-01.csv` → `2024-03-01`.
///
/// # Errors
///
/// Returns [`SnapshotError::Filename`] if the stem is too short, the prefix
/// separator is missing, or the suffix is not a real calendar date.
pub fn derive_date(path: &Path) -> Result<NaiveDate, SnapshotError> {
    let err = || SnapshotError::Filename {
        path: path.display().to_string(),
    };

    let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(err)?;

    if stem.len() <= DATE_LEN {
        return Err(err());
    }

    let (prefix, suffix) = stem.split_at(stem.len() - DATE_LEN);
    if !prefix.ends_with('-') || prefix.len() == 1 {
        return Err(err());
    }

    NaiveDate::parse_from_str(suffix, "%Y-%m-%d").map_err(|_| err())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn derives_date_from_simple_name() {
        let path = PathBuf::from("/data/relays-2024-03-01.csv");
        assert_eq!(derive_date(&path).unwrap(), date("2024-03-01"));
    }

    #[test]
    fn derives_date_from_dashed_prefix() {
        let path = PathBuf::from("guard-clients-2019-12-31.csv");
        assert_eq!(derive_date(&path).unwrap(), date("2019-12-31"));
    }

    #[test]
    fn rejects_name_without_date() {
        let path = PathBuf::from("relays.csv");
        assert!(matches!(
            derive_date(&path),
            Err(SnapshotError::Filename { .. })
        ));
    }

    #[test]
    fn rejects_name_without_prefix() {
        let path = PathBuf::from("2024-03-01.csv");
        assert!(matches!(
            derive_date(&path),
            Err(SnapshotError::Filename { .. })
        ));
    }

    #[test]
    fn rejects_impossible_calendar_date() {
        let path = PathBuf::from("relays-2024-13-41.csv");
        assert!(matches!(
            derive_date(&path),
            Err(SnapshotError::Filename { .. })
        ));
    }

    #[test]
    fn rejects_date_not_separated_by_dash() {
        let path = PathBuf::from("relays2024-03-01.csv");
        assert!(matches!(
            derive_date(&path),
            Err(SnapshotError::Filename { .. })
        ));
    }
}
