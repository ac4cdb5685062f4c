//! Pure line-level parsing for snapshot files.
//!
//! A data line has exactly [`FIELD_COUNT`] comma-separated fields:
//!
//! ```text
//! fingerprint,nickname,country,flags,advertised_bandwidth,consensus_weight,guard_clients
//! ```
//!
//! `flags` is zero or more flag names joined by `+`; `guard_clients` is zero
//! or more `cc:count` pairs joined by `|`. A line whose field count or field
//! shape is invalid is *malformed* (a `None` sentinel, not an error) and
//! must never abort the containing stream.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use relay_metrics_relay_models::{
    GuardClientMap, RelayFlag, RelayRecord, is_valid_country_code, is_valid_fingerprint,
};

/// The exact header line every snapshot file must start with.
pub const HEADER: &str =
    "fingerprint,nickname,country,flags,advertised_bandwidth,consensus_weight,guard_clients";

/// Number of comma-separated fields in a data line.
pub const FIELD_COUNT: usize = 7;

/// Longest permitted relay nickname.
const MAX_NICKNAME_LEN: usize = 19;

/// Verifies that `line` is the expected snapshot header.
///
/// # Errors
///
/// Returns [`crate::SnapshotError::Header`] if the line differs from
/// [`HEADER`] in any way.
pub fn verify_header(line: &str) -> Result<(), crate::SnapshotError> {
    if line.trim_end() == HEADER {
        Ok(())
    } else {
        Err(crate::SnapshotError::Header {
            expected: HEADER,
            found: line.to_string(),
        })
    }
}

/// Parses one data line into a [`RelayRecord`] stamped with `date`.
///
/// Returns `None` when the line is malformed: wrong field count, invalid
/// fingerprint, empty or over-long nickname, unparseable country, unknown
/// flag name, or non-numeric capability fields.
#[must_use]
pub fn parse_relay_line(line: &str, date: NaiveDate) -> Option<RelayRecord> {
    let fields = split_fields(line)?;

    let fingerprint = fields[0];
    if !is_valid_fingerprint(fingerprint) {
        return None;
    }

    let nickname = fields[1];
    if nickname.is_empty()
        || nickname.len() > MAX_NICKNAME_LEN
        || !nickname.bytes().all(|b| b.is_ascii_alphanumeric())
    {
        return None;
    }

    let country = parse_country(fields[2])?;
    let flags = parse_flags(fields[3])?;
    let advertised_bandwidth = fields[4].parse::<u64>().ok()?;
    let consensus_weight = fields[5].parse::<u64>().ok()?;

    Some(RelayRecord {
        fingerprint: fingerprint.to_string(),
        nickname: nickname.to_string(),
        observed_on: date,
        country,
        flags,
        advertised_bandwidth,
        consensus_weight,
    })
}

/// Parses one data line's `guard_clients` field into a [`GuardClientMap`]
/// stamped with `date`.
///
/// Parsed independently of [`parse_relay_line`]: the record and the map are
/// two derived views of the same raw line. An empty field yields an empty
/// map. Returns `None` when the field count is wrong, the fingerprint is
/// invalid, or any `cc:count` pair is misshapen. Unknown-country (`??`)
/// pairs are kept; the histogram fold is where they get dropped.
#[must_use]
pub fn parse_guard_clients(line: &str, date: NaiveDate) -> Option<GuardClientMap> {
    let fields = split_fields(line)?;

    let fingerprint = fields[0];
    if !is_valid_fingerprint(fingerprint) {
        return None;
    }

    let mut clients_by_country = BTreeMap::new();
    let raw = fields[FIELD_COUNT - 1];

    if !raw.is_empty() {
        for pair in raw.split('|') {
            let (code, count) = pair.split_once(':')?;
            if !is_valid_country_code(code) {
                return None;
            }
            let count = count.parse::<u64>().ok()?;
            clients_by_country.insert(code.to_string(), count);
        }
    }

    Some(GuardClientMap {
        fingerprint: fingerprint.to_string(),
        observed_on: date,
        clients_by_country,
    })
}

/// Splits a data line into exactly [`FIELD_COUNT`] fields, or `None`.
fn split_fields(line: &str) -> Option<Vec<&str>> {
    let fields: Vec<&str> = line.trim_end().split(',').collect();
    (fields.len() == FIELD_COUNT).then_some(fields)
}

/// Decodes the `country` field. Empty and `??` both mean "unknown".
fn parse_country(field: &str) -> Option<Option<String>> {
    if field.is_empty() || field == relay_metrics_relay_models::UNKNOWN_COUNTRY {
        return Some(None);
    }
    if !is_valid_country_code(field) {
        return None;
    }
    Some(Some(field.to_string()))
}

/// Decodes the `+`-joined flags field. Empty means no flags.
fn parse_flags(field: &str) -> Option<Vec<RelayFlag>> {
    if field.is_empty() {
        return Some(Vec::new());
    }
    field
        .split('+')
        .map(|name| name.parse::<RelayFlag>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_LINE: &str = "9695DFC35FFEB861329B9F1AB04C46397020CE31,moria1,us,\
                              Authority+Fast+Running+Valid,5242880,2040,us:12|de:5|??:3";

    fn date() -> NaiveDate {
        NaiveDate::parse_from_str("2024-03-01", "%Y-%m-%d").unwrap()
    }

    #[test]
    fn accepts_exact_header() {
        assert!(verify_header(HEADER).is_ok());
        assert!(verify_header(&format!("{HEADER}\r")).is_ok());
    }

    #[test]
    fn rejects_wrong_header() {
        assert!(verify_header("fingerprint,nickname").is_err());
        assert!(verify_header("").is_err());
    }

    #[test]
    fn parses_valid_relay_line() {
        let record = parse_relay_line(VALID_LINE, date()).unwrap();
        assert_eq!(
            record.fingerprint,
            "9695DFC35FFEB861329B9F1AB04C46397020CE31"
        );
        assert_eq!(record.nickname, "moria1");
        assert_eq!(record.observed_on, date());
        assert_eq!(record.country.as_deref(), Some("us"));
        assert_eq!(
            record.flags,
            vec![
                RelayFlag::Authority,
                RelayFlag::Fast,
                RelayFlag::Running,
                RelayFlag::Valid,
            ]
        );
        assert_eq!(record.advertised_bandwidth, 5_242_880);
        assert_eq!(record.consensus_weight, 2040);
    }

    #[test]
    fn unknown_country_field_becomes_none() {
        let line = VALID_LINE.replace(",us,", ",??,");
        let record = parse_relay_line(&line, date()).unwrap();
        assert_eq!(record.country, None);

        let line = VALID_LINE.replace(",us,", ",,");
        let record = parse_relay_line(&line, date()).unwrap();
        assert_eq!(record.country, None);
    }

    #[test]
    fn empty_flags_field_is_valid() {
        let line = VALID_LINE.replace("Authority+Fast+Running+Valid", "");
        let record = parse_relay_line(&line, date()).unwrap();
        assert!(record.flags.is_empty());
    }

    #[test]
    fn rejects_wrong_field_count() {
        assert!(parse_relay_line("just,four,fields,here", date()).is_none());
        assert!(parse_relay_line(&format!("{VALID_LINE},extra"), date()).is_none());
    }

    #[test]
    fn rejects_bad_fingerprint() {
        let line = VALID_LINE.replace("9695DFC35FFEB861329B9F1AB04C46397020CE31", "nothex");
        assert!(parse_relay_line(&line, date()).is_none());
    }

    #[test]
    fn rejects_unknown_flag() {
        let line = VALID_LINE.replace("Authority", "Turbo");
        assert!(parse_relay_line(&line, date()).is_none());
    }

    #[test]
    fn rejects_non_numeric_bandwidth() {
        let line = VALID_LINE.replace("5242880", "fast");
        assert!(parse_relay_line(&line, date()).is_none());
    }

    #[test]
    fn parses_guard_clients_field() {
        let map = parse_guard_clients(VALID_LINE, date()).unwrap();
        assert_eq!(
            map.fingerprint,
            "9695DFC35FFEB861329B9F1AB04C46397020CE31"
        );
        assert_eq!(map.observed_on, date());
        assert_eq!(map.clients_by_country.get("us"), Some(&12));
        assert_eq!(map.clients_by_country.get("de"), Some(&5));
        assert_eq!(map.clients_by_country.get("??"), Some(&3));
    }

    #[test]
    fn empty_guard_clients_field_is_an_empty_map() {
        let line = VALID_LINE.replace("us:12|de:5|??:3", "");
        let map = parse_guard_clients(&line, date()).unwrap();
        assert!(map.clients_by_country.is_empty());
    }

    #[test]
    fn rejects_misshapen_guard_client_pairs() {
        let line = VALID_LINE.replace("us:12|de:5|??:3", "us:12|de");
        assert!(parse_guard_clients(&line, date()).is_none());

        let line = VALID_LINE.replace("us:12|de:5|??:3", "usa:12");
        assert!(parse_guard_clients(&line, date()).is_none());

        let line = VALID_LINE.replace("us:12|de:5|??:3", "us:many");
        assert!(parse_guard_clients(&line, date()).is_none());
    }
}
