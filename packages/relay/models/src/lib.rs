#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Relay snapshot domain types.
//!
//! Every daily snapshot file is parsed into [`RelayRecord`]s and
//! [`GuardClientMap`]s that conform to this shared shape. All downstream
//! storage and aggregation operates on these types.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Country-code sentinel for clients whose origin could not be resolved.
///
/// Never appears as a key in a produced [`CountryHistogram`].
pub const UNKNOWN_COUNTRY: &str = "??";

/// Directory capability flags assigned to a relay in the consensus.
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
#[serde(rename_all = "PascalCase")]
#[strum(serialize_all = "PascalCase")]
pub enum RelayFlag {
    /// Directory authority.
    Authority,
    /// Permits exit traffic.
    Exit,
    /// Suitable for high-bandwidth circuits.
    Fast,
    /// Suitable as an entry guard.
    Guard,
    /// Hidden service directory.
    HsDir,
    /// Currently reachable.
    Running,
    /// Suitable for long-lived circuits.
    Stable,
    /// Validly configured.
    Valid,
}

/// One relay's observed state on one date.
///
/// Carries exactly one `observed_on` date, matching the date derived from the
/// snapshot file the record was parsed out of. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRecord {
    /// 40-character uppercase hex identity fingerprint, unique per relay.
    pub fingerprint: String,
    /// Operator-chosen relay nickname.
    pub nickname: String,
    /// Date the snapshot was taken.
    pub observed_on: NaiveDate,
    /// Lowercase ISO 3166-1 alpha-2 country code. `None` when the snapshot
    /// could not attribute the relay to a country.
    pub country: Option<String>,
    /// Consensus flags assigned to the relay.
    pub flags: Vec<RelayFlag>,
    /// Advertised bandwidth in bytes per second.
    pub advertised_bandwidth: u64,
    /// Weight assigned by the directory authorities.
    pub consensus_weight: u64,
}

/// One relay's per-country observed guard-client counts for one date.
///
/// At most one exists per (fingerprint, date) within a single file's
/// processing; a later line for the same fingerprint overwrites the earlier
/// one. May contain [`UNKNOWN_COUNTRY`] as a key; the histogram fold drops
/// that entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardClientMap {
    /// Fingerprint of the owning relay.
    pub fingerprint: String,
    /// Date the counts were observed.
    pub observed_on: NaiveDate,
    /// Guard-client count per lowercase country code.
    pub clients_by_country: BTreeMap<String, u64>,
}

/// Aggregate guard-client count per country code for one date.
pub type CountryHistogram = BTreeMap<String, u64>;

/// Returns whether `s` is a well-formed relay identity fingerprint:
/// exactly 40 uppercase hex characters.
#[must_use]
pub fn is_valid_fingerprint(s: &str) -> bool {
    s.len() == 40
        && s.bytes()
            .all(|b| b.is_ascii_digit() || (b'A'..=b'F').contains(&b))
}

/// Returns whether `s` is a well-formed country code: two lowercase ASCII
/// letters, or the [`UNKNOWN_COUNTRY`] sentinel.
#[must_use]
pub fn is_valid_country_code(s: &str) -> bool {
    s == UNKNOWN_COUNTRY || (s.len() == 2 && s.bytes().all(|b| b.is_ascii_lowercase()))
}
