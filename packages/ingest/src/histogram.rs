//! Country histogram fold.

use std::collections::BTreeMap;

use relay_metrics_relay_models::{CountryHistogram, GuardClientMap, UNKNOWN_COUNTRY};

/// Folds per-relay guard-client maps into one worldwide histogram for the
/// date.
///
/// This is a flatten-and-overwrite, not a summation: when two relays report
/// the same country code, the entry written later wins. That matches the
/// upstream data pipeline this system replaces and must not be changed to
/// addition without a confirmed product decision. The input map is keyed by
/// fingerprint, so iteration order is fixed and the winner is deterministic:
/// the lexicographically greatest fingerprint reporting the country.
///
/// Entries for [`UNKNOWN_COUNTRY`] are dropped.
#[must_use]
pub fn build_histogram(guard_clients: &BTreeMap<String, GuardClientMap>) -> CountryHistogram {
    let mut histogram = CountryHistogram::new();

    for clients in guard_clients.values() {
        for (country, count) in &clients.clients_by_country {
            if country == UNKNOWN_COUNTRY {
                continue;
            }
            histogram.insert(country.clone(), *count);
        }
    }

    histogram
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::parse_from_str("2024-03-01", "%Y-%m-%d").unwrap()
    }

    fn guard_clients(fingerprint: &str, pairs: &[(&str, u64)]) -> GuardClientMap {
        GuardClientMap {
            fingerprint: fingerprint.to_string(),
            observed_on: date(),
            clients_by_country: pairs
                .iter()
                .map(|(cc, n)| ((*cc).to_string(), *n))
                .collect(),
        }
    }

    fn input(maps: Vec<GuardClientMap>) -> BTreeMap<String, GuardClientMap> {
        maps.into_iter()
            .map(|m| (m.fingerprint.clone(), m))
            .collect()
    }

    #[test]
    fn disjoint_countries_are_merged() {
        let histogram = build_histogram(&input(vec![
            guard_clients("1111111111111111111111111111111111111111", &[("us", 5)]),
            guard_clients("2222222222222222222222222222222222222222", &[("ca", 3)]),
        ]));

        assert_eq!(histogram.get("us"), Some(&5));
        assert_eq!(histogram.get("ca"), Some(&3));
        assert_eq!(histogram.len(), 2);
    }

    #[test]
    fn later_fingerprint_overwrites_shared_country() {
        let histogram = build_histogram(&input(vec![
            guard_clients("1111111111111111111111111111111111111111", &[("us", 5)]),
            guard_clients("2222222222222222222222222222222222222222", &[("us", 9)]),
        ]));

        assert_eq!(histogram.get("us"), Some(&9));
        assert_eq!(histogram.len(), 1);
    }

    #[test]
    fn unknown_country_is_never_a_key() {
        let histogram = build_histogram(&input(vec![guard_clients(
            "1111111111111111111111111111111111111111",
            &[("us", 5), (UNKNOWN_COUNTRY, 40)],
        )]));

        assert!(!histogram.contains_key(UNKNOWN_COUNTRY));
        assert_eq!(histogram.len(), 1);
    }

    #[test]
    fn empty_input_yields_empty_histogram() {
        assert!(build_histogram(&BTreeMap::new()).is_empty());
    }
}
