//! Database query functions for relay snapshot data.
//!
//! Every write here is an idempotent upsert or a per-date replacement;
//! repeating any of them for the same date leaves the stored state unchanged,
//! which is what makes whole-file retry safe for the ingestion pipeline.

use chrono::NaiveDate;
use moosicbox_json_utils::database::ToValue as _;
use relay_metrics_relay_models::{CountryHistogram, RelayRecord};
use switchy_database::{Database, DatabaseValue};

use crate::DbError;

/// Returns whether the date ledger already contains an entry for `date`.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn date_exists(db: &dyn Database, date: NaiveDate) -> Result<bool, DbError> {
    let rows = db
        .query_raw_params(
            "SELECT COUNT(*) AS cnt FROM ingested_dates WHERE observed_on = $1::date",
            &[DatabaseValue::String(date.to_string())],
        )
        .await?;

    let Some(row) = rows.first() else {
        return Ok(false);
    };

    let count: i64 = row.to_value("cnt").map_err(|e| DbError::Conversion {
        message: format!("Failed to parse ledger count: {e}"),
    })?;

    Ok(count > 0)
}

/// Records `date` as fully ingested in the date ledger.
///
/// Idempotent: marking an already-marked date is not an error.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn mark_date_done(db: &dyn Database, date: NaiveDate) -> Result<(), DbError> {
    db.exec_raw_params(
        "INSERT INTO ingested_dates (observed_on)
         VALUES ($1::date)
         ON CONFLICT (observed_on) DO NOTHING",
        &[DatabaseValue::String(date.to_string())],
    )
    .await?;

    Ok(())
}

/// Inserts a batch of relay records, overwriting any existing row for the
/// same (fingerprint, date) pair.
///
/// Returns the number of rows written.
///
/// # Errors
///
/// Returns [`DbError`] if any database operation fails.
pub async fn upsert_relays(db: &dyn Database, records: &[RelayRecord]) -> Result<u64, DbError> {
    let mut written = 0u64;

    for record in records {
        let flags = record
            .flags
            .iter()
            .map(|flag| flag.as_ref())
            .collect::<Vec<&str>>()
            .join("+");

        let result = db
            .exec_raw_params(
                "INSERT INTO relays (
                    fingerprint, nickname, country, flags,
                    advertised_bandwidth, consensus_weight, observed_on
                ) VALUES ($1, $2, $3, $4, $5, $6, $7::date)
                ON CONFLICT (fingerprint, observed_on) DO UPDATE SET
                    nickname = EXCLUDED.nickname,
                    country = EXCLUDED.country,
                    flags = EXCLUDED.flags,
                    advertised_bandwidth = EXCLUDED.advertised_bandwidth,
                    consensus_weight = EXCLUDED.consensus_weight",
                &[
                    DatabaseValue::String(record.fingerprint.clone()),
                    DatabaseValue::String(record.nickname.clone()),
                    record
                        .country
                        .as_ref()
                        .map_or(DatabaseValue::Null, |c| DatabaseValue::String(c.clone())),
                    DatabaseValue::String(flags),
                    DatabaseValue::Int64(i64::try_from(record.advertised_bandwidth).map_err(
                        |_| DbError::Conversion {
                            message: format!(
                                "advertised_bandwidth out of range for {}",
                                record.fingerprint
                            ),
                        },
                    )?),
                    DatabaseValue::Int64(i64::try_from(record.consensus_weight).map_err(
                        |_| DbError::Conversion {
                            message: format!(
                                "consensus_weight out of range for {}",
                                record.fingerprint
                            ),
                        },
                    )?),
                    DatabaseValue::String(record.observed_on.to_string()),
                ],
            )
            .await?;

        written += result;
    }

    Ok(written)
}

/// Replaces the stored country histogram for `date`.
///
/// Delete-then-insert gives replace semantics per date: re-running an ingest
/// never leaves stale country rows behind.
///
/// # Errors
///
/// Returns [`DbError`] if any database operation fails.
pub async fn replace_country_histogram(
    db: &dyn Database,
    date: NaiveDate,
    histogram: &CountryHistogram,
) -> Result<(), DbError> {
    db.exec_raw_params(
        "DELETE FROM country_guard_clients WHERE observed_on = $1::date",
        &[DatabaseValue::String(date.to_string())],
    )
    .await?;

    for (country, count) in histogram {
        db.exec_raw_params(
            "INSERT INTO country_guard_clients (observed_on, country, guard_clients)
             VALUES ($1::date, $2, $3)",
            &[
                DatabaseValue::String(date.to_string()),
                DatabaseValue::String(country.clone()),
                DatabaseValue::Int64(i64::try_from(*count).map_err(|_| DbError::Conversion {
                    message: format!("guard client count out of range for {country}"),
                })?),
            ],
        )
        .await?;
    }

    Ok(())
}

/// Recomputes the derived per-date aggregate view from the `relays` table.
///
/// Idempotent: recomputing for the same date overwrites the previous row.
///
/// # Errors
///
/// Returns [`DbError`] if the database operation fails.
pub async fn refresh_relay_aggregates(db: &dyn Database, date: NaiveDate) -> Result<(), DbError> {
    db.exec_raw_params(
        "INSERT INTO relay_day_aggregates (
            observed_on, relay_count, guard_relay_count, exit_relay_count,
            total_advertised_bandwidth, total_consensus_weight
        )
        SELECT observed_on,
               COUNT(*),
               COUNT(*) FILTER (WHERE flags LIKE '%Guard%'),
               COUNT(*) FILTER (WHERE flags LIKE '%Exit%'),
               COALESCE(SUM(advertised_bandwidth), 0),
               COALESCE(SUM(consensus_weight), 0)
        FROM relays
        WHERE observed_on = $1::date
        GROUP BY observed_on
        ON CONFLICT (observed_on) DO UPDATE SET
            relay_count = EXCLUDED.relay_count,
            guard_relay_count = EXCLUDED.guard_relay_count,
            exit_relay_count = EXCLUDED.exit_relay_count,
            total_advertised_bandwidth = EXCLUDED.total_advertised_bandwidth,
            total_consensus_weight = EXCLUDED.total_consensus_weight",
        &[DatabaseValue::String(date.to_string())],
    )
    .await?;

    Ok(())
}
