//! CSV format handling for point requests and balance/history output
//!
//! This module centralizes all CSV format concerns, providing:
//! - CsvRecord structure for deserialization
//! - Conversion from CSV records to point requests
//! - Balance and history output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{Balance, Point, PointRequest, TransactionKind, TransactionRecord, UserId};
use serde::Deserialize;
use std::io::Write;

/// CSV record structure for deserialization
///
/// Matches the input CSV format with columns: type, user, amount
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CsvRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub user: UserId,
    pub amount: Option<String>,
}

/// Convert a CsvRecord to a PointRequest
///
/// Only the shape is checked here (known type, integer amount present).
/// Whether the id and amount are acceptable is decided by the service, so
/// zero and negative values pass through.
///
/// # Returns
///
/// * `Ok(PointRequest)` - Successfully converted record
/// * `Err(String)` - Error message describing the conversion failure
pub fn convert_csv_record(csv_record: CsvRecord) -> Result<PointRequest, String> {
    let kind: TransactionKind = csv_record.kind.parse()?;

    let amount = match csv_record.amount {
        Some(amount_str) if !amount_str.trim().is_empty() => amount_str
            .trim()
            .parse::<Point>()
            .map_err(|_| {
                format!(
                    "Invalid amount '{}' for user {}",
                    amount_str, csv_record.user
                )
            })?,
        _ => {
            return Err(format!(
                "{} request for user {} requires an amount",
                kind, csv_record.user
            ))
        }
    };

    Ok(PointRequest {
        kind,
        user: csv_record.user,
        amount,
    })
}

/// Write balances to CSV format
///
/// Writes balances with columns: user, point, updated_at_millis, sorted by
/// user id for deterministic output.
pub fn write_balances_csv(balances: &[Balance], output: &mut dyn Write) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["user", "point", "updated_at_millis"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted = balances.to_vec();
    sorted.sort_by_key(|balance| balance.id);

    for balance in sorted {
        writer
            .write_record(&[
                balance.id.to_string(),
                balance.amount.to_string(),
                balance.updated_at_millis.to_string(),
            ])
            .map_err(|e| format!("Failed to write balance record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

/// Write history records to CSV format
///
/// Columns: sequence, user, type, amount, time_millis. Records are written
/// in sequence order.
pub fn write_history_csv(
    records: &[TransactionRecord],
    output: &mut dyn Write,
) -> Result<(), String> {
    let mut writer = csv::Writer::from_writer(output);

    writer
        .write_record(["sequence", "user", "type", "amount", "time_millis"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted = records.to_vec();
    sorted.sort_by_key(|record| record.sequence_id);

    for record in sorted {
        writer
            .write_record(&[
                record.sequence_id.to_string(),
                record.user_id.to_string(),
                record.kind.to_string(),
                record.amount.to_string(),
                record.time_millis.to_string(),
            ])
            .map_err(|e| format!("Failed to write history record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
