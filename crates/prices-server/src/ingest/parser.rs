//! CSV row validation
//!
//! The first row of every file is a header and is skipped unread. Every other
//! row is validated on its own: a bad row is rejected and the rest of the batch
//! carries on. Only a failure of the underlying byte stream aborts parsing.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use csv::{ErrorKind, ReaderBuilder, StringRecord};
use prices_common::types::{PriceRecord, DATE_FORMAT};
use std::io::Read;
use std::str::FromStr;

/// Minimum number of fields a data row must carry.
pub const MIN_FIELDS: usize = 5;

/// Why a single row was left out of the batch.
///
/// `row` is the 1-based record number in the file, header included.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RowRejection {
    #[error("row {row}: expected at least {min} fields, found {found}", min = MIN_FIELDS)]
    TooFewFields { row: u64, found: usize },
    #[error("row {row}: id '{value}' is not an integer")]
    InvalidId { row: u64, value: String },
    #[error("row {row}: price '{value}' is not a decimal number")]
    InvalidPrice { row: u64, value: String },
    #[error("row {row}: create_date '{value}' is not a YYYY-MM-DD date")]
    InvalidDate { row: u64, value: String },
    #[error("row {row}: {reason}")]
    Malformed { row: u64, reason: String },
}

/// Outcome of validating one row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowValidation {
    Accepted(PriceRecord),
    Rejected(RowRejection),
}

/// Records that passed validation, in file order, plus the reasons for the ones that did not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedBatch {
    pub records: Vec<PriceRecord>,
    pub rejected: Vec<RowRejection>,
}

impl ParsedBatch {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Rows seen after the header, accepted or not.
    pub fn rows_seen(&self) -> usize {
        self.records.len() + self.rejected.len()
    }

    fn push(&mut self, validation: RowValidation) {
        match validation {
            RowValidation::Accepted(record) => self.records.push(record),
            RowValidation::Rejected(reason) => self.rejected.push(reason),
        }
    }
}

/// Validate a single data row.
pub fn validate_row(row: u64, fields: &StringRecord) -> RowValidation {
    match build_record(row, fields) {
        Ok(record) => RowValidation::Accepted(record),
        Err(reason) => RowValidation::Rejected(reason),
    }
}

fn build_record(row: u64, fields: &StringRecord) -> Result<PriceRecord, RowRejection> {
    if fields.len() < MIN_FIELDS {
        return Err(RowRejection::TooFewFields {
            row,
            found: fields.len(),
        });
    }

    let field = |index: usize| fields.get(index).unwrap_or_default().trim();

    let id = i64::from_str(field(0)).map_err(|_| RowRejection::InvalidId {
        row,
        value: field(0).to_string(),
    })?;

    let price = BigDecimal::from_str(field(3)).map_err(|_| RowRejection::InvalidPrice {
        row,
        value: field(3).to_string(),
    })?;

    let create_date =
        NaiveDate::parse_from_str(field(4), DATE_FORMAT).map_err(|_| RowRejection::InvalidDate {
            row,
            value: field(4).to_string(),
        })?;

    Ok(PriceRecord::new(id, field(1), field(2), price, create_date))
}

/// Parse a whole CSV document.
///
/// Rows may have differing field counts; anything past the fifth field is
/// ignored. Undecodable records are rejected like any other bad row. An I/O
/// error from `reader` is returned as-is so callers can tell a broken
/// container apart from bad data.
pub fn parse_rows<R: Read>(reader: R) -> std::io::Result<ParsedBatch> {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut batch = ParsedBatch::empty();

    for (index, result) in csv_reader.records().enumerate() {
        let row = index as u64 + 1;

        let validation = match result {
            Ok(_) if row == 1 => continue,
            Ok(fields) => validate_row(row, &fields),
            Err(err) if err.is_io_error() => {
                return Err(match err.into_kind() {
                    ErrorKind::Io(io_err) => io_err,
                    other => std::io::Error::other(format!("{:?}", other)),
                });
            },
            Err(_) if row == 1 => continue,
            Err(err) => RowValidation::Rejected(RowRejection::Malformed {
                row,
                reason: err.to_string(),
            }),
        };

        batch.push(validation);
    }

    tracing::debug!(
        accepted = batch.records.len(),
        rejected = batch.rejected.len(),
        "Parsed CSV rows"
    );

    Ok(batch)
}
