//! Domain types shared by the ingest and export paths

use bigdecimal::{BigDecimal, RoundingMode};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used for `create_date` in both uploaded and exported CSV.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Column header written to exported CSV files.
pub const CSV_HEADER: [&str; 5] = ["id", "name", "category", "price", "create_date"];

/// Number of decimal digits prices are stored and rendered with.
pub const PRICE_SCALE: i64 = 2;

/// One validated catalog row, ready to be persisted.
///
/// `id` is whatever the uploaded file said. It is not unique and the store
/// does not use it as a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceRecord {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub price: BigDecimal,
    pub create_date: NaiveDate,
}

impl PriceRecord {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        category: impl Into<String>,
        price: BigDecimal,
        create_date: NaiveDate,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            category: category.into(),
            price,
            create_date,
        }
    }
}

/// Aggregate figures returned after a successful upload.
///
/// `total_items` counts the current batch only; the other two cover the
/// whole stored dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionStats {
    pub total_items: u64,
    pub total_categories: i64,
    pub total_price: f64,
}

/// Render a price with exactly two decimal digits.
pub fn format_price(price: &BigDecimal) -> String {
    price
        .with_scale_round(PRICE_SCALE, RoundingMode::HalfUp)
        .to_string()
}

/// Render a date as `YYYY-MM-DD`.
pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}
