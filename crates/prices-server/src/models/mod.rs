//! Database models

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use prices_common::types::{format_date, format_price};
use sqlx::FromRow;

/// A row of the `prices` table as read back for export.
///
/// `id` is the table's own serial key, not the id column of the uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct StoredPrice {
    pub id: i32,
    pub name: String,
    pub category: String,
    pub price: BigDecimal,
    pub create_date: NaiveDate,
}

impl StoredPrice {
    /// Fields in `id,name,category,price,create_date` order, formatted for CSV.
    pub fn to_csv_fields(&self) -> [String; 5] {
        [
            self.id.to_string(),
            self.name.clone(),
            self.category.clone(),
            format_price(&self.price),
            format_date(&self.create_date),
        ]
    }
}
