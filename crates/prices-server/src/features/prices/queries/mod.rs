pub mod export;

pub use export::{ExportPricesError, ExportPricesQuery, ExportPricesResponse};
