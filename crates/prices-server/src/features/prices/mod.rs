//! Price archive ingestion and export
//!
//! - `POST /prices?type=zip|tar` ingests the first CSV found in an uploaded
//!   archive and answers with dataset statistics
//! - `GET /prices` returns every stored row as `data.csv` inside a zip

pub mod commands;
pub mod queries;
pub mod routes;

pub use commands::{UploadPricesCommand, UploadPricesError};

pub use queries::{ExportPricesError, ExportPricesQuery, ExportPricesResponse};

pub use routes::prices_routes;
