use std::io::{Cursor, Write};

use prices_common::types::CSV_HEADER;
use tokio::task::JoinError;
use zip::write::SimpleFileOptions;

use crate::db::{PersistError, PriceStore};
use crate::models::StoredPrice;

/// Name of the single member inside the exported archive.
pub const EXPORT_MEMBER: &str = "data.csv";

/// File name offered to the client for the download.
pub const EXPORT_FILENAME: &str = "data.zip";

/// Export every stored price as a zipped CSV.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportPricesQuery;

#[derive(Debug, Clone)]
pub struct ExportPricesResponse {
    pub archive: Vec<u8>,
    pub rows: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ExportPricesError {
    #[error("Failed to read prices: {0}")]
    Fetch(#[from] PersistError),
    #[error("Failed to write CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("Failed to build zip archive: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("Failed to write archive: {0}")]
    Io(#[from] std::io::Error),
    #[error("Archive task failed: {0}")]
    Task(#[from] JoinError),
}

/// Header line followed by one line per row, in the order given.
pub fn write_csv(rows: &[StoredPrice]) -> Result<Vec<u8>, ExportPricesError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.write_record(row.to_csv_fields())?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportPricesError::Io(e.into_error()))
}

pub fn build_archive(rows: &[StoredPrice]) -> Result<Vec<u8>, ExportPricesError> {
    let csv = write_csv(rows)?;

    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(EXPORT_MEMBER, SimpleFileOptions::default())?;
    zip.write_all(&csv)?;

    Ok(zip.finish()?.into_inner())
}

#[tracing::instrument(skip(store))]
pub async fn handle(
    store: &dyn PriceStore,
    _query: ExportPricesQuery,
) -> Result<ExportPricesResponse, ExportPricesError> {
    let rows = store.fetch_all().await?;
    let count = rows.len();

    let archive = tokio::task::spawn_blocking(move || build_archive(&rows)).await??;

    tracing::info!(rows = count, bytes = archive.len(), "Price export assembled");

    Ok(ExportPricesResponse {
        archive,
        rows: count,
    })
}
