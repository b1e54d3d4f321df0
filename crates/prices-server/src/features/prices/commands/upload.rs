use prices_common::IngestionStats;
use tokio::task::JoinError;

use crate::db::{PersistError, PriceStore};
use crate::ingest::{ArchiveFormat, ExtractError, ParsedBatch, StagedUpload};

/// Ingest one staged archive into the price store.
#[derive(Debug)]
pub struct UploadPricesCommand {
    pub format: ArchiveFormat,
    pub archive: StagedUpload,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadPricesError {
    #[error("Failed to extract archive: {0}")]
    Extract(#[from] ExtractError),
    #[error("Archive extraction task failed: {0}")]
    Task(#[from] JoinError),
    #[error("Failed to store prices: {0}")]
    Persist(#[source] PersistError),
    #[error("Prices were stored but statistics could not be computed: {0}")]
    Stats(#[source] PersistError),
}

/// Unpack and parse the archive off the async runtime.
async fn extract_batch(
    format: ArchiveFormat,
    archive: StagedUpload,
) -> Result<ParsedBatch, UploadPricesError> {
    let batch = tokio::task::spawn_blocking(move || {
        let mut file = archive.into_file();
        format.extractor().extract(&mut file)
    })
    .await??;

    Ok(batch)
}

#[tracing::instrument(skip(store, command), fields(format = %command.format, size = command.archive.size()))]
pub async fn handle(
    store: &dyn PriceStore,
    command: UploadPricesCommand,
) -> Result<IngestionStats, UploadPricesError> {
    let batch = extract_batch(command.format, command.archive).await?;

    if !batch.rejected.is_empty() {
        tracing::info!(
            rows = batch.rows_seen(),
            accepted = batch.records.len(),
            rejected = batch.rejected.len(),
            "Skipped malformed rows"
        );
        for rejection in &batch.rejected {
            tracing::debug!(%rejection, "Row rejected");
        }
    }

    let inserted = store
        .insert_batch(&batch.records)
        .await
        .map_err(UploadPricesError::Persist)?;

    // The batch is committed from here on; a stats failure does not undo it.
    let stats = store
        .compute_stats(inserted)
        .await
        .map_err(UploadPricesError::Stats)?;

    tracing::info!(
        total_items = stats.total_items,
        total_categories = stats.total_categories,
        total_price = stats.total_price,
        "Price archive ingested"
    );

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn zip_with(name: &str, contents: &str) -> StagedUpload {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        writer.start_file(name, SimpleFileOptions::default()).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        StagedUpload::from_bytes(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_extract_batch_from_zip() {
        let archive = zip_with(
            "prices.csv",
            "id,name,category,price,create_date\n\
             1,Widget,Tools,9.99,2024-01-15\n\
             x,Bad,Tools,1.00,2024-01-16\n",
        );

        let batch = extract_batch(ArchiveFormat::Zip, archive).await.unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.rejected.len(), 1);
        assert_eq!(batch.records[0].name, "Widget");
        assert_eq!(batch.rows_seen(), 2);
    }

    #[tokio::test]
    async fn test_extract_batch_wrong_format_fails() {
        let archive = zip_with("prices.csv", "id\n");

        let result = extract_batch(ArchiveFormat::Tar, archive).await;
        assert!(matches!(result, Err(UploadPricesError::Extract(ExtractError::Tar(_)))));
    }

    #[test]
    fn test_stats_error_mentions_committed_data() {
        let err = UploadPricesError::Stats(PersistError::Query(sqlx::Error::PoolClosed));
        assert!(err.to_string().contains("were stored"));
    }
}
