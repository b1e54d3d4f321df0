use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use crate::db::SharedPriceStore;
use crate::ingest::{ArchiveFormat, UnsupportedFormat, UploadSpool};

use super::{
    commands::{UploadPricesCommand, UploadPricesError},
    queries::{export::EXPORT_FILENAME, ExportPricesError, ExportPricesQuery},
};

/// Multipart field the archive is expected under.
const FILE_FIELD: &str = "file";

pub fn prices_routes(max_upload_bytes: usize) -> Router<SharedPriceStore> {
    Router::new()
        .route("/", post(upload_prices).get(export_prices))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
}

#[derive(Debug, Deserialize)]
struct UploadParams {
    #[serde(rename = "type")]
    format: Option<String>,
}

impl UploadParams {
    fn archive_format(&self) -> Result<ArchiveFormat, UnsupportedFormat> {
        match self.format.as_deref() {
            None | Some("") => Ok(ArchiveFormat::default()),
            Some(value) => value.parse(),
        }
    }
}

#[tracing::instrument(skip(store, multipart))]
async fn upload_prices(
    State(store): State<SharedPriceStore>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Response, PricesApiError> {
    let format = params.archive_format()?;

    let mut archive = None;
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let mut spool = UploadSpool::create()
            .await
            .map_err(PricesApiError::Staging)?;
        while let Some(chunk) = field.chunk().await? {
            spool
                .write_chunk(&chunk)
                .await
                .map_err(PricesApiError::Staging)?;
        }
        archive = Some(spool.finish().await.map_err(PricesApiError::Staging)?);
        break;
    }

    let archive = archive.ok_or(PricesApiError::MissingFile)?;

    let command = UploadPricesCommand { format, archive };
    let stats = super::commands::upload::handle(store.as_ref(), command).await?;

    Ok((StatusCode::OK, Json(stats)).into_response())
}

#[tracing::instrument(skip(store))]
async fn export_prices(State(store): State<SharedPriceStore>) -> Result<Response, PricesApiError> {
    let response = super::queries::export::handle(store.as_ref(), ExportPricesQuery).await?;

    tracing::debug!(rows = response.rows, "Price export sent");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={EXPORT_FILENAME}"),
            ),
        ],
        response.archive,
    )
        .into_response())
}

#[derive(Debug, thiserror::Error)]
enum PricesApiError {
    #[error(transparent)]
    UnsupportedFormat(#[from] UnsupportedFormat),
    #[error("Invalid multipart body: {}", .0.body_text())]
    Multipart(#[from] MultipartError),
    #[error("Missing 'file' field in multipart body")]
    MissingFile,
    #[error("Failed to stage upload: {0}")]
    Staging(#[source] std::io::Error),
    #[error(transparent)]
    Upload(#[from] UploadPricesError),
    #[error(transparent)]
    Export(#[from] ExportPricesError),
}

impl PricesApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedFormat(_) | Self::MissingFile => StatusCode::BAD_REQUEST,
            // 413 when the body limit was hit, 400 for a broken body
            Self::Multipart(e) => e.status(),
            Self::Staging(_) | Self::Upload(_) | Self::Export(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }
}

impl IntoResponse for PricesApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Price request failed");
        } else {
            tracing::warn!(error = %self, status = status.as_u16(), "Price request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
