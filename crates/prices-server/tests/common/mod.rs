//! Shared fixtures for the prices server integration tests
//!
//! - [`MemoryPriceStore`]: in-process `PriceStore` with failure injection
//! - archive builders for ZIP and TAR uploads
//! - request helpers driving the router with `oneshot`

#![allow(dead_code)]

use std::collections::HashSet;
use std::io::{Cursor, Read, Write};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use bigdecimal::{BigDecimal, RoundingMode};
use prices_common::{IngestionStats, PriceRecord};
use prices_server::{
    api::{self, AppState},
    config::Config,
    db::{PersistError, PriceStore},
    models::StoredPrice,
};
use tower::ServiceExt;
use zip::write::SimpleFileOptions;

pub const CSV_HEADER_LINE: &str = "id,name,category,price,create_date\n";

pub const BOUNDARY: &str = "prices-test-boundary";

// ============================================================================
// In-memory store
// ============================================================================

/// Keeps rows in a vector, mimicking the `prices` table.
///
/// Prices are rounded to two decimals on insert, as `NUMERIC(10, 2)` does.
#[derive(Default)]
pub struct MemoryPriceStore {
    rows: Mutex<Vec<StoredPrice>>,
    fail_insert_at: Mutex<Option<usize>>,
    fail_stats: AtomicBool,
    unavailable: AtomicBool,
}

impl MemoryPriceStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make the record at `index` of the next batches fail to insert.
    pub fn fail_insert_at(&self, index: usize) {
        *self.fail_insert_at.lock().unwrap() = Some(index);
    }

    pub fn fail_stats(&self) {
        self.fail_stats.store(true, Ordering::SeqCst);
    }

    pub fn set_unavailable(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<StoredPrice> {
        self.rows.lock().unwrap().clone()
    }

    fn simulated(message: &str) -> sqlx::Error {
        sqlx::Error::Protocol(message.to_string())
    }
}

#[async_trait]
impl PriceStore for MemoryPriceStore {
    async fn insert_batch(&self, records: &[PriceRecord]) -> Result<u64, PersistError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PersistError::Begin(sqlx::Error::PoolClosed));
        }

        let fail_at = *self.fail_insert_at.lock().unwrap();
        let mut rows = self.rows.lock().unwrap();
        let mut staged = Vec::with_capacity(records.len());

        for (index, record) in records.iter().enumerate() {
            if fail_at == Some(index) {
                return Err(PersistError::Insert {
                    index,
                    source: Self::simulated("simulated insert failure"),
                });
            }
            staged.push(StoredPrice {
                id: (rows.len() + staged.len() + 1) as i32,
                name: record.name.clone(),
                category: record.category.clone(),
                price: record.price.with_scale_round(2, RoundingMode::HalfUp),
                create_date: record.create_date,
            });
        }

        rows.extend(staged);
        Ok(records.len() as u64)
    }

    async fn compute_stats(&self, inserted: u64) -> Result<IngestionStats, PersistError> {
        if self.fail_stats.load(Ordering::SeqCst) {
            return Err(PersistError::Query(Self::simulated("simulated stats failure")));
        }

        let rows = self.rows.lock().unwrap();
        let categories: HashSet<&str> = rows.iter().map(|r| r.category.as_str()).collect();
        let total: BigDecimal = rows.iter().map(|r| r.price.clone()).sum();

        Ok(IngestionStats {
            total_items: inserted,
            total_categories: categories.len() as i64,
            total_price: total.to_string().parse().unwrap(),
        })
    }

    async fn fetch_all(&self) -> Result<Vec<StoredPrice>, PersistError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PersistError::Query(sqlx::Error::PoolClosed));
        }
        Ok(self.rows())
    }

    async fn ping(&self) -> Result<(), PersistError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PersistError::Query(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

// ============================================================================
// App helpers
// ============================================================================

pub fn test_app(store: Arc<MemoryPriceStore>) -> Router {
    test_app_with_config(store, Config::default())
}

pub fn test_app_with_config(store: Arc<MemoryPriceStore>, config: Config) -> Router {
    api::create_router(AppState { store }, &config)
}

pub fn price(id: i64, name: &str, category: &str, price: &str, date: &str) -> PriceRecord {
    PriceRecord::new(
        id,
        name,
        category,
        BigDecimal::from_str(price).unwrap(),
        chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
    )
}

// ============================================================================
// Archive fixtures
// ============================================================================

pub fn zip_archive(members: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in members {
        writer.start_file(*name, SimpleFileOptions::default()).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn tar_archive(members: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, contents) in members {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, name, contents.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap()
}

/// Unzip an export and return its member names and the `data.csv` text.
pub fn read_export(bytes: &[u8]) -> (Vec<String>, String) {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let names = archive.file_names().map(String::from).collect();
    let mut csv = String::new();
    archive
        .by_name("data.csv")
        .unwrap()
        .read_to_string(&mut csv)
        .unwrap();
    (names, csv)
}

// ============================================================================
// Requests
// ============================================================================

pub fn multipart_body(field: &str, filename: &str, contents: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    write!(
        body,
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n\
         Content-Type: application/octet-stream\r\n\r\n"
    )
    .unwrap();
    body.extend_from_slice(contents);
    write!(body, "\r\n--{BOUNDARY}--\r\n").unwrap();
    body
}

pub async fn post_multipart(app: &Router, uri: &str, body: Vec<u8>) -> (StatusCode, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .method("POST")
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={BOUNDARY}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, body.to_vec())
}

/// Upload `archive` as the `file` field with the given `type` selector.
pub async fn upload(app: &Router, format: &str, archive: &[u8]) -> (StatusCode, Vec<u8>) {
    let uri = format!("/api/v0/prices?type={format}");
    post_multipart(app, &uri, multipart_body("file", "prices", archive)).await
}

pub async fn get(app: &Router, uri: &str) -> (StatusCode, header::HeaderMap, Vec<u8>) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    (status, headers, body.to_vec())
}

pub fn json(body: &[u8]) -> serde_json::Value {
    serde_json::from_slice(body).unwrap()
}
