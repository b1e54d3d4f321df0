//! Prices Server Library
//!
//! HTTP service that ingests price lists from uploaded archives and exports
//! the stored dataset.
//!
//! # Overview
//!
//! - **Ingest**: staging, ZIP/TAR extraction and tolerant CSV row validation
//! - **Database**: PostgreSQL persistence with SQLx, one transaction per upload
//! - **Features**: upload command and export query behind `/api/v0/prices`
//! - **Configuration**: environment-based configuration management
//! - **Middleware**: CORS and request tracing
//!
//! # Example
//!
//! ```no_run
//! use prices_server::{api, config::Config, db};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&config.database).await?;
//!     db::run_migrations(&pool).await?;
//!
//!     let state = api::AppState {
//!         store: db::PgPriceStore::shared(pool),
//!     };
//!     let app = api::create_router(state, &config);
//!
//!     let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod features;
pub mod ingest;
pub mod middleware;
pub mod models;
