//! Prices Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared domain types and logging setup for the prices workspace.
//!
//! - **Types**: [`types::PriceRecord`] and [`types::IngestionStats`], plus the
//!   wire formats (date and price rendering) both the ingest and export paths agree on
//! - **Logging**: [`logging::init_logging`] with environment-driven configuration
//!
//! # Example
//!
//! ```no_run
//! use prices_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     Ok(())
//! }
//! ```

pub mod logging;
pub mod types;

pub use types::{IngestionStats, PriceRecord};
