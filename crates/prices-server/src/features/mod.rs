//! Feature modules implementing the prices API
//!
//! Each feature is a vertical slice with `commands/` for writes, `queries/`
//! for reads and a `routes.rs` wiring them to HTTP.

pub mod prices;

use axum::Router;

use crate::db::SharedPriceStore;

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    /// Price persistence backend
    pub store: SharedPriceStore,
    /// Upper bound on an upload request body, in bytes
    pub max_upload_bytes: usize,
}

/// Creates the versioned API router with all feature routes mounted
///
/// - `/prices` - archive upload and export
pub fn router(state: FeatureState) -> Router<()> {
    Router::new().nest(
        "/prices",
        prices::prices_routes(state.max_upload_bytes).with_state(state.store.clone()),
    )
}
