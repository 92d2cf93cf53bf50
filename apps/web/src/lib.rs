//! # Lacteos Web
//!
//! JSON API for the dairy shop back office.
//!
//! ## Routes
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │  public   GET  /                        featured products               │
//! │           GET  /health                  liveness + database check       │
//! │           POST /accounts/signup         new customer account + token    │
//! │           POST /accounts/login          token                           │
//! │           GET  /products                in-stock catalog, filters       │
//! │           GET  /products/{id}           detail with margin              │
//! │                                                                          │
//! │  login    POST /accounts/logout         revoke current token            │
//! │           POST /accounts/password-change                                │
//! │           GET  /accounts/me                                             │
//! │           POST /purchase                purchase flow                   │
//! │           GET  /sales                   my sales                        │
//! │           GET  /sales/{id}              owner or staff                  │
//! │                                                                          │
//! │  staff    POST /products                                                │
//! │           PUT  /products/{id}           logs price changes              │
//! │           DEL  /products/{id}                                           │
//! │           GET  /products/{id}/price-history                             │
//! │                                                                          │
//! │  admin    GET  /users                   search + role filter            │
//! │           GET|PUT|DEL /users/{id}                                       │
//! │           GET  /dashboard               sales report                    │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! See [`config::WebConfig`]: `lacteos.toml` plus `LACTEOS_*` environment
//! overrides.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod response;

use std::sync::Arc;

use axum::Router;
use lacteos_db::Database;
use tower_http::trace::TraceLayer;

use crate::auth::JwtManager;

// Re-exports
pub use config::WebConfig;
pub use error::{AppError, AppResult};

/// Shared application state. Cheap to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<WebConfig>,
}

impl AppState {
    pub fn new(db: Database, config: WebConfig) -> Self {
        let jwt = JwtManager::new(config.jwt_secret.clone(), config.token_lifetime_secs);

        AppState {
            db,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        }
    }
}

/// Builds the application router with request tracing.
pub fn app(state: AppState) -> Router {
    api::router(state.clone())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
