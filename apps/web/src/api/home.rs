//! Landing page and health check.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use lacteos_core::FEATURED_PRODUCTS;
use serde::Serialize;

use crate::api::products::ProductView;
use crate::error::AppResult;
use crate::response::{ok, ApiResponse};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
}

#[derive(Debug, Serialize)]
pub struct HomePage {
    pub featured_products: Vec<ProductView>,
}

/// Featured in-stock products.
pub async fn index(State(state): State<AppState>) -> AppResult<Json<ApiResponse<HomePage>>> {
    let featured = state.db.products().featured(FEATURED_PRODUCTS).await?;

    Ok(ok(HomePage {
        featured_products: featured.into_iter().map(ProductView::from).collect(),
    }))
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub database: bool,
    pub version: &'static str,
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let database = state.db.health_check().await;
    let status = if database {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        ok(Health {
            status: if database { "ok" } else { "degraded" },
            database,
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}
