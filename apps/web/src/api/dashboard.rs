//! Admin sales dashboard.

use axum::extract::State;
use axum::routing::get;
use axum::{middleware, Json, Router};
use chrono::Utc;
use lacteos_db::DashboardReport;

use crate::auth::require_admin;
use crate::error::AppResult;
use crate::response::{ok, ApiResponse};
use crate::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .layer(middleware::from_fn_with_state(state, require_admin))
}

/// Sales report for today (UTC).
pub async fn dashboard(State(state): State<AppState>) -> AppResult<Json<ApiResponse<DashboardReport>>> {
    let today = Utc::now().date_naive();
    let report = state
        .db
        .reports()
        .dashboard(today, state.config.low_stock_threshold)
        .await?;

    Ok(ok(report))
}
