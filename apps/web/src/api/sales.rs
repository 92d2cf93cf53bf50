//! Purchase flow and sale lookup. All routes need a login.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use lacteos_core::{Sale, SaleDraft, SaleItemDetail, SaleReceipt};
use serde::Serialize;
use tracing::{info, warn};

use crate::auth::{require_login, CurrentUser};
use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::response::{ok, ok_with_message, ApiResponse};
use crate::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/purchase", post(purchase))
        .route("/sales", get(my_sales))
        .route("/sales/{id}", get(detail))
        .layer(middleware::from_fn_with_state(state, require_login))
}

/// Records a sale for the requested lines.
///
/// Lines asking for more than is on hand are cut down and reported in
/// `warnings`; unknown products are skipped.
pub async fn purchase(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(draft): AppJson<SaleDraft>,
) -> AppResult<(StatusCode, Json<ApiResponse<SaleReceipt>>)> {
    let receipt = state.db.sales().record_sale(&draft, Some(user.id())).await?;

    for warning in &receipt.warnings {
        warn!(sale_id = %receipt.sale.id, "{}", warning);
    }
    info!(
        sale_id = %receipt.sale.id,
        user = %user.account.user.username,
        "Purchase completed"
    );

    let message = receipt.message();
    Ok((StatusCode::CREATED, ok_with_message(receipt, message)))
}

pub async fn my_sales(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<Vec<Sale>>>> {
    let sales = state.db.sales().list_by_creator(user.id()).await?;
    Ok(ok(sales))
}

#[derive(Debug, Serialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleItemDetail>,
}

/// A sale with its items. Visible to the user who recorded it and to staff.
pub async fn detail(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<SaleDetail>>> {
    let sale = state.db.sales().get(&id).await?;

    let is_owner = sale.created_by.as_deref() == Some(user.id());
    if !is_owner && !user.account.is_employee() {
        warn!(sale_id = %id, user_id = %user.id(), "Sale access denied");
        return Err(AppError::permission_denied());
    }

    let items = state.db.sales().get_items(&id).await?;
    Ok(ok(SaleDetail { sale, items }))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{create_product, login_as, send, test_state};
    use axum::http::{Method, StatusCode};
    use lacteos_core::Role;
    use serde_json::json;

    #[tokio::test]
    async fn test_purchase_requires_login() {
        let state = test_state().await;
        let (status, body) = send(&state, Method::POST, "/purchase", None, Some(json!({ "items": [] }))).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "You must log in to access this page.");
    }

    #[tokio::test]
    async fn test_purchase_clamps_and_totals() {
        let state = test_state().await;
        let (_, token) = login_as(&state, "cliente", Role::Customer).await;
        let milk = create_product(&state, "Leche", 2500, 1800, 3).await;
        let cream = create_product(&state, "Crema", 4000, 0, 10).await;

        let (status, body) = send(
            &state,
            Method::POST,
            "/purchase",
            Some(&token),
            Some(json!({
                "customer_name": "Maria",
                "items": [
                    { "product_id": milk.id, "quantity": 5 },
                    { "product_id": cream.id, "quantity": 2 }
                ]
            })),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        let receipt = &body["data"];
        assert_eq!(
            receipt["warnings"],
            json!(["Only 3 units available for Leche. Adjusted quantity."])
        );

        let items = receipt["items"].as_array().unwrap();
        assert_eq!(items.len(), 2);
        let subtotal_sum: i64 = items.iter().map(|i| i["subtotal_cents"].as_i64().unwrap()).sum();
        assert_eq!(receipt["sale"]["total_amount_cents"].as_i64().unwrap(), subtotal_sum);
        assert_eq!(subtotal_sum, 3 * 2500 + 2 * 4000);

        let milk = state.db.products().get(&milk.id).await.unwrap();
        assert_eq!(milk.stock, 0);
        let cream = state.db.products().get(&cream.id).await.unwrap();
        assert_eq!(cream.stock, 8);

        let sale_id = receipt["sale"]["id"].as_str().unwrap();
        assert_eq!(
            body["message"],
            format!("Sale #{} created successfully! Total: $155.00", sale_id)
        );
    }

    #[tokio::test]
    async fn test_stock_never_negative_across_purchases() {
        let state = test_state().await;
        let (_, token) = login_as(&state, "cliente", Role::Customer).await;
        let yogurt = create_product(&state, "Yogur", 1200, 700, 4).await;

        for _ in 0..3 {
            send(
                &state,
                Method::POST,
                "/purchase",
                Some(&token),
                Some(json!({ "items": [{ "product_id": yogurt.id, "quantity": 3 }] })),
            )
            .await;
        }

        let yogurt = state.db.products().get(&yogurt.id).await.unwrap();
        assert_eq!(yogurt.stock, 0);
        assert_eq!(state.db.sales().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_empty_and_invalid_purchases() {
        let state = test_state().await;
        let (_, token) = login_as(&state, "cliente", Role::Customer).await;

        let (status, body) = send(
            &state,
            Method::POST,
            "/purchase",
            Some(&token),
            Some(json!({ "items": [{ "product_id": "x", "quantity": 0 }] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Please select at least one item to purchase.");

        let (status, body) = send(
            &state,
            Method::POST,
            "/purchase",
            Some(&token),
            Some(json!({ "items": [{ "product_id": "missing", "quantity": 2 }] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "No valid items were added to the sale.");
        assert_eq!(state.db.sales().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_malformed_quantity_gets_error_envelope() {
        let state = test_state().await;
        let (_, token) = login_as(&state, "cliente", Role::Customer).await;

        let (status, body) = send(
            &state,
            Method::POST,
            "/purchase",
            Some(&token),
            Some(json!({ "items": [{ "product_id": "x", "quantity": "two" }] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert!(body["message"].as_str().unwrap().contains("quantity"));
        assert!(body["data"].is_null());
    }

    #[tokio::test]
    async fn test_oversized_total_rejected_without_side_effects() {
        let state = test_state().await;
        let (_, token) = login_as(&state, "cliente", Role::Customer).await;
        // Largest accepted price and stock; their product leaves i64
        let gouda = create_product(&state, "Gouda Reserva", 9_999_999_999, 0, 2_000_000_000).await;

        let (status, body) = send(
            &state,
            Method::POST,
            "/purchase",
            Some(&token),
            Some(json!({ "items": [{ "product_id": gouda.id, "quantity": 2_000_000_000 }] })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Sale amount is too large.");

        assert_eq!(state.db.sales().count().await.unwrap(), 0);
        assert_eq!(state.db.products().get(&gouda.id).await.unwrap().stock, 2_000_000_000);
    }

    #[tokio::test]
    async fn test_sale_detail_visibility() {
        let state = test_state().await;
        let (_, owner) = login_as(&state, "cliente", Role::Customer).await;
        let (_, other) = login_as(&state, "otro", Role::Customer).await;
        let (_, staff) = login_as(&state, "empleado", Role::Employee).await;
        let cheese = create_product(&state, "Queso", 9000, 6000, 5).await;

        let (_, body) = send(
            &state,
            Method::POST,
            "/purchase",
            Some(&owner),
            Some(json!({ "items": [{ "product_id": cheese.id, "quantity": 1 }] })),
        )
        .await;
        let uri = format!("/sales/{}", body["data"]["sale"]["id"].as_str().unwrap());

        let (status, body) = send(&state, Method::GET, &uri, Some(&owner), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["items"][0]["product_name"], "Queso");
        assert_eq!(body["data"]["sale"]["roi_bps"], 5000);

        let (status, _) = send(&state, Method::GET, &uri, Some(&staff), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&state, Method::GET, &uri, Some(&other), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&state, Method::GET, "/sales/missing", Some(&owner), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_my_sales_only_lists_own() {
        let state = test_state().await;
        let (_, ana) = login_as(&state, "ana", Role::Customer).await;
        let (_, luis) = login_as(&state, "luis", Role::Customer).await;
        let milk = create_product(&state, "Leche", 2500, 1800, 10).await;

        for token in [&ana, &ana, &luis] {
            send(
                &state,
                Method::POST,
                "/purchase",
                Some(token),
                Some(json!({ "items": [{ "product_id": milk.id, "quantity": 1 }] })),
            )
            .await;
        }

        let (status, body) = send(&state, Method::GET, "/sales", Some(&ana), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }
}
