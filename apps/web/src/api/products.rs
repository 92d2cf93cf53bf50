//! Catalog handlers.
//!
//! Browsing is public; edits and the price log are staff only.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{middleware, Json, Router};
use lacteos_core::{CoreError, PriceHistory, Product, ProductInput};
use lacteos_db::{DbError, ProductFilter};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::{require_staff, CurrentUser};
use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::response::{ok, ok_with_message, ApiResponse};
use crate::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/products", get(list))
        .route("/products/{id}", get(detail));

    let staff = Router::new()
        .route("/products", post(create))
        .route("/products/{id}", put(update).delete(delete))
        .route("/products/{id}/price-history", get(price_history))
        .layer(middleware::from_fn_with_state(state, require_staff));

    public.merge(staff)
}

/// A product with its derived profit figures.
#[derive(Debug, Clone, Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub profit_per_unit_cents: i64,
    pub profit_margin_bps: i64,
    /// e.g. "41.67%"
    pub profit_margin: String,
    pub in_stock: bool,
}

impl From<Product> for ProductView {
    fn from(product: Product) -> Self {
        let margin = product.profit_margin();
        ProductView {
            profit_per_unit_cents: product.profit_per_unit().cents(),
            profit_margin_bps: margin.bps(),
            profit_margin: margin.to_string(),
            in_stock: product.in_stock(),
            product,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductList {
    pub products: Vec<ProductView>,
    pub categories: Vec<String>,
    pub category: Option<String>,
    pub search: Option<String>,
}

/// In-stock products, optionally filtered by category and text.
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let products = state.db.products().list_available(&filter).await?;
    let categories = state.db.products().categories().await?;

    Ok(ok(ProductList {
        products: products.into_iter().map(ProductView::from).collect(),
        categories,
        category: filter.category,
        search: filter.search,
    }))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<ProductView>>> {
    let product = state.db.products().get(&id).await?;
    Ok(ok(product.into()))
}

pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(input): AppJson<ProductInput>,
) -> AppResult<(StatusCode, Json<ApiResponse<ProductView>>)> {
    let product = state.db.products().create(&input).await?;

    info!(id = %product.id, by = %user.account.user.username, "Product created");
    let message = format!("Product '{}' created successfully.", product.name);

    Ok((StatusCode::CREATED, ok_with_message(product.into(), message)))
}

/// Edit form body: the product fields plus an optional reason that goes to
/// the price log.
#[derive(Debug, Deserialize)]
pub struct ProductUpdate {
    #[serde(flatten)]
    pub product: ProductInput,
    #[serde(default)]
    pub reason: String,
}

pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    AppJson(body): AppJson<ProductUpdate>,
) -> AppResult<Json<ApiResponse<ProductView>>> {
    let product = state
        .db
        .products()
        .update(&id, &body.product, Some(user.id()), &body.reason)
        .await?;

    let message = format!("Product '{}' updated successfully.", product.name);
    Ok(ok_with_message(product.into(), message))
}

pub async fn delete(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    let product = state.db.products().get(&id).await?;

    match state.db.products().delete(&id).await {
        Ok(()) => {}
        Err(DbError::Domain(CoreError::ProductInUse(_))) => {
            return Err(AppError::Conflict(format!(
                "Product '{}' has recorded sales and cannot be deleted.",
                product.name
            )));
        }
        Err(e) => return Err(e.into()),
    }

    info!(id = %id, by = %user.account.user.username, "Product deleted");
    Ok(ok_with_message(
        (),
        format!("Product '{}' deleted successfully.", product.name),
    ))
}

#[derive(Debug, Serialize)]
pub struct PriceLog {
    pub product: ProductView,
    pub history: Vec<PriceHistory>,
}

pub async fn price_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<PriceLog>>> {
    let product = state.db.products().get(&id).await?;
    let history = state.db.price_history().list_for_product(&id).await?;

    Ok(ok(PriceLog {
        product: product.into(),
        history,
    }))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{create_product, login_as, send, test_state};
    use axum::http::{Method, StatusCode};
    use lacteos_core::Role;
    use serde_json::json;

    fn product_body(name: &str, price: i64) -> serde_json::Value {
        json!({
            "name": name,
            "category": "Quesos",
            "price_cents": price,
            "cost_cents": 6000,
            "stock": 12,
            "unit": "kg"
        })
    }

    #[tokio::test]
    async fn test_list_filters() {
        let state = test_state().await;
        create_product(&state, "Leche Entera", 2500, 1800, 10).await;
        create_product(&state, "Leche Agotada", 2500, 1800, 0).await;

        let (status, body) = send(&state, Method::GET, "/products?search=leche", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let products = body["data"]["products"].as_array().unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0]["name"], "Leche Entera");
        assert_eq!(body["data"]["categories"], json!(["Leches"]));
        assert_eq!(body["data"]["search"], "leche");

        let (_, body) = send(&state, Method::GET, "/products?category=quesos", None, None).await;
        assert!(body["data"]["products"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detail_with_margin() {
        let state = test_state().await;
        let product = create_product(&state, "Queso", 9000, 6000, 3).await;

        let (status, body) =
            send(&state, Method::GET, &format!("/products/{}", product.id), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["profit_per_unit_cents"], 3000);
        assert_eq!(body["data"]["profit_margin_bps"], 5000);
        assert_eq!(body["data"]["profit_margin"], "50.00%");

        let (status, body) = send(&state, Method::GET, "/products/missing", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_customers_cannot_edit() {
        let state = test_state().await;
        let (_, token) = login_as(&state, "cliente", Role::Customer).await;

        let (status, _) = send(&state, Method::POST, "/products", None, Some(product_body("Queso", 9000))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(
            &state,
            Method::POST,
            "/products",
            Some(&token),
            Some(product_body("Queso", 9000)),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "You do not have permission to access this page.");
        assert_eq!(state.db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_staff_create_update_and_history() {
        let state = test_state().await;
        let (employee, token) = login_as(&state, "empleado", Role::Employee).await;

        let (status, body) = send(
            &state,
            Method::POST,
            "/products",
            Some(&token),
            Some(product_body("Queso Fresco", 9000)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Product 'Queso Fresco' created successfully.");
        let id = body["data"]["id"].as_str().unwrap().to_string();

        let mut update = product_body("Queso Fresco", 9500);
        update["reason"] = json!("nuevo proveedor");
        let (status, body) = send(
            &state,
            Method::PUT,
            &format!("/products/{}", id),
            Some(&token),
            Some(update),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["price_cents"], 9500);

        let (status, body) = send(
            &state,
            Method::GET,
            &format!("/products/{}/price-history", id),
            Some(&token),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let history = body["data"]["history"].as_array().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["price_cents"], 9500);
        assert_eq!(history[0]["reason"], "nuevo proveedor");
        assert_eq!(history[0]["changed_by"], employee.user.id.as_str());
    }

    #[tokio::test]
    async fn test_invalid_product_rejected() {
        let state = test_state().await;
        let (_, token) = login_as(&state, "admin", Role::Admin).await;

        let (status, body) = send(
            &state,
            Method::POST,
            "/products",
            Some(&token),
            Some(product_body("Queso", -1)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");

        let (status, body) = send(
            &state,
            Method::POST,
            "/products",
            Some(&token),
            Some(product_body("Queso", 9_000_000_000_000_000_000)),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "price must be at most 9999999999");

        let (status, body) = send(
            &state,
            Method::POST,
            "/products",
            Some(&token),
            Some(json!({ "name": "Queso", "price_cents": "caro" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "VALIDATION_ERROR");
        assert_eq!(state.db.products().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_protected_by_sales() {
        let state = test_state().await;
        let (_, token) = login_as(&state, "empleado", Role::Employee).await;
        let sold = create_product(&state, "Yogur", 1200, 700, 10).await;
        let unsold = create_product(&state, "Kefir", 3500, 2200, 10).await;

        let (status, _) = send(
            &state,
            Method::POST,
            "/purchase",
            Some(&token),
            Some(json!({ "items": [{ "product_id": sold.id, "quantity": 1 }] })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) =
            send(&state, Method::DELETE, &format!("/products/{}", sold.id), Some(&token), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "Product 'Yogur' has recorded sales and cannot be deleted.");

        let (status, body) =
            send(&state, Method::DELETE, &format!("/products/{}", unsold.id), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Product 'Kefir' deleted successfully.");
    }
}
