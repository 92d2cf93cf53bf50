//! HTTP handlers, grouped by area.
//!
//! Each area exposes `router(state)`; the state is needed up front because
//! the role guards are `from_fn_with_state` middleware.

pub mod accounts;
pub mod dashboard;
pub mod home;
pub mod products;
pub mod sales;
pub mod users;

use axum::Router;

use crate::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(home::router())
        .merge(accounts::router(state.clone()))
        .merge(products::router(state.clone()))
        .merge(sales::router(state.clone()))
        .merge(users::router(state.clone()))
        .merge(dashboard::router(state))
}

#[cfg(test)]
pub(crate) mod test_support {
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use lacteos_core::{Account, Product, ProductInput, Role};
    use lacteos_db::{Database, DbConfig, NewUser};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{app, AppState, WebConfig};

    pub async fn test_state() -> AppState {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        AppState::new(db, WebConfig::default())
    }

    /// Creates an account (without a usable password) and signs a token
    /// for it.
    pub async fn login_as(state: &AppState, username: &str, role: Role) -> (Account, String) {
        let account = state
            .db
            .users()
            .create(&NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                password_hash: "$argon2id$placeholder".to_string(),
                role,
                ..NewUser::default()
            })
            .await
            .unwrap();
        let token = state.jwt.generate_token(&account).unwrap().token;
        (account, token)
    }

    pub async fn create_product(state: &AppState, name: &str, price: i64, cost: i64, stock: i64) -> Product {
        state
            .db
            .products()
            .create(&ProductInput {
                name: name.to_string(),
                category: "Leches".to_string(),
                description: String::new(),
                price_cents: price,
                cost_cents: cost,
                stock,
                unit: "litro".to_string(),
                expiration_date: None,
            })
            .await
            .unwrap()
    }

    /// Sends one request through the full router and decodes the JSON body.
    pub async fn send(
        state: &AppState,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
