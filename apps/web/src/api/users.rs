//! User administration. Admin only.

use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{middleware, Json, Router};
use lacteos_core::Account;
use lacteos_db::{UserFilter, UserUpdate};
use serde::Serialize;
use tracing::info;

use crate::auth::{require_admin, CurrentUser};
use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::response::{ok, ok_with_message, ApiResponse};
use crate::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/users", get(list))
        .route("/users/{id}", get(detail).put(update).delete(delete))
        .layer(middleware::from_fn_with_state(state, require_admin))
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<Account>,
    pub search: Option<String>,
    pub role: Option<String>,
}

/// Accounts, newest first, optionally filtered by text and role.
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let users = state.db.users().list(&filter).await?;

    Ok(ok(UserList {
        users,
        search: filter.search,
        role: filter.role,
    }))
}

pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Account>>> {
    let account = state.db.users().get_account(&id).await?;
    Ok(ok(account))
}

pub async fn update(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(id): Path<String>,
    AppJson(changes): AppJson<UserUpdate>,
) -> AppResult<Json<ApiResponse<Account>>> {
    let account = state.db.users().update(&id, &changes).await?;

    info!(id = %id, by = %admin.account.user.username, "User updated by admin");
    let message = format!("User '{}' updated successfully.", account.user.username);
    Ok(ok_with_message(account, message))
}

pub async fn delete(
    State(state): State<AppState>,
    admin: CurrentUser,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<()>>> {
    if id == admin.id() {
        return Err(AppError::Validation(
            "You cannot delete your own account.".to_string(),
        ));
    }

    let account = state.db.users().get_account(&id).await?;
    state.db.users().delete(&id).await?;

    info!(id = %id, by = %admin.account.user.username, "User deleted by admin");
    Ok(ok_with_message(
        (),
        format!("User '{}' deleted successfully.", account.user.username),
    ))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{login_as, send, test_state};
    use axum::http::{Method, StatusCode};
    use lacteos_core::Role;
    use lacteos_db::NewUser;
    use serde_json::json;

    #[tokio::test]
    async fn test_only_admins_get_in() {
        let state = test_state().await;
        let (_, customer) = login_as(&state, "cliente", Role::Customer).await;
        let (_, employee) = login_as(&state, "empleado", Role::Employee).await;
        let (_, admin) = login_as(&state, "admin", Role::Admin).await;

        let (status, _) = send(&state, Method::GET, "/users", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        for token in [&customer, &employee] {
            let (status, body) = send(&state, Method::GET, "/users", Some(token), None).await;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body["message"], "Only administrators can access this page.");
        }

        let (status, body) = send(&state, Method::GET, "/users", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["users"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_superuser_counts_as_admin() {
        let state = test_state().await;
        let account = state
            .db
            .users()
            .create(&NewUser {
                username: "root".to_string(),
                password_hash: "$argon2id$placeholder".to_string(),
                is_superuser: true,
                ..NewUser::default()
            })
            .await
            .unwrap();
        assert_eq!(account.profile.role, Role::Customer);
        let token = state.jwt.generate_token(&account).unwrap().token;

        let (status, _) = send(&state, Method::GET, "/users", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_filter_by_role_and_search() {
        let state = test_state().await;
        let (_, admin) = login_as(&state, "admin", Role::Admin).await;
        login_as(&state, "maria", Role::Customer).await;
        login_as(&state, "mario", Role::Employee).await;

        let (_, body) = send(&state, Method::GET, "/users?search=mari", Some(&admin), None).await;
        assert_eq!(body["data"]["users"].as_array().unwrap().len(), 2);

        let (_, body) = send(
            &state,
            Method::GET,
            "/users?search=mari&role=employee",
            Some(&admin),
            None,
        )
        .await;
        let users = body["data"]["users"].as_array().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["user"]["username"], "mario");

        let (status, _) = send(&state, Method::GET, "/users?role=jefe", Some(&admin), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_update_role_and_delete() {
        let state = test_state().await;
        let (admin_account, admin) = login_as(&state, "admin", Role::Admin).await;
        let (customer, customer_token) = login_as(&state, "cliente", Role::Customer).await;
        let uri = format!("/users/{}", customer.id());

        let (status, body) = send(
            &state,
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({ "role": "employee", "phone": "555-0101" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["profile"]["role"], "employee");
        assert_eq!(body["data"]["profile"]["phone"], "555-0101");

        // Promotion takes effect on the next request
        let (status, _) = send(&state, Method::GET, "/products/none/price-history", Some(&customer_token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send(
            &state,
            Method::DELETE,
            &format!("/users/{}", admin_account.id()),
            Some(&admin),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "You cannot delete your own account.");

        let (status, body) = send(
            &state,
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({ "username": "cliente.vip" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["user"]["username"], "cliente.vip");
        assert_eq!(body["message"], "User 'cliente.vip' updated successfully.");

        let (status, body) = send(
            &state,
            Method::PUT,
            &uri,
            Some(&admin),
            Some(json!({ "username": "admin" })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["code"], "CONFLICT");

        let (status, _) = send(&state, Method::DELETE, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&state, Method::GET, &uri, Some(&admin), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&state, Method::GET, "/accounts/me", Some(&customer_token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
