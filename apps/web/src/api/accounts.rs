//! Signup, login, logout and password change.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use chrono::Utc;
use lacteos_core::validation::validate_password;
use lacteos_core::{Account, Role};
use lacteos_db::password::{hash_password, verify_password};
use lacteos_db::NewUser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::{require_login, CurrentUser, IssuedToken};
use crate::error::{AppError, AppResult};
use crate::extract::AppJson;
use crate::response::{ok, ok_with_message, ApiResponse};
use crate::AppState;

const BAD_CREDENTIALS: &str = "Please enter a correct username and password.";
const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";
const WRONG_OLD_PASSWORD: &str =
    "Your old password was entered incorrectly. Please enter it again.";

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/accounts/signup", post(signup))
        .route("/accounts/login", post(login));

    let session = Router::new()
        .route("/accounts/logout", post(logout))
        .route("/accounts/password-change", post(change_password))
        .route("/accounts/me", get(me))
        .layer(middleware::from_fn_with_state(state, require_login));

    public.merge(session)
}

/// Account plus a fresh token.
#[derive(Debug, Serialize)]
pub struct Session {
    pub account: Account,
    #[serde(flatten)]
    pub token: IssuedToken,
}

// Argon2 work runs on the blocking pool.
async fn hash(password: String) -> AppResult<String> {
    let hashed = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))??;
    Ok(hashed)
}

async fn verify(password: String, hash: String) -> AppResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub password: String,
    pub password_confirm: String,
}

/// Creates a customer account and logs it in.
pub async fn signup(
    State(state): State<AppState>,
    AppJson(req): AppJson<SignupRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Session>>)> {
    if req.password != req.password_confirm {
        return Err(AppError::Validation(PASSWORD_MISMATCH.to_string()));
    }
    validate_password(&req.password)?;

    let password_hash = hash(req.password).await?;
    let account = state
        .db
        .users()
        .create(&NewUser {
            username: req.username,
            email: req.email,
            first_name: req.first_name,
            last_name: req.last_name,
            password_hash,
            role: Role::Customer,
            ..NewUser::default()
        })
        .await?;

    let token = state.jwt.generate_token(&account)?;
    state.db.users().touch_last_login(account.id()).await?;

    info!(user_id = %account.id(), username = %account.user.username, "Account created");
    let message = format!("Welcome, {}!", account.user.username);

    Ok((
        StatusCode::CREATED,
        ok_with_message(Session { account, token }, message),
    ))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<Session>>> {
    let bad_credentials = || AppError::Unauthenticated(BAD_CREDENTIALS.to_string());

    let Some(user) = state.db.users().get_by_username(req.username.trim()).await? else {
        warn!(username = %req.username, "Login failed: unknown user");
        return Err(bad_credentials());
    };

    if !verify(req.password, user.password_hash.clone()).await? || !user.is_active {
        warn!(username = %user.username, "Login failed");
        return Err(bad_credentials());
    }

    let account = state.db.users().get_account(&user.id).await?;
    let token = state.jwt.generate_token(&account)?;
    state.db.users().touch_last_login(&user.id).await?;

    info!(user_id = %user.id, username = %user.username, "Logged in");
    Ok(ok(Session { account, token }))
}

/// Revokes the token used for this request.
pub async fn logout(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<ApiResponse<()>>> {
    let tokens = state.db.tokens();
    tokens
        .revoke(&user.claims.jti, Some(user.id()), user.claims.expires_at())
        .await?;

    let purged = tokens.purge_expired(Utc::now()).await?;
    info!(user_id = %user.id(), purged, "Logged out");

    Ok(ok_with_message((), "You have been logged out."))
}

#[derive(Debug, Deserialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password1: String,
    pub new_password2: String,
}

pub async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    AppJson(req): AppJson<PasswordChange>,
) -> AppResult<Json<ApiResponse<()>>> {
    if !verify(req.old_password, user.account.user.password_hash.clone()).await? {
        return Err(AppError::Validation(WRONG_OLD_PASSWORD.to_string()));
    }
    if req.new_password1 != req.new_password2 {
        return Err(AppError::Validation(PASSWORD_MISMATCH.to_string()));
    }
    validate_password(&req.new_password1)?;

    let password_hash = hash(req.new_password1).await?;
    state.db.users().set_password(user.id(), &password_hash).await?;

    Ok(ok_with_message((), "Your password was changed."))
}

pub async fn me(user: CurrentUser) -> Json<ApiResponse<Account>> {
    ok(user.account)
}
