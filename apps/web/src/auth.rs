//! Session tokens and access control.
//!
//! ## Request Flow
//! ```text
//! Authorization: Bearer <jwt>
//!        │
//!        ▼
//! JwtManager::validate_token ──► revoked? ──► load account ──► active?
//!        │                                                      │
//!        ▼                                                      ▼
//!   401 on any failure                              CurrentUser (extension)
//!                                                               │
//!                        require_staff / require_admin ─────────┤
//!                                                               ▼
//!                                                            handler
//! ```

use axum::extract::{FromRequestParts, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lacteos_core::Account;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::error::AppError;
use crate::AppState;

const ACCESS_TOKEN: &str = "access";

/// JWT claims structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,

    pub username: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration (Unix timestamp)
    pub exp: i64,

    /// Token id, the key used when the token is revoked
    pub jti: String,

    pub token_type: String,
}

impl Claims {
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// A freshly signed token as returned by signup and login.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

/// Signs and checks session tokens.
pub struct JwtManager {
    secret: String,
    lifetime_secs: i64,
}

impl JwtManager {
    pub fn new(secret: String, lifetime_secs: i64) -> Self {
        JwtManager {
            secret,
            lifetime_secs,
        }
    }

    /// Issues a session token for `account`.
    pub fn generate_token(&self, account: &Account) -> Result<IssuedToken, AppError> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.lifetime_secs);

        let claims = Claims {
            sub: account.user.id.clone(),
            username: account.user.username.clone(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            jti: Uuid::new_v4().to_string(),
            token_type: ACCESS_TOKEN.to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))?;

        Ok(IssuedToken {
            token,
            token_type: "Bearer",
            expires_at: exp,
        })
    }

    /// Checks signature, expiry and token type.
    pub fn validate_token(&self, token: &str) -> Result<Claims, AppError> {
        let claims = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| {
            warn!(error = %e, "Rejected session token");
            AppError::login_required()
        })?
        .claims;

        if claims.token_type != ACCESS_TOKEN {
            return Err(AppError::login_required());
        }

        Ok(claims)
    }
}

/// Extract bearer token from authorization header.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The logged-in account behind a request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub account: Account,
    pub claims: Claims,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        self.account.id()
    }
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Already resolved by a guard
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(extract_bearer_token)
            .ok_or_else(AppError::login_required)?;

        let claims = state.jwt.validate_token(token)?;

        if state.db.tokens().is_revoked(&claims.jti).await? {
            warn!(user_id = %claims.sub, "Revoked token presented");
            return Err(AppError::login_required());
        }

        let account = match state.db.users().get_account(&claims.sub).await {
            Ok(account) => account,
            Err(lacteos_db::DbError::NotFound { .. }) => return Err(AppError::login_required()),
            Err(e) => return Err(e.into()),
        };

        if !account.user.is_active {
            warn!(user_id = %account.user.id, "Inactive account presented a token");
            return Err(AppError::login_required());
        }

        let user = CurrentUser { account, claims };
        parts.extensions.insert(user.clone());
        Ok(user)
    }
}

async fn authenticate(state: &AppState, req: Request) -> Result<(CurrentUser, Request), AppError> {
    let (mut parts, body) = req.into_parts();
    let user = CurrentUser::from_request_parts(&mut parts, state).await?;
    Ok((user, Request::from_parts(parts, body)))
}

/// Guard: any logged-in, active account.
pub async fn require_login(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (_, req) = authenticate(&state, req).await?;
    Ok(next.run(req).await)
}

/// Guard: employees and admins.
pub async fn require_staff(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (user, req) = authenticate(&state, req).await?;

    if !user.account.is_employee() {
        warn!(
            user_id = %user.id(),
            username = %user.account.user.username,
            role = %user.account.profile.role,
            "Staff access denied"
        );
        return Err(AppError::permission_denied());
    }

    Ok(next.run(req).await)
}

/// Guard: admins (admin role or superuser).
pub async fn require_admin(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (user, req) = authenticate(&state, req).await?;

    if !user.account.is_admin() {
        warn!(
            user_id = %user.id(),
            username = %user.account.user.username,
            role = %user.account.profile.role,
            "Admin access denied"
        );
        return Err(AppError::admin_only());
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lacteos_core::{Role, User, UserProfile};

    fn account() -> Account {
        let now = Utc::now();
        Account {
            user: User {
                id: "user-1".to_string(),
                username: "ana".to_string(),
                email: String::new(),
                first_name: String::new(),
                last_name: String::new(),
                password_hash: String::new(),
                is_active: true,
                is_staff: false,
                is_superuser: false,
                date_joined: now,
                last_login: None,
            },
            profile: UserProfile {
                id: "profile-1".to_string(),
                user_id: "user-1".to_string(),
                role: Role::Customer,
                phone: String::new(),
                address: String::new(),
                created_at: now,
                updated_at: now,
            },
        }
    }

    #[test]
    fn test_jwt_roundtrip() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);

        let issued = manager.generate_token(&account()).unwrap();
        let claims = manager.validate_token(&issued.token).unwrap();

        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username, "ana");
        assert_eq!(claims.token_type, "access");
        assert_eq!(claims.expires_at().timestamp(), issued.expires_at.timestamp());
    }

    #[test]
    fn test_tokens_are_unique() {
        let manager = JwtManager::new("test-secret".to_string(), 3600);
        let a = manager.generate_token(&account()).unwrap();
        let b = manager.generate_token(&account()).unwrap();

        let a = manager.validate_token(&a.token).unwrap();
        let b = manager.validate_token(&b.token).unwrap();
        assert_ne!(a.jti, b.jti);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let issuer = JwtManager::new("secret-a".to_string(), 3600);
        let checker = JwtManager::new("secret-b".to_string(), 3600);

        let issued = issuer.generate_token(&account()).unwrap();
        assert!(matches!(
            checker.validate_token(&issued.token),
            Err(AppError::Unauthenticated(_))
        ));
    }

    #[test]
    fn test_expired_token_rejected() {
        // Past the default 60 s leeway
        let manager = JwtManager::new("test-secret".to_string(), -3600);
        let issued = manager.generate_token(&account()).unwrap();
        assert!(manager.validate_token(&issued.token).is_err());
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Basic abc"), None);
    }
}
