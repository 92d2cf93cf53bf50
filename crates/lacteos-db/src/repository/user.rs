//! # User Repository
//!
//! Accounts and their one-to-one profiles.
//!
//! A user row is never written without its profile: [`UserRepository::create`]
//! inserts both in one transaction. Reads go through [`ensure_profile`], so
//! a user imported without a profile gets a default (customer) one the first
//! time it is looked at.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{contains_pattern, new_id};
use lacteos_core::validation::{
    validate_email, validate_optional_text, validate_search_query, validate_username,
    MAX_PERSON_NAME, MAX_PHONE,
};
use lacteos_core::{Account, Role, User, UserProfile};

const USER_COLUMNS: &str = "u.id, u.username, u.email, u.first_name, u.last_name, \
     u.password_hash, u.is_active, u.is_staff, u.is_superuser, u.date_joined, u.last_login";

const PROFILE_COLUMNS: &str = "id, user_id, role, phone, address, created_at, updated_at";

/// Fields for a new account. The password must already be hashed.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password_hash: String,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub role: Role,
}

/// Filters for the admin user list. Blank values are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserFilter {
    /// Matches username, email, first or last name.
    pub search: Option<String>,
    pub role: Option<String>,
}

/// Partial update of an account and its profile. `None` leaves a field as is.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
    pub role: Option<Role>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates a user and its profile.
    ///
    /// ## Errors
    /// - `Domain(Validation)` for a malformed username, email or name
    /// - `UniqueViolation` if the username is taken
    pub async fn create(&self, new_user: &NewUser) -> DbResult<Account> {
        let username = new_user.username.trim();
        let email = new_user.email.trim();
        validate_username(username)?;
        validate_email(email)?;
        validate_optional_text("first_name", &new_user.first_name, MAX_PERSON_NAME)?;
        validate_optional_text("last_name", &new_user.last_name, MAX_PERSON_NAME)?;

        let now = Utc::now();
        let user = User {
            id: new_id(),
            username: username.to_string(),
            email: email.to_string(),
            first_name: new_user.first_name.trim().to_string(),
            last_name: new_user.last_name.trim().to_string(),
            password_hash: new_user.password_hash.clone(),
            is_active: true,
            is_staff: new_user.is_staff,
            is_superuser: new_user.is_superuser,
            date_joined: now,
            last_login: None,
        };
        let profile = UserProfile {
            id: new_id(),
            user_id: user.id.clone(),
            role: new_user.role,
            phone: String::new(),
            address: String::new(),
            created_at: now,
            updated_at: now,
        };

        debug!(username = %user.username, role = %profile.role, "Creating user");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, first_name, last_name, password_hash,
                is_active, is_staff, is_superuser, date_joined, last_login
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, NULL)
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.is_superuser)
        .bind(user.date_joined)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("username", &user.username),
            other => other,
        })?;

        sqlx::query(
            r#"
            INSERT INTO user_profiles (id, user_id, role, phone, address, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.user_id)
        .bind(profile.role)
        .bind(&profile.phone)
        .bind(&profile.address)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %user.id, username = %user.username, "User created");
        Ok(Account { user, profile })
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {} FROM users u WHERE u.id = ?1", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Case-sensitive lookup, as used by login.
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let sql = format!("SELECT {} FROM users u WHERE u.username = ?1", USER_COLUMNS);

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// The user with its profile (created on first access if missing).
    pub async fn get_account(&self, id: &str) -> DbResult<Account> {
        let user = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;

        let mut conn = self.pool.acquire().await?;
        let profile = ensure_profile(&mut conn, &user.id).await?;

        Ok(Account { user, profile })
    }

    /// Profile of a user, created with the default role if missing.
    pub async fn profile_for(&self, user_id: &str) -> DbResult<UserProfile> {
        if self.get_by_id(user_id).await?.is_none() {
            return Err(DbError::not_found("User", user_id));
        }

        let mut conn = self.pool.acquire().await?;
        ensure_profile(&mut conn, user_id).await
    }

    /// Accounts matching the filter, most recently joined first.
    pub async fn list(&self, filter: &UserFilter) -> DbResult<Vec<Account>> {
        let search = filter
            .search
            .as_deref()
            .map(validate_search_query)
            .transpose()?
            .filter(|s| !s.is_empty());
        let role = filter
            .role
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::parse::<Role>)
            .transpose()?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {} FROM users u LEFT JOIN user_profiles p ON p.user_id = u.id WHERE 1 = 1",
            USER_COLUMNS
        ));

        if let Some(term) = &search {
            let pattern = contains_pattern(term);
            qb.push(" AND (u.username LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR u.email LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR u.first_name LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR u.last_name LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        if let Some(role) = role {
            qb.push(" AND COALESCE(p.role, 'customer') = ")
                .push_bind(role.as_str());
        }

        qb.push(" ORDER BY u.date_joined DESC, u.rowid DESC");

        let mut conn = self.pool.acquire().await?;

        let users: Vec<User> = qb.build_query_as::<User>().fetch_all(&mut *conn).await?;

        debug!(count = users.len(), "Listed users");

        let mut accounts = Vec::with_capacity(users.len());
        for user in users {
            let profile = ensure_profile(&mut conn, &user.id).await?;
            accounts.push(Account { user, profile });
        }

        Ok(accounts)
    }

    /// Applies an admin edit to the account and its profile.
    ///
    /// ## Errors
    /// - `UniqueViolation` when renaming to a username already taken
    pub async fn update(&self, id: &str, changes: &UserUpdate) -> DbResult<Account> {
        if let Some(username) = &changes.username {
            validate_username(username)?;
        }
        if let Some(email) = &changes.email {
            validate_email(email.trim())?;
        }
        if let Some(first) = &changes.first_name {
            validate_optional_text("first_name", first, MAX_PERSON_NAME)?;
        }
        if let Some(last) = &changes.last_name {
            validate_optional_text("last_name", last, MAX_PERSON_NAME)?;
        }
        if let Some(phone) = &changes.phone {
            validate_optional_text("phone", phone, MAX_PHONE)?;
        }

        let mut account = self.get_account(id).await?;
        let user = &mut account.user;
        let profile = &mut account.profile;

        if let Some(username) = &changes.username {
            user.username = username.trim().to_string();
        }
        if let Some(email) = &changes.email {
            user.email = email.trim().to_string();
        }
        if let Some(first) = &changes.first_name {
            user.first_name = first.trim().to_string();
        }
        if let Some(last) = &changes.last_name {
            user.last_name = last.trim().to_string();
        }
        if let Some(active) = changes.is_active {
            user.is_active = active;
        }
        if let Some(staff) = changes.is_staff {
            user.is_staff = staff;
        }
        if let Some(role) = changes.role {
            profile.role = role;
        }
        if let Some(phone) = &changes.phone {
            profile.phone = phone.trim().to_string();
        }
        if let Some(address) = &changes.address {
            profile.address = address.trim().to_string();
        }
        profile.updated_at = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            UPDATE users SET
                username = ?2, email = ?3, first_name = ?4, last_name = ?5,
                is_active = ?6, is_staff = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.is_active)
        .bind(user.is_staff)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { .. } => DbError::duplicate("username", &user.username),
            other => other,
        })?;

        sqlx::query(
            r#"
            UPDATE user_profiles SET role = ?2, phone = ?3, address = ?4, updated_at = ?5
            WHERE user_id = ?1
            "#,
        )
        .bind(&user.id)
        .bind(profile.role)
        .bind(&profile.phone)
        .bind(&profile.address)
        .bind(profile.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %id, role = %account.profile.role, "User updated");
        Ok(account)
    }

    /// Replaces the stored password hash.
    pub async fn set_password(&self, id: &str, password_hash: &str) -> DbResult<()> {
        let result = sqlx::query("UPDATE users SET password_hash = ?2 WHERE id = ?1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(id = %id, "Password changed");
        Ok(())
    }

    pub async fn touch_last_login(&self, id: &str) -> DbResult<()> {
        sqlx::query("UPDATE users SET last_login = ?2 WHERE id = ?1")
            .bind(id)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Deletes a user. The profile cascades; sales and price history keep
    /// their rows with the author cleared.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(id = %id, "User deleted");
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Returns the profile of `user_id`, inserting a default one first if the
/// user has none.
pub(crate) async fn ensure_profile(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> DbResult<UserProfile> {
    let now = Utc::now();

    let inserted = sqlx::query(
        r#"
        INSERT INTO user_profiles (id, user_id, role, phone, address, created_at, updated_at)
        VALUES (?1, ?2, 'customer', '', '', ?3, ?3)
        ON CONFLICT(user_id) DO NOTHING
        "#,
    )
    .bind(new_id())
    .bind(user_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if inserted.rows_affected() > 0 {
        debug!(user_id = %user_id, "Created missing profile");
    }

    let sql = format!("SELECT {} FROM user_profiles WHERE user_id = ?1", PROFILE_COLUMNS);
    let profile = sqlx::query_as::<_, UserProfile>(&sql)
        .bind(user_id)
        .fetch_one(conn)
        .await?;

    Ok(profile)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::{create_account, test_db};
    use lacteos_core::{CoreError, ValidationError};

    #[tokio::test]
    async fn test_create_writes_profile() {
        let db = test_db().await;
        let account = create_account(&db, "empleado1", Role::Employee).await;

        assert_eq!(account.profile.user_id, account.user.id);
        assert!(account.is_employee());
        assert!(!account.is_admin());

        let fetched = db.users().get_account(account.id()).await.unwrap();
        assert_eq!(fetched.profile.id, account.profile.id);
        assert_eq!(fetched.profile.role, Role::Employee);
        assert!(fetched.user.is_active);
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let db = test_db().await;
        create_account(&db, "maria", Role::Customer).await;

        let err = db
            .users()
            .create(&NewUser {
                username: "maria".to_string(),
                password_hash: "x".to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap_err();

        match err {
            DbError::UniqueViolation { field, value } => {
                assert_eq!(field, "username");
                assert_eq!(value.as_deref(), Some("maria"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(db.users().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_invalid_username_rejected() {
        let db = test_db().await;
        let err = db
            .users()
            .create(&NewUser {
                username: "con espacios".to_string(),
                password_hash: "x".to_string(),
                ..NewUser::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DbError::Domain(CoreError::Validation(ValidationError::InvalidFormat { .. }))
        ));
    }

    #[tokio::test]
    async fn test_missing_profile_is_created_on_read() {
        let db = test_db().await;
        let account = create_account(&db, "legacy", Role::Admin).await;

        sqlx::query("DELETE FROM user_profiles WHERE user_id = ?1")
            .bind(account.id())
            .execute(db.pool())
            .await
            .unwrap();

        let profile = db.users().profile_for(account.id()).await.unwrap();
        assert_eq!(profile.role, Role::Customer);

        // Second read returns the same row
        let again = db.users().profile_for(account.id()).await.unwrap();
        assert_eq!(again.id, profile.id);
    }

    #[tokio::test]
    async fn test_superuser_is_admin() {
        let db = test_db().await;
        let account = db
            .users()
            .create(&NewUser {
                username: "root".to_string(),
                password_hash: "x".to_string(),
                is_superuser: true,
                is_staff: true,
                ..NewUser::default()
            })
            .await
            .unwrap();

        assert_eq!(account.profile.role, Role::Customer);
        assert!(account.is_admin());
        assert!(account.is_employee());
    }

    #[tokio::test]
    async fn test_list_filters_and_order() {
        let db = test_db().await;
        create_account(&db, "ana", Role::Customer).await;
        create_account(&db, "beto", Role::Employee).await;
        create_account(&db, "carla", Role::Admin).await;

        let all = db.users().list(&UserFilter::default()).await.unwrap();
        let names: Vec<_> = all.iter().map(|a| a.user.username.as_str()).collect();
        assert_eq!(names, vec!["carla", "beto", "ana"]);

        let staff = db
            .users()
            .list(&UserFilter {
                role: Some("employee".to_string()),
                ..UserFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(staff.len(), 1);
        assert_eq!(staff[0].user.username, "beto");

        let by_email = db
            .users()
            .list(&UserFilter {
                search: Some("CARLA@example".to_string()),
                role: Some(" ".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(by_email.len(), 1);

        let err = db
            .users()
            .list(&UserFilter {
                role: Some("owner".to_string()),
                ..UserFilter::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_update_account_and_profile() {
        let db = test_db().await;
        let account = create_account(&db, "diego", Role::Customer).await;

        let updated = db
            .users()
            .update(
                account.id(),
                &UserUpdate {
                    first_name: Some(" Diego ".to_string()),
                    role: Some(Role::Employee),
                    phone: Some("555-1234".to_string()),
                    ..UserUpdate::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.user.first_name, "Diego");
        assert_eq!(updated.user.email, "diego@example.com");
        assert_eq!(updated.profile.role, Role::Employee);

        let fetched = db.users().get_account(account.id()).await.unwrap();
        assert_eq!(fetched.profile.phone, "555-1234");
        assert!(fetched.is_employee());

        let err = db
            .users()
            .update("missing", &UserUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_rename_user() {
        let db = test_db().await;
        let account = create_account(&db, "fer", Role::Customer).await;
        create_account(&db, "gabi", Role::Customer).await;

        let renamed = db
            .users()
            .update(
                account.id(),
                &UserUpdate {
                    username: Some(" fernanda ".to_string()),
                    ..UserUpdate::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(renamed.user.username, "fernanda");
        assert!(db.users().get_by_username("fer").await.unwrap().is_none());
        assert!(db.users().get_by_username("fernanda").await.unwrap().is_some());

        let err = db
            .users()
            .update(
                account.id(),
                &UserUpdate {
                    username: Some("gabi".to_string()),
                    ..UserUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::UniqueViolation { ref field, ref value } if field == "username" && value.as_deref() == Some("gabi")
        ));

        let err = db
            .users()
            .update(
                account.id(),
                &UserUpdate {
                    username: Some("no valido!".to_string()),
                    ..UserUpdate::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let unchanged = db.users().get_account(account.id()).await.unwrap();
        assert_eq!(unchanged.user.username, "fernanda");
    }

    #[tokio::test]
    async fn test_password_login_and_delete() {
        let db = test_db().await;
        let account = create_account(&db, "eva", Role::Customer).await;

        db.users().set_password(account.id(), "new-hash").await.unwrap();
        db.users().touch_last_login(account.id()).await.unwrap();

        let user = db.users().get_by_username("eva").await.unwrap().unwrap();
        assert_eq!(user.password_hash, "new-hash");
        assert!(user.last_login.is_some());

        db.users().delete(account.id()).await.unwrap();
        assert!(db.users().get_by_id(account.id()).await.unwrap().is_none());
        assert!(matches!(
            db.users().delete(account.id()).await.unwrap_err(),
            DbError::NotFound { .. }
        ));

        let profiles: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM user_profiles")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(profiles, 0);
    }
}
