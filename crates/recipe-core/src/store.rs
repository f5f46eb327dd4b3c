//! Relational storage for users, tokens and owned resources.
//!
//! Backed by SQLite through `sqlx`. The schema lives in `migrations/` and is
//! embedded at compile time; [`Database::migrate`] applies it. Foreign keys are
//! enabled on every connection so deleting a user cascades to their tokens,
//! tags and ingredients.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Utc;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::error::{RecipeError, Result};
use crate::models::{AuthToken, NewUser, OwnedResource, User, UserUpdate};
use crate::security::{generate_token_key, normalize_email, PasswordHasher};
use crate::validation::ValidationErrors;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const USER_COLUMNS: &str =
    "id, email, name, password_hash, is_active, is_staff, is_superuser, date_joined";

pub const MSG_EMAIL_REQUIRED: &str = "User must have an email address";
pub const MSG_EMAIL_TAKEN: &str = "user with this email already exists.";

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
    hasher: Arc<PasswordHasher>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("connections", &self.pool.size())
            .finish()
    }
}

impl Database {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true);

        if !config.is_in_memory() {
            if let Some(parent) = options.get_filename().parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }

        // Every connection to an in-memory database is a fresh database, so
        // the pool must hold on to exactly one.
        let pool_options = if config.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(config.max_connections)
        };

        let pool = pool_options.connect_with(options).await?;
        info!(url = %config.url, "Connected to database");

        Ok(Self {
            pool,
            hasher: Arc::new(PasswordHasher::new()),
        })
    }

    /// Connects and applies pending migrations.
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        let db = Self::connect(config).await?;
        db.migrate().await?;
        Ok(db)
    }

    pub async fn in_memory() -> Result<Self> {
        Self::open(&DatabaseConfig::in_memory()).await
    }

    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await?;
        debug!("Migrations applied");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    // -------- Users --------

    pub async fn create_user(&self, new_user: NewUser) -> Result<User> {
        if new_user.email.trim().is_empty() {
            return Err(ValidationErrors::single("email", MSG_EMAIL_REQUIRED).into());
        }

        let email = normalize_email(&new_user.email);
        let password_hash = self.hasher.hash_optional(new_user.password.as_deref())?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (email, name, password_hash, is_active, is_staff, is_superuser, date_joined) \
             VALUES (?, ?, ?, 1, ?, ?, ?) RETURNING {USER_COLUMNS}"
        ))
        .bind(&email)
        .bind(&new_user.name)
        .bind(&password_hash)
        .bind(new_user.is_staff)
        .bind(new_user.is_superuser)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_to_conflict(e, &email))?;

        info!(user_id = user.id, email = %user.email, "Created user");
        Ok(user)
    }

    pub async fn create_superuser(&self, email: &str, password: &str) -> Result<User> {
        let user = self.create_user(NewUser::new(email, password)).await?;

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET is_staff = 1, is_superuser = 1 WHERE id = ? RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .fetch_one(&self.pool)
        .await?;

        info!(user_id = user.id, "Promoted user to superuser");
        Ok(user)
    }

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?"
        ))
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn email_exists(&self, email: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(normalize_email(email))
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub fn check_password(&self, user: &User, password: &str) -> bool {
        self.hasher.verify(password, &user.password_hash)
    }

    /// Returns the user only if it exists, is active and the password matches.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Option<User>> {
        let Some(user) = self.find_user_by_email(email).await? else {
            debug!("Authentication failed: unknown email");
            return Ok(None);
        };

        if !user.is_active {
            warn!(user_id = user.id, "Authentication attempt for inactive user");
            return Ok(None);
        }

        if !self.check_password(&user, password) {
            debug!(user_id = user.id, "Authentication failed: bad password");
            return Ok(None);
        }

        Ok(Some(user))
    }

    pub async fn update_user(&self, id: i64, update: UserUpdate) -> Result<User> {
        let mut user = self
            .find_user_by_id(id)
            .await?
            .ok_or_else(|| RecipeError::NotFound(format!("user {}", id)))?;

        if update.is_empty() {
            return Ok(user);
        }

        if let Some(email) = update.email {
            user.email = normalize_email(&email);
        }
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(password) = update.password {
            user.password_hash = self.hasher.hash(&password)?;
        }

        let updated = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET email = ?, name = ?, password_hash = ? WHERE id = ? RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| unique_to_conflict(e, &user.email))?;

        debug!(user_id = id, "Updated user");
        Ok(updated)
    }

    pub async fn set_active(&self, id: i64, active: bool) -> Result<()> {
        let result = sqlx::query("UPDATE users SET is_active = ? WHERE id = ?")
            .bind(active)
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RecipeError::NotFound(format!("user {}", id)));
        }
        Ok(())
    }

    /// Deletes a user together with their token and owned resources.
    pub async fn delete_user(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RecipeError::NotFound(format!("user {}", id)));
        }
        info!(user_id = id, "Deleted user");
        Ok(())
    }

    // -------- Tokens --------

    /// Returns the user's token, creating one on first use.
    pub async fn get_or_create_token(&self, user_id: i64) -> Result<AuthToken> {
        let existing = sqlx::query_as::<_, AuthToken>(
            "SELECT key, user_id, created_at FROM auth_tokens WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(token) = existing {
            return Ok(token);
        }

        let token = sqlx::query_as::<_, AuthToken>(
            "INSERT INTO auth_tokens (key, user_id, created_at) VALUES (?, ?, ?) \
             ON CONFLICT (user_id) DO UPDATE SET user_id = excluded.user_id \
             RETURNING key, user_id, created_at",
        )
        .bind(generate_token_key())
        .bind(user_id)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await?;

        debug!(user_id, "Issued auth token");
        Ok(token)
    }

    pub async fn user_for_token(&self, key: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT u.id, u.email, u.name, u.password_hash, u.is_active, u.is_staff, u.is_superuser, u.date_joined \
             FROM auth_tokens t JOIN users u ON u.id = t.user_id WHERE t.key = ?",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    // -------- Owned resources --------

    /// Rows owned by `user_id`, ordered by name descending.
    pub async fn list_owned<T: OwnedResource>(&self, user_id: i64) -> Result<Vec<T>> {
        let rows = sqlx::query_as::<Sqlite, T>(&format!(
            "SELECT id, name, user_id FROM {} WHERE user_id = ? ORDER BY name DESC, id DESC",
            T::TABLE
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn create_owned<T: OwnedResource>(&self, user_id: i64, name: &str) -> Result<T> {
        let row = sqlx::query_as::<Sqlite, T>(&format!(
            "INSERT INTO {} (name, user_id) VALUES (?, ?) RETURNING id, name, user_id",
            T::TABLE
        ))
        .bind(name)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                RecipeError::NotFound(format!("user {}", user_id))
            }
            other => other.into(),
        })?;

        debug!(user_id, id = row.id(), kind = T::LABEL, "Created owned resource");
        Ok(row)
    }

    pub async fn count_owned<T: OwnedResource>(&self, user_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE user_id = ?",
            T::TABLE
        ))
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn exists_owned<T: OwnedResource>(&self, user_id: i64, name: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM {} WHERE user_id = ? AND name = ?",
            T::TABLE
        ))
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }
}

fn unique_to_conflict(err: sqlx::Error, email: &str) -> RecipeError {
    match err {
        sqlx::Error::Database(ref db) if db.is_unique_violation() => {
            RecipeError::Conflict(format!("email {} already registered", email))
        }
        other => other.into(),
    }
}
