use crate::db::models::DbAccount;
use crate::db::schema::{SQLITE_INIT, USER_SPOTIFY_COLUMNS};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use tracing::info;

pub type SqlitePool = Pool<Sqlite>;

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, spotify_id, \
    spotify_refresh_token, spotify_access_token, spotify_token_expires_at";

/// Open a pool for `database_url`, creating the file if needed.
///
/// An in-memory database lives only as long as its connection, so it gets a
/// single connection that is never recycled.
pub async fn connect(database_url: &str) -> Result<SqlitePool, AppError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let mut pool_opts = SqlitePoolOptions::new();
    if database_url.contains(":memory:") {
        pool_opts = pool_opts
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None);
    }
    Ok(pool_opts.connect_with(connect_opts).await?)
}

#[derive(Clone)]
pub struct AccountStorage {
    pool: SqlitePool,
}

impl AccountStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL, then add any
    /// Spotify columns the `users` table is missing. Safe to run on every start.
    pub async fn init_schema(&self) -> Result<(), AppError> {
        // execute statements one by one (sqlx::query runs a single statement)
        for stmt in SQLITE_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        self.ensure_user_columns().await
    }

    async fn ensure_user_columns(&self) -> Result<(), AppError> {
        let existing: Vec<String> = sqlx::query("PRAGMA table_info(users)")
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(|row| row.try_get::<String, _>("name"))
            .collect::<Result<_, _>>()?;

        for (column, decl) in USER_SPOTIFY_COLUMNS {
            if existing.iter().any(|c| c == column) {
                continue;
            }
            sqlx::query(&format!("ALTER TABLE users ADD COLUMN {column} {decl}"))
                .execute(&self.pool)
                .await?;
            info!(column, "added column to users");
        }
        Ok(())
    }

    /// Insert a new account. Username and email must both be unused.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<DbAccount, AppError> {
        if self.find_by_username(username).await?.is_some() {
            return Err(AppError::Duplicate(
                "That username is already taken.".to_string(),
            ));
        }
        let taken: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        if taken.is_some() {
            return Err(AppError::Duplicate(
                "That email is already registered.".to_string(),
            ));
        }

        let id = sqlx::query("INSERT INTO users (username, email, password_hash) VALUES (?, ?, ?)")
            .bind(username)
            .bind(email)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AppError::Duplicate("That username or email is already in use.".to_string())
                }
                _ => AppError::Database(e),
            })?
            .last_insert_rowid();

        self.get_by_id(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("account {id} vanished after insert")))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<DbAccount>, AppError> {
        let account = sqlx::query_as::<_, DbAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<DbAccount>, AppError> {
        let account = sqlx::query_as::<_, DbAccount>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    /// Store a freshly linked Spotify account (OAuth callback).
    pub async fn save_spotify_link(
        &self,
        id: i64,
        spotify_id: Option<&str>,
        refresh_token: &str,
        access_token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"UPDATE users SET
                spotify_id = ?,
                spotify_refresh_token = ?,
                spotify_access_token = ?,
                spotify_token_expires_at = ?
              WHERE id = ?"#,
        )
        .bind(spotify_id)
        .bind(refresh_token)
        .bind(access_token)
        .bind(expires_at)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Persist a refreshed access token. A `None` refresh token keeps the stored one.
    pub async fn update_spotify_tokens(
        &self,
        id: i64,
        access_token: &str,
        expires_at: DateTime<Utc>,
        refresh_token: Option<&str>,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"UPDATE users SET
                spotify_access_token = ?,
                spotify_token_expires_at = ?,
                spotify_refresh_token = COALESCE(?, spotify_refresh_token)
              WHERE id = ?"#,
        )
        .bind(access_token)
        .bind(expires_at)
        .bind(refresh_token)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Drop stored tokens so the user has to relink. The Spotify user id is kept.
    pub async fn clear_spotify_tokens(&self, id: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"UPDATE users SET
                spotify_refresh_token = NULL,
                spotify_access_token = NULL,
                spotify_token_expires_at = NULL
              WHERE id = ?"#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Forget the Spotify linkage entirely.
    pub async fn unlink_spotify(&self, id: i64) -> Result<(), AppError> {
        sqlx::query(
            r#"UPDATE users SET
                spotify_id = NULL,
                spotify_refresh_token = NULL,
                spotify_access_token = NULL,
                spotify_token_expires_at = NULL
              WHERE id = ?"#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Duration;

    pub(crate) async fn storage() -> AccountStorage {
        let pool = connect("sqlite::memory:").await.unwrap();
        let storage = AccountStorage::new(pool);
        storage.init_schema().await.unwrap();
        storage
    }

    #[tokio::test]
    async fn init_schema_is_idempotent() {
        let storage = storage().await;
        storage.init_schema().await.unwrap();

        let columns: Vec<String> = sqlx::query("PRAGMA table_info(users)")
            .fetch_all(storage.pool())
            .await
            .unwrap()
            .iter()
            .map(|r| r.get::<String, _>("name"))
            .collect();
        for (column, _) in USER_SPOTIFY_COLUMNS {
            assert_eq!(columns.iter().filter(|c| c == column).count(), 1);
        }
    }

    #[tokio::test]
    async fn legacy_users_table_gains_spotify_columns() {
        let pool = connect("sqlite::memory:").await.unwrap();
        sqlx::query(
            "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, username TEXT NOT NULL UNIQUE, \
             email TEXT NOT NULL UNIQUE, password_hash TEXT NOT NULL, spotify_id TEXT NULL)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO users (username, email, password_hash) VALUES ('old', 'old@x', 'h')")
            .execute(&pool)
            .await
            .unwrap();

        let storage = AccountStorage::new(pool);
        storage.init_schema().await.unwrap();

        let old = storage.find_by_username("old").await.unwrap().unwrap();
        assert_eq!(old.spotify_refresh_token, None);
        assert!(!old.spotify_connected());
    }

    #[tokio::test]
    async fn create_rejects_taken_username_and_email() {
        let storage = storage().await;
        storage.create("ana", "ana@example.com", "h").await.unwrap();

        let err = storage.create("ana", "other@example.com", "h").await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate(msg) if msg.contains("username")));

        let err = storage.create("bob", "ana@example.com", "h").await.unwrap_err();
        assert!(matches!(err, AppError::Duplicate(msg) if msg.contains("email")));
    }

    #[tokio::test]
    async fn token_updates_keep_refresh_token_unless_rotated() {
        let storage = storage().await;
        let acc = storage.create("ana", "ana@example.com", "h").await.unwrap();
        let expiry = Utc::now() + Duration::hours(1);

        storage
            .save_spotify_link(acc.id, Some("sp-ana"), "r1", "a1", expiry)
            .await
            .unwrap();
        storage
            .update_spotify_tokens(acc.id, "a2", expiry, None)
            .await
            .unwrap();
        let acc = storage.get_by_id(acc.id).await.unwrap().unwrap();
        assert_eq!(acc.spotify_refresh_token.as_deref(), Some("r1"));
        assert_eq!(acc.spotify_access_token.as_deref(), Some("a2"));

        storage
            .update_spotify_tokens(acc.id, "a3", expiry, Some("r2"))
            .await
            .unwrap();
        let acc = storage.get_by_id(acc.id).await.unwrap().unwrap();
        assert_eq!(acc.spotify_refresh_token.as_deref(), Some("r2"));

        storage.clear_spotify_tokens(acc.id).await.unwrap();
        let acc = storage.get_by_id(acc.id).await.unwrap().unwrap();
        assert_eq!(acc.spotify_link(), Default::default());
        assert_eq!(acc.spotify_id.as_deref(), Some("sp-ana"));

        storage.unlink_spotify(acc.id).await.unwrap();
        let acc = storage.get_by_id(acc.id).await.unwrap().unwrap();
        assert_eq!(acc.spotify_id, None);
    }
}
