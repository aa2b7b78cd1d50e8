//! SQLite-backed account store.
//!
//! Timestamps are stored as integer microseconds since the Unix epoch so that
//! `ORDER BY created_at` is exact. `updated_at` is written as
//! `MAX(now, updated_at + 1)`, which keeps it strictly increasing even when
//! two mutations land inside one clock tick.
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use edugame_common::{Account, AccountId, AccountStats, AccountUpdate, NewAccount};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;

use super::AccountStore;
use crate::error::{AppError, DuplicateField};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS accounts (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        username      TEXT    NOT NULL UNIQUE,
        email         TEXT    NOT NULL UNIQUE,
        password_hash TEXT    NOT NULL,
        first_name    TEXT    NOT NULL DEFAULT '',
        last_name     TEXT    NOT NULL DEFAULT '',
        grade         INTEGER NOT NULL DEFAULT 0,
        school        TEXT    NOT NULL DEFAULT '',
        game_level    INTEGER NOT NULL DEFAULT 1,
        experience    INTEGER NOT NULL DEFAULT 0,
        created_at    INTEGER NOT NULL,
        updated_at    INTEGER NOT NULL,
        is_active     BOOLEAN NOT NULL DEFAULT TRUE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_accounts_username ON accounts(username)",
    "CREATE INDEX IF NOT EXISTS idx_accounts_email ON accounts(email)",
    "CREATE INDEX IF NOT EXISTS idx_accounts_is_active ON accounts(is_active)",
];

const INSERT_ACCOUNT: &str = r#"
    INSERT INTO accounts (
        username, email, password_hash, first_name, last_name, grade, school,
        game_level, experience, created_at, updated_at, is_active
    )
    VALUES (?, ?, ?, ?, ?, ?, ?, 1, 0, ?, ?, TRUE)
    RETURNING *
"#;

const UPDATE_ACCOUNT: &str = r#"
    UPDATE accounts
    SET first_name = ?, last_name = ?, grade = ?, school = ?,
        game_level = ?, experience = ?, is_active = ?,
        updated_at = MAX(?, updated_at + 1)
    WHERE id = ?
    RETURNING *
"#;

// TOTAL() sums as a float and never raises on overflow; the CAST saturates
// at i64::MAX.
const ACCOUNT_STATS: &str = r#"
    SELECT
        COUNT(*) AS total_accounts,
        COALESCE(SUM(CASE WHEN is_active THEN 1 ELSE 0 END), 0) AS active_accounts,
        COALESCE(AVG(game_level), 0.0) AS average_game_level,
        CAST(MIN(TOTAL(experience), 9223372036854775807.0) AS INTEGER) AS total_experience
    FROM accounts
"#;

#[derive(Debug, FromRow)]
struct AccountRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    grade: i64,
    school: String,
    game_level: i64,
    experience: i64,
    created_at: i64,
    updated_at: i64,
    is_active: bool,
}

#[derive(Debug, FromRow)]
struct StatsRow {
    total_accounts: i64,
    active_accounts: i64,
    average_game_level: f64,
    total_experience: i64,
}

fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

fn from_micros(micros: i64) -> Result<DateTime<Utc>, AppError> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos)
        .ok_or_else(|| AppError::Internal(format!("timestamp out of range: {micros}")))
}

impl TryFrom<AccountRow> for Account {
    type Error = AppError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        Ok(Account {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            grade: row.grade,
            school: row.school,
            game_level: row.game_level,
            experience: row.experience,
            created_at: from_micros(row.created_at)?,
            updated_at: from_micros(row.updated_at)?,
            is_active: row.is_active,
        })
    }
}

/// Translate a UNIQUE violation into the field that collided
fn map_insert_error(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            // SQLite reports "UNIQUE constraint failed: accounts.<column>"
            let field = if db_err.message().contains("accounts.email") {
                DuplicateField::Email
            } else {
                DuplicateField::Username
            };
            return AppError::Duplicate { field };
        }
    }
    AppError::Storage(err)
}

/// SQLite implementation of [`AccountStore`]
#[derive(Clone, Debug)]
pub struct SqliteAccountStore {
    pool: SqlitePool,
}

impl SqliteAccountStore {
    /// Connect with a URL such as `sqlite://data/accounts.db`. The file and
    /// its parent directory are created when missing.
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        Self::connect_with(options, max_connections).await
    }

    /// Open (or create) a database file
    pub async fn open<P: AsRef<Path>>(path: P, max_connections: u32) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);
        Self::connect_with(options, max_connections).await
    }

    /// Private in-memory database. A single connection that never expires
    /// keeps the data alive for the life of the store.
    pub async fn in_memory() -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::init(pool).await
    }

    async fn connect_with(
        options: SqliteConnectOptions,
        max_connections: u32,
    ) -> Result<Self, AppError> {
        if let Some(parent) = options.get_filename().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| AppError::Storage(sqlx::Error::Io(e)))?;
            }
        }

        let options = options
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;
        Self::init(pool).await
    }

    async fn init(pool: SqlitePool) -> Result<Self, AppError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        tracing::debug!("Account schema ready");
        Ok(Self { pool })
    }

    /// Wait for in-flight queries and close every connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl AccountStore for SqliteAccountStore {
    async fn create(&self, account: NewAccount) -> Result<Account, AppError> {
        let now = now_micros();
        let row = sqlx::query_as::<_, AccountRow>(INSERT_ACCOUNT)
            .bind(&account.username)
            .bind(&account.email)
            .bind(&account.password_hash)
            .bind(&account.first_name)
            .bind(&account.last_name)
            .bind(account.grade)
            .bind(&account.school)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(map_insert_error)?;

        tracing::debug!(account_id = row.id, username = %row.username, "Inserted account");
        row.try_into()
    }

    async fn get_by_id(&self, id: AccountId) -> Result<Account, AppError> {
        sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)?
            .try_into()
    }

    async fn get_by_username(&self, username: &str) -> Result<Account, AppError> {
        sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)?
            .try_into()
    }

    async fn list_all(&self) -> Result<Vec<Account>, AppError> {
        sqlx::query_as::<_, AccountRow>("SELECT * FROM accounts ORDER BY created_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    async fn update(&self, id: AccountId, update: AccountUpdate) -> Result<Account, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(UPDATE_ACCOUNT)
            .bind(&update.first_name)
            .bind(&update.last_name)
            .bind(update.grade)
            .bind(&update.school)
            .bind(update.game_level)
            .bind(update.experience)
            .bind(update.is_active)
            .bind(now_micros())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(AppError::NotFound)?;

        tracing::debug!(account_id = id, "Updated account");
        row.try_into()
    }

    async fn delete(&self, id: AccountId) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        tracing::debug!(account_id = id, "Deleted account");
        Ok(())
    }

    async fn stats(&self) -> Result<AccountStats, AppError> {
        let row = sqlx::query_as::<_, StatsRow>(ACCOUNT_STATS)
            .fetch_one(&self.pool)
            .await?;

        Ok(AccountStats {
            total_accounts: row.total_accounts,
            active_accounts: row.active_accounts,
            average_game_level: row.average_game_level,
            total_experience: row.total_experience,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_account(username: &str, email: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$v=19$m=64,t=1,p=1$c2FsdHNhbHQ$aGFzaGhhc2g".to_string(),
            first_name: "Test".to_string(),
            last_name: "Student".to_string(),
            grade: 3,
            school: "Elm".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_assigns_server_fields() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        let account = store.create(new_account("alice", "alice@example.com")).await.unwrap();

        assert!(account.id > 0);
        assert_eq!(account.username, "alice");
        assert_eq!(account.game_level, 1);
        assert_eq!(account.experience, 0);
        assert!(account.is_active);
        assert_eq!(account.created_at, account.updated_at);
        assert_eq!(account.grade, 3);
    }

    #[tokio::test]
    async fn test_duplicate_username_and_email() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        store.create(new_account("alice", "alice@example.com")).await.unwrap();

        let err = store
            .create(new_account("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate { field: DuplicateField::Username }));

        let err = store
            .create(new_account("bob", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Duplicate { field: DuplicateField::Email }));
    }

    #[tokio::test]
    async fn test_lookup_by_id_and_username() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        let created = store.create(new_account("carol", "carol@example.com")).await.unwrap();

        assert_eq!(store.get_by_id(created.id).await.unwrap(), created);
        assert_eq!(store.get_by_username("carol").await.unwrap(), created);

        assert!(matches!(store.get_by_id(9999).await, Err(AppError::NotFound)));
        assert!(matches!(
            store.get_by_username("nobody").await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_all_newest_first() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        let first = store.create(new_account("a", "a@example.com")).await.unwrap();
        let second = store.create(new_account("b", "b@example.com")).await.unwrap();
        let third = store.create(new_account("c", "c@example.com")).await.unwrap();

        let ids: Vec<_> = store.list_all().await.unwrap().iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
    }

    #[tokio::test]
    async fn test_update_replaces_mutable_fields_only() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        let created = store.create(new_account("dave", "dave@example.com")).await.unwrap();

        let update = AccountUpdate {
            first_name: "David".to_string(),
            last_name: "Jones".to_string(),
            grade: 6,
            school: "Oak".to_string(),
            game_level: 4,
            experience: 900,
            is_active: false,
        };
        let updated = store.update(created.id, update.clone()).await.unwrap();

        assert_eq!(updated.to_update(), update);
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.username, created.username);
        assert_eq!(updated.email, created.email);
        assert_eq!(updated.password_hash, created.password_hash);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);
    }

    #[tokio::test]
    async fn test_update_missing_account() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        let created = store.create(new_account("erin", "erin@example.com")).await.unwrap();

        let result = store.update(created.id + 1, created.to_update()).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_is_hard_and_ids_are_not_reused() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        let created = store.create(new_account("frank", "frank@example.com")).await.unwrap();

        store.delete(created.id).await.unwrap();
        assert!(matches!(store.get_by_id(created.id).await, Err(AppError::NotFound)));
        assert!(matches!(store.delete(created.id).await, Err(AppError::NotFound)));

        // Username is free again, but the id is not
        let again = store.create(new_account("frank", "frank@example.com")).await.unwrap();
        assert!(again.id > created.id);
    }

    #[tokio::test]
    async fn test_stats_on_empty_store() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        let stats = store.stats().await.unwrap();
        assert_eq!(stats, AccountStats::default());
        assert_eq!(stats.average_game_level, 0.0);
    }

    #[tokio::test]
    async fn test_stats_total_experience_saturates() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        for name in ["big1", "big2"] {
            let account = store
                .create(new_account(name, &format!("{name}@example.com")))
                .await
                .unwrap();
            let mut update = account.to_update();
            update.experience = i64::MAX / 2 + 1;
            store.update(account.id, update).await.unwrap();
        }

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_accounts, 2);
        assert_eq!(stats.total_experience, i64::MAX);
    }

    #[tokio::test]
    async fn test_stats_aggregates() {
        let store = SqliteAccountStore::in_memory().await.unwrap();
        let a = store.create(new_account("a", "a@example.com")).await.unwrap();
        let b = store.create(new_account("b", "b@example.com")).await.unwrap();
        store.create(new_account("c", "c@example.com")).await.unwrap();

        let mut update = a.to_update();
        update.game_level = 4;
        update.experience = 300;
        store.update(a.id, update).await.unwrap();

        let mut update = b.to_update();
        update.experience = 50;
        update.is_active = false;
        store.update(b.id, update).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_accounts, 3);
        assert_eq!(stats.active_accounts, 2);
        assert!((stats.average_game_level - 2.0).abs() < f64::EPSILON);
        assert_eq!(stats.total_experience, 350);
    }

    #[test]
    fn test_micros_round_trip() {
        let ts = from_micros(1_700_000_000_123_456).unwrap();
        assert_eq!(ts.timestamp_micros(), 1_700_000_000_123_456);
    }
}
