// ============================
// edugame-backend/src/storage.rs
// ============================
//! Storage abstraction with a SQLite implementation.
//!
//! The store is the source of truth for uniqueness: `create` relies on the
//! engine's UNIQUE constraints and reports a violation as
//! [`AppError::Duplicate`]. Each mutating call is a single statement, so
//! it commits or fails as one unit.
use async_trait::async_trait;
use edugame_common::{Account, AccountId, AccountStats, AccountUpdate, NewAccount};

use crate::error::AppError;

pub mod sqlite;

pub use sqlite::SqliteAccountStore;

/// Trait for account storage backends
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Insert a new account. The store assigns `id`, both timestamps,
    /// `game_level = 1`, `experience = 0` and `is_active = true`.
    async fn create(&self, account: NewAccount) -> Result<Account, AppError>;

    async fn get_by_id(&self, id: AccountId) -> Result<Account, AppError>;

    async fn get_by_username(&self, username: &str) -> Result<Account, AppError>;

    /// Every account, newest first
    async fn list_all(&self) -> Result<Vec<Account>, AppError>;

    /// Replace the mutable fields and advance `updated_at`.
    /// Identity, credentials and `created_at` are never touched.
    async fn update(&self, id: AccountId, update: AccountUpdate) -> Result<Account, AppError>;

    /// Hard delete
    async fn delete(&self, id: AccountId) -> Result<(), AppError>;

    async fn stats(&self) -> Result<AccountStats, AppError>;
}
