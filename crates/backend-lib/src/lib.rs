// ============================
// edugame-backend/src/lib.rs
// ============================
//! Account data and access layer for the educational game.
//!
//! The transport layer holds an [`AppState`], checks
//! [`AppState::limiters`] for the caller's route class, then calls into
//! [`AppState::accounts`].

pub mod auth;
pub mod config;
pub mod error;
pub mod observability;
pub mod rate_limit;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::auth::{AccountService, CredentialHasher};
use crate::config::Settings;
use crate::error::AppError;
use crate::rate_limit::RateLimiters;
use crate::storage::{AccountStore, SqliteAccountStore};

pub use edugame_common::{Account, AccountId, AccountStats, AccountUpdate, CreateAccountRequest};

/// Application state shared across all handlers.
///
/// Constructed explicitly and passed around; nothing here is process-global,
/// so independent instances can coexist (one per test, for instance).
pub struct AppState<S> {
    /// Account operations
    pub accounts: Arc<AccountService<S>>,
    /// Per-route-class rate limiters
    pub limiters: Arc<RateLimiters>,
    pub settings: Arc<Settings>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            accounts: Arc::clone(&self.accounts),
            limiters: Arc::clone(&self.limiters),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<S: AccountStore> AppState<S> {
    /// Create a new application state around an existing store.
    ///
    /// Settings are validated here as well as at load time, since callers
    /// can build them by hand.
    pub fn new(storage: S, settings: Settings) -> Result<Self, AppError> {
        settings
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        let hasher = CredentialHasher::new(&settings.password)?;
        let limiters = RateLimiters::from_settings(&settings.rate_limit);

        Ok(Self {
            accounts: Arc::new(AccountService::new(storage, hasher)),
            limiters: Arc::new(limiters),
            settings: Arc::new(settings),
        })
    }

    /// Start evicting idle rate buckets on the configured schedule
    pub fn spawn_reclaimer(&self) -> JoinHandle<()> {
        rate_limit::spawn_reclaimer(
            Arc::clone(&self.limiters),
            self.settings.rate_limit.reclaim_interval(),
            self.settings.rate_limit.idle_ttl(),
        )
    }
}

impl AppState<SqliteAccountStore> {
    /// Connect to the configured database and build the state
    pub async fn open(settings: Settings) -> Result<Self, AppError> {
        settings
            .validate()
            .map_err(|e| AppError::Config(e.to_string()))?;
        let store =
            SqliteAccountStore::connect(&settings.database_url, settings.max_connections).await?;
        tracing::info!(database_url = %settings.database_url, "Account store opened");
        Self::new(store, settings)
    }
}
