//! Account service: the one place password policy and store policy meet.
use std::sync::Arc;

use edugame_common::{Account, AccountId, AccountStats, AccountUpdate, CreateAccountRequest, NewAccount};
use tracing::instrument;
use zeroize::Zeroizing;

use super::CredentialHasher;
use crate::error::AppError;
use crate::observability::metrics;
use crate::storage::AccountStore;
use crate::validation::{validate_create_request, validate_update};

/// Inbound operation contract consumed by the transport layer
pub struct AccountService<S> {
    store: S,
    hasher: Arc<CredentialHasher>,
}

impl<S: AccountStore> AccountService<S> {
    pub fn new(store: S, hasher: CredentialHasher) -> Self {
        Self {
            store,
            hasher: Arc::new(hasher),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    /// Validate, hash the password off the async executor, then insert.
    ///
    /// The plaintext is zeroized once hashed and never reaches the store or
    /// the logs.
    #[instrument(skip_all, fields(username = %request.username))]
    pub async fn create_account(&self, mut request: CreateAccountRequest) -> Result<Account, AppError> {
        validate_create_request(&request)?;

        let mut password = std::mem::take(&mut request.password);
        let hasher = Arc::clone(&self.hasher);
        let password_hash =
            tokio::task::spawn_blocking(move || hasher.hash_secure(&mut password)).await??;

        let account = self
            .store
            .create(NewAccount {
                username: request.username,
                email: request.email,
                password_hash,
                first_name: request.first_name,
                last_name: request.last_name,
                grade: request.grade,
                school: request.school,
            })
            .await?;

        tracing::info!(account_id = account.id, "Account created");
        metrics::record_account_created();
        Ok(account)
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, AppError> {
        self.store.get_by_id(id).await
    }

    pub async fn get_account_by_username(&self, username: &str) -> Result<Account, AppError> {
        self.store.get_by_username(username).await
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        self.store.list_all().await
    }

    #[instrument(skip(self, update))]
    pub async fn update_account(&self, id: AccountId, update: AccountUpdate) -> Result<Account, AppError> {
        validate_update(&update)?;
        let account = self.store.update(id, update).await?;

        tracing::info!(account_id = id, is_active = account.is_active, "Account updated");
        metrics::record_account_updated();
        Ok(account)
    }

    #[instrument(skip(self))]
    pub async fn delete_account(&self, id: AccountId) -> Result<(), AppError> {
        self.store.delete(id).await?;

        tracing::info!(account_id = id, "Account deleted");
        metrics::record_account_deleted();
        Ok(())
    }

    pub async fn get_stats(&self) -> Result<AccountStats, AppError> {
        self.store.stats().await
    }

    /// Check credentials.
    ///
    /// An unknown username and a wrong password both fail with
    /// [`AppError::Auth`], and both pay for one hash verification.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Account, AppError> {
        let account = match self.store.get_by_username(username).await {
            Ok(account) => Some(account),
            Err(AppError::NotFound) => None,
            Err(err) => return Err(err),
        };

        let stored_hash = account.as_ref().map(|a| a.password_hash.clone());
        let password = Zeroizing::new(password.to_owned());
        let hasher = Arc::clone(&self.hasher);
        let verified = tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(&password, &hash),
            None => Ok(hasher.verify_decoy(&password)),
        })
        .await?;

        let verified = match verified {
            Ok(verified) => verified,
            Err(err) => {
                tracing::error!(error = %err, "Stored credential could not be verified");
                return Err(err);
            },
        };

        match account {
            Some(account) if verified => {
                tracing::info!(account_id = account.id, "Authentication succeeded");
                metrics::record_auth(true);
                Ok(account)
            },
            _ => {
                tracing::warn!("Authentication failed");
                metrics::record_auth(false);
                Err(AppError::Auth)
            },
        }
    }
}
