// ============================
// edugame-backend/src/auth/mod.rs
// ============================
//! Credentials and the account service built on them.

pub mod password;
pub mod service;

pub use password::{CredentialHasher, MIN_PASSWORD_LENGTH};
pub use service::AccountService;
