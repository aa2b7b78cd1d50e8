// ================
// common/src/lib.rs
// ================
//! Common types and structures
//! shared between the account core and whatever transport sits in front of it.
//! Everything here is plain data; no type in this crate enforces an invariant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned account identifier
pub type AccountId = i64;

/// A student account as persisted by the store.
///
/// `password_hash` never leaves the process: it is skipped by serde in both
/// directions.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    /// School grade, 0 when unset
    pub grade: i64,
    pub school: String,
    pub game_level: i64,
    pub experience: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl Account {
    /// The account's current mutable fields, ready to be edited and passed
    /// back to an update.
    pub fn to_update(&self) -> AccountUpdate {
        AccountUpdate {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            grade: self.grade,
            school: self.school.clone(),
            game_level: self.game_level,
            experience: self.experience,
            is_active: self.is_active,
        }
    }
}

/// Payload for creating an account
/// # Fields
/// * `username` - Unique login name
/// * `email` - Unique contact address
/// * `password` - Plaintext password (min 6 chars), hashed before storage
/// * `first_name`, `last_name`, `grade`, `school` - Optional profile fields
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct CreateAccountRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub grade: i64,
    #[serde(default)]
    pub school: String,
}

/// Full replacement of an account's mutable fields.
///
/// There is no partial-patch form: a caller that wants to keep a field
/// passes its current value (see [`Account::to_update`]).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AccountUpdate {
    pub first_name: String,
    pub last_name: String,
    pub grade: i64,
    pub school: String,
    pub game_level: i64,
    pub experience: i64,
    pub is_active: bool,
}

/// Row handed to the store on creation, with the password already hashed
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub grade: i64,
    pub school: String,
}

/// Aggregate statistics, recomputed on every request
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Default)]
pub struct AccountStats {
    pub total_accounts: i64,
    pub active_accounts: i64,
    pub average_game_level: f64,
    pub total_experience: i64,
}
