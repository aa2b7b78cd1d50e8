//! Shared setup for integration tests.
#![allow(dead_code)]

use edugame_backend::config::{PasswordSettings, Settings};
use edugame_backend::storage::SqliteAccountStore;
use edugame_backend::{AppState, CreateAccountRequest};
use tempfile::TempDir;

/// Settings with a cheap hasher and a database inside `dir`
pub fn test_settings(dir: &TempDir) -> Settings {
    Settings {
        database_url: format!("sqlite://{}", dir.path().join("accounts.db").display()),
        password: PasswordSettings {
            min_length: 6,
            memory_kib: 64,
            iterations: 1,
            parallelism: 1,
        },
        ..Settings::default()
    }
}

/// Sets up an isolated on-disk state.
///
/// Keep the returned `TempDir` in scope for the duration of the test.
pub async fn setup_state() -> (AppState<SqliteAccountStore>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let state = AppState::open(test_settings(&temp_dir)).await.unwrap();
    (state, temp_dir)
}

pub fn create_request(username: &str, email: &str) -> CreateAccountRequest {
    CreateAccountRequest {
        username: username.to_string(),
        email: email.to_string(),
        password: "password123".to_string(),
        first_name: "Test".to_string(),
        last_name: "Student".to_string(),
        grade: 5,
        school: "Riverside".to_string(),
    }
}
