// ==========================
// tests/accounts.rs
// ==========================
//! End-to-end account behaviour against an on-disk database.
mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{create_request, setup_state, test_settings};
use edugame_backend::error::{AppError, DuplicateField};
use edugame_backend::AppState;
use tempfile::TempDir;

#[tokio::test]
async fn test_ids_unique_and_increasing_in_creation_order() {
    let (state, _temp_dir) = setup_state().await;

    let mut ids = Vec::new();
    for i in 0..5 {
        let account = state
            .accounts
            .create_account(create_request(&format!("user{i}"), &format!("user{i}@example.com")))
            .await
            .unwrap();
        ids.push(account.id);
    }

    assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
}

#[tokio::test]
async fn test_duplicate_username_and_email_rejected() {
    let (state, _temp_dir) = setup_state().await;
    state
        .accounts
        .create_account(create_request("sam", "sam@example.com"))
        .await
        .unwrap();

    let err = state
        .accounts
        .create_account(create_request("sam", "sam.other@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Duplicate { field: DuplicateField::Username }));

    let err = state
        .accounts
        .create_account(create_request("samantha", "sam@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Duplicate { field: DuplicateField::Email }));
}

#[tokio::test]
async fn test_update_never_changes_identity_and_advances_updated_at() {
    let (state, _temp_dir) = setup_state().await;
    let created = state
        .accounts
        .create_account(create_request("tess", "tess@example.com"))
        .await
        .unwrap();

    let mut update = created.to_update();
    update.experience = 40;
    let first = state.accounts.update_account(created.id, update.clone()).await.unwrap();

    // Same payload again still counts as a mutation
    let second = state.accounts.update_account(created.id, update).await.unwrap();

    for account in [&first, &second] {
        assert_eq!(account.id, created.id);
        assert_eq!(account.username, created.username);
        assert_eq!(account.email, created.email);
        assert_eq!(account.created_at, created.created_at);
    }
    assert!(first.updated_at > created.updated_at);
    assert!(second.updated_at > first.updated_at);
}

#[tokio::test]
async fn test_delete_then_get_is_not_found() {
    let (state, _temp_dir) = setup_state().await;
    let created = state
        .accounts
        .create_account(create_request("uma", "uma@example.com"))
        .await
        .unwrap();

    state.accounts.delete_account(created.id).await.unwrap();
    assert!(matches!(
        state.accounts.get_account(created.id).await,
        Err(AppError::NotFound)
    ));
}

#[tokio::test]
async fn test_stats_on_empty_store() {
    let (state, _temp_dir) = setup_state().await;
    let stats = state.accounts.get_stats().await.unwrap();

    assert_eq!(stats.total_accounts, 0);
    assert_eq!(stats.active_accounts, 0);
    assert_eq!(stats.average_game_level, 0.0);
    assert_eq!(stats.total_experience, 0);
}

#[tokio::test]
async fn test_authenticate_follows_most_recent_hash() {
    let (state, _temp_dir) = setup_state().await;
    state
        .accounts
        .create_account(create_request("vic", "vic@example.com"))
        .await
        .unwrap();

    assert!(state.accounts.authenticate("vic", "password123").await.is_ok());
    assert!(matches!(
        state.accounts.authenticate("vic", "password124").await,
        Err(AppError::Auth)
    ));
    assert!(matches!(
        state.accounts.authenticate("victor", "password123").await,
        Err(AppError::Auth)
    ));

    // Re-created account with a new password: the old one stops working
    let account = state.accounts.get_account_by_username("vic").await.unwrap();
    state.accounts.delete_account(account.id).await.unwrap();
    let mut request = create_request("vic", "vic@example.com");
    request.password = "brand-new-pw".to_string();
    state.accounts.create_account(request).await.unwrap();

    assert!(state.accounts.authenticate("vic", "brand-new-pw").await.is_ok());
    assert!(matches!(
        state.accounts.authenticate("vic", "password123").await,
        Err(AppError::Auth)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_same_username_exactly_one_wins() {
    let (state, _temp_dir) = setup_state().await;
    let state = Arc::new(state);
    const CALLERS: usize = 8;

    let handles: Vec<_> = (0..CALLERS)
        .map(|i| {
            let state = Arc::clone(&state);
            tokio::spawn(async move {
                state
                    .accounts
                    .create_account(create_request("racer", &format!("racer{i}@example.com")))
                    .await
            })
        })
        .collect();

    let mut successes = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(AppError::Duplicate { field: DuplicateField::Username }) => duplicates += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(duplicates, CALLERS - 1);
    assert_eq!(state.accounts.get_stats().await.unwrap().total_accounts, 1);
}

#[tokio::test]
async fn test_list_accounts_newest_first() {
    let (state, _temp_dir) = setup_state().await;
    for name in ["first", "second", "third"] {
        state
            .accounts
            .create_account(create_request(name, &format!("{name}@example.com")))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let names: Vec<_> = state
        .accounts
        .list_accounts()
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.username)
        .collect();
    assert_eq!(names, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let created = {
        let state = AppState::open(test_settings(&temp_dir)).await.unwrap();
        let account = state
            .accounts
            .create_account(create_request("wren", "wren@example.com"))
            .await
            .unwrap();
        state.accounts.store().close().await;
        account
    };

    let state = AppState::open(test_settings(&temp_dir)).await.unwrap();
    let loaded = state.accounts.get_account(created.id).await.unwrap();
    assert_eq!(loaded, created);
    assert!(state.accounts.authenticate("wren", "password123").await.is_ok());
}

#[tokio::test]
async fn test_states_are_isolated() {
    let (first, _dir_a) = setup_state().await;
    let (second, _dir_b) = setup_state().await;

    first
        .accounts
        .create_account(create_request("xena", "xena@example.com"))
        .await
        .unwrap();

    assert_eq!(first.accounts.get_stats().await.unwrap().total_accounts, 1);
    assert_eq!(second.accounts.get_stats().await.unwrap().total_accounts, 0);
    assert!(matches!(
        second.accounts.get_account_by_username("xena").await,
        Err(AppError::NotFound)
    ));
}
