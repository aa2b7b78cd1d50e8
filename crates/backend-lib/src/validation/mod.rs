// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Input validation for account requests.
//!
//! Password length is not checked here; the credential hasher owns that rule.

use edugame_common::{AccountUpdate, CreateAccountRequest};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::error::AppError;

const MAX_USERNAME_LENGTH: usize = 50;
const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit
const MAX_NAME_LENGTH: usize = 100;
const MAX_SCHOOL_LENGTH: usize = 200;
/// Per-account experience cap; keeps the store-wide total far inside i64
pub const MAX_EXPERIENCE: i64 = 1_000_000_000;

static EMAIL_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").unwrap());

/// Possible validation errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Invalid profile field: {0}")]
    InvalidProfile(String),

    #[error("Invalid progress: {0}")]
    InvalidProgress(String),
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::InvalidInput(err.to_string())
    }
}

/// Validate a username
pub fn validate_username(username: &str) -> ValidationResult<&str> {
    if username.trim().is_empty() {
        return Err(ValidationError::InvalidUsername(
            "Username must not be empty".to_string(),
        ));
    }

    if username.chars().count() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::InvalidUsername(format!(
            "Username cannot exceed {MAX_USERNAME_LENGTH} characters"
        )));
    }

    if username.chars().any(char::is_control) {
        return Err(ValidationError::InvalidUsername(
            "Username contains invalid characters".to_string(),
        ));
    }

    Ok(username)
}

/// Validate an email address
pub fn validate_email(email: &str) -> ValidationResult<&str> {
    if email.is_empty() {
        return Err(ValidationError::InvalidEmail(
            "Email address cannot be empty".to_string(),
        ));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::InvalidEmail(format!(
            "Email address cannot exceed {MAX_EMAIL_LENGTH} characters"
        )));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::InvalidEmail(
            "Invalid email address format".to_string(),
        ));
    }

    Ok(email)
}

fn validate_profile(first_name: &str, last_name: &str, grade: i64, school: &str) -> ValidationResult<()> {
    if first_name.chars().count() > MAX_NAME_LENGTH || last_name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::InvalidProfile(format!(
            "Names cannot exceed {MAX_NAME_LENGTH} characters"
        )));
    }

    if school.chars().count() > MAX_SCHOOL_LENGTH {
        return Err(ValidationError::InvalidProfile(format!(
            "School cannot exceed {MAX_SCHOOL_LENGTH} characters"
        )));
    }

    // 0 means "unset"
    if grade < 0 {
        return Err(ValidationError::InvalidProfile(
            "Grade cannot be negative".to_string(),
        ));
    }

    Ok(())
}

/// Validate everything in a create request except the password
pub fn validate_create_request(request: &CreateAccountRequest) -> ValidationResult<()> {
    validate_username(&request.username)?;
    validate_email(&request.email)?;
    validate_profile(
        &request.first_name,
        &request.last_name,
        request.grade,
        &request.school,
    )
}

/// Validate a full replacement of the mutable fields
pub fn validate_update(update: &AccountUpdate) -> ValidationResult<()> {
    validate_profile(
        &update.first_name,
        &update.last_name,
        update.grade,
        &update.school,
    )?;

    if update.game_level < 1 {
        return Err(ValidationError::InvalidProgress(
            "Game level must be at least 1".to_string(),
        ));
    }

    if update.experience < 0 {
        return Err(ValidationError::InvalidProgress(
            "Experience cannot be negative".to_string(),
        ));
    }

    if update.experience > MAX_EXPERIENCE {
        return Err(ValidationError::InvalidProgress(format!(
            "Experience cannot exceed {MAX_EXPERIENCE}"
        )));
    }

    Ok(())
}
