use thiserror::Error;

use super::repo_types::UniqueField;

/// Failures surfaced by the user store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("unique constraint violated on {0:?}")]
    Duplicate(UniqueField),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                match db.constraint() {
                    Some("users_email_key") => return StoreError::Duplicate(UniqueField::Email),
                    Some("users_phonenumber_key") => {
                        return StoreError::Duplicate(UniqueField::Phone)
                    }
                    _ => {}
                }
            }
        }
        StoreError::Other(anyhow::Error::new(err).context("users store"))
    }
}

/// Outcome kinds of a user operation.
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Request body is incomplete")]
    IncompleteRequest,
    #[error("Invalid email")]
    InvalidEmail,
    #[error("Request timed out")]
    TimedOut,
    #[error("Email already exists")]
    EmailExists,
    #[error("Phonenumber already exists")]
    PhoneExists,
    #[error("User not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for UserError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate(UniqueField::Email) => UserError::EmailExists,
            StoreError::Duplicate(UniqueField::Phone) => UserError::PhoneExists,
            StoreError::Other(e) => UserError::Internal(e),
        }
    }
}
