use thiserror::Error;

use agora_store::StoreError;

/// Errors produced by the application shell.
#[derive(Error, Debug)]
pub enum AppError {
    /// Underlying store failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// An operation required a signed-in user and none was set.
    #[error("No user is signed in")]
    NotSignedIn,

    /// The login username was empty after normalization.
    #[error("Username cannot be empty")]
    InvalidUsername,
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AppError>;
