// Application error type and the progress store's own error type.
use thiserror::Error;

pub mod response;
pub mod store;

pub use store::{StoreError, StoreResult};

#[derive(Error, Debug)]
pub enum AppError {
    // Missing or unknown identity; answered with a redirect to registration.
    #[error("Identity error: {0}")]
    Identity(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Template error: {0}")]
    Template(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
