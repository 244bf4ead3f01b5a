//! Error types for the CPF authorizer

use thiserror::Error;

/// Errors raised by a record store when it cannot complete a request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("{operation} failed: {message}")]
    Unavailable {
        operation: &'static str,
        message: String,
    },

    #[error("{operation} timed out")]
    Timeout { operation: &'static str },

    #[error("malformed attribute {attribute}: {message}")]
    Malformed { attribute: String, message: String },
}

/// Errors returned by the profile repository
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("cpf must not be empty")]
    EmptyKey,

    #[error("{operation}: {source}")]
    Store {
        operation: &'static str,
        #[source]
        source: StoreError,
    },
}

impl RepositoryError {
    pub(crate) fn store(operation: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| RepositoryError::Store { operation, source }
    }
}

/// Errors raised while resolving configuration at start-up
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, RepositoryError>;
