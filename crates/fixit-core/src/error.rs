//! Error types for fixit

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("User with email {0} already exists")]
    DuplicateEmail(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Config(String),
}

impl Error {
    pub fn issue_not_found(id: &str) -> Self {
        Error::NotFound {
            entity: "Issue",
            id: id.to_string(),
        }
    }

    pub fn user_not_found(id: &str) -> Self {
        Error::NotFound {
            entity: "User",
            id: id.to_string(),
        }
    }

    /// Stable machine-readable name of the error kind
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unauthenticated => "unauthenticated",
            Error::Forbidden(_) => "forbidden",
            Error::NotFound { .. } => "not_found",
            Error::DuplicateEmail(_) => "duplicate_email",
            Error::InvalidCredentials => "invalid_credentials",
            Error::InvalidStatus(_) => "invalid_status",
            Error::Validation(_) => "validation_error",
            Error::AlreadyExists(_) => "already_exists",
            Error::Crypto(_) | Error::Io(_) | Error::Config(_) => "internal",
        }
    }
}
