//! Error types for LCCN

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // Subscription Errors
    #[error("The specified subscription does not exist: {0}")]
    NoSuchSubscription(String),

    #[error("A subscription with the same callback URI and filter already exists: {existing_id}")]
    SubscriptionAlreadyExists { existing_id: String },

    // Validation Errors
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Persisted data that does not have the documented shape
    #[error("Data integrity violation: {0}")]
    DataIntegrity(String),

    // Database Errors
    #[error("Database error: {0}")]
    DatabaseError(String),

    // Internal Errors
    #[error("Internal error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::NoSuchSubscription(_) => "NoSuchSubscription",
            Error::SubscriptionAlreadyExists { .. } => "SubscriptionAlreadyExists",
            Error::InvalidFilter(_) => "InvalidFilter",
            Error::InvalidArgument(_) => "InvalidArgument",
            Error::DataIntegrity(_) => "DataIntegrity",
            Error::DatabaseError(_) => "ServiceUnavailable",
            Error::InternalError(_) => "InternalError",
            Error::Io(_) => "InternalError",
            Error::Other(_) => "InternalError",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidFilter(_) | Error::InvalidArgument(_) => 400,

            Error::NoSuchSubscription(_) => 404,

            // SOL003 answers a duplicate subscription with "See Other"
            Error::SubscriptionAlreadyExists { .. } => 303,

            Error::DatabaseError(_) => 503,

            _ => 500,
        }
    }

    /// Whether the failure came from an unavailable store and may succeed later.
    ///
    /// No retry happens here; the caller owns the retry policy.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::DatabaseError(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NoSuchSubscription(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::SubscriptionAlreadyExists { .. })
    }
}

/// API-facing error body
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProblemDetails {
    pub status: u16,
    pub title: String,
    pub detail: String,
}

impl From<&Error> for ProblemDetails {
    fn from(err: &Error) -> Self {
        ProblemDetails {
            status: err.http_status(),
            title: err.code().to_string(),
            detail: err.to_string(),
        }
    }
}
