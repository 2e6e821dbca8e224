// src/core/errors.rs

//! Defines the error type shared by the identity source, the credential store and the
//! reconciliation tasks.

use thiserror::Error;

/// All failures a reconciliation or sweep cycle can run into.
///
/// The identity-side variants abort a whole reconciliation cycle; the store-side variants
/// only abandon the unit of work (one intent, one expired record) that produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OtuError {
    #[error("identity source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("identity source protocol error: {0}")]
    SourceProtocol(String),

    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("credential store rejected the account: {0}")]
    StoreConstraint(String),

    #[error("grant rejected: {0}")]
    GrantRejected(String),

    #[error("invalid {kind} '{value}'")]
    InvalidIdentifier { kind: &'static str, value: String },

    #[error("internal error: {0}")]
    Internal(String),
}

impl OtuError {
    /// Returns true for failures caused by connectivity rather than by the data sent.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            OtuError::SourceUnavailable(_) | OtuError::StoreUnavailable(_)
        )
    }

    /// Returns true if the error originated on the identity-source side.
    pub fn is_source_error(&self) -> bool {
        matches!(
            self,
            OtuError::SourceUnavailable(_) | OtuError::SourceProtocol(_)
        )
    }

    /// Classifies a driver error raised while touching account records or credentials.
    pub fn from_account_sql(e: sqlx::Error) -> Self {
        classify_sql(e, OtuError::StoreConstraint)
    }

    /// Classifies a driver error raised while applying a grant.
    pub fn from_grant_sql(e: sqlx::Error) -> Self {
        classify_sql(e, OtuError::GrantRejected)
    }
}

/// Splits driver errors into connectivity problems and server-side rejections.
fn classify_sql(e: sqlx::Error, rejected: fn(String) -> OtuError) -> OtuError {
    match e {
        sqlx::Error::Database(db_err) => rejected(db_err.message().to_string()),
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Protocol(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => OtuError::StoreUnavailable(e.to_string()),
        other => OtuError::Internal(other.to_string()),
    }
}

// --- From trait implementations for easy error conversion ---

impl From<reqwest::Error> for OtuError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            OtuError::SourceUnavailable(e.to_string())
        } else if e.is_decode() || e.is_body() {
            OtuError::SourceProtocol(e.to_string())
        } else {
            OtuError::SourceUnavailable(e.to_string())
        }
    }
}

impl From<serde_json::Error> for OtuError {
    fn from(e: serde_json::Error) -> Self {
        OtuError::SourceProtocol(format!("malformed response: {e}"))
    }
}

impl From<url::ParseError> for OtuError {
    fn from(e: url::ParseError) -> Self {
        OtuError::SourceProtocol(format!("invalid request URL: {e}"))
    }
}
