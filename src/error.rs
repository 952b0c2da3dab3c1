//! Error types for the SPBI dashboard.
//!
//! `GatewayError` is what the query gateway reports; `DashboardError` is the
//! application-level error used by configuration loading, action validation,
//! and the CLI.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Where in a gateway call a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Opening the connection (bad credentials, unreachable host, missing driver).
    Connect,
    /// Preparing or running the statement, or committing it.
    Execute,
    /// Reading the result set.
    Fetch,
}

impl Phase {
    /// Returns the phase as a lowercase string for logs and JSON output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Execute => "execute",
            Self::Fetch => "fetch",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by a driver implementation.
#[derive(Error, Debug)]
pub enum DriverError {
    /// Error reported by sqlx.
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    /// The configured driver id does not name a supported backend.
    #[error("unsupported driver '{0}'")]
    UnsupportedDriver(String),

    /// The configured driver artifact does not exist on disk.
    #[error("driver artifact not found: {}", .0.display())]
    MissingArtifact(PathBuf),

    /// The connection URI could not be understood.
    #[error("invalid connection URI: {0}")]
    InvalidUri(String),

    /// Statement text could not be tokenized for placeholder rewriting.
    #[error("cannot prepare statement: {0}")]
    Statement(String),

    /// A row's width does not match the result-set columns.
    #[error("row {row} has {actual} values but the result set has {expected} columns")]
    RowWidth {
        row: usize,
        expected: usize,
        actual: usize,
    },

    /// `next_row` was called with no open result set.
    #[error("no open result set")]
    NoResultSet,

    /// Failure injected by the mock driver.
    #[error("{0}")]
    Mock(String),
}

/// Failure of a single gateway call.
///
/// The connection used by the call has always been released by the time this
/// error reaches the caller.
#[derive(Error, Debug)]
#[error("{phase} failed: {message}")]
pub struct GatewayError {
    /// Phase the call was in when it failed.
    pub phase: Phase,
    /// Human-readable description, including the driver's message.
    pub message: String,
    /// Underlying driver error.
    #[source]
    pub cause: DriverError,
}

impl GatewayError {
    /// Wraps a driver error, tagging it with the phase it occurred in.
    pub fn new(phase: Phase, cause: DriverError) -> Self {
        Self {
            phase,
            message: cause.to_string(),
            cause,
        }
    }

    /// Creates a connect-phase error.
    pub fn connect(cause: DriverError) -> Self {
        Self::new(Phase::Connect, cause)
    }

    /// Creates an execute-phase error.
    pub fn execute(cause: DriverError) -> Self {
        Self::new(Phase::Execute, cause)
    }

    /// Creates a fetch-phase error.
    pub fn fetch(cause: DriverError) -> Self {
        Self::new(Phase::Fetch, cause)
    }
}

/// Main error type for dashboard operations.
#[derive(Error, Debug)]
pub enum DashboardError {
    /// Configuration errors (unreadable file, invalid JSON, missing fields).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input (non-numeric release id, row count out of range).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Failure reported by the query gateway.
    #[error("Database error: {0}")]
    Gateway(#[from] GatewayError),

    /// Internal application errors (output encoding, logging setup).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DashboardError {
    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a validation error with the given message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the gateway phase, if this error came from the gateway.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::Gateway(e) => Some(e.phase),
            _ => None,
        }
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Configuration Error",
            Self::Validation(_) => "Validation Error",
            Self::Gateway(e) => match e.phase {
                Phase::Connect => "Connection Error",
                Phase::Execute => "Query Error",
                Phase::Fetch => "Fetch Error",
            },
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using DashboardError.
pub type Result<T> = std::result::Result<T, DashboardError>;
