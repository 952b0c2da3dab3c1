//! Database abstraction layer for the SPBI dashboard.
//!
//! Provides a trait-based driver interface so the query gateway can run
//! against sqlx-backed databases in production and an in-memory mock in tests.

mod mock;
mod placeholders;
mod sqlx_driver;
mod types;

pub use mock::{MockDriver, MockStats, MockTable};
pub use placeholders::number_placeholders;
pub use sqlx_driver::{DatabaseBackend, SqlxDriver};
pub use types::{Row, Statement, TabularResult, Value};

use crate::config::ConnectionDescriptor;
use crate::error::DriverError;
use async_trait::async_trait;

/// Result type for driver operations.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Opens physical connections from a connection descriptor.
#[async_trait]
pub trait Driver: Send + Sync {
    /// Opens a new connection. Each call yields an independent connection.
    async fn connect(&self, descriptor: &ConnectionDescriptor) -> DriverResult<Box<dyn Connection>>;
}

/// A single open database connection.
///
/// Reads follow cursor semantics: `execute_query` runs the statement and
/// returns the result-set column names, then `next_row` yields rows until it
/// returns `None`.
#[async_trait]
pub trait Connection: Send {
    /// Executes a read statement and opens its result set.
    async fn execute_query(&mut self, statement: &Statement) -> DriverResult<Vec<String>>;

    /// Reads the next row of the open result set.
    async fn next_row(&mut self) -> DriverResult<Option<Row>>;

    /// Starts a transaction.
    async fn begin(&mut self) -> DriverResult<()>;

    /// Executes a write statement and returns the number of rows affected.
    async fn execute_update(&mut self, statement: &Statement) -> DriverResult<u64>;

    /// Commits the current transaction.
    async fn commit(&mut self) -> DriverResult<()>;

    /// Rolls back the current transaction.
    async fn rollback(&mut self) -> DriverResult<()>;

    /// Closes the connection and releases its resources.
    async fn close(self: Box<Self>) -> DriverResult<()>;
}
