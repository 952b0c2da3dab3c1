//! The query gateway.
//!
//! Runs exactly one statement per call on a freshly opened connection and
//! releases that connection before returning, whatever the outcome:
//!
//! ```text
//! Idle -> Connecting -> Connected -> Executing -> Fetching/Committing -> Released
//! ```
//!
//! Failures are tagged with the phase they happened in and are never retried.
//! The gateway does not log; callers decide what to record.

use crate::config::ConnectionDescriptor;
use crate::db::{Connection, Driver, SqlxDriver, Statement, TabularResult};
use crate::error::{DriverError, GatewayError};
use std::collections::HashSet;

/// Executes statements against the database named by a descriptor.
#[derive(Debug, Clone, Default)]
pub struct QueryGateway<D = SqlxDriver> {
    driver: D,
}

impl QueryGateway<SqlxDriver> {
    /// Creates a gateway backed by sqlx.
    pub fn new() -> Self {
        Self::with_driver(SqlxDriver::new())
    }
}

impl<D: Driver> QueryGateway<D> {
    /// Creates a gateway over the given driver.
    pub fn with_driver(driver: D) -> Self {
        Self { driver }
    }

    /// Returns the underlying driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Runs a read-only statement and returns its full result set.
    ///
    /// The caller is responsible for passing a read-only statement; the text
    /// is not inspected. No partial result is ever returned: a failure while
    /// reading rows discards the rows read so far.
    pub async fn execute_query(
        &self,
        descriptor: &ConnectionDescriptor,
        statement: &Statement,
    ) -> Result<TabularResult, GatewayError> {
        let mut conn = self
            .driver
            .connect(descriptor)
            .await
            .map_err(GatewayError::connect)?;

        let outcome = read_all(conn.as_mut(), statement).await;

        // A close failure cannot undo a completed read; the handle is gone either way.
        let _ = conn.close().await;
        outcome
    }

    /// Runs a write statement in its own transaction and returns the number
    /// of rows affected.
    ///
    /// Either the commit succeeds and the count is returned, or the
    /// transaction is rolled back and an error is returned.
    pub async fn execute_update(
        &self,
        descriptor: &ConnectionDescriptor,
        statement: &Statement,
    ) -> Result<u64, GatewayError> {
        let mut conn = self
            .driver
            .connect(descriptor)
            .await
            .map_err(GatewayError::connect)?;

        let outcome = update_in_transaction(conn.as_mut(), statement).await;

        let _ = conn.close().await;
        outcome
    }
}

/// Executes a read and drains the cursor into a `TabularResult`.
async fn read_all(
    conn: &mut dyn Connection,
    statement: &Statement,
) -> Result<TabularResult, GatewayError> {
    let columns = conn
        .execute_query(statement)
        .await
        .map_err(GatewayError::execute)?;

    let mut result = TabularResult::new(unique_column_names(columns));
    let width = result.column_names.len();

    while let Some(row) = conn.next_row().await.map_err(GatewayError::fetch)? {
        if row.len() != width {
            return Err(GatewayError::fetch(DriverError::RowWidth {
                row: result.rows.len(),
                expected: width,
                actual: row.len(),
            }));
        }
        result.rows.push(row);
    }

    Ok(result)
}

/// Begins, executes, and commits; rolls back if anything after `begin` fails.
async fn update_in_transaction(
    conn: &mut dyn Connection,
    statement: &Statement,
) -> Result<u64, GatewayError> {
    conn.begin().await.map_err(GatewayError::execute)?;

    let affected = match conn.execute_update(statement).await {
        Ok(affected) => affected,
        Err(e) => {
            let _ = conn.rollback().await;
            return Err(GatewayError::execute(e));
        }
    };

    if let Err(e) = conn.commit().await {
        let _ = conn.rollback().await;
        return Err(GatewayError::execute(e));
    }

    Ok(affected)
}

/// Makes result-set column names unique by suffixing repeats with `_2`, `_3`, ...
fn unique_column_names(columns: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(columns.len());
    columns
        .into_iter()
        .map(|name| {
            if seen.insert(name.clone()) {
                return name;
            }
            let mut n = 2;
            loop {
                let candidate = format!("{name}_{n}");
                if seen.insert(candidate.clone()) {
                    return candidate;
                }
                n += 1;
            }
        })
        .collect()
}
