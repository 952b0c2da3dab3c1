//! Runs dashboard actions through the query gateway.
//!
//! This is the layer that logs: the gateway itself stays silent.

use super::Action;
use crate::config::ConnectionDescriptor;
use crate::db::{Driver, SqlxDriver, TabularResult};
use crate::error::Result;
use crate::query::QueryGateway;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// What running an action produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// Rows returned by a read action.
    Table {
        title: String,
        result: TabularResult,
        #[serde(serialize_with = "serialize_millis")]
        elapsed: Duration,
    },

    /// Rows changed by an update action.
    Updated { title: String, id: i64, affected: u64 },
}

impl Outcome {
    /// Short status line describing the outcome.
    pub fn summary(&self) -> String {
        match self {
            Self::Table {
                result, elapsed, ..
            } => {
                let count = result.row_count();
                format!(
                    "{} row{} returned ({}ms)",
                    count,
                    if count == 1 { "" } else { "s" },
                    elapsed.as_millis()
                )
            }
            Self::Updated { id, affected: 0, .. } => format!("No matching row for ID {id}"),
            Self::Updated { id, affected, .. } => {
                format!("Row with ID {id} released ({affected} row(s) updated)")
            }
        }
    }
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}

/// Dashboard service bound to one database.
#[derive(Debug, Clone)]
pub struct Dashboard<D = SqlxDriver> {
    gateway: QueryGateway<D>,
    descriptor: ConnectionDescriptor,
}

impl<D: Driver> Dashboard<D> {
    /// Creates a dashboard that runs actions against `descriptor`.
    pub fn new(gateway: QueryGateway<D>, descriptor: ConnectionDescriptor) -> Self {
        Self {
            gateway,
            descriptor,
        }
    }

    /// Returns the connection descriptor.
    pub fn descriptor(&self) -> &ConnectionDescriptor {
        &self.descriptor
    }

    /// Returns the gateway.
    pub fn gateway(&self) -> &QueryGateway<D> {
        &self.gateway
    }

    /// Runs an action and returns its outcome.
    pub async fn run(&self, action: &Action) -> Result<Outcome> {
        let statement = action.statement();
        let title = action.title().to_string();
        info!("Executing query: {}", statement.text);
        debug!("Bound parameters: {}", statement.parameters.len());

        if let Action::Release { id } = action {
            info!("Releasing plate with ID {id}");
            let affected = self
                .gateway
                .execute_update(&self.descriptor, &statement)
                .await
                .inspect_err(|e| error!(phase = %e.phase, "Update failed: {}", e.message))?;

            if affected == 0 {
                warn!("No row with ID {id} was updated");
            } else {
                info!("Released ID {id}: {affected} row(s) updated");
            }

            return Ok(Outcome::Updated {
                title,
                id: *id,
                affected,
            });
        }

        let start = Instant::now();
        let result = self
            .gateway
            .execute_query(&self.descriptor, &statement)
            .await
            .inspect_err(|e| error!(phase = %e.phase, "Query failed: {}", e.message))?;
        let elapsed = start.elapsed();

        info!(
            "Query returned {} row(s) in {}ms",
            result.row_count(),
            elapsed.as_millis()
        );

        Ok(Outcome::Table {
            title,
            result,
            elapsed,
        })
    }
}
