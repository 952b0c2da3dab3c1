//! sqlx-backed driver implementation.
//!
//! Provides `SqlxDriver`, which opens one concrete `PgConnection` or
//! `SqliteConnection` per call for the backend named by the descriptor's
//! driver id.

use super::{number_placeholders, Connection, Driver, DriverResult, Row, Statement, Value};
use crate::config::ConnectionDescriptor;
use crate::error::DriverError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use sqlx::postgres::PgRow;
use sqlx::query::Query;
use sqlx::sqlite::SqliteRow;
use sqlx::types::chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use sqlx::types::{BigDecimal, JsonValue, Uuid};
use sqlx::{
    Column, Connection as _, Database, Encode, Executor, PgConnection, Row as _, SqliteConnection,
    Type, TypeInfo, ValueRef,
};
use std::collections::VecDeque;
use url::Url;

/// Supported database backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Postgres,
    Sqlite,
}

impl DatabaseBackend {
    /// Resolves a driver id (JDBC class name or short name) to a backend.
    pub fn from_driver_id(driver_id: &str) -> Option<Self> {
        match driver_id.trim().to_lowercase().as_str() {
            "org.postgresql.driver" | "postgres" | "postgresql" => Some(Self::Postgres),
            "org.sqlite.jdbc" | "sqlite" | "sqlite3" => Some(Self::Sqlite),
            _ => None,
        }
    }

    /// Builds the sqlx connection URL from a descriptor.
    ///
    /// Strips a `jdbc:` prefix and, for network backends, fills in the
    /// descriptor's credentials when the URI does not carry its own.
    pub fn connection_url(&self, descriptor: &ConnectionDescriptor) -> DriverResult<String> {
        let uri = descriptor.connection_uri.trim();
        let uri = uri.strip_prefix("jdbc:").unwrap_or(uri);

        match self {
            Self::Sqlite => {
                if !uri.starts_with("sqlite:") {
                    return Err(DriverError::InvalidUri(format!(
                        "expected a sqlite: URI, got '{}'",
                        descriptor.redacted_uri()
                    )));
                }
                Ok(uri.to_string())
            }
            Self::Postgres => {
                let mut url =
                    Url::parse(uri).map_err(|e| DriverError::InvalidUri(e.to_string()))?;

                if url.scheme() != "postgres" && url.scheme() != "postgresql" {
                    return Err(DriverError::InvalidUri(format!(
                        "invalid scheme '{}', expected 'postgres' or 'postgresql'",
                        url.scheme()
                    )));
                }

                if url.username().is_empty() && !descriptor.username.is_empty() {
                    url.set_username(&descriptor.username).map_err(|_| {
                        DriverError::InvalidUri("URI cannot carry a username".to_string())
                    })?;
                }
                if url.password().is_none() && !descriptor.password.is_empty() {
                    url.set_password(Some(&descriptor.password)).map_err(|_| {
                        DriverError::InvalidUri("URI cannot carry a password".to_string())
                    })?;
                }

                Ok(url.to_string())
            }
        }
    }
}

/// Driver that opens sqlx connections for PostgreSQL and SQLite.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlxDriver;

impl SqlxDriver {
    /// Creates the driver.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Driver for SqlxDriver {
    async fn connect(&self, descriptor: &ConnectionDescriptor) -> DriverResult<Box<dyn Connection>> {
        let backend = DatabaseBackend::from_driver_id(&descriptor.driver_id)
            .ok_or_else(|| DriverError::UnsupportedDriver(descriptor.driver_id.clone()))?;

        if let Some(artifact) = descriptor.driver_artifact() {
            if tokio::fs::metadata(artifact).await.is_err() {
                return Err(DriverError::MissingArtifact(artifact.to_path_buf()));
            }
        }

        let url = backend.connection_url(descriptor)?;
        let conn = match backend {
            DatabaseBackend::Postgres => {
                BackendConnection::Postgres(PgConnection::connect(&url).await?)
            }
            DatabaseBackend::Sqlite => {
                BackendConnection::Sqlite(SqliteConnection::connect(&url).await?)
            }
        };

        Ok(Box::new(SqlxConnection { conn, result: None }))
    }
}

/// An open connection to one of the supported backends.
enum BackendConnection {
    Postgres(PgConnection),
    Sqlite(SqliteConnection),
}

/// Rows read by `execute_query` and not yet handed out by `next_row`.
struct OpenResult {
    rows: VecDeque<Row>,
    /// Error that ended the read after the statement started returning.
    error: Option<DriverError>,
}

/// What draining a row stream produced.
struct Drained {
    /// Column names, known once the first row arrived.
    columns: Option<Vec<String>>,
    rows: VecDeque<Row>,
    error: Option<DriverError>,
}

struct SqlxConnection {
    conn: BackendConnection,
    result: Option<OpenResult>,
}

impl SqlxConnection {
    /// Runs a statement that needs no parameters and returns no rows.
    async fn run_plain(&mut self, sql: &str) -> DriverResult<()> {
        match &mut self.conn {
            BackendConnection::Postgres(conn) => {
                Executor::execute(&mut *conn, sql).await?;
            }
            BackendConnection::Sqlite(conn) => {
                Executor::execute(&mut *conn, sql).await?;
            }
        }
        Ok(())
    }

    /// Column names for a statement that returned no rows.
    async fn describe_columns(&mut self, sql: &str) -> DriverResult<Vec<String>> {
        let columns = match &mut self.conn {
            BackendConnection::Postgres(conn) => {
                column_names(Executor::describe(&mut *conn, sql).await?.columns())
            }
            BackendConnection::Sqlite(conn) => {
                column_names(Executor::describe(&mut *conn, sql).await?.columns())
            }
        };
        Ok(columns)
    }
}

#[async_trait]
impl Connection for SqlxConnection {
    async fn execute_query(&mut self, statement: &Statement) -> DriverResult<Vec<String>> {
        self.result = None;

        let drained = match &mut self.conn {
            BackendConnection::Postgres(conn) => {
                let sql = number_placeholders(&statement.text)?;
                let query = bind_all(sqlx::query::<sqlx::Postgres>(&sql), &statement.parameters);
                drain(query.fetch(&mut *conn), convert_pg_row).await?
            }
            BackendConnection::Sqlite(conn) => {
                let query = bind_all(
                    sqlx::query::<sqlx::Sqlite>(&statement.text),
                    &statement.parameters,
                );
                drain(query.fetch(&mut *conn), convert_sqlite_row).await?
            }
        };

        let Drained {
            columns,
            rows,
            mut error,
        } = drained;

        let columns = match columns {
            Some(columns) => columns,
            None => {
                let sql = match self.conn {
                    BackendConnection::Postgres(_) => number_placeholders(&statement.text)?,
                    BackendConnection::Sqlite(_) => statement.text.clone(),
                };
                // The statement ran; failing to learn its shape is a fetch failure.
                match self.describe_columns(&sql).await {
                    Ok(columns) => columns,
                    Err(e) => {
                        error.get_or_insert(e);
                        Vec::new()
                    }
                }
            }
        };

        self.result = Some(OpenResult { rows, error });
        Ok(columns)
    }

    async fn next_row(&mut self) -> DriverResult<Option<Row>> {
        let result = self.result.as_mut().ok_or(DriverError::NoResultSet)?;

        if let Some(row) = result.rows.pop_front() {
            return Ok(Some(row));
        }
        if let Some(error) = result.error.take() {
            self.result = None;
            return Err(error);
        }

        self.result = None;
        Ok(None)
    }

    async fn begin(&mut self) -> DriverResult<()> {
        self.run_plain("BEGIN").await
    }

    async fn execute_update(&mut self, statement: &Statement) -> DriverResult<u64> {
        let affected = match &mut self.conn {
            BackendConnection::Postgres(conn) => {
                let sql = number_placeholders(&statement.text)?;
                bind_all(sqlx::query::<sqlx::Postgres>(&sql), &statement.parameters)
                    .execute(&mut *conn)
                    .await?
                    .rows_affected()
            }
            BackendConnection::Sqlite(conn) => {
                bind_all(sqlx::query::<sqlx::Sqlite>(&statement.text), &statement.parameters)
                    .execute(&mut *conn)
                    .await?
                    .rows_affected()
            }
        };
        Ok(affected)
    }

    async fn commit(&mut self) -> DriverResult<()> {
        self.run_plain("COMMIT").await
    }

    async fn rollback(&mut self) -> DriverResult<()> {
        self.run_plain("ROLLBACK").await
    }

    async fn close(self: Box<Self>) -> DriverResult<()> {
        let this = *self;
        match this.conn {
            BackendConnection::Postgres(conn) => conn.close().await?,
            BackendConnection::Sqlite(conn) => conn.close().await?,
        }
        Ok(())
    }
}

/// Reads a row stream to the end, converting each row.
///
/// A stream error before the first row means the statement itself failed and
/// is returned directly. Later stream errors and conversion errors are kept
/// in `Drained::error` for `next_row` to report.
async fn drain<R>(
    mut stream: BoxStream<'_, Result<R, sqlx::Error>>,
    convert: fn(&R) -> Result<Row, sqlx::Error>,
) -> DriverResult<Drained>
where
    R: sqlx::Row,
{
    let mut columns: Option<Vec<String>> = None;
    let mut rows = VecDeque::new();
    let mut error: Option<DriverError> = None;

    while let Some(item) = stream.next().await {
        match item {
            Ok(row) => {
                if columns.is_none() {
                    columns = Some(column_names(row.columns()));
                }
                match convert(&row) {
                    Ok(converted) => rows.push_back(converted),
                    Err(e) => {
                        error = Some(e.into());
                        break;
                    }
                }
            }
            Err(e) if columns.is_none() => return Err(e.into()),
            Err(e) => {
                error = Some(e.into());
                break;
            }
        }
    }

    Ok(Drained {
        columns,
        rows,
        error,
    })
}

fn column_names<C: Column>(columns: &[C]) -> Vec<String> {
    columns.iter().map(|col| col.name().to_string()).collect()
}

/// Binds every parameter of a statement, in order.
fn bind_all<'q, DB>(
    mut query: Query<'q, DB, <DB as Database>::Arguments<'q>>,
    parameters: &[Value],
) -> Query<'q, DB, <DB as Database>::Arguments<'q>>
where
    DB: Database,
    bool: Encode<'q, DB> + Type<DB>,
    i64: Encode<'q, DB> + Type<DB>,
    f64: Encode<'q, DB> + Type<DB>,
    String: Encode<'q, DB> + Type<DB>,
    Vec<u8>: Encode<'q, DB> + Type<DB>,
    Option<String>: Encode<'q, DB> + Type<DB>,
{
    for value in parameters {
        query = match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Int(i) => query.bind(*i),
            Value::Float(f) => query.bind(*f),
            Value::String(s) => query.bind(s.clone()),
            Value::Bytes(b) => query.bind(b.clone()),
        };
    }
    query
}

/// Converts a sqlx PgRow to our Row type.
fn convert_pg_row(row: &PgRow) -> Result<Row, sqlx::Error> {
    (0..row.columns().len())
        .map(|i| convert_pg_value(row, i))
        .collect()
}

/// Converts a single column value from a PgRow, decoding by column type.
///
/// Types without a dedicated arm are read as text. A value that decodes
/// neither way is an error.
fn convert_pg_value(row: &PgRow, index: usize) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }

    let type_name = row.column(index).type_info().name().to_uppercase();
    let decoded = match type_name.as_str() {
        "BOOL" | "BOOLEAN" => row.try_get::<bool, _>(index).map(Value::Bool),
        "INT2" | "SMALLINT" => row.try_get::<i16, _>(index).map(|v| Value::Int(v.into())),
        "INT4" | "INT" | "INTEGER" => row.try_get::<i32, _>(index).map(|v| Value::Int(v.into())),
        "INT8" | "BIGINT" => row.try_get::<i64, _>(index).map(Value::Int),
        "FLOAT4" | "REAL" => row.try_get::<f32, _>(index).map(|v| Value::Float(v.into())),
        "FLOAT8" | "DOUBLE PRECISION" => row.try_get::<f64, _>(index).map(Value::Float),
        "BYTEA" => row.try_get::<Vec<u8>, _>(index).map(Value::Bytes),
        // Kept as text so no precision is lost.
        "NUMERIC" => row
            .try_get::<BigDecimal, _>(index)
            .map(|v| Value::String(v.to_string())),
        "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(index)
            .map(|v| Value::String(v.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(index)
            .map(|v| Value::String(v.to_rfc3339())),
        "DATE" => row
            .try_get::<NaiveDate, _>(index)
            .map(|v| Value::String(v.to_string())),
        "TIME" => row
            .try_get::<NaiveTime, _>(index)
            .map(|v| Value::String(v.to_string())),
        "UUID" => row
            .try_get::<Uuid, _>(index)
            .map(|v| Value::String(v.to_string())),
        "JSON" | "JSONB" => row
            .try_get::<JsonValue, _>(index)
            .map(|v| Value::String(v.to_string())),
        _ => row.try_get::<String, _>(index).map(Value::String),
    };

    decoded.or_else(|e| {
        row.try_get::<String, _>(index)
            .map(Value::String)
            .map_err(|_| e)
    })
}

/// Converts a sqlx SqliteRow to our Row type.
fn convert_sqlite_row(row: &SqliteRow) -> Result<Row, sqlx::Error> {
    (0..row.columns().len())
        .map(|i| convert_sqlite_value(row, i))
        .collect()
}

/// Converts a single column value from a SqliteRow.
///
/// SQLite stores each value with its own storage class regardless of the
/// declared column type (`DATETIME` columns usually hold text, `NUMERIC`
/// columns integers or reals), so decoding follows the value. Text that is
/// not valid UTF-8 is an error.
fn convert_sqlite_value(row: &SqliteRow, index: usize) -> Result<Value, sqlx::Error> {
    let raw = row.try_get_raw(index)?;
    if raw.is_null() {
        return Ok(Value::Null);
    }

    let storage = raw.type_info().name().to_uppercase();
    let declared = row.column(index).type_info().name().to_uppercase();

    match storage.as_str() {
        "INTEGER" if matches!(declared.as_str(), "BOOL" | "BOOLEAN") => {
            row.try_get::<bool, _>(index).map(Value::Bool)
        }
        "INTEGER" => row.try_get::<i64, _>(index).map(Value::Int),
        "REAL" => row.try_get::<f64, _>(index).map(Value::Float),
        "BLOB" => row.try_get::<Vec<u8>, _>(index).map(Value::Bytes),
        _ => row.try_get::<String, _>(index).map(Value::String),
    }
}
