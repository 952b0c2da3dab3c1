//! Mock driver for testing.
//!
//! Serves scripted tables and update counts keyed by statement text, can fail
//! in any phase, and counts every connection it opens and closes.

use super::{Connection, Driver, DriverResult, Row, Statement, Value};
use crate::config::ConnectionDescriptor;
use crate::error::DriverError;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// A scripted result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MockTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl MockTable {
    /// Creates an empty table with the given columns.
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Appends a row.
    pub fn row(mut self, row: Vec<Value>) -> Self {
        self.rows.push(row);
        self
    }
}

/// Counters and a statement log shared by all connections of a mock driver.
#[derive(Debug, Clone, Default)]
pub struct MockStats {
    pub connect_attempts: usize,
    pub opened: usize,
    pub closed: usize,
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
    /// Every statement handed to a connection, exactly as received.
    pub executed: Vec<Statement>,
}

impl MockStats {
    /// True when every opened connection has been closed.
    pub fn is_balanced(&self) -> bool {
        self.opened == self.closed
    }
}

#[derive(Debug, Clone, Default)]
struct Failures {
    connect: Option<String>,
    execute: Option<String>,
    /// Fail after this many rows have been fetched.
    fetch: Option<(usize, String)>,
    commit: Option<String>,
    close: Option<String>,
}

#[derive(Debug, Default)]
struct Script {
    tables: HashMap<String, MockTable>,
    updates: HashMap<String, u64>,
    failures: Failures,
}

/// An in-memory driver that returns predefined results.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    script: Arc<Mutex<Script>>,
    stats: Arc<Mutex<MockStats>>,
}

impl MockDriver {
    /// Creates a mock driver with nothing scripted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `table` for reads whose text equals `text`.
    pub fn with_table(self, text: &str, table: MockTable) -> Self {
        lock(&self.script).tables.insert(text.to_string(), table);
        self
    }

    /// Reports `affected` rows for updates whose text equals `text`.
    pub fn with_update(self, text: &str, affected: u64) -> Self {
        lock(&self.script).updates.insert(text.to_string(), affected);
        self
    }

    /// Makes every connection attempt fail.
    pub fn fail_connect(self, msg: &str) -> Self {
        lock(&self.script).failures.connect = Some(msg.to_string());
        self
    }

    /// Makes statement execution fail.
    pub fn fail_execute(self, msg: &str) -> Self {
        lock(&self.script).failures.execute = Some(msg.to_string());
        self
    }

    /// Makes the cursor fail once `rows` rows have been read.
    pub fn fail_fetch_after(self, rows: usize, msg: &str) -> Self {
        lock(&self.script).failures.fetch = Some((rows, msg.to_string()));
        self
    }

    /// Makes commits fail.
    pub fn fail_commit(self, msg: &str) -> Self {
        lock(&self.script).failures.commit = Some(msg.to_string());
        self
    }

    /// Makes closing a connection report an error (the connection still counts as closed).
    pub fn fail_close(self, msg: &str) -> Self {
        lock(&self.script).failures.close = Some(msg.to_string());
        self
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> MockStats {
        lock(&self.stats).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Driver for MockDriver {
    async fn connect(&self, _descriptor: &ConnectionDescriptor) -> DriverResult<Box<dyn Connection>> {
        lock(&self.stats).connect_attempts += 1;

        if let Some(msg) = lock(&self.script).failures.connect.clone() {
            return Err(DriverError::Mock(msg));
        }

        lock(&self.stats).opened += 1;
        Ok(Box::new(MockConnection {
            script: Arc::clone(&self.script),
            stats: Arc::clone(&self.stats),
            cursor: None,
        }))
    }
}

struct Cursor {
    rows: VecDeque<Row>,
    fetched: usize,
    fail_after: Option<(usize, String)>,
}

struct MockConnection {
    script: Arc<Mutex<Script>>,
    stats: Arc<Mutex<MockStats>>,
    cursor: Option<Cursor>,
}

impl MockConnection {
    fn record(&self, statement: &Statement) {
        lock(&self.stats).executed.push(statement.clone());
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn execute_query(&mut self, statement: &Statement) -> DriverResult<Vec<String>> {
        self.record(statement);
        let script = lock(&self.script);

        if let Some(msg) = &script.failures.execute {
            return Err(DriverError::Mock(msg.clone()));
        }

        let table = script.tables.get(&statement.text).ok_or_else(|| {
            DriverError::Mock(format!("no scripted result for: {}", statement.text))
        })?;

        self.cursor = Some(Cursor {
            rows: table.rows.iter().cloned().collect(),
            fetched: 0,
            fail_after: script.failures.fetch.clone(),
        });
        Ok(table.columns.clone())
    }

    async fn next_row(&mut self) -> DriverResult<Option<Row>> {
        let cursor = self.cursor.as_mut().ok_or(DriverError::NoResultSet)?;

        if let Some((after, msg)) = &cursor.fail_after {
            if cursor.fetched >= *after {
                return Err(DriverError::Mock(msg.clone()));
            }
        }

        match cursor.rows.pop_front() {
            Some(row) => {
                cursor.fetched += 1;
                Ok(Some(row))
            }
            None => {
                self.cursor = None;
                Ok(None)
            }
        }
    }

    async fn begin(&mut self) -> DriverResult<()> {
        lock(&self.stats).begins += 1;
        Ok(())
    }

    async fn execute_update(&mut self, statement: &Statement) -> DriverResult<u64> {
        self.record(statement);
        let script = lock(&self.script);

        if let Some(msg) = &script.failures.execute {
            return Err(DriverError::Mock(msg.clone()));
        }

        script.updates.get(&statement.text).copied().ok_or_else(|| {
            DriverError::Mock(format!("no scripted update for: {}", statement.text))
        })
    }

    async fn commit(&mut self) -> DriverResult<()> {
        if let Some(msg) = lock(&self.script).failures.commit.clone() {
            return Err(DriverError::Mock(msg));
        }
        lock(&self.stats).commits += 1;
        Ok(())
    }

    async fn rollback(&mut self) -> DriverResult<()> {
        lock(&self.stats).rollbacks += 1;
        Ok(())
    }

    async fn close(self: Box<Self>) -> DriverResult<()> {
        lock(&self.stats).closed += 1;
        match lock(&self.script).failures.close.clone() {
            Some(msg) => Err(DriverError::Mock(msg)),
            None => Ok(()),
        }
    }
}
