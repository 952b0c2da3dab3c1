//! SQLite fixture database shaped like the SPBI schema.

use spbi_dashboard::config::ConnectionDescriptor;
use spbi_dashboard::db::Statement;
use spbi_dashboard::query::QueryGateway;
use tempfile::TempDir;

const SCHEMA: &[&str] = &[
    "CREATE TABLE trnquotacustomer (
        id INTEGER PRIMARY KEY,
        cardno TEXT NOT NULL,
        processed INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE trnrfidmap (
        id INTEGER PRIMARY KEY,
        rfid TEXT NOT NULL,
        cardno TEXT NOT NULL
    )",
    "CREATE TABLE trntransactionfuel (
        id INTEGER PRIMARY KEY,
        cardno TEXT NOT NULL,
        volume REAL NOT NULL,
        amount NUMERIC NOT NULL,
        trxdate DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
        reprint INTEGER NOT NULL DEFAULT 0
    )",
    "CREATE TABLE trnsitedetail (
        id INTEGER PRIMARY KEY,
        value TEXT NOT NULL
    )",
];

/// A file-backed SQLite database that lives as long as the fixture.
pub struct SqliteFixture {
    _dir: TempDir,
    pub descriptor: ConnectionDescriptor,
    pub gateway: QueryGateway,
}

impl SqliteFixture {
    /// Creates an empty database with the SPBI tables.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("spbi.db");
        let descriptor = ConnectionDescriptor {
            driver_id: "org.sqlite.JDBC".to_string(),
            connection_uri: format!("jdbc:sqlite:{}?mode=rwc", path.display()),
            ..Default::default()
        };

        let fixture = Self {
            _dir: dir,
            descriptor,
            gateway: QueryGateway::new(),
        };
        for sql in SCHEMA {
            fixture.exec(Statement::new(*sql)).await;
        }
        fixture
    }

    /// Runs a write statement, panicking on failure.
    pub async fn exec(&self, statement: Statement) -> u64 {
        self.gateway
            .execute_update(&self.descriptor, &statement)
            .await
            .unwrap_or_else(|e| panic!("fixture statement failed: {e}\n{}", statement.text))
    }

    /// Inserts a quota row.
    pub async fn add_quota(&self, id: i64, cardno: &str, processed: i64) {
        self.exec(
            Statement::new("INSERT INTO trnquotacustomer (id, cardno, processed) VALUES (?, ?, ?)")
                .bind(id)
                .bind(cardno)
                .bind(processed),
        )
        .await;
    }

    /// Inserts a fuel transaction.
    pub async fn add_transaction(&self, cardno: &str, volume: f64, reprint: i64) {
        self.exec(
            Statement::new(
                "INSERT INTO trntransactionfuel (cardno, volume, amount, reprint) VALUES (?, ?, ?, ?)",
            )
            .bind(cardno)
            .bind(volume)
            .bind(volume * 10_000.0)
            .bind(reprint),
        )
        .await;
    }

    /// Inserts an RFID mapping.
    pub async fn add_rfid(&self, rfid: &str, cardno: &str) {
        self.exec(
            Statement::new("INSERT INTO trnrfidmap (rfid, cardno) VALUES (?, ?)")
                .bind(rfid)
                .bind(cardno),
        )
        .await;
    }
}
