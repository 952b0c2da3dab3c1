//! Query gateway tests against a real SQLite database.

use super::fixture::SqliteFixture;
use futures::future::join_all;
use pretty_assertions::assert_eq;
use spbi_dashboard::db::{MockDriver, MockTable, Statement, Value};
use spbi_dashboard::error::{DriverError, Phase};
use spbi_dashboard::query::QueryGateway;

#[tokio::test]
async fn test_select_cardno_returns_fixture_rows() {
    let fixture = SqliteFixture::new().await;
    fixture.add_quota(1, "A1", 0).await;
    fixture.add_quota(2, "B2", 0).await;

    let result = fixture
        .gateway
        .execute_query(
            &fixture.descriptor,
            &Statement::new("SELECT cardno FROM trnquotacustomer"),
        )
        .await
        .unwrap();

    assert_eq!(result.column_names, vec!["cardno".to_string()]);
    assert_eq!(
        result.rows,
        vec![vec![Value::from("A1")], vec![Value::from("B2")]]
    );
}

#[tokio::test]
async fn test_rows_match_column_count() {
    let fixture = SqliteFixture::new().await;
    fixture.add_quota(1, "A1", 1).await;
    fixture.add_quota(2, "B2", 0).await;

    let result = fixture
        .gateway
        .execute_query(
            &fixture.descriptor,
            &Statement::new("SELECT * FROM trnquotacustomer ORDER BY id"),
        )
        .await
        .unwrap();

    assert_eq!(result.column_names, vec!["id", "cardno", "processed"]);
    for row in &result.rows {
        assert_eq!(row.len(), result.column_names.len());
    }
    assert_eq!(
        result.rows[0],
        vec![Value::Int(1), Value::from("A1"), Value::Int(1)]
    );
}

#[tokio::test]
async fn test_empty_result_keeps_column_names() {
    let fixture = SqliteFixture::new().await;

    let result = fixture
        .gateway
        .execute_query(
            &fixture.descriptor,
            &Statement::new("SELECT id, cardno FROM trnquotacustomer WHERE id = ?").bind(999i64),
        )
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.column_names, vec!["id", "cardno"]);
}

#[tokio::test]
async fn test_quote_in_parameter_is_literal_data() {
    let fixture = SqliteFixture::new().await;
    let hostile = "B 1'; DROP TABLE trnrfidmap; --";
    fixture.add_rfid("rfid-1", hostile).await;
    fixture.add_rfid("rfid-2", "A1").await;

    let result = fixture
        .gateway
        .execute_query(
            &fixture.descriptor,
            &Statement::new("SELECT rfid, cardno FROM trnrfidmap WHERE cardno = ?").bind(hostile),
        )
        .await
        .unwrap();
    assert_eq!(
        result.rows,
        vec![vec![Value::from("rfid-1"), Value::from(hostile)]]
    );

    // A classic tautology matches nothing when bound.
    let result = fixture
        .gateway
        .execute_query(
            &fixture.descriptor,
            &Statement::new("SELECT rfid FROM trnrfidmap WHERE cardno = ?").bind("' OR '1'='1"),
        )
        .await
        .unwrap();
    assert!(result.is_empty());

    // The table survived.
    let result = fixture
        .gateway
        .execute_query(
            &fixture.descriptor,
            &Statement::new("SELECT rfid FROM trnrfidmap"),
        )
        .await
        .unwrap();
    assert_eq!(result.row_count(), 2);
}

#[tokio::test]
async fn test_update_returns_affected_count() {
    let fixture = SqliteFixture::new().await;
    fixture.add_quota(42, "A1", 1).await;

    let statement =
        Statement::new("UPDATE trnquotacustomer SET processed = 0 WHERE id = ?").bind(42i64);
    let affected = fixture
        .gateway
        .execute_update(&fixture.descriptor, &statement)
        .await
        .unwrap();
    assert_eq!(affected, 1);

    let missing =
        Statement::new("UPDATE trnquotacustomer SET processed = 0 WHERE id = ?").bind(43i64);
    let affected = fixture
        .gateway
        .execute_update(&fixture.descriptor, &missing)
        .await
        .unwrap();
    assert_eq!(affected, 0);
}

#[tokio::test]
async fn test_repeat_update_reflects_changed_state() {
    let fixture = SqliteFixture::new().await;
    fixture.add_quota(42, "A1", 1).await;

    let statement = Statement::new(
        "UPDATE trnquotacustomer SET processed = 0 WHERE id = ? AND processed = 1",
    )
    .bind(42i64);

    let first = fixture
        .gateway
        .execute_update(&fixture.descriptor, &statement)
        .await
        .unwrap();
    let second = fixture
        .gateway
        .execute_update(&fixture.descriptor, &statement)
        .await
        .unwrap();

    assert_eq!((first, second), (1, 0));
}

#[tokio::test]
async fn test_failed_update_changes_nothing() {
    let fixture = SqliteFixture::new().await;
    fixture.add_quota(1, "A1", 1).await;
    fixture.add_quota(2, "B2", 1).await;

    let err = fixture
        .gateway
        .execute_update(
            &fixture.descriptor,
            &Statement::new("UPDATE trnquotacustomer SET cardno = NULL WHERE processed = ?")
                .bind(1i64),
        )
        .await
        .unwrap_err();
    assert_eq!(err.phase, Phase::Execute);

    let result = fixture
        .gateway
        .execute_query(
            &fixture.descriptor,
            &Statement::new("SELECT cardno FROM trnquotacustomer ORDER BY id"),
        )
        .await
        .unwrap();
    assert_eq!(
        result.rows,
        vec![vec![Value::from("A1")], vec![Value::from("B2")]]
    );
}

#[tokio::test]
async fn test_malformed_statement_is_execute_error() {
    let fixture = SqliteFixture::new().await;

    let err = fixture
        .gateway
        .execute_query(
            &fixture.descriptor,
            &Statement::new("SELECT * FROM trnmissingtable"),
        )
        .await
        .unwrap_err();

    assert_eq!(err.phase, Phase::Execute);
    assert!(err.message.contains("trnmissingtable"), "{}", err.message);
}

#[tokio::test]
async fn test_concurrent_calls_are_independent() {
    let fixture = SqliteFixture::new().await;
    for id in 1..=5 {
        fixture.add_quota(id, &format!("P{id}"), id % 2).await;
    }

    let statements: Vec<Statement> = (1..=5i64)
        .map(|id| Statement::new("SELECT cardno FROM trnquotacustomer WHERE id = ?").bind(id))
        .collect();
    let results = join_all(
        statements
            .iter()
            .map(|s| fixture.gateway.execute_query(&fixture.descriptor, s)),
    )
    .await;

    for (id, result) in (1..=5).zip(results) {
        assert_eq!(result.unwrap().rows, vec![vec![Value::from(format!("P{id}"))]]);
    }
}

#[tokio::test]
async fn test_undecodable_row_is_fetch_error_without_partial_result() {
    let fixture = SqliteFixture::new().await;
    fixture.add_rfid("rfid-1", "A1").await;
    // Invalid UTF-8 stored as TEXT.
    fixture
        .exec(Statement::new(
            "INSERT INTO trnrfidmap (rfid, cardno) VALUES ('rfid-2', CAST(X'C328' AS TEXT))",
        ))
        .await;
    fixture.add_rfid("rfid-3", "C3").await;

    let err = fixture
        .gateway
        .execute_query(
            &fixture.descriptor,
            &Statement::new("SELECT rfid, cardno FROM trnrfidmap ORDER BY id"),
        )
        .await
        .unwrap_err();

    assert_eq!(err.phase, Phase::Fetch);
    assert!(matches!(err.cause, DriverError::Sqlx(_)));

    // The connection was released; the next call works.
    let result = fixture
        .gateway
        .execute_query(
            &fixture.descriptor,
            &Statement::new("SELECT rfid FROM trnrfidmap WHERE cardno = ?").bind("C3"),
        )
        .await
        .unwrap();
    assert_eq!(result.rows, vec![vec![Value::from("rfid-3")]]);
}

#[tokio::test]
async fn test_mock_fetch_failure_yields_no_partial_result() {
    let text = "SELECT cardno FROM trnquotacustomer";
    let driver = MockDriver::new()
        .with_table(
            text,
            MockTable::new(&["cardno"])
                .row(vec!["A1".into()])
                .row(vec!["B2".into()])
                .row(vec!["C3".into()]),
        )
        .fail_fetch_after(2, "connection reset while reading rows");
    let gateway = QueryGateway::with_driver(driver);

    let err = gateway
        .execute_query(&Default::default(), &Statement::new(text))
        .await
        .unwrap_err();

    assert_eq!(err.phase, Phase::Fetch);
    let stats = gateway.driver().stats();
    assert_eq!(stats.opened, 1);
    assert_eq!(stats.closed, 1);
}
