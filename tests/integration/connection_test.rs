//! Connection failure tests.
//!
//! None of these need a running database.

use spbi_dashboard::config::ConnectionDescriptor;
use spbi_dashboard::db::Statement;
use spbi_dashboard::error::{DriverError, Phase};
use spbi_dashboard::query::QueryGateway;

fn select_one() -> Statement {
    Statement::new("SELECT 1 AS n")
}

#[tokio::test(flavor = "current_thread")]
async fn test_unreachable_host_is_connect_error() {
    let descriptor = ConnectionDescriptor {
        driver_id: "org.postgresql.Driver".to_string(),
        connection_uri: "jdbc:postgresql://127.0.0.1:1/spbi".to_string(),
        username: "operator".to_string(),
        password: "secret".to_string(),
        ..Default::default()
    };

    let err = QueryGateway::new()
        .execute_query(&descriptor, &select_one())
        .await
        .unwrap_err();

    assert_eq!(err.phase, Phase::Connect);
    assert!(matches!(err.cause, DriverError::Sqlx(_)));
}

#[tokio::test]
async fn test_unsupported_driver_is_connect_error() {
    let descriptor = ConnectionDescriptor {
        driver_id: "org.hsqldb.jdbc.JDBCDriver".to_string(),
        connection_uri: "jdbc:hsqldb:hsql://localhost/spbi".to_string(),
        ..Default::default()
    };

    let err = QueryGateway::new()
        .execute_query(&descriptor, &select_one())
        .await
        .unwrap_err();

    assert_eq!(err.phase, Phase::Connect);
    assert!(err.message.contains("unsupported driver"));
}

#[tokio::test]
async fn test_missing_driver_artifact_is_connect_error() {
    let dir = tempfile::tempdir().unwrap();
    let descriptor = ConnectionDescriptor {
        driver_id: "sqlite".to_string(),
        connection_uri: format!("sqlite:{}?mode=rwc", dir.path().join("spbi.db").display()),
        driver_artifact_path: dir.path().join("sqlite-jdbc.jar").display().to_string(),
        ..Default::default()
    };

    let err = QueryGateway::new()
        .execute_update(&descriptor, &Statement::new("CREATE TABLE t (id INTEGER)"))
        .await
        .unwrap_err();

    assert_eq!(err.phase, Phase::Connect);
    assert!(matches!(err.cause, DriverError::MissingArtifact(_)));
}

#[tokio::test]
async fn test_existing_driver_artifact_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let jar = dir.path().join("sqlite-jdbc.jar");
    std::fs::write(&jar, b"").unwrap();
    let descriptor = ConnectionDescriptor {
        driver_id: "sqlite".to_string(),
        connection_uri: format!("sqlite:{}?mode=rwc", dir.path().join("spbi.db").display()),
        driver_artifact_path: jar.display().to_string(),
        ..Default::default()
    };

    let result = QueryGateway::new()
        .execute_query(&descriptor, &select_one())
        .await
        .unwrap();
    assert_eq!(result.column_names, vec!["n".to_string()]);
}

#[tokio::test]
async fn test_nonexistent_sqlite_file_without_create_mode() {
    let dir = tempfile::tempdir().unwrap();
    let descriptor = ConnectionDescriptor {
        driver_id: "sqlite".to_string(),
        connection_uri: format!(
            "sqlite:{}?mode=ro",
            dir.path().join("missing").join("spbi.db").display()
        ),
        ..Default::default()
    };

    let err = QueryGateway::new()
        .execute_query(&descriptor, &select_one())
        .await
        .unwrap_err();
    assert_eq!(err.phase, Phase::Connect);
}
