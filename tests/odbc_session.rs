//! Session tests against a real ODBC data source
//!
//! Ignored by default. Point `ODBC_NOTEBOOK_TEST_DSN` at a scratch database
//! (for example `Driver={SQLite3};Database=/tmp/notebook.db`) and run with
//! `--ignored`.

use odbc_notebook::odbc::UNKNOWN_ROW_COUNT;
use odbc_notebook::types::BridgeError;
use odbc_notebook::OdbcSession;
use serde_json::json;

async fn open_session() -> anyhow::Result<OdbcSession> {
    let dsn = std::env::var("ODBC_NOTEBOOK_TEST_DSN")
        .expect("ODBC_NOTEBOOK_TEST_DSN must be set for ODBC tests");
    Ok(OdbcSession::open(&dsn).await?)
}

/// Run a statement that produces no rows and close it again.
async fn run(session: &OdbcSession, sql: &str) -> anyhow::Result<i64> {
    session.execute(sql.to_string()).await?;
    let count = session.count().await?;
    session.finish().await?;
    Ok(count)
}

#[tokio::test]
#[ignore]
async fn it_pages_through_a_result_set() -> anyhow::Result<()> {
    let session = open_session().await?;
    run(&session, "DROP TABLE IF EXISTS notebook_pages").await?;
    run(&session, "CREATE TABLE notebook_pages (id INTEGER, label VARCHAR(20))").await?;
    let inserted = run(
        &session,
        "INSERT INTO notebook_pages VALUES (1, 'one'), (2, NULL), (3, 'three')",
    )
    .await?;
    assert_eq!(inserted, 3);

    session
        .execute("SELECT id, label FROM notebook_pages ORDER BY id".into())
        .await?;

    let metadata = session.metadata().await?;
    assert_eq!(metadata.len(), 2);
    assert_eq!(metadata[0].column, "id");
    assert_eq!(metadata[0].datatype, "int");

    let first = session.page(2).await?;
    assert_eq!(first.len(), 2);
    assert_eq!(first[0]["label"], json!("one"));
    assert_eq!(first[1]["label"], json!(null));

    let rest = session.page(2).await?;
    assert_eq!(rest.len(), 1);
    assert!(session.page(2).await?.is_empty());
    assert!(matches!(
        session.page(0).await,
        Err(BridgeError::InvalidPageSize)
    ));

    session.finish().await?;
    run(&session, "DROP TABLE notebook_pages").await?;
    session.quit().await?;
    Ok(())
}

#[tokio::test]
#[ignore]
async fn it_stays_idle_after_a_failed_execute() -> anyhow::Result<()> {
    let session = open_session().await?;

    assert!(matches!(
        session.execute("SELECT * FROM no_such_table_anywhere".into()).await,
        Err(BridgeError::Odbc(_))
    ));
    assert!(matches!(
        session.page(1).await,
        Err(BridgeError::NoActiveQuery("page"))
    ));

    session.execute("SELECT 1".into()).await?;
    assert!(session.count().await? >= UNKNOWN_ROW_COUNT);
    session.finish().await?;
    session.quit().await?;
    Ok(())
}

#[tokio::test]
#[ignore]
async fn it_lists_catalog_while_a_query_is_open() -> anyhow::Result<()> {
    let session = open_session().await?;
    run(&session, "DROP TABLE IF EXISTS notebook_catalog").await?;
    run(&session, "CREATE TABLE notebook_catalog (id INTEGER)").await?;

    session.execute("SELECT id FROM notebook_catalog".into()).await?;

    let tables = session.tables().await?;
    assert!(tables.iter().any(|t| t.table == "notebook_catalog"));
    let columns = session
        .columns(None, None, Some("notebook_catalog".into()))
        .await?;
    assert_eq!(columns.len(), 1);
    assert_eq!(columns[0].column, "id");

    assert!(matches!(
        session.quit().await,
        Err(BridgeError::QueryActive("quit"))
    ));

    session.finish().await?;
    run(&session, "DROP TABLE notebook_catalog").await?;
    session.quit().await?;
    assert!(matches!(
        session.tables().await,
        Err(BridgeError::SessionClosed)
    ));
    Ok(())
}
