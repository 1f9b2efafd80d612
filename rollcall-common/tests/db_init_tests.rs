//! Database initialization tests

use rollcall_common::db;
use sqlx::{Row, SqlitePool};

async fn memory_pool() -> SqlitePool {
    let pool = SqlitePool::connect("sqlite::memory:")
        .await
        .expect("Failed to create in-memory database");
    db::init_schema(&pool).await.expect("Failed to init schema");
    pool
}

#[tokio::test]
async fn test_schema_creates_tables() {
    let pool = memory_pool().await;

    let rows = sqlx::query(
        "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
    )
    .fetch_all(&pool)
    .await
    .unwrap();

    let names: Vec<String> = rows.iter().map(|r| r.get("name")).collect();
    assert!(names.contains(&"legislators".to_string()));
    assert!(names.contains(&"vote_sessions".to_string()));
    assert!(names.contains(&"member_votes".to_string()));
}

#[tokio::test]
async fn test_schema_init_is_repeatable() {
    let pool = memory_pool().await;
    // CREATE TABLE IF NOT EXISTS must tolerate a second pass
    db::init_schema(&pool).await.expect("Second init failed");
}

#[tokio::test]
async fn test_vote_id_unique_constraint() {
    let pool = memory_pool().await;

    let insert = r#"
        INSERT INTO vote_sessions
            (vote_id, chamber, congress, session, roll, vote_date, question, result)
        VALUES ('house-118-1-1', 'house', 118, 1, 1, '2023-01-05T00:00:00', 'On Passage', 'Passed')
    "#;

    sqlx::query(insert).execute(&pool).await.unwrap();
    let duplicate = sqlx::query(insert).execute(&pool).await;
    assert!(duplicate.is_err(), "Duplicate vote_id must be rejected");
}

#[tokio::test]
async fn test_init_database_pool_creates_file() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("data").join("rollcall.db");

    let pool = db::init_database_pool(&db_path)
        .await
        .expect("Failed to create database file");

    assert!(db_path.exists());
    pool.close().await;
}
