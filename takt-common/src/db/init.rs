//! Database initialization
//!
//! Creates the database file on first run and brings the schema up
//! idempotently. The open-session invariant (at most one open session
//! per post/worker pair) is enforced here with a partial unique index,
//! so concurrent opens resolve at commit time inside SQLite itself.

use crate::Result;
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

/// Initialize database connection pool and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Enable foreign keys
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer; badge taps and
    // dashboard reads arrive on independent tasks
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;

    Ok(pool)
}

/// Create all tables and indexes (idempotent - safe to call multiple times)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    // Reference catalogs (read-only to the session core)
    create_lines_table(pool).await?;
    create_sub_lines_table(pool).await?;
    create_posts_table(pool).await?;
    create_workers_table(pool).await?;
    create_temp_badges_table(pool).await?;
    create_products_table(pool).await?;
    create_operations_table(pool).await?;
    create_parts_table(pool).await?;
    create_post_configurations_table(pool).await?;
    create_devices_table(pool).await?;

    // Live ledger and cancellation archive
    create_sessions_table(pool).await?;
    create_cancelled_sessions_table(pool).await?;

    Ok(())
}

async fn create_lines_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lines (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            position INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sub_lines_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sub_lines (
            id TEXT PRIMARY KEY,
            line_id TEXT NOT NULL REFERENCES lines(id),
            name TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_posts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY,
            sub_line_id TEXT NOT NULL REFERENCES sub_lines(id),
            name TEXT NOT NULL,
            position INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_workers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS workers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            matricula TEXT NOT NULL UNIQUE,
            badge_code TEXT UNIQUE,
            active INTEGER NOT NULL DEFAULT 1
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Time-boxed badge overlay: a temporary badge maps a tag to a worker
/// only inside its validity window
async fn create_temp_badges_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS temp_badges (
            id TEXT PRIMARY KEY,
            tag_code TEXT NOT NULL,
            worker_id TEXT NOT NULL REFERENCES workers(id),
            valid_from TIMESTAMP NOT NULL,
            valid_until TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_temp_badges_tag ON temp_badges(tag_code)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_products_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_operations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS operations (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_parts_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS parts (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_post_configurations_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS post_configurations (
            id TEXT PRIMARY KEY,
            post_id TEXT NOT NULL REFERENCES posts(id),
            worker_id TEXT REFERENCES workers(id),
            product_id TEXT REFERENCES products(id),
            configured_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_post_configurations_post ON post_configurations(post_id, configured_at)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_devices_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS devices (
            id TEXT PRIMARY KEY,
            post_id TEXT NOT NULL REFERENCES posts(id),
            name TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            post_id TEXT NOT NULL REFERENCES posts(id),
            worker_id TEXT NOT NULL REFERENCES workers(id),
            product_id TEXT NOT NULL REFERENCES products(id),
            operation_id TEXT REFERENCES operations(id),
            part_id TEXT REFERENCES parts(id),
            start_ts TIMESTAMP NOT NULL,
            end_ts TIMESTAMP,
            quantity INTEGER,
            production_code TEXT,
            comment TEXT,
            device_name_snapshot TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // At most one open session per (post, worker); concurrent opens
    // resolve to one success and one constraint violation
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_open_pair
        ON sessions(post_id, worker_id) WHERE end_ts IS NULL
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_sessions_start_ts ON sessions(start_ts)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_cancelled_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS cancelled_sessions (
            id TEXT PRIMARY KEY,
            original_session_id TEXT NOT NULL UNIQUE,
            reason TEXT,
            cancelling_user_id TEXT,
            cancellation_ts TIMESTAMP NOT NULL,
            worker_name_snapshot TEXT NOT NULL,
            worker_matricula_snapshot TEXT NOT NULL,
            post_name_snapshot TEXT NOT NULL,
            operation_code_snapshot TEXT,
            operation_name_snapshot TEXT,
            start_ts_snapshot TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_cancelled_sessions_ts ON cancelled_sessions(cancellation_ts)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
