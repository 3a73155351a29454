//! Shared test fixtures: schema setup and reference-data seeding
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use takt_common::db::create_schema;
use uuid::Uuid;

/// In-memory database with the full schema
///
/// Single connection so every query sees the same memory database.
pub async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .unwrap();
    create_schema(&pool).await.unwrap();
    pool
}

pub fn ts(h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 14)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

pub async fn seed_line(pool: &SqlitePool, name: &str, position: i64) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO lines (id, name, position) VALUES (?, ?, ?)")
        .bind(id.to_string())
        .bind(name)
        .bind(position)
        .execute(pool)
        .await
        .unwrap();
    id
}

pub async fn seed_sub_line(pool: &SqlitePool, line: Uuid, name: &str, position: i64) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO sub_lines (id, line_id, name, position) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(line.to_string())
        .bind(name)
        .bind(position)
        .execute(pool)
        .await
        .unwrap();
    id
}

pub async fn seed_post(pool: &SqlitePool, sub_line: Uuid, name: &str, position: i64) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO posts (id, sub_line_id, name, position) VALUES (?, ?, ?, ?)")
        .bind(id.to_string())
        .bind(sub_line.to_string())
        .bind(name)
        .bind(position)
        .execute(pool)
        .await
        .unwrap();
    id
}

pub async fn seed_worker(
    pool: &SqlitePool,
    name: &str,
    matricula: &str,
    badge_code: Option<&str>,
    active: bool,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO workers (id, name, matricula, badge_code, active) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(name)
    .bind(matricula)
    .bind(badge_code)
    .bind(active as i64)
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn seed_product(pool: &SqlitePool, code: &str, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO products (id, code, name) VALUES (?, ?, ?)")
        .bind(id.to_string())
        .bind(code)
        .bind(name)
        .execute(pool)
        .await
        .unwrap();
    id
}

pub async fn seed_operation(pool: &SqlitePool, code: &str, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO operations (id, code, name) VALUES (?, ?, ?)")
        .bind(id.to_string())
        .bind(code)
        .bind(name)
        .execute(pool)
        .await
        .unwrap();
    id
}

pub async fn seed_post_config(
    pool: &SqlitePool,
    post: Uuid,
    worker: Option<Uuid>,
    product: Option<Uuid>,
    configured_at: NaiveDateTime,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO post_configurations (id, post_id, worker_id, product_id, configured_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(post.to_string())
    .bind(worker.map(|u| u.to_string()))
    .bind(product.map(|u| u.to_string()))
    .bind(configured_at)
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn seed_temp_badge(
    pool: &SqlitePool,
    tag_code: &str,
    worker: Uuid,
    valid_from: NaiveDateTime,
    valid_until: NaiveDateTime,
) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO temp_badges (id, tag_code, worker_id, valid_from, valid_until) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id.to_string())
    .bind(tag_code)
    .bind(worker.to_string())
    .bind(valid_from)
    .bind(valid_until)
    .execute(pool)
    .await
    .unwrap();
    id
}

pub async fn seed_device(pool: &SqlitePool, post: Uuid, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO devices (id, post_id, name) VALUES (?, ?, ?)")
        .bind(id.to_string())
        .bind(post.to_string())
        .bind(name)
        .execute(pool)
        .await
        .unwrap();
    id
}

/// Minimal topology for lifecycle tests: one post, one worker, one product
pub struct Fixture {
    pub post: Uuid,
    pub worker: Uuid,
    pub product: Uuid,
}

pub async fn seed_basic(pool: &SqlitePool) -> Fixture {
    let line = seed_line(pool, "Line 1", 1).await;
    let sub_line = seed_sub_line(pool, line, "SL-1", 1).await;
    let post = seed_post(pool, sub_line, "Post 1", 1).await;
    let worker = seed_worker(pool, "Ana Torres", "1001", Some("TAG-1001"), true).await;
    let product = seed_product(pool, "PRD-1", "Widget").await;
    Fixture {
        post,
        worker,
        product,
    }
}
