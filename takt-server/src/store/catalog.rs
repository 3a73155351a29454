//! Reference catalog lookups
//!
//! Read-only views over the worker directory, badge overlays, the
//! line/sub-line/post topology, product/operation/part catalogs, post
//! configurations and the device registry. Reference-data maintenance
//! happens outside this service.

use chrono::NaiveDateTime;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use takt_common::db::models::{Operation, Part, Post, PostConfiguration, Product, SubLine, Worker};
use takt_common::db::{parse_uuid, parse_uuid_opt};
use takt_common::Result;
use uuid::Uuid;

fn map_worker(row: &SqliteRow) -> Result<Worker> {
    Ok(Worker {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        name: row.try_get("name")?,
        matricula: row.try_get("matricula")?,
        badge_code: row.try_get("badge_code")?,
        active: row.try_get::<i64, _>("active")? != 0,
    })
}

fn map_post_configuration(row: &SqliteRow) -> Result<PostConfiguration> {
    Ok(PostConfiguration {
        id: parse_uuid(&row.try_get::<String, _>("id")?)?,
        post_id: parse_uuid(&row.try_get::<String, _>("post_id")?)?,
        worker_id: parse_uuid_opt(row.try_get::<Option<String>, _>("worker_id")?)?,
        product_id: parse_uuid_opt(row.try_get::<Option<String>, _>("product_id")?)?,
        configured_at: row.try_get("configured_at")?,
    })
}

pub async fn worker_by_id(db: &SqlitePool, id: Uuid) -> Result<Option<Worker>> {
    let row = sqlx::query("SELECT id, name, matricula, badge_code, active FROM workers WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(db)
        .await?;

    row.as_ref().map(map_worker).transpose()
}

/// Resolve a badge tag to a worker at the given instant
///
/// The temporary-badge overlay is checked first; a temp badge only
/// matches inside its validity window. Expired overlays fall through to
/// the permanent badge directory.
pub async fn worker_by_badge(
    db: &SqlitePool,
    tag_code: &str,
    at: NaiveDateTime,
) -> Result<Option<Worker>> {
    let row = sqlx::query(
        r#"
        SELECT w.id, w.name, w.matricula, w.badge_code, w.active
        FROM temp_badges t
        JOIN workers w ON w.id = t.worker_id
        WHERE t.tag_code = ? AND t.valid_from <= ? AND t.valid_until >= ?
        ORDER BY t.valid_until DESC
        LIMIT 1
        "#,
    )
    .bind(tag_code)
    .bind(at)
    .bind(at)
    .fetch_optional(db)
    .await?;

    if let Some(row) = row {
        return map_worker(&row).map(Some);
    }

    let row = sqlx::query(
        "SELECT id, name, matricula, badge_code, active FROM workers WHERE badge_code = ?",
    )
    .bind(tag_code)
    .fetch_optional(db)
    .await?;

    row.as_ref().map(map_worker).transpose()
}

pub async fn post_by_id(db: &SqlitePool, id: Uuid) -> Result<Option<Post>> {
    let row = sqlx::query("SELECT id, sub_line_id, name, position FROM posts WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(db)
        .await?;

    row.map(|row| {
        Ok(Post {
            id: parse_uuid(&row.try_get::<String, _>("id")?)?,
            sub_line_id: parse_uuid(&row.try_get::<String, _>("sub_line_id")?)?,
            name: row.try_get("name")?,
            position: row.try_get("position")?,
        })
    })
    .transpose()
}

pub async fn product_by_id(db: &SqlitePool, id: Uuid) -> Result<Option<Product>> {
    let row = sqlx::query("SELECT id, code, name FROM products WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(db)
        .await?;

    row.map(|row| {
        Ok(Product {
            id: parse_uuid(&row.try_get::<String, _>("id")?)?,
            code: row.try_get("code")?,
            name: row.try_get("name")?,
        })
    })
    .transpose()
}

pub async fn operation_by_id(db: &SqlitePool, id: Uuid) -> Result<Option<Operation>> {
    let row = sqlx::query("SELECT id, code, name FROM operations WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(db)
        .await?;

    row.map(|row| {
        Ok(Operation {
            id: parse_uuid(&row.try_get::<String, _>("id")?)?,
            code: row.try_get("code")?,
            name: row.try_get("name")?,
        })
    })
    .transpose()
}

pub async fn part_by_id(db: &SqlitePool, id: Uuid) -> Result<Option<Part>> {
    let row = sqlx::query("SELECT id, code, name FROM parts WHERE id = ?")
        .bind(id.to_string())
        .fetch_optional(db)
        .await?;

    row.map(|row| {
        Ok(Part {
            id: parse_uuid(&row.try_get::<String, _>("id")?)?,
            code: row.try_get("code")?,
            name: row.try_get("name")?,
        })
    })
    .transpose()
}

/// Newest configuration for a post, regardless of product
pub async fn latest_config_for_post(
    db: &SqlitePool,
    post_id: Uuid,
) -> Result<Option<PostConfiguration>> {
    let row = sqlx::query(
        r#"
        SELECT id, post_id, worker_id, product_id, configured_at
        FROM post_configurations
        WHERE post_id = ?
        ORDER BY configured_at DESC
        LIMIT 1
        "#,
    )
    .bind(post_id.to_string())
    .fetch_optional(db)
    .await?;

    row.as_ref().map(map_post_configuration).transpose()
}

/// Newest configuration naming this worker that has a product assigned
///
/// Used by the badge toggle when no explicit post is supplied.
pub async fn latest_config_for_worker(
    db: &SqlitePool,
    worker_id: Uuid,
) -> Result<Option<PostConfiguration>> {
    let row = sqlx::query(
        r#"
        SELECT id, post_id, worker_id, product_id, configured_at
        FROM post_configurations
        WHERE worker_id = ? AND product_id IS NOT NULL
        ORDER BY configured_at DESC
        LIMIT 1
        "#,
    )
    .bind(worker_id.to_string())
    .fetch_optional(db)
    .await?;

    row.as_ref().map(map_post_configuration).transpose()
}

/// Display label of the device installed at a post, if any
pub async fn device_name_for_post(db: &SqlitePool, post_id: Uuid) -> Result<Option<String>> {
    let name: Option<String> = sqlx::query_scalar("SELECT name FROM devices WHERE post_id = ? LIMIT 1")
        .bind(post_id.to_string())
        .fetch_optional(db)
        .await?;

    Ok(name)
}

/// All sub-lines in display order
pub async fn sub_lines_ordered(db: &SqlitePool) -> Result<Vec<SubLine>> {
    let rows = sqlx::query(
        r#"
        SELECT sl.id, sl.line_id, sl.name, sl.position
        FROM sub_lines sl
        JOIN lines l ON l.id = sl.line_id
        ORDER BY l.position, sl.position, sl.name
        "#,
    )
    .fetch_all(db)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(SubLine {
                id: parse_uuid(&row.try_get::<String, _>("id")?)?,
                line_id: parse_uuid(&row.try_get::<String, _>("line_id")?)?,
                name: row.try_get("name")?,
                position: row.try_get("position")?,
            })
        })
        .collect()
}

/// All posts in display order (grouping by sub-line happens in the aggregator)
pub async fn posts_ordered(db: &SqlitePool) -> Result<Vec<Post>> {
    let rows = sqlx::query(
        "SELECT id, sub_line_id, name, position FROM posts ORDER BY position, name",
    )
    .fetch_all(db)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(Post {
                id: parse_uuid(&row.try_get::<String, _>("id")?)?,
                sub_line_id: parse_uuid(&row.try_get::<String, _>("sub_line_id")?)?,
                name: row.try_get("name")?,
                position: row.try_get("position")?,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use sqlx::sqlite::SqlitePoolOptions;
    use takt_common::db::create_schema;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        create_schema(&pool).await.unwrap();
        pool
    }

    fn ts(h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    async fn seed_worker(pool: &SqlitePool, badge: Option<&str>, active: bool) -> Uuid {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO workers (id, name, matricula, badge_code, active) VALUES (?, 'Ana', ?, ?, ?)")
            .bind(id.to_string())
            .bind(Uuid::new_v4().to_string())
            .bind(badge)
            .bind(active as i64)
            .execute(pool)
            .await
            .unwrap();
        id
    }

    #[tokio::test]
    async fn test_worker_by_permanent_badge() {
        let db = setup_test_db().await;
        let id = seed_worker(&db, Some("TAG-1"), true).await;

        let worker = worker_by_badge(&db, "TAG-1", ts(9, 0)).await.unwrap().unwrap();
        assert_eq!(worker.id, id);
        assert!(worker.active);

        assert!(worker_by_badge(&db, "TAG-MISSING", ts(9, 0)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_temp_badge_overlay_wins_inside_window() {
        let db = setup_test_db().await;
        let permanent_owner = seed_worker(&db, Some("TAG-1"), true).await;
        let temp_owner = seed_worker(&db, None, true).await;

        sqlx::query(
            "INSERT INTO temp_badges (id, tag_code, worker_id, valid_from, valid_until) VALUES (?, 'TAG-1', ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(temp_owner.to_string())
        .bind(ts(8, 0))
        .bind(ts(16, 0))
        .execute(&db)
        .await
        .unwrap();

        // Inside the validity window the overlay wins
        let worker = worker_by_badge(&db, "TAG-1", ts(9, 0)).await.unwrap().unwrap();
        assert_eq!(worker.id, temp_owner);

        // Past expiry the overlay is skipped and the permanent badge matches
        let worker = worker_by_badge(&db, "TAG-1", ts(17, 0)).await.unwrap().unwrap();
        assert_eq!(worker.id, permanent_owner);
    }

    #[tokio::test]
    async fn test_latest_config_for_worker_requires_product() {
        let db = setup_test_db().await;
        let worker = seed_worker(&db, None, true).await;
        let product = Uuid::new_v4();
        sqlx::query("INSERT INTO lines (id, name) VALUES ('l1', 'L1')")
            .execute(&db)
            .await
            .unwrap();
        sqlx::query("INSERT INTO sub_lines (id, line_id, name) VALUES ('sl1', 'l1', 'SL1')")
            .execute(&db)
            .await
            .unwrap();
        sqlx::query("INSERT INTO posts (id, sub_line_id, name) VALUES ('p1', 'sl1', 'P1')")
            .execute(&db)
            .await
            .unwrap();
        sqlx::query("INSERT INTO posts (id, sub_line_id, name) VALUES ('p2', 'sl1', 'P2')")
            .execute(&db)
            .await
            .unwrap();
        sqlx::query("INSERT INTO products (id, code, name) VALUES (?, 'PRD-1', 'Widget')")
            .bind(product.to_string())
            .execute(&db)
            .await
            .unwrap();

        // Newer configuration lacks a product, older one has it; the
        // older one must be selected
        sqlx::query(
            "INSERT INTO post_configurations (id, post_id, worker_id, product_id, configured_at) VALUES (?, 'p1', ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(worker.to_string())
        .bind(product.to_string())
        .bind(ts(8, 0))
        .execute(&db)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO post_configurations (id, post_id, worker_id, product_id, configured_at) VALUES (?, 'p2', ?, NULL, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(worker.to_string())
        .bind(ts(9, 0))
        .execute(&db)
        .await
        .unwrap();

        let config = latest_config_for_worker(&db, worker).await.unwrap().unwrap();
        assert_eq!(config.product_id, Some(product));
        assert_eq!(config.configured_at, ts(8, 0));
    }
}
