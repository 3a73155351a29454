//! Dashboard aggregation
//!
//! Computes the occupancy grid and summary metrics from the live
//! ledger plus the static topology. Pure read: no side effects, safe
//! to call repeatedly and concurrently.

use std::collections::HashMap;

use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::SqlitePool;
use takt_common::Result;
use uuid::Uuid;

use crate::store::{catalog, sessions};
use crate::store::sessions::OpenSessionLabels;

/// Every sub-line renders exactly this many slots; shorter post lists
/// are padded with idle placeholders, longer ones truncated
pub const SUB_LINE_CAPACITY: usize = 4;

/// Full dashboard state pushed to subscribers
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub metrics: DashboardMetrics,
    pub grid: Vec<SubLineGrid>,
}

/// Summary numbers computed in the same pass as the grid
#[derive(Debug, Clone, Serialize)]
pub struct DashboardMetrics {
    /// Posts with at least one open session
    pub occupied_posts: usize,
    /// Posts in the topology
    pub total_posts: usize,
    /// Sum of quantities over today's already-closed sessions
    pub quantity_today: i64,
    /// Distinct workers with an open session
    pub active_workers: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubLineGrid {
    pub sub_line_id: Uuid,
    pub name: String,
    pub slots: Vec<PostSlot>,
}

/// One display slot; `occupant = None` is the explicit idle placeholder
#[derive(Debug, Clone, Serialize)]
pub struct PostSlot {
    /// Display number, sequential across all sub-lines starting at 1
    pub number: usize,
    pub post_id: Option<Uuid>,
    pub post_name: Option<String>,
    pub occupant: Option<SlotOccupant>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlotOccupant {
    pub session_id: Uuid,
    pub worker_name: String,
    pub worker_matricula: String,
    pub product_code: String,
    pub operation_name: Option<String>,
    pub start_ts: NaiveDateTime,
}

/// Current occupancy snapshot, "today" taken from the site clock
pub async fn snapshot(db: &SqlitePool) -> Result<DashboardSnapshot> {
    snapshot_for_date(db, Local::now().date_naive()).await
}

/// Occupancy snapshot with an explicit "today" for the quantity metric
pub async fn snapshot_for_date(db: &SqlitePool, today: NaiveDate) -> Result<DashboardSnapshot> {
    let open = sessions::open_sessions_with_labels(db).await?;
    let sub_lines = catalog::sub_lines_ordered(db).await?;
    let posts = catalog::posts_ordered(db).await?;
    let quantity_today = sessions::closed_quantity_for_date(db, today).await?;

    // Index open sessions by post; first session wins if a post somehow
    // carries more than one worker
    let mut by_post: HashMap<Uuid, &OpenSessionLabels> = HashMap::new();
    for session in &open {
        by_post.entry(session.post_id).or_insert(session);
    }

    let mut posts_by_sub_line: HashMap<Uuid, Vec<&_>> = HashMap::new();
    for post in &posts {
        posts_by_sub_line.entry(post.sub_line_id).or_default().push(post);
    }

    let mut grid = Vec::with_capacity(sub_lines.len());
    let mut occupied_posts = 0;
    let mut number = 0;

    for sub_line in &sub_lines {
        let sub_posts = posts_by_sub_line
            .get(&sub_line.id)
            .map(|v| v.as_slice())
            .unwrap_or(&[]);

        let mut slots = Vec::with_capacity(SUB_LINE_CAPACITY);
        for slot_index in 0..SUB_LINE_CAPACITY {
            number += 1;
            match sub_posts.get(slot_index) {
                Some(post) => {
                    let occupant = by_post.get(&post.id).map(|s| SlotOccupant {
                        session_id: s.session_id,
                        worker_name: s.worker_name.clone(),
                        worker_matricula: s.worker_matricula.clone(),
                        product_code: s.product_code.clone(),
                        operation_name: s.operation_name.clone(),
                        start_ts: s.start_ts,
                    });
                    if occupant.is_some() {
                        occupied_posts += 1;
                    }
                    slots.push(PostSlot {
                        number,
                        post_id: Some(post.id),
                        post_name: Some(post.name.clone()),
                        occupant,
                    });
                }
                None => slots.push(PostSlot {
                    number,
                    post_id: None,
                    post_name: None,
                    occupant: None,
                }),
            }
        }

        grid.push(SubLineGrid {
            sub_line_id: sub_line.id,
            name: sub_line.name.clone(),
            slots,
        });
    }

    let active_workers = {
        let mut workers: Vec<Uuid> = open.iter().map(|s| s.worker_id).collect();
        workers.sort_unstable();
        workers.dedup();
        workers.len()
    };

    Ok(DashboardSnapshot {
        metrics: DashboardMetrics {
            occupied_posts,
            total_posts: posts.len(),
            quantity_today,
            active_workers,
        },
        grid,
    })
}
