#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use campushub::database::schema;
use campushub::services::activity_service::{self, ActivityDraft};

// A single-connection in-memory pool: every handle sees the same database
// and the schema is already applied.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");
    schema::apply_schema(&pool).await.expect("schema");
    pool
}

pub fn draft(title: &str, capacity: i64, start: DateTime<Utc>, end: DateTime<Utc>) -> ActivityDraft {
    ActivityDraft {
        title: title.to_string(),
        description: None,
        category: Some("test".to_string()),
        organizer: "org".to_string(),
        location: None,
        start_time: start,
        end_time: end,
        max_participants: capacity,
        checkin_code: None,
    }
}

/// Create and approve an activity starting tomorrow with the given capacity.
pub async fn approved_activity(pool: &SqlitePool, title: &str, capacity: i64) -> i64 {
    let start = Utc::now() + Duration::days(1);
    let end = start + Duration::hours(2);
    approved_activity_at(pool, title, capacity, start, end).await
}

pub async fn approved_activity_at(
    pool: &SqlitePool,
    title: &str,
    capacity: i64,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> i64 {
    let id = activity_service::create_activity(pool, &draft(title, capacity, start, end))
        .await
        .expect("create activity");
    activity_service::approve_activity(pool, id, "admin")
        .await
        .expect("approve activity");
    id
}

/// Confirmed seat count as the catalog records it.
pub async fn confirmed_count(pool: &SqlitePool, activity_id: i64) -> i64 {
    activity_service::get_activity(pool, activity_id)
        .await
        .expect("get activity")
        .expect("activity exists")
        .current_participants
}
