use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;

use crate::models::{ActivityOverviewRow, ActivityRow, ActivityStatus};

const SQL_INSERT_ACTIVITY: &str = r#"
INSERT INTO activities (
  title,
  description,
  category,
  organizer,
  location,
  start_time,
  end_time,
  max_participants,
  status,
  checkin_code,
  created_at
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
"#;

pub struct NewActivity<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub organizer: &'a str,
    pub location: Option<&'a str>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub max_participants: i64,
    pub checkin_code: Option<&'a str>,
}

pub async fn insert_activity(pool: &SqlitePool, activity: NewActivity<'_>) -> sqlx::Result<i64> {
    let res = sqlx::query(SQL_INSERT_ACTIVITY)
        .bind(activity.title)
        .bind(activity.description)
        .bind(activity.category)
        .bind(activity.organizer)
        .bind(activity.location)
        .bind(activity.start_time)
        .bind(activity.end_time)
        .bind(activity.max_participants)
        .bind(ActivityStatus::Pending)
        .bind(activity.checkin_code)
        .bind(Utc::now())
        .execute(pool)
        .await?;
    Ok(res.last_insert_rowid())
}

const SQL_GET_ACTIVITY: &str = r#"
SELECT
  id,
  title,
  description,
  category,
  organizer,
  location,
  start_time,
  end_time,
  max_participants,
  current_participants,
  status,
  checkin_code,
  created_at,
  approved_at,
  approved_by
FROM activities
WHERE id = ?
"#;

pub async fn get_activity(pool: &SqlitePool, activity_id: i64) -> sqlx::Result<Option<ActivityRow>> {
    sqlx::query_as::<_, ActivityRow>(SQL_GET_ACTIVITY)
        .bind(activity_id)
        .fetch_optional(pool)
        .await
}

/// Structured listing filter. Role and search text travel as data and are
/// bound as parameters, never spliced into the SQL.
#[derive(Debug, Default, Clone)]
pub struct ActivityFilter {
    pub status: Option<ActivityStatus>,
    pub organizer: Option<String>,
    pub search: Option<String>,
}

pub async fn list_activities(
    pool: &SqlitePool,
    filter: &ActivityFilter,
) -> sqlx::Result<Vec<ActivityRow>> {
    let mut qb = sqlx::QueryBuilder::new(
        "SELECT id, title, description, category, organizer, location, start_time, end_time, \
         max_participants, current_participants, status, checkin_code, created_at, approved_at, \
         approved_by FROM activities WHERE 1 = 1",
    );
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.code());
    }
    if let Some(organizer) = &filter.organizer {
        qb.push(" AND organizer = ").push_bind(organizer.clone());
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{search}%");
        qb.push(" AND (title LIKE ")
            .push_bind(pattern.clone())
            .push(" OR category LIKE ")
            .push_bind(pattern.clone())
            .push(" OR organizer LIKE ")
            .push_bind(pattern)
            .push(")");
    }
    qb.push(" ORDER BY created_at DESC, id DESC");
    qb.build_query_as::<ActivityRow>().fetch_all(pool).await
}

const SQL_UPDATE_STATUS: &str = r#"
UPDATE activities
SET status = ?, approved_at = ?, approved_by = ?
WHERE id = ?
"#;

pub async fn update_status(
    pool: &SqlitePool,
    activity_id: i64,
    status: ActivityStatus,
    decided_by: &str,
    decided_at: DateTime<Utc>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_UPDATE_STATUS)
        .bind(status)
        .bind(decided_at)
        .bind(decided_by)
        .bind(activity_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_SET_CHECKIN_CODE: &str = r#"
UPDATE activities
SET checkin_code = ?
WHERE id = ?
"#;

pub async fn set_checkin_code(
    pool: &SqlitePool,
    activity_id: i64,
    checkin_code: Option<&str>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_SET_CHECKIN_CODE)
        .bind(checkin_code)
        .bind(activity_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_INCREMENT_PARTICIPANTS: &str = r#"
UPDATE activities
SET current_participants = current_participants + 1
WHERE id = ?
"#;

// Seat-count mutations run inside the caller's transaction, under the
// activity's ledger lock.
pub async fn increment_participants(
    conn: &mut SqliteConnection,
    activity_id: i64,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_INCREMENT_PARTICIPANTS)
        .bind(activity_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}

const SQL_DECREMENT_PARTICIPANTS: &str = r#"
UPDATE activities
SET current_participants = current_participants - 1
WHERE id = ? AND current_participants > 0
"#;

pub async fn decrement_participants(
    conn: &mut SqliteConnection,
    activity_id: i64,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DECREMENT_PARTICIPANTS)
        .bind(activity_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}

const SQL_ACTIVITY_OVERVIEW: &str = r#"
SELECT
  a.id,
  a.title,
  a.category,
  a.organizer,
  a.start_time,
  a.end_time,
  a.max_participants,
  COUNT(DISTINCT r.id) AS registered_count,
  COUNT(DISTINCT w.id) AS waitlist_count,
  a.status
FROM activities a
LEFT JOIN registrations r ON a.id = r.activity_id
LEFT JOIN waitlist w ON a.id = w.activity_id
GROUP BY a.id
ORDER BY a.start_time, a.id
"#;

pub async fn activity_overview(pool: &SqlitePool) -> sqlx::Result<Vec<ActivityOverviewRow>> {
    sqlx::query_as::<_, ActivityOverviewRow>(SQL_ACTIVITY_OVERVIEW)
        .fetch_all(pool)
        .await
}
