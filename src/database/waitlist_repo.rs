use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnection, SqliteExecutor};
use sqlx::SqlitePool;

use crate::models::WaitlistRow;

// A duplicate enqueue for the same (activity, student) pair is a no-op, not
// an error; callers read rows_affected when they care.
const SQL_ENQUEUE: &str = r#"
INSERT OR IGNORE INTO waitlist (
  activity_id,
  student_id,
  student_name,
  added_at
) VALUES (?, ?, ?, ?)
"#;

pub async fn enqueue(
    pool: &SqlitePool,
    activity_id: i64,
    student_id: &str,
    student_name: &str,
    added_at: DateTime<Utc>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_ENQUEUE)
        .bind(activity_id)
        .bind(student_id)
        .bind(student_name)
        .bind(added_at)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_REMOVE: &str = r#"
DELETE FROM waitlist
WHERE activity_id = ? AND student_id = ?
"#;

pub async fn remove(
    executor: impl SqliteExecutor<'_>,
    activity_id: i64,
    student_id: &str,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_REMOVE)
        .bind(activity_id)
        .bind(student_id)
        .execute(executor)
        .await?;
    Ok(res.rows_affected())
}

const SQL_FIRST_IN_LINE: &str = r#"
SELECT id, activity_id, student_id, student_name, added_at
FROM waitlist
WHERE activity_id = ?
ORDER BY added_at, id
LIMIT 1
"#;

pub async fn first_in_line(
    conn: &mut SqliteConnection,
    activity_id: i64,
) -> sqlx::Result<Option<WaitlistRow>> {
    sqlx::query_as::<_, WaitlistRow>(SQL_FIRST_IN_LINE)
        .bind(activity_id)
        .fetch_optional(conn)
        .await
}

const SQL_IS_WAITLISTED: &str = r#"
SELECT COUNT(*) FROM waitlist
WHERE activity_id = ? AND student_id = ?
"#;

pub async fn is_waitlisted(
    pool: &SqlitePool,
    activity_id: i64,
    student_id: &str,
) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(SQL_IS_WAITLISTED)
        .bind(activity_id)
        .bind(student_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

const SQL_LIST_FOR_ACTIVITY: &str = r#"
SELECT id, activity_id, student_id, student_name, added_at
FROM waitlist
WHERE activity_id = ?
ORDER BY added_at, id
"#;

pub async fn list_for_activity(
    pool: &SqlitePool,
    activity_id: i64,
) -> sqlx::Result<Vec<WaitlistRow>> {
    sqlx::query_as::<_, WaitlistRow>(SQL_LIST_FOR_ACTIVITY)
        .bind(activity_id)
        .fetch_all(pool)
        .await
}
