use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::SqlitePool;

use crate::models::{
    ActivityStatus, CheckInRow, ConflictingActivity, RegistrationRow, RegistrationStatus,
    StudentRegistrationRow,
};

const SQL_INSERT_REGISTRATION: &str = r#"
INSERT INTO registrations (
  activity_id,
  student_id,
  student_name,
  status,
  registered_at
) VALUES (?, ?, ?, ?, ?)
"#;

pub struct NewRegistration<'a> {
    pub activity_id: i64,
    pub student_id: &'a str,
    pub student_name: &'a str,
    pub registered_at: DateTime<Utc>,
}

// Runs inside the ledger's per-activity transaction, paired with the
// seat-count increment.
pub async fn insert_registration(
    conn: &mut SqliteConnection,
    registration: NewRegistration<'_>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_INSERT_REGISTRATION)
        .bind(registration.activity_id)
        .bind(registration.student_id)
        .bind(registration.student_name)
        .bind(RegistrationStatus::Registered)
        .bind(registration.registered_at)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}

const SQL_DELETE_REGISTRATION: &str = r#"
DELETE FROM registrations
WHERE activity_id = ? AND student_id = ?
"#;

pub async fn delete_registration(
    conn: &mut SqliteConnection,
    activity_id: i64,
    student_id: &str,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_DELETE_REGISTRATION)
        .bind(activity_id)
        .bind(student_id)
        .execute(conn)
        .await?;
    Ok(res.rows_affected())
}

const SQL_IS_REGISTERED: &str = r#"
SELECT COUNT(*) FROM registrations
WHERE activity_id = ? AND student_id = ?
"#;

pub async fn is_registered(
    pool: &SqlitePool,
    activity_id: i64,
    student_id: &str,
) -> sqlx::Result<bool> {
    let count: i64 = sqlx::query_scalar(SQL_IS_REGISTERED)
        .bind(activity_id)
        .bind(student_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

const SQL_LIST_FOR_ACTIVITY: &str = r#"
SELECT id, activity_id, student_id, student_name, status, registered_at, checkin_time
FROM registrations
WHERE activity_id = ?
ORDER BY registered_at, id
"#;

pub async fn list_for_activity(
    pool: &SqlitePool,
    activity_id: i64,
) -> sqlx::Result<Vec<RegistrationRow>> {
    sqlx::query_as::<_, RegistrationRow>(SQL_LIST_FOR_ACTIVITY)
        .bind(activity_id)
        .fetch_all(pool)
        .await
}

const SQL_LIST_FOR_STUDENT: &str = r#"
SELECT
  r.activity_id,
  a.title,
  a.location,
  a.start_time,
  a.end_time,
  r.status,
  r.registered_at,
  r.checkin_time
FROM registrations r
JOIN activities a ON r.activity_id = a.id
WHERE r.student_id = ?
ORDER BY a.start_time, r.activity_id
"#;

pub async fn list_for_student(
    pool: &SqlitePool,
    student_id: &str,
) -> sqlx::Result<Vec<StudentRegistrationRow>> {
    sqlx::query_as::<_, StudentRegistrationRow>(SQL_LIST_FOR_STUDENT)
        .bind(student_id)
        .fetch_all(pool)
        .await
}

const SQL_REGISTRATION_COUNT: &str = r#"
SELECT COUNT(*) FROM registrations
WHERE activity_id = ?
"#;

pub async fn registration_count(pool: &SqlitePool, activity_id: i64) -> sqlx::Result<i64> {
    sqlx::query_scalar(SQL_REGISTRATION_COUNT)
        .bind(activity_id)
        .fetch_one(pool)
        .await
}

// Conflict-scan candidates: the student's registrations joined to Approved
// activities, in registration order so the evaluator's output is
// deterministic. The overlap test itself happens in Rust.
const SQL_APPROVED_WINDOWS_FOR_STUDENT: &str = r#"
SELECT
  a.id AS activity_id,
  a.title,
  a.start_time,
  a.end_time
FROM activities a
JOIN registrations r ON a.id = r.activity_id
WHERE r.student_id = ? AND a.status = ?
ORDER BY r.registered_at, r.id
"#;

pub async fn approved_windows_for_student(
    pool: &SqlitePool,
    student_id: &str,
) -> sqlx::Result<Vec<ConflictingActivity>> {
    sqlx::query_as::<_, ConflictingActivity>(SQL_APPROVED_WINDOWS_FOR_STUDENT)
        .bind(student_id)
        .bind(ActivityStatus::Approved)
        .fetch_all(pool)
        .await
}

#[derive(Debug, sqlx::FromRow)]
pub struct CheckInStateRow {
    pub checkin_time: Option<DateTime<Utc>>,
}

const SQL_CHECKIN_STATE: &str = r#"
SELECT checkin_time FROM registrations
WHERE activity_id = ? AND student_id = ?
"#;

/// `None` when the pair has no registration at all; `Some(row)` otherwise,
/// with the row telling whether a check-in is already recorded.
pub async fn find_checkin_state(
    pool: &SqlitePool,
    activity_id: i64,
    student_id: &str,
) -> sqlx::Result<Option<CheckInStateRow>> {
    sqlx::query_as::<_, CheckInStateRow>(SQL_CHECKIN_STATE)
        .bind(activity_id)
        .bind(student_id)
        .fetch_optional(pool)
        .await
}

const SQL_SET_CHECKIN_TIME: &str = r#"
UPDATE registrations
SET checkin_time = ?
WHERE activity_id = ? AND student_id = ? AND checkin_time IS NULL
"#;

pub async fn set_checkin_time(
    pool: &SqlitePool,
    activity_id: i64,
    student_id: &str,
    checkin_time: DateTime<Utc>,
) -> sqlx::Result<u64> {
    let res = sqlx::query(SQL_SET_CHECKIN_TIME)
        .bind(checkin_time)
        .bind(activity_id)
        .bind(student_id)
        .execute(pool)
        .await?;
    Ok(res.rows_affected())
}

const SQL_CHECKIN_LIST: &str = r#"
SELECT student_id, student_name, checkin_time
FROM registrations
WHERE activity_id = ? AND checkin_time IS NOT NULL
ORDER BY checkin_time, id
"#;

pub async fn check_in_list(pool: &SqlitePool, activity_id: i64) -> sqlx::Result<Vec<CheckInRow>> {
    sqlx::query_as::<_, CheckInRow>(SQL_CHECKIN_LIST)
        .bind(activity_id)
        .fetch_all(pool)
        .await
}

#[derive(Debug, sqlx::FromRow)]
pub struct CheckInCountsRow {
    pub registered: i64,
    pub checked_in: i64,
}

const SQL_CHECKIN_COUNTS: &str = r#"
SELECT
  COUNT(*) AS registered,
  COUNT(checkin_time) AS checked_in
FROM registrations
WHERE activity_id = ?
"#;

pub async fn check_in_counts(
    pool: &SqlitePool,
    activity_id: i64,
) -> sqlx::Result<CheckInCountsRow> {
    sqlx::query_as::<_, CheckInCountsRow>(SQL_CHECKIN_COUNTS)
        .bind(activity_id)
        .fetch_one(pool)
        .await
}
