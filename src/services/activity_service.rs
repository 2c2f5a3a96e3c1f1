use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::database::activity_repo::{self, ActivityFilter, NewActivity};
use crate::models::{ActivityOverviewRow, ActivityRow, ActivitySnapshot, ActivityStatus};

#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("activity title must not be empty")]
    EmptyTitle,
    #[error("activity start time must be before its end time")]
    InvalidTimeWindow,
    #[error("activity capacity must be positive")]
    InvalidCapacity,
    #[error("activity {0} not found")]
    NotFound(i64),
    #[error("activity {activity_id} is not pending approval")]
    NotPending {
        activity_id: i64,
        status: ActivityStatus,
    },
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Deserialize)]
pub struct ActivityDraft {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub organizer: String,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub max_participants: i64,
    pub checkin_code: Option<String>,
}

/// Create a new activity in Pending state.
pub async fn create_activity(pool: &SqlitePool, draft: &ActivityDraft) -> Result<i64, ActivityError> {
    if draft.title.trim().is_empty() {
        return Err(ActivityError::EmptyTitle);
    }
    if draft.start_time >= draft.end_time {
        return Err(ActivityError::InvalidTimeWindow);
    }
    if draft.max_participants <= 0 {
        return Err(ActivityError::InvalidCapacity);
    }

    let id = activity_repo::insert_activity(
        pool,
        NewActivity {
            title: draft.title.trim(),
            description: draft.description.as_deref(),
            category: draft.category.as_deref(),
            organizer: &draft.organizer,
            location: draft.location.as_deref(),
            start_time: draft.start_time,
            end_time: draft.end_time,
            max_participants: draft.max_participants,
            checkin_code: draft.checkin_code.as_deref(),
        },
    )
    .await?;
    Ok(id)
}

pub async fn get_activity(
    pool: &SqlitePool,
    activity_id: i64,
) -> Result<Option<ActivityRow>, ActivityError> {
    Ok(activity_repo::get_activity(pool, activity_id).await?)
}

pub async fn list_activities(
    pool: &SqlitePool,
    filter: &ActivityFilter,
) -> Result<Vec<ActivityRow>, ActivityError> {
    Ok(activity_repo::list_activities(pool, filter).await?)
}

/// Approve a pending activity, opening it for registration. Only Pending
/// activities can be approved; Rejected is terminal.
pub async fn approve_activity(
    pool: &SqlitePool,
    activity_id: i64,
    approved_by: &str,
) -> Result<(), ActivityError> {
    decide_activity(pool, activity_id, ActivityStatus::Approved, approved_by).await
}

/// Reject a pending activity. Terminal: a rejected activity can never be
/// approved afterwards.
pub async fn reject_activity(
    pool: &SqlitePool,
    activity_id: i64,
    rejected_by: &str,
) -> Result<(), ActivityError> {
    decide_activity(pool, activity_id, ActivityStatus::Rejected, rejected_by).await
}

async fn decide_activity(
    pool: &SqlitePool,
    activity_id: i64,
    decision: ActivityStatus,
    decided_by: &str,
) -> Result<(), ActivityError> {
    let activity = activity_repo::get_activity(pool, activity_id)
        .await?
        .ok_or(ActivityError::NotFound(activity_id))?;
    if activity.status != ActivityStatus::Pending {
        return Err(ActivityError::NotPending {
            activity_id,
            status: activity.status,
        });
    }
    activity_repo::update_status(pool, activity_id, decision, decided_by, Utc::now()).await?;
    Ok(())
}

/// Configure or clear the activity's check-in code. A cleared code disables
/// student self-check-in.
pub async fn set_checkin_code(
    pool: &SqlitePool,
    activity_id: i64,
    checkin_code: Option<&str>,
) -> Result<(), ActivityError> {
    let code = checkin_code.map(str::trim).filter(|c| !c.is_empty());
    let updated = activity_repo::set_checkin_code(pool, activity_id, code).await?;
    if updated == 0 {
        return Err(ActivityError::NotFound(activity_id));
    }
    Ok(())
}

/// Read-only snapshot for the external sync collaborator.
pub async fn snapshot(
    pool: &SqlitePool,
    activity_id: i64,
) -> Result<Option<ActivitySnapshot>, ActivityError> {
    let activity = activity_repo::get_activity(pool, activity_id).await?;
    Ok(activity.as_ref().map(ActivitySnapshot::from))
}

pub async fn activity_overview(pool: &SqlitePool) -> Result<Vec<ActivityOverviewRow>, ActivityError> {
    Ok(activity_repo::activity_overview(pool).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::schema;
    use chrono::{TimeZone, Utc};
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        schema::apply_schema(&pool).await.unwrap();
        pool
    }

    fn draft(title: &str) -> ActivityDraft {
        ActivityDraft {
            title: title.to_string(),
            description: Some("demo".to_string()),
            category: Some("sports".to_string()),
            organizer: "org".to_string(),
            location: None,
            start_time: Utc.with_ymd_and_hms(2026, 9, 1, 14, 0, 0).unwrap(),
            end_time: Utc.with_ymd_and_hms(2026, 9, 1, 16, 0, 0).unwrap(),
            max_participants: 20,
            checkin_code: None,
        }
    }

    #[tokio::test]
    async fn new_activities_start_pending() {
        let pool = memory_pool().await;
        let id = create_activity(&pool, &draft("Welcome fair")).await.unwrap();
        let activity = get_activity(&pool, id).await.unwrap().unwrap();
        assert_eq!(activity.status, ActivityStatus::Pending);
        assert_eq!(activity.current_participants, 0);
    }

    #[tokio::test]
    async fn draft_validation_rejects_bad_input() {
        let pool = memory_pool().await;

        let mut bad = draft("  ");
        assert!(matches!(
            create_activity(&pool, &bad).await,
            Err(ActivityError::EmptyTitle)
        ));

        bad = draft("Backwards window");
        bad.end_time = bad.start_time;
        assert!(matches!(
            create_activity(&pool, &bad).await,
            Err(ActivityError::InvalidTimeWindow)
        ));

        bad = draft("No seats");
        bad.max_participants = 0;
        assert!(matches!(
            create_activity(&pool, &bad).await,
            Err(ActivityError::InvalidCapacity)
        ));
    }

    #[tokio::test]
    async fn rejection_is_terminal() {
        let pool = memory_pool().await;
        let id = create_activity(&pool, &draft("Doomed")).await.unwrap();
        reject_activity(&pool, id, "admin").await.unwrap();

        let err = approve_activity(&pool, id, "admin").await.unwrap_err();
        assert!(matches!(
            err,
            ActivityError::NotPending {
                status: ActivityStatus::Rejected,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn approval_records_who_and_when() {
        let pool = memory_pool().await;
        let id = create_activity(&pool, &draft("Open day")).await.unwrap();
        approve_activity(&pool, id, "admin").await.unwrap();

        let activity = get_activity(&pool, id).await.unwrap().unwrap();
        assert_eq!(activity.status, ActivityStatus::Approved);
        assert_eq!(activity.approved_by.as_deref(), Some("admin"));
        assert!(activity.approved_at.is_some());
    }

    #[tokio::test]
    async fn snapshot_carries_the_sync_fields() {
        let pool = memory_pool().await;
        let id = create_activity(&pool, &draft("Sync me")).await.unwrap();
        let snap = snapshot(&pool, id).await.unwrap().unwrap();
        assert_eq!(snap.id, id);
        assert_eq!(snap.title, "Sync me");
        assert_eq!(snap.max_participants, 20);
        assert_eq!(snap.status, ActivityStatus::Pending);
        assert!(snapshot(&pool, id + 999).await.unwrap().is_none());
    }
}
