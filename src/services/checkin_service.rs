use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;

use crate::database::{activity_repo, registration_repo};
use crate::models::CheckInRow;

#[derive(Debug, Error)]
pub enum CheckInError {
    #[error("student {student_id} holds no registration for activity {activity_id}")]
    NotRegistered { activity_id: i64, student_id: String },
    #[error("student {student_id} already checked in to activity {activity_id}")]
    AlreadyCheckedIn { activity_id: i64, student_id: String },
    #[error("activity {activity_id} has not started yet")]
    NotYetStarted {
        activity_id: i64,
        starts_at: DateTime<Utc>,
    },
    #[error("activity {0} has no check-in code configured")]
    NoCodeConfigured(i64),
    #[error("presented check-in code does not match activity {0}")]
    CodeMismatch(i64),
    #[error("activity {0} not found")]
    ActivityNotFound(i64),
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

/// Record attendance for a confirmed registrant.
///
/// Precondition order is fixed and the first failure wins: registration
/// exists, not already checked in, activity has started, then code
/// validation. An empty `presented_code` is the organizer/admin path and
/// bypasses code validation entirely; a non-empty one must match a
/// configured code.
pub async fn check_in(
    pool: &SqlitePool,
    activity_id: i64,
    student_id: &str,
    presented_code: &str,
) -> Result<DateTime<Utc>, CheckInError> {
    let state = registration_repo::find_checkin_state(pool, activity_id, student_id)
        .await?
        .ok_or_else(|| CheckInError::NotRegistered {
            activity_id,
            student_id: student_id.to_string(),
        })?;
    if state.checkin_time.is_some() {
        return Err(CheckInError::AlreadyCheckedIn {
            activity_id,
            student_id: student_id.to_string(),
        });
    }

    let activity = activity_repo::get_activity(pool, activity_id)
        .await?
        .ok_or(CheckInError::ActivityNotFound(activity_id))?;
    let now = Utc::now();
    if now < activity.start_time {
        return Err(CheckInError::NotYetStarted {
            activity_id,
            starts_at: activity.start_time,
        });
    }

    if !presented_code.is_empty() {
        let stored = activity.checkin_code.as_deref().unwrap_or("");
        if stored.is_empty() {
            return Err(CheckInError::NoCodeConfigured(activity_id));
        }
        if stored != presented_code {
            return Err(CheckInError::CodeMismatch(activity_id));
        }
    }

    // The IS NULL guard in the update makes a lost race surface as a
    // failed write instead of a silently overwritten timestamp.
    let updated = registration_repo::set_checkin_time(pool, activity_id, student_id, now).await?;
    if updated == 0 {
        return Err(CheckInError::AlreadyCheckedIn {
            activity_id,
            student_id: student_id.to_string(),
        });
    }
    Ok(now)
}

pub async fn check_in_list(
    pool: &SqlitePool,
    activity_id: i64,
) -> Result<Vec<CheckInRow>, CheckInError> {
    Ok(registration_repo::check_in_list(pool, activity_id).await?)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckInStatistics {
    pub registered: i64,
    pub checked_in: i64,
    pub rate: f64,
    pub not_checked_in: i64,
}

pub async fn check_in_statistics(
    pool: &SqlitePool,
    activity_id: i64,
) -> Result<CheckInStatistics, CheckInError> {
    let counts = registration_repo::check_in_counts(pool, activity_id).await?;
    Ok(statistics_from_counts(counts.registered, counts.checked_in))
}

fn statistics_from_counts(registered: i64, checked_in: i64) -> CheckInStatistics {
    let rate = if registered > 0 {
        checked_in as f64 / registered as f64 * 100.0
    } else {
        0.0
    };
    CheckInStatistics {
        registered,
        checked_in,
        rate,
        not_checked_in: registered - checked_in,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_percentage_of_registered() {
        let stats = statistics_from_counts(10, 4);
        assert_eq!(stats.registered, 10);
        assert_eq!(stats.checked_in, 4);
        assert_eq!(stats.rate, 40.0);
        assert_eq!(stats.not_checked_in, 6);
    }

    #[test]
    fn empty_activity_has_zero_rate() {
        let stats = statistics_from_counts(0, 0);
        assert_eq!(stats.rate, 0.0);
        assert_eq!(stats.not_checked_in, 0);
    }

    #[test]
    fn full_attendance_is_one_hundred_percent() {
        let stats = statistics_from_counts(7, 7);
        assert_eq!(stats.rate, 100.0);
        assert_eq!(stats.not_checked_in, 0);
    }
}
