use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of an activity.
///
/// Persisted as an integer code at the database boundary only; everything
/// above the repos works with this enum. Rejected is terminal. Ongoing and
/// Finished are informational, time-based states that the registration core
/// does not actively transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityStatus {
    Pending,
    Approved,
    Rejected,
    Ongoing,
    Finished,
}

impl ActivityStatus {
    pub fn code(self) -> i64 {
        match self {
            ActivityStatus::Pending => 0,
            ActivityStatus::Approved => 1,
            ActivityStatus::Rejected => 2,
            ActivityStatus::Ongoing => 3,
            ActivityStatus::Finished => 4,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(ActivityStatus::Pending),
            1 => Some(ActivityStatus::Approved),
            2 => Some(ActivityStatus::Rejected),
            3 => Some(ActivityStatus::Ongoing),
            4 => Some(ActivityStatus::Finished),
            _ => None,
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for ActivityStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for ActivityStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let code = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Self::from_code(code).ok_or_else(|| format!("unknown activity status code {code}").into())
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for ActivityStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.code(), buf)
    }
}

/// Half-open time interval `[start, end)`.
///
/// Back-to-back windows where one ends exactly when the other starts do not
/// overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        if start < end {
            Some(Self { start, end })
        } else {
            None
        }
    }

    pub fn overlaps(&self, other: &TimeWindow) -> bool {
        self.start < other.end && self.end > other.start
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActivityRow {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub organizer: String,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub max_participants: i64,
    pub current_participants: i64,
    pub status: ActivityStatus,
    pub checkin_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub approved_by: Option<String>,
}

impl ActivityRow {
    pub fn window(&self) -> TimeWindow {
        TimeWindow {
            start: self.start_time,
            end: self.end_time,
        }
    }

    pub fn remaining_capacity(&self) -> i64 {
        (self.max_participants - self.current_participants).max(0)
    }

    pub fn is_full(&self) -> bool {
        self.current_participants >= self.max_participants
    }
}

/// Read-only view handed to the external sync collaborator. The core only
/// produces this snapshot; it never initiates or awaits the sync itself.
#[derive(Debug, Clone, Serialize)]
pub struct ActivitySnapshot {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub organizer: String,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub max_participants: i64,
    pub status: ActivityStatus,
}

impl From<&ActivityRow> for ActivitySnapshot {
    fn from(row: &ActivityRow) -> Self {
        Self {
            id: row.id,
            title: row.title.clone(),
            description: row.description.clone(),
            category: row.category.clone(),
            organizer: row.organizer.clone(),
            location: row.location.clone(),
            start_time: row.start_time,
            end_time: row.end_time,
            max_participants: row.max_participants,
            status: row.status,
        }
    }
}

/// One activity that overlaps a proposed window for a given student.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ConflictingActivity {
    pub activity_id: i64,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

/// Per-activity registration/waitlist counts for the overview listing.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ActivityOverviewRow {
    pub id: i64,
    pub title: String,
    pub category: Option<String>,
    pub organizer: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub max_participants: i64,
    pub registered_count: i64,
    pub waitlist_count: i64,
    pub status: ActivityStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 14, hour, 0, 0).unwrap()
    }

    #[test]
    fn status_codes_round_trip() {
        for status in [
            ActivityStatus::Pending,
            ActivityStatus::Approved,
            ActivityStatus::Rejected,
            ActivityStatus::Ongoing,
            ActivityStatus::Finished,
        ] {
            assert_eq!(ActivityStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(ActivityStatus::from_code(5), None);
        assert_eq!(ActivityStatus::from_code(-1), None);
    }

    #[test]
    fn window_requires_positive_duration() {
        assert!(TimeWindow::new(at(10), at(11)).is_some());
        assert!(TimeWindow::new(at(10), at(10)).is_none());
        assert!(TimeWindow::new(at(11), at(10)).is_none());
    }

    #[test]
    fn back_to_back_windows_do_not_overlap() {
        let morning = TimeWindow::new(at(10), at(11)).unwrap();
        let noon = TimeWindow::new(at(11), at(12)).unwrap();
        assert!(!morning.overlaps(&noon));
        assert!(!noon.overlaps(&morning));
    }

    #[test]
    fn partial_and_contained_windows_overlap() {
        let outer = TimeWindow::new(at(10), at(14)).unwrap();
        let shifted = TimeWindow::new(at(13), at(15)).unwrap();
        let inner = TimeWindow::new(at(11), at(12)).unwrap();
        assert!(outer.overlaps(&shifted));
        assert!(shifted.overlaps(&outer));
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }
}
