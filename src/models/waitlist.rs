use chrono::{DateTime, Utc};
use serde::Serialize;

/// A pending seat request. FIFO position is `(added_at, id)`; the rowid
/// tiebreak keeps the order total when two inserts share a timestamp.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct WaitlistRow {
    pub id: i64,
    pub activity_id: i64,
    pub student_id: String,
    pub student_name: String,
    pub added_at: DateTime<Utc>,
}
