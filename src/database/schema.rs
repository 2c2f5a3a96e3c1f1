use sqlx::SqlitePool;

// Bootstrap schema for a fresh database. Timestamps are always bound from
// Rust as UTC datetimes so their stored text form sorts chronologically;
// none of the columns rely on SQL-side defaults for time.
const CREATE_ACTIVITIES: &str = r#"
CREATE TABLE IF NOT EXISTS activities (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  title TEXT NOT NULL,
  description TEXT,
  category TEXT,
  organizer TEXT NOT NULL,
  location TEXT,
  start_time DATETIME NOT NULL,
  end_time DATETIME NOT NULL,
  max_participants INTEGER NOT NULL,
  current_participants INTEGER NOT NULL DEFAULT 0,
  status INTEGER NOT NULL DEFAULT 0,
  checkin_code TEXT,
  created_at DATETIME NOT NULL,
  approved_at DATETIME,
  approved_by TEXT
)
"#;

const CREATE_REGISTRATIONS: &str = r#"
CREATE TABLE IF NOT EXISTS registrations (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  activity_id INTEGER NOT NULL,
  student_id TEXT NOT NULL,
  student_name TEXT NOT NULL,
  status INTEGER NOT NULL DEFAULT 0,
  registered_at DATETIME NOT NULL,
  checkin_time DATETIME,
  FOREIGN KEY (activity_id) REFERENCES activities(id) ON DELETE CASCADE,
  UNIQUE(activity_id, student_id)
)
"#;

const CREATE_WAITLIST: &str = r#"
CREATE TABLE IF NOT EXISTS waitlist (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  activity_id INTEGER NOT NULL,
  student_id TEXT NOT NULL,
  student_name TEXT NOT NULL,
  added_at DATETIME NOT NULL,
  FOREIGN KEY (activity_id) REFERENCES activities(id) ON DELETE CASCADE,
  UNIQUE(activity_id, student_id)
)
"#;

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_registrations_activity ON registrations(activity_id)",
    "CREATE INDEX IF NOT EXISTS idx_registrations_student ON registrations(student_id)",
    "CREATE INDEX IF NOT EXISTS idx_waitlist_activity ON waitlist(activity_id)",
    "CREATE INDEX IF NOT EXISTS idx_activities_status ON activities(status)",
];

pub async fn apply_schema(pool: &SqlitePool) -> sqlx::Result<()> {
    sqlx::query(CREATE_ACTIVITIES).execute(pool).await?;
    sqlx::query(CREATE_REGISTRATIONS).execute(pool).await?;
    sqlx::query(CREATE_WAITLIST).execute(pool).await?;
    for stmt in INDEXES {
        sqlx::query(stmt).execute(pool).await?;
    }
    Ok(())
}
