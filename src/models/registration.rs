use chrono::{DateTime, Utc};
use serde::Serialize;

/// Status of a registration row. Cancelled rows are deleted rather than
/// archived, so Cancelled never appears in storage; the code is kept so the
/// persisted integers stay compatible with exports from the legacy system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    Registered,
    Cancelled,
    Waitlisted,
    Confirmed,
}

impl RegistrationStatus {
    pub fn code(self) -> i64 {
        match self {
            RegistrationStatus::Registered => 0,
            RegistrationStatus::Cancelled => 1,
            RegistrationStatus::Waitlisted => 2,
            RegistrationStatus::Confirmed => 3,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(RegistrationStatus::Registered),
            1 => Some(RegistrationStatus::Cancelled),
            2 => Some(RegistrationStatus::Waitlisted),
            3 => Some(RegistrationStatus::Confirmed),
            _ => None,
        }
    }
}

impl sqlx::Type<sqlx::Sqlite> for RegistrationStatus {
    fn type_info() -> sqlx::sqlite::SqliteTypeInfo {
        <i64 as sqlx::Type<sqlx::Sqlite>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Sqlite> for RegistrationStatus {
    fn decode(value: sqlx::sqlite::SqliteValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let code = <i64 as sqlx::Decode<sqlx::Sqlite>>::decode(value)?;
        Self::from_code(code)
            .ok_or_else(|| format!("unknown registration status code {code}").into())
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Sqlite> for RegistrationStatus {
    fn encode_by_ref(
        &self,
        buf: &mut Vec<sqlx::sqlite::SqliteArgumentValue<'q>>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<'q, sqlx::Sqlite>>::encode_by_ref(&self.code(), buf)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RegistrationRow {
    pub id: i64,
    pub activity_id: i64,
    pub student_id: String,
    pub student_name: String,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
    pub checkin_time: Option<DateTime<Utc>>,
}

/// A student's registration joined with the activity it belongs to, for the
/// "my registrations" listing.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StudentRegistrationRow {
    pub activity_id: i64,
    pub title: String,
    pub location: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: RegistrationStatus,
    pub registered_at: DateTime<Utc>,
    pub checkin_time: Option<DateTime<Utc>>,
}

/// One checked-in registrant, ordered by check-in time in listings.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CheckInRow {
    pub student_id: String,
    pub student_name: String,
    pub checkin_time: DateTime<Utc>,
}
