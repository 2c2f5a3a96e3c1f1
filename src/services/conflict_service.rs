use sqlx::SqlitePool;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::database::registration_repo;
use crate::models::{ConflictingActivity, TimeWindow};

/// Find every Approved activity the student already holds a seat in whose
/// window overlaps the proposal. Half-open semantics: an activity ending
/// exactly when the proposal starts is not a conflict. Pure read; the output
/// order follows registration order, so it is stable for a fixed input.
pub async fn find_conflicts(
    pool: &SqlitePool,
    student_id: &str,
    window: TimeWindow,
    exclude_activity_id: Option<i64>,
) -> sqlx::Result<Vec<ConflictingActivity>> {
    let candidates = registration_repo::approved_windows_for_student(pool, student_id).await?;
    Ok(candidates
        .into_iter()
        .filter(|c| Some(c.activity_id) != exclude_activity_id)
        .filter(|c| {
            TimeWindow {
                start: c.start_time,
                end: c.end_time,
            }
            .overlaps(&window)
        })
        .collect())
}

/// Exactly one report comes out of each probe, tagged with the token the
/// probe was started with so late arrivals can be matched to the request
/// they belong to and discarded when stale.
#[derive(Debug)]
pub struct ProbeReport {
    pub token: Uuid,
    pub activity_id: i64,
    pub conflicts: Vec<ConflictingActivity>,
    pub has_conflict: bool,
}

/// A background conflict scan.
///
/// `start` launches the scan on its own task and returns immediately; the
/// caller collects the result with [`ConflictProbe::report`]. A probe is
/// single-use: a new request needs a fresh `start`. There is no mid-scan
/// cancellation; a caller that no longer cares simply drops the probe and
/// the late report goes nowhere.
pub struct ConflictProbe {
    token: Uuid,
    rx: oneshot::Receiver<ProbeReport>,
}

impl ConflictProbe {
    pub fn start(
        pool: SqlitePool,
        student_id: String,
        activity_id: i64,
        window: TimeWindow,
    ) -> Self {
        let token = Uuid::new_v4();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            // Invalid input completes immediately without touching storage.
            let report = if student_id.is_empty() || activity_id <= 0 {
                ProbeReport {
                    token,
                    activity_id,
                    conflicts: Vec::new(),
                    has_conflict: false,
                }
            } else {
                match find_conflicts(&pool, &student_id, window, Some(activity_id)).await {
                    Ok(conflicts) => {
                        let has_conflict = !conflicts.is_empty();
                        ProbeReport {
                            token,
                            activity_id,
                            conflicts,
                            has_conflict,
                        }
                    }
                    Err(err) => {
                        tracing::warn!(activity_id, error = %err, "background conflict scan failed");
                        ProbeReport {
                            token,
                            activity_id,
                            conflicts: Vec::new(),
                            has_conflict: false,
                        }
                    }
                }
            };
            // The receiver may already be gone; a discarded report is fine.
            let _ = tx.send(report);
        });

        Self { token, rx }
    }

    pub fn token(&self) -> Uuid {
        self.token
    }

    /// Wait for the single completion report. Consumes the probe.
    pub async fn report(self) -> ProbeReport {
        let token = self.token;
        self.rx.await.unwrap_or_else(|_| ProbeReport {
            token,
            activity_id: 0,
            conflicts: Vec::new(),
            has_conflict: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::activity_repo::{self, NewActivity};
    use crate::database::schema;
    use crate::services::registration_service::RegistrationLedger;
    use chrono::{DateTime, TimeZone, Utc};
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

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 20, hour, 0, 0).unwrap()
    }

    async fn approved_activity(pool: &SqlitePool, title: &str, start: u32, end: u32) -> i64 {
        let id = activity_repo::insert_activity(
            pool,
            NewActivity {
                title,
                description: None,
                category: None,
                organizer: "org",
                location: None,
                start_time: at(start),
                end_time: at(end),
                max_participants: 30,
                checkin_code: None,
            },
        )
        .await
        .unwrap();
        activity_repo::update_status(
            pool,
            id,
            crate::models::ActivityStatus::Approved,
            "admin",
            Utc::now(),
        )
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn back_to_back_is_not_a_conflict_but_overlap_is() {
        let pool = memory_pool().await;
        let ledger = RegistrationLedger::new(pool.clone());
        let morning = approved_activity(&pool, "Morning", 10, 11).await;
        ledger.register(morning, "s1", "Student One").await.unwrap();

        let window = TimeWindow::new(at(11), at(12)).unwrap();
        let conflicts = find_conflicts(&pool, "s1", window, None).await.unwrap();
        assert!(conflicts.is_empty());

        let window = TimeWindow {
            start: Utc.with_ymd_and_hms(2026, 5, 20, 10, 30, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2026, 5, 20, 11, 30, 0).unwrap(),
        };
        let conflicts = find_conflicts(&pool, "s1", window, None).await.unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].activity_id, morning);
    }

    #[tokio::test]
    async fn only_approved_activities_contribute_conflicts() {
        let pool = memory_pool().await;
        let ledger = RegistrationLedger::new(pool.clone());
        let approved = approved_activity(&pool, "Approved", 9, 12).await;
        ledger.register(approved, "s1", "Student One").await.unwrap();
        // Mark it Finished afterwards: the stale registration must stop
        // counting as a conflict source.
        activity_repo::update_status(
            &pool,
            approved,
            crate::models::ActivityStatus::Finished,
            "admin",
            Utc::now(),
        )
        .await
        .unwrap();

        let window = TimeWindow::new(at(10), at(11)).unwrap();
        let conflicts = find_conflicts(&pool, "s1", window, None).await.unwrap();
        assert!(conflicts.is_empty());
    }

    #[tokio::test]
    async fn exclusion_removes_the_named_activity_from_the_scan() {
        let pool = memory_pool().await;
        let ledger = RegistrationLedger::new(pool.clone());
        let a = approved_activity(&pool, "A", 10, 12).await;
        let b = approved_activity(&pool, "B", 11, 13).await;
        ledger.register(a, "s1", "Student One").await.unwrap();
        ledger.register(b, "s1", "Student One").await.unwrap();

        let window = TimeWindow::new(at(10), at(13)).unwrap();
        let conflicts = find_conflicts(&pool, "s1", window, Some(a)).await.unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].activity_id, b);
    }

    #[tokio::test]
    async fn probe_reports_conflicts_with_its_own_token() {
        let pool = memory_pool().await;
        let ledger = RegistrationLedger::new(pool.clone());
        let held = approved_activity(&pool, "Held", 10, 12).await;
        let proposed = approved_activity(&pool, "Proposed", 11, 13).await;
        ledger.register(held, "s1", "Student One").await.unwrap();

        let window = TimeWindow::new(at(11), at(13)).unwrap();
        let probe = ConflictProbe::start(pool.clone(), "s1".to_string(), proposed, window);
        let token = probe.token();
        let report = probe.report().await;

        assert_eq!(report.token, token);
        assert_eq!(report.activity_id, proposed);
        assert!(report.has_conflict);
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].activity_id, held);
    }

    #[tokio::test]
    async fn probe_short_circuits_on_invalid_input() {
        let pool = memory_pool().await;
        let window = TimeWindow::new(at(10), at(11)).unwrap();

        let report = ConflictProbe::start(pool.clone(), String::new(), 7, window)
            .report()
            .await;
        assert!(!report.has_conflict);
        assert!(report.conflicts.is_empty());

        let report = ConflictProbe::start(pool.clone(), "s1".to_string(), 0, window)
            .report()
            .await;
        assert!(!report.has_conflict);
    }

    #[tokio::test]
    async fn stale_probe_reports_are_told_apart_by_token() {
        let pool = memory_pool().await;
        let ledger = RegistrationLedger::new(pool.clone());
        let held = approved_activity(&pool, "Held", 10, 12).await;
        let proposed = approved_activity(&pool, "Proposed", 11, 13).await;
        ledger.register(held, "s1", "Student One").await.unwrap();

        let window = TimeWindow::new(at(11), at(13)).unwrap();
        let stale = ConflictProbe::start(pool.clone(), "s1".to_string(), proposed, window);
        let fresh = ConflictProbe::start(pool.clone(), "s1".to_string(), proposed, window);
        let current_token = fresh.token();

        // Caller policy: only the report matching the in-flight request's
        // token is acted on.
        let stale_report = stale.report().await;
        let fresh_report = fresh.report().await;
        assert_ne!(stale_report.token, fresh_report.token);
        assert_eq!(fresh_report.token, current_token);
    }
}
