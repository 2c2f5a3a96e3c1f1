use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::database::{activity_repo, registration_repo, waitlist_repo};
use crate::database::registration_repo::NewRegistration;
use crate::models::{ActivityStatus, RegistrationRow, WaitlistRow};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("activity {0} not found")]
    ActivityNotFound(i64),
    #[error("activity {0} is not approved for registration")]
    ActivityNotApproved(i64),
    #[error("student {student_id} is already registered for activity {activity_id}")]
    AlreadyRegistered { activity_id: i64, student_id: String },
    #[error("student {student_id} holds no registration for activity {activity_id}")]
    NotRegistered { activity_id: i64, student_id: String },
    #[error("student {student_id} is not on the waitlist for activity {activity_id}")]
    NotWaitlisted { activity_id: i64, student_id: String },
    #[error(transparent)]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// Seat taken; the activity's confirmed count went up by one.
    Confirmed,
    /// Activity full; the student joined (or was already on) the waitlist.
    Waitlisted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Promotion {
    Promoted {
        student_id: String,
        student_name: String,
    },
    /// Nobody waiting for this activity.
    NoWaitlist,
    /// Every seat is taken; nothing to promote into.
    NoSeat,
}

/// What a successful cancellation did. The seat release always stands; the
/// promotion that follows it can fail independently and is reported here
/// rather than rolling the cancellation back.
#[derive(Debug)]
pub struct CancelReceipt {
    pub promotion: Result<Promotion, LedgerError>,
}

/// The registration state machine.
///
/// Every mutation of an activity's confirmed count or of a (activity,
/// student) pair's membership runs under that activity's async lock, so the
/// capacity invariant is enforced per activity and cross-activity operations
/// never contend. Conflict scans read without taking any lock; their output
/// is advisory.
pub struct RegistrationLedger {
    pool: SqlitePool,
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl RegistrationLedger {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn activity_lock(&self, activity_id: i64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        // A strong count of 1 means only the registry holds the lock; idle
        // entries are dropped here so the map stays bounded by the set of
        // activities currently in use.
        locks.retain(|id, lock| *id == activity_id || Arc::strong_count(lock) > 1);
        locks.entry(activity_id).or_default().clone()
    }

    /// Take a seat in an activity, or queue for one when it is full.
    ///
    /// Conflict detection is deliberately not performed here: the caller
    /// warns the student beforehand and lets them proceed anyway.
    pub async fn register(
        &self,
        activity_id: i64,
        student_id: &str,
        student_name: &str,
    ) -> Result<RegistrationOutcome, LedgerError> {
        let lock = self.activity_lock(activity_id).await;
        let _guard = lock.lock().await;

        let activity = activity_repo::get_activity(&self.pool, activity_id)
            .await?
            .ok_or(LedgerError::ActivityNotFound(activity_id))?;
        if activity.status != ActivityStatus::Approved {
            return Err(LedgerError::ActivityNotApproved(activity_id));
        }
        if registration_repo::is_registered(&self.pool, activity_id, student_id).await? {
            return Err(LedgerError::AlreadyRegistered {
                activity_id,
                student_id: student_id.to_string(),
            });
        }

        if activity.is_full() {
            waitlist_repo::enqueue(&self.pool, activity_id, student_id, student_name, Utc::now())
                .await?;
            return Ok(RegistrationOutcome::Waitlisted);
        }

        let mut tx = self.pool.begin().await?;
        // A failed promotion can leave the student queued from an earlier
        // round; clear the slot in the same transaction so the pair never
        // holds a seat and a waitlist entry at once.
        waitlist_repo::remove(&mut *tx, activity_id, student_id).await?;
        registration_repo::insert_registration(
            &mut tx,
            NewRegistration {
                activity_id,
                student_id,
                student_name,
                registered_at: Utc::now(),
            },
        )
        .await?;
        activity_repo::increment_participants(&mut tx, activity_id).await?;
        tx.commit().await?;

        Ok(RegistrationOutcome::Confirmed)
    }

    /// Release a confirmed seat, then promote the head of the waitlist into
    /// it. Both steps happen under one lock hold so two concurrent
    /// cancellations can neither promote the same student twice nor skip a
    /// promotion.
    pub async fn cancel(
        &self,
        activity_id: i64,
        student_id: &str,
    ) -> Result<CancelReceipt, LedgerError> {
        let lock = self.activity_lock(activity_id).await;
        let _guard = lock.lock().await;

        let mut tx = self.pool.begin().await?;
        let removed =
            registration_repo::delete_registration(&mut tx, activity_id, student_id).await?;
        if removed == 0 {
            return Err(LedgerError::NotRegistered {
                activity_id,
                student_id: student_id.to_string(),
            });
        }
        activity_repo::decrement_participants(&mut tx, activity_id).await?;
        tx.commit().await?;

        // The seat is freed even if promotion fails; the failure is reported
        // in the receipt instead of undoing the cancellation.
        let promotion = self.promote_locked(activity_id).await;
        if let Err(err) = &promotion {
            tracing::warn!(activity_id, error = %err, "waitlist promotion failed after cancellation");
        }
        Ok(CancelReceipt { promotion })
    }

    /// Leave the waitlist without ever having held a seat. Does not touch
    /// the confirmed count and never triggers a promotion.
    pub async fn withdraw(&self, activity_id: i64, student_id: &str) -> Result<(), LedgerError> {
        let lock = self.activity_lock(activity_id).await;
        let _guard = lock.lock().await;

        let removed = waitlist_repo::remove(&self.pool, activity_id, student_id).await?;
        if removed == 0 {
            return Err(LedgerError::NotWaitlisted {
                activity_id,
                student_id: student_id.to_string(),
            });
        }
        Ok(())
    }

    /// Promote the earliest waitlist entry into a registration.
    ///
    /// In the production flow this only ever runs as the tail of `cancel`;
    /// it is public so the promotion step can be exercised on its own.
    pub async fn promote(&self, activity_id: i64) -> Result<Promotion, LedgerError> {
        let lock = self.activity_lock(activity_id).await;
        let _guard = lock.lock().await;
        self.promote_locked(activity_id).await
    }

    // Caller must hold the activity's lock. Promotion does not re-run
    // conflict detection for the promoted student; that is deliberate
    // policy, not an oversight.
    async fn promote_locked(&self, activity_id: i64) -> Result<Promotion, LedgerError> {
        let activity = activity_repo::get_activity(&self.pool, activity_id)
            .await?
            .ok_or(LedgerError::ActivityNotFound(activity_id))?;
        if activity.is_full() {
            return Ok(Promotion::NoSeat);
        }

        let mut tx = self.pool.begin().await?;
        let Some(entry) = waitlist_repo::first_in_line(&mut tx, activity_id).await? else {
            return Ok(Promotion::NoWaitlist);
        };
        waitlist_repo::remove(&mut *tx, activity_id, &entry.student_id).await?;
        registration_repo::insert_registration(
            &mut tx,
            NewRegistration {
                activity_id,
                student_id: &entry.student_id,
                student_name: &entry.student_name,
                registered_at: Utc::now(),
            },
        )
        .await?;
        activity_repo::increment_participants(&mut tx, activity_id).await?;
        tx.commit().await?;

        Ok(Promotion::Promoted {
            student_id: entry.student_id,
            student_name: entry.student_name,
        })
    }

    pub async fn is_registered(
        &self,
        activity_id: i64,
        student_id: &str,
    ) -> Result<bool, LedgerError> {
        Ok(registration_repo::is_registered(&self.pool, activity_id, student_id).await?)
    }

    pub async fn is_waitlisted(
        &self,
        activity_id: i64,
        student_id: &str,
    ) -> Result<bool, LedgerError> {
        Ok(waitlist_repo::is_waitlisted(&self.pool, activity_id, student_id).await?)
    }

    pub async fn registrations(
        &self,
        activity_id: i64,
    ) -> Result<Vec<RegistrationRow>, LedgerError> {
        Ok(registration_repo::list_for_activity(&self.pool, activity_id).await?)
    }

    pub async fn waitlist(&self, activity_id: i64) -> Result<Vec<WaitlistRow>, LedgerError> {
        Ok(waitlist_repo::list_for_activity(&self.pool, activity_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn idle_activity_locks_are_evicted() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let ledger = RegistrationLedger::new(pool);

        let held = ledger.activity_lock(1).await;
        ledger.activity_lock(2).await;

        // 1 is still in use, 2 went idle the moment its Arc was dropped.
        ledger.activity_lock(3).await;
        let locks = ledger.locks.lock().await;
        assert!(locks.contains_key(&1));
        assert!(!locks.contains_key(&2));
        assert!(locks.contains_key(&3));
        drop(locks);
        drop(held);
    }
}
