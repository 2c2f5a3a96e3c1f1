mod common;

use chrono::{Duration, Utc};

use campushub::services::activity_service;
use campushub::services::checkin_service::{self, CheckInError};
use campushub::services::registration_service::RegistrationLedger;

use common::{approved_activity, approved_activity_at, test_pool};

/// Approved activity that started an hour ago.
async fn started_activity(pool: &sqlx::SqlitePool, title: &str, capacity: i64) -> i64 {
    let start = Utc::now() - Duration::hours(1);
    let end = start + Duration::hours(3);
    approved_activity_at(pool, title, capacity, start, end).await
}

#[tokio::test]
async fn check_in_requires_a_registration() {
    let pool = test_pool().await;
    let activity = started_activity(&pool, "Lecture", 10).await;

    let err = checkin_service::check_in(&pool, activity, "ghost", "")
        .await
        .unwrap_err();
    assert!(matches!(err, CheckInError::NotRegistered { .. }));
}

#[tokio::test]
async fn check_in_before_start_fails_even_with_the_right_code() {
    let pool = test_pool().await;
    let ledger = RegistrationLedger::new(pool.clone());
    let activity = approved_activity(&pool, "Tomorrow", 10).await;
    activity_service::set_checkin_code(&pool, activity, Some("1234"))
        .await
        .unwrap();
    ledger.register(activity, "a", "Student A").await.unwrap();

    let err = checkin_service::check_in(&pool, activity, "a", "1234")
        .await
        .unwrap_err();
    assert!(matches!(err, CheckInError::NotYetStarted { .. }));
}

#[tokio::test]
async fn second_check_in_always_fails() {
    let pool = test_pool().await;
    let ledger = RegistrationLedger::new(pool.clone());
    let activity = started_activity(&pool, "Workshop", 10).await;
    ledger.register(activity, "a", "Student A").await.unwrap();

    checkin_service::check_in(&pool, activity, "a", "").await.unwrap();
    let err = checkin_service::check_in(&pool, activity, "a", "")
        .await
        .unwrap_err();
    assert!(matches!(err, CheckInError::AlreadyCheckedIn { .. }));
}

#[tokio::test]
async fn code_validation_only_applies_to_presented_codes() {
    let pool = test_pool().await;
    let ledger = RegistrationLedger::new(pool.clone());
    let activity = started_activity(&pool, "Seminar", 10).await;
    activity_service::set_checkin_code(&pool, activity, Some("secret"))
        .await
        .unwrap();

    ledger.register(activity, "a", "Student A").await.unwrap();
    ledger.register(activity, "b", "Student B").await.unwrap();
    ledger.register(activity, "c", "Student C").await.unwrap();

    let err = checkin_service::check_in(&pool, activity, "a", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, CheckInError::CodeMismatch(_)));

    checkin_service::check_in(&pool, activity, "a", "secret").await.unwrap();
    // Empty presented code is the organizer-initiated path: no validation.
    checkin_service::check_in(&pool, activity, "b", "").await.unwrap();

    let list = checkin_service::check_in_list(&pool, activity).await.unwrap();
    let ids: Vec<_> = list.iter().map(|row| row.student_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[tokio::test]
async fn presenting_a_code_without_one_configured_fails() {
    let pool = test_pool().await;
    let ledger = RegistrationLedger::new(pool.clone());
    let activity = started_activity(&pool, "No code", 10).await;
    ledger.register(activity, "a", "Student A").await.unwrap();

    let err = checkin_service::check_in(&pool, activity, "a", "0000")
        .await
        .unwrap_err();
    assert!(matches!(err, CheckInError::NoCodeConfigured(_)));

    // The organizer path still works.
    checkin_service::check_in(&pool, activity, "a", "").await.unwrap();
}

#[tokio::test]
async fn statistics_reflect_attendance() {
    let pool = test_pool().await;
    let ledger = RegistrationLedger::new(pool.clone());
    let activity = started_activity(&pool, "Big event", 20).await;

    for i in 0..10 {
        ledger
            .register(activity, &format!("s{i}"), &format!("Student {i}"))
            .await
            .unwrap();
    }
    for i in 0..4 {
        checkin_service::check_in(&pool, activity, &format!("s{i}"), "")
            .await
            .unwrap();
    }

    let stats = checkin_service::check_in_statistics(&pool, activity)
        .await
        .unwrap();
    assert_eq!(stats.registered, 10);
    assert_eq!(stats.checked_in, 4);
    assert_eq!(stats.rate, 40.0);
    assert_eq!(stats.not_checked_in, 6);
}

#[tokio::test]
async fn clearing_the_code_disables_self_check_in() {
    let pool = test_pool().await;
    let ledger = RegistrationLedger::new(pool.clone());
    let activity = started_activity(&pool, "Toggled", 10).await;
    activity_service::set_checkin_code(&pool, activity, Some("abc"))
        .await
        .unwrap();
    ledger.register(activity, "a", "Student A").await.unwrap();

    activity_service::set_checkin_code(&pool, activity, None)
        .await
        .unwrap();
    let err = checkin_service::check_in(&pool, activity, "a", "abc")
        .await
        .unwrap_err();
    assert!(matches!(err, CheckInError::NoCodeConfigured(_)));
}
