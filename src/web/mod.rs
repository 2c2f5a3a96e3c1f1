pub mod routes;

use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;
use sqlx::SqlitePool;

use crate::services::registration_service::RegistrationLedger;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub ledger: Arc<RegistrationLedger>,
}

impl AppState {
    pub fn new(pool: SqlitePool) -> Self {
        let ledger = Arc::new(RegistrationLedger::new(pool.clone()));
        Self { pool, ledger }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/activities",
            get(routes::activities::list_handler).post(routes::activities::create_handler),
        )
        .route("/activities/overview", get(routes::activities::overview_handler))
        .route("/activities/:activity_id", get(routes::activities::get_handler))
        .route(
            "/activities/:activity_id/snapshot",
            get(routes::activities::snapshot_handler),
        )
        .route(
            "/activities/:activity_id/approve",
            post(routes::activities::approve_handler),
        )
        .route(
            "/activities/:activity_id/reject",
            post(routes::activities::reject_handler),
        )
        .route(
            "/activities/:activity_id/checkin-code",
            put(routes::activities::set_checkin_code_handler),
        )
        .route(
            "/activities/:activity_id/registrations",
            get(routes::registrations::list_handler).post(routes::registrations::register_handler),
        )
        .route(
            "/activities/:activity_id/registrations/:student_id",
            axum::routing::delete(routes::registrations::cancel_handler),
        )
        .route(
            "/activities/:activity_id/waitlist",
            get(routes::registrations::waitlist_handler),
        )
        .route(
            "/activities/:activity_id/waitlist/:student_id",
            axum::routing::delete(routes::registrations::withdraw_handler),
        )
        .route(
            "/activities/:activity_id/promote",
            post(routes::registrations::promote_handler),
        )
        .route(
            "/activities/:activity_id/conflicts",
            get(routes::registrations::conflicts_handler),
        )
        .route(
            "/students/:student_id/registrations",
            get(routes::registrations::student_registrations_handler),
        )
        .route(
            "/activities/:activity_id/checkin",
            get(routes::checkin::list_handler).post(routes::checkin::check_in_handler),
        )
        .route(
            "/activities/:activity_id/checkin/statistics",
            get(routes::checkin::statistics_handler),
        )
        .with_state(state)
}
