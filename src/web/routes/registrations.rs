use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::services::conflict_service;
use crate::services::registration_service::{LedgerError, Promotion, RegistrationOutcome};
use crate::web::AppState;

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn ledger_error_response(err: LedgerError) -> (StatusCode, Json<Value>) {
    let status = match &err {
        LedgerError::ActivityNotFound(_)
        | LedgerError::NotRegistered { .. }
        | LedgerError::NotWaitlisted { .. } => StatusCode::NOT_FOUND,
        LedgerError::ActivityNotApproved(_) | LedgerError::AlreadyRegistered { .. } => {
            StatusCode::CONFLICT
        }
        LedgerError::Db(e) => {
            warn!("ledger operation failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({ "error": err.to_string() })))
}

fn promotion_json(promotion: &Result<Promotion, LedgerError>) -> Value {
    match promotion {
        Ok(Promotion::Promoted {
            student_id,
            student_name,
        }) => json!({
            "promoted": true,
            "student_id": student_id,
            "student_name": student_name,
        }),
        Ok(Promotion::NoWaitlist) => json!({ "promoted": false, "reason": "no_waitlist" }),
        Ok(Promotion::NoSeat) => json!({ "promoted": false, "reason": "no_seat" }),
        Err(err) => json!({ "promoted": false, "reason": "failed", "error": err.to_string() }),
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub student_id: String,
    pub student_name: String,
}

/// Register for an activity. Conflicts against the student's other confirmed
/// registrations are scanned first and returned alongside the outcome, but
/// they never block the registration; the warning is advisory.
pub async fn register_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<i64>,
    Json(body): Json<RegisterBody>,
) -> ApiResult {
    let activity = crate::services::activity_service::get_activity(&state.pool, activity_id)
        .await
        .map_err(|e| {
            warn!("activity lookup failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "lookup failed" })),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("activity {activity_id} not found") })),
            )
        })?;

    let conflicts = conflict_service::find_conflicts(
        &state.pool,
        &body.student_id,
        activity.window(),
        Some(activity_id),
    )
    .await
    .unwrap_or_else(|e| {
        warn!(activity_id, "conflict scan failed: {}", e);
        Vec::new()
    });

    let outcome = state
        .ledger
        .register(activity_id, &body.student_id, &body.student_name)
        .await
        .map_err(ledger_error_response)?;

    let outcome_label = match outcome {
        RegistrationOutcome::Confirmed => "confirmed",
        RegistrationOutcome::Waitlisted => "waitlisted",
    };
    Ok(Json(json!({
        "outcome": outcome_label,
        "conflicts": conflicts,
    })))
}

pub async fn cancel_handler(
    State(state): State<AppState>,
    Path((activity_id, student_id)): Path<(i64, String)>,
) -> ApiResult {
    let receipt = state
        .ledger
        .cancel(activity_id, &student_id)
        .await
        .map_err(ledger_error_response)?;
    Ok(Json(json!({
        "cancelled": true,
        "promotion": promotion_json(&receipt.promotion),
    })))
}

pub async fn withdraw_handler(
    State(state): State<AppState>,
    Path((activity_id, student_id)): Path<(i64, String)>,
) -> ApiResult {
    state
        .ledger
        .withdraw(activity_id, &student_id)
        .await
        .map_err(ledger_error_response)?;
    Ok(Json(json!({ "withdrawn": true })))
}

pub async fn promote_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<i64>,
) -> ApiResult {
    let promotion = state
        .ledger
        .promote(activity_id)
        .await
        .map_err(ledger_error_response)?;
    Ok(Json(json!({ "promotion": promotion_json(&Ok(promotion)) })))
}

pub async fn list_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<i64>,
) -> ApiResult {
    let registrations = state
        .ledger
        .registrations(activity_id)
        .await
        .map_err(ledger_error_response)?;
    Ok(Json(json!({ "registrations": registrations })))
}

pub async fn waitlist_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<i64>,
) -> ApiResult {
    let waitlist = state
        .ledger
        .waitlist(activity_id)
        .await
        .map_err(ledger_error_response)?;
    Ok(Json(json!({ "waitlist": waitlist })))
}

pub async fn student_registrations_handler(
    State(state): State<AppState>,
    Path(student_id): Path<String>,
) -> ApiResult {
    let registrations =
        crate::database::registration_repo::list_for_student(&state.pool, &student_id)
            .await
            .map_err(|e| {
                warn!("student registrations lookup failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "lookup failed" })),
                )
            })?;
    Ok(Json(json!({ "registrations": registrations })))
}

#[derive(Debug, Deserialize)]
pub struct ConflictQuery {
    pub student_id: String,
}

/// Advisory pre-registration conflict check against the activity's window.
pub async fn conflicts_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<i64>,
    Query(query): Query<ConflictQuery>,
) -> ApiResult {
    let activity = crate::services::activity_service::get_activity(&state.pool, activity_id)
        .await
        .map_err(|e| {
            warn!("activity lookup failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "lookup failed" })),
            )
        })?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("activity {activity_id} not found") })),
            )
        })?;

    let conflicts = conflict_service::find_conflicts(
        &state.pool,
        &query.student_id,
        activity.window(),
        Some(activity_id),
    )
    .await
    .map_err(|e| {
        warn!(activity_id, "conflict scan failed: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "conflict scan failed" })),
        )
    })?;

    Ok(Json(json!({
        "has_conflict": !conflicts.is_empty(),
        "conflicts": conflicts,
    })))
}
