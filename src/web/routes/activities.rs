use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::database::activity_repo::ActivityFilter;
use crate::models::ActivityStatus;
use crate::services::activity_service::{self, ActivityDraft, ActivityError};
use crate::web::AppState;

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn activity_error_response(err: ActivityError) -> (StatusCode, Json<Value>) {
    let status = match &err {
        ActivityError::EmptyTitle
        | ActivityError::InvalidTimeWindow
        | ActivityError::InvalidCapacity => StatusCode::BAD_REQUEST,
        ActivityError::NotFound(_) => StatusCode::NOT_FOUND,
        ActivityError::NotPending { .. } => StatusCode::CONFLICT,
        ActivityError::Db(e) => {
            warn!("activity operation failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({ "error": err.to_string() })))
}

pub async fn create_handler(
    State(state): State<AppState>,
    Json(draft): Json<ActivityDraft>,
) -> ApiResult {
    let id = activity_service::create_activity(&state.pool, &draft)
        .await
        .map_err(activity_error_response)?;
    Ok(Json(json!({ "id": id })))
}

#[derive(Debug, Deserialize, Default)]
pub struct ActivityListQuery {
    pub status: Option<String>,
    pub organizer: Option<String>,
    pub search: Option<String>,
}

fn parse_status(value: &str) -> Option<ActivityStatus> {
    match value {
        "pending" => Some(ActivityStatus::Pending),
        "approved" => Some(ActivityStatus::Approved),
        "rejected" => Some(ActivityStatus::Rejected),
        "ongoing" => Some(ActivityStatus::Ongoing),
        "finished" => Some(ActivityStatus::Finished),
        _ => None,
    }
}

pub async fn list_handler(
    State(state): State<AppState>,
    Query(query): Query<ActivityListQuery>,
) -> ApiResult {
    let status = match query.status.as_deref() {
        Some(raw) => match parse_status(raw) {
            Some(s) => Some(s),
            None => {
                return Err((
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "error": format!("unknown status '{raw}'") })),
                ))
            }
        },
        None => None,
    };
    let filter = ActivityFilter {
        status,
        organizer: query.organizer,
        search: query.search,
    };
    let activities = activity_service::list_activities(&state.pool, &filter)
        .await
        .map_err(activity_error_response)?;
    Ok(Json(json!({ "activities": activities })))
}

pub async fn get_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<i64>,
) -> ApiResult {
    let activity = activity_service::get_activity(&state.pool, activity_id)
        .await
        .map_err(activity_error_response)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("activity {activity_id} not found") })),
            )
        })?;
    Ok(Json(json!({
        "activity": activity,
        "remaining_capacity": activity.remaining_capacity(),
    })))
}

pub async fn snapshot_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<i64>,
) -> ApiResult {
    let snapshot = activity_service::snapshot(&state.pool, activity_id)
        .await
        .map_err(activity_error_response)?
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("activity {activity_id} not found") })),
            )
        })?;
    Ok(Json(json!({ "snapshot": snapshot })))
}

#[derive(Debug, Deserialize)]
pub struct DecisionBody {
    pub decided_by: String,
}

pub async fn approve_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<i64>,
    Json(body): Json<DecisionBody>,
) -> ApiResult {
    activity_service::approve_activity(&state.pool, activity_id, &body.decided_by)
        .await
        .map_err(activity_error_response)?;
    Ok(Json(json!({ "status": "approved" })))
}

pub async fn reject_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<i64>,
    Json(body): Json<DecisionBody>,
) -> ApiResult {
    activity_service::reject_activity(&state.pool, activity_id, &body.decided_by)
        .await
        .map_err(activity_error_response)?;
    Ok(Json(json!({ "status": "rejected" })))
}

#[derive(Debug, Deserialize)]
pub struct CheckInCodeBody {
    pub code: Option<String>,
}

pub async fn set_checkin_code_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<i64>,
    Json(body): Json<CheckInCodeBody>,
) -> ApiResult {
    activity_service::set_checkin_code(&state.pool, activity_id, body.code.as_deref())
        .await
        .map_err(activity_error_response)?;
    Ok(Json(json!({ "status": "ok" })))
}

pub async fn overview_handler(State(state): State<AppState>) -> ApiResult {
    let overview = activity_service::activity_overview(&state.pool)
        .await
        .map_err(activity_error_response)?;
    Ok(Json(json!({ "activities": overview })))
}
