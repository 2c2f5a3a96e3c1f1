use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::services::checkin_service::{self, CheckInError};
use crate::web::AppState;

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn checkin_error_response(err: CheckInError) -> (StatusCode, Json<Value>) {
    let status = match &err {
        CheckInError::NotRegistered { .. } | CheckInError::ActivityNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        CheckInError::AlreadyCheckedIn { .. }
        | CheckInError::NotYetStarted { .. }
        | CheckInError::NoCodeConfigured(_) => StatusCode::CONFLICT,
        CheckInError::CodeMismatch(_) => StatusCode::FORBIDDEN,
        CheckInError::Db(e) => {
            warn!("check-in operation failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(json!({ "error": err.to_string() })))
}

#[derive(Debug, Deserialize)]
pub struct CheckInBody {
    pub student_id: String,
    /// Absent or empty for organizer/admin-initiated check-in; students
    /// present the activity's code.
    pub code: Option<String>,
}

pub async fn check_in_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<i64>,
    Json(body): Json<CheckInBody>,
) -> ApiResult {
    let code = body.code.as_deref().unwrap_or("");
    let checked_in_at =
        checkin_service::check_in(&state.pool, activity_id, &body.student_id, code)
            .await
            .map_err(checkin_error_response)?;
    Ok(Json(json!({ "checked_in_at": checked_in_at })))
}

pub async fn list_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<i64>,
) -> ApiResult {
    let list = checkin_service::check_in_list(&state.pool, activity_id)
        .await
        .map_err(checkin_error_response)?;
    Ok(Json(json!({ "checked_in": list })))
}

pub async fn statistics_handler(
    State(state): State<AppState>,
    Path(activity_id): Path<i64>,
) -> ApiResult {
    let stats = checkin_service::check_in_statistics(&state.pool, activity_id)
        .await
        .map_err(checkin_error_response)?;
    Ok(Json(json!({ "statistics": stats })))
}
