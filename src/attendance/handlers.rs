use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::dto::{
    format_time, AttendanceCountResponse, AttendanceListResponse, AttendanceView, MarkedResponse,
};
use crate::{
    auth::extractors::AuthUser,
    error::{AppError, Result},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/mark_attendance", post(mark_attendance))
        .route("/attendance/count", get(count_attendance))
        .route("/attendance/:email", get(list_for_user))
}

/// Marks attendance for the bearer of the token.
#[instrument(skip(state))]
pub async fn mark_attendance(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
) -> Result<Json<MarkedResponse>> {
    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or(AppError::UserNotFound)?;

    let rec = state
        .attendance
        .insert(&user.email, &user.name, OffsetDateTime::now_utc())
        .await?;

    info!(%email, "attendance marked");
    Ok(Json(MarkedResponse {
        message: format!("Attendance marked for {}", user.name),
        time: format_time(rec.marked_at)?,
    }))
}

#[instrument(skip(state))]
pub async fn list_for_user(
    State(state): State<AppState>,
    Path(email): Path<String>,
) -> Result<Json<AttendanceListResponse>> {
    let records = state.attendance.list_by_email(&email).await?;
    if records.is_empty() {
        return Err(AppError::NotFound(format!(
            "No attendance found for {email}"
        )));
    }
    let attendance = records
        .into_iter()
        .map(AttendanceView::try_from)
        .collect::<Result<Vec<_>>>()?;
    Ok(Json(AttendanceListResponse {
        total_records: attendance.len(),
        attendance,
    }))
}

#[instrument(skip(state))]
pub async fn count_attendance(
    State(state): State<AppState>,
) -> Result<Json<AttendanceCountResponse>> {
    Ok(Json(AttendanceCountResponse {
        total_attendance_records: state.attendance.count_all().await?,
    }))
}
