use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::{AppState, ErrorResponse};
use crate::domain::a004_day_progress::service;
use contracts::domain::a004_day_progress::aggregate::{DayProgress, DayProgressDto};

/// POST /api/progress/exercise — отметить упражнение выполненным
pub async fn mark_exercise(
    State(state): State<Arc<AppState>>,
    Json(dto): Json<DayProgressDto>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    match service::mark_exercise_complete(&state.db, dto).await {
        Ok(()) => Ok(StatusCode::OK),
        Err(e) => Err(super::a002_enrollment::progress_error_response(e)),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: String,
    pub marathon_id: String,
    pub day: i32,
}

/// GET /api/progress/day — отметки пользователя за день
pub async fn list_for_day(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<DayProgress>>, StatusCode> {
    match service::list_for_day(&state.db, &query.user_id, &query.marathon_id, query.day).await {
        Ok(marks) => Ok(Json(marks)),
        Err(e) => {
            tracing::error!("Failed to list day progress: {:#}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
