use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use super::{AppState, ErrorResponse};
use crate::domain::a002_enrollment::service::{self, ProgressError, WeekSummary};
use contracts::domain::a002_enrollment::aggregate::{Enrollment, EnrollmentDto};

pub(crate) fn progress_error_response(e: ProgressError) -> (StatusCode, Json<ErrorResponse>) {
    match e {
        ProgressError::DayLocked { day, unlocked } => (
            StatusCode::LOCKED,
            Json(ErrorResponse::new(format!(
                "День {} ещё закрыт (открыто дней: {})",
                day, unlocked
            ))),
        ),
        ProgressError::NotFound => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Запись на марафон не найдена")),
        ),
        ProgressError::NotActive => (
            StatusCode::CONFLICT,
            Json(ErrorResponse::new("Запись на марафон не активна")),
        ),
        ProgressError::Internal(e) => {
            tracing::error!("Progress operation failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Внутренняя ошибка")),
            )
        }
    }
}

/// POST /api/enrollment — бесплатная предварительная регистрация
pub async fn preregister(
    State(state): State<Arc<AppState>>,
    Json(dto): Json<EnrollmentDto>,
) -> Result<Json<Enrollment>, StatusCode> {
    match service::preregister(&state.db, dto).await {
        Ok(enrollment) => Ok(Json(enrollment)),
        Err(e) => {
            tracing::error!("Failed to preregister enrollment: {:#}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UnlockedDaysDto {
    #[serde(rename = "unlockedDays")]
    pub unlocked_days: i32,
}

/// GET /api/enrollment/:id/unlocked-days
pub async fn unlocked_days(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UnlockedDaysDto>, (StatusCode, Json<ErrorResponse>)> {
    let uuid = Uuid::parse_str(&id).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Некорректный ID")),
        )
    })?;
    match service::unlocked_days(&state.db, uuid).await {
        Ok(unlocked) => Ok(Json(UnlockedDaysDto {
            unlocked_days: unlocked,
        })),
        Err(e) => Err(progress_error_response(e)),
    }
}

#[derive(Debug, Deserialize)]
pub struct CompleteDayRequest {
    pub day: i32,
}

/// POST /api/enrollment/:id/complete-day
pub async fn complete_day(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(request): Json<CompleteDayRequest>,
) -> Result<StatusCode, (StatusCode, Json<ErrorResponse>)> {
    let uuid = Uuid::parse_str(&id).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Некорректный ID")),
        )
    })?;
    match service::mark_day_complete(&state.db, uuid, request.day).await {
        Ok(()) => Ok(StatusCode::OK),
        Err(e) => Err(progress_error_response(e)),
    }
}

/// GET /api/enrollment/:id/weeks — производные признаки закрытых недель
pub async fn weeks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<WeekSummary>>, (StatusCode, Json<ErrorResponse>)> {
    let uuid = Uuid::parse_str(&id).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new("Некорректный ID")),
        )
    })?;
    match service::week_summaries(&state.db, uuid).await {
        Ok(summaries) => Ok(Json(summaries)),
        Err(e) => Err(progress_error_response(e)),
    }
}
