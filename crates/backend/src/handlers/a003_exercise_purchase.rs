use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::AppState;
use crate::domain::a003_exercise_purchase::service::{self, AccessStatus};

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    pub user_id: String,
    pub exercise_id: String,
}

/// GET /api/purchase/status — действует ли купленный доступ к упражнению
pub async fn access_status(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AccessQuery>,
) -> Result<Json<AccessStatus>, StatusCode> {
    match service::access_status(&state.db, &query.user_id, &query.exercise_id).await {
        Ok(status) => Ok(Json(status)),
        Err(e) => {
            tracing::error!("Failed to check exercise access: {:#}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
