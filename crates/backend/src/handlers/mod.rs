use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::sync::Arc;

use crate::usecases::u501_checkout::CheckoutService;
use crate::usecases::u502_reconciliation::ReconciliationService;

pub mod a001_payment_order;
pub mod a002_enrollment;
pub mod a003_exercise_purchase;
pub mod a004_day_progress;

/// Сервисы процесса: собираются один раз в main и передаются хендлерам
/// через axum State, без глобальных синглтонов
pub struct AppState {
    pub db: DatabaseConnection,
    pub checkout: CheckoutService,
    pub reconciliation: Arc<ReconciliationService>,
}

/// Тело ошибки для внешнего слоя (без кодов шлюза)
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
