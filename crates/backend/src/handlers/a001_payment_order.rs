use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use super::{AppState, ErrorResponse};
use crate::usecases::u501_checkout::CheckoutError;
use crate::usecases::u502_reconciliation::{ReconcileError, RefundError};
use contracts::domain::a001_payment_order::aggregate::{
    CreateOrderDto, CreatedOrderDto, OrderStatusDto,
};

/// Сообщение пользователю при любом отказе оплаты: коды и тексты ошибок
/// шлюза наружу не отдаются
const PAYMENT_FAILED_MESSAGE: &str = "Платёж не прошёл, обратитесь в поддержку";

/// POST /api/order
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(dto): Json<CreateOrderDto>,
) -> Result<Json<CreatedOrderDto>, (StatusCode, Json<ErrorResponse>)> {
    match state.checkout.create_order(dto).await {
        Ok(created) => Ok(Json(created)),
        Err(CheckoutError::Registration(e)) => {
            tracing::error!("Order registration rejected: {}", e);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse::new(PAYMENT_FAILED_MESSAGE)),
            ))
        }
        Err(CheckoutError::Internal(e)) => {
            tracing::error!("Failed to create order: {:#}", e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(PAYMENT_FAILED_MESSAGE)),
            ))
        }
    }
}

/// GET /api/order/:order_number/status
///
/// Безопасен для повторов; каждый вызов — poll-попытка сверки
pub async fn get_status(
    State(state): State<Arc<AppState>>,
    Path(order_number): Path<String>,
) -> Result<Json<OrderStatusDto>, StatusCode> {
    match state.reconciliation.poll_order(&order_number).await {
        Ok(dto) => Ok(Json(dto)),
        Err(ReconcileError::NotFound) => Err(StatusCode::NOT_FOUND),
        Err(ReconcileError::Internal(e)) => {
            tracing::error!("Failed to poll order {}: {:#}", order_number, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// ID заказа на стороне шлюза
    #[serde(rename = "orderId")]
    pub order_id: String,
}

/// POST /api/payment/callback
///
/// Fire-and-forget вызов со стороны шлюза: подтверждается и для уже
/// терминального, и для неизвестного заказа
pub async fn callback(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CallbackQuery>,
) -> StatusCode {
    match state.reconciliation.handle_callback(&query.order_id).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::error!("Callback processing failed: {:#}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// POST /api/order/:order_number/refund
pub async fn refund(
    State(state): State<Arc<AppState>>,
    Path(order_number): Path<String>,
) -> Result<Json<OrderStatusDto>, (StatusCode, Json<ErrorResponse>)> {
    match state.reconciliation.refund_order(&order_number).await {
        Ok(dto) => Ok(Json(dto)),
        Err(RefundError::NotFound) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("Заказ не найден")),
        )),
        Err(RefundError::NotRefundable(status)) => Err((
            StatusCode::CONFLICT,
            Json(ErrorResponse::new(format!(
                "Возврат невозможен из статуса {}",
                status
            ))),
        )),
        Err(RefundError::Gateway(e)) => {
            tracing::error!("Gateway refused refund for {}: {}", order_number, e);
            Err((
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse::new(PAYMENT_FAILED_MESSAGE)),
            ))
        }
        Err(RefundError::Internal(e)) => {
            tracing::error!("Failed to refund order {}: {:#}", order_number, e);
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(PAYMENT_FAILED_MESSAGE)),
            ))
        }
    }
}
