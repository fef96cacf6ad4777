use contracts::domain::a001_payment_order::aggregate::{OrderStatusDto, PaymentOrder};

/// Текущее состояние заказа для внешнего слоя
///
/// Коды ошибок шлюза наружу не отдаются, только канонический статус.
pub fn to_status_dto(order: &PaymentOrder) -> OrderStatusDto {
    OrderStatusDto {
        order_number: order.base.code.clone(),
        status: order.status,
        amount: order.amount,
        description: order.base.description.clone(),
    }
}
