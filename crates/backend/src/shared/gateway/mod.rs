//! Адаптер банковского платёжного шлюза
//!
//! Переводит внутренние намерения (зарегистрировать заказ, узнать статус,
//! вернуть деньги) в REST-вызовы эквайринга. Без собственных ретраев —
//! повтор всегда на стороне вызывающего.

pub mod sberbank_api_client;

pub use sberbank_api_client::SberbankApiClient;

use async_trait::async_trait;
use contracts::domain::a001_payment_order::aggregate::OrderStatus;

/// Ошибка обращения к шлюзу
///
/// `Transport` — сеть/таймаут: статус заказа не меняется, вызов можно
/// повторить. `Rejected` — явный отказ шлюза с кодом ошибки.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway transport error: {0}")]
    Transport(String),

    #[error("gateway error {code}: {message}")]
    Rejected { code: i64, message: String },
}

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        GatewayError::Transport(e.to_string())
    }
}

/// Результат регистрации заказа в шлюзе
#[derive(Debug, Clone)]
pub struct RegisterResult {
    /// ID заказа на стороне шлюза
    pub gateway_order_id: String,
    /// URL платёжной страницы банка
    pub redirect_url: String,
}

/// Результат запроса статуса заказа
#[derive(Debug, Clone)]
pub struct StatusResult {
    /// Канонический статус по таблице соответствия
    pub status: OrderStatus,
    /// Исходный числовой код шлюза
    pub gateway_code: i64,
    /// Способ оплаты, если шлюз его сообщил
    pub payment_method: Option<String>,
    /// Сырой ответ шлюза (для журнала)
    pub raw: serde_json::Value,
}

/// Контракт платёжного шлюза
///
/// Все вызовы — синхронные HTTP-запросы с жёстким таймаутом.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Зарегистрировать заказ; возвращает ID шлюза и URL оплаты
    async fn register(
        &self,
        order_number: &str,
        amount: i64,
        description: &str,
    ) -> Result<RegisterResult, GatewayError>;

    /// Запросить текущий статус заказа в шлюзе
    async fn query_status(&self, gateway_order_id: &str) -> Result<StatusResult, GatewayError>;

    /// Вернуть средства по заказу
    async fn refund(&self, gateway_order_id: &str, amount: i64) -> Result<(), GatewayError>;
}

/// Таблица соответствия числовых кодов orderStatus каноническому статусу.
///
/// Неизвестные коды отображаются в `Pending`: неопознанный ответ шлюза
/// никогда не засчитывается ни как успех, ни как отказ.
pub fn map_order_status(code: i64) -> OrderStatus {
    match code {
        // Заказ зарегистрирован, но не оплачен
        0 => OrderStatus::Pending,
        // Предавторизация: сумма захолдирована
        1 => OrderStatus::Processing,
        // Полная авторизация
        2 => OrderStatus::Succeeded,
        // Авторизация отменена
        3 => OrderStatus::Cancelled,
        // По транзакции была проведена операция возврата
        4 => OrderStatus::Refunded,
        // Инициирована авторизация через ACS банка-эмитента
        5 => OrderStatus::Processing,
        // Авторизация отклонена
        6 => OrderStatus::Failed,
        _ => OrderStatus::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table_known_codes() {
        assert_eq!(map_order_status(0), OrderStatus::Pending);
        assert_eq!(map_order_status(1), OrderStatus::Processing);
        assert_eq!(map_order_status(2), OrderStatus::Succeeded);
        assert_eq!(map_order_status(3), OrderStatus::Cancelled);
        assert_eq!(map_order_status(4), OrderStatus::Refunded);
        assert_eq!(map_order_status(5), OrderStatus::Processing);
        assert_eq!(map_order_status(6), OrderStatus::Failed);
    }

    #[test]
    fn test_status_table_unknown_codes_fail_safe() {
        // Неизвестный код никогда не должен дать терминальный статус
        for code in [-1, 7, 42, 100, i64::MAX] {
            assert_eq!(map_order_status(code), OrderStatus::Pending);
        }
    }
}
