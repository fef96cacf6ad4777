use crate::domain::common::{
    AggregateId, AggregateRoot, BaseAggregate, EntityMetadata, Origin,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ID Type
// ============================================================================

/// Уникальный идентификатор платёжного заказа
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentOrderId(pub Uuid);

impl PaymentOrderId {
    pub fn new(value: Uuid) -> Self {
        Self(value)
    }

    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn value(&self) -> Uuid {
        self.0
    }
}

impl AggregateId for PaymentOrderId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(PaymentOrderId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

// ============================================================================
// Status
// ============================================================================

/// Статус платёжного заказа
///
/// Терминальные статусы: `Succeeded`, `Failed`, `Cancelled`, `Refunded`.
/// Единственный разрешённый переход из терминального статуса:
/// `Succeeded -> Refunded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Refunded,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Succeeded => "succeeded",
            OrderStatus::Failed => "failed",
            OrderStatus::Refunded => "refunded",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "succeeded" => Ok(OrderStatus::Succeeded),
            "failed" => Ok(OrderStatus::Failed),
            "refunded" => Ok(OrderStatus::Refunded),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("Unknown order status: {}", other)),
        }
    }

    /// Терминальный статус больше не изменяется poll/callback результатами
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Succeeded
                | OrderStatus::Failed
                | OrderStatus::Refunded
                | OrderStatus::Cancelled
        )
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Product reference
// ============================================================================

/// Ссылка на оплачиваемый продукт
///
/// Тегированное объединение вместо свободного metadata-словаря:
/// добавление нового типа продукта проверяется компилятором
/// (exhaustive match в грантере).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProductRef {
    /// Премиум-доступ на заданное число дней
    Premium { duration_days: i64 },
    /// Разовая покупка упражнения (доступ 30 дней)
    Exercise { exercise_id: String },
    /// Запись на марафон заданной длительности
    Marathon {
        marathon_id: String,
        duration_days: i32,
    },
}

impl ProductRef {
    pub fn type_name(&self) -> &'static str {
        match self {
            ProductRef::Premium { .. } => "premium",
            ProductRef::Exercise { .. } => "exercise",
            ProductRef::Marathon { .. } => "marathon",
        }
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Платёжный заказ (одна попытка оплаты через банковский шлюз)
///
/// `base.code` — это orderNumber: натуральный ключ заказа, генерируется
/// нашей стороной до регистрации в шлюзе и никогда не меняется.
/// Заказы не удаляются (audit trail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrder {
    #[serde(flatten)]
    pub base: BaseAggregate<PaymentOrderId>,

    /// Пользователь, инициировавший оплату
    #[serde(rename = "userId")]
    pub user_id: String,

    /// Сумма в минорных единицах (копейки)
    pub amount: i64,

    /// Валюта (ISO 4217 numeric, например "643")
    pub currency: String,

    /// Текущий статус заказа
    pub status: OrderStatus,

    /// ID заказа на стороне шлюза; None до успешной регистрации
    #[serde(rename = "gatewayOrderId")]
    pub gateway_order_id: Option<String>,

    /// Способ оплаты, как его сообщил шлюз
    #[serde(rename = "paymentMethod")]
    pub payment_method: Option<String>,

    /// Оплачиваемый продукт
    pub product: ProductRef,
}

impl PaymentOrder {
    /// Создать новый заказ для вставки в БД (статус всегда `Pending`)
    pub fn new_for_insert(
        order_number: String,
        description: String,
        user_id: String,
        amount: i64,
        currency: String,
        product: ProductRef,
    ) -> Self {
        let base = BaseAggregate::new(PaymentOrderId::new_v4(), order_number, description);

        Self {
            base,
            user_id,
            amount,
            currency,
            status: OrderStatus::Pending,
            gateway_order_id: None,
            payment_method: None,
            product,
        }
    }

    /// orderNumber заказа (натуральный ключ)
    pub fn order_number(&self) -> &str {
        &self.base.code
    }

    /// Валидация данных
    pub fn validate(&self) -> Result<(), String> {
        if self.base.code.trim().is_empty() {
            return Err("Номер заказа не может быть пустым".into());
        }
        if self.user_id.trim().is_empty() {
            return Err("Не указан пользователь".into());
        }
        if self.amount <= 0 {
            return Err("Сумма заказа должна быть положительной".into());
        }
        match &self.product {
            ProductRef::Premium { duration_days } if *duration_days <= 0 => {
                Err("Длительность премиум-доступа должна быть положительной".into())
            }
            ProductRef::Marathon { duration_days, .. } if *duration_days <= 0 => {
                Err("Длительность марафона должна быть положительной".into())
            }
            ProductRef::Exercise { exercise_id } if exercise_id.trim().is_empty() => {
                Err("Не указано упражнение".into())
            }
            _ => Ok(()),
        }
    }

    /// Хук перед записью
    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for PaymentOrder {
    type Id = PaymentOrderId;

    fn id(&self) -> Self::Id {
        self.base.id
    }

    fn code(&self) -> &str {
        &self.base.code
    }

    fn description(&self) -> &str {
        &self.base.description
    }

    fn metadata(&self) -> &EntityMetadata {
        &self.base.metadata
    }

    fn metadata_mut(&mut self) -> &mut EntityMetadata {
        &mut self.base.metadata
    }

    fn aggregate_index() -> &'static str {
        "a001"
    }

    fn collection_name() -> &'static str {
        "payment_order"
    }

    fn element_name() -> &'static str {
        "Платёжный заказ"
    }

    fn list_name() -> &'static str {
        "Платёжные заказы"
    }

    fn origin() -> Origin {
        Origin::Bank
    }
}

// ============================================================================
// Forms / DTOs
// ============================================================================

/// DTO для создания заказа (вход createOrder)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderDto {
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Сумма в минорных единицах
    pub amount: i64,
    /// Описание для платёжной страницы банка
    pub description: String,
    pub product: ProductRef,
}

/// Результат создания заказа: номер + URL платёжной страницы
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedOrderDto {
    #[serde(rename = "orderNumber")]
    pub order_number: String,
    #[serde(rename = "redirectUrl")]
    pub redirect_url: String,
}

/// Текущее состояние заказа (ответ getOrderStatus)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderStatusDto {
    #[serde(rename = "orderNumber")]
    pub order_number: String,
    pub status: OrderStatus,
    pub amount: i64,
    pub description: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(OrderStatus::Succeeded.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_status_roundtrip() {
        for s in [
            OrderStatus::Pending,
            OrderStatus::Processing,
            OrderStatus::Succeeded,
            OrderStatus::Failed,
            OrderStatus::Refunded,
            OrderStatus::Cancelled,
        ] {
            assert_eq!(OrderStatus::from_str(s.as_str()), Ok(s));
        }
        assert!(OrderStatus::from_str("paid").is_err());
    }

    #[test]
    fn test_product_ref_tagged_json() {
        let p = ProductRef::Premium { duration_days: 30 };
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["type"], "premium");
        assert_eq!(json["duration_days"], 30);

        let m: ProductRef = serde_json::from_str(
            r#"{"type":"marathon","marathon_id":"mar-1","duration_days":28}"#,
        )
        .unwrap();
        assert_eq!(
            m,
            ProductRef::Marathon {
                marathon_id: "mar-1".into(),
                duration_days: 28
            }
        );
    }

    #[test]
    fn test_validate_rejects_bad_orders() {
        let mut order = PaymentOrder::new_for_insert(
            "ORD-1".into(),
            "Премиум на 30 дней".into(),
            "user-1".into(),
            99000,
            "643".into(),
            ProductRef::Premium { duration_days: 30 },
        );
        assert!(order.validate().is_ok());

        order.amount = 0;
        assert!(order.validate().is_err());
    }
}
