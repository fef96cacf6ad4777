use contracts::domain::a001_payment_order::aggregate::{
    CreateOrderDto, CreatedOrderDto, OrderStatus, PaymentOrder,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::a001_payment_order::repository as order_repository;
use crate::shared::gateway::{GatewayError, PaymentGateway};

/// Ошибка оформления заказа
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// Шлюз не зарегистрировал заказ; заказ помечен failed
    #[error("шлюз отклонил регистрацию заказа")]
    Registration(#[source] GatewayError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Оформление заказа: от намерения оплатить до платёжной страницы банка
pub struct CheckoutService {
    db: DatabaseConnection,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
}

impl CheckoutService {
    pub fn new(db: DatabaseConnection, gateway: Arc<dyn PaymentGateway>, currency: String) -> Self {
        Self {
            db,
            gateway,
            currency,
        }
    }

    /// Создать заказ и зарегистрировать его в шлюзе.
    ///
    /// Заказ показывается пользователю только после успешной регистрации:
    /// при отказе шлюза он немедленно помечается failed и не остаётся
    /// висеть pending без ссылки на шлюз.
    pub async fn create_order(
        &self,
        dto: CreateOrderDto,
    ) -> Result<CreatedOrderDto, CheckoutError> {
        // orderNumber — наш ключ идемпотентности, генерируется до шлюза
        let order_number = format!("ORD-{}", Uuid::new_v4());

        let mut order = PaymentOrder::new_for_insert(
            order_number.clone(),
            dto.description,
            dto.user_id,
            dto.amount,
            self.currency.clone(),
            dto.product,
        );

        order
            .validate()
            .map_err(|e| anyhow::anyhow!("Validation failed: {}", e))?;

        order.before_write();

        order_repository::insert(&self.db, &order)
            .await
            .map_err(CheckoutError::Internal)?;

        match self
            .gateway
            .register(&order_number, order.amount, &order.base.description)
            .await
        {
            Ok(registered) => {
                order_repository::set_gateway_registration(
                    &self.db,
                    &order_number,
                    &registered.gateway_order_id,
                )
                .await
                .map_err(CheckoutError::Internal)?;

                tracing::info!(
                    "Order {} registered at gateway as {}",
                    order_number,
                    registered.gateway_order_id
                );

                Ok(CreatedOrderDto {
                    order_number,
                    redirect_url: registered.redirect_url,
                })
            }
            Err(e) => {
                tracing::error!("Gateway registration for order {} failed: {}", order_number, e);
                order_repository::cas_transition(
                    &self.db,
                    &order_number,
                    OrderStatus::Failed,
                    None,
                )
                .await
                .map_err(CheckoutError::Internal)?;
                Err(CheckoutError::Registration(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::db::initialize_in_memory;
    use crate::shared::gateway::{RegisterResult, StatusResult};
    use async_trait::async_trait;
    use contracts::domain::a001_payment_order::aggregate::ProductRef;

    struct StubGateway {
        reject_registration: bool,
    }

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn register(
            &self,
            order_number: &str,
            _amount: i64,
            _description: &str,
        ) -> Result<RegisterResult, GatewayError> {
            if self.reject_registration {
                return Err(GatewayError::Rejected {
                    code: 5,
                    message: "Доступ запрещён".into(),
                });
            }
            Ok(RegisterResult {
                gateway_order_id: format!("gw-{}", order_number),
                redirect_url: "https://pay.test/form".into(),
            })
        }

        async fn query_status(
            &self,
            _gateway_order_id: &str,
        ) -> Result<StatusResult, GatewayError> {
            unreachable!("checkout never queries status")
        }

        async fn refund(&self, _gateway_order_id: &str, _amount: i64) -> Result<(), GatewayError> {
            unreachable!("checkout never refunds")
        }
    }

    fn dto() -> CreateOrderDto {
        CreateOrderDto {
            user_id: "user-1".into(),
            amount: 99000,
            description: "Премиум на 30 дней".into(),
            product: ProductRef::Premium { duration_days: 30 },
        }
    }

    #[tokio::test]
    async fn test_create_order_registers_and_stays_pending() {
        let db = initialize_in_memory().await.unwrap();
        let service = CheckoutService::new(
            db.clone(),
            Arc::new(StubGateway {
                reject_registration: false,
            }),
            "643".into(),
        );

        let created = service.create_order(dto()).await.unwrap();
        assert_eq!(created.redirect_url, "https://pay.test/form");

        let order = order_repository::get_by_order_number(&db, &created.order_number)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(
            order.gateway_order_id.as_deref(),
            Some(format!("gw-{}", created.order_number).as_str())
        );
    }

    #[tokio::test]
    async fn test_rejected_registration_marks_order_failed() {
        let db = initialize_in_memory().await.unwrap();
        let service = CheckoutService::new(
            db.clone(),
            Arc::new(StubGateway {
                reject_registration: true,
            }),
            "643".into(),
        );

        let result = service.create_order(dto()).await;
        assert!(matches!(result, Err(CheckoutError::Registration(_))));

        // Заказ не остался pending без ссылки на шлюз
        let orders = order_repository::list_stale_pending(&db, chrono::Utc::now())
            .await
            .unwrap();
        assert!(orders.is_empty());
    }
}
