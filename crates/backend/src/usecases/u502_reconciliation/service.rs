use chrono::{Duration, Utc};
use contracts::domain::a001_payment_order::aggregate::{OrderStatus, OrderStatusDto};
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::domain::a001_payment_order::repository as order_repository;
use crate::domain::a001_payment_order::service as order_service;
use crate::shared::gateway::{GatewayError, PaymentGateway, StatusResult};
use crate::usecases::u503_entitlement_grant::EntitlementService;

/// Итог применения результата сверки к заказу
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Переход принят compare-and-set'ом
    Accepted(OrderStatus),
    /// Заказ уже терминален, результат отброшен (лог, не ошибка)
    Discarded,
    /// Результат не продвигает статус (pending/неизвестный код)
    Unchanged,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("заказ не найден")]
    NotFound,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RefundError {
    #[error("заказ не найден")]
    NotFound,

    /// Возврат возможен только из succeeded
    #[error("возврат невозможен из статуса {0}")]
    NotRefundable(OrderStatus),

    #[error("шлюз отклонил возврат")]
    Gateway(#[source] GatewayError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Политика повторов poll-цикла на стороне вызывающего
///
/// Сама сверка — операция "применить один раз"; ретраи с экспоненциальной
/// выдержкой живут здесь и ограничены числом попыток.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        // Эталонный клиент опрашивал шлюз каждые 3 секунды
        Self {
            max_attempts: 20,
            initial_delay_ms: 3_000,
            max_delay_ms: 24_000,
        }
    }
}

impl RetryPolicy {
    /// Выдержка перед попыткой `attempt` (нумерация с нуля)
    pub fn delay_for_attempt(&self, attempt: u32) -> std::time::Duration {
        let factor = 2u64.saturating_pow(attempt);
        let delay = self
            .initial_delay_ms
            .saturating_mul(factor)
            .min(self.max_delay_ms);
        std::time::Duration::from_millis(delay)
    }
}

/// Сервис сверки: доводит заказ до терминального статуса
///
/// Оба канала — poll со стороны клиента и callback со стороны шлюза —
/// сходятся в одном `apply_status_result`: compare-and-set и запуск
/// грантера существуют ровно в одном месте.
pub struct ReconciliationService {
    db: DatabaseConnection,
    gateway: Arc<dyn PaymentGateway>,
    entitlements: Arc<EntitlementService>,
}

impl ReconciliationService {
    pub fn new(
        db: DatabaseConnection,
        gateway: Arc<dyn PaymentGateway>,
        entitlements: Arc<EntitlementService>,
    ) -> Self {
        Self {
            db,
            gateway,
            entitlements,
        }
    }

    /// Применить результат сверки к заказу (единая точка для обоих каналов).
    ///
    /// Переход принимается только из нетерминального статуса; дубль
    /// callback'а или параллельный poll проигрывают CAS и отбрасываются.
    /// Принятый переход в succeeded запускает грантер здесь же, до
    /// возврата: упавший грант чинит фоновая сверка, а не теряется.
    pub async fn apply_status_result(
        &self,
        order_number: &str,
        result: &StatusResult,
    ) -> anyhow::Result<ApplyOutcome> {
        match result.status {
            OrderStatus::Pending => {
                // Код 0 или неизвестный код шлюза: статус не продвигается
                tracing::debug!(
                    "Order {}: gateway code {} does not advance status",
                    order_number,
                    result.gateway_code
                );
                Ok(ApplyOutcome::Unchanged)
            }

            OrderStatus::Processing => {
                let accepted = order_repository::cas_transition(
                    &self.db,
                    order_number,
                    OrderStatus::Processing,
                    result.payment_method.as_deref(),
                )
                .await?;
                if accepted {
                    tracing::info!("Order {} moved to processing", order_number);
                    Ok(ApplyOutcome::Accepted(OrderStatus::Processing))
                } else {
                    Ok(ApplyOutcome::Unchanged)
                }
            }

            OrderStatus::Succeeded => {
                let accepted = order_repository::cas_transition(
                    &self.db,
                    order_number,
                    OrderStatus::Succeeded,
                    result.payment_method.as_deref(),
                )
                .await?;
                if !accepted {
                    tracing::info!(
                        "Order {}: duplicate success result discarded (already terminal)",
                        order_number
                    );
                    return Ok(ApplyOutcome::Discarded);
                }

                tracing::info!(
                    "Order {} succeeded (gateway code {})",
                    order_number,
                    result.gateway_code
                );

                // Грант в рамках того же принятого перехода, не отдельной
                // фоновой задачей; окно сбоя закрывает sweep
                match order_repository::get_by_order_number(&self.db, order_number).await? {
                    Some(order) => {
                        if let Err(e) = self.entitlements.grant(&order).await {
                            tracing::error!(
                                "Order {}: entitlement grant failed, sweep will repair: {:#}",
                                order_number,
                                e
                            );
                        }
                    }
                    None => {
                        tracing::error!(
                            "Order {} vanished between transition and grant",
                            order_number
                        );
                    }
                }

                Ok(ApplyOutcome::Accepted(OrderStatus::Succeeded))
            }

            OrderStatus::Failed | OrderStatus::Cancelled => {
                let accepted = order_repository::cas_transition(
                    &self.db,
                    order_number,
                    result.status,
                    result.payment_method.as_deref(),
                )
                .await?;
                if accepted {
                    tracing::info!(
                        "Order {} moved to {} (gateway code {})",
                        order_number,
                        result.status,
                        result.gateway_code
                    );
                    Ok(ApplyOutcome::Accepted(result.status))
                } else {
                    tracing::info!(
                        "Order {}: duplicate {} result discarded (already terminal)",
                        order_number,
                        result.status
                    );
                    Ok(ApplyOutcome::Discarded)
                }
            }

            OrderStatus::Refunded => {
                // Возврат применяется только явной операцией refund_order
                tracing::info!(
                    "Order {}: refunded status from gateway ignored by reconciliation",
                    order_number
                );
                Ok(ApplyOutcome::Discarded)
            }
        }
    }

    /// Poll-канал: узнать статус заказа, попутно сверив его со шлюзом.
    ///
    /// Транзиентные ошибки шлюза не меняют статус и не превращаются в
    /// failed: вызывающий просто получает текущее состояние и может
    /// повторить запрос.
    pub async fn poll_order(&self, order_number: &str) -> Result<OrderStatusDto, ReconcileError> {
        let order = order_repository::get_by_order_number(&self.db, order_number)
            .await?
            .ok_or(ReconcileError::NotFound)?;

        // Терминальный заказ не о чем сверять
        if order.status.is_terminal() {
            return Ok(order_service::to_status_dto(&order));
        }

        let Some(gateway_order_id) = order.gateway_order_id.clone() else {
            return Ok(order_service::to_status_dto(&order));
        };

        match self.gateway.query_status(&gateway_order_id).await {
            Ok(result) => {
                self.apply_status_result(order.order_number(), &result)
                    .await?;
            }
            Err(GatewayError::Transport(e)) => {
                tracing::warn!(
                    "Transient gateway error polling order {}: {}",
                    order_number,
                    e
                );
            }
            Err(GatewayError::Rejected { code, message }) => {
                // Явная ошибка запроса статуса — не отказ по платежу;
                // заказ не помечается failed
                tracing::warn!(
                    "Gateway rejected status query for order {}: {} {}",
                    order_number,
                    code,
                    message
                );
            }
        }

        let refreshed = order_repository::get_by_order_number(&self.db, order_number)
            .await?
            .ok_or(ReconcileError::NotFound)?;
        Ok(order_service::to_status_dto(&refreshed))
    }

    /// Poll до терминального статуса с выдержкой между попытками
    pub async fn poll_until_terminal(
        &self,
        order_number: &str,
        policy: RetryPolicy,
    ) -> Result<OrderStatusDto, ReconcileError> {
        let mut last = self.poll_order(order_number).await?;
        let mut attempt: u32 = 0;

        while !last.status.is_terminal() && attempt + 1 < policy.max_attempts {
            tokio::time::sleep(policy.delay_for_attempt(attempt)).await;
            attempt += 1;
            last = self.poll_order(order_number).await?;
        }

        Ok(last)
    }

    /// Callback-канал: шлюз назвал свой orderId, статус сверяется запросом.
    ///
    /// Всегда завершается успешно при известном заказе — повторный
    /// callback по терминальному заказу просто подтверждается.
    pub async fn handle_callback(&self, gateway_order_id: &str) -> anyhow::Result<()> {
        let Some(order) =
            order_repository::get_by_gateway_order_id(&self.db, gateway_order_id).await?
        else {
            tracing::warn!("Callback for unknown gateway order {}", gateway_order_id);
            return Ok(());
        };

        if order.status.is_terminal() {
            tracing::info!(
                "Callback for terminal order {} acked without changes",
                order.order_number()
            );
            return Ok(());
        }

        // Статусу из payload не доверяем: авторитетный ответ берём у шлюза
        match self.gateway.query_status(gateway_order_id).await {
            Ok(result) => {
                self.apply_status_result(order.order_number(), &result)
                    .await?;
            }
            Err(e) => {
                tracing::warn!(
                    "Callback reconciliation for order {} failed: {}; awaiting next trigger",
                    order.order_number(),
                    e
                );
            }
        }

        Ok(())
    }

    /// Возврат средств: единственный разрешённый выход из терминального
    /// статуса (succeeded -> refunded)
    pub async fn refund_order(&self, order_number: &str) -> Result<OrderStatusDto, RefundError> {
        let order = order_repository::get_by_order_number(&self.db, order_number)
            .await?
            .ok_or(RefundError::NotFound)?;

        if order.status != OrderStatus::Succeeded {
            return Err(RefundError::NotRefundable(order.status));
        }

        let gateway_order_id = order.gateway_order_id.clone().ok_or_else(|| {
            RefundError::Internal(anyhow::anyhow!(
                "succeeded order {} has no gateway reference",
                order_number
            ))
        })?;

        self.gateway
            .refund(&gateway_order_id, order.amount)
            .await
            .map_err(RefundError::Gateway)?;

        let applied = order_repository::cas_transition(
            &self.db,
            order_number,
            OrderStatus::Refunded,
            None,
        )
        .await?;
        if !applied {
            tracing::warn!("Order {} was refunded concurrently", order_number);
        } else {
            tracing::info!("Order {} refunded", order_number);
        }

        let refreshed = order_repository::get_by_order_number(&self.db, order_number)
            .await?
            .ok_or(RefundError::NotFound)?;
        Ok(order_service::to_status_dto(&refreshed))
    }

    /// Sweep: брошенные pending-заказы старше отсечки переводятся в
    /// cancelled, чтобы pending не копился бесконечно
    pub async fn expire_stale_orders(&self, max_age_hours: i64) -> anyhow::Result<u64> {
        let cutoff = Utc::now() - Duration::hours(max_age_hours);
        let stale = order_repository::list_stale_pending(&self.db, cutoff).await?;

        let mut expired = 0u64;
        for order in stale {
            let applied = order_repository::cas_transition(
                &self.db,
                order.order_number(),
                OrderStatus::Cancelled,
                None,
            )
            .await?;
            if applied {
                tracing::info!(
                    "Stale pending order {} expired to cancelled",
                    order.order_number()
                );
                expired += 1;
            }
        }
        Ok(expired)
    }

    /// Sweep: оплаченные заказы без выданного доступа.
    ///
    /// Такой разрыв означает сбой между переходом и грантом; повторный
    /// вызов грантера безопасен благодаря его идемпотентности.
    pub async fn repair_ungranted_orders(&self, min_age_seconds: i64) -> anyhow::Result<u64> {
        let cutoff = Utc::now() - Duration::seconds(min_age_seconds);
        let orders = order_repository::list_succeeded_without_grant(&self.db, cutoff).await?;

        let mut repaired = 0u64;
        for order in orders {
            tracing::warn!(
                "Reconciliation gap: order {} succeeded without entitlement, repairing",
                order.order_number()
            );
            match self.entitlements.grant(&order).await {
                Ok(_) => repaired += 1,
                Err(e) => {
                    tracing::error!(
                        "Repair grant for order {} failed: {:#}",
                        order.order_number(),
                        e
                    );
                }
            }
        }
        Ok(repaired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a005_premium_access::repository as premium_repository;
    use crate::domain::a006_entitlement_grant::repository as grant_repository;
    use crate::shared::data::db::initialize_in_memory;
    use crate::shared::gateway::{map_order_status, RegisterResult};
    use crate::shared::notify::NotificationQueue;
    use async_trait::async_trait;
    use contracts::domain::a001_payment_order::aggregate::{PaymentOrder, ProductRef};
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

    /// Шлюз-заглушка: код статуса и сбой транспорта настраиваются тестом
    struct MockGateway {
        status_code: AtomicI64,
        fail_transport: AtomicBool,
    }

    impl MockGateway {
        fn with_code(code: i64) -> Self {
            Self {
                status_code: AtomicI64::new(code),
                fail_transport: AtomicBool::new(false),
            }
        }

        fn set_code(&self, code: i64) {
            self.status_code.store(code, Ordering::SeqCst);
        }

        fn set_transport_failure(&self, fail: bool) {
            self.fail_transport.store(fail, Ordering::SeqCst);
        }

        fn status_result(code: i64) -> StatusResult {
            StatusResult {
                status: map_order_status(code),
                gateway_code: code,
                payment_method: Some("card".to_string()),
                raw: serde_json::json!({ "orderStatus": code }),
            }
        }
    }

    #[async_trait]
    impl PaymentGateway for MockGateway {
        async fn register(
            &self,
            order_number: &str,
            _amount: i64,
            _description: &str,
        ) -> Result<RegisterResult, GatewayError> {
            Ok(RegisterResult {
                gateway_order_id: format!("gw-{}", order_number),
                redirect_url: "https://pay.test/form".into(),
            })
        }

        async fn query_status(
            &self,
            _gateway_order_id: &str,
        ) -> Result<StatusResult, GatewayError> {
            if self.fail_transport.load(Ordering::SeqCst) {
                return Err(GatewayError::Transport("connection timed out".into()));
            }
            Ok(Self::status_result(self.status_code.load(Ordering::SeqCst)))
        }

        async fn refund(&self, _gateway_order_id: &str, _amount: i64) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    struct Fixture {
        db: DatabaseConnection,
        gateway: Arc<MockGateway>,
        service: ReconciliationService,
    }

    async fn fixture(code: i64) -> Fixture {
        let db = initialize_in_memory().await.unwrap();
        let gateway = Arc::new(MockGateway::with_code(code));
        let entitlements = Arc::new(EntitlementService::new(
            db.clone(),
            NotificationQueue::new(),
        ));
        let service =
            ReconciliationService::new(db.clone(), gateway.clone(), entitlements);
        Fixture {
            db,
            gateway,
            service,
        }
    }

    /// Заказ в ledger, зарегистрированный в шлюзе
    async fn seed_order(db: &DatabaseConnection, order_number: &str, product: ProductRef) {
        let mut order = PaymentOrder::new_for_insert(
            order_number.to_string(),
            "Премиум на 30 дней".to_string(),
            "user-1".to_string(),
            99000,
            "643".to_string(),
            product,
        );
        order.before_write();
        order_repository::insert(db, &order).await.unwrap();
        order_repository::set_gateway_registration(
            db,
            order_number,
            &format!("gw-{}", order_number),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_poll_applies_success_and_grants_premium() {
        // Сценарий: заказ на премиум 30 дней, шлюз отвечает кодом 2
        let f = fixture(2).await;
        seed_order(&f.db, "ORD-1", ProductRef::Premium { duration_days: 30 }).await;

        let before = Utc::now();
        let dto = f.service.poll_order("ORD-1").await.unwrap();
        assert_eq!(dto.status, OrderStatus::Succeeded);
        assert_eq!(dto.amount, 99000);

        let access = premium_repository::get_by_user(&f.db, "user-1")
            .await
            .unwrap()
            .unwrap();
        assert!(access.premium_until >= before + Duration::days(30));

        let order = order_repository::get_by_order_number(&f.db, "ORD-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.payment_method.as_deref(), Some("card"));
    }

    #[tokio::test]
    async fn test_racing_channels_grant_exactly_once() {
        // Poll и callback сообщают успех по одному заказу: принят один
        // переход и выдан один грант
        let f = fixture(2).await;
        seed_order(&f.db, "ORD-1", ProductRef::Premium { duration_days: 30 }).await;

        let result = MockGateway::status_result(2);
        let first = f
            .service
            .apply_status_result("ORD-1", &result)
            .await
            .unwrap();
        let second = f
            .service
            .apply_status_result("ORD-1", &result)
            .await
            .unwrap();

        assert_eq!(first, ApplyOutcome::Accepted(OrderStatus::Succeeded));
        assert_eq!(second, ApplyOutcome::Discarded);

        // Дубль callback'а по терминальному заказу тоже подтверждается
        f.service.handle_callback("gw-ORD-1").await.unwrap();

        let access = premium_repository::get_by_user(&f.db, "user-1")
            .await
            .unwrap()
            .unwrap();
        assert!(access.premium_until <= Utc::now() + Duration::days(30));
        assert!(grant_repository::exists(&f.db, "ORD-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_terminal_status_is_immutable() {
        let f = fixture(6).await;
        seed_order(&f.db, "ORD-1", ProductRef::Premium { duration_days: 30 }).await;

        // Авторизация отклонена
        let dto = f.service.poll_order("ORD-1").await.unwrap();
        assert_eq!(dto.status, OrderStatus::Failed);

        // Последующий успех от шлюза не воскрешает заказ
        f.gateway.set_code(2);
        let dto = f.service.poll_order("ORD-1").await.unwrap();
        assert_eq!(dto.status, OrderStatus::Failed);
        assert!(!grant_repository::exists(&f.db, "ORD-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_unknown_gateway_code_never_advances_past_processing() {
        let f = fixture(42).await;
        seed_order(&f.db, "ORD-1", ProductRef::Premium { duration_days: 30 }).await;

        let dto = f.service.poll_order("ORD-1").await.unwrap();
        assert_eq!(dto.status, OrderStatus::Pending);

        // Предавторизация двигает в processing, дальше неизвестный код
        // статус не меняет
        f.gateway.set_code(1);
        let dto = f.service.poll_order("ORD-1").await.unwrap();
        assert_eq!(dto.status, OrderStatus::Processing);

        f.gateway.set_code(42);
        let dto = f.service.poll_order("ORD-1").await.unwrap();
        assert_eq!(dto.status, OrderStatus::Processing);
    }

    #[tokio::test]
    async fn test_transient_error_leaves_status_unchanged() {
        let f = fixture(2).await;
        seed_order(&f.db, "ORD-1", ProductRef::Premium { duration_days: 30 }).await;

        f.gateway.set_transport_failure(true);
        let dto = f.service.poll_order("ORD-1").await.unwrap();
        // Таймаут не конвертируется в failed
        assert_eq!(dto.status, OrderStatus::Pending);

        f.gateway.set_transport_failure(false);
        let dto = f.service.poll_order("ORD-1").await.unwrap();
        assert_eq!(dto.status, OrderStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_callback_resolves_gateway_order_and_applies() {
        let f = fixture(2).await;
        seed_order(&f.db, "ORD-1", ProductRef::Premium { duration_days: 30 }).await;

        f.service.handle_callback("gw-ORD-1").await.unwrap();

        let order = order_repository::get_by_order_number(&f.db, "ORD-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(order.status, OrderStatus::Succeeded);
        assert!(grant_repository::exists(&f.db, "ORD-1").await.unwrap());

        // Неизвестный gatewayOrderId подтверждается без ошибки
        f.service.handle_callback("gw-unknown").await.unwrap();
    }

    #[tokio::test]
    async fn test_refund_is_the_only_exit_from_succeeded() {
        let f = fixture(2).await;
        seed_order(&f.db, "ORD-1", ProductRef::Premium { duration_days: 30 }).await;

        f.service.poll_order("ORD-1").await.unwrap();

        let dto = f.service.refund_order("ORD-1").await.unwrap();
        assert_eq!(dto.status, OrderStatus::Refunded);

        // Повторный возврат невозможен
        let second = f.service.refund_order("ORD-1").await;
        assert!(matches!(
            second,
            Err(RefundError::NotRefundable(OrderStatus::Refunded))
        ));
    }

    #[tokio::test]
    async fn test_refund_rejected_for_unpaid_order() {
        let f = fixture(0).await;
        seed_order(&f.db, "ORD-1", ProductRef::Premium { duration_days: 30 }).await;

        let result = f.service.refund_order("ORD-1").await;
        assert!(matches!(
            result,
            Err(RefundError::NotRefundable(OrderStatus::Pending))
        ));
    }

    #[tokio::test]
    async fn test_stale_pending_orders_expire_to_cancelled() {
        let f = fixture(0).await;

        // Заказ, созданный 25 часов назад и брошенный на форме оплаты
        let mut order = PaymentOrder::new_for_insert(
            "ORD-STALE".to_string(),
            "Премиум".to_string(),
            "user-1".to_string(),
            99000,
            "643".to_string(),
            ProductRef::Premium { duration_days: 30 },
        );
        order.base.metadata.created_at = Utc::now() - Duration::hours(25);
        order_repository::insert(&f.db, &order).await.unwrap();

        seed_order(&f.db, "ORD-FRESH", ProductRef::Premium { duration_days: 30 }).await;

        let expired = f.service.expire_stale_orders(24).await.unwrap();
        assert_eq!(expired, 1);

        let stale = order_repository::get_by_order_number(&f.db, "ORD-STALE")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stale.status, OrderStatus::Cancelled);

        let fresh = order_repository::get_by_order_number(&f.db, "ORD-FRESH")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(fresh.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_sweep_repairs_succeeded_order_without_grant() {
        let f = fixture(2).await;
        seed_order(&f.db, "ORD-1", ProductRef::Premium { duration_days: 30 }).await;

        // Имитация сбоя между переходом и грантом: статус succeeded,
        // маркера выдачи нет
        order_repository::cas_transition(&f.db, "ORD-1", OrderStatus::Succeeded, None)
            .await
            .unwrap();
        assert!(!grant_repository::exists(&f.db, "ORD-1").await.unwrap());

        let repaired = f.service.repair_ungranted_orders(0).await.unwrap();
        assert_eq!(repaired, 1);

        assert!(grant_repository::exists(&f.db, "ORD-1").await.unwrap());
        let access = premium_repository::get_by_user(&f.db, "user-1")
            .await
            .unwrap();
        assert!(access.is_some());

        // Повторный прогон sweep'а ничего не находит
        let repaired = f.service.repair_ungranted_orders(0).await.unwrap();
        assert_eq!(repaired, 0);
    }

    #[tokio::test]
    async fn test_poll_until_terminal_stops_at_terminal_status() {
        let f = fixture(5).await;
        seed_order(&f.db, "ORD-1", ProductRef::Premium { duration_days: 30 }).await;

        // Код 5 (ACS) держит заказ в processing; успех приходит позже
        let policy = RetryPolicy {
            max_attempts: 10,
            initial_delay_ms: 1,
            max_delay_ms: 2,
        };

        let dto = f.service.poll_until_terminal("ORD-1", policy).await.unwrap();
        assert_eq!(dto.status, OrderStatus::Processing);

        f.gateway.set_code(2);
        let dto = f.service.poll_until_terminal("ORD-1", policy).await.unwrap();
        assert_eq!(dto.status, OrderStatus::Succeeded);
    }

    #[test]
    fn test_retry_policy_backoff_is_bounded() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.delay_for_attempt(0),
            std::time::Duration::from_millis(3_000)
        );
        assert_eq!(
            policy.delay_for_attempt(1),
            std::time::Duration::from_millis(6_000)
        );
        assert_eq!(
            policy.delay_for_attempt(2),
            std::time::Duration::from_millis(12_000)
        );
        // Выдержка упирается в потолок и не переполняется
        assert_eq!(
            policy.delay_for_attempt(10),
            std::time::Duration::from_millis(24_000)
        );
        assert_eq!(
            policy.delay_for_attempt(63),
            std::time::Duration::from_millis(24_000)
        );
    }
}
