use chrono::Utc;
use contracts::domain::a001_payment_order::aggregate::{PaymentOrder, ProductRef};
use contracts::domain::a002_enrollment::aggregate::{Enrollment, EnrollmentStatus};
use contracts::domain::a003_exercise_purchase::aggregate::ExercisePurchase;
use contracts::domain::a005_premium_access::aggregate::PremiumAccess;
use sea_orm::{DatabaseConnection, TransactionTrait};

use crate::domain::a002_enrollment::repository as enrollment_repository;
use crate::domain::a003_exercise_purchase::repository as purchase_repository;
use crate::domain::a005_premium_access::repository as premium_repository;
use crate::domain::a006_entitlement_grant::repository as grant_repository;
use crate::shared::notify::{Notification, NotificationQueue};

/// Итог выдачи доступа по заказу
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted,
    /// Повторный вызов для уже обработанного заказа: молча поглощается
    AlreadyGranted,
}

/// Грантер: превращает оплаченный заказ в долговременный доступ
///
/// Ключ идемпотентности — orderNumber: маркер выдачи и записи доступа
/// пишутся в одной локальной транзакции, так что ни сбой между ними, ни
/// повторный вызов не приводят к двойной выдаче.
pub struct EntitlementService {
    db: DatabaseConnection,
    notifications: NotificationQueue,
}

impl EntitlementService {
    pub fn new(db: DatabaseConnection, notifications: NotificationQueue) -> Self {
        Self { db, notifications }
    }

    /// Выдать доступ по оплаченному заказу
    pub async fn grant(&self, order: &PaymentOrder) -> anyhow::Result<GrantOutcome> {
        let txn = self.db.begin().await?;

        let inserted = grant_repository::insert_marker(
            &txn,
            order.order_number(),
            order.product.type_name(),
        )
        .await?;
        if !inserted {
            txn.rollback().await?;
            tracing::debug!(
                "Grant for order {} already applied, skipping",
                order.order_number()
            );
            return Ok(GrantOutcome::AlreadyGranted);
        }

        let notification = match &order.product {
            ProductRef::Premium { duration_days } => {
                let current = premium_repository::get_by_user(&txn, &order.user_id)
                    .await?
                    .map(|p| p.premium_until);
                let until = PremiumAccess::extended_until(current, Utc::now(), *duration_days);
                premium_repository::set_until(&txn, &order.user_id, until).await?;

                Notification::PremiumActivated {
                    user_id: order.user_id.clone(),
                    premium_until: until,
                }
            }

            ProductRef::Exercise { exercise_id } => {
                let purchase = ExercisePurchase::new_for_insert(
                    order.user_id.clone(),
                    exercise_id.clone(),
                    Utc::now(),
                );
                let created = purchase_repository::insert_if_absent(&txn, &purchase).await?;
                if !created {
                    // Пара (user, exercise) уже есть: срок первой выдачи сохраняется
                    tracing::debug!(
                        "User {} already owns exercise {}, keeping original expiry",
                        order.user_id,
                        exercise_id
                    );
                }

                Notification::ExercisePurchased {
                    user_id: order.user_id.clone(),
                    exercise_id: exercise_id.clone(),
                }
            }

            ProductRef::Marathon {
                marathon_id,
                duration_days,
            } => {
                match enrollment_repository::get_by_user_and_marathon(
                    &txn,
                    &order.user_id,
                    marathon_id,
                )
                .await?
                {
                    // Бесплатная предварительная регистрация переводится
                    // в active, а не дублируется
                    Some(mut enrollment) => {
                        enrollment.status = EnrollmentStatus::Active;
                        enrollment.is_paid = true;
                        if enrollment.enrolled_at.is_none() {
                            enrollment.enrolled_at = Some(Utc::now());
                        }
                        enrollment.before_write();
                        enrollment.base.metadata.increment_version();
                        enrollment_repository::update(&txn, &enrollment).await?;
                    }
                    None => {
                        let mut enrollment = Enrollment::new_for_insert(
                            order.user_id.clone(),
                            marathon_id.clone(),
                            *duration_days,
                        );
                        enrollment.status = EnrollmentStatus::Active;
                        enrollment.is_paid = true;
                        enrollment.enrolled_at = Some(Utc::now());
                        enrollment.before_write();
                        enrollment_repository::insert(&txn, &enrollment).await?;
                    }
                }

                Notification::EnrollmentConfirmed {
                    user_id: order.user_id.clone(),
                    marathon_id: marathon_id.clone(),
                }
            }
        };

        txn.commit().await?;

        tracing::info!(
            "Entitlement granted for order {} (product {})",
            order.order_number(),
            order.product.type_name()
        );

        // Fire-and-forget: сбой уведомления не откатывает выдачу
        self.notifications.enqueue(notification);

        Ok(GrantOutcome::Granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a002_enrollment::service as enrollment_service;
    use crate::shared::data::db::initialize_in_memory;
    use chrono::Duration;
    use contracts::domain::a002_enrollment::aggregate::EnrollmentDto;

    fn premium_order(order_number: &str, user_id: &str, duration_days: i64) -> PaymentOrder {
        PaymentOrder::new_for_insert(
            order_number.to_string(),
            "Премиум-доступ".to_string(),
            user_id.to_string(),
            99000,
            "643".to_string(),
            ProductRef::Premium { duration_days },
        )
    }

    fn exercise_order(order_number: &str, user_id: &str, exercise_id: &str) -> PaymentOrder {
        PaymentOrder::new_for_insert(
            order_number.to_string(),
            "Покупка упражнения".to_string(),
            user_id.to_string(),
            19000,
            "643".to_string(),
            ProductRef::Exercise {
                exercise_id: exercise_id.to_string(),
            },
        )
    }

    fn marathon_order(order_number: &str, user_id: &str, marathon_id: &str) -> PaymentOrder {
        PaymentOrder::new_for_insert(
            order_number.to_string(),
            "Марафон".to_string(),
            user_id.to_string(),
            99000,
            "643".to_string(),
            ProductRef::Marathon {
                marathon_id: marathon_id.to_string(),
                duration_days: 28,
            },
        )
    }

    #[tokio::test]
    async fn test_premium_grant_extends_window_from_now() {
        let db = initialize_in_memory().await.unwrap();
        let service = EntitlementService::new(db.clone(), NotificationQueue::new());

        let before = Utc::now();
        let outcome = service.grant(&premium_order("ORD-1", "user-1", 30)).await.unwrap();
        assert_eq!(outcome, GrantOutcome::Granted);

        let access = premium_repository::get_by_user(&db, "user-1")
            .await
            .unwrap()
            .unwrap();
        assert!(access.premium_until >= before + Duration::days(30));
        assert!(access.premium_until <= Utc::now() + Duration::days(30));
    }

    #[tokio::test]
    async fn test_premium_purchases_stack() {
        let db = initialize_in_memory().await.unwrap();
        let service = EntitlementService::new(db.clone(), NotificationQueue::new());

        service.grant(&premium_order("ORD-1", "user-1", 30)).await.unwrap();
        let first = premium_repository::get_by_user(&db, "user-1")
            .await
            .unwrap()
            .unwrap();

        service.grant(&premium_order("ORD-2", "user-1", 30)).await.unwrap();
        let second = premium_repository::get_by_user(&db, "user-1")
            .await
            .unwrap()
            .unwrap();

        // Вторая покупка продлевает окно от конца первого, а не от now
        assert_eq!(second.premium_until, first.premium_until + Duration::days(30));
    }

    #[tokio::test]
    async fn test_grant_is_idempotent_per_order() {
        let db = initialize_in_memory().await.unwrap();
        let service = EntitlementService::new(db.clone(), NotificationQueue::new());

        let order = premium_order("ORD-1", "user-1", 30);
        assert_eq!(service.grant(&order).await.unwrap(), GrantOutcome::Granted);
        let first = premium_repository::get_by_user(&db, "user-1")
            .await
            .unwrap()
            .unwrap();

        for _ in 0..4 {
            assert_eq!(
                service.grant(&order).await.unwrap(),
                GrantOutcome::AlreadyGranted
            );
        }

        let after = premium_repository::get_by_user(&db, "user-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.premium_until, first.premium_until);
    }

    #[tokio::test]
    async fn test_double_exercise_purchase_keeps_first_expiry() {
        let db = initialize_in_memory().await.unwrap();
        let service = EntitlementService::new(db.clone(), NotificationQueue::new());

        service
            .grant(&exercise_order("ORD-1", "user-1", "ex-1"))
            .await
            .unwrap();
        let first = purchase_repository::get_by_user_and_exercise(&db, "user-1", "ex-1")
            .await
            .unwrap()
            .unwrap();

        // Вторая успешная оплата того же упражнения другим заказом
        service
            .grant(&exercise_order("ORD-2", "user-1", "ex-1"))
            .await
            .unwrap();
        let second = purchase_repository::get_by_user_and_exercise(&db, "user-1", "ex-1")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(second.base.id, first.base.id);
        assert_eq!(second.expires_at, first.expires_at);
    }

    #[tokio::test]
    async fn test_marathon_grant_creates_active_enrollment() {
        let db = initialize_in_memory().await.unwrap();
        let service = EntitlementService::new(db.clone(), NotificationQueue::new());

        service
            .grant(&marathon_order("ORD-1", "user-1", "mar-1"))
            .await
            .unwrap();

        let enrollment = enrollment_repository::get_by_user_and_marathon(&db, "user-1", "mar-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(enrollment.status, EnrollmentStatus::Active);
        assert!(enrollment.is_paid);
        assert!(enrollment.enrolled_at.is_some());
        assert_eq!(enrollment.total_days, 28);
    }

    #[tokio::test]
    async fn test_marathon_grant_activates_pending_preregistration() {
        let db = initialize_in_memory().await.unwrap();
        let service = EntitlementService::new(db.clone(), NotificationQueue::new());

        let pending = enrollment_service::preregister(
            &db,
            EnrollmentDto {
                user_id: "user-1".into(),
                marathon_id: "mar-1".into(),
                total_days: 28,
            },
        )
        .await
        .unwrap();
        assert_eq!(pending.status, EnrollmentStatus::Pending);

        service
            .grant(&marathon_order("ORD-1", "user-1", "mar-1"))
            .await
            .unwrap();

        let activated = enrollment_repository::get_by_user_and_marathon(&db, "user-1", "mar-1")
            .await
            .unwrap()
            .unwrap();
        // Та же запись, не дубликат
        assert_eq!(activated.base.id, pending.base.id);
        assert_eq!(activated.status, EnrollmentStatus::Active);
        assert!(activated.is_paid);
        assert!(activated.enrolled_at.is_some());
    }
}
