//! Очередь уведомлений (enrollment confirmation, premium activated)
//!
//! Постановка в очередь — fire-and-forget: сбой доставки никогда не
//! откатывает выдачу доступа. Само письмо отправляет внешний сервис,
//! здесь только постановка задачи.

use chrono::{DateTime, Utc};

/// Уведомление пользователю по результату выдачи доступа
#[derive(Debug, Clone)]
pub enum Notification {
    EnrollmentConfirmed {
        user_id: String,
        marathon_id: String,
    },
    PremiumActivated {
        user_id: String,
        premium_until: DateTime<Utc>,
    },
    ExercisePurchased {
        user_id: String,
        exercise_id: String,
    },
}

#[derive(Debug, Clone, Default)]
pub struct NotificationQueue;

impl NotificationQueue {
    pub fn new() -> Self {
        Self
    }

    /// Поставить уведомление в очередь, не дожидаясь доставки
    pub fn enqueue(&self, notification: Notification) {
        tokio::spawn(async move {
            match &notification {
                Notification::EnrollmentConfirmed {
                    user_id,
                    marathon_id,
                } => {
                    tracing::info!(
                        "Notification enqueued: enrollment confirmed for user {} marathon {}",
                        user_id,
                        marathon_id
                    );
                }
                Notification::PremiumActivated {
                    user_id,
                    premium_until,
                } => {
                    tracing::info!(
                        "Notification enqueued: premium activated for user {} until {}",
                        user_id,
                        premium_until
                    );
                }
                Notification::ExercisePurchased {
                    user_id,
                    exercise_id,
                } => {
                    tracing::info!(
                        "Notification enqueued: exercise {} purchased by user {}",
                        exercise_id,
                        user_id
                    );
                }
            }
        });
    }
}
