use super::repository;
use chrono::{DateTime, Utc};
use contracts::domain::a003_exercise_purchase::aggregate::ExercisePurchase;
use sea_orm::DatabaseConnection;

/// Статус доступа к купленному упражнению
#[derive(Debug, Clone, serde::Serialize)]
pub struct AccessStatus {
    pub active: bool,
    /// Конец срока действия, если покупка существует
    #[serde(rename = "expiresAt")]
    pub expires_at: Option<DateTime<Utc>>,
}

/// Доступ открыт, пока `now < expires_at`
pub async fn access_status(
    db: &DatabaseConnection,
    user_id: &str,
    exercise_id: &str,
) -> anyhow::Result<AccessStatus> {
    let purchase: Option<ExercisePurchase> =
        repository::get_by_user_and_exercise(db, user_id, exercise_id).await?;
    let now = Utc::now();
    Ok(match purchase {
        Some(p) => AccessStatus {
            active: p.is_active(now),
            expires_at: Some(p.expires_at),
        },
        None => AccessStatus {
            active: false,
            expires_at: None,
        },
    })
}
