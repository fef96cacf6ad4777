use super::repository;
use crate::domain::a002_enrollment::repository as enrollment_repository;
use crate::domain::a002_enrollment::service::ProgressError;
use chrono::Utc;
use contracts::domain::a002_enrollment::aggregate::EnrollmentStatus;
use contracts::domain::a004_day_progress::aggregate::{DayProgress, DayProgressDto};
use sea_orm::DatabaseConnection;

/// Отметить выполнение упражнения в рамках дня.
///
/// Гейт тот же, что и у отметки дня: упражнение закрытого дня отметить
/// нельзя. Повторная отметка — no-op (upsert по натуральному ключу).
pub async fn mark_exercise_complete(
    db: &DatabaseConnection,
    dto: DayProgressDto,
) -> Result<(), ProgressError> {
    let enrollment =
        enrollment_repository::get_by_user_and_marathon(db, &dto.user_id, &dto.marathon_id)
            .await?
            .ok_or(ProgressError::NotFound)?;

    if enrollment.status != EnrollmentStatus::Active {
        return Err(ProgressError::NotActive);
    }

    let unlocked = enrollment.unlocked_days(Utc::now());
    if dto.day < 1 || dto.day > unlocked {
        return Err(ProgressError::DayLocked {
            day: dto.day,
            unlocked,
        });
    }

    let progress =
        DayProgress::new_for_insert(dto.user_id, dto.marathon_id, dto.day, dto.exercise_id);
    repository::mark_completed(db, &progress).await?;
    Ok(())
}

/// Отметки за день (для контент-слоя)
pub async fn list_for_day(
    db: &DatabaseConnection,
    user_id: &str,
    marathon_id: &str,
    day: i32,
) -> anyhow::Result<Vec<DayProgress>> {
    repository::list_for_day(db, user_id, marathon_id, day).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::a002_enrollment::service as enrollment_service;
    use crate::shared::data::db::initialize_in_memory;
    use chrono::Duration;
    use contracts::domain::a002_enrollment::aggregate::EnrollmentDto;

    async fn seed_active(db: &DatabaseConnection, hours_ago: i64) {
        let mut enrollment = enrollment_service::preregister(
            db,
            EnrollmentDto {
                user_id: "user-1".into(),
                marathon_id: "mar-1".into(),
                total_days: 28,
            },
        )
        .await
        .unwrap();
        enrollment.status = EnrollmentStatus::Active;
        enrollment.is_paid = true;
        enrollment.enrolled_at = Some(Utc::now() - Duration::hours(hours_ago));
        enrollment.before_write();
        enrollment.base.metadata.increment_version();
        enrollment_repository::update(db, &enrollment).await.unwrap();
    }

    fn dto(day: i32, exercise_id: &str) -> DayProgressDto {
        DayProgressDto {
            user_id: "user-1".into(),
            marathon_id: "mar-1".into(),
            day,
            exercise_id: exercise_id.into(),
        }
    }

    #[tokio::test]
    async fn test_exercise_in_locked_day_is_rejected() {
        let db = initialize_in_memory().await.unwrap();
        seed_active(&db, 1).await;

        let result = mark_exercise_complete(&db, dto(2, "ex-1")).await;
        assert!(matches!(result, Err(ProgressError::DayLocked { .. })));
    }

    #[tokio::test]
    async fn test_exercise_marking_is_upsert() {
        let db = initialize_in_memory().await.unwrap();
        seed_active(&db, 1).await;

        mark_exercise_complete(&db, dto(1, "ex-1")).await.unwrap();
        mark_exercise_complete(&db, dto(1, "ex-1")).await.unwrap();
        mark_exercise_complete(&db, dto(1, "ex-2")).await.unwrap();

        let marks = list_for_day(&db, "user-1", "mar-1", 1).await.unwrap();
        assert_eq!(marks.len(), 2);
        assert!(marks.iter().all(|m| m.completed));
    }
}
