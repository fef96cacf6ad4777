use super::repository;
use chrono::Utc;
use contracts::domain::a002_enrollment::aggregate::{
    Enrollment, EnrollmentDto, EnrollmentStatus,
};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

/// Максимум повторов optimistic CAS при конкурентных отметках
const CAS_MAX_ATTEMPTS: u32 = 5;

/// Ошибки гейта прогрессии
#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    /// День ещё закрыт: пользователь может подождать и повторить
    #[error("день {day} ещё закрыт (открыто дней: {unlocked})")]
    DayLocked { day: i32, unlocked: i32 },

    #[error("запись на марафон не найдена")]
    NotFound,

    #[error("запись на марафон не активна")]
    NotActive,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Итог по неделе марафона (производный, нигде не хранится)
#[derive(Debug, Clone, serde::Serialize)]
pub struct WeekSummary {
    pub week: i32,
    pub completed: bool,
}

/// Предварительная (бесплатная) регистрация на марафон
///
/// Создаёт pending-запись без оплаты; повторный вызов для той же пары
/// (user, marathon) возвращает существующую запись.
pub async fn preregister(
    db: &DatabaseConnection,
    dto: EnrollmentDto,
) -> anyhow::Result<Enrollment> {
    if let Some(existing) =
        repository::get_by_user_and_marathon(db, &dto.user_id, &dto.marathon_id).await?
    {
        return Ok(existing);
    }

    let mut aggregate =
        Enrollment::new_for_insert(dto.user_id, dto.marathon_id, dto.total_days);

    aggregate
        .validate()
        .map_err(|e| anyhow::anyhow!("Validation failed: {}", e))?;

    aggregate.before_write();

    repository::insert(db, &aggregate).await?;
    Ok(aggregate)
}

/// Сколько дней открыто на текущий момент
pub async fn unlocked_days(db: &DatabaseConnection, id: Uuid) -> Result<i32, ProgressError> {
    let enrollment = repository::get_by_id(db, id)
        .await?
        .ok_or(ProgressError::NotFound)?;
    Ok(enrollment.unlocked_days(Utc::now()))
}

/// Отметить день выполненным.
///
/// Разблокировка — чистая функция времени, поэтому проверка и запись
/// не требуют блокировок: только optimistic CAS по версии записи.
/// Повторная отметка уже выполненного дня — no-op, не ошибка.
pub async fn mark_day_complete(
    db: &DatabaseConnection,
    id: Uuid,
    day: i32,
) -> Result<(), ProgressError> {
    for _ in 0..CAS_MAX_ATTEMPTS {
        let enrollment = repository::get_by_id(db, id)
            .await?
            .ok_or(ProgressError::NotFound)?;

        if enrollment.status != EnrollmentStatus::Active {
            return Err(ProgressError::NotActive);
        }

        let now = Utc::now();
        let unlocked = enrollment.unlocked_days(now);
        if day < 1 || day > unlocked {
            return Err(ProgressError::DayLocked { day, unlocked });
        }

        if enrollment.completed_days.contains(&day) {
            // set-семантика: день уже отмечен
            return Ok(());
        }

        let mut days = enrollment.completed_days.clone();
        days.insert(day);

        let applied =
            repository::cas_completed_days(db, id, &days, enrollment.base.metadata.version)
                .await?;
        if applied {
            return Ok(());
        }
        // Версия ушла вперёд: перечитываем и повторяем
    }

    Err(ProgressError::Internal(anyhow::anyhow!(
        "completed_days CAS exhausted {} attempts",
        CAS_MAX_ATTEMPTS
    )))
}

/// Сводка по полным неделям программы
pub async fn week_summaries(
    db: &DatabaseConnection,
    id: Uuid,
) -> Result<Vec<WeekSummary>, ProgressError> {
    let enrollment = repository::get_by_id(db, id)
        .await?
        .ok_or(ProgressError::NotFound)?;

    let summaries = (1..=enrollment.full_weeks())
        .map(|week| WeekSummary {
            week,
            completed: enrollment.is_week_completed(week),
        })
        .collect();
    Ok(summaries)
}
