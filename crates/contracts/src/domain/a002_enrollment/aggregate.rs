use crate::domain::common::{
    AggregateId, AggregateRoot, BaseAggregate, EntityMetadata, Origin,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

// ============================================================================
// ID Type
// ============================================================================

/// Уникальный идентификатор записи на марафон
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnrollmentId(pub Uuid);

impl EnrollmentId {
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

impl AggregateId for EnrollmentId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(EnrollmentId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

// ============================================================================
// Status
// ============================================================================

/// Статус записи на марафон
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    /// Бесплатная предварительная регистрация (до оплаты)
    Pending,
    Active,
    Completed,
    Cancelled,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Pending => "pending",
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Completed => "completed",
            EnrollmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Result<Self, String> {
        match s {
            "pending" => Ok(EnrollmentStatus::Pending),
            "active" => Ok(EnrollmentStatus::Active),
            "completed" => Ok(EnrollmentStatus::Completed),
            "cancelled" => Ok(EnrollmentStatus::Cancelled),
            other => Err(format!("Unknown enrollment status: {}", other)),
        }
    }
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Запись пользователя на марафон
///
/// Инвариант уникальности: одна запись на пару (user, marathon).
/// `enrolled_at` — нулевой день отсчёта для разблокировки дней;
/// `completed_days ⊆ {1 … total_days}` и только растёт.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    #[serde(flatten)]
    pub base: BaseAggregate<EnrollmentId>,

    #[serde(rename = "userId")]
    pub user_id: String,

    #[serde(rename = "marathonId")]
    pub marathon_id: String,

    pub status: EnrollmentStatus,

    /// Момент активации; None до оплаты/активации
    #[serde(rename = "enrolledAt")]
    pub enrolled_at: Option<DateTime<Utc>>,

    /// Длительность программы в днях
    #[serde(rename = "totalDays")]
    pub total_days: i32,

    /// Номера полностью выполненных дней (set-семантика)
    #[serde(rename = "completedDays")]
    pub completed_days: BTreeSet<i32>,

    /// Выставляется один раз по терминальному статусу заказа
    #[serde(rename = "isPaid")]
    pub is_paid: bool,
}

impl Enrollment {
    /// Создать предварительную (неоплаченную) запись
    pub fn new_for_insert(user_id: String, marathon_id: String, total_days: i32) -> Self {
        let code = format!("ENR-{}", Uuid::new_v4());
        let description = format!("Запись на марафон {}", marathon_id);
        let base = BaseAggregate::new(EnrollmentId::new_v4(), code, description);

        Self {
            base,
            user_id,
            marathon_id,
            status: EnrollmentStatus::Pending,
            enrolled_at: None,
            total_days,
            completed_days: BTreeSet::new(),
            is_paid: false,
        }
    }

    /// Сколько дней разблокировано на момент `now`
    ///
    /// День 1 открыт сразу в момент активации; далее по одному дню
    /// за каждые прошедшие сутки, с ограничением `total_days`.
    /// До активации (`enrolled_at == None`) открыто 0 дней.
    pub fn unlocked_days(&self, now: DateTime<Utc>) -> i32 {
        let Some(enrolled_at) = self.enrolled_at else {
            return 0;
        };
        let elapsed = now.signed_duration_since(enrolled_at);
        if elapsed < chrono::Duration::zero() {
            return 0;
        }
        let unlocked = elapsed.num_days() as i32 + 1;
        unlocked.clamp(1, self.total_days)
    }

    /// Открыт ли день `day` на момент `now`
    pub fn is_day_unlocked(&self, day: i32, now: DateTime<Utc>) -> bool {
        day >= 1 && day <= self.unlocked_days(now)
    }

    /// Полностью ли выполнена неделя `week` (1-based)
    ///
    /// Неделя w закрыта, если все дни 7(w-1)+1 … 7w отмечены выполненными.
    /// Производный признак, нигде не хранится.
    pub fn is_week_completed(&self, week: i32) -> bool {
        if week < 1 {
            return false;
        }
        let first = 7 * (week - 1) + 1;
        let last = 7 * week;
        if last > self.total_days {
            return false;
        }
        (first..=last).all(|d| self.completed_days.contains(&d))
    }

    /// Количество недель программы (неполная неделя в конце не считается)
    pub fn full_weeks(&self) -> i32 {
        self.total_days / 7
    }

    /// Валидация данных
    pub fn validate(&self) -> Result<(), String> {
        if self.user_id.trim().is_empty() {
            return Err("Не указан пользователь".into());
        }
        if self.marathon_id.trim().is_empty() {
            return Err("Не указан марафон".into());
        }
        if self.total_days <= 0 {
            return Err("Длительность марафона должна быть положительной".into());
        }
        if let Some(day) = self.completed_days.iter().find(|d| **d < 1 || **d > self.total_days)
        {
            return Err(format!("Недопустимый номер дня: {}", day));
        }
        Ok(())
    }

    /// Хук перед записью
    pub fn before_write(&mut self) {
        self.base.touch();
    }
}

impl AggregateRoot for Enrollment {
    type Id = EnrollmentId;

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
        "a002"
    }

    fn collection_name() -> &'static str {
        "enrollment"
    }

    fn element_name() -> &'static str {
        "Запись на марафон"
    }

    fn list_name() -> &'static str {
        "Записи на марафоны"
    }

    fn origin() -> Origin {
        Origin::Self_
    }
}

// ============================================================================
// Forms / DTOs
// ============================================================================

/// DTO предварительной регистрации на марафон
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentDto {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "marathonId")]
    pub marathon_id: String,
    #[serde(rename = "totalDays")]
    pub total_days: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn enrollment_at(enrolled_at: DateTime<Utc>, total_days: i32) -> Enrollment {
        let mut e = Enrollment::new_for_insert("user-1".into(), "mar-1".into(), total_days);
        e.status = EnrollmentStatus::Active;
        e.enrolled_at = Some(enrolled_at);
        e
    }

    #[test]
    fn test_day_one_unlocked_at_enrollment() {
        let t = Utc::now();
        let e = enrollment_at(t, 28);
        assert_eq!(e.unlocked_days(t), 1);
    }

    #[test]
    fn test_unlocked_days_after_three_days_and_hour() {
        let t = Utc::now();
        let e = enrollment_at(t, 28);
        let now = t + Duration::days(3) + Duration::hours(1);
        assert_eq!(e.unlocked_days(now), 4);
        assert!(e.is_day_unlocked(3, now));
        assert!(!e.is_day_unlocked(5, now));
    }

    #[test]
    fn test_unlocked_days_clamped_to_total() {
        let t = Utc::now();
        let e = enrollment_at(t, 28);
        assert_eq!(e.unlocked_days(t + Duration::days(100)), 28);
    }

    #[test]
    fn test_unlocked_days_monotonic() {
        let t = Utc::now();
        let e = enrollment_at(t, 28);
        let mut prev = 0;
        for hours in (0..24 * 30).step_by(7) {
            let unlocked = e.unlocked_days(t + Duration::hours(hours));
            assert!(unlocked >= prev);
            prev = unlocked;
        }
    }

    #[test]
    fn test_not_unlocked_before_activation() {
        let mut e = Enrollment::new_for_insert("user-1".into(), "mar-1".into(), 28);
        assert_eq!(e.unlocked_days(Utc::now()), 0);
        e.enrolled_at = Some(Utc::now() + Duration::days(1));
        assert_eq!(e.unlocked_days(Utc::now()), 0);
    }

    #[test]
    fn test_week_completed_requires_all_seven_days() {
        let t = Utc::now();
        let mut e = enrollment_at(t, 28);
        for day in 1..=6 {
            e.completed_days.insert(day);
        }
        assert!(!e.is_week_completed(1));
        e.completed_days.insert(7);
        assert!(e.is_week_completed(1));
        assert!(!e.is_week_completed(2));
    }

    #[test]
    fn test_validate_rejects_out_of_range_days() {
        let t = Utc::now();
        let mut e = enrollment_at(t, 28);
        e.completed_days.insert(29);
        assert!(e.validate().is_err());
    }
}
