use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Премиум-доступ пользователя
///
/// Регистр: одна запись на пользователя, ключ — `user_id`.
/// Покупки складываются: каждая новая продлевает окно от
/// `max(now, premium_until)`, а не перезаписывает его.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PremiumAccess {
    #[serde(rename = "userId")]
    pub user_id: String,

    /// Конец премиум-окна
    #[serde(rename = "premiumUntil")]
    pub premium_until: DateTime<Utc>,

    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

impl PremiumAccess {
    /// Действует ли премиум-доступ на момент `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.premium_until
    }

    /// Новый конец окна при продлении на `duration_days` в момент `now`
    ///
    /// Отсчёт от максимума из `now` и текущего конца окна — повторные
    /// покупки продлевают, истёкшее окно начинается заново от `now`.
    pub fn extended_until(
        current: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        duration_days: i64,
    ) -> DateTime<Utc> {
        let from = match current {
            Some(until) if until > now => until,
            _ => now,
        };
        from + chrono::Duration::days(duration_days)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_extend_from_now_when_expired() {
        let now = Utc::now();
        let until = PremiumAccess::extended_until(Some(now - Duration::days(5)), now, 30);
        assert_eq!(until, now + Duration::days(30));
    }

    #[test]
    fn test_extend_stacks_on_active_window() {
        let now = Utc::now();
        let current = now + Duration::days(10);
        let until = PremiumAccess::extended_until(Some(current), now, 30);
        assert_eq!(until, current + Duration::days(30));
    }

    #[test]
    fn test_extend_without_existing_record() {
        let now = Utc::now();
        let until = PremiumAccess::extended_until(None, now, 7);
        assert_eq!(until, now + Duration::days(7));
    }
}
