use crate::domain::common::{
    AggregateId, AggregateRoot, BaseAggregate, EntityMetadata, Origin,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Срок действия разовой покупки упражнения
pub const PURCHASE_VALIDITY_DAYS: i64 = 30;

// ============================================================================
// ID Type
// ============================================================================

/// Уникальный идентификатор покупки упражнения
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExercisePurchaseId(pub Uuid);

impl ExercisePurchaseId {
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

impl AggregateId for ExercisePurchaseId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(ExercisePurchaseId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Разовая покупка упражнения
///
/// Одна запись на пару (user, exercise); доступ открыт пока
/// `now < expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExercisePurchase {
    #[serde(flatten)]
    pub base: BaseAggregate<ExercisePurchaseId>,

    #[serde(rename = "userId")]
    pub user_id: String,

    #[serde(rename = "exerciseId")]
    pub exercise_id: String,

    #[serde(rename = "purchasedAt")]
    pub purchased_at: DateTime<Utc>,

    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
}

impl ExercisePurchase {
    /// Создать покупку со сроком действия от момента `now`
    pub fn new_for_insert(user_id: String, exercise_id: String, now: DateTime<Utc>) -> Self {
        let code = format!("PUR-{}", Uuid::new_v4());
        let description = format!("Покупка упражнения {}", exercise_id);
        let base = BaseAggregate::new(ExercisePurchaseId::new_v4(), code, description);

        Self {
            base,
            user_id,
            exercise_id,
            purchased_at: now,
            expires_at: now + chrono::Duration::days(PURCHASE_VALIDITY_DAYS),
        }
    }

    /// Действует ли покупка на момент `now`
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

impl AggregateRoot for ExercisePurchase {
    type Id = ExercisePurchaseId;

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
        "a003"
    }

    fn collection_name() -> &'static str {
        "exercise_purchase"
    }

    fn element_name() -> &'static str {
        "Покупка упражнения"
    }

    fn list_name() -> &'static str {
        "Покупки упражнений"
    }

    fn origin() -> Origin {
        Origin::Self_
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_purchase_expires_after_thirty_days() {
        let now = Utc::now();
        let p = ExercisePurchase::new_for_insert("user-1".into(), "ex-1".into(), now);
        assert_eq!(p.expires_at, now + Duration::days(30));
        assert!(p.is_active(now));
        assert!(p.is_active(now + Duration::days(29)));
        assert!(!p.is_active(now + Duration::days(30)));
    }
}
