use crate::domain::common::{
    AggregateId, AggregateRoot, BaseAggregate, EntityMetadata, Origin,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// ID Type
// ============================================================================

/// Уникальный идентификатор отметки прогресса
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DayProgressId(pub Uuid);

impl DayProgressId {
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

impl AggregateId for DayProgressId {
    fn as_string(&self) -> String {
        self.0.to_string()
    }

    fn from_string(s: &str) -> Result<Self, String> {
        Uuid::parse_str(s)
            .map(DayProgressId::new)
            .map_err(|e| format!("Invalid UUID: {}", e))
    }
}

// ============================================================================
// Aggregate Root
// ============================================================================

/// Отметка выполнения упражнения в рамках дня марафона
///
/// Одна запись на (user, marathon, day, exercise).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayProgress {
    #[serde(flatten)]
    pub base: BaseAggregate<DayProgressId>,

    #[serde(rename = "userId")]
    pub user_id: String,

    #[serde(rename = "marathonId")]
    pub marathon_id: String,

    pub day: i32,

    #[serde(rename = "exerciseId")]
    pub exercise_id: String,

    pub completed: bool,
}

impl DayProgress {
    pub fn new_for_insert(
        user_id: String,
        marathon_id: String,
        day: i32,
        exercise_id: String,
    ) -> Self {
        let code = format!("PRG-{}", Uuid::new_v4());
        let description = format!("День {} / {}", day, exercise_id);
        let base = BaseAggregate::new(DayProgressId::new_v4(), code, description);

        Self {
            base,
            user_id,
            marathon_id,
            day,
            exercise_id,
            completed: false,
        }
    }
}

impl AggregateRoot for DayProgress {
    type Id = DayProgressId;

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
        "a004"
    }

    fn collection_name() -> &'static str {
        "day_progress"
    }

    fn element_name() -> &'static str {
        "Прогресс дня"
    }

    fn list_name() -> &'static str {
        "Прогресс дней"
    }

    fn origin() -> Origin {
        Origin::Self_
    }
}

// ============================================================================
// Forms / DTOs
// ============================================================================

/// DTO отметки выполнения упражнения
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayProgressDto {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "marathonId")]
    pub marathon_id: String,
    pub day: i32,
    #[serde(rename = "exerciseId")]
    pub exercise_id: String,
}
