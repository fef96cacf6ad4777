use chrono::Utc;
use contracts::domain::a004_day_progress::aggregate::{DayProgress, DayProgressId};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a004_day_progress")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub user_id: String,
    pub marathon_id: String,
    pub day: i32,
    pub exercise_id: String,
    pub completed: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for DayProgress {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());

        DayProgress {
            base: BaseAggregate::with_metadata(
                DayProgressId(uuid),
                m.code,
                m.description,
                metadata,
            ),
            user_id: m.user_id,
            marathon_id: m.marathon_id,
            day: m.day,
            exercise_id: m.exercise_id,
            completed: m.completed,
        }
    }
}

/// Отметить упражнение выполненным (upsert по натуральному ключу)
pub async fn mark_completed<C: ConnectionTrait>(
    db: &C,
    progress: &DayProgress,
) -> anyhow::Result<()> {
    let now = Utc::now();
    let active = ActiveModel {
        id: Set(progress.base.id.value().to_string()),
        code: Set(progress.base.code.clone()),
        description: Set(progress.base.description.clone()),
        user_id: Set(progress.user_id.clone()),
        marathon_id: Set(progress.marathon_id.clone()),
        day: Set(progress.day),
        exercise_id: Set(progress.exercise_id.clone()),
        completed: Set(true),
        created_at: Set(Some(now)),
        updated_at: Set(Some(now)),
        version: Set(0),
    };
    Entity::insert(active)
        .on_conflict(
            OnConflict::columns([
                Column::UserId,
                Column::MarathonId,
                Column::Day,
                Column::ExerciseId,
            ])
            .update_columns([Column::Completed, Column::UpdatedAt])
            .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

/// Отметки пользователя за конкретный день марафона
pub async fn list_for_day<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    marathon_id: &str,
    day: i32,
) -> anyhow::Result<Vec<DayProgress>> {
    let rows = Entity::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::MarathonId.eq(marathon_id))
        .filter(Column::Day.eq(day))
        .order_by_asc(Column::ExerciseId)
        .all(db)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}
