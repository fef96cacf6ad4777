use chrono::Utc;
use contracts::domain::a003_exercise_purchase::aggregate::{
    ExercisePurchase, ExercisePurchaseId,
};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a003_exercise_purchase")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub user_id: String,
    pub exercise_id: String,
    pub purchased_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ExercisePurchase {
    fn from(m: Model) -> Self {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());

        ExercisePurchase {
            base: BaseAggregate::with_metadata(
                ExercisePurchaseId(uuid),
                m.code,
                m.description,
                metadata,
            ),
            user_id: m.user_id,
            exercise_id: m.exercise_id,
            purchased_at: m.purchased_at,
            expires_at: m.expires_at,
        }
    }
}

/// Вставить покупку, если пары (user, exercise) ещё нет.
///
/// Повторная успешная оплата того же упражнения не перезаписывает
/// `expires_at` первой выдачи. `false` — запись уже существовала.
pub async fn insert_if_absent<C: ConnectionTrait>(
    db: &C,
    purchase: &ExercisePurchase,
) -> anyhow::Result<bool> {
    let active = ActiveModel {
        id: Set(purchase.base.id.value().to_string()),
        code: Set(purchase.base.code.clone()),
        description: Set(purchase.base.description.clone()),
        user_id: Set(purchase.user_id.clone()),
        exercise_id: Set(purchase.exercise_id.clone()),
        purchased_at: Set(purchase.purchased_at),
        expires_at: Set(purchase.expires_at),
        created_at: Set(Some(purchase.base.metadata.created_at)),
        updated_at: Set(Some(purchase.base.metadata.updated_at)),
        version: Set(purchase.base.metadata.version),
    };
    let inserted = Entity::insert(active)
        .on_conflict(
            OnConflict::columns([Column::UserId, Column::ExerciseId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(inserted > 0)
}

pub async fn get_by_user_and_exercise<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    exercise_id: &str,
) -> anyhow::Result<Option<ExercisePurchase>> {
    let result = Entity::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::ExerciseId.eq(exercise_id))
        .one(db)
        .await?;
    Ok(result.map(Into::into))
}
