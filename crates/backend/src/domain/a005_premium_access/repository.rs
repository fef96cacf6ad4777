use chrono::{DateTime, Utc};
use contracts::domain::a005_premium_access::aggregate::PremiumAccess;
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ConnectionTrait, EntityTrait, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a005_premium_access")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: String,
    pub premium_until: chrono::DateTime<chrono::Utc>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for PremiumAccess {
    fn from(m: Model) -> Self {
        PremiumAccess {
            user_id: m.user_id,
            premium_until: m.premium_until,
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
        }
    }
}

pub async fn get_by_user<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
) -> anyhow::Result<Option<PremiumAccess>> {
    let result = Entity::find_by_id(user_id.to_string()).one(db).await?;
    Ok(result.map(Into::into))
}

/// Записать новый конец премиум-окна (insert или update)
pub async fn set_until<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    premium_until: DateTime<Utc>,
) -> anyhow::Result<()> {
    let active = ActiveModel {
        user_id: Set(user_id.to_string()),
        premium_until: Set(premium_until),
        updated_at: Set(Some(Utc::now())),
    };
    Entity::insert(active)
        .on_conflict(
            OnConflict::column(Column::UserId)
                .update_columns([Column::PremiumUntil, Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}
