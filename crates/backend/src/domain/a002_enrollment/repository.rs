use anyhow::Context;
use chrono::Utc;
use contracts::domain::a002_enrollment::aggregate::{
    Enrollment, EnrollmentId, EnrollmentStatus,
};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a002_enrollment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub code: String,
    pub description: String,
    pub user_id: String,
    pub marathon_id: String,
    pub status: String,
    pub enrolled_at: Option<chrono::DateTime<chrono::Utc>>,
    pub total_days: i32,
    pub completed_days_json: String,
    pub is_paid: bool,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Enrollment {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());
        let status = EnrollmentStatus::from_str(&m.status)
            .map_err(|e| anyhow::anyhow!("Enrollment {}: {}", m.id, e))?;
        let completed_days: BTreeSet<i32> = serde_json::from_str(&m.completed_days_json)
            .with_context(|| format!("Enrollment {}: bad completed_days payload", m.id))?;

        Ok(Enrollment {
            base: BaseAggregate::with_metadata(
                EnrollmentId(uuid),
                m.code,
                m.description,
                metadata,
            ),
            user_id: m.user_id,
            marathon_id: m.marathon_id,
            status,
            enrolled_at: m.enrolled_at,
            total_days: m.total_days,
            completed_days,
            is_paid: m.is_paid,
        })
    }
}

fn to_active_model(aggregate: &Enrollment) -> anyhow::Result<ActiveModel> {
    Ok(ActiveModel {
        id: Set(aggregate.base.id.value().to_string()),
        code: Set(aggregate.base.code.clone()),
        description: Set(aggregate.base.description.clone()),
        user_id: Set(aggregate.user_id.clone()),
        marathon_id: Set(aggregate.marathon_id.clone()),
        status: Set(aggregate.status.as_str().to_string()),
        enrolled_at: Set(aggregate.enrolled_at),
        total_days: Set(aggregate.total_days),
        completed_days_json: Set(serde_json::to_string(&aggregate.completed_days)?),
        is_paid: Set(aggregate.is_paid),
        created_at: Set(Some(aggregate.base.metadata.created_at)),
        updated_at: Set(Some(aggregate.base.metadata.updated_at)),
        version: Set(aggregate.base.metadata.version),
    })
}

pub async fn insert<C: ConnectionTrait>(db: &C, aggregate: &Enrollment) -> anyhow::Result<Uuid> {
    let uuid = aggregate.base.id.value();
    to_active_model(aggregate)?.insert(db).await?;
    Ok(uuid)
}

pub async fn update<C: ConnectionTrait>(db: &C, aggregate: &Enrollment) -> anyhow::Result<()> {
    let mut active = to_active_model(aggregate)?;
    active.created_at = sea_orm::ActiveValue::NotSet;
    active.update(db).await?;
    Ok(())
}

pub async fn get_by_id<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> anyhow::Result<Option<Enrollment>> {
    let result = Entity::find_by_id(id.to_string()).one(db).await?;
    result.map(Enrollment::try_from).transpose()
}

/// Инвариант уникальности: одна запись на пару (user, marathon)
pub async fn get_by_user_and_marathon<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    marathon_id: &str,
) -> anyhow::Result<Option<Enrollment>> {
    let result = Entity::find()
        .filter(Column::UserId.eq(user_id))
        .filter(Column::MarathonId.eq(marathon_id))
        .one(db)
        .await?;
    result.map(Enrollment::try_from).transpose()
}

/// Optimistic CAS на множестве выполненных дней.
///
/// Обновление проходит только если версия записи не изменилась с момента
/// чтения; иначе вызывающий перечитывает запись и повторяет.
pub async fn cas_completed_days<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    completed_days: &BTreeSet<i32>,
    expected_version: i32,
) -> anyhow::Result<bool> {
    let result = Entity::update_many()
        .col_expr(
            Column::CompletedDaysJson,
            Expr::value(serde_json::to_string(completed_days)?),
        )
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .col_expr(Column::Version, Expr::col(Column::Version).add(1))
        .filter(Column::Id.eq(id.to_string()))
        .filter(Column::Version.eq(expected_version))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}
