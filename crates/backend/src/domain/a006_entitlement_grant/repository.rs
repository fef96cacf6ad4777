//! Маркеры выдачи доступа
//!
//! Технический регистр без агрегата: одна строка на orderNumber.
//! Конфликт по первичному ключу — это и есть ключ идемпотентности
//! грантера: повторная выдача по тому же заказу не проходит.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a006_entitlement_grant")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub order_number: String,
    pub product_type: String,
    pub granted_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Вставить маркер выдачи; `false` — маркер уже был (повторный грант)
pub async fn insert_marker<C: ConnectionTrait>(
    db: &C,
    order_number: &str,
    product_type: &str,
) -> anyhow::Result<bool> {
    let active = ActiveModel {
        order_number: Set(order_number.to_string()),
        product_type: Set(product_type.to_string()),
        granted_at: Set(Utc::now()),
    };
    let inserted = Entity::insert(active)
        .on_conflict(
            OnConflict::column(Column::OrderNumber)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(inserted > 0)
}

pub async fn exists<C: ConnectionTrait>(db: &C, order_number: &str) -> anyhow::Result<bool> {
    let found = Entity::find()
        .filter(Column::OrderNumber.eq(order_number))
        .one(db)
        .await?;
    Ok(found.is_some())
}
