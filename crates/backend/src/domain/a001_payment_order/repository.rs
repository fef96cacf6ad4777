use anyhow::Context;
use chrono::{DateTime, Utc};
use contracts::domain::a001_payment_order::aggregate::{
    OrderStatus, PaymentOrder, PaymentOrderId, ProductRef,
};
use contracts::domain::common::{BaseAggregate, EntityMetadata};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use sea_orm::entity::prelude::*;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};

use crate::domain::a006_entitlement_grant::repository as grant_repository;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "a001_payment_order")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub order_number: String,
    pub description: String,
    pub user_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub gateway_order_id: Option<String>,
    pub payment_method: Option<String>,
    pub product_json: String,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
    pub updated_at: Option<chrono::DateTime<chrono::Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for PaymentOrder {
    type Error = anyhow::Error;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let metadata = EntityMetadata {
            created_at: m.created_at.unwrap_or_else(Utc::now),
            updated_at: m.updated_at.unwrap_or_else(Utc::now),
            version: m.version,
        };
        let uuid = Uuid::parse_str(&m.id).unwrap_or_else(|_| Uuid::new_v4());
        let status = OrderStatus::from_str(&m.status)
            .map_err(|e| anyhow::anyhow!("Order {}: {}", m.order_number, e))?;
        let product: ProductRef = serde_json::from_str(&m.product_json)
            .with_context(|| format!("Order {}: bad product payload", m.order_number))?;

        Ok(PaymentOrder {
            base: BaseAggregate::with_metadata(
                PaymentOrderId(uuid),
                m.order_number,
                m.description,
                metadata,
            ),
            user_id: m.user_id,
            amount: m.amount,
            currency: m.currency,
            status,
            gateway_order_id: m.gateway_order_id,
            payment_method: m.payment_method,
            product,
        })
    }
}

pub async fn insert<C: ConnectionTrait>(db: &C, order: &PaymentOrder) -> anyhow::Result<()> {
    let active = ActiveModel {
        id: Set(order.base.id.value().to_string()),
        order_number: Set(order.base.code.clone()),
        description: Set(order.base.description.clone()),
        user_id: Set(order.user_id.clone()),
        amount: Set(order.amount),
        currency: Set(order.currency.clone()),
        status: Set(order.status.as_str().to_string()),
        gateway_order_id: Set(order.gateway_order_id.clone()),
        payment_method: Set(order.payment_method.clone()),
        product_json: Set(serde_json::to_string(&order.product)?),
        created_at: Set(Some(order.base.metadata.created_at)),
        updated_at: Set(Some(order.base.metadata.updated_at)),
        version: Set(order.base.metadata.version),
    };
    active.insert(db).await?;
    Ok(())
}

pub async fn get_by_order_number<C: ConnectionTrait>(
    db: &C,
    order_number: &str,
) -> anyhow::Result<Option<PaymentOrder>> {
    let result = Entity::find()
        .filter(Column::OrderNumber.eq(order_number))
        .one(db)
        .await?;
    result.map(PaymentOrder::try_from).transpose()
}

pub async fn get_by_gateway_order_id<C: ConnectionTrait>(
    db: &C,
    gateway_order_id: &str,
) -> anyhow::Result<Option<PaymentOrder>> {
    let result = Entity::find()
        .filter(Column::GatewayOrderId.eq(gateway_order_id))
        .one(db)
        .await?;
    result.map(PaymentOrder::try_from).transpose()
}

/// Сохранить ссылку на заказ в шлюзе после успешной регистрации
pub async fn set_gateway_registration<C: ConnectionTrait>(
    db: &C,
    order_number: &str,
    gateway_order_id: &str,
) -> anyhow::Result<()> {
    Entity::update_many()
        .col_expr(Column::GatewayOrderId, Expr::value(gateway_order_id))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(Column::OrderNumber.eq(order_number))
        .exec(db)
        .await?;
    Ok(())
}

/// Compare-and-set перевода статуса.
///
/// Единственная точка записи `status`. Переход применяется одним UPDATE
/// с фильтром по допустимым исходным статусам; `rows_affected > 0`
/// означает, что переход принят. Терминальный заказ фильтр не пройдёт,
/// и повторный poll/callback будет молча отброшен — в этом вся защита
/// от гонки двух каналов сверки.
pub async fn cas_transition<C: ConnectionTrait>(
    db: &C,
    order_number: &str,
    to: OrderStatus,
    payment_method: Option<&str>,
) -> anyhow::Result<bool> {
    let from: &[&str] = match to {
        // Повторный перевод в pending не имеет смысла
        OrderStatus::Pending => return Ok(false),
        OrderStatus::Processing => &["pending"],
        OrderStatus::Succeeded | OrderStatus::Failed | OrderStatus::Cancelled => {
            &["pending", "processing"]
        }
        // Единственный разрешённый выход из терминального статуса
        OrderStatus::Refunded => &["succeeded"],
    };

    let mut update = Entity::update_many()
        .col_expr(Column::Status, Expr::value(to.as_str()))
        .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
        .col_expr(Column::Version, Expr::col(Column::Version).add(1));
    if let Some(method) = payment_method {
        update = update.col_expr(Column::PaymentMethod, Expr::value(method));
    }

    let result = update
        .filter(Column::OrderNumber.eq(order_number))
        .filter(Column::Status.is_in(from.iter().copied()))
        .exec(db)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Брошенные заказы: pending старше отсечки
pub async fn list_stale_pending<C: ConnectionTrait>(
    db: &C,
    created_before: DateTime<Utc>,
) -> anyhow::Result<Vec<PaymentOrder>> {
    let rows = Entity::find()
        .filter(Column::Status.eq(OrderStatus::Pending.as_str()))
        .filter(Column::CreatedAt.lt(created_before))
        .all(db)
        .await?;
    rows.into_iter().map(PaymentOrder::try_from).collect()
}

/// Оплаченные заказы без маркера выдачи (разрыв "succeeded без гранта")
pub async fn list_succeeded_without_grant<C: ConnectionTrait>(
    db: &C,
    updated_before: DateTime<Utc>,
) -> anyhow::Result<Vec<PaymentOrder>> {
    let granted = Query::select()
        .column(grant_repository::Column::OrderNumber)
        .from(grant_repository::Entity)
        .to_owned();

    let rows = Entity::find()
        .filter(Column::Status.eq(OrderStatus::Succeeded.as_str()))
        .filter(Column::UpdatedAt.lt(updated_before))
        .filter(Column::OrderNumber.not_in_subquery(granted))
        .all(db)
        .await?;
    rows.into_iter().map(PaymentOrder::try_from).collect()
}
