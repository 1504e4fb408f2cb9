use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    Hash,
    ToSchema,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderItemType {
    #[sea_orm(string_value = "ticket")]
    Ticket,
    #[sea_orm(string_value = "hotel")]
    Hotel,
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderItemStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "success")]
    Success,
    #[sea_orm(string_value = "failed")]
    Failed,
}

impl OrderItemStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, OrderItemStatus::Success | OrderItemStatus::Failed)
    }

    /// PENDING -> PROCESSING -> SUCCESS | FAILED
    pub fn can_transition_to(&self, next: OrderItemStatus) -> bool {
        matches!(
            (self, next),
            (OrderItemStatus::Pending, OrderItemStatus::Processing)
                | (OrderItemStatus::Processing, OrderItemStatus::Success)
                | (OrderItemStatus::Processing, OrderItemStatus::Failed)
        )
    }
}

impl std::fmt::Display for OrderItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderItemStatus::Pending => write!(f, "PENDING"),
            OrderItemStatus::Processing => write!(f, "PROCESSING"),
            OrderItemStatus::Success => write!(f, "SUCCESS"),
            OrderItemStatus::Failed => write!(f, "FAILED"),
        }
    }
}

/// 订单拆分后的资源子单（门票 / 酒店），随主单级联删除
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "pkg_order_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub order_id: i64,
    pub item_type: OrderItemType,
    pub resource_id: i64,
    pub resource_name: String,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total_price: Decimal,
    pub status: OrderItemStatus,
    pub resource_order_no: Option<String>,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
