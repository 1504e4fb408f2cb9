use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(32))")]
#[serde(rename_all = "snake_case")]
pub enum ExceptionType {
    #[sea_orm(string_value = "split_failed")]
    SplitFailed,
    #[sea_orm(string_value = "ticket_order_failed")]
    TicketOrderFailed,
    #[sea_orm(string_value = "hotel_order_failed")]
    HotelOrderFailed,
    #[sea_orm(string_value = "price_mismatch")]
    PriceMismatch,
    #[sea_orm(string_value = "inventory_insufficient")]
    InventoryInsufficient,
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExceptionStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "processing")]
    Processing,
    #[sea_orm(string_value = "resolved")]
    Resolved,
}

impl std::fmt::Display for ExceptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExceptionStatus::Pending => write!(f, "PENDING"),
            ExceptionStatus::Processing => write!(f, "PROCESSING"),
            ExceptionStatus::Resolved => write!(f, "RESOLVED"),
        }
    }
}

/// 需要人工介入的异常单
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "exception_orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub order_id: i64,
    pub exception_type: ExceptionType,
    pub status: ExceptionStatus,
    pub exception_data: Json,
    pub handler: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolve_remark: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
