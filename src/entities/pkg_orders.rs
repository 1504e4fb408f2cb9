use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 对接的 OTA 平台
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
#[serde(rename_all = "snake_case")]
pub enum OtaPlatform {
    #[sea_orm(string_value = "ctrip")]
    Ctrip,
    #[sea_orm(string_value = "meituan")]
    Meituan,
    #[sea_orm(string_value = "fliggy")]
    Fliggy,
}

impl OtaPlatform {
    pub const ALL: [OtaPlatform; 3] = [OtaPlatform::Ctrip, OtaPlatform::Meituan, OtaPlatform::Fliggy];

    pub fn code(&self) -> &'static str {
        match self {
            OtaPlatform::Ctrip => "ctrip",
            OtaPlatform::Meituan => "meituan",
            OtaPlatform::Fliggy => "fliggy",
        }
    }
}

impl std::fmt::Display for OtaPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for OtaPlatform {
    type Err = crate::error::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ctrip" => Ok(OtaPlatform::Ctrip),
            "meituan" => Ok(OtaPlatform::Meituan),
            "fliggy" => Ok(OtaPlatform::Fliggy),
            other => Err(crate::error::AppError::Unsupported(format!(
                "unsupported OTA platform: {other}"
            ))),
        }
    }
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "String(Some(16))")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[sea_orm(string_value = "paid")]
    Paid,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Paid)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Paid => write!(f, "PAID"),
            OrderStatus::Confirmed => write!(f, "CONFIRMED"),
            OrderStatus::Failed => write!(f, "FAILED"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "pkg_orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub order_no: String,
    pub ota_order_no: String,
    pub platform: OtaPlatform,
    pub product_id: i64,
    pub hotel_id: i64,
    pub room_type_id: i64,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub quantity: i32,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub unit_price: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub total_amount: Decimal,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub settlement_amount: Decimal,
    pub status: OrderStatus,
    pub contact_name: String,
    pub contact_phone: String,
    pub remark: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
