use super::EnableStatus;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;

/// 打包产品（酒店 + 门票），软删除
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "pkg_products")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub code: String,
    pub name: String,
    /// 入住晚数
    pub stay_days: i32,
    pub status: EnableStatus,
    pub sale_start_date: Option<NaiveDate>,
    pub sale_end_date: Option<NaiveDate>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn is_enabled(&self) -> bool {
        self.status == EnableStatus::Enabled && self.deleted_at.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
