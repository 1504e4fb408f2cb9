use crate::entities::daily_price_entity;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 闭区间日期窗口，构造时保证 start <= end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// 产品的有效售卖窗口：配置的售卖期与 [today, today + horizon - 1] 取交集
    pub fn effective(
        today: NaiveDate,
        horizon_days: u32,
        sale_start: Option<NaiveDate>,
        sale_end: Option<NaiveDate>,
    ) -> Option<Self> {
        let horizon_end = today + Duration::days(i64::from(horizon_days.max(1)) - 1);
        let start = sale_start.map_or(today, |s| s.max(today));
        let end = sale_end.map_or(horizon_end, |e| e.min(horizon_end));
        Self::new(start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn len(&self) -> usize {
        (self.end - self.start).num_days() as usize + 1
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take(self.len())
    }
}

/// 单个 (产品, 酒店, 房型, 日期) 的价格
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CellPrice {
    #[schema(value_type = String)]
    pub sale_price: Decimal,
    #[schema(value_type = String)]
    pub cost_price: Decimal,
}

impl CellPrice {
    pub const ZERO: CellPrice = CellPrice {
        sale_price: Decimal::ZERO,
        cost_price: Decimal::ZERO,
    };
}

/// 待写入价格缓存的一行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDailyPrice {
    pub product_id: i64,
    pub hotel_id: i64,
    pub room_type_id: i64,
    pub biz_date: NaiveDate,
    pub sale_price: Decimal,
    pub cost_price: Decimal,
    pub composite_code: String,
    pub last_updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PriceOrigin {
    Cache,
    Live,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DailyPriceResponse {
    pub hotel_id: i64,
    pub room_type_id: i64,
    pub biz_date: NaiveDate,
    #[schema(value_type = String)]
    pub sale_price: Decimal,
    #[schema(value_type = String)]
    pub cost_price: Decimal,
    pub composite_code: String,
}

impl From<daily_price_entity::Model> for DailyPriceResponse {
    fn from(m: daily_price_entity::Model) -> Self {
        Self {
            hotel_id: m.hotel_id,
            room_type_id: m.room_type_id,
            biz_date: m.biz_date,
            sale_price: m.sale_price,
            cost_price: m.cost_price,
            composite_code: m.composite_code,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct DailyPriceQuery {
    pub hotel_id: i64,
    pub room_type_id: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DailyPriceQuery {
    pub fn window(&self) -> Option<DateWindow> {
        DateWindow::new(self.start_date, self.end_date)
    }
}

/// 价格缓存重建结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RebuildOutcome {
    Rebuilt { rows: u64, window: DateWindow },
    /// 售卖窗口为空，产品已有缓存被清理
    WindowClosed { purged: u64 },
    /// 缺少酒店房型或门票，未做任何写入
    MissingLegs,
}
