use crate::entities::{
    PriceSource, bundle_item_entity, hotel_daily_stock_entity, hotel_room_type_entity,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// 酒店某房型某日的房价库存
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct HotelStockInput {
    pub hotel_id: i64,
    pub room_type_id: i64,
    pub biz_date: NaiveDate,
    #[schema(value_type = String)]
    pub sale_price: Decimal,
    #[schema(value_type = String)]
    pub cost_price: Decimal,
    pub stock_total: i32,
    pub stock_available: i32,
    #[serde(default = "default_price_source")]
    pub price_source: PriceSource,
}

fn default_price_source() -> PriceSource {
    PriceSource::Manual
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct HotelStockBatchRequest {
    pub items: Vec<HotelStockInput>,
}

/// 门票某日价格
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct TicketPriceInput {
    pub ticket_id: i64,
    pub biz_date: NaiveDate,
    #[schema(value_type = String)]
    pub sale_price: Decimal,
    #[schema(value_type = String)]
    pub cost_price: Decimal,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct TicketPriceBatchRequest {
    pub items: Vec<TicketPriceInput>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockBatchResponse {
    pub saved: usize,
}

/// 要删除的酒店房价库存行
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct HotelStockKey {
    pub hotel_id: i64,
    pub room_type_id: i64,
    pub biz_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct HotelStockDeleteRequest {
    pub items: Vec<HotelStockKey>,
}

/// 要删除的门票价格行
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct TicketPriceKey {
    pub ticket_id: i64,
    pub biz_date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct TicketPriceDeleteRequest {
    pub items: Vec<TicketPriceKey>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StockDeleteResponse {
    pub deleted: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HotelStockResponse {
    pub id: i64,
    pub hotel_id: i64,
    pub room_type_id: i64,
    pub biz_date: NaiveDate,
    #[schema(value_type = String)]
    pub sale_price: Decimal,
    pub stock_available: i32,
}

impl From<hotel_daily_stock_entity::Model> for HotelStockResponse {
    fn from(m: hotel_daily_stock_entity::Model) -> Self {
        Self {
            id: m.id,
            hotel_id: m.hotel_id,
            room_type_id: m.room_type_id,
            biz_date: m.biz_date,
            sale_price: m.sale_price,
            stock_available: m.stock_available,
        }
    }
}

/// 产品增加门票
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct BundleItemRequest {
    pub ticket_id: i64,
    pub quantity: i32,
}

/// 产品增加酒店房型
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct HotelRoomTypeRequest {
    pub hotel_id: i64,
    pub room_type_id: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BundleItemResponse {
    pub id: i64,
    pub product_id: i64,
    pub ticket_id: i64,
    pub quantity: i32,
}

impl From<bundle_item_entity::Model> for BundleItemResponse {
    fn from(m: bundle_item_entity::Model) -> Self {
        Self {
            id: m.id,
            product_id: m.product_id,
            ticket_id: m.ticket_id,
            quantity: m.quantity,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HotelRoomTypeResponse {
    pub id: i64,
    pub product_id: i64,
    pub hotel_id: i64,
    pub room_type_id: i64,
    pub is_active: bool,
}

impl From<hotel_room_type_entity::Model> for HotelRoomTypeResponse {
    fn from(m: hotel_room_type_entity::Model) -> Self {
        Self {
            id: m.id,
            product_id: m.product_id,
            hotel_id: m.hotel_id,
            room_type_id: m.room_type_id,
            is_active: m.is_active,
        }
    }
}
