use crate::entities::{
    ExceptionStatus, ExceptionType, OrderItemStatus, OrderItemType, OrderStatus, OtaPlatform,
    exception_order_entity, order_entity, order_item_entity,
};
use crate::models::PriceOrigin;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// OTA 回调：询价
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PriceQueryRequest {
    /// 产品编码 PKG|房型|酒店|产品
    pub product_code: String,
    pub check_in_date: NaiveDate,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PriceQueryResponse {
    pub product_code: String,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    #[schema(value_type = String)]
    pub sale_price: Decimal,
    #[schema(value_type = String)]
    pub cost_price: Decimal,
    /// 入住期间最小可用库存
    pub available: i32,
    pub bookable: bool,
    pub price_origin: PriceOrigin,
}

/// OTA 回调：下单（已支付）
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateOtaOrderRequest {
    pub ota_order_no: String,
    pub product_code: String,
    pub check_in_date: NaiveDate,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    /// OTA 侧收取的总金额，用于价格校验
    #[schema(value_type = Option<String>)]
    pub total_amount: Option<Decimal>,
    pub contact_name: String,
    pub contact_phone: String,
    pub remark: Option<String>,
}

fn default_quantity() -> i32 {
    1
}

/// 待写入的订单
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub order_no: String,
    pub ota_order_no: String,
    pub platform: OtaPlatform,
    pub product_id: i64,
    pub hotel_id: i64,
    pub room_type_id: i64,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub settlement_amount: Decimal,
    pub contact_name: String,
    pub contact_phone: String,
    pub remark: Option<String>,
    pub paid_at: DateTime<Utc>,
}

/// 待写入的子单
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrderItem {
    pub item_type: OrderItemType,
    pub resource_id: i64,
    pub resource_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    pub max_retries: i32,
}

/// 子单状态变更后要落库的结果字段
#[derive(Debug, Clone, Default)]
pub struct ItemResolution {
    pub resource_order_no: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewExceptionOrder {
    pub order_id: i64,
    pub exception_type: ExceptionType,
    pub exception_data: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderItemResponse {
    pub id: i64,
    pub item_type: OrderItemType,
    pub resource_id: i64,
    pub resource_name: String,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub unit_price: Decimal,
    #[schema(value_type = String)]
    pub total_price: Decimal,
    pub status: OrderItemStatus,
    pub resource_order_no: Option<String>,
    pub error_message: Option<String>,
}

impl From<order_item_entity::Model> for OrderItemResponse {
    fn from(m: order_item_entity::Model) -> Self {
        Self {
            id: m.id,
            item_type: m.item_type,
            resource_id: m.resource_id,
            resource_name: m.resource_name,
            quantity: m.quantity,
            unit_price: m.unit_price,
            total_price: m.total_price,
            status: m.status,
            resource_order_no: m.resource_order_no,
            error_message: m.error_message,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderResponse {
    pub order_no: String,
    pub ota_order_no: String,
    pub platform: OtaPlatform,
    pub product_id: i64,
    pub hotel_id: i64,
    pub room_type_id: i64,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub quantity: i32,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub items: Vec<OrderItemResponse>,
}

impl OrderResponse {
    pub fn new(order: order_entity::Model, items: Vec<order_item_entity::Model>) -> Self {
        Self {
            order_no: order.order_no,
            ota_order_no: order.ota_order_no,
            platform: order.platform,
            product_id: order.product_id,
            hotel_id: order.hotel_id,
            room_type_id: order.room_type_id,
            check_in_date: order.check_in_date,
            check_out_date: order.check_out_date,
            quantity: order.quantity,
            total_amount: order.total_amount,
            status: order.status,
            confirmed_at: order.confirmed_at,
            cancelled_at: order.cancelled_at,
            items: items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ExceptionOrderQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<ExceptionStatus>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct HandleExceptionRequest {
    pub handler: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ResolveExceptionRequest {
    pub handler: String,
    pub remark: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExceptionOrderResponse {
    pub id: i64,
    pub order_id: i64,
    pub exception_type: ExceptionType,
    pub status: ExceptionStatus,
    #[schema(value_type = Object)]
    pub exception_data: serde_json::Value,
    pub handler: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolve_remark: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<exception_order_entity::Model> for ExceptionOrderResponse {
    fn from(m: exception_order_entity::Model) -> Self {
        Self {
            id: m.id,
            order_id: m.order_id,
            exception_type: m.exception_type,
            status: m.status,
            exception_data: m.exception_data,
            handler: m.handler,
            resolved_at: m.resolved_at,
            resolve_remark: m.resolve_remark,
            created_at: m.created_at,
        }
    }
}
