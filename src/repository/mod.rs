//! 持久化抽象
//!
//! 服务层只依赖这里的 trait，生产环境由 [`SeaOrmRepository`] 实现，
//! 测试使用 `memory::MemoryRepository`。

mod catalog;
#[cfg(test)]
pub mod memory;
mod orders;
mod price_cache;

use crate::entities::{
    ExceptionStatus, OrderItemStatus, OrderStatus, OtaPlatform, bundle_item_entity,
    daily_price_entity, exception_order_entity, hotel_daily_stock_entity, hotel_entity,
    hotel_room_type_entity, order_entity, order_item_entity, product_entity, room_type_entity,
    ticket_entity, ticket_price_entity,
};
use crate::error::AppResult;
use crate::models::{
    DateWindow, HotelStockInput, HotelStockKey, ItemResolution, NewDailyPrice, NewExceptionOrder,
    NewOrder, NewOrderItem, TicketPriceInput, TicketPriceKey,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::DatabaseConnection;

/// 上游资源：产品构成、酒店库存、门票价格
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn find_product(&self, product_id: i64) -> AppResult<Option<product_entity::Model>>;

    /// 所有启用且未删除的产品
    async fn enabled_product_ids(&self) -> AppResult<Vec<i64>>;

    async fn find_hotel(&self, hotel_id: i64) -> AppResult<Option<hotel_entity::Model>>;

    async fn find_room_type(&self, room_type_id: i64) -> AppResult<Option<room_type_entity::Model>>;

    async fn find_ticket(&self, ticket_id: i64) -> AppResult<Option<ticket_entity::Model>>;

    /// 产品下启用的 酒店 × 房型 组合（酒店、房型均为启用状态），按 (hotel_id, room_type_id) 排序
    async fn active_associations(
        &self,
        product_id: i64,
    ) -> AppResult<Vec<hotel_room_type_entity::Model>>;

    async fn find_association(
        &self,
        product_id: i64,
        hotel_id: i64,
        room_type_id: i64,
    ) -> AppResult<Option<hotel_room_type_entity::Model>>;

    async fn bundle_items(&self, product_id: i64) -> AppResult<Vec<bundle_item_entity::Model>>;

    /// 关联了该房型的未删除产品
    async fn product_ids_by_room_type(&self, hotel_id: i64, room_type_id: i64)
    -> AppResult<Vec<i64>>;

    /// 打包了该门票的未删除产品
    async fn product_ids_by_ticket(&self, ticket_id: i64) -> AppResult<Vec<i64>>;

    async fn hotel_stock(
        &self,
        hotel_id: i64,
        room_type_id: i64,
        date: NaiveDate,
    ) -> AppResult<Option<hotel_daily_stock_entity::Model>>;

    async fn hotel_stocks(
        &self,
        hotel_id: i64,
        room_type_id: i64,
        window: DateWindow,
    ) -> AppResult<Vec<hotel_daily_stock_entity::Model>>;

    async fn ticket_price(
        &self,
        ticket_id: i64,
        date: NaiveDate,
    ) -> AppResult<Option<ticket_price_entity::Model>>;

    async fn ticket_prices(
        &self,
        ticket_ids: &[i64],
        window: DateWindow,
    ) -> AppResult<Vec<ticket_price_entity::Model>>;

    async fn upsert_hotel_stock(
        &self,
        input: &HotelStockInput,
        now: DateTime<Utc>,
    ) -> AppResult<hotel_daily_stock_entity::Model>;

    async fn upsert_ticket_price(
        &self,
        input: &TicketPriceInput,
        now: DateTime<Utc>,
    ) -> AppResult<ticket_price_entity::Model>;

    /// 返回是否删除了记录
    async fn delete_hotel_stock(&self, key: &HotelStockKey) -> AppResult<bool>;

    /// 返回是否删除了记录
    async fn delete_ticket_price(&self, key: &TicketPriceKey) -> AppResult<bool>;

    async fn add_bundle_item(
        &self,
        product_id: i64,
        ticket_id: i64,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> AppResult<bundle_item_entity::Model>;

    /// 返回是否删除了记录
    async fn remove_bundle_item(&self, product_id: i64, item_id: i64) -> AppResult<bool>;

    async fn add_association(
        &self,
        product_id: i64,
        hotel_id: i64,
        room_type_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<hotel_room_type_entity::Model>;

    async fn remove_association(&self, product_id: i64, association_id: i64) -> AppResult<bool>;
}

/// 打包产品每日价格缓存
#[async_trait]
pub trait PriceCacheRepository: Send + Sync {
    /// 在一个事务内删除产品所有缓存行并写入新行，返回写入行数
    async fn replace_window(
        &self,
        product_id: i64,
        window: DateWindow,
        rows: Vec<NewDailyPrice>,
    ) -> AppResult<u64>;

    /// 删除产品全部缓存，返回删除行数
    async fn purge_product(&self, product_id: i64) -> AppResult<u64>;

    async fn cached_price(
        &self,
        product_id: i64,
        hotel_id: i64,
        room_type_id: i64,
        date: NaiveDate,
    ) -> AppResult<Option<daily_price_entity::Model>>;

    /// 按日期升序
    async fn cached_prices(
        &self,
        product_id: i64,
        hotel_id: i64,
        room_type_id: i64,
        window: DateWindow,
    ) -> AppResult<Vec<daily_price_entity::Model>>;
}

/// 订单、子单与异常单
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_order(&self, order_id: i64) -> AppResult<Option<order_entity::Model>>;

    async fn find_order_by_no(&self, order_no: &str) -> AppResult<Option<order_entity::Model>>;

    async fn find_order_by_ota(
        &self,
        platform: OtaPlatform,
        ota_order_no: &str,
    ) -> AppResult<Option<order_entity::Model>>;

    /// 新订单状态为 PAID
    async fn insert_order(&self, order: NewOrder) -> AppResult<order_entity::Model>;

    /// 按 id 升序
    async fn order_items(&self, order_id: i64) -> AppResult<Vec<order_item_entity::Model>>;

    /// 单事务写入全部子单；订单已拆分过则返回 StateError 且不写入
    async fn split_order(
        &self,
        order_id: i64,
        items: Vec<NewOrderItem>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<order_item_entity::Model>>;

    /// 条件更新：仅当当前状态为 `expected` 时生效，返回是否更新
    async fn transition_order(
        &self,
        order_id: i64,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;

    async fn transition_item(
        &self,
        item_id: i64,
        expected: OrderItemStatus,
        next: OrderItemStatus,
        resolution: ItemResolution,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;

    async fn insert_exception(
        &self,
        exception: NewExceptionOrder,
        now: DateTime<Utc>,
    ) -> AppResult<exception_order_entity::Model>;

    async fn find_exception(
        &self,
        exception_id: i64,
    ) -> AppResult<Option<exception_order_entity::Model>>;

    async fn transition_exception(
        &self,
        exception_id: i64,
        expected: ExceptionStatus,
        next: ExceptionStatus,
        handler: &str,
        remark: Option<String>,
        at: DateTime<Utc>,
    ) -> AppResult<bool>;

    /// 按创建倒序分页，返回 (当前页, 总数)
    async fn list_exceptions(
        &self,
        status: Option<ExceptionStatus>,
        offset: u64,
        limit: u64,
    ) -> AppResult<(Vec<exception_order_entity::Model>, u64)>;
}

/// 基于 sea-orm 的仓储实现
pub struct SeaOrmRepository {
    pool: DatabaseConnection,
}

impl SeaOrmRepository {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}
