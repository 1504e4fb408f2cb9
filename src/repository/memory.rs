//! In-memory repository used by service tests.

use super::{CatalogRepository, OrderRepository, PriceCacheRepository};
use crate::entities::{
    EnableStatus, ExceptionStatus, OrderItemStatus, OrderStatus, OtaPlatform, PriceSource,
    bundle_item_entity, daily_price_entity, exception_order_entity, hotel_daily_stock_entity,
    hotel_entity, hotel_room_type_entity, order_entity, order_item_entity, product_entity,
    room_type_entity, ticket_entity, ticket_price_entity,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    DateWindow, HotelStockInput, HotelStockKey, ItemResolution, NewDailyPrice, NewExceptionOrder,
    NewOrder, NewOrderItem, TicketPriceInput, TicketPriceKey,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::Mutex;

#[derive(Default)]
struct State {
    next_id: i64,
    hotels: Vec<hotel_entity::Model>,
    room_types: Vec<room_type_entity::Model>,
    tickets: Vec<ticket_entity::Model>,
    stocks: Vec<hotel_daily_stock_entity::Model>,
    ticket_prices: Vec<ticket_price_entity::Model>,
    products: Vec<product_entity::Model>,
    associations: Vec<hotel_room_type_entity::Model>,
    bundle_items: Vec<bundle_item_entity::Model>,
    daily_prices: Vec<daily_price_entity::Model>,
    orders: Vec<order_entity::Model>,
    items: Vec<order_item_entity::Model>,
    exceptions: Vec<exception_order_entity::Model>,
}

impl State {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    state: Mutex<State>,
    /// replace_window 调用次数
    replace_calls: Mutex<u32>,
    /// 为 true 时写异常单返回数据库错误
    exception_writes_fail: Mutex<bool>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    // ---- seeding ----

    /// `connected` 表示已对接且自动确认
    pub fn hotel(&self, name: &str, connected: bool) -> i64 {
        self.with(|s| {
            let id = s.id();
            s.hotels.push(hotel_entity::Model {
                id,
                name: name.to_string(),
                status: EnableStatus::Enabled,
                is_system_connected: connected,
                auto_confirm: connected,
                provider_code: connected.then(|| "hotel-api".to_string()),
                created_at: None,
                updated_at: None,
            });
            id
        })
    }

    pub fn room_type(&self, hotel_id: i64, name: &str) -> i64 {
        self.with(|s| {
            let id = s.id();
            s.room_types.push(room_type_entity::Model {
                id,
                hotel_id,
                name: name.to_string(),
                status: EnableStatus::Enabled,
                created_at: None,
                updated_at: None,
            });
            id
        })
    }

    pub fn ticket(&self, name: &str, connected: bool) -> i64 {
        self.with(|s| {
            let id = s.id();
            s.tickets.push(ticket_entity::Model {
                id,
                name: name.to_string(),
                status: EnableStatus::Enabled,
                is_system_connected: connected,
                auto_confirm: connected,
                provider_code: connected.then(|| "ticket-api".to_string()),
                created_at: None,
                updated_at: None,
            });
            id
        })
    }

    /// 启用状态、无售卖期限制的产品
    pub fn product(&self, code: &str, stay_days: i32) -> i64 {
        self.with(|s| {
            let id = s.id();
            s.products.push(product_entity::Model {
                id,
                code: code.to_string(),
                name: format!("Package {code}"),
                stay_days,
                status: EnableStatus::Enabled,
                sale_start_date: None,
                sale_end_date: None,
                deleted_at: None,
                created_at: None,
                updated_at: None,
            });
            id
        })
    }

    pub fn update_product(&self, product_id: i64, f: impl FnOnce(&mut product_entity::Model)) {
        self.with(|s| {
            if let Some(p) = s.products.iter_mut().find(|p| p.id == product_id) {
                f(p);
            }
        })
    }

    pub fn disable_hotel(&self, hotel_id: i64) {
        self.with(|s| {
            if let Some(h) = s.hotels.iter_mut().find(|h| h.id == hotel_id) {
                h.status = EnableStatus::Disabled;
            }
        })
    }

    pub fn link(&self, product_id: i64, hotel_id: i64, room_type_id: i64) -> i64 {
        self.with(|s| insert_association(s, product_id, hotel_id, room_type_id, None).id)
    }

    pub fn bundle(&self, product_id: i64, ticket_id: i64, quantity: i32) -> i64 {
        self.with(|s| {
            let id = s.id();
            s.bundle_items.push(bundle_item_entity::Model {
                id,
                product_id,
                ticket_id,
                quantity,
                created_at: None,
                updated_at: None,
            });
            id
        })
    }

    pub fn set_stock(
        &self,
        hotel_id: i64,
        room_type_id: i64,
        date: NaiveDate,
        sale_price: Decimal,
        stock_available: i32,
    ) -> hotel_daily_stock_entity::Model {
        let input = HotelStockInput {
            hotel_id,
            room_type_id,
            biz_date: date,
            sale_price,
            cost_price: sale_price * Decimal::new(8, 1),
            stock_total: stock_available.max(10),
            stock_available,
            price_source: PriceSource::Manual,
        };
        self.with(|s| upsert_stock(s, &input, None))
    }

    pub fn set_ticket_price(
        &self,
        ticket_id: i64,
        date: NaiveDate,
        sale_price: Decimal,
        cost_price: Decimal,
    ) {
        let input = TicketPriceInput {
            ticket_id,
            biz_date: date,
            sale_price,
            cost_price,
        };
        self.with(|s| upsert_ticket(s, &input, None));
    }

    // ---- inspection ----

    pub fn daily_prices(&self, product_id: i64) -> Vec<daily_price_entity::Model> {
        self.with(|s| {
            let mut rows: Vec<_> = s
                .daily_prices
                .iter()
                .filter(|r| r.product_id == product_id)
                .cloned()
                .collect();
            rows.sort_by_key(|r| (r.hotel_id, r.room_type_id, r.biz_date));
            rows
        })
    }

    pub fn replace_calls(&self) -> u32 {
        *self.replace_calls.lock().unwrap()
    }

    pub fn orders(&self) -> Vec<order_entity::Model> {
        self.with(|s| s.orders.clone())
    }

    pub fn items(&self, order_id: i64) -> Vec<order_item_entity::Model> {
        self.with(|s| {
            s.items
                .iter()
                .filter(|i| i.order_id == order_id)
                .cloned()
                .collect()
        })
    }

    pub fn exceptions(&self) -> Vec<exception_order_entity::Model> {
        self.with(|s| s.exceptions.clone())
    }

    pub fn fail_exception_writes(&self, fail: bool) {
        *self.exception_writes_fail.lock().unwrap() = fail;
    }

    /// 直接改写子单状态，用于构造汇总场景
    pub fn force_item_status(&self, item_id: i64, status: OrderItemStatus) {
        self.with(|s| {
            if let Some(i) = s.items.iter_mut().find(|i| i.id == item_id) {
                i.status = status;
            }
        })
    }
}

fn insert_association(
    s: &mut State,
    product_id: i64,
    hotel_id: i64,
    room_type_id: i64,
    now: Option<DateTime<Utc>>,
) -> hotel_room_type_entity::Model {
    if let Some(existing) = s.associations.iter_mut().find(|a| {
        a.product_id == product_id && a.hotel_id == hotel_id && a.room_type_id == room_type_id
    }) {
        existing.is_active = true;
        existing.updated_at = now;
        return existing.clone();
    }
    let id = s.id();
    let model = hotel_room_type_entity::Model {
        id,
        product_id,
        hotel_id,
        room_type_id,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    s.associations.push(model.clone());
    model
}

fn upsert_stock(
    s: &mut State,
    input: &HotelStockInput,
    now: Option<DateTime<Utc>>,
) -> hotel_daily_stock_entity::Model {
    if let Some(row) = s.stocks.iter_mut().find(|r| {
        r.hotel_id == input.hotel_id
            && r.room_type_id == input.room_type_id
            && r.biz_date == input.biz_date
    }) {
        row.sale_price = input.sale_price.round_dp(2);
        row.cost_price = input.cost_price.round_dp(2);
        row.stock_total = input.stock_total;
        row.stock_available = input.stock_available;
        row.price_source = input.price_source;
        row.updated_at = now;
        return row.clone();
    }
    let id = s.id();
    let model = hotel_daily_stock_entity::Model {
        id,
        hotel_id: input.hotel_id,
        room_type_id: input.room_type_id,
        biz_date: input.biz_date,
        sale_price: input.sale_price.round_dp(2),
        cost_price: input.cost_price.round_dp(2),
        stock_total: input.stock_total,
        stock_available: input.stock_available,
        price_source: input.price_source,
        created_at: now,
        updated_at: now,
    };
    s.stocks.push(model.clone());
    model
}

fn upsert_ticket(
    s: &mut State,
    input: &TicketPriceInput,
    now: Option<DateTime<Utc>>,
) -> ticket_price_entity::Model {
    if let Some(row) = s
        .ticket_prices
        .iter_mut()
        .find(|r| r.ticket_id == input.ticket_id && r.biz_date == input.biz_date)
    {
        row.sale_price = input.sale_price.round_dp(2);
        row.cost_price = input.cost_price.round_dp(2);
        row.updated_at = now;
        return row.clone();
    }
    let id = s.id();
    let model = ticket_price_entity::Model {
        id,
        ticket_id: input.ticket_id,
        biz_date: input.biz_date,
        sale_price: input.sale_price.round_dp(2),
        cost_price: input.cost_price.round_dp(2),
        created_at: now,
        updated_at: now,
    };
    s.ticket_prices.push(model.clone());
    model
}

fn live_product_ids(s: &State, ids: impl Iterator<Item = i64>) -> Vec<i64> {
    let wanted: HashSet<i64> = ids.collect();
    let mut live: Vec<i64> = s
        .products
        .iter()
        .filter(|p| wanted.contains(&p.id) && p.deleted_at.is_none())
        .map(|p| p.id)
        .collect();
    live.sort_unstable();
    live
}

#[async_trait]
impl CatalogRepository for MemoryRepository {
    async fn find_product(&self, product_id: i64) -> AppResult<Option<product_entity::Model>> {
        Ok(self.with(|s| s.products.iter().find(|p| p.id == product_id).cloned()))
    }

    async fn enabled_product_ids(&self) -> AppResult<Vec<i64>> {
        Ok(self.with(|s| {
            s.products
                .iter()
                .filter(|p| p.is_enabled())
                .map(|p| p.id)
                .collect()
        }))
    }

    async fn find_hotel(&self, hotel_id: i64) -> AppResult<Option<hotel_entity::Model>> {
        Ok(self.with(|s| s.hotels.iter().find(|h| h.id == hotel_id).cloned()))
    }

    async fn find_room_type(
        &self,
        room_type_id: i64,
    ) -> AppResult<Option<room_type_entity::Model>> {
        Ok(self.with(|s| s.room_types.iter().find(|r| r.id == room_type_id).cloned()))
    }

    async fn find_ticket(&self, ticket_id: i64) -> AppResult<Option<ticket_entity::Model>> {
        Ok(self.with(|s| s.tickets.iter().find(|t| t.id == ticket_id).cloned()))
    }

    async fn active_associations(
        &self,
        product_id: i64,
    ) -> AppResult<Vec<hotel_room_type_entity::Model>> {
        Ok(self.with(|s| {
            let mut rows: Vec<_> = s
                .associations
                .iter()
                .filter(|a| a.product_id == product_id && a.is_active)
                .filter(|a| s.hotels.iter().any(|h| h.id == a.hotel_id && h.is_enabled()))
                .filter(|a| {
                    s.room_types
                        .iter()
                        .any(|r| r.id == a.room_type_id && r.hotel_id == a.hotel_id && r.is_enabled())
                })
                .cloned()
                .collect();
            rows.sort_by_key(|a| (a.hotel_id, a.room_type_id));
            rows
        }))
    }

    async fn find_association(
        &self,
        product_id: i64,
        hotel_id: i64,
        room_type_id: i64,
    ) -> AppResult<Option<hotel_room_type_entity::Model>> {
        Ok(self.with(|s| {
            s.associations
                .iter()
                .find(|a| {
                    a.product_id == product_id
                        && a.hotel_id == hotel_id
                        && a.room_type_id == room_type_id
                })
                .cloned()
        }))
    }

    async fn bundle_items(&self, product_id: i64) -> AppResult<Vec<bundle_item_entity::Model>> {
        Ok(self.with(|s| {
            s.bundle_items
                .iter()
                .filter(|b| b.product_id == product_id)
                .cloned()
                .collect()
        }))
    }

    async fn product_ids_by_room_type(
        &self,
        hotel_id: i64,
        room_type_id: i64,
    ) -> AppResult<Vec<i64>> {
        Ok(self.with(|s| {
            let ids = s
                .associations
                .iter()
                .filter(|a| a.hotel_id == hotel_id && a.room_type_id == room_type_id)
                .map(|a| a.product_id);
            live_product_ids(s, ids)
        }))
    }

    async fn product_ids_by_ticket(&self, ticket_id: i64) -> AppResult<Vec<i64>> {
        Ok(self.with(|s| {
            let ids = s
                .bundle_items
                .iter()
                .filter(|b| b.ticket_id == ticket_id)
                .map(|b| b.product_id);
            live_product_ids(s, ids)
        }))
    }

    async fn hotel_stock(
        &self,
        hotel_id: i64,
        room_type_id: i64,
        date: NaiveDate,
    ) -> AppResult<Option<hotel_daily_stock_entity::Model>> {
        Ok(self.with(|s| {
            s.stocks
                .iter()
                .find(|r| {
                    r.hotel_id == hotel_id && r.room_type_id == room_type_id && r.biz_date == date
                })
                .cloned()
        }))
    }

    async fn hotel_stocks(
        &self,
        hotel_id: i64,
        room_type_id: i64,
        window: DateWindow,
    ) -> AppResult<Vec<hotel_daily_stock_entity::Model>> {
        Ok(self.with(|s| {
            let mut rows: Vec<_> = s
                .stocks
                .iter()
                .filter(|r| {
                    r.hotel_id == hotel_id
                        && r.room_type_id == room_type_id
                        && window.contains(r.biz_date)
                })
                .cloned()
                .collect();
            rows.sort_by_key(|r| r.biz_date);
            rows
        }))
    }

    async fn ticket_price(
        &self,
        ticket_id: i64,
        date: NaiveDate,
    ) -> AppResult<Option<ticket_price_entity::Model>> {
        Ok(self.with(|s| {
            s.ticket_prices
                .iter()
                .find(|r| r.ticket_id == ticket_id && r.biz_date == date)
                .cloned()
        }))
    }

    async fn ticket_prices(
        &self,
        ticket_ids: &[i64],
        window: DateWindow,
    ) -> AppResult<Vec<ticket_price_entity::Model>> {
        Ok(self.with(|s| {
            s.ticket_prices
                .iter()
                .filter(|r| ticket_ids.contains(&r.ticket_id) && window.contains(r.biz_date))
                .cloned()
                .collect()
        }))
    }

    async fn upsert_hotel_stock(
        &self,
        input: &HotelStockInput,
        now: DateTime<Utc>,
    ) -> AppResult<hotel_daily_stock_entity::Model> {
        Ok(self.with(|s| upsert_stock(s, input, Some(now))))
    }

    async fn upsert_ticket_price(
        &self,
        input: &TicketPriceInput,
        now: DateTime<Utc>,
    ) -> AppResult<ticket_price_entity::Model> {
        Ok(self.with(|s| upsert_ticket(s, input, Some(now))))
    }

    async fn delete_hotel_stock(&self, key: &HotelStockKey) -> AppResult<bool> {
        Ok(self.with(|s| {
            let before = s.stocks.len();
            s.stocks.retain(|r| {
                !(r.hotel_id == key.hotel_id
                    && r.room_type_id == key.room_type_id
                    && r.biz_date == key.biz_date)
            });
            s.stocks.len() != before
        }))
    }

    async fn delete_ticket_price(&self, key: &TicketPriceKey) -> AppResult<bool> {
        Ok(self.with(|s| {
            let before = s.ticket_prices.len();
            s.ticket_prices
                .retain(|r| !(r.ticket_id == key.ticket_id && r.biz_date == key.biz_date));
            s.ticket_prices.len() != before
        }))
    }

    async fn add_bundle_item(
        &self,
        product_id: i64,
        ticket_id: i64,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> AppResult<bundle_item_entity::Model> {
        Ok(self.with(|s| {
            let id = s.id();
            let model = bundle_item_entity::Model {
                id,
                product_id,
                ticket_id,
                quantity,
                created_at: Some(now),
                updated_at: Some(now),
            };
            s.bundle_items.push(model.clone());
            model
        }))
    }

    async fn remove_bundle_item(&self, product_id: i64, item_id: i64) -> AppResult<bool> {
        Ok(self.with(|s| {
            let before = s.bundle_items.len();
            s.bundle_items
                .retain(|b| !(b.id == item_id && b.product_id == product_id));
            s.bundle_items.len() != before
        }))
    }

    async fn add_association(
        &self,
        product_id: i64,
        hotel_id: i64,
        room_type_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<hotel_room_type_entity::Model> {
        Ok(self.with(|s| insert_association(s, product_id, hotel_id, room_type_id, Some(now))))
    }

    async fn remove_association(&self, product_id: i64, association_id: i64) -> AppResult<bool> {
        Ok(self.with(|s| {
            let before = s.associations.len();
            s.associations
                .retain(|a| !(a.id == association_id && a.product_id == product_id));
            s.associations.len() != before
        }))
    }
}

#[async_trait]
impl PriceCacheRepository for MemoryRepository {
    async fn replace_window(
        &self,
        product_id: i64,
        _window: DateWindow,
        rows: Vec<NewDailyPrice>,
    ) -> AppResult<u64> {
        *self.replace_calls.lock().unwrap() += 1;
        Ok(self.with(|s| {
            s.daily_prices.retain(|r| r.product_id != product_id);
            let inserted = rows.len() as u64;
            for row in rows {
                let id = s.id();
                s.daily_prices.push(daily_price_entity::Model {
                    id,
                    product_id: row.product_id,
                    hotel_id: row.hotel_id,
                    room_type_id: row.room_type_id,
                    biz_date: row.biz_date,
                    sale_price: row.sale_price,
                    cost_price: row.cost_price,
                    composite_code: row.composite_code,
                    last_updated_at: row.last_updated_at,
                });
            }
            inserted
        }))
    }

    async fn purge_product(&self, product_id: i64) -> AppResult<u64> {
        Ok(self.with(|s| {
            let before = s.daily_prices.len();
            s.daily_prices.retain(|r| r.product_id != product_id);
            (before - s.daily_prices.len()) as u64
        }))
    }

    async fn cached_price(
        &self,
        product_id: i64,
        hotel_id: i64,
        room_type_id: i64,
        date: NaiveDate,
    ) -> AppResult<Option<daily_price_entity::Model>> {
        Ok(self.with(|s| {
            s.daily_prices
                .iter()
                .find(|r| {
                    r.product_id == product_id
                        && r.hotel_id == hotel_id
                        && r.room_type_id == room_type_id
                        && r.biz_date == date
                })
                .cloned()
        }))
    }

    async fn cached_prices(
        &self,
        product_id: i64,
        hotel_id: i64,
        room_type_id: i64,
        window: DateWindow,
    ) -> AppResult<Vec<daily_price_entity::Model>> {
        Ok(self.with(|s| {
            let mut rows: Vec<_> = s
                .daily_prices
                .iter()
                .filter(|r| {
                    r.product_id == product_id
                        && r.hotel_id == hotel_id
                        && r.room_type_id == room_type_id
                        && window.contains(r.biz_date)
                })
                .cloned()
                .collect();
            rows.sort_by_key(|r| r.biz_date);
            rows
        }))
    }
}

#[async_trait]
impl OrderRepository for MemoryRepository {
    async fn find_order(&self, order_id: i64) -> AppResult<Option<order_entity::Model>> {
        Ok(self.with(|s| s.orders.iter().find(|o| o.id == order_id).cloned()))
    }

    async fn find_order_by_no(&self, order_no: &str) -> AppResult<Option<order_entity::Model>> {
        Ok(self.with(|s| s.orders.iter().find(|o| o.order_no == order_no).cloned()))
    }

    async fn find_order_by_ota(
        &self,
        platform: OtaPlatform,
        ota_order_no: &str,
    ) -> AppResult<Option<order_entity::Model>> {
        Ok(self.with(|s| {
            s.orders
                .iter()
                .find(|o| o.platform == platform && o.ota_order_no == ota_order_no)
                .cloned()
        }))
    }

    async fn insert_order(&self, order: NewOrder) -> AppResult<order_entity::Model> {
        self.with(|s| {
            if s
                .orders
                .iter()
                .any(|o| o.platform == order.platform && o.ota_order_no == order.ota_order_no)
            {
                return Err(AppError::StateError("duplicate ota order".into()));
            }
            let id = s.id();
            let model = order_entity::Model {
                id,
                order_no: order.order_no,
                ota_order_no: order.ota_order_no,
                platform: order.platform,
                product_id: order.product_id,
                hotel_id: order.hotel_id,
                room_type_id: order.room_type_id,
                check_in_date: order.check_in_date,
                check_out_date: order.check_out_date,
                quantity: order.quantity,
                unit_price: order.unit_price,
                total_amount: order.total_amount,
                settlement_amount: order.settlement_amount,
                status: OrderStatus::Paid,
                contact_name: order.contact_name,
                contact_phone: order.contact_phone,
                remark: order.remark,
                paid_at: Some(order.paid_at),
                confirmed_at: None,
                cancelled_at: None,
                created_at: Some(order.paid_at),
                updated_at: Some(order.paid_at),
            };
            s.orders.push(model.clone());
            Ok(model)
        })
    }

    async fn order_items(&self, order_id: i64) -> AppResult<Vec<order_item_entity::Model>> {
        Ok(self.items(order_id))
    }

    async fn split_order(
        &self,
        order_id: i64,
        items: Vec<NewOrderItem>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<order_item_entity::Model>> {
        self.with(|s| {
            if !s.orders.iter().any(|o| o.id == order_id) {
                return Err(AppError::NotFound(format!("order {order_id}")));
            }
            if s.items.iter().any(|i| i.order_id == order_id) {
                return Err(AppError::StateError(format!(
                    "order {order_id} has already been split"
                )));
            }
            let mut saved = Vec::with_capacity(items.len());
            for item in items {
                let id = s.id();
                let model = order_item_entity::Model {
                    id,
                    order_id,
                    item_type: item.item_type,
                    resource_id: item.resource_id,
                    resource_name: item.resource_name,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                    total_price: item.total_price,
                    status: OrderItemStatus::Pending,
                    resource_order_no: None,
                    error_message: None,
                    retry_count: 0,
                    max_retries: item.max_retries,
                    processed_at: None,
                    created_at: Some(now),
                    updated_at: Some(now),
                };
                s.items.push(model.clone());
                saved.push(model);
            }
            Ok(saved)
        })
    }

    async fn transition_order(
        &self,
        order_id: i64,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        Ok(self.with(|s| {
            let Some(order) = s
                .orders
                .iter_mut()
                .find(|o| o.id == order_id && o.status == expected)
            else {
                return false;
            };
            order.status = next;
            order.updated_at = Some(at);
            match next {
                OrderStatus::Confirmed => order.confirmed_at = Some(at),
                OrderStatus::Cancelled => order.cancelled_at = Some(at),
                OrderStatus::Paid | OrderStatus::Failed => {}
            }
            true
        }))
    }

    async fn transition_item(
        &self,
        item_id: i64,
        expected: OrderItemStatus,
        next: OrderItemStatus,
        resolution: ItemResolution,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        Ok(self.with(|s| {
            let Some(item) = s
                .items
                .iter_mut()
                .find(|i| i.id == item_id && i.status == expected)
            else {
                return false;
            };
            item.status = next;
            item.updated_at = Some(at);
            if next.is_settled() {
                item.processed_at = Some(at);
            }
            if resolution.resource_order_no.is_some() {
                item.resource_order_no = resolution.resource_order_no;
            }
            if resolution.error_message.is_some() {
                item.error_message = resolution.error_message;
            }
            true
        }))
    }

    async fn insert_exception(
        &self,
        exception: NewExceptionOrder,
        now: DateTime<Utc>,
    ) -> AppResult<exception_order_entity::Model> {
        if *self.exception_writes_fail.lock().unwrap() {
            return Err(AppError::DatabaseError(sea_orm::DbErr::Custom(
                "exception_orders unavailable".into(),
            )));
        }
        Ok(self.with(|s| {
            let id = s.id();
            let model = exception_order_entity::Model {
                id,
                order_id: exception.order_id,
                exception_type: exception.exception_type,
                status: ExceptionStatus::Pending,
                exception_data: exception.exception_data,
                handler: None,
                resolved_at: None,
                resolve_remark: None,
                created_at: Some(now),
                updated_at: Some(now),
            };
            s.exceptions.push(model.clone());
            model
        }))
    }

    async fn find_exception(
        &self,
        exception_id: i64,
    ) -> AppResult<Option<exception_order_entity::Model>> {
        Ok(self.with(|s| s.exceptions.iter().find(|e| e.id == exception_id).cloned()))
    }

    async fn transition_exception(
        &self,
        exception_id: i64,
        expected: ExceptionStatus,
        next: ExceptionStatus,
        handler: &str,
        remark: Option<String>,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        Ok(self.with(|s| {
            let Some(e) = s
                .exceptions
                .iter_mut()
                .find(|e| e.id == exception_id && e.status == expected)
            else {
                return false;
            };
            e.status = next;
            e.handler = Some(handler.to_string());
            e.updated_at = Some(at);
            if next == ExceptionStatus::Resolved {
                e.resolved_at = Some(at);
                e.resolve_remark = remark;
            }
            true
        }))
    }

    async fn list_exceptions(
        &self,
        status: Option<ExceptionStatus>,
        offset: u64,
        limit: u64,
    ) -> AppResult<(Vec<exception_order_entity::Model>, u64)> {
        Ok(self.with(|s| {
            let mut rows: Vec<_> = s
                .exceptions
                .iter()
                .filter(|e| status.is_none_or(|st| e.status == st))
                .cloned()
                .collect();
            rows.sort_by(|a, b| b.id.cmp(&a.id));
            let total = rows.len() as u64;
            let page = rows
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect();
            (page, total)
        }))
    }
}
