use crate::entities::{
    ExceptionType, OrderItemStatus, OrderItemType, OrderStatus, OtaPlatform, order_entity,
    order_item_entity,
};
use crate::error::{AppError, AppResult};
use crate::external::{BookingRequest, ResourceProvider};
use crate::models::{
    CreateOtaOrderRequest, ItemResolution, NewOrder, NewOrderItem, OrderResponse,
};
use crate::repository::{CatalogRepository, OrderRepository};
use crate::services::{ExceptionOrderService, OrderRouter};
use crate::tasks::{Job, TaskDescriptor, TaskQueue};
use crate::utils::{Clock, generate_order_no, manual_confirmation_no};
use chrono::Duration;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;

const ITEM_MAX_RETRIES: i32 = 3;

/// 子单对应的资源方信息
struct Resource {
    auto_fulfills: bool,
    provider_code: Option<String>,
}

/// OTA 订单：落单、拆单、逐个子单向资源方下单、汇总主单状态
#[derive(Clone)]
pub struct FulfillmentService {
    catalog: Arc<dyn CatalogRepository>,
    orders: Arc<dyn OrderRepository>,
    router: OrderRouter,
    exceptions: ExceptionOrderService,
    provider: Arc<dyn ResourceProvider>,
    queue: Arc<dyn TaskQueue>,
    clock: Arc<dyn Clock>,
}

impl FulfillmentService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        orders: Arc<dyn OrderRepository>,
        router: OrderRouter,
        exceptions: ExceptionOrderService,
        provider: Arc<dyn ResourceProvider>,
        queue: Arc<dyn TaskQueue>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            orders,
            router,
            exceptions,
            provider,
            queue,
            clock,
        }
    }

    /// OTA 已支付订单落库；同一平台同一 OTA 单号重复回调返回已有订单
    pub async fn create_order(
        &self,
        platform: OtaPlatform,
        request: CreateOtaOrderRequest,
    ) -> AppResult<OrderResponse> {
        if request.ota_order_no.trim().is_empty() {
            return Err(AppError::ValidationError("ota_order_no is required".into()));
        }
        if request.quantity < 1 {
            return Err(AppError::ValidationError(
                "quantity must be at least 1".into(),
            ));
        }
        if request.contact_name.trim().is_empty() || request.contact_phone.trim().is_empty() {
            return Err(AppError::ValidationError("contact is required".into()));
        }

        if let Some(existing) = self
            .orders
            .find_order_by_ota(platform, &request.ota_order_no)
            .await?
        {
            log::info!(
                "Duplicate {platform} order {} maps to {}",
                request.ota_order_no,
                existing.order_no
            );
            return self.resume(existing).await;
        }

        let routed = self
            .router
            .route(&request.product_code, request.check_in_date)
            .await?;
        if !routed.product.is_enabled() {
            return Err(AppError::ValidationError(format!(
                "product {} is not on sale",
                routed.product.code
            )));
        }

        let nights = routed.product.stay_days.max(1);
        let quantity = Decimal::from(request.quantity);
        let total_amount = (routed.sale_price * quantity).round_dp(2);
        let now = self.clock.now();

        let new_order = NewOrder {
            order_no: generate_order_no(now),
            ota_order_no: request.ota_order_no.clone(),
            platform,
            product_id: routed.product.id,
            hotel_id: routed.hotel_id,
            room_type_id: routed.room_type_id,
            check_in_date: request.check_in_date,
            check_out_date: request.check_in_date + Duration::days(i64::from(nights)),
            quantity: request.quantity,
            unit_price: routed.sale_price,
            total_amount,
            settlement_amount: (routed.cost_price * quantity).round_dp(2),
            contact_name: request.contact_name.clone(),
            contact_phone: request.contact_phone.clone(),
            remark: request.remark.clone(),
            paid_at: now,
        };
        let order = match self.orders.insert_order(new_order).await {
            Ok(order) => order,
            Err(AppError::StateError(_)) => {
                // 并发的重复回调
                let existing = self
                    .orders
                    .find_order_by_ota(platform, &request.ota_order_no)
                    .await?
                    .ok_or_else(|| {
                        AppError::InternalError(format!(
                            "order {} conflicted but was not found",
                            request.ota_order_no
                        ))
                    })?;
                return self.resume(existing).await;
            }
            Err(e) => return Err(e),
        };
        log::info!(
            "Order {} created from {platform} order {} ({} x {})",
            order.order_no,
            order.ota_order_no,
            request.product_code,
            request.quantity
        );

        // 订单已落库，以下检查失败只记日志，不能阻断拆单
        if let Some(paid) = request.total_amount {
            if paid.round_dp(2) != total_amount {
                self.flag(
                    &order,
                    ExceptionType::PriceMismatch,
                    json!({
                        "expected": total_amount,
                        "paid": paid,
                        "price_origin": routed.source,
                    }),
                )
                .await;
            }
        }

        match self
            .router
            .stay_availability(
                order.hotel_id,
                order.room_type_id,
                order.check_in_date,
                nights,
            )
            .await
        {
            Ok(available) if available < order.quantity => {
                self.flag(
                    &order,
                    ExceptionType::InventoryInsufficient,
                    json!({
                        "requested": order.quantity,
                        "available": available,
                    }),
                )
                .await;
            }
            Ok(_) => {}
            Err(e) => log::error!(
                "Failed to check availability of order {}: {e}",
                order.order_no
            ),
        }

        if let Err(e) = self.split_and_process(order.id).await {
            log::error!("Failed to split order {}: {e}", order.order_no);
        }
        self.respond(order).await
    }

    /// 重复回调：上次落库后未拆单的订单在这里补拆
    async fn resume(&self, existing: order_entity::Model) -> AppResult<OrderResponse> {
        if existing.status == OrderStatus::Paid
            && self.orders.order_items(existing.id).await?.is_empty()
        {
            log::warn!("Order {} has no items, splitting again", existing.order_no);
            if let Err(e) = self.split_and_process(existing.id).await {
                log::error!("Failed to split order {}: {e}", existing.order_no);
            }
        }
        self.respond(existing).await
    }

    async fn flag(
        &self,
        order: &order_entity::Model,
        exception_type: ExceptionType,
        data: serde_json::Value,
    ) {
        if let Err(e) = self.exceptions.record(order.id, exception_type, data).await {
            log::error!(
                "Failed to record {exception_type:?} exception of order {}: {e:?}",
                order.order_no
            );
        }
    }

    /// 拆分子单并投递处理任务
    pub async fn split_and_process(
        &self,
        order_id: i64,
    ) -> AppResult<Vec<order_item_entity::Model>> {
        let order = self.load_order(order_id).await?;

        let items = match self.build_items(&order).await {
            Ok(items) => items,
            Err(e) => {
                self.record_split_failure(&order, &e).await;
                return Err(e);
            }
        };
        let saved = match self.orders.split_order(order_id, items, self.clock.now()).await {
            Ok(saved) => saved,
            Err(e @ AppError::StateError(_)) => return Err(e),
            Err(e) => {
                self.record_split_failure(&order, &e).await;
                return Err(e);
            }
        };
        log::info!("Order {} split into {} item(s)", order.order_no, saved.len());

        let task = TaskDescriptor::new(Job::ProcessOrderItems { order_id });
        if let Err(e) = self.queue.enqueue(task).await {
            log::error!("Failed to enqueue processing of order {}: {e:?}", order.order_no);
        }
        Ok(saved)
    }

    async fn record_split_failure(&self, order: &order_entity::Model, error: &AppError) {
        if let Err(e) = self
            .exceptions
            .record(
                order.id,
                ExceptionType::SplitFailed,
                json!({ "order_no": order.order_no, "reason": error.to_string() }),
            )
            .await
        {
            log::error!("Failed to record split failure of {}: {e:?}", order.order_no);
        }
    }

    /// 门票子单在前（按打包顺序），酒店子单一条在最后
    async fn build_items(&self, order: &order_entity::Model) -> AppResult<Vec<NewOrderItem>> {
        let product = self
            .catalog
            .find_product(order.product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {}", order.product_id)))?;
        let bundle_items = self.catalog.bundle_items(product.id).await?;

        let mut items = Vec::with_capacity(bundle_items.len() + 1);
        for bundle in &bundle_items {
            let ticket = self
                .catalog
                .find_ticket(bundle.ticket_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("ticket {}", bundle.ticket_id)))?;
            let unit_price = self
                .catalog
                .ticket_price(ticket.id, order.check_in_date)
                .await?
                .map_or(Decimal::ZERO, |p| p.sale_price);
            let quantity = bundle.quantity * order.quantity;
            items.push(NewOrderItem {
                item_type: OrderItemType::Ticket,
                resource_id: ticket.id,
                resource_name: ticket.name,
                quantity,
                unit_price,
                total_price: unit_price * Decimal::from(quantity),
                max_retries: ITEM_MAX_RETRIES,
            });
        }

        let hotel = self
            .catalog
            .find_hotel(order.hotel_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("hotel {}", order.hotel_id)))?;
        let room_type = self
            .catalog
            .find_room_type(order.room_type_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("room type {}", order.room_type_id)))?;
        let unit_price = self
            .catalog
            .hotel_stock(hotel.id, room_type.id, order.check_in_date)
            .await?
            .map_or(Decimal::ZERO, |s| s.sale_price);
        let quantity = order.quantity * product.stay_days.max(1);
        items.push(NewOrderItem {
            item_type: OrderItemType::Hotel,
            resource_id: hotel.id,
            resource_name: format!("{} {}", hotel.name, room_type.name),
            quantity,
            unit_price,
            total_price: unit_price * Decimal::from(quantity),
            max_retries: ITEM_MAX_RETRIES,
        });
        Ok(items)
    }

    /// 逐个处理 PENDING 子单，每次子单状态落定后汇总主单
    pub async fn process_order_items(&self, order_id: i64) -> AppResult<OrderStatus> {
        let order = self.load_order(order_id).await?;
        if order.status.is_terminal() {
            log::info!(
                "Order {} is {}, skip item processing",
                order.order_no,
                order.status
            );
            return Ok(order.status);
        }

        for item in self.orders.order_items(order_id).await? {
            if item.status != OrderItemStatus::Pending {
                continue;
            }
            if !self
                .advance_item(
                    &item,
                    OrderItemStatus::Pending,
                    OrderItemStatus::Processing,
                    ItemResolution::default(),
                )
                .await?
            {
                continue;
            }

            let (next, resolution) = self.fulfill_item(&order, &item).await;
            self.advance_item(&item, OrderItemStatus::Processing, next, resolution.clone())
                .await?;
            if next == OrderItemStatus::Failed {
                let exception_type = match item.item_type {
                    OrderItemType::Ticket => ExceptionType::TicketOrderFailed,
                    OrderItemType::Hotel => ExceptionType::HotelOrderFailed,
                };
                self.exceptions
                    .record(
                        order.id,
                        exception_type,
                        json!({
                            "item_id": item.id,
                            "resource_id": item.resource_id,
                            "resource_name": item.resource_name,
                            "error": resolution.error_message,
                        }),
                    )
                    .await?;
            }
            self.rollup(order_id).await?;
        }
        // 上次处理可能在子单落定后、汇总前中断
        self.rollup(order_id).await
    }

    async fn fulfill_item(
        &self,
        order: &order_entity::Model,
        item: &order_item_entity::Model,
    ) -> (OrderItemStatus, ItemResolution) {
        let resource = match self.resource(item).await {
            Ok(r) => r,
            Err(e) => {
                return (
                    OrderItemStatus::Failed,
                    ItemResolution {
                        resource_order_no: None,
                        error_message: Some(e.to_string()),
                    },
                );
            }
        };

        if !resource.auto_fulfills {
            return (
                OrderItemStatus::Success,
                ItemResolution {
                    resource_order_no: Some(manual_confirmation_no(item.id, self.clock.now())),
                    error_message: None,
                },
            );
        }

        let request = BookingRequest {
            item_id: item.id,
            order_no: order.order_no.clone(),
            item_type: item.item_type,
            provider_code: resource.provider_code,
            resource_id: item.resource_id,
            resource_name: item.resource_name.clone(),
            room_type_id: (item.item_type == OrderItemType::Hotel).then_some(order.room_type_id),
            quantity: item.quantity,
            check_in_date: order.check_in_date,
            check_out_date: order.check_out_date,
            contact_name: order.contact_name.clone(),
            contact_phone: order.contact_phone.clone(),
        };
        match self.provider.book(&request).await {
            Ok(confirmation) => (
                OrderItemStatus::Success,
                ItemResolution {
                    resource_order_no: Some(confirmation),
                    error_message: None,
                },
            ),
            Err(e) => {
                log::error!(
                    "Booking of item {} ({}) for order {} failed: {e}",
                    item.id,
                    item.resource_name,
                    order.order_no
                );
                (
                    OrderItemStatus::Failed,
                    ItemResolution {
                        resource_order_no: None,
                        error_message: Some(e.to_string()),
                    },
                )
            }
        }
    }

    async fn resource(&self, item: &order_item_entity::Model) -> AppResult<Resource> {
        match item.item_type {
            OrderItemType::Ticket => {
                let ticket = self
                    .catalog
                    .find_ticket(item.resource_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("ticket {}", item.resource_id)))?;
                Ok(Resource {
                    auto_fulfills: ticket.auto_fulfills(),
                    provider_code: ticket.provider_code,
                })
            }
            OrderItemType::Hotel => {
                let hotel = self
                    .catalog
                    .find_hotel(item.resource_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("hotel {}", item.resource_id)))?;
                Ok(Resource {
                    auto_fulfills: hotel.auto_fulfills(),
                    provider_code: hotel.provider_code,
                })
            }
        }
    }

    /// 子单状态只能沿 PENDING -> PROCESSING -> SUCCESS | FAILED 推进
    async fn advance_item(
        &self,
        item: &order_item_entity::Model,
        from: OrderItemStatus,
        to: OrderItemStatus,
        resolution: ItemResolution,
    ) -> AppResult<bool> {
        if !from.can_transition_to(to) {
            return Err(AppError::StateError(format!(
                "order item {} cannot move from {from} to {to}",
                item.id
            )));
        }
        let moved = self
            .orders
            .transition_item(item.id, from, to, resolution, self.clock.now())
            .await?;
        if !moved {
            log::warn!("Order item {} was not {from}, skip -> {to}", item.id);
        }
        Ok(moved)
    }

    /// 汇总主单状态：全部成功 -> CONFIRMED；无进行中且有失败 -> FAILED；否则不变
    pub async fn rollup(&self, order_id: i64) -> AppResult<OrderStatus> {
        let order = self.load_order(order_id).await?;
        if order.status.is_terminal() {
            return Ok(order.status);
        }

        let items = self.orders.order_items(order_id).await?;
        if items.is_empty() {
            return Ok(order.status);
        }
        let in_flight = items.iter().any(|i| !i.status.is_settled());
        let next = if items.iter().all(|i| i.status == OrderItemStatus::Success) {
            OrderStatus::Confirmed
        } else if !in_flight {
            OrderStatus::Failed
        } else {
            return Ok(order.status);
        };

        if self
            .orders
            .transition_order(order_id, OrderStatus::Paid, next, self.clock.now())
            .await?
        {
            log::info!("Order {} {} -> {next}", order.order_no, order.status);
            Ok(next)
        } else {
            Ok(self.load_order(order_id).await?.status)
        }
    }

    pub async fn cancel_order(
        &self,
        platform: OtaPlatform,
        ota_order_no: &str,
    ) -> AppResult<OrderResponse> {
        let order = self
            .orders
            .find_order_by_ota(platform, ota_order_no)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{platform} order {ota_order_no}")))?;
        if order.status.is_terminal() {
            return Err(AppError::StateError(format!(
                "order {} is already {}",
                order.order_no, order.status
            )));
        }
        if !self
            .orders
            .transition_order(
                order.id,
                OrderStatus::Paid,
                OrderStatus::Cancelled,
                self.clock.now(),
            )
            .await?
        {
            return Err(AppError::StateError(format!(
                "order {} changed state concurrently",
                order.order_no
            )));
        }
        log::info!("Order {} cancelled by {platform}", order.order_no);
        let order = self.load_order(order.id).await?;
        self.respond(order).await
    }

    pub async fn get_order(&self, order_no: &str) -> AppResult<OrderResponse> {
        let order = self
            .orders
            .find_order_by_no(order_no)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {order_no}")))?;
        self.respond(order).await
    }

    async fn load_order(&self, order_id: i64) -> AppResult<order_entity::Model> {
        self.orders
            .find_order(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))
    }

    async fn respond(&self, order: order_entity::Model) -> AppResult<OrderResponse> {
        let items = self.orders.order_items(order.id).await?;
        Ok(OrderResponse::new(order, items))
    }
}
