use super::{OrderRepository, SeaOrmRepository};
use crate::entities::{
    ExceptionStatus, OrderItemStatus, OrderStatus, OtaPlatform,
    exception_order_entity as exceptions, order_entity as orders, order_item_entity as items,
};
use crate::error::{AppError, AppResult};
use crate::models::{ItemResolution, NewExceptionOrder, NewOrder, NewOrderItem};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    DbErr, QuerySelect, Set, SqlErr, TransactionTrait,
};

#[async_trait]
impl OrderRepository for SeaOrmRepository {
    async fn find_order(&self, order_id: i64) -> AppResult<Option<orders::Model>> {
        Ok(orders::Entity::find_by_id(order_id).one(&self.pool).await?)
    }

    async fn find_order_by_no(&self, order_no: &str) -> AppResult<Option<orders::Model>> {
        Ok(orders::Entity::find()
            .filter(orders::Column::OrderNo.eq(order_no))
            .one(&self.pool)
            .await?)
    }

    async fn find_order_by_ota(
        &self,
        platform: OtaPlatform,
        ota_order_no: &str,
    ) -> AppResult<Option<orders::Model>> {
        Ok(orders::Entity::find()
            .filter(orders::Column::Platform.eq(platform))
            .filter(orders::Column::OtaOrderNo.eq(ota_order_no))
            .one(&self.pool)
            .await?)
    }

    async fn insert_order(&self, order: NewOrder) -> AppResult<orders::Model> {
        let saved = orders::ActiveModel {
            order_no: Set(order.order_no),
            ota_order_no: Set(order.ota_order_no),
            platform: Set(order.platform),
            product_id: Set(order.product_id),
            hotel_id: Set(order.hotel_id),
            room_type_id: Set(order.room_type_id),
            check_in_date: Set(order.check_in_date),
            check_out_date: Set(order.check_out_date),
            quantity: Set(order.quantity),
            unit_price: Set(order.unit_price),
            total_amount: Set(order.total_amount),
            settlement_amount: Set(order.settlement_amount),
            status: Set(OrderStatus::Paid),
            contact_name: Set(order.contact_name),
            contact_phone: Set(order.contact_phone),
            remark: Set(order.remark),
            paid_at: Set(Some(order.paid_at)),
            created_at: Set(Some(order.paid_at)),
            updated_at: Set(Some(order.paid_at)),
            ..Default::default()
        }
        .insert(&self.pool)
        .await
        .map_err(duplicate_as_state_error)?;
        Ok(saved)
    }

    async fn order_items(&self, order_id: i64) -> AppResult<Vec<items::Model>> {
        Ok(items::Entity::find()
            .filter(items::Column::OrderId.eq(order_id))
            .order_by_asc(items::Column::Id)
            .all(&self.pool)
            .await?)
    }

    async fn split_order(
        &self,
        order_id: i64,
        new_items: Vec<NewOrderItem>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<items::Model>> {
        let txn = self.pool.begin().await?;

        // 锁住主单，防止并发拆分
        orders::Entity::find_by_id(order_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("order {order_id}")))?;

        let existing = items::Entity::find()
            .filter(items::Column::OrderId.eq(order_id))
            .count(&txn)
            .await?;
        if existing > 0 {
            return Err(AppError::StateError(format!(
                "order {order_id} has already been split"
            )));
        }

        let mut saved = Vec::with_capacity(new_items.len());
        for item in new_items {
            let model = items::ActiveModel {
                order_id: Set(order_id),
                item_type: Set(item.item_type),
                resource_id: Set(item.resource_id),
                resource_name: Set(item.resource_name),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                total_price: Set(item.total_price),
                status: Set(OrderItemStatus::Pending),
                retry_count: Set(0),
                max_retries: Set(item.max_retries),
                created_at: Set(Some(now)),
                updated_at: Set(Some(now)),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            saved.push(model);
        }

        txn.commit().await?;
        Ok(saved)
    }

    async fn transition_order(
        &self,
        order_id: i64,
        expected: OrderStatus,
        next: OrderStatus,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut changes = orders::ActiveModel {
            status: Set(next),
            updated_at: Set(Some(at)),
            ..Default::default()
        };
        match next {
            OrderStatus::Confirmed => changes.confirmed_at = Set(Some(at)),
            OrderStatus::Cancelled => changes.cancelled_at = Set(Some(at)),
            OrderStatus::Paid | OrderStatus::Failed => {}
        }

        let res = orders::Entity::update_many()
            .set(changes)
            .filter(orders::Column::Id.eq(order_id))
            .filter(orders::Column::Status.eq(expected))
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected == 1)
    }

    async fn transition_item(
        &self,
        item_id: i64,
        expected: OrderItemStatus,
        next: OrderItemStatus,
        resolution: ItemResolution,
        at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut changes = items::ActiveModel {
            status: Set(next),
            updated_at: Set(Some(at)),
            ..Default::default()
        };
        if next.is_settled() {
            changes.processed_at = Set(Some(at));
        }
        if let Some(no) = resolution.resource_order_no {
            changes.resource_order_no = Set(Some(no));
        }
        if let Some(msg) = resolution.error_message {
            changes.error_message = Set(Some(msg));
        }

        let res = items::Entity::update_many()
            .set(changes)
            .filter(items::Column::Id.eq(item_id))
            .filter(items::Column::Status.eq(expected))
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected == 1)
    }

    async fn insert_exception(
        &self,
        exception: NewExceptionOrder,
        now: DateTime<Utc>,
    ) -> AppResult<exceptions::Model> {
        let saved = exceptions::ActiveModel {
            order_id: Set(exception.order_id),
            exception_type: Set(exception.exception_type),
            status: Set(ExceptionStatus::Pending),
            exception_data: Set(exception.exception_data),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn find_exception(&self, exception_id: i64) -> AppResult<Option<exceptions::Model>> {
        Ok(exceptions::Entity::find_by_id(exception_id)
            .one(&self.pool)
            .await?)
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
        let mut changes = exceptions::ActiveModel {
            status: Set(next),
            handler: Set(Some(handler.to_string())),
            updated_at: Set(Some(at)),
            ..Default::default()
        };
        if next == ExceptionStatus::Resolved {
            changes.resolved_at = Set(Some(at));
            changes.resolve_remark = Set(remark);
        }

        let res = exceptions::Entity::update_many()
            .set(changes)
            .filter(exceptions::Column::Id.eq(exception_id))
            .filter(exceptions::Column::Status.eq(expected))
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected == 1)
    }

    async fn list_exceptions(
        &self,
        status: Option<ExceptionStatus>,
        offset: u64,
        limit: u64,
    ) -> AppResult<(Vec<exceptions::Model>, u64)> {
        let mut query = exceptions::Entity::find();
        if let Some(status) = status {
            query = query.filter(exceptions::Column::Status.eq(status));
        }

        let total = query.clone().count(&self.pool).await?;
        let rows = query
            .order_by_desc(exceptions::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(&self.pool)
            .await?;
        Ok((rows, total))
    }
}

/// (platform, ota_order_no) 唯一约束冲突说明同一 OTA 订单已被并发落库
fn duplicate_as_state_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            AppError::StateError(format!("duplicate ota order: {detail}"))
        }
        _ => AppError::DatabaseError(err),
    }
}
