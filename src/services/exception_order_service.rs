use crate::entities::{ExceptionStatus, ExceptionType, exception_order_entity};
use crate::error::{AppError, AppResult};
use crate::models::{
    ExceptionOrderQuery, ExceptionOrderResponse, NewExceptionOrder, PaginatedResponse,
    PaginationParams,
};
use crate::repository::OrderRepository;
use crate::utils::Clock;
use serde_json::Value;
use std::sync::Arc;

/// 异常单：PENDING -> PROCESSING -> RESOLVED
#[derive(Clone)]
pub struct ExceptionOrderService {
    orders: Arc<dyn OrderRepository>,
    clock: Arc<dyn Clock>,
}

impl ExceptionOrderService {
    pub fn new(orders: Arc<dyn OrderRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { orders, clock }
    }

    pub async fn record(
        &self,
        order_id: i64,
        exception_type: ExceptionType,
        exception_data: Value,
    ) -> AppResult<exception_order_entity::Model> {
        let model = self
            .orders
            .insert_exception(
                NewExceptionOrder {
                    order_id,
                    exception_type,
                    exception_data,
                },
                self.clock.now(),
            )
            .await?;
        log::warn!(
            "Exception order {} recorded for order {order_id}: {exception_type:?}",
            model.id
        );
        Ok(model)
    }

    pub async fn list(
        &self,
        query: ExceptionOrderQuery,
    ) -> AppResult<PaginatedResponse<ExceptionOrderResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let (rows, total) = self
            .orders
            .list_exceptions(
                query.status,
                params.get_offset() as u64,
                params.get_limit() as u64,
            )
            .await?;
        Ok(PaginatedResponse::new(
            rows.into_iter().map(Into::into).collect(),
            params.get_page(),
            params.get_limit(),
            total as i64,
        ))
    }

    /// 认领异常单
    pub async fn start_handling(
        &self,
        exception_id: i64,
        handler: &str,
    ) -> AppResult<ExceptionOrderResponse> {
        self.transition(
            exception_id,
            ExceptionStatus::Pending,
            ExceptionStatus::Processing,
            handler,
            None,
        )
        .await
    }

    pub async fn resolve(
        &self,
        exception_id: i64,
        handler: &str,
        remark: Option<String>,
    ) -> AppResult<ExceptionOrderResponse> {
        self.transition(
            exception_id,
            ExceptionStatus::Processing,
            ExceptionStatus::Resolved,
            handler,
            remark,
        )
        .await
    }

    async fn transition(
        &self,
        exception_id: i64,
        expected: ExceptionStatus,
        next: ExceptionStatus,
        handler: &str,
        remark: Option<String>,
    ) -> AppResult<ExceptionOrderResponse> {
        let handler = handler.trim();
        if handler.is_empty() {
            return Err(AppError::ValidationError("handler is required".to_string()));
        }

        let current = self
            .orders
            .find_exception(exception_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("exception order {exception_id}")))?;
        if current.status != expected {
            return Err(AppError::StateError(format!(
                "exception order {exception_id} is {}, expected {expected}",
                current.status
            )));
        }

        let moved = self
            .orders
            .transition_exception(
                exception_id,
                expected,
                next,
                handler,
                remark,
                self.clock.now(),
            )
            .await?;
        if !moved {
            return Err(AppError::StateError(format!(
                "exception order {exception_id} was changed concurrently"
            )));
        }
        log::info!("Exception order {exception_id} {expected} -> {next} by {handler}");

        let updated = self
            .orders
            .find_exception(exception_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("exception order {exception_id}")))?;
        Ok(updated.into())
    }
}
