use crate::models::*;
use crate::services::FulfillmentService;
use actix_web::{HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/api/v1/orders/{order_no}",
    tag = "order",
    params(("order_no" = String, Path, description = "内部订单号")),
    responses(
        (status = 200, description = "获取订单成功", body = OrderResponse),
        (status = 404, description = "订单不存在")
    )
)]
pub async fn get_order(
    fulfillment_service: web::Data<FulfillmentService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match fulfillment_service.get_order(&path.into_inner()).await {
        Ok(order) => Ok(HttpResponse::Ok().json(ApiResponse::success(order))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn order_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/orders").route("/{order_no}", web::get().to(get_order)));
}
