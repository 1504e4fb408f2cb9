use crate::models::*;
use crate::services::ExceptionOrderService;
use actix_web::{HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/api/v1/exception-orders",
    tag = "exception",
    params(
        ("page" = Option<u32>, Query, description = "页码"),
        ("per_page" = Option<u32>, Query, description = "每页数量"),
        ("status" = Option<String>, Query, description = "状态: pending/processing/resolved")
    ),
    responses(
        (status = 200, description = "获取异常订单列表成功")
    )
)]
pub async fn list_exception_orders(
    exception_service: web::Data<ExceptionOrderService>,
    query: web::Query<ExceptionOrderQuery>,
) -> Result<HttpResponse> {
    match exception_service.list(query.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/exception-orders/{id}/handle",
    tag = "exception",
    params(("id" = i64, Path, description = "异常订单ID")),
    request_body = HandleExceptionRequest,
    responses(
        (status = 200, description = "开始处理", body = ExceptionOrderResponse),
        (status = 404, description = "异常订单不存在"),
        (status = 409, description = "状态不允许")
    )
)]
pub async fn handle_exception_order(
    exception_service: web::Data<ExceptionOrderService>,
    path: web::Path<i64>,
    request: web::Json<HandleExceptionRequest>,
) -> Result<HttpResponse> {
    match exception_service
        .start_handling(path.into_inner(), &request.handler)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/exception-orders/{id}/resolve",
    tag = "exception",
    params(("id" = i64, Path, description = "异常订单ID")),
    request_body = ResolveExceptionRequest,
    responses(
        (status = 200, description = "已解决", body = ExceptionOrderResponse),
        (status = 404, description = "异常订单不存在"),
        (status = 409, description = "状态不允许")
    )
)]
pub async fn resolve_exception_order(
    exception_service: web::Data<ExceptionOrderService>,
    path: web::Path<i64>,
    request: web::Json<ResolveExceptionRequest>,
) -> Result<HttpResponse> {
    let request = request.into_inner();
    match exception_service
        .resolve(path.into_inner(), &request.handler, request.remark)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok()
            .json(ApiResponse::success_with_message(response, "异常订单已解决"))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn exception_order_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/exception-orders")
            .route("", web::get().to(list_exception_orders))
            .route("/{id}/handle", web::post().to(handle_exception_order))
            .route("/{id}/resolve", web::post().to(resolve_exception_order)),
    );
}
