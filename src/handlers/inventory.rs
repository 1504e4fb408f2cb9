use crate::models::*;
use crate::services::StockService;
use actix_web::{HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    put,
    path = "/api/v1/inventory/hotel-stocks",
    tag = "inventory",
    request_body = HotelStockBatchRequest,
    responses(
        (status = 200, description = "保存酒店房价库存成功", body = StockBatchResponse),
        (status = 400, description = "请求参数错误"),
        (status = 404, description = "房型不存在")
    )
)]
pub async fn save_hotel_stocks(
    stock_service: web::Data<StockService>,
    request: web::Json<HotelStockBatchRequest>,
) -> Result<HttpResponse> {
    match stock_service
        .save_hotel_stocks(request.into_inner().items)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/api/v1/inventory/ticket-prices",
    tag = "inventory",
    request_body = TicketPriceBatchRequest,
    responses(
        (status = 200, description = "保存门票价格成功", body = StockBatchResponse),
        (status = 400, description = "请求参数错误"),
        (status = 404, description = "门票不存在")
    )
)]
pub async fn save_ticket_prices(
    stock_service: web::Data<StockService>,
    request: web::Json<TicketPriceBatchRequest>,
) -> Result<HttpResponse> {
    match stock_service
        .save_ticket_prices(request.into_inner().items)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory/hotel-stocks",
    tag = "inventory",
    request_body = HotelStockDeleteRequest,
    responses(
        (status = 200, description = "删除酒店房价库存成功", body = StockDeleteResponse),
        (status = 400, description = "请求参数错误")
    )
)]
pub async fn delete_hotel_stocks(
    stock_service: web::Data<StockService>,
    request: web::Json<HotelStockDeleteRequest>,
) -> Result<HttpResponse> {
    match stock_service
        .delete_hotel_stocks(request.into_inner().items)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/inventory/ticket-prices",
    tag = "inventory",
    request_body = TicketPriceDeleteRequest,
    responses(
        (status = 200, description = "删除门票价格成功", body = StockDeleteResponse),
        (status = 400, description = "请求参数错误")
    )
)]
pub async fn delete_ticket_prices(
    stock_service: web::Data<StockService>,
    request: web::Json<TicketPriceDeleteRequest>,
) -> Result<HttpResponse> {
    match stock_service
        .delete_ticket_prices(request.into_inner().items)
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn inventory_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/inventory")
            .service(
                web::resource("/hotel-stocks")
                    .route(web::put().to(save_hotel_stocks))
                    .route(web::delete().to(delete_hotel_stocks)),
            )
            .service(
                web::resource("/ticket-prices")
                    .route(web::put().to(save_ticket_prices))
                    .route(web::delete().to(delete_ticket_prices)),
            ),
    );
}
