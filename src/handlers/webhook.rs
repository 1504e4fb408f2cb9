use crate::entities::OtaPlatform;
use crate::models::*;
use crate::services::{FulfillmentService, OrderRouter};
use actix_web::{HttpResponse, ResponseError, Result, web};
use log::{info, warn};

/// OTA 回调：询价
///
/// 按产品编码和入住日期返回单价与入住期间的可用库存
#[utoipa::path(
    post,
    path = "/ota/{platform}/price-query",
    tag = "ota",
    params(("platform" = String, Path, description = "平台: ctrip/meituan/fliggy")),
    request_body = PriceQueryRequest,
    responses(
        (status = 200, description = "询价成功", body = PriceQueryResponse),
        (status = 400, description = "产品编码格式错误或平台不支持"),
        (status = 404, description = "产品或价格不存在")
    )
)]
pub async fn price_query(
    order_router: web::Data<OrderRouter>,
    path: web::Path<String>,
    request: web::Json<PriceQueryRequest>,
) -> Result<HttpResponse> {
    let platform = match path.into_inner().parse::<OtaPlatform>() {
        Ok(platform) => platform,
        Err(e) => return Ok(e.error_response()),
    };
    let request = request.into_inner();

    match order_router
        .quote(&request.product_code, request.check_in_date, request.quantity)
        .await
    {
        Ok(quote) => {
            info!(
                "{platform} price query {} on {}: {} ({} available)",
                request.product_code, request.check_in_date, quote.sale_price, quote.available
            );
            Ok(HttpResponse::Ok().json(ApiResponse::success(quote)))
        }
        Err(e) => Ok(e.error_response()),
    }
}

/// OTA 回调：已支付订单
///
/// 同一平台订单号重复推送时返回已有订单
#[utoipa::path(
    post,
    path = "/ota/{platform}/orders",
    tag = "ota",
    params(("platform" = String, Path, description = "平台: ctrip/meituan/fliggy")),
    request_body = CreateOtaOrderRequest,
    responses(
        (status = 200, description = "订单已接收", body = OrderResponse),
        (status = 400, description = "请求参数错误"),
        (status = 404, description = "产品不存在")
    )
)]
pub async fn create_order(
    fulfillment_service: web::Data<FulfillmentService>,
    path: web::Path<String>,
    request: web::Json<CreateOtaOrderRequest>,
) -> Result<HttpResponse> {
    let platform = match path.into_inner().parse::<OtaPlatform>() {
        Ok(platform) => platform,
        Err(e) => return Ok(e.error_response()),
    };
    let request = request.into_inner();
    info!(
        "Received {platform} order {} for {}",
        request.ota_order_no, request.product_code
    );

    match fulfillment_service.create_order(platform, request).await {
        Ok(order) => Ok(HttpResponse::Ok().json(ApiResponse::success(order))),
        Err(e) => {
            warn!("Failed to accept {platform} order: {e}");
            Ok(e.error_response())
        }
    }
}

/// OTA 回调：取消订单
#[utoipa::path(
    post,
    path = "/ota/{platform}/orders/{ota_order_no}/cancel",
    tag = "ota",
    params(
        ("platform" = String, Path, description = "平台: ctrip/meituan/fliggy"),
        ("ota_order_no" = String, Path, description = "平台订单号")
    ),
    responses(
        (status = 200, description = "订单已取消", body = OrderResponse),
        (status = 404, description = "订单不存在"),
        (status = 409, description = "订单已完结，不能取消")
    )
)]
pub async fn cancel_order(
    fulfillment_service: web::Data<FulfillmentService>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse> {
    let (platform, ota_order_no) = path.into_inner();
    let platform = match platform.parse::<OtaPlatform>() {
        Ok(platform) => platform,
        Err(e) => return Ok(e.error_response()),
    };

    match fulfillment_service.cancel_order(platform, &ota_order_no).await {
        Ok(order) => {
            info!("{platform} order {ota_order_no} cancelled");
            Ok(HttpResponse::Ok().json(ApiResponse::success(order)))
        }
        Err(e) => Ok(e.error_response()),
    }
}

/// 配置 OTA 回调路由
pub fn webhook_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/ota/{platform}")
            .route("/price-query", web::post().to(price_query))
            .route("/orders", web::post().to(create_order))
            .route("/orders/{ota_order_no}/cancel", web::post().to(cancel_order)),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::provider::FakeProvider;
    use crate::repository::memory::MemoryRepository;
    use crate::services::ExceptionOrderService;
    use crate::tasks::RecordingQueue;
    use crate::utils::Clock;
    use crate::utils::clock::FakeClock;
    use crate::utils::composite_code;
    use actix_web::{App, http::StatusCode, test};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 1).unwrap()
    }

    /// 酒店 + 1 张门票，单晚
    fn services() -> (OrderRouter, FulfillmentService, String) {
        let repo = Arc::new(MemoryRepository::new());
        let hotel = repo.hotel("Harbor", false);
        let room = repo.room_type(hotel, "Suite");
        let ticket = repo.ticket("Ferry", false);
        let product = repo.product("HARBOR", 1);
        repo.link(product, hotel, room);
        repo.bundle(product, ticket, 1);
        repo.set_stock(hotel, room, today(), dec!(300.00), 3);
        repo.set_ticket_price(ticket, today(), dec!(40.00), dec!(30.00));

        let clock: Arc<dyn Clock> = Arc::new(FakeClock::on(today()));
        let router = OrderRouter::new(repo.clone(), repo.clone());
        let fulfillment = FulfillmentService::new(
            repo.clone(),
            repo.clone(),
            router.clone(),
            ExceptionOrderService::new(repo.clone(), clock.clone()),
            Arc::new(FakeProvider::new()),
            Arc::new(RecordingQueue::new()),
            clock,
        );
        (router, fulfillment, composite_code::generate(product, hotel, room))
    }

    #[actix_web::test]
    async fn test_price_query_and_order_callbacks() {
        let (router, fulfillment, code) = services();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(router))
                .app_data(web::Data::new(fulfillment))
                .configure(webhook_config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/ota/meituan/price-query")
            .set_json(json!({ "product_code": code, "check_in_date": "2026-08-01" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["sale_price"], "340.00");
        assert_eq!(body["data"]["available"], 3);

        let order = json!({
            "ota_order_no": "MT-900",
            "product_code": code,
            "check_in_date": "2026-08-01",
            "contact_name": "Wang",
            "contact_phone": "13900000000"
        });
        let req = test::TestRequest::post()
            .uri("/ota/meituan/orders")
            .set_json(&order)
            .to_request();
        let first: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(first["data"]["status"], "PAID");

        // 重复推送返回同一订单
        let req = test::TestRequest::post()
            .uri("/ota/meituan/orders")
            .set_json(&order)
            .to_request();
        let again: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(again["data"]["order_no"], first["data"]["order_no"]);

        let req = test::TestRequest::post()
            .uri("/ota/meituan/orders/MT-900/cancel")
            .to_request();
        let cancelled: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(cancelled["data"]["status"], "CANCELLED");
    }

    #[actix_web::test]
    async fn test_unknown_platform_is_rejected() {
        let (router, fulfillment, code) = services();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(router))
                .app_data(web::Data::new(fulfillment))
                .configure(webhook_config),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/ota/qunar/price-query")
            .set_json(json!({ "product_code": code, "check_in_date": "2026-08-01" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "UNSUPPORTED");
    }
}
