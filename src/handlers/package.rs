use crate::error::AppError;
use crate::models::*;
use crate::services::{DailyPriceService, OtaSyncService, PackageService};
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/api/v1/packages/{id}/bundle-items",
    tag = "package",
    params(("id" = i64, Path, description = "产品ID")),
    request_body = BundleItemRequest,
    responses(
        (status = 200, description = "添加门票成功", body = BundleItemResponse),
        (status = 404, description = "产品或门票不存在")
    )
)]
pub async fn add_bundle_item(
    package_service: web::Data<PackageService>,
    path: web::Path<i64>,
    request: web::Json<BundleItemRequest>,
) -> Result<HttpResponse> {
    match package_service
        .add_bundle_item(path.into_inner(), request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/packages/{id}/bundle-items/{item_id}",
    tag = "package",
    params(
        ("id" = i64, Path, description = "产品ID"),
        ("item_id" = i64, Path, description = "门票条目ID")
    ),
    responses(
        (status = 200, description = "移除门票成功"),
        (status = 404, description = "条目不存在")
    )
)]
pub async fn remove_bundle_item(
    package_service: web::Data<PackageService>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let (product_id, item_id) = path.into_inner();
    match package_service.remove_bundle_item(product_id, item_id).await {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::message("门票已移除"))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/packages/{id}/hotel-room-types",
    tag = "package",
    params(("id" = i64, Path, description = "产品ID")),
    request_body = HotelRoomTypeRequest,
    responses(
        (status = 200, description = "添加酒店房型成功", body = HotelRoomTypeResponse),
        (status = 400, description = "房型不属于该酒店"),
        (status = 404, description = "产品、酒店或房型不存在")
    )
)]
pub async fn add_hotel_room_type(
    package_service: web::Data<PackageService>,
    path: web::Path<i64>,
    request: web::Json<HotelRoomTypeRequest>,
) -> Result<HttpResponse> {
    match package_service
        .add_hotel_room_type(path.into_inner(), request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    delete,
    path = "/api/v1/packages/{id}/hotel-room-types/{association_id}",
    tag = "package",
    params(
        ("id" = i64, Path, description = "产品ID"),
        ("association_id" = i64, Path, description = "酒店房型关联ID")
    ),
    responses(
        (status = 200, description = "移除酒店房型成功"),
        (status = 404, description = "关联不存在")
    )
)]
pub async fn remove_hotel_room_type(
    package_service: web::Data<PackageService>,
    path: web::Path<(i64, i64)>,
) -> Result<HttpResponse> {
    let (product_id, association_id) = path.into_inner();
    match package_service
        .remove_hotel_room_type(product_id, association_id)
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(ApiResponse::message("酒店房型已移除"))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/packages/{id}/daily-prices",
    tag = "package",
    params(
        ("id" = i64, Path, description = "产品ID"),
        ("hotel_id" = i64, Query, description = "酒店ID"),
        ("room_type_id" = i64, Query, description = "房型ID"),
        ("start_date" = String, Query, description = "开始日期 YYYY-MM-DD"),
        ("end_date" = String, Query, description = "结束日期 YYYY-MM-DD")
    ),
    responses(
        (status = 200, description = "获取每日价格成功", body = [DailyPriceResponse]),
        (status = 400, description = "日期区间不合法")
    )
)]
pub async fn get_daily_prices(
    package_service: web::Data<PackageService>,
    path: web::Path<i64>,
    query: web::Query<DailyPriceQuery>,
) -> Result<HttpResponse> {
    let Some(window) = query.window() else {
        return Ok(AppError::ValidationError(format!(
            "start_date {} is after end_date {}",
            query.start_date, query.end_date
        ))
        .error_response());
    };

    match package_service
        .daily_prices(path.into_inner(), query.hotel_id, query.room_type_id, window)
        .await
    {
        Ok(prices) => Ok(HttpResponse::Ok().json(ApiResponse::success(prices))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/packages/{id}/rebuild-prices",
    tag = "package",
    params(("id" = i64, Path, description = "产品ID")),
    responses(
        (status = 200, description = "价格缓存已重建", body = RebuildOutcome),
        (status = 404, description = "产品不存在")
    )
)]
pub async fn rebuild_prices(
    daily_price_service: web::Data<DailyPriceService>,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    match daily_price_service.rebuild(path.into_inner()).await {
        Ok(outcome) => Ok(HttpResponse::Ok().json(ApiResponse::success(outcome))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/packages/{id}/sync/{platform}",
    tag = "package",
    params(
        ("id" = i64, Path, description = "产品ID"),
        ("platform" = String, Path, description = "平台: ctrip/meituan/fliggy")
    ),
    request_body(content = SyncRequest, description = "可选，指定推送日期"),
    responses(
        (status = 200, description = "推送完成，逐组合结果见 results", body = SyncReport),
        (status = 400, description = "平台不支持"),
        (status = 422, description = "产品未启用或缺少配置")
    )
)]
pub async fn sync_prices(
    ota_sync_service: web::Data<OtaSyncService>,
    path: web::Path<(i64, String)>,
    request: Option<web::Json<SyncRequest>>,
) -> Result<HttpResponse> {
    let (product_id, platform) = path.into_inner();
    let dates = request.and_then(|r| r.into_inner().dates);

    match ota_sync_service
        .sync_product_to_platform(product_id, &platform, dates)
        .await
    {
        Ok(report) => Ok(HttpResponse::Ok().json(json!({
            "success": report.success,
            "data": report
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn package_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/packages/{id}")
            .route("/bundle-items", web::post().to(add_bundle_item))
            .route("/bundle-items/{item_id}", web::delete().to(remove_bundle_item))
            .route("/hotel-room-types", web::post().to(add_hotel_room_type))
            .route(
                "/hotel-room-types/{association_id}",
                web::delete().to(remove_hotel_room_type),
            )
            .route("/daily-prices", web::get().to(get_daily_prices))
            .route("/rebuild-prices", web::post().to(rebuild_prices))
            .route("/sync/{platform}", web::post().to(sync_prices)),
    );
}
