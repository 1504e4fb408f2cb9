use actix_web::web;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{
    ExceptionStatus, ExceptionType, OrderItemStatus, OrderItemType, OrderStatus, OtaPlatform,
    PriceSource,
};
use crate::handlers;
use crate::models::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::inventory::save_hotel_stocks,
        handlers::inventory::save_ticket_prices,
        handlers::inventory::delete_hotel_stocks,
        handlers::inventory::delete_ticket_prices,
        handlers::package::add_bundle_item,
        handlers::package::remove_bundle_item,
        handlers::package::add_hotel_room_type,
        handlers::package::remove_hotel_room_type,
        handlers::package::get_daily_prices,
        handlers::package::rebuild_prices,
        handlers::package::sync_prices,
        handlers::order::get_order,
        handlers::exception_order::list_exception_orders,
        handlers::exception_order::handle_exception_order,
        handlers::exception_order::resolve_exception_order,
        handlers::webhook::price_query,
        handlers::webhook::create_order,
        handlers::webhook::cancel_order,
    ),
    components(
        schemas(
            HotelStockInput,
            HotelStockBatchRequest,
            TicketPriceInput,
            TicketPriceBatchRequest,
            StockBatchResponse,
            HotelStockKey,
            HotelStockDeleteRequest,
            TicketPriceKey,
            TicketPriceDeleteRequest,
            StockDeleteResponse,
            BundleItemRequest,
            BundleItemResponse,
            HotelRoomTypeRequest,
            HotelRoomTypeResponse,
            DateWindow,
            DailyPriceResponse,
            RebuildOutcome,
            SyncRequest,
            SyncReport,
            CombinationResult,
            PriceQueryRequest,
            PriceQueryResponse,
            PriceOrigin,
            CreateOtaOrderRequest,
            OrderResponse,
            OrderItemResponse,
            ExceptionOrderQuery,
            HandleExceptionRequest,
            ResolveExceptionRequest,
            ExceptionOrderResponse,
            OtaPlatform,
            OrderStatus,
            OrderItemType,
            OrderItemStatus,
            ExceptionType,
            ExceptionStatus,
            PriceSource,
            ApiError,
        )
    ),
    tags(
        (name = "inventory", description = "Hotel stock and ticket price API"),
        (name = "package", description = "Package composition, price cache and OTA sync API"),
        (name = "order", description = "Order query API"),
        (name = "exception", description = "Exception order handling API"),
        (name = "ota", description = "OTA inbound callbacks"),
    ),
    info(
        title = "Package Sync Backend API",
        version = "1.0.0",
        description = "Travel package price sync and OTA order fulfillment"
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_ota_callbacks() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/ota/{platform}/orders"));
        assert!(doc.paths.paths.contains_key("/api/v1/packages/{id}/sync/{platform}"));
    }

    #[test]
    fn test_openapi_lists_inventory_deletes() {
        let doc = ApiDoc::openapi();
        let stocks = &doc.paths.paths["/api/v1/inventory/hotel-stocks"];
        assert!(stocks.operations.contains_key(&utoipa::openapi::PathItemType::Put));
        assert!(stocks.operations.contains_key(&utoipa::openapi::PathItemType::Delete));
    }
}
