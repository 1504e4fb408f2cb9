use crate::entities::product_entity;
use crate::error::{AppError, AppResult};
use crate::models::{DateWindow, PriceOrigin, PriceQueryResponse};
use crate::repository::{CatalogRepository, PriceCacheRepository};
use crate::services::PriceCalculator;
use crate::utils::composite_code;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

/// 编码解析后的定价结果
#[derive(Debug, Clone)]
pub struct RoutedPrice {
    pub product: product_entity::Model,
    pub hotel_id: i64,
    pub room_type_id: i64,
    pub sale_price: Decimal,
    pub cost_price: Decimal,
    pub source: PriceOrigin,
}

/// OTA 编码 -> 产品 / 酒店 / 房型 与当日价格
#[derive(Clone)]
pub struct OrderRouter {
    catalog: Arc<dyn CatalogRepository>,
    cache: Arc<dyn PriceCacheRepository>,
    calculator: PriceCalculator,
}

impl OrderRouter {
    pub fn new(catalog: Arc<dyn CatalogRepository>, cache: Arc<dyn PriceCacheRepository>) -> Self {
        Self {
            calculator: PriceCalculator::new(catalog.clone()),
            catalog,
            cache,
        }
    }

    /// 优先读价格缓存，未命中时现算
    pub async fn route(&self, code: &str, date: NaiveDate) -> AppResult<RoutedPrice> {
        let parsed = composite_code::parse(code)?;
        let product = self
            .catalog
            .find_product(parsed.product_id)
            .await?
            .filter(|p| p.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound(format!("product {}", parsed.product_id)))?;

        if let Some(row) = self
            .cache
            .cached_price(product.id, parsed.hotel_id, parsed.room_type_id, date)
            .await?
        {
            return Ok(RoutedPrice {
                product,
                hotel_id: row.hotel_id,
                room_type_id: row.room_type_id,
                sale_price: row.sale_price,
                cost_price: row.cost_price,
                source: PriceOrigin::Cache,
            });
        }

        log::warn!("Price cache miss for {code} on {date}, computing live");
        let association = self
            .catalog
            .find_association(product.id, parsed.hotel_id, parsed.room_type_id)
            .await?
            .filter(|a| a.is_active)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "hotel {} room type {} is not part of product {}",
                    parsed.hotel_id, parsed.room_type_id, product.code
                ))
            })?;
        let bundle_items = self.catalog.bundle_items(product.id).await?;
        let cell = self
            .calculator
            .compute_cell(&association, &bundle_items, date)
            .await?;

        Ok(RoutedPrice {
            product,
            hotel_id: association.hotel_id,
            room_type_id: association.room_type_id,
            sale_price: cell.sale_price,
            cost_price: cell.cost_price,
            source: PriceOrigin::Live,
        })
    }

    /// 入住期间（stay_days 晚）的最小可用房量，缺少库存记录按 0 计
    pub async fn stay_availability(
        &self,
        hotel_id: i64,
        room_type_id: i64,
        check_in: NaiveDate,
        nights: i32,
    ) -> AppResult<i32> {
        let last_night = check_in + Duration::days(i64::from(nights.max(1)) - 1);
        let Some(window) = DateWindow::new(check_in, last_night) else {
            return Ok(0);
        };
        let stocks: HashMap<NaiveDate, i32> = self
            .catalog
            .hotel_stocks(hotel_id, room_type_id, window)
            .await?
            .into_iter()
            .map(|s| (s.biz_date, s.stock_available))
            .collect();
        Ok(window
            .dates()
            .map(|d| stocks.get(&d).copied().unwrap_or(0))
            .min()
            .unwrap_or(0))
    }

    /// OTA 询价
    pub async fn quote(
        &self,
        code: &str,
        check_in: NaiveDate,
        quantity: i32,
    ) -> AppResult<PriceQueryResponse> {
        if quantity < 1 {
            return Err(AppError::ValidationError(
                "quantity must be at least 1".to_string(),
            ));
        }
        let routed = self.route(code, check_in).await?;
        let nights = routed.product.stay_days.max(1);
        let available = self
            .stay_availability(routed.hotel_id, routed.room_type_id, check_in, nights)
            .await?;

        Ok(PriceQueryResponse {
            product_code: code.to_string(),
            check_in_date: check_in,
            check_out_date: check_in + Duration::days(i64::from(nights)),
            sale_price: routed.sale_price,
            cost_price: routed.cost_price,
            available,
            bookable: routed.product.is_enabled() && available >= quantity,
            price_origin: routed.source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PricingConfig;
    use crate::services::DailyPriceService;
    use crate::repository::memory::MemoryRepository;
    use crate::tasks::RecordingQueue;
    use crate::utils::clock::FakeClock;
    use rust_decimal_macros::dec;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 7, day).unwrap()
    }

    struct Fixture {
        repo: Arc<MemoryRepository>,
        router: OrderRouter,
        product: i64,
        hotel: i64,
        room: i64,
        code: String,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(MemoryRepository::new());
        let hotel = repo.hotel("Ridge", false);
        let room = repo.room_type(hotel, "Loft");
        let ticket = repo.ticket("Cable car", false);
        let product = repo.product("RIDGE", 2);
        repo.link(product, hotel, room);
        repo.bundle(product, ticket, 2);
        repo.set_stock(hotel, room, d(10), dec!(180.00), 4);
        repo.set_stock(hotel, room, d(11), dec!(190.00), 2);
        repo.set_ticket_price(ticket, d(10), dec!(35.00), dec!(30.00));

        let router = OrderRouter::new(repo.clone(), repo.clone());
        Fixture {
            code: composite_code::generate(product, hotel, room),
            repo,
            router,
            product,
            hotel,
            room,
        }
    }

    async fn rebuild(f: &Fixture) {
        DailyPriceService::new(
            f.repo.clone(),
            f.repo.clone(),
            Arc::new(RecordingQueue::new()),
            Arc::new(FakeClock::on(d(10))),
            PricingConfig {
                horizon_days: 5,
                utc_offset_hours: 0,
                auto_sync_after_rebuild: false,
            },
            vec![],
        )
        .rebuild(f.product)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_cache_miss_matches_compute_cell() {
        let f = fixture();
        let routed = f.router.route(&f.code, d(10)).await.unwrap();
        assert_eq!(routed.source, PriceOrigin::Live);
        assert_eq!(routed.sale_price, dec!(250.00));

        let association = f
            .repo
            .find_association(f.product, f.hotel, f.room)
            .await
            .unwrap()
            .unwrap();
        let bundle = f.repo.bundle_items(f.product).await.unwrap();
        let cell = PriceCalculator::new(f.repo.clone())
            .compute_cell(&association, &bundle, d(10))
            .await
            .unwrap();
        assert_eq!((routed.sale_price, routed.cost_price), (cell.sale_price, cell.cost_price));
    }

    #[tokio::test]
    async fn test_cache_hit_is_returned_as_is() {
        let f = fixture();
        rebuild(&f).await;
        // 缓存之后改价，询价仍返回缓存价
        f.repo
            .set_stock(f.hotel, f.room, d(10), dec!(999.00), 4);
        let routed = f.router.route(&f.code, d(10)).await.unwrap();
        assert_eq!(routed.source, PriceOrigin::Cache);
        assert_eq!(routed.sale_price, dec!(250.00));
    }

    #[tokio::test]
    async fn test_route_errors() {
        let f = fixture();
        assert!(matches!(
            f.router.route("PKG|1|2", d(10)).await,
            Err(AppError::FormatError(_))
        ));
        let missing_product = composite_code::generate(404, f.hotel, f.room);
        assert!(matches!(
            f.router.route(&missing_product, d(10)).await,
            Err(AppError::NotFound(_))
        ));
        let other_room = f.repo.room_type(f.hotel, "Attic");
        let unlinked = composite_code::generate(f.product, f.hotel, other_room);
        assert!(matches!(
            f.router.route(&unlinked, d(10)).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_quote_uses_min_availability_over_stay() {
        let f = fixture();
        let quote = f.router.quote(&f.code, d(10), 2).await.unwrap();
        assert_eq!(quote.check_out_date, d(12));
        assert_eq!(quote.available, 2);
        assert!(quote.bookable);

        let quote = f.router.quote(&f.code, d(10), 3).await.unwrap();
        assert!(!quote.bookable);

        // 第二晚没有库存记录
        let quote = f.router.quote(&f.code, d(11), 1).await.unwrap();
        assert_eq!(quote.available, 0);
        assert!(!quote.bookable);

        assert!(matches!(
            f.router.quote(&f.code, d(10), 0).await,
            Err(AppError::ValidationError(_))
        ));
    }
}
