use crate::config::PricingConfig;
use crate::entities::OtaPlatform;
use crate::error::{AppError, AppResult};
use crate::external::ota::{CalendarPrice, PlatformRegistry};
use crate::models::{CombinationResult, DateWindow, SyncReport};
use crate::repository::{CatalogRepository, PriceCacheRepository};
use crate::utils::{Clock, composite_code};
use chrono::NaiveDate;
use std::collections::BTreeSet;
use std::sync::Arc;

/// 把价格缓存推送到 OTA，只读缓存，不做现算
#[derive(Clone)]
pub struct OtaSyncService {
    catalog: Arc<dyn CatalogRepository>,
    cache: Arc<dyn PriceCacheRepository>,
    registry: PlatformRegistry,
    clock: Arc<dyn Clock>,
    config: PricingConfig,
}

impl OtaSyncService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        cache: Arc<dyn PriceCacheRepository>,
        registry: PlatformRegistry,
        clock: Arc<dyn Clock>,
        config: PricingConfig,
    ) -> Self {
        Self {
            catalog,
            cache,
            registry,
            clock,
            config,
        }
    }

    pub fn platforms(&self) -> Vec<OtaPlatform> {
        self.registry.platforms()
    }

    pub async fn sync_product(
        &self,
        product_id: i64,
        platform: OtaPlatform,
        dates: Option<Vec<NaiveDate>>,
    ) -> AppResult<SyncReport> {
        self.sync_product_to_platform(product_id, platform.code(), dates)
            .await
    }

    /// 推送产品每个 酒店 × 房型 组合的价格日历
    ///
    /// 单个组合推送失败记在结果里，不中断其余组合。
    pub async fn sync_product_to_platform(
        &self,
        product_id: i64,
        platform_code: &str,
        dates: Option<Vec<NaiveDate>>,
    ) -> AppResult<SyncReport> {
        let pusher = self.registry.resolve(platform_code)?;
        let platform = pusher.platform();

        let product = self
            .catalog
            .find_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;
        if product.code.trim().is_empty() {
            return Err(AppError::ConfigurationError(format!(
                "product {product_id} has no code"
            )));
        }
        if !product.is_enabled() {
            return Err(AppError::ConfigurationError(format!(
                "product {} is not enabled",
                product.code
            )));
        }

        let associations = self.catalog.active_associations(product_id).await?;
        if associations.is_empty() {
            return Err(AppError::ConfigurationError(format!(
                "product {} has no active hotel room type",
                product.code
            )));
        }

        let requested: Option<BTreeSet<NaiveDate>> =
            dates.map(|d| d.into_iter().collect::<BTreeSet<_>>());
        let window = match &requested {
            Some(set) => match (set.first(), set.last()) {
                (Some(first), Some(last)) => DateWindow::new(*first, *last),
                _ => None,
            },
            None => DateWindow::effective(
                self.clock.today(),
                self.config.horizon_days,
                product.sale_start_date,
                product.sale_end_date,
            ),
        };

        let mut results = Vec::with_capacity(associations.len());
        for association in &associations {
            let code = composite_code::generate(
                product_id,
                association.hotel_id,
                association.room_type_id,
            );

            let rows = match window {
                Some(window) => {
                    self.cache
                        .cached_prices(
                            product_id,
                            association.hotel_id,
                            association.room_type_id,
                            window,
                        )
                        .await?
                }
                None => Vec::new(),
            };
            let calendar: Vec<CalendarPrice> = rows
                .into_iter()
                .filter(|r| requested.as_ref().is_none_or(|set| set.contains(&r.biz_date)))
                .map(|r| CalendarPrice {
                    date: r.biz_date,
                    sale_price: r.sale_price,
                    cost_price: r.cost_price,
                })
                .collect();
            if calendar.is_empty() {
                log::warn!("No cached prices for {code}, pushing empty calendar to {platform}");
            }

            let result = match pusher.push_price_calendar(&code, &calendar).await {
                Ok(()) => CombinationResult {
                    hotel_id: association.hotel_id,
                    room_type_id: association.room_type_id,
                    product_code: code,
                    success: true,
                    pushed: calendar.len(),
                    message: "ok".to_string(),
                },
                Err(e) => {
                    log::error!("Price push of {code} to {platform} failed: {e}");
                    CombinationResult {
                        hotel_id: association.hotel_id,
                        room_type_id: association.room_type_id,
                        product_code: code,
                        success: false,
                        pushed: 0,
                        message: e.to_string(),
                    }
                }
            };
            results.push(result);
        }

        let report = SyncReport::from_results(product_id, platform, results);
        log::info!(
            "Price sync of product {product_id} to {platform}: {}",
            report.message
        );
        Ok(report)
    }
}
