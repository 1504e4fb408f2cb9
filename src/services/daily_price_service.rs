use crate::config::PricingConfig;
use crate::entities::OtaPlatform;
use crate::error::{AppError, AppResult};
use crate::models::{DateWindow, NewDailyPrice, RebuildOutcome};
use crate::repository::{CatalogRepository, PriceCacheRepository};
use crate::services::PriceCalculator;
use crate::tasks::{Job, TaskDescriptor, TaskQueue};
use crate::utils::{Clock, composite_code};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// 按产品 id 加锁，同一产品的重建串行，不同产品并行
#[derive(Clone, Default)]
pub struct ProductLocks {
    locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

impl ProductLocks {
    pub async fn lock(&self, product_id: i64) -> ProductLockGuard {
        let lock = self
            .locks
            .entry(product_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        ProductLockGuard {
            product_id,
            locks: self.locks.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.len()
    }
}

/// 释放时若已无其他持有者或等待者，移除该产品的锁
pub struct ProductLockGuard {
    product_id: i64,
    locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ProductLockGuard {
    fn drop(&mut self) {
        self.guard.take();
        self.locks
            .remove_if(&self.product_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[derive(Clone)]
pub struct DailyPriceService {
    catalog: Arc<dyn CatalogRepository>,
    cache: Arc<dyn PriceCacheRepository>,
    calculator: PriceCalculator,
    queue: Arc<dyn TaskQueue>,
    clock: Arc<dyn Clock>,
    config: PricingConfig,
    /// 重建后自动推送的平台
    sync_platforms: Vec<OtaPlatform>,
    locks: ProductLocks,
}

impl DailyPriceService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        cache: Arc<dyn PriceCacheRepository>,
        queue: Arc<dyn TaskQueue>,
        clock: Arc<dyn Clock>,
        config: PricingConfig,
        sync_platforms: Vec<OtaPlatform>,
    ) -> Self {
        Self {
            calculator: PriceCalculator::new(catalog.clone()),
            catalog,
            cache,
            queue,
            clock,
            config,
            sync_platforms,
            locks: ProductLocks::default(),
        }
    }

    /// 重建产品的每日价格缓存
    ///
    /// 1. 计算有效售卖窗口；窗口为空时清掉该产品的旧缓存
    /// 2. 缺少可售房型或门票时不做任何写入
    /// 3. 逐个 酒店 × 房型 组合计算窗口内每日价格
    /// 4. 事务内整体替换产品的缓存行
    pub async fn rebuild(&self, product_id: i64) -> AppResult<RebuildOutcome> {
        let _guard = self.locks.lock(product_id).await;

        let product = self
            .catalog
            .find_product(product_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;

        let window = if product.deleted_at.is_some() {
            None
        } else {
            DateWindow::effective(
                self.clock.today(),
                self.config.horizon_days,
                product.sale_start_date,
                product.sale_end_date,
            )
        };

        let Some(window) = window else {
            let purged = self.cache.purge_product(product_id).await?;
            log::info!(
                "Product {product_id} has no sellable dates, purged {purged} cached price row(s)"
            );
            return Ok(RebuildOutcome::WindowClosed { purged });
        };

        let associations = self.catalog.active_associations(product_id).await?;
        let bundle_items = self.catalog.bundle_items(product_id).await?;
        if associations.is_empty() || bundle_items.is_empty() {
            log::warn!(
                "Skip price rebuild of product {product_id}: {} room type(s), {} ticket(s)",
                associations.len(),
                bundle_items.len()
            );
            return Ok(RebuildOutcome::MissingLegs);
        }

        let now = self.clock.now();
        let mut rows = Vec::with_capacity(associations.len() * window.len());
        for association in &associations {
            let code = composite_code::generate(
                product_id,
                association.hotel_id,
                association.room_type_id,
            );
            let prices = self
                .calculator
                .compute_range(association, &bundle_items, window)
                .await?;
            rows.extend(prices.into_iter().map(|(date, cell)| NewDailyPrice {
                product_id,
                hotel_id: association.hotel_id,
                room_type_id: association.room_type_id,
                biz_date: date,
                sale_price: cell.sale_price,
                cost_price: cell.cost_price,
                composite_code: code.clone(),
                last_updated_at: now,
            }));
        }

        let written = self.cache.replace_window(product_id, window, rows).await?;
        log::info!(
            "Rebuilt price cache of product {product_id}: {written} row(s) for {}..{}",
            window.start,
            window.end
        );

        if self.config.auto_sync_after_rebuild && product.is_enabled() {
            for platform in &self.sync_platforms {
                let task = TaskDescriptor::new(Job::SyncProductPrices {
                    product_id,
                    platform: *platform,
                    dates: None,
                });
                if let Err(e) = self.queue.enqueue(task).await {
                    log::error!("Failed to enqueue {platform} sync of product {product_id}: {e:?}");
                }
            }
        }

        Ok(RebuildOutcome::Rebuilt {
            rows: written,
            window,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::EnableStatus;
    use crate::repository::memory::MemoryRepository;
    use crate::tasks::{QueueName, RecordingQueue};
    use crate::utils::clock::FakeClock;
    use chrono::{Duration, NaiveDate};
    use rust_decimal_macros::dec;
    use std::collections::BTreeSet;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    struct Fixture {
        repo: Arc<MemoryRepository>,
        queue: Arc<RecordingQueue>,
        service: DailyPriceService,
        product: i64,
        hotel: i64,
        rooms: Vec<i64>,
    }

    fn fixture(config: PricingConfig) -> Fixture {
        let repo = Arc::new(MemoryRepository::new());
        let hotel = repo.hotel("Harbor", false);
        let rooms = vec![repo.room_type(hotel, "King"), repo.room_type(hotel, "Twin")];
        let ticket = repo.ticket("Museum", false);
        let product = repo.product("HARBOR-1", 1);
        for room in &rooms {
            repo.link(product, hotel, *room);
        }
        repo.bundle(product, ticket, 2);
        repo.set_ticket_price(ticket, today(), dec!(30.00), dec!(25.00));
        repo.set_stock(hotel, rooms[0], today(), dec!(200.00), 3);

        let queue = Arc::new(RecordingQueue::new());
        let service = DailyPriceService::new(
            repo.clone(),
            repo.clone(),
            queue.clone(),
            Arc::new(FakeClock::on(today())),
            config,
            vec![OtaPlatform::Ctrip, OtaPlatform::Meituan],
        );
        Fixture {
            repo,
            queue,
            service,
            product,
            hotel,
            rooms,
        }
    }

    fn short_horizon() -> PricingConfig {
        PricingConfig {
            horizon_days: 5,
            utc_offset_hours: 0,
            auto_sync_after_rebuild: false,
        }
    }

    fn triples(repo: &MemoryRepository, product: i64) -> BTreeSet<(i64, i64, NaiveDate)> {
        repo.daily_prices(product)
            .into_iter()
            .map(|r| (r.hotel_id, r.room_type_id, r.biz_date))
            .collect()
    }

    #[tokio::test]
    async fn test_rebuild_covers_associations_times_window() {
        let f = fixture(short_horizon());
        let outcome = f.service.rebuild(f.product).await.unwrap();
        let window = DateWindow::new(today(), today() + Duration::days(4)).unwrap();
        assert_eq!(outcome, RebuildOutcome::Rebuilt { rows: 10, window });

        let expected: BTreeSet<_> = f
            .rooms
            .iter()
            .flat_map(|room| window.dates().map(move |d| (f.hotel, *room, d)))
            .collect();
        assert_eq!(triples(&f.repo, f.product), expected);

        let first = f.repo.daily_prices(f.product);
        let king_today = first
            .iter()
            .find(|r| r.room_type_id == f.rooms[0] && r.biz_date == today())
            .unwrap();
        assert_eq!(king_today.sale_price, dec!(260.00));
        assert_eq!(
            king_today.composite_code,
            format!("PKG|{}|{}|{}", f.rooms[0], f.hotel, f.product)
        );
    }

    #[tokio::test]
    async fn test_rebuild_is_idempotent() {
        let f = fixture(short_horizon());
        f.service.rebuild(f.product).await.unwrap();
        let strip = |rows: Vec<crate::entities::daily_price_entity::Model>| {
            rows.into_iter()
                .map(|r| (r.hotel_id, r.room_type_id, r.biz_date, r.sale_price, r.cost_price))
                .collect::<Vec<_>>()
        };
        let first = strip(f.repo.daily_prices(f.product));
        f.service.rebuild(f.product).await.unwrap();
        assert_eq!(strip(f.repo.daily_prices(f.product)), first);
    }

    #[tokio::test]
    async fn test_rebuild_drops_rows_outside_window() {
        let f = fixture(short_horizon());
        f.service.rebuild(f.product).await.unwrap();

        // 售卖期收窄到两天
        f.repo.update_product(f.product, |p| {
            p.sale_end_date = Some(today() + Duration::days(1));
        });
        f.service.rebuild(f.product).await.unwrap();

        let dates: BTreeSet<_> = f
            .repo
            .daily_prices(f.product)
            .into_iter()
            .map(|r| r.biz_date)
            .collect();
        assert_eq!(
            dates.into_iter().collect::<Vec<_>>(),
            vec![today(), today() + Duration::days(1)]
        );
    }

    #[tokio::test]
    async fn test_empty_window_purges_orphaned_rows() {
        let f = fixture(short_horizon());
        f.service.rebuild(f.product).await.unwrap();
        assert!(!f.repo.daily_prices(f.product).is_empty());

        f.repo.update_product(f.product, |p| {
            p.sale_end_date = Some(today() - Duration::days(1));
        });
        let outcome = f.service.rebuild(f.product).await.unwrap();
        assert_eq!(outcome, RebuildOutcome::WindowClosed { purged: 10 });
        assert!(f.repo.daily_prices(f.product).is_empty());
    }

    #[tokio::test]
    async fn test_missing_legs_writes_nothing() {
        let repo = Arc::new(MemoryRepository::new());
        let hotel = repo.hotel("Solo", false);
        let room = repo.room_type(hotel, "Single");
        let product = repo.product("NO-TICKETS", 1);
        repo.link(product, hotel, room);

        let service = DailyPriceService::new(
            repo.clone(),
            repo.clone(),
            Arc::new(RecordingQueue::new()),
            Arc::new(FakeClock::on(today())),
            short_horizon(),
            vec![],
        );
        assert_eq!(
            service.rebuild(product).await.unwrap(),
            RebuildOutcome::MissingLegs
        );
        assert_eq!(repo.replace_calls(), 0);
    }

    #[tokio::test]
    async fn test_disabled_hotel_excluded() {
        let f = fixture(short_horizon());
        f.repo.disable_hotel(f.hotel);
        assert_eq!(
            f.service.rebuild(f.product).await.unwrap(),
            RebuildOutcome::MissingLegs
        );
    }

    #[tokio::test]
    async fn test_unknown_product_not_found() {
        let f = fixture(short_horizon());
        assert!(matches!(
            f.service.rebuild(9999).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_auto_sync_enqueued_per_platform() {
        let mut config = short_horizon();
        config.auto_sync_after_rebuild = true;
        let f = fixture(config);
        f.service.rebuild(f.product).await.unwrap();

        let jobs = f.queue.jobs_on(QueueName::OtaPriceSync);
        assert_eq!(
            jobs,
            vec![
                Job::SyncProductPrices {
                    product_id: f.product,
                    platform: OtaPlatform::Ctrip,
                    dates: None
                },
                Job::SyncProductPrices {
                    product_id: f.product,
                    platform: OtaPlatform::Meituan,
                    dates: None
                },
            ]
        );

        // 停售产品只重建不推送
        f.repo
            .update_product(f.product, |p| p.status = EnableStatus::Disabled);
        f.queue.take();
        f.service.rebuild(f.product).await.unwrap();
        assert!(f.queue.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_rebuilds_of_one_product_serialize() {
        let f = fixture(short_horizon());
        let (a, b) = tokio::join!(f.service.rebuild(f.product), f.service.rebuild(f.product));
        assert!(a.is_ok() && b.is_ok());
        assert_eq!(f.repo.replace_calls(), 2);
        assert_eq!(triples(&f.repo, f.product).len(), 10);
        assert_eq!(f.service.locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_product_lock_released_after_last_holder() {
        let locks = ProductLocks::default();
        let first = locks.lock(7).await;
        let other = locks.lock(8).await;
        assert_eq!(locks.tracked(), 2);

        drop(first);
        assert_eq!(locks.tracked(), 1);
        drop(other);
        assert_eq!(locks.tracked(), 0);

        // 释放后可以再次加锁
        let again = locks.lock(7).await;
        assert_eq!(locks.tracked(), 1);
        drop(again);
        assert_eq!(locks.tracked(), 0);
    }
}
