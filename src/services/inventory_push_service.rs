use crate::error::{AppError, AppResult};
use crate::external::ota::{CalendarStock, PlatformRegistry};
use crate::models::DateWindow;
use crate::repository::CatalogRepository;
use crate::services::InventoryDebouncer;
use crate::utils::composite_code;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// 把酒店房型的可用库存推送到各 OTA
#[derive(Clone)]
pub struct InventoryPushService {
    catalog: Arc<dyn CatalogRepository>,
    registry: PlatformRegistry,
    debouncer: InventoryDebouncer,
}

impl InventoryPushService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        registry: PlatformRegistry,
        debouncer: InventoryDebouncer,
    ) -> Self {
        Self {
            catalog,
            registry,
            debouncer,
        }
    }

    /// 返回成功的推送次数；任一推送失败返回 UpstreamPush 以便任务重试
    pub async fn push(
        &self,
        hotel_id: i64,
        room_type_id: i64,
        dates: Vec<NaiveDate>,
        scarcity: bool,
    ) -> AppResult<usize> {
        let (drained, drained_scarcity) = match self.debouncer.drain(room_type_id).await {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Failed to drain debounced dates of room type {room_type_id}: {e:?}");
                (Vec::new(), false)
            }
        };
        let dates: Vec<NaiveDate> = dates
            .into_iter()
            .chain(drained)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let scarcity = scarcity || drained_scarcity;

        let result = self
            .push_dates(hotel_id, room_type_id, &dates, scarcity)
            .await;
        if result.is_err() {
            if let Err(e) = self
                .debouncer
                .restore(room_type_id, &dates, scarcity)
                .await
            {
                log::error!("Failed to restore inventory dates of room type {room_type_id}: {e:?}");
            }
        }
        result
    }

    async fn push_dates(
        &self,
        hotel_id: i64,
        room_type_id: i64,
        dates: &[NaiveDate],
        scarcity: bool,
    ) -> AppResult<usize> {
        let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
            return Ok(0);
        };
        let pushers = self.registry.pushers();
        if pushers.is_empty() {
            log::debug!("No OTA platform registered, skip inventory push");
            return Ok(0);
        }

        let stocks: HashMap<NaiveDate, i32> = match DateWindow::new(*first, *last) {
            Some(window) => self
                .catalog
                .hotel_stocks(hotel_id, room_type_id, window)
                .await?
                .into_iter()
                .map(|s| (s.biz_date, s.stock_available))
                .collect(),
            None => HashMap::new(),
        };
        let calendar: Vec<CalendarStock> = dates
            .iter()
            .map(|date| CalendarStock {
                date: *date,
                available: stocks.get(date).copied().unwrap_or(0),
            })
            .collect();

        let mut codes = Vec::new();
        for product_id in self
            .catalog
            .product_ids_by_room_type(hotel_id, room_type_id)
            .await?
        {
            let Some(product) = self.catalog.find_product(product_id).await? else {
                continue;
            };
            if !product.is_enabled() {
                continue;
            }
            let linked = self
                .catalog
                .active_associations(product_id)
                .await?
                .iter()
                .any(|a| a.hotel_id == hotel_id && a.room_type_id == room_type_id);
            if linked {
                codes.push(composite_code::generate(product_id, hotel_id, room_type_id));
            }
        }

        let mut pushed = 0;
        let mut failures = Vec::new();
        for code in &codes {
            for pusher in &pushers {
                let platform = pusher.platform();
                match pusher.push_inventory(code, &calendar).await {
                    Ok(()) => pushed += 1,
                    Err(e) => {
                        log::error!("Inventory push of {code} to {platform} failed: {e}");
                        failures.push(format!("{platform} {code}: {e}"));
                        continue;
                    }
                }
                if scarcity && pusher.supports_stock_threshold() {
                    if let Err(e) = pusher.signal_stock_threshold(code, &calendar).await {
                        log::error!("Stock threshold signal of {code} to {platform} failed: {e}");
                        failures.push(format!("{platform} {code} threshold: {e}"));
                    }
                }
            }
        }

        log::info!(
            "Inventory of hotel {hotel_id} room type {room_type_id} pushed: {} product(s), {} date(s), {pushed} ok, {} failed",
            codes.len(),
            dates.len(),
            failures.len()
        );
        if failures.is_empty() {
            Ok(pushed)
        } else {
            Err(AppError::UpstreamPush(failures.join("; ")))
        }
    }
}
