use crate::config::InventoryConfig;
use crate::entities::{PriceSource, hotel_daily_stock_entity};
use crate::error::AppResult;
use crate::store::ExpiringStore;
use crate::tasks::{Job, TaskDescriptor, TaskQueue};
use chrono::NaiveDate;
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

const BEFORE_TTL: Duration = Duration::from_secs(30);
const RESTORE_TTL: Duration = Duration::from_secs(300);

fn before_key(stock_id: i64) -> String {
    format!("inventory:before:{stock_id}")
}

fn dates_key(room_type_id: i64) -> String {
    format!("inventory:dates:{room_type_id}")
}

fn scarcity_key(room_type_id: i64) -> String {
    format!("inventory:scarcity:{room_type_id}")
}

fn scheduled_key(room_type_id: i64) -> String {
    format!("inventory:scheduled:{room_type_id}")
}

fn decode_dates(value: Option<&Value>) -> BTreeSet<NaiveDate> {
    value
        .and_then(|v| serde_json::from_value(v.clone()).ok())
        .unwrap_or_default()
}

/// 库存跨越阈值：从阈值之上降到阈值及以下，或从阈值及以下恢复到阈值之上
pub fn crosses_threshold(before: i32, after: i32, threshold: i32) -> bool {
    (before > threshold && after <= threshold) || (before <= threshold && after > threshold)
}

/// 酒店库存变更防抖
///
/// 同一房型在防抖窗口内的多次变更只投递一个推送任务；窗口内累计的日期和
/// 阈值标记由推送任务执行时通过 [`InventoryDebouncer::drain`] 取走。
#[derive(Clone)]
pub struct InventoryDebouncer {
    store: Arc<dyn ExpiringStore>,
    queue: Arc<dyn TaskQueue>,
    config: InventoryConfig,
}

impl InventoryDebouncer {
    pub fn new(
        store: Arc<dyn ExpiringStore>,
        queue: Arc<dyn TaskQueue>,
        config: InventoryConfig,
    ) -> Self {
        Self {
            store,
            queue,
            config,
        }
    }

    fn delay(&self) -> Duration {
        Duration::from_secs(self.config.debounce_seconds)
    }

    /// 保存前记录可用库存
    pub async fn capture_before(&self, stock: &hotel_daily_stock_entity::Model) {
        if let Err(e) = self
            .store
            .put(&before_key(stock.id), json!(stock.stock_available), BEFORE_TTL)
            .await
        {
            log::warn!("Failed to capture stock before-image {}: {e:?}", stock.id);
        }
    }

    /// 保存后调用，错误只记日志
    pub async fn on_stock_saved(&self, stock: &hotel_daily_stock_entity::Model) {
        if stock.price_source == PriceSource::Api {
            return;
        }
        if let Err(e) = self.schedule(stock).await {
            log::error!(
                "Failed to schedule inventory push for hotel {} room type {} on {}: {e:?}",
                stock.hotel_id,
                stock.room_type_id,
                stock.biz_date
            );
        }
    }

    async fn schedule(&self, stock: &hotel_daily_stock_entity::Model) -> AppResult<bool> {
        let delay = self.delay();
        let room_type_id = stock.room_type_id;

        let date = stock.biz_date;
        let dates = self
            .store
            .update(
                &dates_key(room_type_id),
                delay + Duration::from_secs(1),
                Box::new(move |current| {
                    let mut dates = decode_dates(current);
                    dates.insert(date);
                    json!(dates)
                }),
            )
            .await?;

        let before = self
            .store
            .pull(&before_key(stock.id))
            .await?
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);
        if let Some(before) = before {
            let threshold = self.config.low_stock_threshold;
            if crosses_threshold(before, stock.stock_available, threshold) {
                log::info!(
                    "Room type {room_type_id} stock crossed threshold {threshold} on {date}: {before} -> {}",
                    stock.stock_available
                );
                self.store
                    .update(
                        &scarcity_key(room_type_id),
                        delay + Duration::from_secs(5),
                        Box::new(|_| Value::Bool(true)),
                    )
                    .await?;
            }
        }

        let marker_ttl = if delay.is_zero() {
            Duration::from_secs(1)
        } else {
            delay
        };
        if !self
            .store
            .add(&scheduled_key(room_type_id), Value::Bool(true), marker_ttl)
            .await?
        {
            return Ok(false);
        }

        let scarcity = self
            .store
            .get(&scarcity_key(room_type_id))
            .await?
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let task = TaskDescriptor::new(Job::PushInventory {
            hotel_id: stock.hotel_id,
            room_type_id,
            dates: decode_dates(Some(&dates)).into_iter().collect(),
            scarcity,
        })
        .with_delay(delay);
        self.queue.enqueue(task).await?;
        log::debug!("Inventory push for room type {room_type_id} scheduled in {delay:?}");
        Ok(true)
    }

    /// 推送任务执行时取走窗口内累计的日期和阈值标记
    pub async fn drain(&self, room_type_id: i64) -> AppResult<(Vec<NaiveDate>, bool)> {
        // 先释放标记，之后的变更会投递新任务
        self.store.forget(&scheduled_key(room_type_id)).await?;
        let dates = self.store.pull(&dates_key(room_type_id)).await?;
        let scarcity = self
            .store
            .pull(&scarcity_key(room_type_id))
            .await?
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        Ok((decode_dates(dates.as_ref()).into_iter().collect(), scarcity))
    }

    /// 推送失败时把已取走的日期放回，重试时再次 drain
    pub async fn restore(
        &self,
        room_type_id: i64,
        dates: &[NaiveDate],
        scarcity: bool,
    ) -> AppResult<()> {
        let restored = dates.to_vec();
        self.store
            .update(
                &dates_key(room_type_id),
                RESTORE_TTL,
                Box::new(move |current| {
                    let mut dates = decode_dates(current);
                    dates.extend(restored);
                    json!(dates)
                }),
            )
            .await?;
        if scarcity {
            self.store
                .update(
                    &scarcity_key(room_type_id),
                    RESTORE_TTL,
                    Box::new(|_| Value::Bool(true)),
                )
                .await?;
        }
        Ok(())
    }
}
