//! Background jobs and recurring maintenance.
//!
//! Jobs are described by [`Job`] and handed to a [`TaskQueue`]. The production queue is
//! [`LocalTaskQueue`] (tokio channels, one worker loop per named queue); tests use
//! `RecordingQueue`. Call `spawn_all` once during startup for the periodic loops.

mod local;
#[cfg(test)]
mod recording;
mod runner;

pub use local::{LocalTaskQueue, QueueWorkers};
#[cfg(test)]
pub use recording::RecordingQueue;
pub use runner::JobRunner;

use crate::entities::OtaPlatform;
use crate::error::AppResult;
use crate::repository::CatalogRepository;
use crate::store::MemoryStore;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// 命名队列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueName {
    Default,
    InventoryPush,
    OtaPriceSync,
}

impl QueueName {
    pub const ALL: [QueueName; 3] = [
        QueueName::Default,
        QueueName::InventoryPush,
        QueueName::OtaPriceSync,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueueName::Default => "default",
            QueueName::InventoryPush => "inventory_push",
            QueueName::OtaPriceSync => "ota_price_sync",
        }
    }
}

impl std::fmt::Display for QueueName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Job {
    RebuildProductPrices {
        product_id: i64,
    },
    PushInventory {
        hotel_id: i64,
        room_type_id: i64,
        dates: Vec<NaiveDate>,
        scarcity: bool,
    },
    SyncProductPrices {
        product_id: i64,
        platform: OtaPlatform,
        dates: Option<Vec<NaiveDate>>,
    },
    ProcessOrderItems {
        order_id: i64,
    },
}

impl Job {
    pub fn queue(&self) -> QueueName {
        match self {
            Job::RebuildProductPrices { .. } | Job::ProcessOrderItems { .. } => QueueName::Default,
            Job::PushInventory { .. } => QueueName::InventoryPush,
            Job::SyncProductPrices { .. } => QueueName::OtaPriceSync,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskDescriptor {
    pub queue: QueueName,
    pub delay: Duration,
    pub job: Job,
}

impl TaskDescriptor {
    pub fn new(job: Job) -> Self {
        Self {
            queue: job.queue(),
            delay: Duration::ZERO,
            job,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn enqueue(&self, task: TaskDescriptor) -> AppResult<()>;
}

/// 执行具体任务
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> AppResult<()>;
}

/// Spawn the recurring maintenance loops.
///
/// - 每日重新投递所有启用产品的价格重建，使 60 天滚动窗口前移
/// - 每分钟清理防抖存储中过期的键
pub fn spawn_all(
    catalog: Arc<dyn CatalogRepository>,
    queue: Arc<dyn TaskQueue>,
    store: Arc<MemoryStore>,
) {
    {
        tokio::spawn(async move {
            loop {
                match catalog.enabled_product_ids().await {
                    Ok(ids) => {
                        log::info!("Scheduling daily price rebuild for {} product(s)", ids.len());
                        for product_id in ids {
                            let task = TaskDescriptor::new(Job::RebuildProductPrices { product_id });
                            if let Err(e) = queue.enqueue(task).await {
                                log::error!(
                                    "Failed to enqueue daily rebuild of product {product_id}: {e:?}"
                                );
                            }
                        }
                    }
                    Err(e) => log::error!("Failed to list enabled products: {e:?}"),
                }
                tokio::time::sleep(Duration::from_secs(24 * 3600)).await;
            }
        });
    }

    {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(60)).await;
                let n = store.purge_expired();
                if n > 0 {
                    log::debug!("Purged {n} expired debounce key(s)");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_queue_routing() {
        let rebuild = TaskDescriptor::new(Job::RebuildProductPrices { product_id: 1 });
        assert_eq!(rebuild.queue, QueueName::Default);
        assert_eq!(rebuild.delay, Duration::ZERO);

        let push = TaskDescriptor::new(Job::PushInventory {
            hotel_id: 1,
            room_type_id: 2,
            dates: vec![],
            scarcity: false,
        })
        .with_delay(Duration::from_secs(10));
        assert_eq!(push.queue, QueueName::InventoryPush);
        assert_eq!(push.delay, Duration::from_secs(10));

        let sync = Job::SyncProductPrices {
            product_id: 1,
            platform: OtaPlatform::Fliggy,
            dates: None,
        };
        assert_eq!(sync.queue().as_str(), "ota_price_sync");
    }

    #[test]
    fn test_job_serialization_is_tagged() {
        let job = Job::ProcessOrderItems { order_id: 7 };
        let v = serde_json::to_value(&job).unwrap();
        assert_eq!(v["type"], "process_order_items");
        assert_eq!(v["order_id"], 7);
    }
}
