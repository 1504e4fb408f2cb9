use super::{Job, JobHandler};
use crate::error::AppResult;
use crate::services::{
    DailyPriceService, FulfillmentService, InventoryPushService, OtaSyncService,
};
use async_trait::async_trait;

/// 把任务分发到对应的服务
#[derive(Clone)]
pub struct JobRunner {
    prices: DailyPriceService,
    inventory: InventoryPushService,
    sync: OtaSyncService,
    fulfillment: FulfillmentService,
}

impl JobRunner {
    pub fn new(
        prices: DailyPriceService,
        inventory: InventoryPushService,
        sync: OtaSyncService,
        fulfillment: FulfillmentService,
    ) -> Self {
        Self {
            prices,
            inventory,
            sync,
            fulfillment,
        }
    }
}

#[async_trait]
impl JobHandler for JobRunner {
    async fn handle(&self, job: &Job) -> AppResult<()> {
        match job {
            Job::RebuildProductPrices { product_id } => {
                let outcome = self.prices.rebuild(*product_id).await?;
                log::debug!("Rebuild of product {product_id}: {outcome:?}");
            }
            Job::PushInventory {
                hotel_id,
                room_type_id,
                dates,
                scarcity,
            } => {
                self.inventory
                    .push(*hotel_id, *room_type_id, dates.clone(), *scarcity)
                    .await?;
            }
            Job::SyncProductPrices {
                product_id,
                platform,
                dates,
            } => {
                // 单个组合失败记录在报告里，不重试
                let report = self
                    .sync
                    .sync_product(*product_id, *platform, dates.clone())
                    .await?;
                if !report.success {
                    log::warn!(
                        "Price sync of product {product_id} to {platform} incomplete: {}",
                        report.message
                    );
                }
            }
            Job::ProcessOrderItems { order_id } => {
                let status = self.fulfillment.process_order_items(*order_id).await?;
                log::debug!("Order {order_id} processed, now {status}");
            }
        }
        Ok(())
    }
}
