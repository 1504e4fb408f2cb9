use crate::error::AppResult;
use crate::repository::CatalogRepository;
use crate::tasks::{Job, TaskDescriptor, TaskQueue};
use std::collections::BTreeSet;
use std::sync::Arc;

/// 上游资源变更（新增 / 修改 / 删除 都视为变更）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamChange {
    BundleItemChanged { product_id: i64 },
    AssociationChanged { product_id: i64 },
    HotelStockChanged { hotel_id: i64, room_type_id: i64 },
    TicketPriceChanged { ticket_id: i64 },
}

/// 把上游变更映射到受影响的产品，并投递价格重建任务
#[derive(Clone)]
pub struct ChangeRouter {
    catalog: Arc<dyn CatalogRepository>,
    queue: Arc<dyn TaskQueue>,
}

impl ChangeRouter {
    pub fn new(catalog: Arc<dyn CatalogRepository>, queue: Arc<dyn TaskQueue>) -> Self {
        Self { catalog, queue }
    }

    pub async fn affected_products(&self, change: UpstreamChange) -> AppResult<Vec<i64>> {
        let ids = match change {
            UpstreamChange::BundleItemChanged { product_id }
            | UpstreamChange::AssociationChanged { product_id } => vec![product_id],
            UpstreamChange::HotelStockChanged {
                hotel_id,
                room_type_id,
            } => {
                self.catalog
                    .product_ids_by_room_type(hotel_id, room_type_id)
                    .await?
            }
            UpstreamChange::TicketPriceChanged { ticket_id } => {
                self.catalog.product_ids_by_ticket(ticket_id).await?
            }
        };
        let unique: BTreeSet<i64> = ids.into_iter().collect();
        Ok(unique.into_iter().collect())
    }

    /// 不向调用方抛错，失败只记日志；返回投递的任务数
    pub async fn on_change(&self, change: UpstreamChange) -> usize {
        let products = match self.affected_products(change).await {
            Ok(ids) => ids,
            Err(e) => {
                log::error!("Failed to resolve products affected by {change:?}: {e:?}");
                return 0;
            }
        };

        let mut enqueued = 0;
        for product_id in products {
            let task = TaskDescriptor::new(Job::RebuildProductPrices { product_id });
            match self.queue.enqueue(task).await {
                Ok(()) => enqueued += 1,
                Err(e) => {
                    log::error!("Failed to enqueue rebuild of product {product_id}: {e:?}")
                }
            }
        }
        log::debug!("{change:?} scheduled {enqueued} rebuild(s)");
        enqueued
    }
}
