use crate::entities::product_entity;
use crate::error::{AppError, AppResult};
use crate::models::{
    BundleItemRequest, BundleItemResponse, DailyPriceResponse, DateWindow, HotelRoomTypeRequest,
    HotelRoomTypeResponse,
};
use crate::repository::{CatalogRepository, PriceCacheRepository};
use crate::services::{ChangeRouter, UpstreamChange};
use crate::utils::Clock;
use std::sync::Arc;

/// 打包产品构成：门票与酒店房型
#[derive(Clone)]
pub struct PackageService {
    catalog: Arc<dyn CatalogRepository>,
    cache: Arc<dyn PriceCacheRepository>,
    router: ChangeRouter,
    clock: Arc<dyn Clock>,
}

impl PackageService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        cache: Arc<dyn PriceCacheRepository>,
        router: ChangeRouter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            cache,
            router,
            clock,
        }
    }

    async fn live_product(&self, product_id: i64) -> AppResult<product_entity::Model> {
        self.catalog
            .find_product(product_id)
            .await?
            .filter(|p| p.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))
    }

    pub async fn add_bundle_item(
        &self,
        product_id: i64,
        request: BundleItemRequest,
    ) -> AppResult<BundleItemResponse> {
        if request.quantity < 1 {
            return Err(AppError::ValidationError(
                "quantity must be at least 1".into(),
            ));
        }
        self.live_product(product_id).await?;
        self.catalog
            .find_ticket(request.ticket_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("ticket {}", request.ticket_id)))?;

        let item = self
            .catalog
            .add_bundle_item(
                product_id,
                request.ticket_id,
                request.quantity,
                self.clock.now(),
            )
            .await?;
        self.router
            .on_change(UpstreamChange::BundleItemChanged { product_id })
            .await;
        Ok(item.into())
    }

    pub async fn remove_bundle_item(&self, product_id: i64, item_id: i64) -> AppResult<()> {
        if !self.catalog.remove_bundle_item(product_id, item_id).await? {
            return Err(AppError::NotFound(format!(
                "bundle item {item_id} of product {product_id}"
            )));
        }
        self.router
            .on_change(UpstreamChange::BundleItemChanged { product_id })
            .await;
        Ok(())
    }

    pub async fn add_hotel_room_type(
        &self,
        product_id: i64,
        request: HotelRoomTypeRequest,
    ) -> AppResult<HotelRoomTypeResponse> {
        self.live_product(product_id).await?;
        self.catalog
            .find_hotel(request.hotel_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("hotel {}", request.hotel_id)))?;
        let room_type = self
            .catalog
            .find_room_type(request.room_type_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("room type {}", request.room_type_id)))?;
        if room_type.hotel_id != request.hotel_id {
            return Err(AppError::ValidationError(format!(
                "room type {} does not belong to hotel {}",
                request.room_type_id, request.hotel_id
            )));
        }

        let association = self
            .catalog
            .add_association(
                product_id,
                request.hotel_id,
                request.room_type_id,
                self.clock.now(),
            )
            .await?;
        self.router
            .on_change(UpstreamChange::AssociationChanged { product_id })
            .await;
        Ok(association.into())
    }

    pub async fn remove_hotel_room_type(
        &self,
        product_id: i64,
        association_id: i64,
    ) -> AppResult<()> {
        if !self
            .catalog
            .remove_association(product_id, association_id)
            .await?
        {
            return Err(AppError::NotFound(format!(
                "hotel room type {association_id} of product {product_id}"
            )));
        }
        self.router
            .on_change(UpstreamChange::AssociationChanged { product_id })
            .await;
        Ok(())
    }

    /// 已缓存的每日价格
    pub async fn daily_prices(
        &self,
        product_id: i64,
        hotel_id: i64,
        room_type_id: i64,
        window: DateWindow,
    ) -> AppResult<Vec<DailyPriceResponse>> {
        self.live_product(product_id).await?;
        Ok(self
            .cache
            .cached_prices(product_id, hotel_id, room_type_id, window)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryRepository;
    use crate::tasks::{Job, RecordingQueue};
    use crate::utils::clock::FakeClock;
    use chrono::NaiveDate;

    struct Fixture {
        repo: Arc<MemoryRepository>,
        queue: Arc<RecordingQueue>,
        service: PackageService,
        product: i64,
    }

    fn fixture() -> Fixture {
        let repo = Arc::new(MemoryRepository::new());
        let queue = Arc::new(RecordingQueue::new());
        let product = repo.product("COAST", 1);
        let service = PackageService::new(
            repo.clone(),
            repo.clone(),
            ChangeRouter::new(repo.clone(), queue.clone()),
            Arc::new(FakeClock::on(NaiveDate::from_ymd_opt(2026, 2, 1).unwrap())),
        );
        Fixture {
            repo,
            queue,
            service,
            product,
        }
    }

    fn rebuilds(queue: &RecordingQueue) -> usize {
        queue
            .tasks()
            .iter()
            .filter(|t| matches!(t.job, Job::RebuildProductPrices { .. }))
            .count()
    }

    #[tokio::test]
    async fn test_bundle_item_lifecycle_triggers_rebuilds() {
        let f = fixture();
        let ticket = f.repo.ticket("Lighthouse", false);
        let item = f
            .service
            .add_bundle_item(
                f.product,
                BundleItemRequest {
                    ticket_id: ticket,
                    quantity: 2,
                },
            )
            .await
            .unwrap();
        assert_eq!(item.quantity, 2);
        assert_eq!(rebuilds(&f.queue), 1);

        f.service.remove_bundle_item(f.product, item.id).await.unwrap();
        assert_eq!(rebuilds(&f.queue), 2);
        assert!(matches!(
            f.service.remove_bundle_item(f.product, item.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_association_must_match_hotel() {
        let f = fixture();
        let hotel = f.repo.hotel("Cove", false);
        let other = f.repo.hotel("Inland", false);
        let room = f.repo.room_type(hotel, "Ocean view");

        assert!(matches!(
            f.service
                .add_hotel_room_type(
                    f.product,
                    HotelRoomTypeRequest {
                        hotel_id: other,
                        room_type_id: room,
                    },
                )
                .await,
            Err(AppError::ValidationError(_))
        ));
        assert_eq!(rebuilds(&f.queue), 0);

        let association = f
            .service
            .add_hotel_room_type(
                f.product,
                HotelRoomTypeRequest {
                    hotel_id: hotel,
                    room_type_id: room,
                },
            )
            .await
            .unwrap();
        assert!(association.is_active);
        assert_eq!(rebuilds(&f.queue), 1);

        f.service
            .remove_hotel_room_type(f.product, association.id)
            .await
            .unwrap();
        assert!(f.repo.active_associations(f.product).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_product_or_ticket() {
        let f = fixture();
        let ticket = f.repo.ticket("Pier", false);
        assert!(matches!(
            f.service
                .add_bundle_item(404, BundleItemRequest { ticket_id: ticket, quantity: 1 })
                .await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service
                .add_bundle_item(f.product, BundleItemRequest { ticket_id: 404, quantity: 1 })
                .await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            f.service
                .add_bundle_item(f.product, BundleItemRequest { ticket_id: ticket, quantity: 0 })
                .await,
            Err(AppError::ValidationError(_))
        ));
    }
}
