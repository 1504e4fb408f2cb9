use crate::error::{AppError, AppResult};
use crate::models::{
    HotelStockInput, HotelStockKey, StockBatchResponse, StockDeleteResponse, TicketPriceInput,
    TicketPriceKey,
};
use crate::repository::CatalogRepository;
use crate::services::{ChangeRouter, InventoryDebouncer, UpstreamChange};
use crate::utils::Clock;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use std::sync::Arc;

/// 酒店房价库存与门票价格的维护入口，写入后触发价格重建与库存推送
#[derive(Clone)]
pub struct StockService {
    catalog: Arc<dyn CatalogRepository>,
    debouncer: InventoryDebouncer,
    router: ChangeRouter,
    clock: Arc<dyn Clock>,
}

impl StockService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository>,
        debouncer: InventoryDebouncer,
        router: ChangeRouter,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            debouncer,
            router,
            clock,
        }
    }

    pub async fn save_hotel_stocks(
        &self,
        items: Vec<HotelStockInput>,
    ) -> AppResult<StockBatchResponse> {
        if items.is_empty() {
            return Err(AppError::ValidationError("items must not be empty".into()));
        }
        // 先整体校验，任何一条不合法都不写入
        for item in &items {
            validate_prices(item.sale_price, item.cost_price)?;
            if item.stock_available < 0 || item.stock_total < 0 {
                return Err(AppError::ValidationError(format!(
                    "stock of room type {} on {} must not be negative",
                    item.room_type_id, item.biz_date
                )));
            }
            let room_type = self
                .catalog
                .find_room_type(item.room_type_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("room type {}", item.room_type_id)))?;
            if room_type.hotel_id != item.hotel_id {
                return Err(AppError::ValidationError(format!(
                    "room type {} does not belong to hotel {}",
                    item.room_type_id, item.hotel_id
                )));
            }
        }

        let now = self.clock.now();
        let mut pairs = BTreeSet::new();
        for item in &items {
            if let Some(existing) = self
                .catalog
                .hotel_stock(item.hotel_id, item.room_type_id, item.biz_date)
                .await?
            {
                self.debouncer.capture_before(&existing).await;
            }
            let saved = self.catalog.upsert_hotel_stock(item, now).await?;
            self.debouncer.on_stock_saved(&saved).await;
            pairs.insert((saved.hotel_id, saved.room_type_id));
        }

        for (hotel_id, room_type_id) in pairs {
            self.router
                .on_change(UpstreamChange::HotelStockChanged {
                    hotel_id,
                    room_type_id,
                })
                .await;
        }
        log::info!("Saved {} hotel stock row(s)", items.len());
        Ok(StockBatchResponse { saved: items.len() })
    }

    pub async fn save_ticket_prices(
        &self,
        items: Vec<TicketPriceInput>,
    ) -> AppResult<StockBatchResponse> {
        if items.is_empty() {
            return Err(AppError::ValidationError("items must not be empty".into()));
        }
        for item in &items {
            validate_prices(item.sale_price, item.cost_price)?;
            self.catalog
                .find_ticket(item.ticket_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("ticket {}", item.ticket_id)))?;
        }

        let now = self.clock.now();
        let mut tickets = BTreeSet::new();
        for item in &items {
            self.catalog.upsert_ticket_price(item, now).await?;
            tickets.insert(item.ticket_id);
        }
        for ticket_id in tickets {
            self.router
                .on_change(UpstreamChange::TicketPriceChanged { ticket_id })
                .await;
        }
        log::info!("Saved {} ticket price row(s)", items.len());
        Ok(StockBatchResponse { saved: items.len() })
    }

    /// 删除房价库存行；实际删掉行的 酒店 × 房型 触发价格重建
    pub async fn delete_hotel_stocks(
        &self,
        keys: Vec<HotelStockKey>,
    ) -> AppResult<StockDeleteResponse> {
        if keys.is_empty() {
            return Err(AppError::ValidationError("items must not be empty".into()));
        }

        let mut deleted = 0;
        let mut pairs = BTreeSet::new();
        for key in &keys {
            if self.catalog.delete_hotel_stock(key).await? {
                deleted += 1;
                pairs.insert((key.hotel_id, key.room_type_id));
            }
        }

        for (hotel_id, room_type_id) in pairs {
            self.router
                .on_change(UpstreamChange::HotelStockChanged {
                    hotel_id,
                    room_type_id,
                })
                .await;
        }
        log::info!("Deleted {deleted} of {} hotel stock row(s)", keys.len());
        Ok(StockDeleteResponse { deleted })
    }

    pub async fn delete_ticket_prices(
        &self,
        keys: Vec<TicketPriceKey>,
    ) -> AppResult<StockDeleteResponse> {
        if keys.is_empty() {
            return Err(AppError::ValidationError("items must not be empty".into()));
        }

        let mut deleted = 0;
        let mut tickets = BTreeSet::new();
        for key in &keys {
            if self.catalog.delete_ticket_price(key).await? {
                deleted += 1;
                tickets.insert(key.ticket_id);
            }
        }

        for ticket_id in tickets {
            self.router
                .on_change(UpstreamChange::TicketPriceChanged { ticket_id })
                .await;
        }
        log::info!("Deleted {deleted} of {} ticket price row(s)", keys.len());
        Ok(StockDeleteResponse { deleted })
    }
}

fn validate_prices(sale_price: Decimal, cost_price: Decimal) -> AppResult<()> {
    if sale_price.is_sign_negative() || cost_price.is_sign_negative() {
        return Err(AppError::ValidationError(
            "prices must not be negative".into(),
        ));
    }
    Ok(())
}
