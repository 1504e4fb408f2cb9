use super::{CatalogRepository, SeaOrmRepository};
use crate::entities::{
    EnableStatus, bundle_item_entity as bundle_items, hotel_daily_stock_entity as stocks,
    hotel_entity as hotels, hotel_room_type_entity as associations, product_entity as products,
    room_type_entity as room_types, ticket_entity as tickets, ticket_price_entity as ticket_prices,
};
use crate::error::AppResult;
use crate::models::{DateWindow, HotelStockInput, HotelStockKey, TicketPriceInput, TicketPriceKey};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::collections::{HashMap, HashSet};

impl SeaOrmRepository {
    /// 过滤掉已软删除的产品
    async fn live_product_ids(&self, mut ids: Vec<i64>) -> AppResult<Vec<i64>> {
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(ids);
        }
        let live: Vec<i64> = products::Entity::find()
            .select_only()
            .column(products::Column::Id)
            .filter(products::Column::Id.is_in(ids))
            .filter(products::Column::DeletedAt.is_null())
            .order_by_asc(products::Column::Id)
            .into_tuple()
            .all(&self.pool)
            .await?;
        Ok(live)
    }
}

#[async_trait]
impl CatalogRepository for SeaOrmRepository {
    async fn find_product(&self, product_id: i64) -> AppResult<Option<products::Model>> {
        Ok(products::Entity::find_by_id(product_id)
            .one(&self.pool)
            .await?)
    }

    async fn enabled_product_ids(&self) -> AppResult<Vec<i64>> {
        let ids: Vec<i64> = products::Entity::find()
            .select_only()
            .column(products::Column::Id)
            .filter(products::Column::Status.eq(EnableStatus::Enabled))
            .filter(products::Column::DeletedAt.is_null())
            .order_by_asc(products::Column::Id)
            .into_tuple()
            .all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn find_hotel(&self, hotel_id: i64) -> AppResult<Option<hotels::Model>> {
        Ok(hotels::Entity::find_by_id(hotel_id).one(&self.pool).await?)
    }

    async fn find_room_type(&self, room_type_id: i64) -> AppResult<Option<room_types::Model>> {
        Ok(room_types::Entity::find_by_id(room_type_id)
            .one(&self.pool)
            .await?)
    }

    async fn find_ticket(&self, ticket_id: i64) -> AppResult<Option<tickets::Model>> {
        Ok(tickets::Entity::find_by_id(ticket_id).one(&self.pool).await?)
    }

    async fn active_associations(&self, product_id: i64) -> AppResult<Vec<associations::Model>> {
        let rows = associations::Entity::find()
            .filter(associations::Column::ProductId.eq(product_id))
            .filter(associations::Column::IsActive.eq(true))
            .order_by_asc(associations::Column::HotelId)
            .order_by_asc(associations::Column::RoomTypeId)
            .all(&self.pool)
            .await?;
        if rows.is_empty() {
            return Ok(rows);
        }

        let hotel_ids: Vec<i64> = rows.iter().map(|r| r.hotel_id).collect();
        let room_type_ids: Vec<i64> = rows.iter().map(|r| r.room_type_id).collect();

        let enabled_hotels: HashSet<i64> = hotels::Entity::find()
            .filter(hotels::Column::Id.is_in(hotel_ids))
            .filter(hotels::Column::Status.eq(EnableStatus::Enabled))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|h| h.id)
            .collect();
        // 房型 id -> 所属酒店
        let enabled_room_types: HashMap<i64, i64> = room_types::Entity::find()
            .filter(room_types::Column::Id.is_in(room_type_ids))
            .filter(room_types::Column::Status.eq(EnableStatus::Enabled))
            .all(&self.pool)
            .await?
            .into_iter()
            .map(|rt| (rt.id, rt.hotel_id))
            .collect();

        Ok(rows
            .into_iter()
            .filter(|r| {
                enabled_hotels.contains(&r.hotel_id)
                    && enabled_room_types.get(&r.room_type_id) == Some(&r.hotel_id)
            })
            .collect())
    }

    async fn find_association(
        &self,
        product_id: i64,
        hotel_id: i64,
        room_type_id: i64,
    ) -> AppResult<Option<associations::Model>> {
        Ok(associations::Entity::find()
            .filter(associations::Column::ProductId.eq(product_id))
            .filter(associations::Column::HotelId.eq(hotel_id))
            .filter(associations::Column::RoomTypeId.eq(room_type_id))
            .one(&self.pool)
            .await?)
    }

    async fn bundle_items(&self, product_id: i64) -> AppResult<Vec<bundle_items::Model>> {
        Ok(bundle_items::Entity::find()
            .filter(bundle_items::Column::ProductId.eq(product_id))
            .order_by_asc(bundle_items::Column::Id)
            .all(&self.pool)
            .await?)
    }

    async fn product_ids_by_room_type(
        &self,
        hotel_id: i64,
        room_type_id: i64,
    ) -> AppResult<Vec<i64>> {
        // 走 (hotel_id, room_type_id) 索引
        let ids: Vec<i64> = associations::Entity::find()
            .select_only()
            .column(associations::Column::ProductId)
            .filter(associations::Column::HotelId.eq(hotel_id))
            .filter(associations::Column::RoomTypeId.eq(room_type_id))
            .into_tuple()
            .all(&self.pool)
            .await?;
        self.live_product_ids(ids).await
    }

    async fn product_ids_by_ticket(&self, ticket_id: i64) -> AppResult<Vec<i64>> {
        let ids: Vec<i64> = bundle_items::Entity::find()
            .select_only()
            .column(bundle_items::Column::ProductId)
            .filter(bundle_items::Column::TicketId.eq(ticket_id))
            .into_tuple()
            .all(&self.pool)
            .await?;
        self.live_product_ids(ids).await
    }

    async fn hotel_stock(
        &self,
        hotel_id: i64,
        room_type_id: i64,
        date: NaiveDate,
    ) -> AppResult<Option<stocks::Model>> {
        Ok(stocks::Entity::find()
            .filter(stocks::Column::HotelId.eq(hotel_id))
            .filter(stocks::Column::RoomTypeId.eq(room_type_id))
            .filter(stocks::Column::BizDate.eq(date))
            .one(&self.pool)
            .await?)
    }

    async fn hotel_stocks(
        &self,
        hotel_id: i64,
        room_type_id: i64,
        window: DateWindow,
    ) -> AppResult<Vec<stocks::Model>> {
        Ok(stocks::Entity::find()
            .filter(stocks::Column::HotelId.eq(hotel_id))
            .filter(stocks::Column::RoomTypeId.eq(room_type_id))
            .filter(stocks::Column::BizDate.between(window.start, window.end))
            .order_by_asc(stocks::Column::BizDate)
            .all(&self.pool)
            .await?)
    }

    async fn ticket_price(
        &self,
        ticket_id: i64,
        date: NaiveDate,
    ) -> AppResult<Option<ticket_prices::Model>> {
        Ok(ticket_prices::Entity::find()
            .filter(ticket_prices::Column::TicketId.eq(ticket_id))
            .filter(ticket_prices::Column::BizDate.eq(date))
            .one(&self.pool)
            .await?)
    }

    async fn ticket_prices(
        &self,
        ticket_ids: &[i64],
        window: DateWindow,
    ) -> AppResult<Vec<ticket_prices::Model>> {
        if ticket_ids.is_empty() {
            return Ok(Vec::new());
        }
        Ok(ticket_prices::Entity::find()
            .filter(ticket_prices::Column::TicketId.is_in(ticket_ids.to_vec()))
            .filter(ticket_prices::Column::BizDate.between(window.start, window.end))
            .order_by_asc(ticket_prices::Column::BizDate)
            .all(&self.pool)
            .await?)
    }

    async fn upsert_hotel_stock(
        &self,
        input: &HotelStockInput,
        now: DateTime<Utc>,
    ) -> AppResult<stocks::Model> {
        let model = stocks::ActiveModel {
            hotel_id: Set(input.hotel_id),
            room_type_id: Set(input.room_type_id),
            biz_date: Set(input.biz_date),
            sale_price: Set(input.sale_price.round_dp(2)),
            cost_price: Set(input.cost_price.round_dp(2)),
            stock_total: Set(input.stock_total),
            stock_available: Set(input.stock_available),
            price_source: Set(input.price_source),
            updated_at: Set(Some(now)),
            ..Default::default()
        };
        let saved = stocks::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    stocks::Column::HotelId,
                    stocks::Column::RoomTypeId,
                    stocks::Column::BizDate,
                ])
                .update_columns([
                    stocks::Column::SalePrice,
                    stocks::Column::CostPrice,
                    stocks::Column::StockTotal,
                    stocks::Column::StockAvailable,
                    stocks::Column::PriceSource,
                    stocks::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_with_returning(&self.pool)
            .await?;
        Ok(saved)
    }

    async fn upsert_ticket_price(
        &self,
        input: &TicketPriceInput,
        now: DateTime<Utc>,
    ) -> AppResult<ticket_prices::Model> {
        let model = ticket_prices::ActiveModel {
            ticket_id: Set(input.ticket_id),
            biz_date: Set(input.biz_date),
            sale_price: Set(input.sale_price.round_dp(2)),
            cost_price: Set(input.cost_price.round_dp(2)),
            updated_at: Set(Some(now)),
            ..Default::default()
        };
        let saved = ticket_prices::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    ticket_prices::Column::TicketId,
                    ticket_prices::Column::BizDate,
                ])
                .update_columns([
                    ticket_prices::Column::SalePrice,
                    ticket_prices::Column::CostPrice,
                    ticket_prices::Column::UpdatedAt,
                ])
                .to_owned(),
            )
            .exec_with_returning(&self.pool)
            .await?;
        Ok(saved)
    }

    async fn delete_hotel_stock(&self, key: &HotelStockKey) -> AppResult<bool> {
        let res = stocks::Entity::delete_many()
            .filter(stocks::Column::HotelId.eq(key.hotel_id))
            .filter(stocks::Column::RoomTypeId.eq(key.room_type_id))
            .filter(stocks::Column::BizDate.eq(key.biz_date))
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected > 0)
    }

    async fn delete_ticket_price(&self, key: &TicketPriceKey) -> AppResult<bool> {
        let res = ticket_prices::Entity::delete_many()
            .filter(ticket_prices::Column::TicketId.eq(key.ticket_id))
            .filter(ticket_prices::Column::BizDate.eq(key.biz_date))
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected > 0)
    }

    async fn add_bundle_item(
        &self,
        product_id: i64,
        ticket_id: i64,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> AppResult<bundle_items::Model> {
        let saved = bundle_items::ActiveModel {
            product_id: Set(product_id),
            ticket_id: Set(ticket_id),
            quantity: Set(quantity),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn remove_bundle_item(&self, product_id: i64, item_id: i64) -> AppResult<bool> {
        let res = bundle_items::Entity::delete_many()
            .filter(bundle_items::Column::Id.eq(item_id))
            .filter(bundle_items::Column::ProductId.eq(product_id))
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected > 0)
    }

    async fn add_association(
        &self,
        product_id: i64,
        hotel_id: i64,
        room_type_id: i64,
        now: DateTime<Utc>,
    ) -> AppResult<associations::Model> {
        let model = associations::ActiveModel {
            product_id: Set(product_id),
            hotel_id: Set(hotel_id),
            room_type_id: Set(room_type_id),
            is_active: Set(true),
            updated_at: Set(Some(now)),
            ..Default::default()
        };
        // 已存在的组合重新启用
        let saved = associations::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    associations::Column::ProductId,
                    associations::Column::HotelId,
                    associations::Column::RoomTypeId,
                ])
                .update_columns([associations::Column::IsActive, associations::Column::UpdatedAt])
                .to_owned(),
            )
            .exec_with_returning(&self.pool)
            .await?;
        Ok(saved)
    }

    async fn remove_association(&self, product_id: i64, association_id: i64) -> AppResult<bool> {
        let res = associations::Entity::delete_many()
            .filter(associations::Column::Id.eq(association_id))
            .filter(associations::Column::ProductId.eq(product_id))
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected > 0)
    }
}
