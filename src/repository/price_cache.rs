use super::{PriceCacheRepository, SeaOrmRepository};
use crate::entities::daily_price_entity as daily_prices;
use crate::error::AppResult;
use crate::models::{DateWindow, NewDailyPrice};
use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseTransaction, EntityTrait, QueryFilter, QueryOrder, Set, Statement,
    TransactionTrait,
};

/// 单条 INSERT 的行数上限，避免超出 Postgres 参数个数限制
const INSERT_CHUNK: usize = 500;

impl From<NewDailyPrice> for daily_prices::ActiveModel {
    fn from(row: NewDailyPrice) -> Self {
        daily_prices::ActiveModel {
            product_id: Set(row.product_id),
            hotel_id: Set(row.hotel_id),
            room_type_id: Set(row.room_type_id),
            biz_date: Set(row.biz_date),
            sale_price: Set(row.sale_price),
            cost_price: Set(row.cost_price),
            composite_code: Set(row.composite_code),
            last_updated_at: Set(row.last_updated_at),
            ..Default::default()
        }
    }
}

/// 同一产品的缓存写入在库级别串行（事务结束自动释放）
async fn lock_product(txn: &DatabaseTransaction, product_id: i64) -> AppResult<()> {
    txn.execute(Statement::from_sql_and_values(
        txn.get_database_backend(),
        "SELECT pg_advisory_xact_lock($1)",
        [product_id.into()],
    ))
    .await?;
    Ok(())
}

#[async_trait]
impl PriceCacheRepository for SeaOrmRepository {
    async fn replace_window(
        &self,
        product_id: i64,
        window: DateWindow,
        rows: Vec<NewDailyPrice>,
    ) -> AppResult<u64> {
        let txn = self.pool.begin().await?;
        lock_product(&txn, product_id).await?;

        // 窗口内旧行以及滚出窗口的过期行一并删除
        let deleted = daily_prices::Entity::delete_many()
            .filter(daily_prices::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?
            .rows_affected;

        let mut inserted = 0u64;
        let mut rows = rows.into_iter().peekable();
        while rows.peek().is_some() {
            let chunk: Vec<daily_prices::ActiveModel> =
                rows.by_ref().take(INSERT_CHUNK).map(Into::into).collect();
            inserted += chunk.len() as u64;
            daily_prices::Entity::insert_many(chunk).exec(&txn).await?;
        }

        txn.commit().await?;
        log::debug!(
            "Replaced price cache of product {product_id} for {}..{}: deleted {deleted}, inserted {inserted}",
            window.start,
            window.end
        );
        Ok(inserted)
    }

    async fn purge_product(&self, product_id: i64) -> AppResult<u64> {
        let txn = self.pool.begin().await?;
        lock_product(&txn, product_id).await?;
        let res = daily_prices::Entity::delete_many()
            .filter(daily_prices::Column::ProductId.eq(product_id))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(res.rows_affected)
    }

    async fn cached_price(
        &self,
        product_id: i64,
        hotel_id: i64,
        room_type_id: i64,
        date: NaiveDate,
    ) -> AppResult<Option<daily_prices::Model>> {
        Ok(daily_prices::Entity::find()
            .filter(daily_prices::Column::ProductId.eq(product_id))
            .filter(daily_prices::Column::HotelId.eq(hotel_id))
            .filter(daily_prices::Column::RoomTypeId.eq(room_type_id))
            .filter(daily_prices::Column::BizDate.eq(date))
            .one(&self.pool)
            .await?)
    }

    async fn cached_prices(
        &self,
        product_id: i64,
        hotel_id: i64,
        room_type_id: i64,
        window: DateWindow,
    ) -> AppResult<Vec<daily_prices::Model>> {
        Ok(daily_prices::Entity::find()
            .filter(daily_prices::Column::ProductId.eq(product_id))
            .filter(daily_prices::Column::HotelId.eq(hotel_id))
            .filter(daily_prices::Column::RoomTypeId.eq(room_type_id))
            .filter(daily_prices::Column::BizDate.between(window.start, window.end))
            .order_by_asc(daily_prices::Column::BizDate)
            .all(&self.pool)
            .await?)
    }
}
