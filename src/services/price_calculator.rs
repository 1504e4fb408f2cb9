use crate::entities::{
    bundle_item_entity, hotel_daily_stock_entity, hotel_room_type_entity, ticket_price_entity,
};
use crate::error::AppResult;
use crate::models::{CellPrice, DateWindow};
use crate::repository::CatalogRepository;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// 打包价 = 酒店房价 + Σ(门票价 × 数量)，缺失的价格按 0 计
#[derive(Clone)]
pub struct PriceCalculator {
    catalog: Arc<dyn CatalogRepository>,
}

impl PriceCalculator {
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    /// 单日价格
    pub async fn compute_cell(
        &self,
        association: &hotel_room_type_entity::Model,
        bundle_items: &[bundle_item_entity::Model],
        date: NaiveDate,
    ) -> AppResult<CellPrice> {
        let stock = self
            .catalog
            .hotel_stock(association.hotel_id, association.room_type_id, date)
            .await?;

        let mut tickets = Vec::with_capacity(bundle_items.len());
        for item in bundle_items {
            let price = self.catalog.ticket_price(item.ticket_id, date).await?;
            tickets.push((item.quantity, price));
        }

        Ok(combine(
            stock.as_ref(),
            tickets.iter().map(|(qty, p)| (*qty, p.as_ref())),
        ))
    }

    /// 整个窗口的价格：两次查询预取酒店库存和门票价，逐日在内存中计算
    pub async fn compute_range(
        &self,
        association: &hotel_room_type_entity::Model,
        bundle_items: &[bundle_item_entity::Model],
        window: DateWindow,
    ) -> AppResult<BTreeMap<NaiveDate, CellPrice>> {
        let stocks: HashMap<NaiveDate, hotel_daily_stock_entity::Model> = self
            .catalog
            .hotel_stocks(association.hotel_id, association.room_type_id, window)
            .await?
            .into_iter()
            .map(|s| (s.biz_date, s))
            .collect();

        let ticket_ids: Vec<i64> = bundle_items.iter().map(|b| b.ticket_id).collect();
        let ticket_prices: HashMap<(i64, NaiveDate), ticket_price_entity::Model> = self
            .catalog
            .ticket_prices(&ticket_ids, window)
            .await?
            .into_iter()
            .map(|p| ((p.ticket_id, p.biz_date), p))
            .collect();

        Ok(window
            .dates()
            .map(|date| {
                let cell = combine(
                    stocks.get(&date),
                    bundle_items
                        .iter()
                        .map(|b| (b.quantity, ticket_prices.get(&(b.ticket_id, date)))),
                );
                (date, cell)
            })
            .collect())
    }
}

fn combine<'a>(
    stock: Option<&hotel_daily_stock_entity::Model>,
    tickets: impl Iterator<Item = (i32, Option<&'a ticket_price_entity::Model>)>,
) -> CellPrice {
    let (mut sale, mut cost) = stock
        .map(|s| (s.sale_price, s.cost_price))
        .unwrap_or((Decimal::ZERO, Decimal::ZERO));

    for (quantity, price) in tickets {
        if let Some(p) = price {
            let qty = Decimal::from(quantity);
            sale += p.sale_price * qty;
            cost += p.cost_price * qty;
        }
    }

    CellPrice {
        sale_price: sale.max(Decimal::ZERO).round_dp(2),
        cost_price: cost.max(Decimal::ZERO).round_dp(2),
    }
}
