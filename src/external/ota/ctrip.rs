use super::{CalendarPrice, CalendarStock, OtaPusher, SignedClient};
use crate::config::OtaPlatformConfig;
use crate::entities::OtaPlatform;
use crate::error::AppResult;
use async_trait::async_trait;
use serde_json::{Value, json};

const SUCCESS_CODE: i64 = 0;

#[derive(Clone)]
pub struct CtripClient {
    client: SignedClient,
}

impl CtripClient {
    pub fn new(config: OtaPlatformConfig) -> Self {
        Self {
            client: SignedClient::new(OtaPlatform::Ctrip, config, SUCCESS_CODE),
        }
    }

    fn price_body(product_code: &str, prices: &[CalendarPrice]) -> Value {
        json!({
            "supplierProductCode": product_code,
            "priceCalendar": prices.iter().map(|p| json!({
                "date": p.date.format("%Y-%m-%d").to_string(),
                "salePrice": format!("{:.2}", p.sale_price),
                "costPrice": format!("{:.2}", p.cost_price),
            })).collect::<Vec<_>>(),
        })
    }

    fn inventory_body(product_code: &str, stocks: &[CalendarStock]) -> Value {
        json!({
            "supplierProductCode": product_code,
            "inventoryCalendar": stocks.iter().map(|s| json!({
                "date": s.date.format("%Y-%m-%d").to_string(),
                "quantity": s.available.max(0),
            })).collect::<Vec<_>>(),
        })
    }
}

#[async_trait]
impl OtaPusher for CtripClient {
    fn platform(&self) -> OtaPlatform {
        OtaPlatform::Ctrip
    }

    async fn push_price_calendar(
        &self,
        product_code: &str,
        prices: &[CalendarPrice],
    ) -> AppResult<()> {
        self.client
            .post(
                "/product/price/calendar/sync",
                &Self::price_body(product_code, prices),
            )
            .await?;
        log::info!("Ctrip price calendar pushed: {product_code} ({} days)", prices.len());
        Ok(())
    }

    async fn push_inventory(&self, product_code: &str, stocks: &[CalendarStock]) -> AppResult<()> {
        self.client
            .post(
                "/product/inventory/sync",
                &Self::inventory_body(product_code, stocks),
            )
            .await?;
        log::info!("Ctrip inventory pushed: {product_code} ({} days)", stocks.len());
        Ok(())
    }
}
