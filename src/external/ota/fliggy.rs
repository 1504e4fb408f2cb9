use super::{CalendarPrice, CalendarStock, OtaPusher, SignedClient};
use crate::config::OtaPlatformConfig;
use crate::entities::OtaPlatform;
use crate::error::AppResult;
use async_trait::async_trait;
use serde_json::{Value, json};

const SUCCESS_CODE: i64 = 0;

#[derive(Clone)]
pub struct FliggyClient {
    client: SignedClient,
}

impl FliggyClient {
    pub fn new(config: OtaPlatformConfig) -> Self {
        Self {
            client: SignedClient::new(OtaPlatform::Fliggy, config, SUCCESS_CODE),
        }
    }

    /// 飞猪价格与库存走同一个 SKU 日历接口
    fn sku_body(product_code: &str, prices: &[CalendarPrice], stocks: &[CalendarStock]) -> Value {
        json!({
            "outerId": product_code,
            "priceItems": prices.iter().map(|p| json!({
                "date": p.date.format("%Y-%m-%d").to_string(),
                "price": format!("{:.2}", p.sale_price),
            })).collect::<Vec<_>>(),
            "stockItems": stocks.iter().map(|s| json!({
                "date": s.date.format("%Y-%m-%d").to_string(),
                "stock": s.available.max(0),
            })).collect::<Vec<_>>(),
        })
    }
}

#[async_trait]
impl OtaPusher for FliggyClient {
    fn platform(&self) -> OtaPlatform {
        OtaPlatform::Fliggy
    }

    async fn push_price_calendar(
        &self,
        product_code: &str,
        prices: &[CalendarPrice],
    ) -> AppResult<()> {
        self.client
            .post(
                "/package/sku/calendar/update",
                &Self::sku_body(product_code, prices, &[]),
            )
            .await?;
        log::info!("Fliggy prices pushed: {product_code} ({} days)", prices.len());
        Ok(())
    }

    async fn push_inventory(&self, product_code: &str, stocks: &[CalendarStock]) -> AppResult<()> {
        self.client
            .post(
                "/package/sku/calendar/update",
                &Self::sku_body(product_code, &[], stocks),
            )
            .await?;
        log::info!("Fliggy stock pushed: {product_code} ({} days)", stocks.len());
        Ok(())
    }
}
