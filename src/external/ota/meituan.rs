use super::{CalendarPrice, CalendarStock, OtaPusher, SignedClient};
use crate::config::OtaPlatformConfig;
use crate::entities::OtaPlatform;
use crate::error::AppResult;
use async_trait::async_trait;
use serde_json::{Value, json};

const SUCCESS_CODE: i64 = 200;

/// 美团：库存接近 0 时需要额外的阈值通知
#[derive(Clone)]
pub struct MeituanClient {
    client: SignedClient,
}

impl MeituanClient {
    pub fn new(config: OtaPlatformConfig) -> Self {
        Self {
            client: SignedClient::new(OtaPlatform::Meituan, config, SUCCESS_CODE),
        }
    }

    fn price_body(product_code: &str, prices: &[CalendarPrice]) -> Value {
        json!({
            "partnerDealId": product_code,
            "prices": prices.iter().map(|p| json!({
                "date": p.date.format("%Y-%m-%d").to_string(),
                // 美团以分为单位
                "sellPrice": to_cents(p.sale_price),
                "settlePrice": to_cents(p.cost_price),
            })).collect::<Vec<_>>(),
        })
    }

    fn stock_body(product_code: &str, stocks: &[CalendarStock]) -> Value {
        json!({
            "partnerDealId": product_code,
            "stocks": stocks.iter().map(|s| json!({
                "date": s.date.format("%Y-%m-%d").to_string(),
                "remain": s.available.max(0),
            })).collect::<Vec<_>>(),
        })
    }
}

fn to_cents(amount: rust_decimal::Decimal) -> i64 {
    use rust_decimal::prelude::ToPrimitive;
    (amount.round_dp(2) * rust_decimal::Decimal::ONE_HUNDRED)
        .to_i64()
        .unwrap_or(0)
}

#[async_trait]
impl OtaPusher for MeituanClient {
    fn platform(&self) -> OtaPlatform {
        OtaPlatform::Meituan
    }

    async fn push_price_calendar(
        &self,
        product_code: &str,
        prices: &[CalendarPrice],
    ) -> AppResult<()> {
        self.client
            .post(
                "/api/deal/price/push",
                &Self::price_body(product_code, prices),
            )
            .await?;
        log::info!("Meituan prices pushed: {product_code} ({} days)", prices.len());
        Ok(())
    }

    async fn push_inventory(&self, product_code: &str, stocks: &[CalendarStock]) -> AppResult<()> {
        self.client
            .post("/api/deal/stock/push", &Self::stock_body(product_code, stocks))
            .await?;
        log::info!("Meituan stock pushed: {product_code} ({} days)", stocks.len());
        Ok(())
    }

    async fn signal_stock_threshold(
        &self,
        product_code: &str,
        stocks: &[CalendarStock],
    ) -> AppResult<()> {
        let mut body = Self::stock_body(product_code, stocks);
        body["soldOut"] = json!(stocks.iter().any(|s| s.available <= 0));
        self.client
            .post("/api/deal/stock/threshold/notify", &body)
            .await?;
        log::info!("Meituan stock threshold signalled: {product_code}");
        Ok(())
    }

    fn supports_stock_threshold(&self) -> bool {
        true
    }
}
