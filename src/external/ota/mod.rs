//! OTA 平台推送
//!
//! 每个平台一个 [`OtaPusher`] 实现，由 [`PlatformRegistry`] 按配置显式注册。
//! 新增平台时 `OtaPlatform` 的穷尽匹配会在编译期提示需要补齐的位置。

mod ctrip;
mod fliggy;
mod meituan;
mod signed;

pub use ctrip::CtripClient;
pub use fliggy::FliggyClient;
pub use meituan::MeituanClient;
pub use signed::{OtaReply, SignedClient, sign};

use crate::config::OtaConfig;
use crate::entities::OtaPlatform;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// 价格日历中的一天
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarPrice {
    pub date: NaiveDate,
    pub sale_price: Decimal,
    pub cost_price: Decimal,
}

/// 库存日历中的一天
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarStock {
    pub date: NaiveDate,
    pub available: i32,
}

#[async_trait]
pub trait OtaPusher: Send + Sync {
    fn platform(&self) -> OtaPlatform;

    async fn push_price_calendar(&self, product_code: &str, prices: &[CalendarPrice])
    -> AppResult<()>;

    async fn push_inventory(&self, product_code: &str, stocks: &[CalendarStock]) -> AppResult<()>;

    /// 库存跨越低库存阈值时的额外通知，仅部分平台支持
    async fn signal_stock_threshold(
        &self,
        _product_code: &str,
        _stocks: &[CalendarStock],
    ) -> AppResult<()> {
        Err(AppError::Unsupported(format!(
            "{} does not accept stock threshold signals",
            self.platform()
        )))
    }

    fn supports_stock_threshold(&self) -> bool {
        false
    }
}

/// 平台 -> 推送实现
#[derive(Clone, Default)]
pub struct PlatformRegistry {
    pushers: HashMap<OtaPlatform, Arc<dyn OtaPusher>>,
}

impl PlatformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 只注册配置了凭证的平台
    pub fn from_config(config: &OtaConfig) -> Self {
        let mut registry = Self::new();
        for platform in OtaPlatform::ALL {
            let pusher: Option<Arc<dyn OtaPusher>> = match platform {
                OtaPlatform::Ctrip => config
                    .ctrip
                    .clone()
                    .map(|c| Arc::new(CtripClient::new(c)) as Arc<dyn OtaPusher>),
                OtaPlatform::Meituan => config
                    .meituan
                    .clone()
                    .map(|c| Arc::new(MeituanClient::new(c)) as Arc<dyn OtaPusher>),
                OtaPlatform::Fliggy => config
                    .fliggy
                    .clone()
                    .map(|c| Arc::new(FliggyClient::new(c)) as Arc<dyn OtaPusher>),
            };
            match pusher {
                Some(p) => registry.register(p),
                None => log::info!("OTA platform {platform} not configured, skipped"),
            }
        }
        registry
    }

    pub fn register(&mut self, pusher: Arc<dyn OtaPusher>) {
        self.pushers.insert(pusher.platform(), pusher);
    }

    pub fn get(&self, platform: OtaPlatform) -> AppResult<Arc<dyn OtaPusher>> {
        self.pushers.get(&platform).cloned().ok_or_else(|| {
            AppError::Unsupported(format!("OTA platform {platform} is not registered"))
        })
    }

    /// 按平台编码查找；未知编码与未注册平台都返回 Unsupported
    pub fn resolve(&self, code: &str) -> AppResult<Arc<dyn OtaPusher>> {
        let platform: OtaPlatform = code.parse()?;
        self.get(platform)
    }

    /// 已注册的平台，顺序固定
    pub fn platforms(&self) -> Vec<OtaPlatform> {
        OtaPlatform::ALL
            .into_iter()
            .filter(|p| self.pushers.contains_key(p))
            .collect()
    }

    pub fn pushers(&self) -> Vec<Arc<dyn OtaPusher>> {
        self.platforms()
            .into_iter()
            .filter_map(|p| self.pushers.get(&p).cloned())
            .collect()
    }
}

#[cfg(test)]
pub use fake::FakePusher;

#[cfg(test)]
mod fake {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum PushCall {
        Prices(String, Vec<CalendarPrice>),
        Inventory(String, Vec<CalendarStock>),
        Threshold(String, Vec<CalendarStock>),
    }

    /// Records pushes; product codes in `failing` get an UpstreamPush error.
    pub struct FakePusher {
        platform: OtaPlatform,
        threshold: bool,
        failing: Mutex<HashSet<String>>,
        calls: Mutex<Vec<PushCall>>,
    }

    impl FakePusher {
        pub fn new(platform: OtaPlatform) -> Self {
            Self {
                platform,
                threshold: platform == OtaPlatform::Meituan,
                failing: Mutex::new(HashSet::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn fail_for(&self, product_code: &str) {
            self.failing.lock().unwrap().insert(product_code.to_string());
        }

        pub fn calls(&self) -> Vec<PushCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn price_pushes(&self) -> Vec<(String, Vec<CalendarPrice>)> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    PushCall::Prices(code, prices) => Some((code, prices)),
                    _ => None,
                })
                .collect()
        }

        fn record(&self, code: &str, call: PushCall) -> AppResult<()> {
            if self.failing.lock().unwrap().contains(code) {
                return Err(AppError::UpstreamPush(format!("{} rejected {code}", self.platform)));
            }
            self.calls.lock().unwrap().push(call);
            Ok(())
        }
    }

    #[async_trait]
    impl OtaPusher for FakePusher {
        fn platform(&self) -> OtaPlatform {
            self.platform
        }

        async fn push_price_calendar(
            &self,
            product_code: &str,
            prices: &[CalendarPrice],
        ) -> AppResult<()> {
            self.record(
                product_code,
                PushCall::Prices(product_code.to_string(), prices.to_vec()),
            )
        }

        async fn push_inventory(
            &self,
            product_code: &str,
            stocks: &[CalendarStock],
        ) -> AppResult<()> {
            self.record(
                product_code,
                PushCall::Inventory(product_code.to_string(), stocks.to_vec()),
            )
        }

        async fn signal_stock_threshold(
            &self,
            product_code: &str,
            stocks: &[CalendarStock],
        ) -> AppResult<()> {
            if !self.threshold {
                return Err(AppError::Unsupported("no threshold".into()));
            }
            self.record(
                product_code,
                PushCall::Threshold(product_code.to_string(), stocks.to_vec()),
            )
        }

        fn supports_stock_threshold(&self) -> bool {
            self.threshold
        }
    }
}

#[cfg(test)]
pub use fake::PushCall;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OtaPlatformConfig;

    fn creds() -> OtaPlatformConfig {
        OtaPlatformConfig {
            base_url: "https://ota.example.com".into(),
            app_key: "key".into(),
            app_secret: "secret".into(),
        }
    }

    #[test]
    fn test_registry_only_registers_configured_platforms() {
        let config = OtaConfig {
            ctrip: None,
            meituan: Some(creds()),
            fliggy: Some(creds()),
        };
        let registry = PlatformRegistry::from_config(&config);
        assert_eq!(
            registry.platforms(),
            vec![OtaPlatform::Meituan, OtaPlatform::Fliggy]
        );
        assert!(registry.get(OtaPlatform::Meituan).unwrap().supports_stock_threshold());
        assert!(!registry.get(OtaPlatform::Fliggy).unwrap().supports_stock_threshold());
    }

    #[test]
    fn test_resolve_unknown_and_unregistered() {
        let registry = PlatformRegistry::from_config(&OtaConfig {
            ctrip: Some(creds()),
            meituan: None,
            fliggy: None,
        });
        assert!(registry.resolve("CTRIP").is_ok());
        assert!(matches!(
            registry.resolve("meituan"),
            Err(AppError::Unsupported(_))
        ));
        assert!(matches!(
            registry.resolve("qunar"),
            Err(AppError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn test_default_threshold_signal_is_unsupported() {
        let client = CtripClient::new(creds());
        let err = client
            .signal_stock_threshold("PKG|1|2|3", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unsupported(_)));
    }
}
