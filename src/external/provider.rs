use crate::config::ProviderConfig;
use crate::entities::OrderItemType;
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// 向资源方（景区 / 酒店）下单
#[derive(Debug, Clone, Serialize)]
pub struct BookingRequest {
    pub item_id: i64,
    pub order_no: String,
    pub item_type: OrderItemType,
    pub provider_code: Option<String>,
    pub resource_id: i64,
    pub resource_name: String,
    /// 酒店子单的房型
    pub room_type_id: Option<i64>,
    pub quantity: i32,
    pub check_in_date: NaiveDate,
    pub check_out_date: NaiveDate,
    pub contact_name: String,
    pub contact_phone: String,
}

#[derive(Debug, Deserialize)]
pub struct BookingReply {
    pub success: bool,
    #[serde(default)]
    pub confirmation_no: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[async_trait]
pub trait ResourceProvider: Send + Sync {
    /// 成功返回资源方确认号
    async fn book(&self, request: &BookingRequest) -> AppResult<String>;
}

#[derive(Clone)]
pub struct HttpResourceProvider {
    client: Client,
    config: ProviderConfig,
}

impl HttpResourceProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl ResourceProvider for HttpResourceProvider {
    async fn book(&self, request: &BookingRequest) -> AppResult<String> {
        let base_url = self.config.base_url.as_deref().ok_or_else(|| {
            AppError::ConfigurationError("resource provider base_url is not configured".into())
        })?;
        let url = format!("{}/bookings", base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!(
                "Provider booking failed for item {}: {status} {text}",
                request.item_id
            );
            return Err(AppError::UpstreamPush(format!(
                "provider responded {status}: {text}"
            )));
        }

        let reply: BookingReply = response.json().await?;
        match (reply.success, reply.confirmation_no) {
            (true, Some(no)) if !no.is_empty() => Ok(no),
            (true, _) => Err(AppError::UpstreamPush(
                "provider accepted booking without a confirmation number".into(),
            )),
            (false, _) => Err(AppError::UpstreamPush(
                reply
                    .message
                    .unwrap_or_else(|| "provider rejected booking".to_string()),
            )),
        }
    }
}

#[cfg(test)]
pub use fake::FakeProvider;


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_provider_is_configuration_error() {
        let provider = HttpResourceProvider::new(ProviderConfig::default());
        let request = BookingRequest {
            item_id: 1,
            order_no: "PO1".into(),
            item_type: OrderItemType::Ticket,
            provider_code: None,
            resource_id: 2,
            resource_name: "Park".into(),
            room_type_id: None,
            quantity: 2,
            check_in_date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            check_out_date: NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(),
            contact_name: "Li".into(),
            contact_phone: "13800000000".into(),
        };
        let err = provider.book(&request).await.unwrap_err();
        assert!(matches!(err, AppError::ConfigurationError(_)));
    }
}
