use crate::config::OtaPlatformConfig;
use crate::entities::OtaPlatform;
use crate::error::{AppError, AppResult};
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 平台通用应答
#[derive(Debug, Serialize, Deserialize)]
pub struct OtaReply {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// 请求签名：md5(app_key + timestamp + body + app_secret)，小写十六进制
pub fn sign(app_key: &str, timestamp: i64, body: &str, app_secret: &str) -> String {
    format!(
        "{:x}",
        md5::compute(format!("{app_key}{timestamp}{body}{app_secret}"))
    )
}

/// 带签名头的 JSON 客户端，各平台共用
#[derive(Clone)]
pub struct SignedClient {
    platform: OtaPlatform,
    http: Client,
    config: OtaPlatformConfig,
    success_code: i64,
}

impl SignedClient {
    pub fn new(platform: OtaPlatform, config: OtaPlatformConfig, success_code: i64) -> Self {
        let http = Client::builder()
            .user_agent("pkgsync-backend")
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|e| {
                log::warn!("Failed to build HTTP client for {platform}, using defaults: {e}");
                Client::new()
            });
        Self {
            platform,
            http,
            config,
            success_code,
        }
    }

    pub async fn post(&self, path: &str, body: &serde_json::Value) -> AppResult<OtaReply> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let payload = serde_json::to_string(body)?;
        let timestamp = Utc::now().timestamp();
        let signature = sign(
            &self.config.app_key,
            timestamp,
            &payload,
            &self.config.app_secret,
        );

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("X-App-Key", &self.config.app_key)
            .header("X-Timestamp", timestamp.to_string())
            .header("X-Sign", signature)
            .body(payload)
            .send()
            .await
            .map_err(|e| AppError::UpstreamPush(format!("{} request failed: {e}", self.platform)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::UpstreamPush(format!(
                "{} responded {status}: {text}",
                self.platform
            )));
        }

        let reply: OtaReply = response.json().await.map_err(|e| {
            AppError::UpstreamPush(format!("{} returned an invalid reply: {e}", self.platform))
        })?;
        if reply.code != self.success_code {
            return Err(AppError::UpstreamPush(format!(
                "{} rejected push: [{}] {}",
                self.platform, reply.code, reply.message
            )));
        }
        Ok(reply)
    }
}
