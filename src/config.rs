use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub tasks: TaskConfig,
    #[serde(default)]
    pub ota: OtaConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// 允许跨域的来源，为空时全部放行
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// 滚动价格窗口天数（含今天）
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// 业务日期所在时区（相对 UTC 的小时数）
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    /// 重建价格缓存后是否自动推送到各 OTA
    #[serde(default = "default_true")]
    pub auto_sync_after_rebuild: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// 库存推送防抖时间（秒）
    #[serde(default = "default_debounce_seconds")]
    pub debounce_seconds: u64,
    /// 低库存阈值，库存跨越该值时需要通知美团
    #[serde(default)]
    pub low_stock_threshold: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_retry_backoff_seconds")]
    pub retry_backoff_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OtaConfig {
    #[serde(default)]
    pub ctrip: Option<OtaPlatformConfig>,
    #[serde(default)]
    pub meituan: Option<OtaPlatformConfig>,
    #[serde(default)]
    pub fliggy: Option<OtaPlatformConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtaPlatformConfig {
    pub base_url: String,
    pub app_key: String,
    pub app_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub api_key: String,
}

fn default_horizon_days() -> u32 {
    60
}

fn default_utc_offset_hours() -> i32 {
    8
}

fn default_true() -> bool {
    true
}

fn default_debounce_seconds() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_timeout_seconds() -> u64 {
    120
}

fn default_retry_backoff_seconds() -> u64 {
    5
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            horizon_days: default_horizon_days(),
            utc_offset_hours: default_utc_offset_hours(),
            auto_sync_after_rebuild: true,
        }
    }
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            debounce_seconds: default_debounce_seconds(),
            low_stock_threshold: 0,
        }
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            timeout_seconds: default_timeout_seconds(),
            retry_backoff_seconds: default_retry_backoff_seconds(),
        }
    }
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                toml::from_str(&config_str).map_err(|e| format!("解析配置文件失败: {e}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .ok_or("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                        cors_allowed_origins: Vec::new(),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    pricing: PricingConfig::default(),
                    inventory: InventoryConfig::default(),
                    tasks: TaskConfig::default(),
                    ota: OtaConfig::default(),
                    provider: ProviderConfig::default(),
                }
            }
            Err(e) => {
                return Err(format!("无法读取配置文件 {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// 环境变量覆盖（即便文件存在时也覆盖）
    fn apply_env_overrides(&mut self) {
        if let Some(v) = get_env("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(p) = get_env_opt("SERVER_PORT") {
            self.server.port = p;
        }
        if let Some(v) = get_env("CORS_ALLOWED_ORIGINS") {
            self.server.cors_allowed_origins = v
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(v) = get_env("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(mc) = get_env_opt("DB_MAX_CONNECTIONS") {
            self.database.max_connections = mc;
        }
        if let Some(n) = get_env_opt("PRICING_HORIZON_DAYS") {
            self.pricing.horizon_days = n;
        }
        if let Some(n) = get_env_opt("PRICING_UTC_OFFSET_HOURS") {
            self.pricing.utc_offset_hours = n;
        }
        if let Some(b) = get_env_opt("PRICING_AUTO_SYNC") {
            self.pricing.auto_sync_after_rebuild = b;
        }
        if let Some(n) = get_env_opt("INVENTORY_DEBOUNCE_SECONDS") {
            self.inventory.debounce_seconds = n;
        }
        if let Some(n) = get_env_opt("INVENTORY_LOW_STOCK_THRESHOLD") {
            self.inventory.low_stock_threshold = n;
        }
        if let Some(n) = get_env_opt("TASK_MAX_ATTEMPTS") {
            self.tasks.max_attempts = n;
        }
        if let Some(n) = get_env_opt("TASK_TIMEOUT_SECONDS") {
            self.tasks.timeout_seconds = n;
        }
        if let Some(v) = get_env("PROVIDER_BASE_URL") {
            self.provider.base_url = Some(v);
        }
        if let Some(v) = get_env("PROVIDER_API_KEY") {
            self.provider.api_key = v;
        }

        // OTA 平台：三个变量齐全才视为已配置
        if let Some(c) = platform_from_env("CTRIP") {
            self.ota.ctrip = Some(c);
        }
        if let Some(c) = platform_from_env("MEITUAN") {
            self.ota.meituan = Some(c);
        }
        if let Some(c) = platform_from_env("FLIGGY") {
            self.ota.fliggy = Some(c);
        }
    }
}

fn get_env(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn get_env_opt<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse::<T>().ok())
}

fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    get_env_opt(name).unwrap_or(default)
}

fn platform_from_env(prefix: &str) -> Option<OtaPlatformConfig> {
    Some(OtaPlatformConfig {
        base_url: get_env(&format!("{prefix}_BASE_URL"))?,
        app_key: get_env(&format!("{prefix}_APP_KEY"))?,
        app_secret: get_env(&format!("{prefix}_APP_SECRET"))?,
    })
}
