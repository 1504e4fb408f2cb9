//! 带过期时间的键值存储，库存防抖的状态都放在这里

mod memory;

pub use memory::MemoryStore;

use crate::error::AppResult;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// `update` 的更新函数：入参为当前值（不存在或已过期为 None）
pub type Updater = Box<dyn FnOnce(Option<&Value>) -> Value + Send>;

#[async_trait]
pub trait ExpiringStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<Value>>;

    /// 写入并重置过期时间
    async fn put(&self, key: &str, value: Value, ttl: Duration) -> AppResult<()>;

    /// 仅在键不存在时写入，返回是否写入成功
    async fn add(&self, key: &str, value: Value, ttl: Duration) -> AppResult<bool>;

    /// 原子读改写。键不存在时按 `ttl` 新建，已存在则保留原过期时间
    async fn update(&self, key: &str, ttl: Duration, f: Updater) -> AppResult<Value>;

    /// 读取并删除
    async fn pull(&self, key: &str) -> AppResult<Option<Value>>;

    async fn forget(&self, key: &str) -> AppResult<()>;
}
