use super::{ExpiringStore, Updater};
use crate::error::AppResult;
use crate::utils::Clock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

struct Slot {
    value: Value,
    expires_at: DateTime<Utc>,
}

impl Slot {
    fn new(value: Value, now: DateTime<Utc>, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365));
        Self {
            value,
            expires_at: now + ttl,
        }
    }

    fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// 进程内实现，过期按注入的时钟判断（惰性清理）
pub struct MemoryStore {
    entries: DashMap<String, Slot>,
    clock: Arc<dyn Clock>,
}

impl MemoryStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// 清理已过期的键
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, slot| slot.is_live(now));
        before - self.entries.len()
    }
}

#[async_trait]
impl ExpiringStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<Value>> {
        let now = self.clock.now();
        Ok(self
            .entries
            .get(key)
            .filter(|slot| slot.is_live(now))
            .map(|slot| slot.value.clone()))
    }

    async fn put(&self, key: &str, value: Value, ttl: Duration) -> AppResult<()> {
        let now = self.clock.now();
        self.entries.insert(key.to_string(), Slot::new(value, now, ttl));
        Ok(())
    }

    async fn add(&self, key: &str, value: Value, ttl: Duration) -> AppResult<bool> {
        let now = self.clock.now();
        match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    return Ok(false);
                }
                occupied.insert(Slot::new(value, now, ttl));
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Slot::new(value, now, ttl));
                Ok(true)
            }
        }
    }

    async fn update(&self, key: &str, ttl: Duration, f: Updater) -> AppResult<Value> {
        let now = self.clock.now();
        let value = match self.entries.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live(now) {
                    let value = f(Some(&occupied.get().value));
                    occupied.get_mut().value = value.clone();
                    value
                } else {
                    let value = f(None);
                    occupied.insert(Slot::new(value.clone(), now, ttl));
                    value
                }
            }
            Entry::Vacant(vacant) => {
                let value = f(None);
                vacant.insert(Slot::new(value.clone(), now, ttl));
                value
            }
        };
        Ok(value)
    }

    async fn pull(&self, key: &str) -> AppResult<Option<Value>> {
        let now = self.clock.now();
        Ok(self
            .entries
            .remove(key)
            .filter(|(_, slot)| slot.is_live(now))
            .map(|(_, slot)| slot.value))
    }

    async fn forget(&self, key: &str) -> AppResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::FakeClock;
    use chrono::NaiveDate;
    use serde_json::json;

    fn store() -> (Arc<FakeClock>, MemoryStore) {
        let clock = Arc::new(FakeClock::on(NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()));
        let store = MemoryStore::new(clock.clone());
        (clock, store)
    }

    #[tokio::test]
    async fn test_put_expires() {
        let (clock, store) = store();
        store
            .put("k", json!(1), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!(1)));

        clock.advance(chrono::Duration::seconds(10));
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.purge_expired(), 1);
    }

    #[tokio::test]
    async fn test_add_only_when_absent() {
        let (clock, store) = store();
        assert!(store.add("m", json!(true), Duration::from_secs(5)).await.unwrap());
        assert!(!store.add("m", json!(true), Duration::from_secs(5)).await.unwrap());

        // 过期后可再次占用
        clock.advance(chrono::Duration::seconds(6));
        assert!(store.add("m", json!(true), Duration::from_secs(5)).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_keeps_original_expiry() {
        let (clock, store) = store();
        let bump: fn() -> Updater = || {
            Box::new(|cur: Option<&Value>| json!(cur.and_then(Value::as_i64).unwrap_or(0) + 1))
        };

        assert_eq!(
            store.update("c", Duration::from_secs(10), bump()).await.unwrap(),
            json!(1)
        );
        clock.advance(chrono::Duration::seconds(8));
        assert_eq!(
            store.update("c", Duration::from_secs(10), bump()).await.unwrap(),
            json!(2)
        );
        // 第一次写入后 10 秒过期，第二次更新不续期
        clock.advance(chrono::Duration::seconds(3));
        assert_eq!(store.get("c").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pull_removes() {
        let (_clock, store) = store();
        store
            .put("p", json!([1, 2]), Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(store.pull("p").await.unwrap(), Some(json!([1, 2])));
        assert_eq!(store.pull("p").await.unwrap(), None);

        store
            .put("f", json!("x"), Duration::from_secs(10))
            .await
            .unwrap();
        store.forget("f").await.unwrap();
        assert_eq!(store.get("f").await.unwrap(), None);
    }
}
