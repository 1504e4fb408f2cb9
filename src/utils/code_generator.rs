use chrono::{DateTime, Utc};
use rand::Rng;

/// 生成内部订单号：PO + 14 位时间戳 + 6 位随机数
pub fn generate_order_no(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    format!(
        "PO{}{:06}",
        now.format("%Y%m%d%H%M%S"),
        rng.gen_range(0..=999999)
    )
}

/// 人工履约的占位确认号
pub fn manual_confirmation_no(item_id: i64, now: DateTime<Utc>) -> String {
    format!("MANUAL-{item_id}-{}", now.format("%Y%m%d%H%M%S"))
}
