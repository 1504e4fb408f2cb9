//! OTA 侧的打包产品编码：`PKG|{roomTypeId}|{hotelId}|{productId}`
//!
//! 段顺序固定为 房型、酒店、产品，已推送到各 OTA 的编码依赖该顺序，不可调整。

use crate::error::{AppError, AppResult};
use serde::Serialize;
use std::fmt;

const PREFIX: &str = "PKG";
const SEPARATOR: char = '|';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CompositeCode {
    pub room_type_id: i64,
    pub hotel_id: i64,
    pub product_id: i64,
}

impl CompositeCode {
    pub fn new(product_id: i64, hotel_id: i64, room_type_id: i64) -> Self {
        Self {
            room_type_id,
            hotel_id,
            product_id,
        }
    }
}

impl fmt::Display for CompositeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{PREFIX}{SEPARATOR}{}{SEPARATOR}{}{SEPARATOR}{}",
            self.room_type_id, self.hotel_id, self.product_id
        )
    }
}

impl std::str::FromStr for CompositeCode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s)
    }
}

/// 生成编码
pub fn generate(product_id: i64, hotel_id: i64, room_type_id: i64) -> String {
    CompositeCode::new(product_id, hotel_id, room_type_id).to_string()
}

/// 编码格式是否合法
pub fn validate(code: &str) -> bool {
    split_ids(code).is_some()
}

/// 解析编码，格式非法时返回 FormatError
pub fn parse(code: &str) -> AppResult<CompositeCode> {
    let [room_type_id, hotel_id, product_id] = split_ids(code)
        .ok_or_else(|| AppError::FormatError(format!("invalid composite code: {code:?}")))?;
    Ok(CompositeCode {
        room_type_id,
        hotel_id,
        product_id,
    })
}

fn split_ids(code: &str) -> Option<[i64; 3]> {
    if !code.starts_with("PKG|") {
        return None;
    }
    let segments: Vec<&str> = code.split(SEPARATOR).collect();
    if segments.len() != 4 || segments[0] != PREFIX {
        return None;
    }
    let mut ids = [0i64; 3];
    for (slot, segment) in ids.iter_mut().zip(&segments[1..]) {
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *slot = segment.parse().ok()?;
    }
    Some(ids)
}
