use crate::entities::OtaPlatform;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
pub struct SyncRequest {
    /// 为空时推送整个有效售卖窗口
    #[serde(default)]
    pub dates: Option<Vec<NaiveDate>>,
}

/// 单个 酒店 × 房型 组合的推送结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct CombinationResult {
    pub hotel_id: i64,
    pub room_type_id: i64,
    pub product_code: String,
    pub success: bool,
    pub pushed: usize,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SyncReport {
    pub product_id: i64,
    pub platform: OtaPlatform,
    pub success: bool,
    pub message: String,
    pub results: Vec<CombinationResult>,
}

impl SyncReport {
    pub fn from_results(
        product_id: i64,
        platform: OtaPlatform,
        results: Vec<CombinationResult>,
    ) -> Self {
        let failed = results.iter().filter(|r| !r.success).count();
        let success = failed == 0;
        let message = if success {
            format!("{} combination(s) pushed", results.len())
        } else {
            format!("{failed} of {} combination(s) failed", results.len())
        };
        Self {
            product_id,
            platform,
            success,
            message,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(success: bool) -> CombinationResult {
        CombinationResult {
            hotel_id: 1,
            room_type_id: 2,
            product_code: "PKG|2|1|9".into(),
            success,
            pushed: 3,
            message: String::new(),
        }
    }

    #[test]
    fn test_report_success_requires_all_combinations() {
        let ok = SyncReport::from_results(9, OtaPlatform::Ctrip, vec![result(true), result(true)]);
        assert!(ok.success);

        let partial =
            SyncReport::from_results(9, OtaPlatform::Ctrip, vec![result(true), result(false)]);
        assert!(!partial.success);
        assert_eq!(partial.message, "1 of 2 combination(s) failed");
    }
}
