//! Read-side summary of the user and coupon collections.

use crate::coupon::CouponKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    pub users: UserStatistics,
    pub coupons: CouponStatistics,
    pub revenue: RevenueStatistics,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStatistics {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub by_tier: TierCounts,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierCounts {
    pub regular: usize,
    pub premium: usize,
    pub vip: usize,
    /// Users whose tier has no standard name.
    #[serde(default)]
    pub other: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CouponStatistics {
    pub total: usize,
    pub used: usize,
    pub unused: usize,
    /// Percentage of issued coupons that were redeemed, 2 decimals.
    pub usage_rate: f64,
    pub by_kind: BTreeMap<CouponKind, KindStatistics>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct KindStatistics {
    pub issued: usize,
    pub used: usize,
    pub usage_rate: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct RevenueStatistics {
    pub total: f64,
    pub average_per_user: f64,
}

/// Percentage `part / whole`, rounded to 2 decimals; 0 when `whole` is 0.
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    round2(part as f64 / whole as f64 * 100.0)
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(2, 2), 100.0);
    }

    #[test]
    fn test_by_kind_serializes_with_wire_names() {
        let mut stats = CouponStatistics::default();
        stats.by_kind.insert(
            CouponKind::FreeShipping,
            KindStatistics {
                issued: 2,
                used: 1,
                usage_rate: 50.0,
            },
        );
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["by_kind"]["FREE_SHIPPING"]["issued"], 2);
    }
}
