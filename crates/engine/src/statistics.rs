//! Statistics aggregator: a pure fold over the full user and coupon
//! collections. Recomputed on every call.

use crate::deadline::bounded;
use chrono::Utc;
use coupon_core::coupon::{Coupon, CouponKind, Tier, User};
use coupon_core::ports::{CouponRepository, UserRepository};
use coupon_core::statistics::*;
use coupon_core::CouponResult;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Fold users and coupons into a snapshot.
pub fn aggregate(users: &[User], coupons: &[Coupon]) -> StatisticsSnapshot {
    let mut by_tier = TierCounts::default();
    for user in users {
        match &user.tier {
            Tier::Regular => by_tier.regular += 1,
            Tier::Premium => by_tier.premium += 1,
            Tier::Vip => by_tier.vip += 1,
            Tier::Other(_) => by_tier.other += 1,
        }
    }
    let active = users.iter().filter(|u| u.is_active).count();

    let mut by_kind: BTreeMap<CouponKind, KindStatistics> = CouponKind::ALL
        .iter()
        .map(|kind| (*kind, KindStatistics::default()))
        .collect();
    for coupon in coupons {
        let entry = by_kind.entry(coupon.kind).or_default();
        entry.issued += 1;
        if coupon.is_used {
            entry.used += 1;
        }
    }
    for stats in by_kind.values_mut() {
        stats.usage_rate = percentage(stats.used, stats.issued);
    }
    let used = coupons.iter().filter(|c| c.is_used).count();

    let revenue: f64 = users.iter().map(|u| u.total_spent).sum();
    let average_per_user = if users.is_empty() {
        0.0
    } else {
        revenue / users.len() as f64
    };

    StatisticsSnapshot {
        users: UserStatistics {
            total: users.len(),
            active,
            inactive: users.len() - active,
            by_tier,
        },
        coupons: CouponStatistics {
            total: coupons.len(),
            used,
            unused: coupons.len() - used,
            usage_rate: percentage(used, coupons.len()),
            by_kind,
        },
        revenue: RevenueStatistics {
            total: round2(revenue),
            average_per_user: round2(average_per_user),
        },
        generated_at: Utc::now(),
    }
}

/// Loads both collections and folds them.
pub struct StatisticsAggregator {
    users: Arc<dyn UserRepository>,
    coupons: Arc<dyn CouponRepository>,
    io_timeout: Duration,
}

impl StatisticsAggregator {
    pub fn new(
        users: Arc<dyn UserRepository>,
        coupons: Arc<dyn CouponRepository>,
        io_timeout: Duration,
    ) -> Self {
        Self {
            users,
            coupons,
            io_timeout,
        }
    }

    pub async fn snapshot(&self) -> CouponResult<StatisticsSnapshot> {
        let users = bounded("user scan", self.io_timeout, self.users.find_all()).await?;
        let coupons = bounded("coupon scan", self.io_timeout, self.coupons.find_all()).await?;

        let snapshot = aggregate(&users, &coupons);
        debug!(
            users = snapshot.users.total,
            coupons = snapshot.coupons.total,
            used = snapshot.coupons.used,
            "Statistics computed"
        );
        Ok(snapshot)
    }
}
