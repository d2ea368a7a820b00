//! `CouponService`: composes the generation, redemption and statistics
//! engines over one set of collaborators. This is the surface a request
//! handling layer talks to.

use crate::deadline::bounded;
use crate::factory::CouponFactory;
use crate::generation::GenerationEngine;
use crate::redemption::RedemptionEngine;
use crate::rules::TierRuleSet;
use crate::statistics::StatisticsAggregator;
use coupon_core::config::AppConfig;
use coupon_core::coupon::{Coupon, RedeemCouponRequest, RedeemCouponResponse};
use coupon_core::ports::{CouponRepository, NotificationPort, PurchaseRepository, UserRepository};
use coupon_core::statistics::StatisticsSnapshot;
use coupon_core::CouponResult;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Persistence handles the service runs against.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub purchases: Arc<dyn PurchaseRepository>,
    pub coupons: Arc<dyn CouponRepository>,
}

impl Repositories {
    /// Use one backend for all three collections.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository + PurchaseRepository + CouponRepository + 'static,
    {
        Self {
            users: store.clone(),
            purchases: store.clone(),
            coupons: store,
        }
    }
}

pub struct CouponService {
    generation: GenerationEngine,
    redemption: RedemptionEngine,
    statistics: StatisticsAggregator,
    coupons: Arc<dyn CouponRepository>,
    io_timeout: Duration,
}

impl CouponService {
    pub fn new(config: &AppConfig, repos: Repositories, notifier: Arc<dyn NotificationPort>) -> Self {
        Self::with_rules(config, repos, notifier, TierRuleSet::standard(&config.coupons))
    }

    pub fn with_rules(
        config: &AppConfig,
        repos: Repositories,
        notifier: Arc<dyn NotificationPort>,
        rules: TierRuleSet,
    ) -> Self {
        let io_timeout = Duration::from_millis(config.store.io_timeout_ms);
        let notify_timeout = Duration::from_millis(config.notifications.timeout_ms);

        info!(
            validity_days = config.coupons.validity_days,
            vip_region = %config.coupons.vip_region,
            io_timeout_ms = config.store.io_timeout_ms,
            "Coupon service initialized"
        );

        Self {
            generation: GenerationEngine::new(
                repos.users.clone(),
                repos.purchases.clone(),
                repos.coupons.clone(),
                notifier.clone(),
                rules,
                CouponFactory::new(&config.coupons),
                io_timeout,
                notify_timeout,
            ),
            redemption: RedemptionEngine::new(
                repos.users.clone(),
                repos.coupons.clone(),
                notifier,
                io_timeout,
                notify_timeout,
            ),
            statistics: StatisticsAggregator::new(repos.users, repos.coupons.clone(), io_timeout),
            coupons: repos.coupons,
            io_timeout,
        }
    }

    pub async fn generate_coupons_for_user(&self, user_id: &str) -> CouponResult<Vec<Coupon>> {
        self.generation.generate_for_user(user_id).await
    }

    /// Redeem and report only whether the coupon was consumed.
    pub async fn redeem_coupon(&self, code: &str, user_id: &str, order_amount: f64) -> CouponResult<bool> {
        let request = RedeemCouponRequest {
            code: code.to_string(),
            user_id: user_id.to_string(),
            order_amount,
        };
        Ok(self.redemption.redeem(&request).await?.success)
    }

    /// Redeem with the full outcome, including the rejection reason.
    pub async fn redeem(&self, request: &RedeemCouponRequest) -> CouponResult<RedeemCouponResponse> {
        self.redemption.redeem(request).await
    }

    pub async fn get_statistics(&self) -> CouponResult<StatisticsSnapshot> {
        self.statistics.snapshot().await
    }

    pub async fn coupons_for_user(&self, user_id: &str) -> CouponResult<Vec<Coupon>> {
        bounded("coupon lookup", self.io_timeout, self.coupons.find_by_user_id(user_id)).await
    }
}
