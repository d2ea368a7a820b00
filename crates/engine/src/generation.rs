//! Generation engine: loads a user, derives purchase metrics, asks the tier
//! rules what the user qualifies for, materializes and persists the coupons,
//! then notifies the user once with every new code.

use crate::deadline::bounded;
use crate::factory::CouponFactory;
use crate::rules::TierRuleSet;
use chrono::Utc;
use coupon_core::coupon::{Coupon, DerivedMetrics, User};
use coupon_core::ports::{CouponRepository, NotificationPort, PurchaseRepository, UserRepository};
use coupon_core::{CouponError, CouponResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub struct GenerationEngine {
    users: Arc<dyn UserRepository>,
    purchases: Arc<dyn PurchaseRepository>,
    coupons: Arc<dyn CouponRepository>,
    notifier: Arc<dyn NotificationPort>,
    rules: TierRuleSet,
    factory: CouponFactory,
    io_timeout: Duration,
    notify_timeout: Duration,
}

impl GenerationEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserRepository>,
        purchases: Arc<dyn PurchaseRepository>,
        coupons: Arc<dyn CouponRepository>,
        notifier: Arc<dyn NotificationPort>,
        rules: TierRuleSet,
        factory: CouponFactory,
        io_timeout: Duration,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            users,
            purchases,
            coupons,
            notifier,
            rules,
            factory,
            io_timeout,
            notify_timeout,
        }
    }

    /// Issue every coupon the user currently qualifies for.
    ///
    /// Inactive users are reported exactly like missing ones. Nothing is
    /// written unless the user resolves and their tier has rules.
    pub async fn generate_for_user(&self, user_id: &str) -> CouponResult<Vec<Coupon>> {
        metrics::counter!("coupons.generation_requests").increment(1);

        let user = self.load_active_user(user_id).await?;

        let history = bounded(
            "purchase lookup",
            self.io_timeout,
            self.purchases.find_by_user_id(user_id),
        )
        .await?;
        let derived = DerivedMetrics::compute(&user, &history, Utc::now());

        debug!(
            user_id = %user_id,
            tier = %user.tier,
            purchases = derived.purchase_count,
            spent = derived.total_spent,
            days_since_last_purchase = derived.days_since_last_purchase,
            "Derived purchase metrics"
        );

        let requests = self.rules.evaluate(&user, &derived)?;
        let issued = self.factory.create_batch(&user.id, &requests);

        if issued.is_empty() {
            info!(user_id = %user_id, tier = %user.tier, "No coupons qualified");
            return Ok(issued);
        }

        for coupon in &issued {
            bounded("coupon save", self.io_timeout, self.coupons.save(coupon)).await?;
        }

        metrics::counter!("coupons.generated", "tier" => user.tier.to_string())
            .increment(issued.len() as u64);

        self.notify_issued(&user, &issued).await;

        info!(
            user_id = %user_id,
            tier = %user.tier,
            count = issued.len(),
            "Coupons generated"
        );

        Ok(issued)
    }

    async fn load_active_user(&self, user_id: &str) -> CouponResult<User> {
        let user = bounded("user lookup", self.io_timeout, self.users.find_by_id(user_id)).await?;
        match user {
            Some(user) if user.is_active => Ok(user),
            _ => {
                warn!(user_id = %user_id, "User not found or inactive");
                Err(CouponError::UserNotFound(user_id.to_string()))
            }
        }
    }

    async fn notify_issued(&self, user: &User, issued: &[Coupon]) {
        let codes: Vec<String> = issued.iter().map(|c| c.code.clone()).collect();
        let result = bounded(
            "coupon issued notification",
            self.notify_timeout,
            self.notifier.send_coupon_issued(&user.email, &codes),
        )
        .await;

        if let Err(e) = result {
            metrics::counter!("coupons.notification_failures", "template" => "coupon_issued")
                .increment(1);
            warn!(user_id = %user.id, error = %e, "Coupon issued notification failed");
        }
    }
}
