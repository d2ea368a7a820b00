//! Redemption engine: validates a submitted code against the stored coupon
//! and an order amount, then applies the one-way UNUSED → USED transition.
//!
//! The read-check-write sequence runs under a per-coupon async lock so two
//! concurrent attempts on the same code cannot both succeed.

use crate::deadline::bounded;
use chrono::Utc;
use coupon_core::coupon::{RedeemCouponRequest, RedeemCouponResponse, RejectionReason};
use coupon_core::ports::{CouponRepository, NotificationPort, UserRepository};
use coupon_core::CouponResult;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub struct RedemptionEngine {
    users: Arc<dyn UserRepository>,
    coupons: Arc<dyn CouponRepository>,
    notifier: Arc<dyn NotificationPort>,
    /// One lock per `(user_id, code)` with a redemption in flight.
    locks: DashMap<(String, String), Arc<Mutex<()>>>,
    io_timeout: Duration,
    notify_timeout: Duration,
}

impl RedemptionEngine {
    pub fn new(
        users: Arc<dyn UserRepository>,
        coupons: Arc<dyn CouponRepository>,
        notifier: Arc<dyn NotificationPort>,
        io_timeout: Duration,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            users,
            coupons,
            notifier,
            locks: DashMap::new(),
            io_timeout,
            notify_timeout,
        }
    }

    /// Redeem a coupon. Business rejections come back as a response with
    /// `success == false`; only infrastructure faults are errors.
    pub async fn redeem(&self, request: &RedeemCouponRequest) -> CouponResult<RedeemCouponResponse> {
        let key = (request.user_id.clone(), request.code.clone());
        let lock = self
            .locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = {
            let _guard = lock.lock().await;
            self.redeem_locked(request).await
        };

        drop(lock);
        self.locks.remove_if(&key, |_, l| Arc::strong_count(l) == 1);

        let response = result?;
        if response.success {
            self.notify_redeemed(request).await;
        }
        Ok(response)
    }

    async fn redeem_locked(&self, request: &RedeemCouponRequest) -> CouponResult<RedeemCouponResponse> {
        let owned = bounded(
            "coupon lookup",
            self.io_timeout,
            self.coupons.find_by_user_id(&request.user_id),
        )
        .await?;

        let Some(mut coupon) = owned.into_iter().find(|c| c.code == request.code) else {
            return Ok(self.reject(request, RejectionReason::NotFound));
        };

        if let Err(reason) = coupon.redeem(request.order_amount, Utc::now()) {
            return Ok(self.reject(request, reason));
        }

        bounded("coupon save", self.io_timeout, self.coupons.save(&coupon)).await?;

        metrics::counter!("coupons.redeemed", "kind" => coupon.kind.as_str()).increment(1);
        info!(
            user_id = %request.user_id,
            code = %request.code,
            order_amount = request.order_amount,
            kind = %coupon.kind,
            "Coupon redeemed"
        );

        Ok(RedeemCouponResponse::redeemed(request, coupon))
    }

    fn reject(&self, request: &RedeemCouponRequest, reason: RejectionReason) -> RedeemCouponResponse {
        metrics::counter!("coupons.rejected", "reason" => reason.as_str()).increment(1);
        warn!(
            user_id = %request.user_id,
            code = %request.code,
            order_amount = request.order_amount,
            reason = reason.as_str(),
            "Coupon redemption rejected"
        );
        RedeemCouponResponse::rejected(request, reason)
    }

    async fn notify_redeemed(&self, request: &RedeemCouponRequest) {
        let owner = match bounded(
            "user lookup",
            self.io_timeout,
            self.users.find_by_id(&request.user_id),
        )
        .await
        {
            Ok(Some(user)) => user,
            Ok(None) => return,
            Err(e) => {
                warn!(user_id = %request.user_id, error = %e, "Owner lookup for redemption notice failed");
                return;
            }
        };

        let result = bounded(
            "coupon redeemed notification",
            self.notify_timeout,
            self.notifier.send_coupon_redeemed(&owner.email, &request.code),
        )
        .await;

        if let Err(e) = result {
            metrics::counter!("coupons.notification_failures", "template" => "coupon_redeemed")
                .increment(1);
            warn!(user_id = %request.user_id, code = %request.code, error = %e, "Coupon redeemed notification failed");
        }
    }

    /// Number of coupons with a redemption currently holding a lock.
    pub fn in_flight(&self) -> usize {
        self.locks.len()
    }
}
