//! Collaborator ports consumed by the coupon engine.
//!
//! The engine accepts `Arc<dyn ...>` handles for persistence and
//! notification so storage backends and mail delivery stay swappable.

use crate::coupon::{Coupon, PurchaseRecord, User};
use crate::error::CouponResult;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> CouponResult<Option<User>>;
    async fn find_all(&self) -> CouponResult<Vec<User>>;
}

#[async_trait]
pub trait PurchaseRepository: Send + Sync {
    async fn find_by_user_id(&self, user_id: &str) -> CouponResult<Vec<PurchaseRecord>>;
}

#[async_trait]
pub trait CouponRepository: Send + Sync {
    /// Insert a new coupon or replace the stored one with the same id.
    async fn save(&self, coupon: &Coupon) -> CouponResult<()>;
    async fn find_by_user_id(&self, user_id: &str) -> CouponResult<Vec<Coupon>>;
    async fn find_all(&self) -> CouponResult<Vec<Coupon>>;
}

/// Outbound customer notifications. Fire-and-forget from the engine's
/// point of view: a failure here never undoes persisted state.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn send_coupon_issued(&self, email: &str, codes: &[String]) -> CouponResult<()>;
    async fn send_coupon_redeemed(&self, email: &str, code: &str) -> CouponResult<()>;
}

/// No-op notifier for deployments with notifications disabled.
pub struct NoOpNotifier;

#[async_trait]
impl NotificationPort for NoOpNotifier {
    async fn send_coupon_issued(&self, _email: &str, _codes: &[String]) -> CouponResult<()> {
        Ok(())
    }

    async fn send_coupon_redeemed(&self, _email: &str, _code: &str) -> CouponResult<()> {
        Ok(())
    }
}

/// A notification recorded by [`CaptureNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentNotification {
    CouponIssued { email: String, codes: Vec<String> },
    CouponRedeemed { email: String, code: String },
}

/// In-memory notifier that captures notifications for tests.
#[derive(Default)]
pub struct CaptureNotifier {
    sent: Mutex<Vec<SentNotification>>,
}

impl CaptureNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.sent.lock().len()
    }

    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl NotificationPort for CaptureNotifier {
    async fn send_coupon_issued(&self, email: &str, codes: &[String]) -> CouponResult<()> {
        self.sent.lock().push(SentNotification::CouponIssued {
            email: email.to_string(),
            codes: codes.to_vec(),
        });
        Ok(())
    }

    async fn send_coupon_redeemed(&self, email: &str, code: &str) -> CouponResult<()> {
        self.sent.lock().push(SentNotification::CouponRedeemed {
            email: email.to_string(),
            code: code.to_string(),
        });
        Ok(())
    }
}

/// Convenience: a notifier that drops everything.
pub fn noop_notifier() -> Arc<dyn NotificationPort> {
    Arc::new(NoOpNotifier)
}

/// Convenience: create a capture notifier for tests.
pub fn capture_notifier() -> Arc<CaptureNotifier> {
    Arc::new(CaptureNotifier::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capture_notifier() {
        let notifier = capture_notifier();
        assert_eq!(notifier.count(), 0);

        notifier
            .send_coupon_issued("a@example.com", &["CPN1".to_string(), "CPN2".to_string()])
            .await
            .unwrap();
        notifier
            .send_coupon_redeemed("a@example.com", "CPN1")
            .await
            .unwrap();

        let sent = notifier.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(
            sent[0],
            SentNotification::CouponIssued {
                email: "a@example.com".into(),
                codes: vec!["CPN1".into(), "CPN2".into()],
            }
        );

        notifier.clear();
        assert_eq!(notifier.count(), 0);
    }

    #[tokio::test]
    async fn test_noop_notifier() {
        let notifier = noop_notifier();
        assert!(notifier.send_coupon_redeemed("a@example.com", "CPN1").await.is_ok());
    }
}
