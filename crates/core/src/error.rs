use thiserror::Error;

pub type CouponResult<T> = Result<T, CouponError>;

/// Failures surfaced to callers of the coupon engine.
///
/// Business rejections during redemption (expired, already used, order too
/// low) are *not* errors; they come back as `RejectionReason` values.
#[derive(Error, Debug)]
pub enum CouponError {
    #[error("User not found or inactive: {0}")]
    UserNotFound(String),

    #[error("No coupon rules registered for tier {tier} (user {user_id})")]
    InvalidProfile { user_id: String, tier: String },

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Notification error: {0}")]
    Notification(String),

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CouponError {
    /// Infrastructure faults can be retried independently of business state.
    pub fn is_infrastructure(&self) -> bool {
        !matches!(
            self,
            CouponError::UserNotFound(_) | CouponError::InvalidProfile { .. }
        )
    }
}

impl From<config::ConfigError> for CouponError {
    fn from(err: config::ConfigError) -> Self {
        CouponError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_is_not_infrastructure() {
        assert!(!CouponError::UserNotFound("u-1".into()).is_infrastructure());
        assert!(!CouponError::InvalidProfile {
            user_id: "u-1".into(),
            tier: "VIP".into()
        }
        .is_infrastructure());
    }

    #[test]
    fn test_faults_are_infrastructure() {
        let timeout = CouponError::Timeout {
            operation: "coupon save".into(),
            timeout_ms: 50,
        };
        assert!(timeout.is_infrastructure());
        assert_eq!(timeout.to_string(), "coupon save timed out after 50ms");
        assert!(CouponError::Repository("down".into()).is_infrastructure());
        assert!(CouponError::Notification("smtp".into()).is_infrastructure());
    }
}
