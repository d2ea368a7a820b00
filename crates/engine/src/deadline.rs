//! Timeout wrapper for collaborator calls.

use coupon_core::{CouponError, CouponResult};
use std::future::Future;
use std::time::Duration;

/// Run a fallible collaborator call, failing with `CouponError::Timeout`
/// when it does not finish within `timeout`.
pub async fn bounded<T, F>(operation: &str, timeout: Duration, fut: F) -> CouponResult<T>
where
    F: Future<Output = CouponResult<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(CouponError::Timeout {
            operation: operation.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_through_result() {
        let value = bounded("fast", Duration::from_millis(100), async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_times_out() {
        let result: CouponResult<()> = bounded("slow", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;
        assert!(matches!(
            result,
            Err(CouponError::Timeout { timeout_ms: 10, .. })
        ));
    }
}
