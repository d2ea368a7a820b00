//! End-to-end coupon flows through `CouponService` over both store backends.

#![allow(clippy::unwrap_used)]

use coupon_core::config::AppConfig;
use coupon_core::coupon::{CouponKind, RedeemCouponRequest, RejectionReason};
use coupon_core::ports::{capture_notifier, CaptureNotifier, SentNotification};
use coupon_core::CouponError;
use coupon_engine::{CouponService, Repositories};
use coupon_store::{demo_purchases, demo_users, JsonFileStore, MemoryStore};
use std::collections::HashSet;
use std::sync::Arc;

fn memory_service() -> (CouponService, Arc<CaptureNotifier>) {
    let notifier = capture_notifier();
    let repos = Repositories::from_store(Arc::new(MemoryStore::with_demo_data()));
    let service = CouponService::new(&AppConfig::default(), repos, notifier.clone());
    (service, notifier)
}

async fn json_service(dir: &std::path::Path) -> (CouponService, Arc<CaptureNotifier>) {
    let store = JsonFileStore::open(dir).await.unwrap();
    store.seed(&demo_users(), &demo_purchases()).await.unwrap();
    let notifier = capture_notifier();
    let service = CouponService::new(
        &AppConfig::default(),
        Repositories::from_store(Arc::new(store)),
        notifier.clone(),
    );
    (service, notifier)
}

fn kinds(coupons: &[coupon_core::coupon::Coupon]) -> Vec<CouponKind> {
    coupons.iter().map(|c| c.kind).collect()
}

#[tokio::test]
async fn test_demo_users_receive_tier_coupons() {
    let (service, notifier) = memory_service();

    let regular = service.generate_coupons_for_user("1").await.unwrap();
    assert_eq!(
        kinds(&regular),
        vec![
            CouponKind::Percentage,
            CouponKind::FixedAmount,
            CouponKind::FreeShipping
        ]
    );

    let premium = service.generate_coupons_for_user("2").await.unwrap();
    assert_eq!(premium.len(), 5);
    assert_eq!(
        premium[4].applicable_categories,
        Some(vec!["ELECTRONICS".to_string()])
    );

    let vip = service.generate_coupons_for_user("3").await.unwrap();
    assert_eq!(vip.len(), 7);

    assert_eq!(notifier.count(), 3);
}

#[tokio::test]
async fn test_issued_coupons_are_well_formed() {
    let (service, _notifier) = memory_service();
    let coupons = service.generate_coupons_for_user("3").await.unwrap();

    let codes: HashSet<&str> = coupons.iter().map(|c| c.code.as_str()).collect();
    assert_eq!(codes.len(), coupons.len());

    for coupon in &coupons {
        assert!(coupon.code.starts_with("CPN"));
        assert_eq!(coupon.code.len(), 11);
        assert!(coupon.code[3..]
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        assert_eq!(coupon.user_id, "3");
        assert!(!coupon.is_used);
        assert_eq!(coupon.current_usage, 0);
        assert_eq!(coupon.usage_limit, 1);
        assert_eq!(
            (coupon.valid_until - coupon.valid_from).num_days(),
            30
        );
    }
}

#[tokio::test]
async fn test_inactive_and_unknown_users_rejected() {
    let (service, notifier) = memory_service();

    for id in ["4", "999"] {
        let err = service.generate_coupons_for_user(id).await.unwrap_err();
        assert!(matches!(err, CouponError::UserNotFound(_)));
        assert!(!err.is_infrastructure());
    }
    assert_eq!(notifier.count(), 0);
    assert_eq!(service.get_statistics().await.unwrap().coupons.total, 0);
}

#[tokio::test]
async fn test_redeem_lifecycle() {
    let (service, notifier) = memory_service();
    let coupons = service.generate_coupons_for_user("2").await.unwrap();
    notifier.clear();

    // 15% off, minimum order 100
    let code = coupons[0].code.clone();

    assert!(!service.redeem_coupon(&code, "2", 99.99).await.unwrap());
    assert!(!service.redeem_coupon(&code, "1", 150.0).await.unwrap());
    assert!(service.redeem_coupon(&code, "2", 100.0).await.unwrap());

    let again = service
        .redeem(&RedeemCouponRequest {
            code: code.clone(),
            user_id: "2".into(),
            order_amount: 500.0,
        })
        .await
        .unwrap();
    assert!(!again.success);
    assert_eq!(again.rejection, Some(RejectionReason::AlreadyUsed));

    assert_eq!(
        notifier.sent(),
        vec![SentNotification::CouponRedeemed {
            email: "jane.smith@email.com".into(),
            code: code.clone(),
        }]
    );

    let stored = service.coupons_for_user("2").await.unwrap();
    let redeemed = stored.iter().find(|c| c.code == code).unwrap();
    assert!(redeemed.is_used);
    assert_eq!(redeemed.current_usage, 1);
    assert_eq!(stored.iter().filter(|c| c.is_used).count(), 1);
}

#[tokio::test]
async fn test_free_shipping_redeems_with_any_order() {
    let (service, _notifier) = memory_service();
    let coupons = service.generate_coupons_for_user("1").await.unwrap();
    let free_shipping = coupons
        .iter()
        .find(|c| c.kind == CouponKind::FreeShipping)
        .unwrap();

    assert!(service
        .redeem_coupon(&free_shipping.code, "1", 0.0)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_statistics_after_activity() {
    let (service, _notifier) = memory_service();
    for id in ["1", "2", "3"] {
        service.generate_coupons_for_user(id).await.unwrap();
    }
    let vip = service.coupons_for_user("3").await.unwrap();
    let free_shipping = vip
        .iter()
        .find(|c| c.kind == CouponKind::FreeShipping)
        .unwrap();
    assert!(service
        .redeem_coupon(&free_shipping.code, "3", 10.0)
        .await
        .unwrap());

    let stats = service.get_statistics().await.unwrap();
    assert_eq!(stats.users.total, 4);
    assert_eq!(stats.users.active, 3);
    assert_eq!(stats.users.inactive, 1);
    assert_eq!(stats.users.by_tier.regular, 2);
    assert_eq!(stats.users.by_tier.premium, 1);
    assert_eq!(stats.users.by_tier.vip, 1);

    assert_eq!(stats.coupons.total, 15);
    assert_eq!(stats.coupons.used, 1);
    assert_eq!(stats.coupons.unused, 14);
    assert_eq!(stats.coupons.usage_rate, 6.67);

    let by_free_shipping = stats.coupons.by_kind[&CouponKind::FreeShipping];
    assert_eq!(by_free_shipping.issued, 3);
    assert_eq!(by_free_shipping.used, 1);
    assert_eq!(by_free_shipping.usage_rate, 33.33);
    assert_eq!(stats.coupons.by_kind[&CouponKind::BuyOneGetOne].issued, 1);

    assert_eq!(stats.revenue.total, 6470.0);
    assert_eq!(stats.revenue.average_per_user, 1617.5);
}

#[tokio::test]
async fn test_json_store_flow_persists_across_services() {
    let dir = tempfile::tempdir().unwrap();
    let code = {
        let (service, notifier) = json_service(dir.path()).await;
        let coupons = service.generate_coupons_for_user("3").await.unwrap();
        assert_eq!(coupons.len(), 7);
        assert_eq!(notifier.count(), 1);
        coupons[2].code.clone()
    };

    let store = JsonFileStore::open(dir.path()).await.unwrap();
    let service = CouponService::new(
        &AppConfig::default(),
        Repositories::from_store(Arc::new(store)),
        capture_notifier(),
    );

    assert!(service.redeem_coupon(&code, "3", 1.0).await.unwrap());
    assert!(!service.redeem_coupon(&code, "3", 1.0).await.unwrap());

    let stats = service.get_statistics().await.unwrap();
    assert_eq!(stats.coupons.total, 7);
    assert_eq!(stats.coupons.used, 1);
}

#[tokio::test]
async fn test_unrecognized_tier_rejects_only_that_user() {
    let dir = tempfile::tempdir().unwrap();
    let (service, notifier) = json_service(dir.path()).await;

    let path = dir.path().join("users.json");
    let raw = std::fs::read_to_string(&path).unwrap();
    std::fs::write(&path, raw.replacen("\"REGULAR\"", "\"GOLD\"", 1)).unwrap();

    let err = service.generate_coupons_for_user("1").await.unwrap_err();
    assert!(matches!(
        err,
        CouponError::InvalidProfile { ref user_id, ref tier } if user_id == "1" && tier == "GOLD"
    ));
    assert!(!err.is_infrastructure());
    assert!(service.coupons_for_user("1").await.unwrap().is_empty());
    assert_eq!(notifier.count(), 0);

    assert_eq!(service.generate_coupons_for_user("3").await.unwrap().len(), 7);

    let stats = service.get_statistics().await.unwrap();
    assert_eq!(stats.users.total, 4);
    assert_eq!(stats.users.by_tier.other, 1);
    assert_eq!(stats.users.by_tier.regular, 1);
    assert_eq!(stats.coupons.total, 7);
}

#[tokio::test]
async fn test_nan_order_amount_does_not_consume_coupon() {
    let (service, _notifier) = memory_service();
    let coupons = service.generate_coupons_for_user("3").await.unwrap();
    // FIXED_AMOUNT 100, minimum order 500
    let code = coupons[1].code.clone();

    let response = service
        .redeem(&RedeemCouponRequest {
            code: code.clone(),
            user_id: "3".into(),
            order_amount: f64::NAN,
        })
        .await
        .unwrap();
    assert!(!response.success);
    assert_eq!(response.rejection, Some(RejectionReason::InvalidOrderAmount));

    assert!(service.redeem_coupon(&code, "3", 500.0).await.unwrap());
}

#[tokio::test]
async fn test_concurrent_redemptions_over_json_store() {
    let dir = tempfile::tempdir().unwrap();
    let (service, _notifier) = json_service(dir.path()).await;
    let service = Arc::new(service);
    let coupons = service.generate_coupons_for_user("1").await.unwrap();
    let code = coupons
        .iter()
        .find(|c| c.kind == CouponKind::FreeShipping)
        .unwrap()
        .code
        .clone();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let service = service.clone();
        let code = code.clone();
        handles.push(tokio::spawn(async move {
            service.redeem_coupon(&code, "1", 20.0).await.unwrap()
        }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);
}
