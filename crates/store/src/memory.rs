//! In-memory coupon store backed by DashMap.
//!
//! Serves development, tests and the `memory` backend; same repository
//! surface as the JSON file store.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use coupon_core::coupon::{Coupon, PurchaseRecord, Tier, User};
use coupon_core::ports::{CouponRepository, PurchaseRepository, UserRepository};
use coupon_core::CouponResult;
use dashmap::DashMap;
use tracing::info;

/// Thread-safe in-memory store for users, purchase history and coupons.
#[derive(Default)]
pub struct MemoryStore {
    users: DashMap<String, User>,
    purchases: DashMap<String, Vec<PurchaseRecord>>,
    /// Coupons grouped by owner, in issuance order.
    coupons: DashMap<String, Vec<Coupon>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-loaded with [`demo_users`] and [`demo_purchases`].
    pub fn with_demo_data() -> Self {
        let store = Self::new();
        for user in demo_users() {
            store.insert_user(user);
        }
        for purchase in demo_purchases() {
            store.record_purchase(purchase);
        }
        info!(users = store.users.len(), "Memory store seeded with demo data");
        store
    }

    pub fn insert_user(&self, user: User) {
        self.users.insert(user.id.clone(), user);
    }

    pub fn record_purchase(&self, purchase: PurchaseRecord) {
        self.purchases
            .entry(purchase.user_id.clone())
            .or_default()
            .push(purchase);
    }

    /// Insert or replace a coupon by id, keeping issuance order.
    pub fn insert_coupon(&self, coupon: Coupon) {
        let mut owned = self.coupons.entry(coupon.user_id.clone()).or_default();
        match owned.iter().position(|c| c.id == coupon.id) {
            Some(idx) => owned[idx] = coupon,
            None => owned.push(coupon),
        }
    }

    pub fn coupons_for(&self, user_id: &str) -> Vec<Coupon> {
        self.coupons
            .get(user_id)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn coupon_count(&self) -> usize {
        self.coupons.iter().map(|r| r.value().len()).sum()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn find_by_id(&self, id: &str) -> CouponResult<Option<User>> {
        Ok(self.users.get(id).map(|r| r.value().clone()))
    }

    async fn find_all(&self) -> CouponResult<Vec<User>> {
        let mut users: Vec<User> = self.users.iter().map(|r| r.value().clone()).collect();
        users.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(users)
    }
}

#[async_trait]
impl PurchaseRepository for MemoryStore {
    async fn find_by_user_id(&self, user_id: &str) -> CouponResult<Vec<PurchaseRecord>> {
        Ok(self
            .purchases
            .get(user_id)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }
}

#[async_trait]
impl CouponRepository for MemoryStore {
    async fn save(&self, coupon: &Coupon) -> CouponResult<()> {
        self.insert_coupon(coupon.clone());
        Ok(())
    }

    async fn find_by_user_id(&self, user_id: &str) -> CouponResult<Vec<Coupon>> {
        Ok(self.coupons_for(user_id))
    }

    async fn find_all(&self) -> CouponResult<Vec<Coupon>> {
        let mut all: Vec<Coupon> = self
            .coupons
            .iter()
            .flat_map(|r| r.value().clone())
            .collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }
}

// ─── Demo Data ──────────────────────────────────────────────────────────────

/// One customer per tier plus a lapsed, inactive account.
pub fn demo_users() -> Vec<User> {
    let now = Utc::now();

    let mut regular = User::new("1", "john.doe@email.com", Tier::Regular);
    regular.first_name = "John".into();
    regular.last_name = "Doe".into();
    regular.total_purchases = 5;
    regular.total_spent = 250.0;
    regular.last_purchase_date = Some(now - Duration::days(45));
    regular.favorite_categories.insert("BOOKS".into());
    regular.age = Some(28);
    regular.location = Some("Paris".into());

    let mut premium = User::new("2", "jane.smith@email.com", Tier::Premium);
    premium.first_name = "Jane".into();
    premium.last_name = "Smith".into();
    premium.total_purchases = 15;
    premium.total_spent = 1200.0;
    premium.last_purchase_date = Some(now - Duration::days(10));
    premium.favorite_categories.insert("ELECTRONICS".into());
    premium.favorite_categories.insert("FASHION".into());
    premium.age = Some(35);
    premium.location = Some("Lyon".into());

    let mut vip = User::new("3", "vip.customer@email.com", Tier::Vip);
    vip.first_name = "VIP".into();
    vip.last_name = "Customer".into();
    vip.total_purchases = 50;
    vip.total_spent = 5000.0;
    vip.last_purchase_date = Some(now - Duration::days(2));
    vip.favorite_categories.insert("LUXURY".into());
    vip.age = Some(45);
    vip.location = Some("Nice".into());

    let mut inactive = User::new("4", "former.customer@email.com", Tier::Regular);
    inactive.first_name = "Former".into();
    inactive.last_name = "Customer".into();
    inactive.is_active = false;
    inactive.total_purchases = 1;
    inactive.total_spent = 20.0;

    vec![regular, premium, vip, inactive]
}

pub fn demo_purchases() -> Vec<PurchaseRecord> {
    let now = Utc::now();
    let purchase = |user_id: &str, amount: f64, days_ago: i64, category: &str| PurchaseRecord {
        user_id: user_id.to_string(),
        amount,
        date: now - Duration::days(days_ago),
        category: Some(category.to_string()),
    };

    vec![
        purchase("1", 50.0, 120, "BOOKS"),
        purchase("1", 45.0, 90, "BOOKS"),
        purchase("1", 30.0, 45, "HOME"),
        purchase("2", 300.0, 60, "ELECTRONICS"),
        purchase("2", 250.0, 10, "FASHION"),
        purchase("3", 1500.0, 30, "LUXURY"),
        purchase("3", 900.0, 2, "LUXURY"),
    ]
}
