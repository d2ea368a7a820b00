//! Coupon program domain types: loyalty tiers, users and their purchase
//! history, issued coupons and the one-way redemption transition.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use uuid::Uuid;

/// Reported as `days_since_last_purchase` when a user has never purchased.
pub const NO_PURCHASE_SENTINEL_DAYS: i64 = 999;

/// Category tag that unlocks the PREMIUM electronics coupon.
pub const ELECTRONICS_CATEGORY: &str = "ELECTRONICS";

// ─── Tier System ────────────────────────────────────────────────────────────

/// Loyalty classification assigned upstream; drives which coupon rules apply.
///
/// Names outside the standard three deserialize to `Other` and are written
/// back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tier {
    Regular,
    Premium,
    Vip,
    Other(String),
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Regular, Tier::Premium, Tier::Vip];

    pub fn as_str(&self) -> &str {
        match self {
            Tier::Regular => "REGULAR",
            Tier::Premium => "PREMIUM",
            Tier::Vip => "VIP",
            Tier::Other(name) => name,
        }
    }
}

impl From<String> for Tier {
    fn from(name: String) -> Self {
        match name.as_str() {
            "REGULAR" => Tier::Regular,
            "PREMIUM" => Tier::Premium,
            "VIP" => Tier::Vip,
            _ => Tier::Other(name),
        }
    }
}

impl From<Tier> for String {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Other(name) => name,
            standard => standard.as_str().to_string(),
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Users & Purchases ──────────────────────────────────────────────────────

/// Customer snapshot as owned by the user repository. The engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub tier: Tier,
    pub is_active: bool,
    #[serde(default)]
    pub total_purchases: u32,
    #[serde(default)]
    pub total_spent: f64,
    #[serde(default)]
    pub last_purchase_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub favorite_categories: BTreeSet<String>,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub location: Option<String>,
}

impl User {
    pub fn new(id: impl Into<String>, email: impl Into<String>, tier: Tier) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
            tier,
            is_active: true,
            total_purchases: 0,
            total_spent: 0.0,
            last_purchase_date: None,
            favorite_categories: BTreeSet::new(),
            age: None,
            location: None,
        }
    }

    pub fn likes(&self, category: &str) -> bool {
        self.favorite_categories.contains(category)
    }
}

/// One historical order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseRecord {
    pub user_id: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub category: Option<String>,
}

/// Purchase-history figures recomputed on every generation call.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct DerivedMetrics {
    pub purchase_count: usize,
    pub total_spent: f64,
    pub average_order_value: f64,
    pub days_since_last_purchase: i64,
}

impl DerivedMetrics {
    /// Fold a user's purchase history. Recency comes from the user's own
    /// `last_purchase_date`, then the newest record, then the sentinel.
    pub fn compute(user: &User, purchases: &[PurchaseRecord], now: DateTime<Utc>) -> Self {
        let total_spent: f64 = purchases.iter().map(|p| p.amount).sum();
        let average_order_value = if purchases.is_empty() {
            0.0
        } else {
            total_spent / purchases.len() as f64
        };

        let last_purchase = user
            .last_purchase_date
            .or_else(|| purchases.iter().map(|p| p.date).max());
        let days_since_last_purchase = last_purchase
            .map(|date| (now - date).num_days())
            .unwrap_or(NO_PURCHASE_SENTINEL_DAYS);

        Self {
            purchase_count: purchases.len(),
            total_spent,
            average_order_value,
            days_since_last_purchase,
        }
    }
}

// ─── Coupons ────────────────────────────────────────────────────────────────

/// Discount mechanism carried by a coupon.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponKind {
    Percentage,
    FixedAmount,
    FreeShipping,
    BuyOneGetOne,
}

impl CouponKind {
    pub const ALL: [CouponKind; 4] = [
        CouponKind::Percentage,
        CouponKind::FixedAmount,
        CouponKind::FreeShipping,
        CouponKind::BuyOneGetOne,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CouponKind::Percentage => "PERCENTAGE",
            CouponKind::FixedAmount => "FIXED_AMOUNT",
            CouponKind::FreeShipping => "FREE_SHIPPING",
            CouponKind::BuyOneGetOne => "BUY_ONE_GET_ONE",
        }
    }

    /// Whether `value` carries a discount magnitude for this kind.
    pub fn has_scalar_value(&self) -> bool {
        matches!(self, CouponKind::Percentage | CouponKind::FixedAmount)
    }
}

impl fmt::Display for CouponKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a tier rule grants: the shape of a coupon before it has a code,
/// an id or a validity window.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CouponRequest {
    pub kind: CouponKind,
    pub value: f64,
    pub min_order_amount: f64,
    pub applicable_categories: Option<Vec<String>>,
}

impl CouponRequest {
    pub fn percentage(percent: f64) -> Self {
        Self::new(CouponKind::Percentage, percent)
    }

    pub fn fixed_amount(amount: f64) -> Self {
        Self::new(CouponKind::FixedAmount, amount)
    }

    pub fn free_shipping() -> Self {
        Self::new(CouponKind::FreeShipping, 0.0)
    }

    pub fn buy_one_get_one() -> Self {
        Self::new(CouponKind::BuyOneGetOne, 0.0)
    }

    fn new(kind: CouponKind, value: f64) -> Self {
        Self {
            kind,
            value,
            min_order_amount: 0.0,
            applicable_categories: None,
        }
    }

    pub fn min_order(mut self, amount: f64) -> Self {
        self.min_order_amount = amount;
        self
    }

    pub fn restricted_to(mut self, category: impl Into<String>) -> Self {
        self.applicable_categories
            .get_or_insert_with(Vec::new)
            .push(category.into());
        self
    }
}

/// Lifecycle state of a coupon. `Used` is terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CouponStatus {
    Unused,
    Used,
}

/// Why a redemption attempt was turned down. A business outcome, not an error.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum RejectionReason {
    NotFound,
    AlreadyUsed,
    Expired,
    OrderBelowMinimum { required: f64, actual: f64 },
    /// Order amount is NaN, infinite or negative.
    InvalidOrderAmount,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::NotFound => "not_found",
            RejectionReason::AlreadyUsed => "already_used",
            RejectionReason::Expired => "expired",
            RejectionReason::OrderBelowMinimum { .. } => "order_below_minimum",
            RejectionReason::InvalidOrderAmount => "invalid_order_amount",
        }
    }
}

/// An issued discount instrument owned by exactly one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    pub kind: CouponKind,
    pub value: f64,
    #[serde(default)]
    pub min_order_amount: f64,
    #[serde(default)]
    pub applicable_categories: Option<Vec<String>>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub user_id: String,
    pub is_used: bool,
    pub usage_limit: u32,
    pub current_usage: u32,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    pub fn status(&self) -> CouponStatus {
        if self.is_used {
            CouponStatus::Used
        } else {
            CouponStatus::Unused
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.valid_until
    }

    /// Check the coupon against an order and, if it passes, apply the
    /// UNUSED → USED transition. Leaves the coupon untouched on rejection.
    pub fn redeem(&mut self, order_amount: f64, now: DateTime<Utc>) -> Result<(), RejectionReason> {
        if self.is_used {
            return Err(RejectionReason::AlreadyUsed);
        }
        if self.is_expired_at(now) {
            return Err(RejectionReason::Expired);
        }
        if !order_amount.is_finite() || order_amount < 0.0 {
            return Err(RejectionReason::InvalidOrderAmount);
        }
        if self.min_order_amount > 0.0 && order_amount < self.min_order_amount {
            return Err(RejectionReason::OrderBelowMinimum {
                required: self.min_order_amount,
                actual: order_amount,
            });
        }

        self.is_used = true;
        self.current_usage += 1;
        Ok(())
    }
}

// ─── Redemption ─────────────────────────────────────────────────────────────

/// Request to apply a coupon to an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemCouponRequest {
    pub code: String,
    pub user_id: String,
    pub order_amount: f64,
}

/// Result of a redemption attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedeemCouponResponse {
    pub code: String,
    pub user_id: String,
    pub success: bool,
    pub rejection: Option<RejectionReason>,
    /// The coupon after the transition, when redemption succeeded.
    pub coupon: Option<Coupon>,
}

impl RedeemCouponResponse {
    pub fn redeemed(request: &RedeemCouponRequest, coupon: Coupon) -> Self {
        Self {
            code: request.code.clone(),
            user_id: request.user_id.clone(),
            success: true,
            rejection: None,
            coupon: Some(coupon),
        }
    }

    pub fn rejected(request: &RedeemCouponRequest, reason: RejectionReason) -> Self {
        Self {
            code: request.code.clone(),
            user_id: request.user_id.clone(),
            success: false,
            rejection: Some(reason),
            coupon: None,
        }
    }
}
