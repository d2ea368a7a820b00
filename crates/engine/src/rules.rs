//! Tier rule set: per-tier eligibility rules mapping a user snapshot and
//! derived purchase metrics to an ordered list of coupon requests.
//!
//! Conditions inside a tier are independent; a user collects every coupon
//! whose condition holds, in the order the rules are listed.

use coupon_core::config::CouponConfig;
use coupon_core::coupon::{CouponRequest, DerivedMetrics, Tier, User, ELECTRONICS_CATEGORY};
use coupon_core::{CouponError, CouponResult};
use std::collections::HashMap;

/// Coupon rules for one loyalty tier.
pub trait TierRules: Send + Sync {
    fn tier(&self) -> Tier;
    fn evaluate(&self, user: &User, metrics: &DerivedMetrics) -> Vec<CouponRequest>;
}

// ─── REGULAR ────────────────────────────────────────────────────────────────

pub struct RegularRules;

impl TierRules for RegularRules {
    fn tier(&self) -> Tier {
        Tier::Regular
    }

    fn evaluate(&self, user: &User, metrics: &DerivedMetrics) -> Vec<CouponRequest> {
        let mut requests = Vec::new();

        if user.total_purchases >= 3 {
            requests.push(CouponRequest::percentage(10.0).min_order(50.0));
        }
        if metrics.total_spent > 100.0 {
            requests.push(CouponRequest::fixed_amount(15.0).min_order(100.0));
        }
        // Win-back for lapsed customers
        if metrics.days_since_last_purchase > 30 {
            requests.push(CouponRequest::free_shipping());
        }

        requests
    }
}

// ─── PREMIUM ────────────────────────────────────────────────────────────────

pub struct PremiumRules;

impl TierRules for PremiumRules {
    fn tier(&self) -> Tier {
        Tier::Premium
    }

    fn evaluate(&self, user: &User, metrics: &DerivedMetrics) -> Vec<CouponRequest> {
        let mut requests = vec![CouponRequest::percentage(15.0).min_order(100.0)];

        if user.total_purchases >= 10 {
            requests.push(CouponRequest::percentage(20.0).min_order(150.0));
        }
        if metrics.total_spent > 500.0 {
            requests.push(CouponRequest::fixed_amount(50.0).min_order(200.0));
        }
        requests.push(CouponRequest::free_shipping());
        if user.likes(ELECTRONICS_CATEGORY) {
            requests.push(
                CouponRequest::percentage(25.0)
                    .min_order(200.0)
                    .restricted_to(ELECTRONICS_CATEGORY),
            );
        }

        requests
    }
}

// ─── VIP ────────────────────────────────────────────────────────────────────

/// VIP rules. Spend is judged on the account's accumulated total rather
/// than the purchase history window.
pub struct VipRules {
    region: String,
}

impl VipRules {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }
}

impl TierRules for VipRules {
    fn tier(&self) -> Tier {
        Tier::Vip
    }

    fn evaluate(&self, user: &User, _metrics: &DerivedMetrics) -> Vec<CouponRequest> {
        let mut requests = vec![
            CouponRequest::percentage(25.0).min_order(200.0),
            CouponRequest::fixed_amount(100.0).min_order(500.0),
            CouponRequest::free_shipping(),
            CouponRequest::buy_one_get_one().min_order(100.0),
        ];

        if user.total_spent > 2000.0 {
            requests.push(CouponRequest::percentage(30.0).min_order(500.0));
        }
        if user.age.is_some_and(|age| age > 40) {
            requests.push(CouponRequest::percentage(20.0).min_order(100.0));
        }
        if user.location.as_deref() == Some(self.region.as_str()) {
            requests.push(CouponRequest::percentage(15.0).min_order(100.0));
        }

        requests
    }
}

// ─── Registry ───────────────────────────────────────────────────────────────

/// Lookup from tier to its rules. New tiers plug in through [`register`]
/// without touching existing rule code.
///
/// [`register`]: TierRuleSet::register
pub struct TierRuleSet {
    rules: HashMap<Tier, Box<dyn TierRules>>,
}

impl TierRuleSet {
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// The REGULAR, PREMIUM and VIP rules.
    pub fn standard(config: &CouponConfig) -> Self {
        let mut set = Self::empty();
        set.register(RegularRules);
        set.register(PremiumRules);
        set.register(VipRules::new(config.vip_region.clone()));
        set
    }

    /// Add rules for their tier, returning any rules they replace.
    pub fn register(&mut self, rules: impl TierRules + 'static) -> Option<Box<dyn TierRules>> {
        self.rules.insert(rules.tier(), Box::new(rules))
    }

    pub fn supports(&self, tier: Tier) -> bool {
        self.rules.contains_key(&tier)
    }

    pub fn evaluate(&self, user: &User, metrics: &DerivedMetrics) -> CouponResult<Vec<CouponRequest>> {
        let rules = self
            .rules
            .get(&user.tier)
            .ok_or_else(|| CouponError::InvalidProfile {
                user_id: user.id.clone(),
                tier: user.tier.to_string(),
            })?;
        Ok(rules.evaluate(user, metrics))
    }
}
