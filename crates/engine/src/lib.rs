//! Coupon eligibility, issuance and redemption engine.

#![warn(clippy::unwrap_used)]

pub mod deadline;
pub mod factory;
pub mod generation;
pub mod redemption;
pub mod rules;
pub mod service;
pub mod statistics;

pub use factory::CouponFactory;
pub use generation::GenerationEngine;
pub use redemption::RedemptionEngine;
pub use rules::{TierRuleSet, TierRules};
pub use service::{CouponService, Repositories};
pub use statistics::StatisticsAggregator;
