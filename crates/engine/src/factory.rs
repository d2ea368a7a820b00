//! Coupon Factory: turns a [`CouponRequest`] into a concrete coupon record
//! with a fresh code, a fixed validity window and single-use defaults.

use chrono::{DateTime, Duration, Utc};
use coupon_core::config::CouponConfig;
use coupon_core::coupon::{Coupon, CouponRequest};
use rand::Rng;
use std::collections::HashSet;
use tracing::{debug, warn};
use uuid::Uuid;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const MAX_CODE_ATTEMPTS: u32 = 64;

pub struct CouponFactory {
    validity: Duration,
    code_prefix: String,
    code_length: usize,
    usage_limit: u32,
}

impl CouponFactory {
    pub fn new(config: &CouponConfig) -> Self {
        Self {
            validity: Duration::days(config.validity_days),
            code_prefix: config.code_prefix.clone(),
            code_length: config.code_length,
            usage_limit: config.usage_limit,
        }
    }

    /// Build one coupon valid from now.
    ///
    /// Codes are sampled independently; they are never checked against
    /// coupons issued by earlier calls.
    pub fn create(&self, user_id: &str, request: &CouponRequest) -> Coupon {
        self.create_at(user_id, request, self.generate_code(), Utc::now())
    }

    /// Build coupons for every request, in order. Codes are distinct within
    /// the batch.
    pub fn create_batch(&self, user_id: &str, requests: &[CouponRequest]) -> Vec<Coupon> {
        let now = Utc::now();
        let mut seen = HashSet::with_capacity(requests.len());

        requests
            .iter()
            .map(|request| {
                let mut code = self.generate_code();
                let mut attempts = 1;
                while seen.contains(&code) {
                    if attempts >= MAX_CODE_ATTEMPTS {
                        warn!(user_id = %user_id, code = %code, "Coupon code space exhausted within batch");
                        break;
                    }
                    code = self.generate_code();
                    attempts += 1;
                }
                seen.insert(code.clone());
                self.create_at(user_id, request, code, now)
            })
            .collect()
    }

    pub fn create_at(
        &self,
        user_id: &str,
        request: &CouponRequest,
        code: String,
        now: DateTime<Utc>,
    ) -> Coupon {
        let coupon = Coupon {
            id: Uuid::new_v4(),
            code,
            kind: request.kind,
            value: request.value,
            min_order_amount: request.min_order_amount,
            applicable_categories: request.applicable_categories.clone(),
            valid_from: now,
            valid_until: now + self.validity,
            user_id: user_id.to_string(),
            is_used: false,
            usage_limit: self.usage_limit,
            current_usage: 0,
            created_at: now,
        };

        debug!(
            user_id = %user_id,
            code = %coupon.code,
            kind = %coupon.kind,
            value = coupon.value,
            "Coupon created"
        );

        coupon
    }

    pub fn generate_code(&self) -> String {
        let mut rng = rand::thread_rng();
        let mut code = String::with_capacity(self.code_prefix.len() + self.code_length);
        code.push_str(&self.code_prefix);
        for _ in 0..self.code_length {
            let idx = rng.gen_range(0..CODE_ALPHABET.len());
            code.push(CODE_ALPHABET[idx] as char);
        }
        code
    }
}
