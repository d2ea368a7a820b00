pub mod config;
pub mod coupon;
pub mod error;
pub mod ports;
pub mod statistics;

pub use config::AppConfig;
pub use error::{CouponError, CouponResult};
