//! Customer notifications for coupon issuance and redemption.

pub mod email;

pub use email::{EmailMessage, EmailNotifier};
