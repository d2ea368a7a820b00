//! Repository implementations for the coupon engine.

pub mod json;
pub mod memory;

pub use json::JsonFileStore;
pub use memory::MemoryStore;
pub use memory::{demo_purchases, demo_users};
