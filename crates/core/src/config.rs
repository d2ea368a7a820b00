use serde::Deserialize;
use std::path::Path;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `COUPON_EXPRESS__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub coupons: CouponConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
}

// ─── Coupon Issuance ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CouponConfig {
    /// Days between `valid_from` and `valid_until` on every new coupon.
    #[serde(default = "default_validity_days")]
    pub validity_days: i64,
    #[serde(default = "default_code_prefix")]
    pub code_prefix: String,
    /// Number of random characters appended to the prefix.
    #[serde(default = "default_code_length")]
    pub code_length: usize,
    #[serde(default = "default_usage_limit")]
    pub usage_limit: u32,
    /// Region that earns VIP users the location coupon.
    #[serde(default = "default_vip_region")]
    pub vip_region: String,
}

fn default_validity_days() -> i64 {
    30
}
fn default_code_prefix() -> String {
    "CPN".to_string()
}
fn default_code_length() -> usize {
    8
}
fn default_usage_limit() -> u32 {
    1
}
fn default_vip_region() -> String {
    "Nice".to_string()
}

impl Default for CouponConfig {
    fn default() -> Self {
        Self {
            validity_days: default_validity_days(),
            code_prefix: default_code_prefix(),
            code_length: default_code_length(),
            usage_limit: default_usage_limit(),
            vip_region: default_vip_region(),
        }
    }
}

// ─── Storage ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Memory,
    Json,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "json" => Ok(StoreBackend::Json),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Upper bound for any single repository call.
    #[serde(default = "default_io_timeout_ms")]
    pub io_timeout_ms: u64,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Json
}
fn default_data_dir() -> String {
    "data".to_string()
}
fn default_io_timeout_ms() -> u64 {
    2000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            data_dir: default_data_dir(),
            io_timeout_ms: default_io_timeout_ms(),
        }
    }
}

// ─── Notifications ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_notifications_enabled")]
    pub enabled: bool,
    #[serde(default = "default_from_email")]
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default = "default_notification_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_notifications_enabled() -> bool {
    true
}
fn default_from_email() -> String {
    "coupons@example.com".to_string()
}
fn default_from_name() -> String {
    "Coupon Express".to_string()
}
fn default_notification_timeout_ms() -> u64 {
    1000
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: default_notifications_enabled(),
            from_email: default_from_email(),
            from_name: default_from_name(),
            timeout_ms: default_notification_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables only.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from an optional config file, then environment
    /// variables (which take precedence).
    pub fn load_from(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("COUPON_EXPRESS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        config.try_deserialize()
    }
}
