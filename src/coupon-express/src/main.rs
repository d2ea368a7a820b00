//! Coupon Express: personalized coupon issuance and redemption.
//!
//! Command-line entry point wiring configuration, storage, notifications and
//! the coupon service together.

use clap::{Parser, Subcommand};
use coupon_core::config::{AppConfig, StoreBackend};
use coupon_core::coupon::RedeemCouponRequest;
use coupon_core::ports::{noop_notifier, NotificationPort};
use coupon_engine::{CouponService, Repositories};
use coupon_notifications::EmailNotifier;
use coupon_store::{demo_purchases, demo_users, JsonFileStore, MemoryStore};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "coupon-express")]
#[command(about = "Personalized coupon issuance and redemption engine")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, env = "COUPON_EXPRESS_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the JSON store (overrides config)
    #[arg(long, env = "COUPON_EXPRESS__STORE__DATA_DIR")]
    data_dir: Option<String>,

    /// Storage backend: memory or json (overrides config)
    #[arg(long, env = "COUPON_EXPRESS__STORE__BACKEND")]
    backend: Option<StoreBackend>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the demo users and purchase history
    Seed,
    /// Issue every coupon a user qualifies for
    Generate {
        #[arg(long)]
        user: String,
    },
    /// Redeem a coupon against an order
    Redeem {
        #[arg(long)]
        user: String,
        #[arg(long)]
        code: String,
        #[arg(long)]
        amount: f64,
    },
    /// Print the statistics snapshot
    Stats,
    /// List a user's coupons
    Coupons {
        #[arg(long)]
        user: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "coupon_express=info,coupon_engine=info".into()),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cli = Cli::parse();

    let mut config = AppConfig::load_from(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    if let Some(dir) = cli.data_dir {
        config.store.data_dir = dir;
    }
    if let Some(backend) = cli.backend {
        config.store.backend = backend;
    }

    info!(
        backend = ?config.store.backend,
        data_dir = %config.store.data_dir,
        notifications = config.notifications.enabled,
        "Configuration loaded"
    );

    let repos = match config.store.backend {
        StoreBackend::Memory => {
            if matches!(cli.command, Command::Seed) {
                info!("Memory backend is seeded on startup; nothing to write");
            }
            Repositories::from_store(Arc::new(MemoryStore::with_demo_data()))
        }
        StoreBackend::Json => {
            let store = Arc::new(JsonFileStore::open(&config.store.data_dir).await?);
            if matches!(cli.command, Command::Seed) {
                store.seed(&demo_users(), &demo_purchases()).await?;
            }
            Repositories::from_store(store)
        }
    };

    let notifier: Arc<dyn NotificationPort> = if config.notifications.enabled {
        Arc::new(EmailNotifier::new(config.notifications.clone()))
    } else {
        noop_notifier()
    };

    let service = CouponService::new(&config, repos, notifier);

    match cli.command {
        Command::Seed => {
            print_json(&serde_json::json!({
                "users": demo_users().len(),
                "purchases": demo_purchases().len(),
            }))?;
        }
        Command::Generate { user } => {
            let coupons = service.generate_coupons_for_user(&user).await?;
            print_json(&coupons)?;
        }
        Command::Redeem { user, code, amount } => {
            let response = service
                .redeem(&RedeemCouponRequest {
                    code,
                    user_id: user,
                    order_amount: amount,
                })
                .await?;
            print_json(&response)?;
        }
        Command::Stats => {
            print_json(&service.get_statistics().await?)?;
        }
        Command::Coupons { user } => {
            print_json(&service.coupons_for_user(&user).await?)?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
