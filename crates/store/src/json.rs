//! JSON file store: each collection lives in its own file under a data
//! directory as a pretty-printed JSON list.
//!
//! Writes go through a single mutex and replace the file via a temp file
//! and rename, so readers never observe a half-written list.

use async_trait::async_trait;
use coupon_core::coupon::{Coupon, PurchaseRecord, User};
use coupon_core::ports::{CouponRepository, PurchaseRepository, UserRepository};
use coupon_core::CouponResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info};

const USERS_FILE: &str = "users.json";
const PURCHASES_FILE: &str = "purchases.json";
const COUPONS_FILE: &str = "coupons.json";

pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open a store rooted at `dir`, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> CouponResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        info!(dir = %dir.display(), "JSON file store opened");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Replace the user and purchase collections.
    pub async fn seed(&self, users: &[User], purchases: &[PurchaseRecord]) -> CouponResult<()> {
        let _guard = self.write_lock.lock().await;
        self.write_list(USERS_FILE, users).await?;
        self.write_list(PURCHASES_FILE, purchases).await?;
        info!(users = users.len(), purchases = purchases.len(), "JSON store seeded");
        Ok(())
    }

    /// Insert or replace a user by id.
    pub async fn upsert_user(&self, user: &User) -> CouponResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut users: Vec<User> = self.read_list(USERS_FILE).await?;
        match users.iter().position(|u| u.id == user.id) {
            Some(idx) => users[idx] = user.clone(),
            None => users.push(user.clone()),
        }
        self.write_list(USERS_FILE, &users).await
    }

    pub async fn record_purchase(&self, purchase: &PurchaseRecord) -> CouponResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut purchases: Vec<PurchaseRecord> = self.read_list(PURCHASES_FILE).await?;
        purchases.push(purchase.clone());
        self.write_list(PURCHASES_FILE, &purchases).await
    }

    async fn read_list<T: DeserializeOwned>(&self, file: &str) -> CouponResult<Vec<T>> {
        let path = self.dir.join(file);
        match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_list<T: Serialize>(&self, file: &str, items: &[T]) -> CouponResult<()> {
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!("{file}.tmp"));
        let bytes = serde_json::to_vec_pretty(items)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(file = %path.display(), items = items.len(), "Collection written");
        Ok(())
    }
}

#[async_trait]
impl UserRepository for JsonFileStore {
    async fn find_by_id(&self, id: &str) -> CouponResult<Option<User>> {
        let users: Vec<User> = self.read_list(USERS_FILE).await?;
        Ok(users.into_iter().find(|u| u.id == id))
    }

    async fn find_all(&self) -> CouponResult<Vec<User>> {
        self.read_list(USERS_FILE).await
    }
}

#[async_trait]
impl PurchaseRepository for JsonFileStore {
    async fn find_by_user_id(&self, user_id: &str) -> CouponResult<Vec<PurchaseRecord>> {
        let purchases: Vec<PurchaseRecord> = self.read_list(PURCHASES_FILE).await?;
        Ok(purchases.into_iter().filter(|p| p.user_id == user_id).collect())
    }
}

#[async_trait]
impl CouponRepository for JsonFileStore {
    async fn save(&self, coupon: &Coupon) -> CouponResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut coupons: Vec<Coupon> = self.read_list(COUPONS_FILE).await?;
        match coupons.iter().position(|c| c.id == coupon.id) {
            Some(idx) => coupons[idx] = coupon.clone(),
            None => coupons.push(coupon.clone()),
        }
        self.write_list(COUPONS_FILE, &coupons).await
    }

    async fn find_by_user_id(&self, user_id: &str) -> CouponResult<Vec<Coupon>> {
        let coupons: Vec<Coupon> = self.read_list(COUPONS_FILE).await?;
        Ok(coupons.into_iter().filter(|c| c.user_id == user_id).collect())
    }

    async fn find_all(&self) -> CouponResult<Vec<Coupon>> {
        self.read_list(COUPONS_FILE).await
    }
}
