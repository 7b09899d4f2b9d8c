//! Key-Value Repository
//!
//! Implements every checkout repository port on top of a
//! [`KeyValueStore`]. Each collection is one JSON document; mutations reload
//! the document right before writing it back, under a process-wide lock.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use platform::storage::{KeyValueStore, load_json, store_json};
use tokio::sync::Mutex;

use crate::domain::entities::{Coupon, DeviceRecord, Member, SecurityEvent};
use crate::domain::order::Order;
use crate::domain::repository::{
    CouponUsageRepository, DeviceFingerprintRepository, MemberDirectory, OrderRepository,
    RateLimitRepository, SecurityLogRepository, SettingsRepository,
};
use crate::domain::value_objects::{Amount, DeviceId, OrderNumber, OrderStatus};
use crate::error::{CheckoutError, CheckoutResult};

pub const ORDERS_KEY: &str = "orders";
pub const RATE_LIMIT_KEY: &str = "order_rate_limit";
pub const SECURITY_LOG_KEY: &str = "security_logs";
pub const SECURITY_CONFIG_KEY: &str = "security_config";
pub const MEMBERS_KEY: &str = "members";

fn used_coupons_key(device_id: &DeviceId) -> String {
    format!("used_coupons:{device_id}")
}

fn granted_coupons_key(device_id: &DeviceId) -> String {
    format!("granted_coupons:{device_id}")
}

fn fingerprint_key(profile_id: &str) -> String {
    format!("device_fingerprint:{profile_id}")
}

pub struct KvRepository<S>
where
    S: KeyValueStore + Sync,
{
    store: S,
    write_lock: Mutex<()>,
}

impl<S> KvRepository<S>
where
    S: KeyValueStore + Sync,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    async fn orders(&self) -> CheckoutResult<Vec<Order>> {
        Ok(load_json(&self.store, ORDERS_KEY).await?.unwrap_or_default())
    }

    async fn rate_table(&self) -> CheckoutResult<HashMap<String, DeviceRecord>> {
        Ok(load_json(&self.store, RATE_LIMIT_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn members(&self) -> CheckoutResult<HashMap<String, Member>> {
        Ok(load_json(&self.store, MEMBERS_KEY).await?.unwrap_or_default())
    }

    /// Load the order log, apply `change` to one order and store the log
    async fn modify_order<F>(&self, order_number: &OrderNumber, change: F) -> CheckoutResult<Order>
    where
        F: FnOnce(&mut Order) -> CheckoutResult<()> + Send,
    {
        let _lock = self.write_lock.lock().await;
        let mut orders = self.orders().await?;
        let order = orders
            .iter_mut()
            .find(|o| &o.order_number == order_number)
            .ok_or_else(|| CheckoutError::OrderNotFound(order_number.to_string()))?;
        change(order)?;
        let updated = order.clone();
        store_json(&self.store, ORDERS_KEY, &orders).await?;
        Ok(updated)
    }
}

impl<S> OrderRepository for KvRepository<S>
where
    S: KeyValueStore + Send + Sync,
{
    async fn append(&self, order: &Order) -> CheckoutResult<()> {
        let _lock = self.write_lock.lock().await;
        let mut orders = self.orders().await?;
        if orders.iter().any(|o| o.order_number == order.order_number) {
            return Err(CheckoutError::Persistence(format!(
                "Order {} already exists",
                order.order_number
            )));
        }
        orders.push(order.clone());
        store_json(&self.store, ORDERS_KEY, &orders).await?;
        Ok(())
    }

    async fn exists(&self, order_number: &OrderNumber) -> CheckoutResult<bool> {
        Ok(self
            .orders()
            .await?
            .iter()
            .any(|o| &o.order_number == order_number))
    }

    async fn find(&self, order_number: &OrderNumber) -> CheckoutResult<Option<Order>> {
        Ok(self
            .orders()
            .await?
            .into_iter()
            .find(|o| &o.order_number == order_number))
    }

    async fn find_by_contact(&self, phone: &str, email: &str) -> CheckoutResult<Vec<Order>> {
        Ok(self
            .orders()
            .await?
            .into_iter()
            .filter(|o| o.matches_contact(phone, email))
            .collect())
    }

    async fn recent_for_device(
        &self,
        device_id: &DeviceId,
        since: DateTime<Utc>,
    ) -> CheckoutResult<Vec<Order>> {
        Ok(self
            .orders()
            .await?
            .into_iter()
            .filter(|o| &o.device_id == device_id && o.created_at >= since)
            .collect())
    }

    async fn update_status(
        &self,
        order_number: &OrderNumber,
        status: OrderStatus,
        note: &str,
        at: DateTime<Utc>,
    ) -> CheckoutResult<Order> {
        self.modify_order(order_number, |order| order.transition(status, note, at))
            .await
    }

    async fn set_tracking_number(
        &self,
        order_number: &OrderNumber,
        tracking_number: &str,
    ) -> CheckoutResult<Order> {
        self.modify_order(order_number, |order| {
            order.tracking_number = Some(tracking_number.to_string());
            Ok(())
        })
        .await
    }
}

impl<S> RateLimitRepository for KvRepository<S>
where
    S: KeyValueStore + Send + Sync,
{
    async fn load(&self, device_id: &DeviceId) -> CheckoutResult<Option<DeviceRecord>> {
        Ok(self.rate_table().await?.remove(device_id.as_str()))
    }

    async fn save(&self, device_id: &DeviceId, record: &DeviceRecord) -> CheckoutResult<()> {
        let _lock = self.write_lock.lock().await;
        let mut table = self.rate_table().await?;
        table.insert(device_id.to_string(), record.clone());
        store_json(&self.store, RATE_LIMIT_KEY, &table).await?;
        Ok(())
    }

    async fn remove(&self, device_id: &DeviceId) -> CheckoutResult<()> {
        let _lock = self.write_lock.lock().await;
        let mut table = self.rate_table().await?;
        if table.remove(device_id.as_str()).is_some() {
            store_json(&self.store, RATE_LIMIT_KEY, &table).await?;
        }
        Ok(())
    }
}

impl<S> CouponUsageRepository for KvRepository<S>
where
    S: KeyValueStore + Send + Sync,
{
    async fn used_codes(&self, device_id: &DeviceId) -> CheckoutResult<HashSet<String>> {
        let codes: Option<Vec<String>> = load_json(&self.store, &used_coupons_key(device_id)).await?;
        Ok(codes.unwrap_or_default().into_iter().collect())
    }

    async fn mark_used(&self, device_id: &DeviceId, code: &str) -> CheckoutResult<()> {
        let key = used_coupons_key(device_id);
        let _lock = self.write_lock.lock().await;
        let mut codes: Vec<String> = load_json(&self.store, &key).await?.unwrap_or_default();
        if !codes.iter().any(|c| c == code) {
            codes.push(code.to_string());
            store_json(&self.store, &key, &codes).await?;
        }
        Ok(())
    }

    async fn granted_coupons(&self, device_id: &DeviceId) -> CheckoutResult<Vec<Coupon>> {
        Ok(load_json(&self.store, &granted_coupons_key(device_id))
            .await?
            .unwrap_or_default())
    }

    async fn grant_coupon(&self, device_id: &DeviceId, coupon: &Coupon) -> CheckoutResult<()> {
        let key = granted_coupons_key(device_id);
        let _lock = self.write_lock.lock().await;
        let mut coupons: Vec<Coupon> = load_json(&self.store, &key).await?.unwrap_or_default();
        coupons.push(coupon.clone());
        store_json(&self.store, &key, &coupons).await?;
        Ok(())
    }

    async fn consume_granted(&self, device_id: &DeviceId, code: &str) -> CheckoutResult<bool> {
        let key = granted_coupons_key(device_id);
        let _lock = self.write_lock.lock().await;
        let mut coupons: Vec<Coupon> = load_json(&self.store, &key).await?.unwrap_or_default();
        let Some(index) = coupons.iter().position(|c| c.code == code) else {
            return Ok(false);
        };
        coupons.remove(index);
        if coupons.is_empty() {
            self.store.remove(&key).await?;
        } else {
            store_json(&self.store, &key, &coupons).await?;
        }
        Ok(true)
    }
}

impl<S> DeviceFingerprintRepository for KvRepository<S>
where
    S: KeyValueStore + Send + Sync,
{
    async fn device_for_profile(&self, profile_id: &str) -> CheckoutResult<Option<DeviceId>> {
        Ok(self
            .store
            .get(&fingerprint_key(profile_id))
            .await?
            .filter(|token| !token.is_empty())
            .map(DeviceId::new))
    }

    async fn store_device(&self, profile_id: &str, device_id: &DeviceId) -> CheckoutResult<()> {
        self.store
            .set(&fingerprint_key(profile_id), device_id.to_string())
            .await?;
        Ok(())
    }

    async fn forget_device(&self, profile_id: &str) -> CheckoutResult<()> {
        self.store.remove(&fingerprint_key(profile_id)).await?;
        Ok(())
    }
}

impl<S> SecurityLogRepository for KvRepository<S>
where
    S: KeyValueStore + Send + Sync,
{
    async fn append_event(&self, event: &SecurityEvent, capacity: usize) -> CheckoutResult<()> {
        let _lock = self.write_lock.lock().await;
        let mut events: Vec<SecurityEvent> = load_json(&self.store, SECURITY_LOG_KEY)
            .await?
            .unwrap_or_default();
        events.push(event.clone());
        if events.len() > capacity {
            let excess = events.len() - capacity;
            events.drain(..excess);
        }
        store_json(&self.store, SECURITY_LOG_KEY, &events).await?;
        Ok(())
    }

    async fn events(&self) -> CheckoutResult<Vec<SecurityEvent>> {
        Ok(load_json(&self.store, SECURITY_LOG_KEY)
            .await?
            .unwrap_or_default())
    }
}

impl<S> MemberDirectory for KvRepository<S>
where
    S: KeyValueStore + Send + Sync,
{
    async fn member(&self, member_id: &str) -> CheckoutResult<Option<Member>> {
        Ok(self.members().await?.remove(member_id))
    }

    async fn award_points(
        &self,
        member_id: &str,
        order_total: Amount,
    ) -> CheckoutResult<Option<i64>> {
        let _lock = self.write_lock.lock().await;
        let mut members = self.members().await?;
        let Some(member) = members.get_mut(member_id) else {
            return Ok(None);
        };
        let earned = member.record_order(order_total);
        store_json(&self.store, MEMBERS_KEY, &members).await?;
        tracing::info!(member_id = %member_id, points = earned, "Member points awarded");
        Ok(Some(earned))
    }

    async fn use_points(&self, member_id: &str, points: i64) -> CheckoutResult<Option<i64>> {
        let _lock = self.write_lock.lock().await;
        let mut members = self.members().await?;
        let Some(member) = members.get_mut(member_id) else {
            return Ok(None);
        };
        if !member.spend_points(points) {
            return Ok(None);
        }
        let remaining = member.points;
        store_json(&self.store, MEMBERS_KEY, &members).await?;
        tracing::info!(member_id = %member_id, points, remaining, "Member points used");
        Ok(Some(remaining))
    }

    async fn upsert_member(&self, member: &Member) -> CheckoutResult<()> {
        let _lock = self.write_lock.lock().await;
        let mut members = self.members().await?;
        members.insert(member.id.clone(), member.clone());
        store_json(&self.store, MEMBERS_KEY, &members).await?;
        Ok(())
    }
}

impl<S> SettingsRepository for KvRepository<S>
where
    S: KeyValueStore + Send + Sync,
{
    async fn load_security_config(&self) -> CheckoutResult<Option<String>> {
        Ok(self.store.get(SECURITY_CONFIG_KEY).await?)
    }

    async fn save_security_config(&self, raw: String) -> CheckoutResult<()> {
        self.store.set(SECURITY_CONFIG_KEY, raw).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::fixtures;
    use chrono::{TimeDelta, TimeZone};
    use platform::storage::MemoryStore;

    fn repo() -> KvRepository<MemoryStore> {
        KvRepository::new(MemoryStore::new())
    }

    #[tokio::test]
    async fn test_append_rejects_duplicate_number() {
        let repo = repo();
        let at = Utc.with_ymd_and_hms(2026, 2, 2, 0, 0, 0).unwrap();
        let order = fixtures::order("ORD202602020001", "dev", at, vec![fixtures::line("A", "120g", 350, 1)]);

        repo.append(&order).await.unwrap();
        assert!(repo.exists(&order.order_number).await.unwrap());
        assert!(matches!(
            repo.append(&order).await,
            Err(CheckoutError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn test_recent_for_device_filters_by_device_and_time() {
        let repo = repo();
        let now = Utc.with_ymd_and_hms(2026, 2, 3, 12, 0, 0).unwrap();
        let line = || vec![fixtures::line("A", "120g", 350, 1)];

        repo.append(&fixtures::order("ORD202602020001", "dev", now - TimeDelta::hours(30), line()))
            .await
            .unwrap();
        repo.append(&fixtures::order("ORD202602030002", "dev", now - TimeDelta::hours(2), line()))
            .await
            .unwrap();
        repo.append(&fixtures::order("ORD202602030003", "other", now, line()))
            .await
            .unwrap();

        let recent = repo
            .recent_for_device(&DeviceId::new("dev"), now - TimeDelta::hours(24))
            .await
            .unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].order_number.as_str(), "ORD202602030002");
    }

    #[tokio::test]
    async fn test_unknown_order_update() {
        let repo = repo();
        let number = OrderNumber::parse("ORD202602020009").unwrap();
        assert!(matches!(
            repo.set_tracking_number(&number, "T1").await,
            Err(CheckoutError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_members_and_points() {
        let repo = repo();
        repo.upsert_member(&Member {
            id: "m1".to_string(),
            name: "Lin".to_string(),
            total_spent: 4900,
            total_orders: 2,
            points: 10,
        })
        .await
        .unwrap();

        assert_eq!(repo.award_points("m1", 760).await.unwrap(), Some(7));
        assert_eq!(repo.award_points("ghost", 760).await.unwrap(), None);

        let member = repo.member("m1").await.unwrap().unwrap();
        assert_eq!(member.points, 17);
        assert_eq!(member.total_orders, 3);
        assert_eq!(member.total_spent, 5660);

        assert_eq!(repo.use_points("m1", 15).await.unwrap(), Some(2));
        assert_eq!(repo.use_points("m1", 3).await.unwrap(), None);
        assert_eq!(repo.use_points("ghost", 1).await.unwrap(), None);
        assert_eq!(repo.member("m1").await.unwrap().unwrap().points, 2);
    }

    #[tokio::test]
    async fn test_granted_coupons_are_spent_once() {
        let repo = repo();
        let device = DeviceId::new("dev");
        let coupon = Coupon {
            code: "POINTS50".to_string(),
            kind: crate::domain::value_objects::CouponKind::Fixed,
            value: 50,
            min_order_amount: 500,
            max_discount: 50,
            expiry: chrono::NaiveDate::from_ymd_opt(2026, 7, 1).unwrap(),
            description: "Points exchange NT$50 off".to_string(),
        };

        repo.grant_coupon(&device, &coupon).await.unwrap();
        repo.grant_coupon(&device, &coupon).await.unwrap();
        assert_eq!(repo.granted_coupons(&device).await.unwrap().len(), 2);

        assert!(repo.consume_granted(&device, "POINTS50").await.unwrap());
        assert!(repo.consume_granted(&device, "POINTS50").await.unwrap());
        assert!(!repo.consume_granted(&device, "POINTS50").await.unwrap());
        assert!(repo.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_fingerprint_and_settings_keys() {
        let repo = repo();
        let device = DeviceId::new("abc123");
        repo.store_device("profile-1", &device).await.unwrap();
        assert_eq!(repo.device_for_profile("profile-1").await.unwrap(), Some(device));
        assert_eq!(
            repo.store().get("device_fingerprint:profile-1").await.unwrap(),
            Some("abc123".to_string())
        );
        repo.forget_device("profile-1").await.unwrap();
        assert_eq!(repo.device_for_profile("profile-1").await.unwrap(), None);

        assert_eq!(repo.load_security_config().await.unwrap(), None);
        repo.save_security_config("{}".to_string()).await.unwrap();
        assert_eq!(
            repo.load_security_config().await.unwrap(),
            Some("{}".to_string())
        );
    }
}
