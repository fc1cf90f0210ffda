// SPDX-License-Identifier: Apache-2.0

//! Premium entitlement store
//!
//! Single source of truth for what this session may access. State lives in a
//! handful of discrete keys in a [`KeyValueStore`]; there is no structured
//! record, and any one recognised unlock flag is enough to grant access.

pub mod events;
pub mod plan;
pub mod record;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::metrics;
use crate::storage::KeyValueStore;

pub use events::{EntitlementEvent, Notifier, Subscription};
pub use plan::{has_required_plan, Plan};
pub use record::{EntitlementInfo, EntitlementState, PurchasedTest};

pub const TEST_PAID_KEY: &str = "testPaid";
pub const ALL_UNLOCKED_KEY: &str = "allQuizzesUnlocked";
pub const PURCHASED_TEST_KEY: &str = "purchasedTest";
pub const PAYMENT_DATE_KEY: &str = "paymentDate";
pub const PAYMENT_METHOD_KEY: &str = "paymentMethod";
pub const UNLOCKED_AT_KEY: &str = "unlockedAt";
pub const PURCHASED_LEVEL_KEY: &str = "purchasedLevel";

const ENTITLEMENT_KEYS: [&str; 7] = [
    TEST_PAID_KEY,
    ALL_UNLOCKED_KEY,
    PURCHASED_TEST_KEY,
    PAYMENT_DATE_KEY,
    PAYMENT_METHOD_KEY,
    UNLOCKED_AT_KEY,
    PURCHASED_LEVEL_KEY,
];

const FLAG_SET: &str = "true";

pub struct EntitlementStore {
    store: Box<dyn KeyValueStore>,
    notifier: Notifier,
}

impl EntitlementStore {
    pub fn new(store: Box<dyn KeyValueStore>) -> Self {
        Self {
            store,
            notifier: Notifier::new(),
        }
    }

    /// Resolves the current entitlement.
    ///
    /// Not a pure read: a confirmed `purchasedTest` found without a global
    /// flag is escalated to full access, which persists `testPaid` and
    /// notifies subscribers. A corrupt `purchasedTest` is purged. Store
    /// failures resolve to a locked result.
    pub fn check_access(&self) -> EntitlementInfo {
        match self.try_check_access() {
            Ok(info) => info,
            Err(e) => {
                warn!("Entitlement check failed, treating session as locked: {}", e);
                EntitlementInfo::locked()
            }
        }
    }

    fn try_check_access(&self) -> StoreResult<EntitlementInfo> {
        let test_paid = self.flag(TEST_PAID_KEY)?;
        let all_unlocked = self.flag(ALL_UNLOCKED_KEY)?;
        let purchased = self.read_purchased_test()?;

        let mut has_access = test_paid || all_unlocked;
        if !has_access {
            if let Some(record) = purchased.as_ref().filter(|r| r.payment_confirmed) {
                self.escalate(record);
                has_access = true;
            }
        }

        if !has_access {
            return Ok(EntitlementInfo::locked());
        }

        let purchase_date = self
            .optional(PAYMENT_DATE_KEY)
            .or_else(|| purchased.as_ref().and_then(|r| r.purchase_date.clone()));
        let payment_method = self
            .optional(PAYMENT_METHOD_KEY)
            .or_else(|| purchased.as_ref().and_then(|r| r.payment_method.clone()));
        let purchased_level = purchased
            .as_ref()
            .and_then(|r| r.level.clone())
            .or_else(|| self.optional(PURCHASED_LEVEL_KEY));

        Ok(EntitlementInfo {
            has_access: true,
            purchased_levels: Plan::ALL.to_vec(),
            all_unlocked: true,
            purchase_date,
            payment_method,
            unlocked_at: self.optional(UNLOCKED_AT_KEY),
            purchased_level,
        })
    }

    /// Unlocks every tier: sets both global flags, stamps `unlockedAt` and
    /// notifies [`EntitlementEvent::PremiumUnlocked`].
    pub fn unlock_all(&self) -> StoreResult<()> {
        let unlocked_at = now_timestamp();

        self.store.set(TEST_PAID_KEY, FLAG_SET)?;
        self.store.set(ALL_UNLOCKED_KEY, FLAG_SET)?;
        self.store.set(UNLOCKED_AT_KEY, &unlocked_at)?;

        metrics::record_unlock();
        info!(unlocked_at = %unlocked_at, "Premium access unlocked");
        self.notifier
            .notify(&EntitlementEvent::PremiumUnlocked { unlocked_at });
        Ok(())
    }

    /// Removes every entitlement key and notifies
    /// [`EntitlementEvent::PremiumReset`].
    ///
    /// Every key is attempted even if an earlier removal fails; the first
    /// failure is returned. Nothing is broadcast when no key could be removed.
    pub fn reset_access(&self) -> StoreResult<()> {
        let mut first_error = None;
        let mut removed_any = false;

        for key in ENTITLEMENT_KEYS {
            match self.store.remove(key) {
                Ok(()) => removed_any = true,
                Err(e) => {
                    warn!("Failed to remove {}: {}", key, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        if removed_any {
            metrics::record_reset();
            info!("Premium access reset");
            self.notifier.notify(&EntitlementEvent::PremiumReset);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Persists a confirmed purchase of `plan` and notifies
    /// [`EntitlementEvent::PurchaseRecorded`]. Does not unlock by itself; the
    /// next [`check_access`](Self::check_access) escalates it.
    pub fn record_purchase(&self, plan: Plan, payment_method: &str) -> StoreResult<PurchasedTest> {
        let purchase_date = now_timestamp();
        let record = PurchasedTest::confirmed(plan, purchase_date.clone(), payment_method);

        let json = serde_json::to_string(&record)
            .map_err(|e| StoreError::serialization(e.to_string()))?;
        self.store.set(PURCHASED_TEST_KEY, &json)?;
        self.store.set(PAYMENT_DATE_KEY, &purchase_date)?;
        self.store.set(PAYMENT_METHOD_KEY, payment_method)?;
        self.store.set(PURCHASED_LEVEL_KEY, plan.as_str())?;

        info!(plan = %plan, payment_method, "Purchase recorded");
        self.notifier.notify(&EntitlementEvent::PurchaseRecorded {
            level: plan,
            payment_method: payment_method.to_string(),
        });
        Ok(record)
    }

    /// Highest tier this session holds, if any.
    pub fn resolved_plan(&self) -> Option<Plan> {
        self.check_access().plan()
    }

    pub fn state(&self) -> EntitlementState {
        self.check_access().state()
    }

    /// Registers a listener called synchronously after every write made
    /// through this store.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&EntitlementEvent) + Send + Sync + 'static,
    {
        self.notifier.subscribe(listener)
    }

    fn flag(&self, key: &str) -> StoreResult<bool> {
        Ok(self.store.get(key)?.as_deref() == Some(FLAG_SET))
    }

    /// Best-effort metadata read.
    fn optional(&self, key: &str) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                debug!("Could not read {}: {}", key, e);
                None
            }
        }
    }

    fn read_purchased_test(&self) -> StoreResult<Option<PurchasedTest>> {
        let Some(raw) = self.store.get(PURCHASED_TEST_KEY)? else {
            return Ok(None);
        };

        match serde_json::from_str::<PurchasedTest>(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!("Corrupt {} entry, purging: {}", PURCHASED_TEST_KEY, e);
                metrics::record_corrupt_purge();
                if let Err(e) = self.store.remove(PURCHASED_TEST_KEY) {
                    warn!("Failed to purge {}: {}", PURCHASED_TEST_KEY, e);
                }
                Ok(None)
            }
        }
    }

    /// A confirmed single-tier purchase is promoted to full access. The
    /// write is best-effort; access is granted either way.
    fn escalate(&self, record: &PurchasedTest) {
        let level = record.level.as_deref().unwrap_or("unknown");
        info!(level, "Escalating confirmed purchase to full access");
        metrics::record_escalation();

        if let Err(e) = self.store.set(TEST_PAID_KEY, FLAG_SET) {
            warn!("Failed to persist escalated access: {}", e);
            return;
        }

        self.notifier.notify(&EntitlementEvent::PremiumUnlocked {
            unlocked_at: now_timestamp(),
        });
    }
}

/// ISO 8601 UTC timestamp with millisecond precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, UnavailableStore};
    use parking_lot::Mutex;
    use std::sync::Arc;

    fn make_store() -> (EntitlementStore, MemoryStore) {
        let backing = MemoryStore::new();
        (EntitlementStore::new(Box::new(backing.clone())), backing)
    }

    fn record_events(store: &EntitlementStore) -> (Arc<Mutex<Vec<EntitlementEvent>>>, Subscription) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let sub = store.subscribe(move |e| sink.lock().push(e.clone()));
        (events, sub)
    }

    #[test]
    fn initial_state_is_locked() {
        let (store, _) = make_store();
        let info = store.check_access();
        assert!(!info.has_access);
        assert!(info.purchased_levels.is_empty());
        assert!(!info.all_unlocked);
        assert_eq!(store.state(), EntitlementState::Locked);
        assert_eq!(store.resolved_plan(), None);
    }

    #[test]
    fn either_global_flag_grants_full_access() -> StoreResult<()> {
        for key in [TEST_PAID_KEY, ALL_UNLOCKED_KEY] {
            let (store, backing) = make_store();
            backing.set(key, "true")?;

            let info = store.check_access();
            assert!(info.has_access, "{key} should unlock");
            assert_eq!(info.purchased_levels, Plan::ALL.to_vec());
            assert!(info.all_unlocked);
            assert_eq!(store.resolved_plan(), Some(Plan::Premium));
        }
        Ok(())
    }

    #[test]
    fn flags_must_be_exactly_true() -> StoreResult<()> {
        let (store, backing) = make_store();
        backing.set(TEST_PAID_KEY, "false")?;
        backing.set(ALL_UNLOCKED_KEY, "TRUE")?;
        assert!(!store.check_access().has_access);
        Ok(())
    }

    #[test]
    fn check_access_escalates_confirmed_purchase_and_writes() -> StoreResult<()> {
        let (store, backing) = make_store();
        let (events, _sub) = record_events(&store);
        backing.set(
            PURCHASED_TEST_KEY,
            r#"{"level":"basic","paymentConfirmed":true,"purchaseDate":"2024-06-01T12:00:00.000Z","paymentMethod":"pix"}"#,
        )?;

        let info = store.check_access();
        assert!(info.has_access);
        assert_eq!(info.purchased_levels, Plan::ALL.to_vec());
        assert_eq!(info.purchased_level.as_deref(), Some("basic"));
        assert_eq!(info.purchase_date.as_deref(), Some("2024-06-01T12:00:00.000Z"));
        assert_eq!(info.payment_method.as_deref(), Some("pix"));

        // the read persisted the global flag and broadcast an unlock
        assert_eq!(backing.get(TEST_PAID_KEY)?.as_deref(), Some("true"));
        assert!(matches!(
            events.lock().as_slice(),
            [EntitlementEvent::PremiumUnlocked { .. }]
        ));

        // a second read finds the flag and does not escalate again
        store.check_access();
        assert_eq!(events.lock().len(), 1);
        Ok(())
    }

    #[test]
    fn confirmed_purchase_without_level_still_grants_access() -> StoreResult<()> {
        let (store, backing) = make_store();
        backing.set(PURCHASED_TEST_KEY, r#"{"paymentConfirmed":true}"#)?;

        let info = store.check_access();
        assert!(info.has_access);
        assert_eq!(info.purchased_level, None);

        // the record is kept, not purged as corrupt
        assert!(backing.get(PURCHASED_TEST_KEY)?.is_some());
        assert_eq!(backing.get(TEST_PAID_KEY)?.as_deref(), Some("true"));
        Ok(())
    }

    #[test]
    fn unconfirmed_purchase_stays_locked() -> StoreResult<()> {
        let (store, backing) = make_store();
        backing.set(PURCHASED_TEST_KEY, r#"{"level":"premium","paymentConfirmed":false}"#)?;

        assert!(!store.check_access().has_access);
        assert_eq!(backing.get(TEST_PAID_KEY)?, None);
        Ok(())
    }

    #[test]
    fn corrupt_purchase_record_is_purged() -> StoreResult<()> {
        let (store, backing) = make_store();
        backing.set(PURCHASED_TEST_KEY, "{not json")?;

        let info = store.check_access();
        assert!(!info.has_access);
        assert_eq!(backing.get(PURCHASED_TEST_KEY)?, None);
        Ok(())
    }

    #[test]
    fn corrupt_record_does_not_mask_global_flag() -> StoreResult<()> {
        let (store, backing) = make_store();
        backing.set(PURCHASED_TEST_KEY, "null")?;
        backing.set(ALL_UNLOCKED_KEY, "true")?;

        assert!(store.check_access().has_access);
        assert_eq!(backing.get(PURCHASED_TEST_KEY)?, None);
        Ok(())
    }

    #[test]
    fn purchased_level_falls_back_to_plain_key() -> StoreResult<()> {
        let (store, backing) = make_store();
        backing.set(TEST_PAID_KEY, "true")?;
        backing.set(PURCHASED_LEVEL_KEY, "intermediate")?;

        let info = store.check_access();
        assert_eq!(info.purchased_level.as_deref(), Some("intermediate"));
        Ok(())
    }

    #[test]
    fn unlock_all_sets_flags_and_notifies() -> StoreResult<()> {
        let (store, backing) = make_store();
        let (events, _sub) = record_events(&store);

        store.unlock_all()?;

        assert_eq!(backing.get(TEST_PAID_KEY)?.as_deref(), Some("true"));
        assert_eq!(backing.get(ALL_UNLOCKED_KEY)?.as_deref(), Some("true"));
        let stamped = backing.get(UNLOCKED_AT_KEY)?.unwrap();
        assert!(stamped.parse::<chrono::DateTime<Utc>>().is_ok());

        let info = store.check_access();
        assert!(info.has_access);
        assert_eq!(info.unlocked_at.as_deref(), Some(stamped.as_str()));

        match events.lock().as_slice() {
            [EntitlementEvent::PremiumUnlocked { unlocked_at }] => assert_eq!(unlocked_at, &stamped),
            other => panic!("unexpected events: {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn unlock_all_is_idempotent() -> StoreResult<()> {
        let (store, _) = make_store();
        store.unlock_all()?;
        let first = store.check_access();
        store.unlock_all()?;
        let second = store.check_access();

        assert_eq!(first.has_access, second.has_access);
        assert_eq!(first.purchased_levels, second.purchased_levels);
        Ok(())
    }

    #[test]
    fn reset_then_check_is_locked() -> StoreResult<()> {
        let (store, backing) = make_store();
        store.record_purchase(Plan::Advanced, "credit_card")?;
        store.unlock_all()?;
        let (events, _sub) = record_events(&store);

        store.reset_access()?;
        store.reset_access()?;

        let info = store.check_access();
        assert!(!info.has_access);
        assert!(info.purchased_levels.is_empty());
        assert!(backing.is_empty());
        assert_eq!(
            events.lock().as_slice(),
            [EntitlementEvent::PremiumReset, EntitlementEvent::PremiumReset]
        );
        Ok(())
    }

    #[test]
    fn record_purchase_writes_metadata() -> StoreResult<()> {
        let (store, backing) = make_store();
        let (events, _sub) = record_events(&store);

        let record = store.record_purchase(Plan::Intermediate, "pix")?;
        assert!(record.payment_confirmed);
        assert_eq!(backing.get(PURCHASED_LEVEL_KEY)?.as_deref(), Some("intermediate"));
        assert_eq!(backing.get(PAYMENT_METHOD_KEY)?.as_deref(), Some("pix"));
        assert_eq!(backing.get(PAYMENT_DATE_KEY)?, record.purchase_date);
        assert_eq!(
            events.lock().first(),
            Some(&EntitlementEvent::PurchaseRecorded {
                level: Plan::Intermediate,
                payment_method: "pix".into(),
            })
        );
        Ok(())
    }

    #[test]
    fn missing_store_is_locked_not_a_crash() {
        let store = EntitlementStore::new(Box::new(UnavailableStore));
        let (events, _sub) = record_events(&store);

        assert!(!store.check_access().has_access);
        assert!(store.unlock_all().is_err());
        assert!(store.reset_access().is_err());
        assert!(events.lock().is_empty());
    }
}
