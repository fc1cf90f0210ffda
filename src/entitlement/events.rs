// SPDX-License-Identifier: Apache-2.0

//! Change notifications for the entitlement store.
//!
//! Listeners run synchronously on the thread that performed the write, so a
//! consumer living in the same process sees its own writes immediately.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::plan::Plan;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EntitlementEvent {
    PremiumUnlocked {
        #[serde(rename = "unlockedAt")]
        unlocked_at: String,
    },
    PremiumReset,
    PurchaseRecorded {
        level: Plan,
        #[serde(rename = "paymentMethod")]
        payment_method: String,
    },
}

impl EntitlementEvent {
    pub fn name(&self) -> &'static str {
        match self {
            EntitlementEvent::PremiumUnlocked { .. } => "premiumUnlocked",
            EntitlementEvent::PremiumReset => "premiumReset",
            EntitlementEvent::PurchaseRecorded { .. } => "purchaseRecorded",
        }
    }
}

pub type Listener = Arc<dyn Fn(&EntitlementEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

/// Fan-out of [`EntitlementEvent`]s to any number of listeners.
#[derive(Default)]
pub struct Notifier {
    registry: Arc<Registry>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&EntitlementEvent) + Send + Sync + 'static,
    {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.listeners.lock().push((id, Arc::new(listener)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Delivers `event` to every listener registered at the time of the call.
    ///
    /// The registry lock is released before any listener runs, so listeners
    /// may subscribe, unsubscribe or write to the store from their callback.
    pub fn notify(&self, event: &EntitlementEvent) {
        let snapshot: Vec<Listener> = self
            .registry
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in snapshot {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.registry.listeners.lock().len()
    }
}

/// Handle returned by [`Notifier::subscribe`]. The listener stays registered
/// until the handle is dropped or [`Subscription::unsubscribe`] is called.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.listeners.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn delivers_to_every_listener() {
        let notifier = Notifier::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c1 = Arc::clone(&count);
        let _a = notifier.subscribe(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        let c2 = Arc::clone(&count);
        let _b = notifier.subscribe(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        });

        notifier.notify(&EntitlementEvent::PremiumReset);
        assert_eq!(count.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let notifier = Notifier::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        let sub = notifier.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(notifier.listener_count(), 1);

        sub.unsubscribe();
        assert_eq!(notifier.listener_count(), 0);

        notifier.notify(&EntitlementEvent::PremiumReset);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn listener_may_subscribe_during_delivery() {
        let notifier = Arc::new(Notifier::new());
        let inner_subs = Arc::new(Mutex::new(Vec::new()));

        let n = Arc::clone(&notifier);
        let subs = Arc::clone(&inner_subs);
        let _outer = notifier.subscribe(move |_| {
            subs.lock().push(n.subscribe(|_| {}));
        });

        notifier.notify(&EntitlementEvent::PremiumReset);
        assert_eq!(notifier.listener_count(), 2);
    }

    #[test]
    fn subscription_outliving_notifier_is_harmless() {
        let notifier = Notifier::new();
        let sub = notifier.subscribe(|_| {});
        drop(notifier);
        drop(sub);
    }

    #[test]
    fn event_wire_format() {
        let unlocked = EntitlementEvent::PremiumUnlocked {
            unlocked_at: "2024-06-01T12:00:00.000Z".into(),
        };
        assert_eq!(
            serde_json::to_value(&unlocked).unwrap(),
            serde_json::json!({"type": "premiumUnlocked", "unlockedAt": "2024-06-01T12:00:00.000Z"})
        );
        assert_eq!(
            serde_json::to_value(EntitlementEvent::PremiumReset).unwrap(),
            serde_json::json!({"type": "premiumReset"})
        );
        assert_eq!(unlocked.name(), "premiumUnlocked");
    }
}
