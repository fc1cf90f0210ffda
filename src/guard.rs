// SPDX-License-Identifier: Apache-2.0

//! Route guard
//!
//! Decides whether a protected page is shown, and keeps that decision current
//! while the page is mounted. Same-process writes arrive through the store's
//! subscriber list; writes made by another process sharing the persistence
//! medium are picked up by polling.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::AppConfig;
use crate::entitlement::{EntitlementStore, Plan, Subscription};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// The signed-in user. Only presence matters to the guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum GuardDecision {
    /// Not evaluated yet.
    #[default]
    Loading,
    #[serde(rename_all = "camelCase")]
    RedirectToLogin { login_route: String },
    /// Signed in without the required plan: show the upsell screen whose
    /// call to action navigates to `purchase_route`.
    #[serde(rename_all = "camelCase")]
    Upsell { required_plan: Plan, purchase_route: String },
    Granted { plan: Plan },
}

impl GuardDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, GuardDecision::Granted { .. })
    }
}

#[derive(Clone)]
pub struct RouteGuard {
    store: Arc<EntitlementStore>,
    required: Plan,
    login_route: String,
    purchase_route: String,
    poll_interval: Option<Duration>,
}

impl RouteGuard {
    pub fn new(store: Arc<EntitlementStore>, required: Plan) -> Self {
        Self {
            store,
            required,
            login_route: "/login".to_string(),
            purchase_route: "/checkout".to_string(),
            poll_interval: Some(DEFAULT_POLL_INTERVAL),
        }
    }

    pub fn from_config(store: Arc<EntitlementStore>, required: Plan, config: &AppConfig) -> Self {
        Self {
            login_route: config.login_route.clone(),
            purchase_route: config.purchase_route.clone(),
            poll_interval: config.poll_interval(),
            ..Self::new(store, required)
        }
    }

    pub fn with_routes(mut self, login_route: impl Into<String>, purchase_route: impl Into<String>) -> Self {
        self.login_route = login_route.into();
        self.purchase_route = purchase_route.into();
        self
    }

    /// `None` turns polling off.
    pub fn with_poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.poll_interval = interval.filter(|i| !i.is_zero());
        self
    }

    pub fn required_plan(&self) -> Plan {
        self.required
    }

    pub fn evaluate(&self, user: Option<&SessionUser>) -> GuardDecision {
        if user.is_none() {
            return GuardDecision::RedirectToLogin {
                login_route: self.login_route.clone(),
            };
        }

        match self.store.check_access().plan() {
            Some(plan) if plan.includes(self.required) => GuardDecision::Granted { plan },
            _ => GuardDecision::Upsell {
                required_plan: self.required,
                purchase_route: format!("{}?plan={}", self.purchase_route, self.required),
            },
        }
    }

    /// Evaluates now and keeps re-evaluating until the returned handle is
    /// dropped.
    ///
    /// The first evaluation runs before this returns, so the handle never
    /// reports [`GuardDecision::Loading`]; that variant is for callers that
    /// render before mounting.
    ///
    /// Polling only starts when called inside a tokio runtime; without one
    /// the guard still reacts to every write made through the same store.
    pub fn mount(&self, user: Option<SessionUser>) -> MountedGuard {
        let guard = Arc::new(self.clone());
        let user = Arc::new(user);
        let (sender, receiver) = watch::channel(GuardDecision::Loading);
        let sender = Arc::new(sender);

        publish(&sender, guard.evaluate(user.as_ref().as_ref()));

        let subscription = {
            let guard = Arc::clone(&guard);
            let user = Arc::clone(&user);
            let sender = Arc::clone(&sender);
            self.store.subscribe(move |event| {
                debug!(event = event.name(), "Re-evaluating route guard");
                publish(&sender, guard.evaluate(user.as_ref().as_ref()));
            })
        };

        let cancel = CancellationToken::new();
        let poller = match (self.poll_interval, tokio::runtime::Handle::try_current()) {
            (Some(interval), Ok(handle)) => Some(handle.spawn(poll(
                guard,
                user,
                sender,
                interval,
                cancel.clone(),
            ))),
            _ => None,
        };

        MountedGuard {
            decision: receiver,
            _subscription: subscription,
            cancel,
            poller,
        }
    }
}

fn publish(sender: &watch::Sender<GuardDecision>, next: GuardDecision) {
    sender.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}

async fn poll(
    guard: Arc<RouteGuard>,
    user: Arc<Option<SessionUser>>,
    sender: Arc<watch::Sender<GuardDecision>>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately and mount() already evaluated
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => publish(&sender, guard.evaluate(user.as_ref().as_ref())),
        }
    }
}

/// A mounted guard. Dropping it stops polling and unsubscribes from the store.
pub struct MountedGuard {
    decision: watch::Receiver<GuardDecision>,
    _subscription: Subscription,
    cancel: CancellationToken,
    poller: Option<JoinHandle<()>>,
}

impl MountedGuard {
    pub fn decision(&self) -> GuardDecision {
        self.decision.borrow().clone()
    }

    /// Waits for the next decision change and returns it.
    pub async fn changed(&mut self) -> GuardDecision {
        if self.decision.changed().await.is_err() {
            debug!("Route guard sender dropped");
        }
        self.decision.borrow_and_update().clone()
    }

    /// A receiver for callers that want to await changes independently.
    pub fn watch(&self) -> watch::Receiver<GuardDecision> {
        self.decision.clone()
    }

    pub fn is_polling(&self) -> bool {
        self.poller.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    pub fn unmount(self) {}
}

impl Drop for MountedGuard {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.poller.take() {
            handle.abort();
        }
    }
}
