//! Background maintenance worker
//!
//! One dedicated thread per manager. Each cycle sleeps the check interval
//! in one-second increments (so a stop request is honored within about a
//! second), refreshing the aggregate health flag at every increment, then
//! takes a stable snapshot of the managed set and services every
//! subscription in it. A failing subscription is logged and never stops
//! maintenance of the others.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use eventing_api::{EventSubscription, Observable};
use tracing::{debug, info, warn};

use crate::config::KeepAliveMode;

/// Aggregate health of the managed set: true iff no subscription reports
/// unhealthy. Edge-triggered observable; publishes on changes only.
pub struct HealthFlag {
    current: AtomicBool,
    changes: Observable<bool>,
}

impl HealthFlag {
    pub(crate) fn new() -> Self {
        Self {
            current: AtomicBool::new(true),
            changes: Observable::new(),
        }
    }

    pub fn get(&self) -> bool {
        self.current.load(Ordering::SeqCst)
    }

    pub fn changes(&self) -> &Observable<bool> {
        &self.changes
    }

    pub(crate) fn update(&self, value: bool) {
        if self.current.swap(value, Ordering::SeqCst) != value {
            self.changes.publish(&value);
        }
    }
}

impl std::fmt::Debug for HealthFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthFlag").field("current", &self.get()).finish()
    }
}

pub(crate) struct WorkerContext {
    pub subscriptions: Arc<Mutex<HashMap<String, Arc<EventSubscription>>>>,
    pub stop: Arc<AtomicBool>,
    pub health: Arc<HealthFlag>,
    pub check_interval: Duration,
    pub keep_alive: KeepAliveMode,
    pub renew_limit: Duration,
}

pub(crate) fn run(context: WorkerContext) {
    info!("subscription maintenance worker started");
    loop {
        let ticks = context.check_interval.as_secs().max(1);
        for _ in 0..ticks {
            thread::sleep(Duration::from_secs(1));
            if context.stop.load(Ordering::SeqCst) {
                info!("subscription maintenance worker stopping");
                return;
            }
            let all_healthy = {
                let subscriptions = match context.subscriptions.lock() {
                    Ok(subscriptions) => subscriptions,
                    Err(_) => return,
                };
                subscriptions.values().all(|s| s.is_subscribed())
            };
            context.health.update(all_healthy);
        }

        // snapshot under the lock, network calls outside it: a slow peer
        // must never block create_subscription
        let snapshot: Vec<Arc<EventSubscription>> = {
            let subscriptions = match context.subscriptions.lock() {
                Ok(subscriptions) => subscriptions,
                Err(_) => return,
            };
            subscriptions.values().cloned().collect()
        };

        for subscription in &snapshot {
            let result = match context.keep_alive {
                KeepAliveMode::Renew => subscription.check_status_renew(),
                KeepAliveMode::StatusQuery => subscription.check_status(context.renew_limit),
            };
            if let Err(e) = result {
                warn!(
                    filter = %subscription.short_filter(),
                    error = %e,
                    "maintenance failed for subscription"
                );
            }
        }
        for subscription in &snapshot {
            debug!("{}", subscription);
        }
    }
}
