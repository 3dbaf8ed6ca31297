//! Subscription registry and scheduler
//!
//! `SubscriptionManager` is the factory for `EventSubscription` records.
//! It owns the managed map (filter-set key → record), a single background
//! worker that keeps all leases alive, the aggregate health flag, and the
//! correlation strategy for inbound end-of-subscription messages.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use eventing_api::{EventNotification, EventSubscription, Observable};
use soap_client::EnvelopeTransport;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ManagerConfig;
use crate::correlation::{strategy_for, CorrelationStrategy, InboundMessage};
use crate::error::{EventManagerError, Result};
use crate::worker::{self, HealthFlag, WorkerContext};

/// How long `stop()` waits for the worker to wind down.
const STOP_TIMEOUT: Duration = Duration::from_secs(2);

/// Factory and registry for event subscriptions, with background lease
/// maintenance.
///
/// # Example
///
/// ```rust,ignore
/// use event_manager::{ManagerConfig, SubscriptionManager};
/// use soap_client::SoapClient;
/// use std::sync::Arc;
///
/// let config = ManagerConfig::new(notification_url);
/// let manager = SubscriptionManager::new(Arc::new(SoapClient::new()), config)?;
/// manager.start()?;
///
/// let subscription = manager.create_subscription(
///     &hosted_endpoint,
///     &["http://p11073/EpisodicMetricReport"],
/// )?;
///
/// // ... leases are renewed in the background ...
///
/// manager.unsubscribe_all();
/// manager.stop();
/// ```
pub struct SubscriptionManager {
    transport: Arc<dyn EnvelopeTransport>,
    config: ManagerConfig,
    strategy: Arc<dyn CorrelationStrategy>,
    subscriptions: Arc<Mutex<HashMap<String, Arc<EventSubscription>>>>,
    health: Arc<HealthFlag>,
    stop: Arc<AtomicBool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SubscriptionManager {
    /// Create a manager. The background loop does not run until
    /// `start()` is called.
    pub fn new(transport: Arc<dyn EnvelopeTransport>, config: ManagerConfig) -> Result<Self> {
        config.validate()?;
        let strategy = strategy_for(config.correlation);
        Ok(Self {
            transport,
            config,
            strategy,
            subscriptions: Arc::new(Mutex::new(HashMap::new())),
            health: Arc::new(HealthFlag::new()),
            stop: Arc::new(AtomicBool::new(false)),
            worker: Mutex::new(None),
        })
    }

    /// Start the background maintenance worker.
    pub fn start(&self) -> Result<()> {
        let mut worker = self
            .worker
            .lock()
            .map_err(|_| EventManagerError::WorkerSpawn("worker handle poisoned".to_string()))?;
        if worker.is_some() {
            return Err(EventManagerError::AlreadyRunning);
        }
        self.stop.store(false, Ordering::SeqCst);

        let context = WorkerContext {
            subscriptions: Arc::clone(&self.subscriptions),
            stop: Arc::clone(&self.stop),
            health: Arc::clone(&self.health),
            check_interval: self.config.check_interval,
            keep_alive: self.config.keep_alive,
            renew_limit: self.config.renew_limit(),
        };
        let handle = thread::Builder::new()
            .name("subscription-maintenance".to_string())
            .spawn(move || worker::run(context))
            .map_err(|e| EventManagerError::WorkerSpawn(e.to_string()))?;
        *worker = Some(handle);
        Ok(())
    }

    /// Create a subscription for a set of notification actions against a
    /// hosted endpoint.
    ///
    /// The initial subscribe handshake happens synchronously; on success
    /// the record joins the managed map and is kept alive by the
    /// background loop. On failure the error is returned and nothing is
    /// inserted.
    pub fn create_subscription(
        &self,
        hosted_endpoint: &Url,
        actions: &[&str],
    ) -> Result<Arc<EventSubscription>> {
        let (notify_to, end_to) = self
            .strategy
            .subscriber_addresses(&self.config.notification_url, self.config.end_to_base())?;
        let subscription = Arc::new(EventSubscription::new(
            Arc::clone(&self.transport),
            hosted_endpoint.clone(),
            actions.iter().map(|a| a.to_string()).collect(),
            notify_to,
            end_to,
        ));

        subscription
            .subscribe(self.config.lease_minutes)
            .map_err(|source| EventManagerError::Subscribe {
                filter: subscription.filter().to_string(),
                source,
            })?;

        let key = subscription.filter().to_string();
        if let Ok(mut subscriptions) = self.subscriptions.lock() {
            if subscriptions
                .insert(key, Arc::clone(&subscription))
                .is_some()
            {
                debug!(filter = %subscription.filter(), "replaced subscription for filter");
            }
        }
        Ok(subscription)
    }

    /// Stop the background worker and clear the managed map.
    ///
    /// In-memory bookkeeping only: managed leases are not unsubscribed.
    /// Use `unsubscribe_all()` first for a clean protocol-level shutdown.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
        let handle = self.worker.lock().ok().and_then(|mut worker| worker.take());
        if let Some(handle) = handle {
            let deadline = Instant::now() + STOP_TIMEOUT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(50));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                warn!("maintenance worker did not stop in time, detaching");
            }
        }
        if let Ok(mut subscriptions) = self.subscriptions.lock() {
            subscriptions.clear();
        }
    }

    /// Unsubscribe every managed lease and clear the map.
    ///
    /// Each unsubscribe is isolated: one failing lease is logged and does
    /// not prevent attempting the rest. The map is empty afterwards
    /// regardless of individual outcomes.
    pub fn unsubscribe_all(&self) {
        let current: Vec<Arc<EventSubscription>> = {
            let mut subscriptions = match self.subscriptions.lock() {
                Ok(subscriptions) => subscriptions,
                Err(_) => return,
            };
            let current = subscriptions.values().cloned().collect();
            subscriptions.clear();
            current
        };
        for subscription in current {
            if let Err(e) = subscription.unsubscribe() {
                warn!(
                    filter = %subscription.short_filter(),
                    error = %e,
                    "unsubscribe failed"
                );
            }
        }
    }

    /// Handle an inbound end-of-subscription message.
    ///
    /// The owning subscription is resolved through the configured
    /// correlation strategy and marked unhealthy; the peer-reported status
    /// and reasons are logged. An unmatched message is logged and dropped.
    pub fn on_subscription_end(&self, inbound: &InboundMessage) {
        let (status, reasons) = read_subscription_end(inbound);
        let snapshot = self.subscription_snapshot();
        match self.strategy.find_subscription(inbound, &snapshot) {
            Some(subscription) => {
                info!(
                    filter = %subscription.short_filter(),
                    status = status.as_deref().unwrap_or(""),
                    reasons = reasons.join("; "),
                    "subscription ended by peer"
                );
                subscription.mark_ended();
            }
            None => {
                warn!(path = %inbound.path, "no subscription matches inbound subscription end");
            }
        }
    }

    /// Route an inbound notification to the subscription whose filter
    /// contains the resolved action.
    ///
    /// Returns whether a subscription accepted the payload. Report routing
    /// keys on the action the transport layer already resolved; the
    /// correlation strategy is reserved for end-of-subscription messages.
    pub fn dispatch_notification(&self, action: &str, notification: EventNotification) -> bool {
        let snapshot = self.subscription_snapshot();
        match snapshot
            .iter()
            .find(|subscription| subscription.actions().iter().any(|a| a == action))
        {
            Some(subscription) => {
                subscription.on_notification(notification);
                true
            }
            None => {
                warn!(action, "no subscription for notification action, dropping");
                false
            }
        }
    }

    /// True iff no managed subscription currently reports unhealthy.
    pub fn all_subscriptions_healthy(&self) -> bool {
        self.health.get()
    }

    /// Observable for aggregate-health transitions.
    pub fn health_changes(&self) -> &Observable<bool> {
        self.health.changes()
    }

    /// Stable snapshot of the managed subscriptions.
    pub fn subscriptions(&self) -> Vec<Arc<EventSubscription>> {
        self.subscription_snapshot()
    }

    /// The managed subscription for a space-joined filter key.
    pub fn subscription_for_filter(&self, filter: &str) -> Option<Arc<EventSubscription>> {
        self.subscriptions
            .lock()
            .ok()
            .and_then(|subscriptions| subscriptions.get(filter).cloned())
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .lock()
            .map(|subscriptions| subscriptions.len())
            .unwrap_or(0)
    }

    fn subscription_snapshot(&self) -> Vec<Arc<EventSubscription>> {
        self.subscriptions
            .lock()
            .map(|subscriptions| subscriptions.values().cloned().collect())
            .unwrap_or_default()
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        debug!(
            managed = self.subscription_count(),
            "subscription manager dropping"
        );
        self.stop.store(true, Ordering::SeqCst);
    }
}

/// Pull status and reasons out of a subscription-end payload.
fn read_subscription_end(inbound: &InboundMessage) -> (Option<String>, Vec<String>) {
    let Some(end) = inbound.message.body_child("SubscriptionEnd") else {
        return (None, Vec::new());
    };
    let status = end
        .get_child("Status")
        .and_then(|s| s.get_text())
        .map(|t| t.trim().to_string());
    let reasons = end
        .children
        .iter()
        .filter_map(|node| match node {
            xmltree::XMLNode::Element(element) if element.name == "Reason" => {
                element.get_text().map(|t| t.trim().to_string())
            }
            _ => None,
        })
        .collect();
    (status, reasons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use soap_client::SoapMessage;

    #[test]
    fn reads_status_and_reasons_from_end_message() {
        let xml = r#"
            <s12:Envelope xmlns:s12="http://www.w3.org/2003/05/soap-envelope"
                          xmlns:wse="http://schemas.xmlsoap.org/ws/2004/08/eventing">
                <s12:Body>
                    <wse:SubscriptionEnd>
                        <wse:Status>http://schemas.xmlsoap.org/ws/2004/08/eventing/DeliveryFailure</wse:Status>
                        <wse:Reason>delivery kept failing</wse:Reason>
                        <wse:Reason>peer shutting down</wse:Reason>
                    </wse:SubscriptionEnd>
                </s12:Body>
            </s12:Envelope>
        "#;
        let inbound = InboundMessage::new("/end/x", SoapMessage::from_str(xml).unwrap());
        let (status, reasons) = read_subscription_end(&inbound);
        assert_eq!(
            status.as_deref(),
            Some("http://schemas.xmlsoap.org/ws/2004/08/eventing/DeliveryFailure")
        );
        assert_eq!(reasons, vec!["delivery kept failing", "peer shutting down"]);
    }

    #[test]
    fn end_message_without_body_payload_yields_nothing() {
        let xml = r#"<s12:Envelope xmlns:s12="http://www.w3.org/2003/05/soap-envelope">
            <s12:Body/></s12:Envelope>"#;
        let inbound = InboundMessage::new("/end/x", SoapMessage::from_str(xml).unwrap());
        let (status, reasons) = read_subscription_end(&inbound);
        assert!(status.is_none());
        assert!(reasons.is_empty());
    }
}
