//! Managed event subscription with lifecycle management
//!
//! `EventSubscription` owns the state of one lease against a remote event
//! source: its action filter, generated callback addresses, correlation
//! identifiers, lease expiry and the subscription-manager address returned
//! by the peer. It can renew, query and end that one lease, and it
//! republishes received notifications on an observable sink.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use soap_client::{EnvelopeTransport, ReferenceParameter};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{ApiError, Result};
use crate::expiry;
use crate::notification::EventNotification;
use crate::observable::Observable;
use crate::operations::eventing::{
    GetStatusOperation, RenewOperation, RenewRequest, SubscribeOperation, SubscribeRequest,
    UnsubscribeOperation,
};

/// Remote and local expiry may drift by this much before the local value
/// is corrected.
const EXPIRY_TOLERANCE_SECONDS: f64 = 10.0;

/// A callback address registered with the remote peer, optionally paired
/// with a subscriber-generated correlation identifier.
#[derive(Debug, Clone)]
pub struct SubscriberAddress {
    pub url: Url,
    pub identifier: Option<String>,
}

impl SubscriberAddress {
    pub fn new(url: Url) -> Self {
        Self {
            url,
            identifier: None,
        }
    }

    pub fn with_identifier(url: Url, identifier: String) -> Self {
        Self {
            url,
            identifier: Some(identifier),
        }
    }
}

/// Mutable lease state, guarded by the per-subscription mutex.
///
/// The application thread and the maintenance worker may operate on the
/// same subscription concurrently; every state transition goes through
/// this lock. Network calls are made outside it.
#[derive(Debug)]
struct LeaseState {
    is_subscribed: bool,
    expire_at: Option<std::time::SystemTime>,
    expires_minutes: u32,
    manager_address: Option<Url>,
    reference_parameters: Vec<ReferenceParameter>,
}

/// A managed subscription to one set of notification actions.
pub struct EventSubscription {
    actions: Vec<String>,
    filter: String,
    hosted_endpoint: Url,
    notify_to: SubscriberAddress,
    end_to: SubscriberAddress,
    transport: Arc<dyn EnvelopeTransport>,
    state: Mutex<LeaseState>,
    event_counter: AtomicU64,
    last_notification: Mutex<Option<EventNotification>>,
    notifications: Observable<EventNotification>,
}

impl EventSubscription {
    pub fn new(
        transport: Arc<dyn EnvelopeTransport>,
        hosted_endpoint: Url,
        actions: Vec<String>,
        notify_to: SubscriberAddress,
        end_to: SubscriberAddress,
    ) -> Self {
        let filter = actions.join(" ");
        Self {
            actions,
            filter,
            hosted_endpoint,
            notify_to,
            end_to,
            transport,
            state: Mutex::new(LeaseState {
                is_subscribed: false,
                expire_at: None,
                expires_minutes: 0,
                manager_address: None,
                reference_parameters: Vec::new(),
            }),
            event_counter: AtomicU64::new(0),
            last_notification: Mutex::new(None),
            notifications: Observable::new(),
        }
    }

    /// Establish the lease with the remote event source.
    ///
    /// On success the subscription-manager address, any reference
    /// parameters and the granted expiry are captured and the subscription
    /// becomes healthy. Any failure leaves it unhealthy and is returned to
    /// the caller.
    pub fn subscribe(&self, expires_minutes: u32) -> Result<()> {
        info!(filter = %self.filter, "starting subscription");
        self.event_counter.store(0, Ordering::Relaxed);
        {
            // saved for later renewal, renewals reuse the same interval
            let mut state = self.state.lock().unwrap();
            state.expires_minutes = expires_minutes;
        }

        let request = SubscribeRequest {
            notify_to: self.notify_to.url.to_string(),
            notify_identifier: self.notify_to.identifier.clone(),
            end_to: self.end_to.url.to_string(),
            end_identifier: self.end_to.identifier.clone(),
            expires_minutes,
            filter: self.filter.clone(),
        };

        match SubscribeOperation::execute(self.transport.as_ref(), &self.hosted_endpoint, &request)
        {
            Ok(response) => {
                info!(
                    filter = %self.filter,
                    manager = %response.manager_address,
                    expires_in = response.expires_seconds,
                    "subscribe successful"
                );
                let mut state = self.state.lock().unwrap();
                state.manager_address = Some(response.manager_address);
                state.reference_parameters = response.reference_parameters;
                state.expire_at = Some(expiry::expires_at(Duration::from_secs_f64(
                    response.expires_seconds,
                )));
                state.is_subscribed = true;
                Ok(())
            }
            Err(e) => {
                error!(filter = %self.filter, error = %e, "could not subscribe");
                self.set_subscribed(false);
                Err(e)
            }
        }
    }

    /// Extend the lease, reusing the duration from the last subscribe or
    /// renew unless overridden.
    ///
    /// Returns the granted remaining seconds. Any failure (transport,
    /// connection, or a response without the expected expiry) downgrades
    /// the subscription to unhealthy.
    pub fn renew(&self, expires_minutes: Option<u32>) -> Result<f64> {
        let (manager_address, reference_parameters, minutes) = {
            let mut state = self.state.lock().unwrap();
            let address = state.manager_address.clone().ok_or_else(|| {
                ApiError::InvalidParameter("subscription was never established".to_string())
            })?;
            if let Some(minutes) = expires_minutes {
                state.expires_minutes = minutes;
            }
            (address, state.reference_parameters.clone(), state.expires_minutes)
        };

        let request = RenewRequest {
            expires_minutes: minutes,
        };
        match RenewOperation::execute(
            self.transport.as_ref(),
            &manager_address,
            &reference_parameters,
            &request,
        ) {
            Ok(response) => {
                debug!(
                    filter = %self.filter,
                    expires_in = response.expires_seconds,
                    "renew successful"
                );
                let mut state = self.state.lock().unwrap();
                state.expire_at = Some(expiry::expires_at(Duration::from_secs_f64(
                    response.expires_seconds,
                )));
                state.is_subscribed = true;
                Ok(response.expires_seconds)
            }
            Err(e) => {
                warn!(filter = %self.filter, error = %e, "renew failed");
                self.set_subscribed(false);
                Err(e)
            }
        }
    }

    /// Query the remaining lease time from the peer.
    ///
    /// Transport failures downgrade the subscription. A response without
    /// the expected expiry field is a protocol error, propagated to the
    /// caller with the health flag untouched.
    pub fn get_status(&self) -> Result<f64> {
        let (manager_address, reference_parameters) = {
            let state = self.state.lock().unwrap();
            let address = state.manager_address.clone().ok_or_else(|| {
                ApiError::InvalidParameter("subscription was never established".to_string())
            })?;
            (address, state.reference_parameters.clone())
        };

        match GetStatusOperation::execute(
            self.transport.as_ref(),
            &manager_address,
            &reference_parameters,
        ) {
            Ok(response) => {
                debug!(
                    filter = %self.filter,
                    expires_in = response.expires_seconds,
                    events = self.event_count(),
                    "status queried"
                );
                Ok(response.expires_seconds)
            }
            Err(e) if e.is_transport() => {
                warn!(filter = %self.filter, error = %e, "could not get status");
                self.set_subscribed(false);
                Err(e)
            }
            Err(e) => {
                warn!(filter = %self.filter, error = %e, "status response is unusable");
                Err(e)
            }
        }
    }

    /// Query the lease status and renew when it runs low.
    ///
    /// No-op while unhealthy. A failed status query downgrades the
    /// subscription. When the peer-reported remaining time deviates from
    /// the local expectation by more than ten seconds, the local expiry is
    /// corrected to the peer's value before the renew decision.
    pub fn check_status(&self, renew_limit: Duration) -> Result<()> {
        if !self.is_subscribed() {
            return Ok(());
        }

        let remote_remaining = match self.get_status() {
            Ok(seconds) => seconds,
            Err(e) => {
                self.set_subscribed(false);
                return Err(e);
            }
        };

        let local_remaining = self.remaining_seconds();
        if (remote_remaining - local_remaining).abs() > EXPIRY_TOLERANCE_SECONDS {
            warn!(
                filter = %self.filter,
                local = local_remaining,
                remote = remote_remaining,
                "lease expiry deviates from peer report, correcting to peer value"
            );
            let mut state = self.state.lock().unwrap();
            state.expire_at = Some(expiry::expires_at(Duration::from_secs_f64(
                remote_remaining.max(0.0),
            )));
        }

        if self.remaining_seconds() < renew_limit.as_secs_f64() {
            info!(filter = %self.filter, "renewing subscription");
            self.renew(None)?;
        }
        Ok(())
    }

    /// Keep-alive by unconditional renewal, for peers that do not answer
    /// status queries correctly. No-op while unhealthy.
    pub fn check_status_renew(&self) -> Result<()> {
        if self.is_subscribed() {
            self.renew(None)?;
        }
        Ok(())
    }

    /// End the lease at the peer. No-op while unhealthy.
    ///
    /// A response with the wrong action is a hard protocol error: the peer
    /// confirmed nothing, which points at an implementation bug rather
    /// than a transient condition.
    pub fn unsubscribe(&self) -> Result<()> {
        if !self.is_subscribed() {
            return Ok(());
        }
        let (manager_address, reference_parameters) = {
            let state = self.state.lock().unwrap();
            let address = state.manager_address.clone().ok_or_else(|| {
                ApiError::InvalidParameter("subscription was never established".to_string())
            })?;
            (address, state.reference_parameters.clone())
        };

        UnsubscribeOperation::execute(
            self.transport.as_ref(),
            &manager_address,
            &reference_parameters,
        )?;
        info!(filter = %self.filter, "end of subscription confirmed");
        Ok(())
    }

    /// Record an inbound notification: bump the counter, remember the
    /// payload and republish it to all observers, synchronously.
    pub fn on_notification(&self, notification: EventNotification) {
        self.event_counter.fetch_add(1, Ordering::Relaxed);
        {
            let mut last = self.last_notification.lock().unwrap();
            *last = Some(notification.clone());
        }
        self.notifications.publish(&notification);
    }

    /// Mark the subscription ended by the remote peer.
    pub fn mark_ended(&self) {
        self.set_subscribed(false);
    }

    /// Seconds until the lease expires. Zero when no lease was ever
    /// granted; negative once the lease has lapsed.
    pub fn remaining_seconds(&self) -> f64 {
        let state = self.state.lock().unwrap();
        state.expire_at.map(expiry::remaining_seconds).unwrap_or(0.0)
    }

    pub fn is_subscribed(&self) -> bool {
        self.state.lock().unwrap().is_subscribed
    }

    pub fn event_count(&self) -> u64 {
        self.event_counter.load(Ordering::Relaxed)
    }

    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn notify_to(&self) -> &SubscriberAddress {
        &self.notify_to
    }

    pub fn end_to(&self) -> &SubscriberAddress {
        &self.end_to
    }

    pub fn manager_address(&self) -> Option<Url> {
        self.state.lock().unwrap().manager_address.clone()
    }

    pub fn last_notification(&self) -> Option<EventNotification> {
        self.last_notification.lock().unwrap().clone()
    }

    /// The observable stream of received notifications.
    pub fn notifications(&self) -> &Observable<EventNotification> {
        &self.notifications
    }

    /// Filter description with each action shortened to its trailing path
    /// segment.
    pub fn short_filter(&self) -> String {
        self.actions
            .iter()
            .map(|action| action.rsplit('/').next().unwrap_or(action))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn set_subscribed(&self, value: bool) {
        let mut state = self.state.lock().unwrap();
        state.is_subscribed = value;
    }
}

impl fmt::Display for EventSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "subscription \"{}\": subscribed={}, remaining={}s, events={}",
            self.short_filter(),
            self.is_subscribed(),
            self.remaining_seconds() as i64,
            self.event_count(),
        )
    }
}

impl fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscription")
            .field("filter", &self.filter)
            .field("is_subscribed", &self.is_subscribed())
            .field("remaining_seconds", &self.remaining_seconds())
            .field("event_count", &self.event_count())
            .finish()
    }
}
