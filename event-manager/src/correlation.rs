//! Correlation of inbound end-of-subscription messages
//!
//! A subscription-end message arrives out of band on the end-to callback
//! and has to be matched back to the subscription that owns the lease.
//! Two mutually exclusive strategies exist, chosen for the whole manager
//! at construction: matching by a random URL path suffix, or matching by a
//! subscriber-generated identifier echoed as a reference parameter. Both
//! report a miss as `None`; a miss is a recoverable condition, never a
//! crash.

use std::sync::Arc;

use eventing_api::{EventSubscription, SubscriberAddress};
use soap_client::envelope::SUBSCRIBER_IDENT_ELEMENT;
use soap_client::SoapMessage;
use url::Url;
use uuid::Uuid;

use crate::config::CorrelationMode;
use crate::error::{EventManagerError, Result};

/// An inbound out-of-band message: the target path of the HTTP request it
/// arrived on plus its parsed envelope.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub path: String,
    pub message: SoapMessage,
}

impl InboundMessage {
    pub fn new(path: impl Into<String>, message: SoapMessage) -> Self {
        Self {
            path: path.into(),
            message,
        }
    }
}

/// Matcher resolving the subscription a message belongs to.
pub trait CorrelationStrategy: Send + Sync {
    /// Generate the notify/end callback addresses for a new subscription.
    fn subscriber_addresses(
        &self,
        notify_base: &Url,
        end_base: &Url,
    ) -> Result<(SubscriberAddress, SubscriberAddress)>;

    /// Resolve the subscription owning an inbound message, or `None`.
    fn find_subscription(
        &self,
        inbound: &InboundMessage,
        subscriptions: &[Arc<EventSubscription>],
    ) -> Option<Arc<EventSubscription>>;
}

pub(crate) fn strategy_for(mode: CorrelationMode) -> Arc<dyn CorrelationStrategy> {
    match mode {
        CorrelationMode::UrlSuffix => Arc::new(UrlSuffixCorrelation),
        CorrelationMode::ReferenceParameter => Arc::new(ReferenceParameterCorrelation),
    }
}

/// Correlation by a random, unguessable path segment appended to both
/// callback addresses.
pub struct UrlSuffixCorrelation;

impl UrlSuffixCorrelation {
    fn extend(base: &Url) -> Result<Url> {
        let address = format!("{}{}", base, Uuid::new_v4().simple());
        Url::parse(&address).map_err(|e| {
            EventManagerError::InvalidCallbackAddress(format!("{}: {}", address, e))
        })
    }
}

impl CorrelationStrategy for UrlSuffixCorrelation {
    fn subscriber_addresses(
        &self,
        notify_base: &Url,
        end_base: &Url,
    ) -> Result<(SubscriberAddress, SubscriberAddress)> {
        Ok((
            SubscriberAddress::new(Self::extend(notify_base)?),
            SubscriberAddress::new(Self::extend(end_base)?),
        ))
    }

    fn find_subscription(
        &self,
        inbound: &InboundMessage,
        subscriptions: &[Arc<EventSubscription>],
    ) -> Option<Arc<EventSubscription>> {
        let needle = inbound.path.rsplit('/').find(|segment| !segment.is_empty())?;
        subscriptions
            .iter()
            .find(|subscription| subscription.end_to().url.as_str().ends_with(needle))
            .cloned()
    }
}

/// Correlation by a subscriber-generated identifier registered as a
/// reference parameter of both callback addresses and echoed by the peer
/// in the message header.
pub struct ReferenceParameterCorrelation;

impl CorrelationStrategy for ReferenceParameterCorrelation {
    fn subscriber_addresses(
        &self,
        notify_base: &Url,
        end_base: &Url,
    ) -> Result<(SubscriberAddress, SubscriberAddress)> {
        Ok((
            SubscriberAddress::with_identifier(
                notify_base.clone(),
                Uuid::new_v4().urn().to_string(),
            ),
            SubscriberAddress::with_identifier(
                end_base.clone(),
                Uuid::new_v4().urn().to_string(),
            ),
        ))
    }

    fn find_subscription(
        &self,
        inbound: &InboundMessage,
        subscriptions: &[Arc<EventSubscription>],
    ) -> Option<Arc<EventSubscription>> {
        let identifier = inbound
            .message
            .header_values(SUBSCRIBER_IDENT_ELEMENT)
            .into_iter()
            .next()?;
        subscriptions
            .iter()
            .find(|subscription| {
                subscription.end_to().identifier.as_deref() == Some(identifier.as_str())
            })
            .cloned()
    }
}
