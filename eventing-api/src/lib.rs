//! Typed WS-Eventing API for event subscription leases
//!
//! This crate provides the typed operations of the eventing exchange
//! (subscribe, renew, get-status, unsubscribe) and `EventSubscription`,
//! the record owning one lease against a remote event source. It uses the
//! private `soap-client` crate for envelope transport.
//!
//! # Subscription lifecycle
//!
//! ```rust,ignore
//! use eventing_api::{EventSubscription, SubscriberAddress};
//! use soap_client::SoapClient;
//! use std::sync::Arc;
//!
//! let transport = Arc::new(SoapClient::new());
//! let subscription = EventSubscription::new(
//!     transport,
//!     hosted_endpoint,
//!     vec!["http://p11073/EpisodicMetricReport".to_string()],
//!     SubscriberAddress::new(notify_url),
//!     SubscriberAddress::new(end_url),
//! );
//!
//! subscription.subscribe(60)?;
//! // ... later, keep the lease alive:
//! subscription.renew(None)?;
//! // ... and when done:
//! subscription.unsubscribe()?;
//! ```
//!
//! Periodic maintenance of many subscriptions lives one layer up, in the
//! `event-manager` crate.

pub mod error;
pub mod expiry;
pub mod notification;
pub mod observable;
pub mod operations;
pub mod subscription;

pub use error::{ApiError, Result};
pub use notification::EventNotification;
pub use observable::Observable;
pub use subscription::{EventSubscription, SubscriberAddress};
