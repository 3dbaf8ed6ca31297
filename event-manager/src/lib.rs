//! # Event subscription lifecycle manager
//!
//! Keeps WS-Eventing subscriptions alive against one or more remote event
//! sources. A `SubscriptionManager` creates subscriptions, runs a single
//! background worker that renews (or status-checks) every managed lease on
//! a fixed interval, correlates inbound end-of-subscription messages back
//! to their owner, and exposes an aggregate health flag.
//!
//! ## Overview
//!
//! - **Synchronous API**: subscription creation and teardown are blocking
//!   calls; the caller observes success or failure immediately.
//! - **Background keep-alive**: one dedicated worker thread services all
//!   subscriptions sequentially; no lease expires as long as the peer
//!   cooperates.
//! - **Failure isolation**: a subscription whose peer misbehaves goes
//!   unhealthy and stays visible for diagnostics; the others are
//!   unaffected.
//! - **Pluggable correlation**: end-of-subscription messages are matched
//!   by URL suffix or by an echoed reference-parameter identifier, chosen
//!   once per manager.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use event_manager::{ManagerConfig, SubscriptionManager};
//! use soap_client::SoapClient;
//! use url::Url;
//!
//! let notification_url = Url::parse("http://192.168.0.9:9999/")?;
//! let config = ManagerConfig::new(notification_url);
//! let manager = SubscriptionManager::new(Arc::new(SoapClient::new()), config)?;
//! manager.start()?;
//!
//! let hosted = Url::parse("http://192.168.0.5:6464/Device/GetService")?;
//! let subscription = manager.create_subscription(
//!     &hosted,
//!     &["http://p11073/EpisodicMetricReport"],
//! )?;
//! subscription.notifications().subscribe(|n| {
//!     println!("notification: {:?}", n.action());
//! });
//!
//! // ... run ...
//!
//! manager.unsubscribe_all();
//! manager.stop();
//! ```

pub mod config;
pub mod correlation;
pub mod error;
pub mod manager;
pub mod worker;

pub use config::{CorrelationMode, KeepAliveMode, ManagerConfig};
pub use correlation::{
    CorrelationStrategy, InboundMessage, ReferenceParameterCorrelation, UrlSuffixCorrelation,
};
pub use error::{EventManagerError, Result};
pub use manager::SubscriptionManager;
pub use worker::HealthFlag;
