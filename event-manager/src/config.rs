//! Configuration for the subscription manager
//!
//! Controls the maintenance cadence, the keep-alive strategy, the default
//! lease length and how inbound end-of-subscription messages are matched
//! back to their subscription.

use std::time::Duration;

use url::Url;

use crate::error::{EventManagerError, Result};

/// How the background loop keeps leases alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepAliveMode {
    /// Renew every subscription on every pass. Default, because status
    /// queries are not universally implemented correctly.
    Renew,
    /// Query the remaining time and renew only when it runs below the
    /// renew limit.
    StatusQuery,
}

/// How inbound end-of-subscription messages are correlated to their
/// subscription. Fixed for the manager's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationMode {
    /// Each subscription gets callback URLs with a random path suffix;
    /// inbound messages match by that suffix.
    UrlSuffix,
    /// Each subscription registers a generated identifier as a reference
    /// parameter; inbound messages match by the echoed identifier.
    ReferenceParameter,
}

/// Configuration for a `SubscriptionManager`
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Interval between maintenance passes
    /// Default: 5 seconds
    pub check_interval: Duration,

    /// Keep-alive strategy for the maintenance pass
    /// Default: renew-only
    pub keep_alive: KeepAliveMode,

    /// Lease duration requested on subscribe, in minutes
    /// Default: 60
    pub lease_minutes: u32,

    /// Correlation strategy for end-of-subscription messages
    /// Default: URL suffix
    pub correlation: CorrelationMode,

    /// Base address notifications are delivered to
    pub notification_url: Url,

    /// Base address end-of-subscription messages are delivered to
    /// Default: the notification address
    pub end_to_url: Option<Url>,
}

impl ManagerConfig {
    pub fn new(notification_url: Url) -> Self {
        Self {
            check_interval: Duration::from_secs(5),
            keep_alive: KeepAliveMode::Renew,
            lease_minutes: 60,
            correlation: CorrelationMode::UrlSuffix,
            notification_url,
            end_to_url: None,
        }
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    pub fn with_keep_alive(mut self, mode: KeepAliveMode) -> Self {
        self.keep_alive = mode;
        self
    }

    pub fn with_lease_minutes(mut self, minutes: u32) -> Self {
        self.lease_minutes = minutes;
        self
    }

    pub fn with_correlation(mut self, mode: CorrelationMode) -> Self {
        self.correlation = mode;
        self
    }

    pub fn with_end_to_url(mut self, url: Url) -> Self {
        self.end_to_url = Some(url);
        self
    }

    /// Base address for end-of-subscription callbacks.
    pub fn end_to_base(&self) -> &Url {
        self.end_to_url.as_ref().unwrap_or(&self.notification_url)
    }

    /// Remaining-lease threshold below which a status-query pass renews
    /// proactively: five check intervals.
    pub fn renew_limit(&self) -> Duration {
        self.check_interval * 5
    }

    /// Validate the configuration and return any issues.
    pub fn validate(&self) -> Result<()> {
        if self.check_interval < Duration::from_secs(1) {
            return Err(EventManagerError::Configuration(
                "check interval must be at least one second".to_string(),
            ));
        }
        if self.lease_minutes == 0 {
            return Err(EventManagerError::Configuration(
                "lease duration must be at least one minute".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_url() -> Url {
        Url::parse("http://192.168.0.9:9999/").unwrap()
    }

    #[test]
    fn default_config() {
        let config = ManagerConfig::new(base_url());
        assert_eq!(config.check_interval, Duration::from_secs(5));
        assert_eq!(config.keep_alive, KeepAliveMode::Renew);
        assert_eq!(config.lease_minutes, 60);
        assert_eq!(config.correlation, CorrelationMode::UrlSuffix);
        assert_eq!(config.renew_limit(), Duration::from_secs(25));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn end_to_falls_back_to_notification_url() {
        let config = ManagerConfig::new(base_url());
        assert_eq!(config.end_to_base(), &base_url());

        let end = Url::parse("http://192.168.0.9:9998/end/").unwrap();
        let config = config.with_end_to_url(end.clone());
        assert_eq!(config.end_to_base(), &end);
    }

    #[test]
    fn builder_pattern() {
        let config = ManagerConfig::new(base_url())
            .with_check_interval(Duration::from_secs(10))
            .with_keep_alive(KeepAliveMode::StatusQuery)
            .with_lease_minutes(15)
            .with_correlation(CorrelationMode::ReferenceParameter);

        assert_eq!(config.check_interval, Duration::from_secs(10));
        assert_eq!(config.keep_alive, KeepAliveMode::StatusQuery);
        assert_eq!(config.lease_minutes, 15);
        assert_eq!(config.correlation, CorrelationMode::ReferenceParameter);
        assert_eq!(config.renew_limit(), Duration::from_secs(50));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_validation() {
        let too_fast = ManagerConfig::new(base_url())
            .with_check_interval(Duration::from_millis(100));
        assert!(too_fast.validate().is_err());

        let no_lease = ManagerConfig::new(base_url()).with_lease_minutes(0);
        assert!(no_lease.validate().is_err());
    }
}
