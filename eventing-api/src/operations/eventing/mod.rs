//! WS-Eventing lease operations
//!
//! Each operation builds the request envelope, posts it through the
//! `EnvelopeTransport` contract and parses the typed response. Transport
//! and protocol failures are distinguished at this boundary: a response
//! that arrives but lacks the expected fields is a protocol error, never a
//! transport one.

mod get_status;
mod renew;
mod subscribe;
mod unsubscribe;

pub use get_status::{GetStatusOperation, GetStatusResponse};
pub use renew::{RenewOperation, RenewRequest, RenewResponse};
pub use subscribe::{SubscribeOperation, SubscribeRequest, SubscribeResponse};
pub use unsubscribe::{UnsubscribeOperation, UnsubscribeResponse};

use xmltree::Element;

use crate::error::{ApiError, Result};

/// Read the `Expires` child of a response element as seconds.
fn read_expires(parent: &Element, context: &str) -> Result<f64> {
    let text = parent
        .get_child("Expires")
        .and_then(|e| e.get_text())
        .ok_or_else(|| ApiError::Protocol(format!("{} has no Expires element", context)))?;
    soap_client::envelope::parse_iso_duration(text.trim())
        .ok_or_else(|| ApiError::Protocol(format!("invalid Expires duration: {}", text.trim())))
}
