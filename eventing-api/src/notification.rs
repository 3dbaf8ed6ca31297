//! Inbound notification payload

use soap_client::SoapMessage;

use crate::error::Result;

/// One received event notification: the raw payload and its parsed form,
/// republished together on the owning subscription's observable sink.
#[derive(Debug, Clone)]
pub struct EventNotification {
    pub raw_xml: String,
    pub message: SoapMessage,
}

impl EventNotification {
    pub fn new(raw_xml: String, message: SoapMessage) -> Self {
        Self { raw_xml, message }
    }

    /// Parse a raw payload into a notification.
    pub fn parse(raw_xml: impl Into<String>) -> Result<Self> {
        let raw_xml = raw_xml.into();
        let message = SoapMessage::from_str(&raw_xml)?;
        Ok(Self { raw_xml, message })
    }

    /// The WS-Addressing action of the notification, if present.
    pub fn action(&self) -> Option<String> {
        self.message.action()
    }
}
