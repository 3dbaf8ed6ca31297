//! Test transport double for manager integration tests
//!
//! Answers every eventing operation with canned envelopes and supports
//! per-target failure injection, so tests can fail one subscription's
//! lease operations while the others keep working.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use soap_client::envelope::actions;
use soap_client::{EnvelopeTransport, SoapError, SoapMessage};
use url::Url;

pub struct MockTransport {
    /// Seconds granted on subscribe and renew
    granted_seconds: Mutex<f64>,
    /// Seconds reported by status queries
    status_seconds: Mutex<f64>,
    /// Every subscribe hands out a fresh manager address
    next_manager_id: AtomicUsize,
    fail_all: AtomicBool,
    /// Renew fails for targets containing this fragment
    fail_renew_for: Mutex<Option<String>>,
    /// Status queries fail for targets containing this fragment
    fail_status_for: Mutex<Option<String>>,
    /// Unsubscribe fails for targets containing this fragment
    fail_unsubscribe_for: Mutex<Option<String>>,
    /// (action, target) per outgoing request
    calls: Mutex<Vec<(String, String)>>,
}

impl MockTransport {
    pub fn new(granted_seconds: f64) -> Self {
        Self {
            granted_seconds: Mutex::new(granted_seconds),
            status_seconds: Mutex::new(granted_seconds),
            next_manager_id: AtomicUsize::new(1),
            fail_all: AtomicBool::new(false),
            fail_renew_for: Mutex::new(None),
            fail_status_for: Mutex::new(None),
            fail_unsubscribe_for: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::Relaxed);
    }

    pub fn set_status_seconds(&self, seconds: f64) {
        *self.status_seconds.lock().unwrap() = seconds;
    }

    pub fn fail_renew_for(&self, target_fragment: &str) {
        *self.fail_renew_for.lock().unwrap() = Some(target_fragment.to_string());
    }

    pub fn fail_status_for(&self, target_fragment: &str) {
        *self.fail_status_for.lock().unwrap() = Some(target_fragment.to_string());
    }

    pub fn fail_unsubscribe_for(&self, target_fragment: &str) {
        *self.fail_unsubscribe_for.lock().unwrap() = Some(target_fragment.to_string());
    }

    /// Number of requests with the given action, any target.
    pub fn calls_with_action(&self, action: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, _)| a == action)
            .count()
    }

    /// Number of requests with the given action whose target contains the
    /// fragment.
    pub fn calls_for_target(&self, action: &str, target_fragment: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(a, t)| a == action && t.contains(target_fragment))
            .count()
    }

    fn response(&self, action: &str) -> String {
        let expires = |seconds: f64| format!("<wse:Expires>PT{}S</wse:Expires>", seconds);
        let (response_action, body) = match action {
            a if a == actions::SUBSCRIBE => {
                let id = self.next_manager_id.fetch_add(1, Ordering::Relaxed);
                let body = format!(
                    r#"<wse:SubscribeResponse>
                        <wse:SubscriptionManager>
                            <wsa:Address>http://192.168.0.5:6464/SubscriptionManager/{}</wsa:Address>
                            <wsa:ReferenceParameters>
                                <dev:SubscriptionKey xmlns:dev="urn:dev">k-{}</dev:SubscriptionKey>
                            </wsa:ReferenceParameters>
                        </wse:SubscriptionManager>
                        {}
                    </wse:SubscribeResponse>"#,
                    id,
                    id,
                    expires(*self.granted_seconds.lock().unwrap())
                );
                (actions::SUBSCRIBE_RESPONSE, body)
            }
            a if a == actions::RENEW => (
                actions::RENEW_RESPONSE,
                format!(
                    "<wse:RenewResponse>{}</wse:RenewResponse>",
                    expires(*self.granted_seconds.lock().unwrap())
                ),
            ),
            a if a == actions::GET_STATUS => (
                actions::GET_STATUS_RESPONSE,
                format!(
                    "<wse:GetStatusResponse>{}</wse:GetStatusResponse>",
                    expires(*self.status_seconds.lock().unwrap())
                ),
            ),
            a if a == actions::UNSUBSCRIBE => (actions::UNSUBSCRIBE_RESPONSE, String::new()),
            other => panic!("unexpected action {}", other),
        };
        format!(
            r#"<s12:Envelope xmlns:s12="http://www.w3.org/2003/05/soap-envelope"
                             xmlns:wsa="http://www.w3.org/2005/08/addressing"
                             xmlns:wse="http://schemas.xmlsoap.org/ws/2004/08/eventing">
                <s12:Header><wsa:Action>{}</wsa:Action></s12:Header>
                <s12:Body>{}</s12:Body>
            </s12:Envelope>"#,
            response_action, body
        )
    }
}

impl EnvelopeTransport for MockTransport {
    fn post_envelope(
        &self,
        target: &Url,
        action: &str,
        _envelope: &str,
    ) -> Result<SoapMessage, SoapError> {
        self.calls
            .lock()
            .unwrap()
            .push((action.to_string(), target.to_string()));

        if self.fail_all.load(Ordering::Relaxed) {
            return Err(SoapError::Network("connection refused".to_string()));
        }
        if action == actions::RENEW {
            if let Some(fragment) = self.fail_renew_for.lock().unwrap().as_deref() {
                if target.as_str().contains(fragment) {
                    return Err(SoapError::Network("connection reset".to_string()));
                }
            }
        }
        if action == actions::GET_STATUS {
            if let Some(fragment) = self.fail_status_for.lock().unwrap().as_deref() {
                if target.as_str().contains(fragment) {
                    return Err(SoapError::Network("connection reset".to_string()));
                }
            }
        }
        if action == actions::UNSUBSCRIBE {
            if let Some(fragment) = self.fail_unsubscribe_for.lock().unwrap().as_deref() {
                if target.as_str().contains(fragment) {
                    return Err(SoapError::Http {
                        status: 500,
                        body: "internal error".to_string(),
                    });
                }
            }
        }

        SoapMessage::from_str(&self.response(action))
    }
}
