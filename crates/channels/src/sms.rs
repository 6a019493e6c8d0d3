//! SMS gateway provider.
//!
//! Messages go out through an Android gateway device API: the payload names
//! the registered device and carries the recipient and body. Segment counts
//! are estimated locally for logging and cost visibility.

use invite_core::config::SmsConfig;
use invite_core::{InviteError, InviteResult};
use tracing::{debug, info};
use uuid::Uuid;

/// Wire seam for the gateway API.
pub trait SmsTransport: Send + Sync {
    fn submit(&self, payload: &serde_json::Value) -> Result<String, String>;
}

/// Default transport. Acknowledges locally with a synthesized message id.
/// In production: POST to /gateway/devices/{device_id}/send-sms
pub struct StubSmsTransport;

impl SmsTransport for StubSmsTransport {
    fn submit(&self, _payload: &serde_json::Value) -> Result<String, String> {
        Ok(format!("sms-{}", Uuid::new_v4()))
    }
}

pub struct SmsGateway {
    config: SmsConfig,
    transport: Box<dyn SmsTransport>,
}

impl SmsGateway {
    pub fn new(config: SmsConfig, transport: Box<dyn SmsTransport>) -> Self {
        info!(device = %config.device_id, "SMS gateway initialized");
        Self { config, transport }
    }

    /// Submit one SMS through the gateway device.
    pub fn send(&self, to: &str, body: &str) -> InviteResult<String> {
        let segments = estimate_segments(body);
        debug!(to = %to, segments, "Submitting SMS");

        let payload = serde_json::json!({
            "device": self.config.device_id,
            "recipients": [to],
            "message": body,
        });

        let message_id = self
            .transport
            .submit(&payload)
            .map_err(InviteError::Provider)?;

        metrics::counter!("sms.submitted").increment(1);
        metrics::counter!("sms.segments").increment(segments as u64);
        Ok(message_id)
    }

    /// Per-dispatch recipient ceiling imposed by the gateway plan.
    pub fn max_recipients(&self) -> usize {
        self.config.max_recipients
    }

    pub fn config(&self) -> &SmsConfig {
        &self.config
    }
}

/// Estimate SMS segments for a body.
/// GSM 7-bit: 160 chars single, 153 per segment multi (UDH overhead).
/// UCS-2: 70 single, 67 multi.
pub fn estimate_segments(body: &str) -> u32 {
    if body.is_empty() {
        return 1;
    }
    let chars = body.chars().count() as u32;
    if body.chars().all(is_gsm_7bit) {
        if chars <= 160 {
            1
        } else {
            chars.div_ceil(153)
        }
    } else if chars <= 70 {
        1
    } else {
        chars.div_ceil(67)
    }
}

/// GSM 7-bit default alphabet, minus the rarely used national characters.
/// Anything outside this set forces UCS-2 encoding.
fn is_gsm_7bit(c: char) -> bool {
    matches!(c,
        'A'..='Z' | 'a'..='z' | '0'..='9'
        | ' ' | '!' | '"' | '#' | '$' | '%' | '&' | '\'' | '(' | ')'
        | '*' | '+' | ',' | '-' | '.' | '/' | ':' | ';' | '<' | '='
        | '>' | '?' | '@' | '_' | '\n' | '\r'
        | '{' | '}' | '[' | ']' | '~' | '\\' | '^' | '|' | '\u{20AC}'
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectingTransport;

    impl SmsTransport for RejectingTransport {
        fn submit(&self, _payload: &serde_json::Value) -> Result<String, String> {
            Err("device offline".to_string())
        }
    }

    fn gateway() -> SmsGateway {
        SmsGateway::new(SmsConfig::default(), Box::new(StubSmsTransport))
    }

    #[test]
    fn test_send_yields_message_id() {
        let id = gateway().send("+15551234567", "See you at TechFest").unwrap();
        assert!(id.starts_with("sms-"));
    }

    #[test]
    fn test_transport_failure_maps_to_provider_error() {
        let gw = SmsGateway::new(SmsConfig::default(), Box::new(RejectingTransport));
        let err = gw.send("+15551234567", "hello").unwrap_err();
        assert!(matches!(err, InviteError::Provider(_)));
    }

    #[test]
    fn test_segments_gsm_boundaries() {
        assert_eq!(estimate_segments(""), 1);
        assert_eq!(estimate_segments(&"A".repeat(160)), 1);
        assert_eq!(estimate_segments(&"A".repeat(161)), 2);
        assert_eq!(estimate_segments(&"A".repeat(306)), 2);
        assert_eq!(estimate_segments(&"A".repeat(307)), 3);
    }

    #[test]
    fn test_segments_unicode_boundaries() {
        let emoji_tail = format!("{}\u{1F600}", "A".repeat(69));
        assert_eq!(estimate_segments(&emoji_tail), 1);
        let over = format!("{}\u{1F600}", "A".repeat(70));
        assert_eq!(estimate_segments(&over), 2);
    }
}
