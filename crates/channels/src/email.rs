//! Email submission provider with two send paths.
//!
//! The standard path submits the invitation body as-is with open and click
//! tracking taken from configuration. The enhanced path is tuned for inbox
//! placement: the subject and body are scrubbed of spam-filter triggers and
//! tracking pixels are disabled, since tracking domains are themselves a
//! common filtering signal.

use crate::scrub::scrub_for_deliverability;
use invite_core::config::EmailConfig;
use invite_core::types::DeliveryStatus;
use invite_core::{InviteError, InviteResult};
use tracing::{debug, info};
use uuid::Uuid;

/// Which submission strategy to use for an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendPath {
    Standard,
    Enhanced,
}

/// Wire seam for the email API. The payload is the full JSON body that
/// would be POSTed to the provider's send endpoint; success yields the
/// provider's message id.
pub trait EmailTransport: Send + Sync {
    fn submit(&self, payload: &serde_json::Value) -> Result<String, String>;

    /// Poll the provider for the current status of a previously submitted
    /// message. Providers without a status API return `None`.
    fn fetch_status(&self, provider_message_id: &str) -> Option<DeliveryStatus> {
        let _ = provider_message_id;
        None
    }
}

/// Default transport. The provider endpoint is unreachable from here, so
/// submissions are acknowledged locally with a synthesized message id.
/// In production: POST to https://api.sendgrid.com/v3/mail/send
pub struct StubEmailTransport;

impl EmailTransport for StubEmailTransport {
    fn submit(&self, _payload: &serde_json::Value) -> Result<String, String> {
        Ok(format!("msg-{}", Uuid::new_v4()))
    }
}

pub struct EmailProvider {
    config: EmailConfig,
    transport: Box<dyn EmailTransport>,
}

impl EmailProvider {
    pub fn new(config: EmailConfig, transport: Box<dyn EmailTransport>) -> Self {
        info!(
            from = %config.from_email,
            open_tracking = config.open_tracking,
            click_tracking = config.click_tracking,
            "Email provider initialized"
        );
        Self { config, transport }
    }

    /// Submit one email. Returns the provider message id used later to
    /// correlate webhook events back to the delivery-log row.
    pub fn send(
        &self,
        to_email: &str,
        to_name: &str,
        subject: &str,
        html_body: &str,
        path: SendPath,
        campaign_id: Uuid,
    ) -> InviteResult<String> {
        let (subject, html_body, open_tracking, click_tracking) = match path {
            SendPath::Standard => (
                subject.to_string(),
                html_body.to_string(),
                self.config.open_tracking,
                self.config.click_tracking,
            ),
            SendPath::Enhanced => (
                scrub_for_deliverability(subject),
                scrub_for_deliverability(html_body),
                false,
                false,
            ),
        };

        debug!(
            to = %to_email,
            campaign_id = %campaign_id,
            path = ?path,
            "Submitting email"
        );

        let payload = serde_json::json!({
            "personalizations": [{
                "to": [{"email": to_email, "name": to_name}],
                "custom_args": {
                    "campaign_id": campaign_id.to_string()
                }
            }],
            "from": {
                "email": self.config.from_email,
                "name": self.config.from_name
            },
            "subject": subject,
            "content": [{
                "type": "text/html",
                "value": html_body
            }],
            "tracking_settings": {
                "open_tracking": {"enable": open_tracking},
                "click_tracking": {"enable": click_tracking}
            }
        });

        let message_id = self
            .transport
            .submit(&payload)
            .map_err(InviteError::Provider)?;

        metrics::counter!(
            "email.submitted",
            "path" => match path {
                SendPath::Standard => "standard",
                SendPath::Enhanced => "enhanced",
            }
        )
        .increment(1);

        Ok(message_id)
    }

    /// Ask the provider for the latest status of a submitted message.
    pub fn check_status(&self, provider_message_id: &str) -> Option<DeliveryStatus> {
        self.transport.fetch_status(provider_message_id)
    }

    pub fn config(&self) -> &EmailConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct CapturingTransport {
        payloads: Arc<Mutex<Vec<serde_json::Value>>>,
    }

    impl EmailTransport for CapturingTransport {
        fn submit(&self, payload: &serde_json::Value) -> Result<String, String> {
            self.payloads.lock().unwrap().push(payload.clone());
            Ok("msg-test".to_string())
        }
    }

    struct RejectingTransport;

    impl EmailTransport for RejectingTransport {
        fn submit(&self, _payload: &serde_json::Value) -> Result<String, String> {
            Err("550 mailbox unavailable".to_string())
        }
    }

    fn capturing_provider() -> (EmailProvider, Arc<Mutex<Vec<serde_json::Value>>>) {
        let payloads = Arc::new(Mutex::new(Vec::new()));
        let transport = CapturingTransport {
            payloads: payloads.clone(),
        };
        let provider = EmailProvider::new(EmailConfig::default(), Box::new(transport));
        (provider, payloads)
    }

    fn provider_with(transport: Box<dyn EmailTransport>) -> EmailProvider {
        EmailProvider::new(EmailConfig::default(), transport)
    }

    #[test]
    fn test_standard_path_keeps_body_and_tracking() {
        let (provider, payloads) = capturing_provider();
        let id = provider
            .send(
                "ana@x.edu",
                "Ana",
                "Invitation: TechFest",
                "<p>FREE entry!!!</p>",
                SendPath::Standard,
                Uuid::new_v4(),
            )
            .unwrap();
        assert_eq!(id, "msg-test");

        let payloads = payloads.lock().unwrap();
        let p = &payloads[0];
        assert_eq!(p["subject"], "Invitation: TechFest");
        assert_eq!(p["content"][0]["value"], "<p>FREE entry!!!</p>");
        assert_eq!(p["tracking_settings"]["open_tracking"]["enable"], true);
        assert_eq!(p["personalizations"][0]["to"][0]["email"], "ana@x.edu");
    }

    #[test]
    fn test_enhanced_path_scrubs_and_disables_tracking() {
        let (provider, payloads) = capturing_provider();
        provider
            .send(
                "ana@x.edu",
                "Ana",
                "Act now!!!",
                "<p>100% free entry!!!</p>",
                SendPath::Enhanced,
                Uuid::new_v4(),
            )
            .unwrap();

        let payloads = payloads.lock().unwrap();
        let p = &payloads[0];
        let subject = p["subject"].as_str().unwrap();
        let body = p["content"][0]["value"].as_str().unwrap();
        assert!(!subject.contains("!!!"));
        assert!(!body.to_ascii_lowercase().contains("100% free"));
        assert_eq!(p["tracking_settings"]["open_tracking"]["enable"], false);
        assert_eq!(p["tracking_settings"]["click_tracking"]["enable"], false);
    }

    #[test]
    fn test_transport_failure_maps_to_provider_error() {
        let provider = provider_with(Box::new(RejectingTransport));
        let err = provider
            .send(
                "ana@x.edu",
                "Ana",
                "Invitation",
                "<p>body</p>",
                SendPath::Standard,
                Uuid::new_v4(),
            )
            .unwrap_err();
        assert!(matches!(err, InviteError::Provider(_)));
        assert!(err.to_string().contains("550"));
    }

    #[test]
    fn test_stub_transport_synthesizes_ids() {
        let provider = provider_with(Box::new(StubEmailTransport));
        let id = provider
            .send(
                "ana@x.edu",
                "Ana",
                "Invitation",
                "<p>body</p>",
                SendPath::Standard,
                Uuid::new_v4(),
            )
            .unwrap();
        assert!(id.starts_with("msg-"));
        assert!(provider.check_status(&id).is_none());
    }
}
