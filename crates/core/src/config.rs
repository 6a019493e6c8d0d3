use crate::error::{InviteError, InviteResult};
use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `INVITE_EXPRESS__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub admin: AdminConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub email: EmailConfig,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Single shared admin secret. There is no per-user identity or session
/// lifecycle; the password is compared at request time.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AdminConfig {
    #[serde(default)]
    pub password: String,
}

/// Generative text API credentials. An absent key is not fatal: the
/// content producer falls back to its templated document.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_from_email")]
    pub from_email: String,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default = "default_open_tracking")]
    pub open_tracking: bool,
    #[serde(default = "default_click_tracking")]
    pub click_tracking: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
    #[serde(default)]
    pub api_key: String,
    /// Physical device identity the gateway routes through.
    #[serde(default)]
    pub device_id: String,
    #[serde(default = "default_sms_max_recipients")]
    pub max_recipients: usize,
    #[serde(default = "default_sms_send_delay_ms")]
    pub send_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WhatsAppConfig {
    #[serde(default = "default_whatsapp_scheme")]
    pub scheme: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    #[serde(default)]
    pub secret: String,
}

fn default_node_id() -> String {
    "invite-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_model() -> String {
    "text-large".to_string()
}
fn default_from_email() -> String {
    "invitations@invitewave.io".to_string()
}
fn default_from_name() -> String {
    "InviteExpress".to_string()
}
fn default_open_tracking() -> bool {
    true
}
fn default_click_tracking() -> bool {
    true
}
fn default_batch_size() -> usize {
    25
}
fn default_batch_delay_ms() -> u64 {
    1000
}
fn default_sms_max_recipients() -> usize {
    100
}
fn default_sms_send_delay_ms() -> u64 {
    500
}
fn default_whatsapp_scheme() -> String {
    "whatsapp".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            port: default_metrics_port(),
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            from_email: default_from_email(),
            from_name: default_from_name(),
            open_tracking: default_open_tracking(),
            click_tracking: default_click_tracking(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
        }
    }
}

impl Default for SmsConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            device_id: String::new(),
            max_recipients: default_sms_max_recipients(),
            send_delay_ms: default_sms_send_delay_ms(),
        }
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            scheme: default_whatsapp_scheme(),
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            admin: AdminConfig::default(),
            generator: GeneratorConfig::default(),
            email: EmailConfig::default(),
            sms: SmsConfig::default(),
            whatsapp: WhatsAppConfig::default(),
            webhook: WebhookConfig::default(),
        }
    }
}

impl EmailConfig {
    /// Fail fast when the email provider credential is missing; a dispatch
    /// endpoint must not attempt provider calls without it.
    pub fn require_credentials(&self) -> InviteResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(InviteError::Config(
                "email provider API key is not configured".to_string(),
            ));
        }
        Ok(())
    }
}

impl SmsConfig {
    pub fn require_credentials(&self) -> InviteResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(InviteError::Config(
                "SMS gateway API key is not configured".to_string(),
            ));
        }
        if self.device_id.trim().is_empty() {
            return Err(InviteError::Config(
                "SMS gateway device identity is not configured".to_string(),
            ));
        }
        Ok(())
    }
}

impl AdminConfig {
    pub fn require_password(&self) -> InviteResult<()> {
        if self.password.is_empty() {
            return Err(InviteError::Config(
                "admin password is not configured".to_string(),
            ));
        }
        Ok(())
    }
}

impl WebhookConfig {
    pub fn require_secret(&self) -> InviteResult<()> {
        if self.secret.is_empty() {
            return Err(InviteError::Config(
                "webhook shared secret is not configured".to_string(),
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("INVITE_EXPRESS")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.api.http_port, 8080);
        assert_eq!(config.sms.max_recipients, 100);
        assert_eq!(config.whatsapp.scheme, "whatsapp");
        assert!(config.email.open_tracking);
    }

    #[test]
    fn test_missing_credentials_fail_fast() {
        let config = AppConfig::default();
        assert!(matches!(
            config.email.require_credentials(),
            Err(InviteError::Config(_))
        ));
        assert!(matches!(
            config.sms.require_credentials(),
            Err(InviteError::Config(_))
        ));
        assert!(matches!(
            config.webhook.require_secret(),
            Err(InviteError::Config(_))
        ));
    }

    #[test]
    fn test_present_credentials_pass() {
        let mut config = AppConfig::default();
        config.email.api_key = "key".to_string();
        config.sms.api_key = "key".to_string();
        config.sms.device_id = "device-7".to_string();
        assert!(config.email.require_credentials().is_ok());
        assert!(config.sms.require_credentials().is_ok());
    }
}
