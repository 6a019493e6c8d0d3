//! WhatsApp deep-link construction.
//!
//! There is no server-side submission on this channel: the dispatcher
//! produces one click-to-chat link per recipient with the personalized text
//! pre-filled, and an operator opens them to send.

use invite_core::config::WhatsAppConfig;
use invite_core::{InviteError, InviteResult};
use tracing::debug;

pub struct WhatsAppLinker {
    config: WhatsAppConfig,
}

impl WhatsAppLinker {
    pub fn new(config: WhatsAppConfig) -> Self {
        Self { config }
    }

    /// Build a click-to-chat link for one recipient.
    pub fn build_link(&self, phone: &str, text: &str) -> InviteResult<String> {
        let normalized = normalize_e164(phone)?;
        let encoded: String = url::form_urlencoded::byte_serialize(text.as_bytes()).collect();
        let link = format!(
            "{}://send?to={}&text={}",
            self.config.scheme, normalized, encoded
        );
        debug!(to = %normalized, "WhatsApp link built");
        metrics::counter!("whatsapp.links_built").increment(1);
        Ok(link)
    }
}

/// Accepts E.164-shaped numbers: leading '+', then 8 to 15 digits.
/// Spaces and dashes in the input are tolerated and stripped.
fn normalize_e164(phone: &str) -> InviteResult<String> {
    let cleaned: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let digits = cleaned.strip_prefix('+').ok_or_else(|| {
        InviteError::Validation(format!("phone '{phone}' must start with '+'"))
    })?;
    if digits.len() < 8 || digits.len() > 15 || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(InviteError::Validation(format!(
            "phone '{phone}' is not a valid international number"
        )));
    }
    Ok(cleaned)
}
