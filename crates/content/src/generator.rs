//! Model-assisted invitation content with a deterministic fallback.
//!
//! The generative API is a black box behind [`TextModel`]: prompt in, text
//! or error out. Any model failure falls back to a fully parameterized HTML
//! document built from the same event parameters, and the subject line is
//! always computed locally so both paths agree on it.

use invite_core::config::GeneratorConfig;
use invite_core::types::Channel;
use invite_core::{InviteError, InviteResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Hard ceiling for generated SMS bodies. Exceeding it is an error the
/// caller must resolve by re-prompting with shorter inputs; the producer
/// never truncates.
pub const SMS_MAX_CHARS: usize = 500;

/// Event parameters driving both the prompt and the fallback document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventParams {
    pub event_name: String,
    pub committee_name: String,
    pub event_date: String,
    pub venue: String,
    #[serde(default)]
    pub event_time: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedInvite {
    pub subject: String,
    pub html_body: String,
}

/// Black-box text producer: a prompt goes in, a string comes out or the
/// call fails.
pub trait TextModel: Send + Sync {
    fn generate(&self, prompt: &str) -> anyhow::Result<String>;
}

/// Generative API client. Builds the real request payload; without an API
/// key the call fails and the generator falls back.
/// In production: POST the payload to the provider's completion endpoint.
pub struct ApiTextModel {
    config: GeneratorConfig,
}

impl ApiTextModel {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }
}

impl TextModel for ApiTextModel {
    fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        if self.config.api_key.trim().is_empty() {
            anyhow::bail!("generative API key is not configured");
        }

        let _payload = serde_json::json!({
            "model": self.config.model,
            "input": prompt,
            "max_output_tokens": 1024,
        });

        // Stub transport: the provider is unreachable from here, so report
        // failure and let the deterministic fallback take over.
        anyhow::bail!("generative API transport not available")
    }
}

pub struct InviteGenerator {
    model: Box<dyn TextModel>,
}

impl InviteGenerator {
    pub fn new(model: Box<dyn TextModel>) -> Self {
        Self { model }
    }

    /// Subject line is computable from the event parameters alone, so both
    /// the model path and the fallback share it.
    pub fn subject(params: &EventParams) -> String {
        format!(
            "Invitation: {} | {}",
            params.event_name, params.committee_name
        )
    }

    /// Produce a full invitation document. Never fails: any model error or
    /// blank output falls back to the templated document.
    pub fn generate(&self, params: &EventParams) -> GeneratedInvite {
        let subject = Self::subject(params);
        let prompt = build_prompt(params);

        let html_body = match self.model.generate(&prompt) {
            Ok(body) if !body.trim().is_empty() => {
                debug!(event = %params.event_name, "Invitation body produced by model");
                body
            }
            Ok(_) => {
                warn!(event = %params.event_name, "Model returned blank output, using fallback");
                fallback_document(params)
            }
            Err(e) => {
                warn!(event = %params.event_name, error = %e, "Model call failed, using fallback");
                fallback_document(params)
            }
        };

        GeneratedInvite { subject, html_body }
    }

    /// Short-form text for phone channels. SMS output over the ceiling is
    /// rejected rather than truncated.
    pub fn generate_short_form(
        &self,
        params: &EventParams,
        channel: Channel,
    ) -> InviteResult<String> {
        let prompt = build_short_prompt(params, channel);
        let text = match self.model.generate(&prompt) {
            Ok(text) if !text.trim().is_empty() => text,
            _ => fallback_short_form(params),
        };

        if channel == Channel::Sms {
            let actual = text.chars().count();
            if actual > SMS_MAX_CHARS {
                return Err(InviteError::LengthExceeded {
                    limit: SMS_MAX_CHARS,
                    actual,
                });
            }
        }
        Ok(text)
    }
}

fn build_prompt(params: &EventParams) -> String {
    format!(
        "Write a formal HTML invitation for the college event '{}' organized by {}. \
         Date: {}. Venue: {}.{}{} Address the recipient as {{{{name}}}}.",
        params.event_name,
        params.committee_name,
        params.event_date,
        params.venue,
        params
            .event_time
            .as_deref()
            .map(|t| format!(" Time: {t}."))
            .unwrap_or_default(),
        params
            .description
            .as_deref()
            .map(|d| format!(" Details: {d}."))
            .unwrap_or_default(),
    )
}

fn build_short_prompt(params: &EventParams, channel: Channel) -> String {
    format!(
        "Write a short {} invitation (plain text) for '{}' by {} on {} at {}. \
         Address the recipient as {{{{name}}}}.",
        channel.display_name(),
        params.event_name,
        params.committee_name,
        params.event_date,
        params.venue,
    )
}

/// Deterministic fallback document. Must never fail given event params.
fn fallback_document(params: &EventParams) -> String {
    let time_row = params
        .event_time
        .as_deref()
        .map(|t| format!("<p><strong>Time:</strong> {t}</p>\n"))
        .unwrap_or_default();
    let description = params
        .description
        .as_deref()
        .map(|d| format!("<p>{d}</p>\n"))
        .unwrap_or_default();
    let contact = params
        .contact
        .as_deref()
        .map(|c| format!("<p>For queries, contact {c}.</p>\n"))
        .unwrap_or_default();

    format!(
        "<html>\n<body>\n\
         <h2>{event}</h2>\n\
         <p>Dear {{{{name}}}},</p>\n\
         <p>The {committee} cordially invites you to <strong>{event}</strong>.</p>\n\
         {description}\
         <p><strong>Date:</strong> {date}</p>\n\
         {time_row}\
         <p><strong>Venue:</strong> {venue}</p>\n\
         <p>We look forward to your presence.</p>\n\
         {contact}\
         <p>Warm regards,<br/>{committee}</p>\n\
         </body>\n</html>",
        event = params.event_name,
        committee = params.committee_name,
        date = params.event_date,
        venue = params.venue,
        description = description,
        time_row = time_row,
        contact = contact,
    )
}

fn fallback_short_form(params: &EventParams) -> String {
    format!(
        "Dear {{{{name}}}}, {committee} invites you to {event} on {date} at {venue}. \
         We look forward to your presence.",
        committee = params.committee_name,
        event = params.event_name,
        date = params.event_date,
        venue = params.venue,
    )
}
